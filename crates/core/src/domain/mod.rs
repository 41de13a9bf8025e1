pub mod publication;
pub mod task;
