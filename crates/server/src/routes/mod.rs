mod health;
mod tasks;
mod ui;

pub use health::*;
pub use tasks::*;
pub use ui::*;
