use std::fmt;

use github::VersionToken;
use pagesmith_core::{PublicationResult, Round};

/// Label of a round state, for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundState {
    GenerateInitial,
    PublishCreate,
    EnableHosting,
    FetchPrior,
    GenerateRevision,
    PublishUpdate,
    Notify,
    Done,
}

impl RoundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundState::GenerateInitial => "generate_initial",
            RoundState::PublishCreate => "publish_create",
            RoundState::EnableHosting => "enable_hosting",
            RoundState::FetchPrior => "fetch_prior",
            RoundState::GenerateRevision => "generate_revision",
            RoundState::PublishUpdate => "publish_update",
            RoundState::Notify => "notify",
            RoundState::Done => "done",
        }
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round state together with the data produced by the states before it.
///
/// Each variant can only be built from the output of its predecessor, so a
/// round cannot skip a state or enter one without the values it consumes.
#[derive(Debug, Clone)]
pub enum RoundStep {
    GenerateInitial,
    PublishCreate {
        artifact: String,
    },
    EnableHosting {
        publication: PublicationResult,
    },
    FetchPrior,
    GenerateRevision {
        prior_content: String,
        prior_token: VersionToken,
    },
    PublishUpdate {
        artifact: String,
        prior_token: VersionToken,
    },
    Notify {
        publication: PublicationResult,
    },
    Done {
        publication: PublicationResult,
        delivered: bool,
    },
}

impl RoundStep {
    pub fn initial(round: Round) -> Self {
        match round {
            Round::Initial => RoundStep::GenerateInitial,
            Round::Revision => RoundStep::FetchPrior,
        }
    }

    pub fn state(&self) -> RoundState {
        match self {
            RoundStep::GenerateInitial => RoundState::GenerateInitial,
            RoundStep::PublishCreate { .. } => RoundState::PublishCreate,
            RoundStep::EnableHosting { .. } => RoundState::EnableHosting,
            RoundStep::FetchPrior => RoundState::FetchPrior,
            RoundStep::GenerateRevision { .. } => RoundState::GenerateRevision,
            RoundStep::PublishUpdate { .. } => RoundState::PublishUpdate,
            RoundStep::Notify { .. } => RoundState::Notify,
            RoundStep::Done { .. } => RoundState::Done,
        }
    }
}

pub struct RoundStateMachine;

impl RoundStateMachine {
    /// States visited by a successful run of `round`, in order.
    pub fn sequence(round: Round) -> &'static [RoundState] {
        match round {
            Round::Initial => &[
                RoundState::GenerateInitial,
                RoundState::PublishCreate,
                RoundState::EnableHosting,
                RoundState::Notify,
                RoundState::Done,
            ],
            Round::Revision => &[
                RoundState::FetchPrior,
                RoundState::GenerateRevision,
                RoundState::PublishUpdate,
                RoundState::Notify,
                RoundState::Done,
            ],
        }
    }

    pub fn next_state(round: Round, current: RoundState) -> Option<RoundState> {
        let sequence = Self::sequence(round);
        let index = sequence.iter().position(|s| *s == current)?;
        sequence.get(index + 1).copied()
    }

    pub fn can_transition(round: Round, from: RoundState, to: RoundState) -> bool {
        Self::next_state(round, from) == Some(to)
    }
}
