use std::fmt;

/// Lifecycle of a differential-evolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Initializing,
    Evaluating,
    Evolving,
    Converged, // generation budget exhausted
    Stopped,   // cancelled at a generation boundary
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Evaluating => "evaluating",
            Self::Evolving => "evolving",
            Self::Converged => "converged",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    GenerationsReached,
    Cancelled,
}

impl Termination {
    pub fn final_state(self) -> EngineState {
        match self {
            Self::GenerationsReached => EngineState::Converged,
            Self::Cancelled => EngineState::Stopped,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerationsReached => f.write_str("completed"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}
