//! One streamed turn: the pure section state machine and the controller
//! that feeds it from an agent.

mod controller;
mod state;

pub use controller::{StreamingSessionController, TurnSummary, UserSubmission};
pub use state::{FinalizedTurn, TurnState};
