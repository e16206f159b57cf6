//! Round flow state machine.
//!
//! State is recomputed from a [`FlowContext`] snapshot on every evaluation;
//! actions fire only on edges between two different states. Re-evaluating
//! the same snapshot any number of times therefore never repeats a side
//! effect.
//!
//! ```text
//! IDLE ─▶ CREATING_THREAD ─▶ STREAMING_PARTICIPANTS ─▶ CREATING_MODERATOR
//!                                                          │ (CreateModerator)
//!                                                          ▼
//!            COMPLETE ◀── NAVIGATING ◀───────────── STREAMING_MODERATOR
//!                 (InvalidateAndNavigate)
//! ```

mod action;
mod machine;
mod state;

pub use action::{FlowAction, compute_flow_action};
pub use machine::FlowMachine;
pub use state::{FlowContext, FlowState, ScreenMode, compute_flow_state};
