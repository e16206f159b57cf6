use super::action::{FlowAction, compute_flow_action};
use super::state::{FlowContext, FlowState, compute_flow_state};

/// Remembers the previous state so actions fire on edges only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowMachine {
    previous: FlowState,
}

impl FlowMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FlowState {
        self.previous
    }

    /// Recompute the state and return the edge action, if any.
    pub fn step(&mut self, ctx: &FlowContext) -> (FlowState, Option<FlowAction>) {
        let current = compute_flow_state(ctx);
        let action = compute_flow_action(self.previous, current, ctx);
        self.previous = current;
        (current, action)
    }

    pub fn reset(&mut self) {
        self.previous = FlowState::Idle;
    }
}
