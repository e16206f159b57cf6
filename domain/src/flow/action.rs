use super::state::{FlowContext, FlowState};

/// Side effect requested on a state edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowAction {
    /// Create the analysis record and start the moderator stream.
    CreateModerator { round_number: u32 },
    /// Invalidate cached thread lists, then navigate to the thread screen.
    InvalidateAndNavigate { thread_id: String, slug: String },
}

/// Action for the edge `previous → current`, if any.
///
/// Same-state evaluations never produce an action. Navigation is suppressed
/// once the context reports it has already happened.
pub fn compute_flow_action(
    previous: FlowState,
    current: FlowState,
    ctx: &FlowContext,
) -> Option<FlowAction> {
    if previous == current {
        return None;
    }
    match current {
        FlowState::CreatingModerator => Some(FlowAction::CreateModerator {
            round_number: ctx.round_number,
        }),
        FlowState::Navigating if !ctx.has_navigated => {
            let thread_id = ctx.thread_id.clone()?;
            let slug = ctx.thread_slug.clone().unwrap_or_else(|| thread_id.clone());
            Some(FlowAction::InvalidateAndNavigate { thread_id, slug })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FlowContext {
        FlowContext {
            thread_id: Some("t1".to_string()),
            thread_slug: Some("my-thread".to_string()),
            round_number: 2,
            ..Default::default()
        }
    }

    #[test]
    fn create_moderator_on_entry_only() {
        assert_eq!(
            compute_flow_action(FlowState::StreamingParticipants, FlowState::CreatingModerator, &ctx()),
            Some(FlowAction::CreateModerator { round_number: 2 })
        );
        assert_eq!(
            compute_flow_action(FlowState::CreatingModerator, FlowState::CreatingModerator, &ctx()),
            None
        );
    }

    #[test]
    fn navigate_on_entry() {
        assert_eq!(
            compute_flow_action(FlowState::StreamingModerator, FlowState::Navigating, &ctx()),
            Some(FlowAction::InvalidateAndNavigate {
                thread_id: "t1".to_string(),
                slug: "my-thread".to_string()
            })
        );
    }

    #[test]
    fn navigate_suppressed_after_navigation() {
        let ctx = FlowContext {
            has_navigated: true,
            ..ctx()
        };
        assert_eq!(
            compute_flow_action(FlowState::StreamingModerator, FlowState::Navigating, &ctx),
            None
        );
    }

    #[test]
    fn actionless_edges() {
        assert_eq!(
            compute_flow_action(FlowState::Idle, FlowState::StreamingParticipants, &ctx()),
            None
        );
        assert_eq!(
            compute_flow_action(FlowState::Navigating, FlowState::Complete, &ctx()),
            None
        );
    }
}
