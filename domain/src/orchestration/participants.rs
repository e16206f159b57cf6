//! Sequential participant orchestration.
//!
//! Participants of a round speak one after another. The pointer only moves
//! through [`ParticipantOrchestrator::advance`], and only once the current
//! participant's message is terminal (finish reason or error tag). A failed
//! participant still counts as terminal, so it never blocks the ones after it.

use super::round::{find_slot, messages_in_round, user_message};
use crate::core::error::DomainError;
use crate::message::entities::Message;
use crate::message::identity::MessageSlot;
use serde::{Deserialize, Serialize};

/// Result of advancing the participant pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Start this participant next.
    Next(usize),
    /// Every participant is terminal.
    RoundComplete,
}

impl Advance {
    pub fn next_index(&self) -> Option<usize> {
        match self {
            Advance::Next(index) => Some(*index),
            Advance::RoundComplete => None,
        }
    }
}

/// Pointer to the participant currently allowed to stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantOrchestrator {
    current_index: usize,
}

impl ParticipantOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn reset(&mut self) {
        self.current_index = 0;
    }

    /// Place the pointer directly (resumption of a participant mid-round).
    pub fn resume_at(&mut self, index: usize, participant_count: usize) -> Result<(), DomainError> {
        if index >= participant_count {
            return Err(DomainError::ParticipantOutOfRange {
                index,
                count: participant_count,
            });
        }
        self.current_index = index;
        Ok(())
    }

    /// Move past the current participant.
    ///
    /// Fails if the current participant has no terminal message in the round.
    /// On the last participant the pointer stays put and the round is reported
    /// complete.
    pub fn advance(
        &mut self,
        messages: &[Message],
        round_number: u32,
        participant_count: usize,
    ) -> Result<Advance, DomainError> {
        if participant_count == 0 {
            return Err(DomainError::NoParticipants);
        }
        let index = self.current_index;
        let terminal = find_slot(messages, round_number, MessageSlot::Participant(index))
            .is_some_and(Message::is_terminal);
        if !terminal {
            return Err(DomainError::ParticipantNotTerminal {
                round_number,
                index,
            });
        }

        if index + 1 < participant_count {
            self.current_index = index + 1;
            Ok(Advance::Next(self.current_index))
        } else if is_round_complete(messages, round_number, participant_count) {
            Ok(Advance::RoundComplete)
        } else {
            // Last slot is terminal but an earlier one is not (out-of-order
            // resumption). Hand back the first gap instead of completing.
            let gap = next_pending_participant(messages, round_number, participant_count)
                .unwrap_or(index);
            self.current_index = gap;
            Ok(Advance::Next(gap))
        }
    }
}

/// Context for participant `index`: the round's user message followed by the
/// assistant messages of participants `0..index` in order, errored ones included.
pub fn assemble_context(messages: &[Message], round_number: u32, index: usize) -> Vec<&Message> {
    let mut context: Vec<&Message> = Vec::with_capacity(index + 1);
    if let Some(user) = user_message(messages, round_number) {
        context.push(user);
    }
    let mut prior: Vec<&Message> = messages_in_round(messages, round_number)
        .filter(|m| m.participant_index().is_some_and(|i| i < index))
        .collect();
    prior.sort_by_key(|m| m.participant_index());
    context.extend(prior);
    context
}

/// Indices that have a terminal message in the round.
pub fn terminal_participants(messages: &[Message], round_number: u32) -> Vec<usize> {
    let mut indices: Vec<usize> = messages_in_round(messages, round_number)
        .filter(|m| m.is_terminal())
        .filter_map(Message::participant_index)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// First participant without a terminal message.
pub fn next_pending_participant(
    messages: &[Message],
    round_number: u32,
    participant_count: usize,
) -> Option<usize> {
    (0..participant_count).find(|&i| {
        !find_slot(messages, round_number, MessageSlot::Participant(i))
            .is_some_and(Message::is_terminal)
    })
}

/// Every enabled participant has a terminal message for the round.
pub fn is_round_complete(messages: &[Message], round_number: u32, participant_count: usize) -> bool {
    participant_count > 0
        && next_pending_participant(messages, round_number, participant_count).is_none()
}
