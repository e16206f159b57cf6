//! Simulated connection drop
//!
//! Cancels the round as soon as a chosen model has produced its first chunk,
//! which is what a page reload mid-answer looks like to the client.

use roundtable_application::ports::progress::RoundProgressNotifier;
use roundtable_domain::Model;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub struct InterruptAfterFirstChunk<'a> {
    inner: &'a dyn RoundProgressNotifier,
    target: Model,
    cancel: CancellationToken,
    /// Participant index of `target` once it starts streaming.
    streaming_index: Mutex<Option<usize>>,
}

impl<'a> InterruptAfterFirstChunk<'a> {
    pub fn new(inner: &'a dyn RoundProgressNotifier, target: Model, cancel: CancellationToken) -> Self {
        Self {
            inner,
            target,
            cancel,
            streaming_index: Mutex::new(None),
        }
    }

    pub fn fired(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl RoundProgressNotifier for InterruptAfterFirstChunk<'_> {
    fn on_round_start(&self, round_number: u32, participant_count: usize) {
        self.inner.on_round_start(round_number, participant_count);
    }

    fn on_pre_search_start(&self, round_number: u32) {
        self.inner.on_pre_search_start(round_number);
    }

    fn on_pre_search_complete(&self, round_number: u32, success: bool) {
        self.inner.on_pre_search_complete(round_number, success);
    }

    fn on_participant_start(&self, index: usize, model: &Model) {
        if *model == self.target
            && let Ok(mut streaming) = self.streaming_index.lock()
        {
            *streaming = Some(index);
        }
        self.inner.on_participant_start(index, model);
    }

    fn on_participant_chunk(&self, index: usize, chunk: &str) {
        self.inner.on_participant_chunk(index, chunk);
        let hit = self
            .streaming_index
            .lock()
            .is_ok_and(|streaming| *streaming == Some(index));
        if hit && !self.cancel.is_cancelled() {
            self.cancel.cancel();
        }
    }

    fn on_participant_complete(&self, index: usize, model: &Model, success: bool) {
        self.inner.on_participant_complete(index, model, success);
    }

    fn on_moderator_start(&self, model: &Model) {
        self.inner.on_moderator_start(model);
    }

    fn on_moderator_chunk(&self, chunk: &str) {
        self.inner.on_moderator_chunk(chunk);
    }

    fn on_moderator_complete(&self, success: bool) {
        self.inner.on_moderator_complete(success);
    }

    fn on_round_complete(&self, round_number: u32) {
        self.inner.on_round_complete(round_number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_application::NoProgress;

    #[test]
    fn test_cancels_on_target_chunk_only() {
        let cancel = CancellationToken::new();
        let notifier = InterruptAfterFirstChunk::new(&NoProgress, Model::Grok4, cancel.clone());

        notifier.on_participant_start(0, &Model::Gpt52);
        notifier.on_participant_chunk(0, "hello");
        assert!(!notifier.fired());

        notifier.on_participant_start(1, &Model::Grok4);
        notifier.on_participant_chunk(1, "hi");
        assert!(cancel.is_cancelled());
    }
}
