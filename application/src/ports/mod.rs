//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod navigator;
pub mod participant_stream;
pub mod progress;
pub mod resumable_stream;
pub mod thread_repository;
pub mod web_search;
