//! Use cases for the application layer

pub mod resume_stream;
pub mod run_round;
