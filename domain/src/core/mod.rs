//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: AI models a participant slot can reference
//! - [`status::RecordStatus`]: lifecycle shared by pre-search and analysis records
//! - [`staleness::StalenessPolicy`]: read-only age checks against `created_at`
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod model;
pub mod staleness;
pub mod status;
