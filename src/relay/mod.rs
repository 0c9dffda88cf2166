//! Candidate transport between the two endpoints.
pub mod candidate_relay;
pub mod in_memory_relay;
pub mod relay_error;

pub use candidate_relay::CandidateRelay;
pub use in_memory_relay::InMemoryRelay;
pub use relay_error::RelayError;
