//! Candidate gathering, trickle buffering, connectivity checks and pair
//! nomination over the in-process loopback fabric.
pub mod binding_message;
pub mod candidate;
pub mod candidate_pair;
pub mod candidate_type;
pub mod connectivity_checker;
pub mod connectivity_state;
pub mod gathering_service;
pub mod ice_agent;
pub mod ice_candidate;
pub mod loopback_network;

pub use candidate::Candidate;
pub use connectivity_checker::ConnectivityChecker;
pub use connectivity_state::ConnectivityState;
pub use ice_candidate::IceCandidate;
pub use loopback_network::LoopbackNetwork;
