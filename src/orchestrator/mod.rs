//! Call setup: acquisition, the offer/answer round between endpoints A and
//! B, candidate wiring and the resulting [`Call`].
pub mod abort_handle;
pub mod call;
pub mod call_config;
pub mod call_error;
pub mod call_event;
pub mod call_orchestrator;
pub mod call_state;
pub mod negotiation_step;

pub use abort_handle::AbortHandle;
pub use call::Call;
pub use call_config::CallConfig;
pub use call_error::CallError;
pub use call_event::CallEvent;
pub use call_orchestrator::CallOrchestrator;
pub use call_state::CallState;
pub use negotiation_step::NegotiationStep;
