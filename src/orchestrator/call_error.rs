use thiserror::Error;

use crate::{endpoint::EndpointError, media::MediaError, orchestrator::negotiation_step::NegotiationStep};

#[derive(Debug, Error)]
pub enum CallError {
    #[error("media acquisition failed: {0}")]
    Media(#[from] MediaError),
    #[error("negotiation failed at {step}: {source}")]
    NegotiationFailed {
        step: NegotiationStep,
        #[source]
        source: EndpointError,
    },
    #[error("call aborted during {step}")]
    Aborted { step: NegotiationStep },
    #[error("negotiation timed out during {step}")]
    TimedOut { step: NegotiationStep },
    #[error("data channel closed before it opened")]
    ChannelNeverOpened,
}

impl CallError {
    pub(crate) fn negotiation(step: NegotiationStep, source: EndpointError) -> Self {
        Self::NegotiationFailed { step, source }
    }
}
