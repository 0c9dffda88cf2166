use thiserror::Error;

use crate::endpoint::EndpointId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("relay towards {0} is closed")]
    Closed(EndpointId),
}
