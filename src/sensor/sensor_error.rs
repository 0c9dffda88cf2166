use thiserror::Error;

use crate::data_channel::ChannelError;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("could not encode sensor message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("could not decode sensor message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
