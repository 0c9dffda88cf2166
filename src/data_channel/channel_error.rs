use thiserror::Error;

use crate::data_channel::channel_state::ChannelState;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("data channel is not open (state: {state})")]
    ChannelNotOpen { state: ChannelState },
    #[error("failed to encode frame: {0}")]
    Encode(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Decode(String),
}
