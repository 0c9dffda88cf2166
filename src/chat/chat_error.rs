use thiserror::Error;

use crate::data_channel::ChannelError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("cannot send: {0}")]
    Channel(#[from] ChannelError),
}
