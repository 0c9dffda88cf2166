//! Reliable ordered message channels carried over the nominated pair.
pub mod channel_error;
pub mod channel_event;
pub mod channel_registry;
pub mod channel_state;
#[allow(clippy::module_inception)]
pub mod data_channel;
pub mod dcep;
pub mod frame;

pub use channel_error::ChannelError;
pub use channel_event::ChannelEvent;
pub use channel_state::ChannelState;
pub use data_channel::DataChannel;
