use bytes::Bytes;

/// What a [`DataChannel`](super::DataChannel) reports to its subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Closed,
    Message(String),
    Binary(Bytes),
}
