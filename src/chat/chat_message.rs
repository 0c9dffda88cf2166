use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOrigin {
    Local,
    Remote,
}

/// One chat message as shown to the user. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub origin: ChatOrigin,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u128,
}

/// A rendered line of the chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    Message(ChatMessage),
    System(String),
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(m) if m.origin == ChatOrigin::Local => write!(f, "Me: {}", m.text),
            Self::Message(m) => write!(f, "Friend: {}", m.text),
            Self::System(text) => write!(f, "--- {text} ---"),
        }
    }
}
