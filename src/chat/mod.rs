//! Text chat over a data channel.
pub mod chat_error;
pub mod chat_facade;
pub mod chat_message;

pub use chat_error::ChatError;
pub use chat_facade::ChatFacade;
pub use chat_message::{ChatLine, ChatMessage, ChatOrigin};
