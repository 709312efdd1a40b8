//! Built-in session handlers.

pub mod chat;
pub mod close;
pub mod echo;

pub use chat::ChatService;
pub use close::CloseService;
pub use echo::EchoService;
