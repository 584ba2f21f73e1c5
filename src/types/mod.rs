//! Core types: messages, streamed fragments, and completion options.

pub mod message;
pub mod options;
pub mod stream;

pub use message::*;
pub use options::*;
pub use stream::*;
