//! Core types for Conclave.

pub mod capabilities;
pub mod message;
pub mod stream;

pub use capabilities::*;
pub use message::*;
pub use stream::*;
