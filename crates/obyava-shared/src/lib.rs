//! # obyava-shared
//!
//! Domain types and wire protocol for the Obyava listings dashboard sync
//! layer. Everything here is serializable so it can cross the WebSocket
//! boundary or be handed to the UI layer unchanged.

pub mod constants;
pub mod protocol;
pub mod types;

mod error;

pub use error::ProtocolError;
