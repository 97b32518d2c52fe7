//! WebSocket connection management for the dashboard sync layer.
//!
//! Each channel (general, favorites) gets its own socket task spawned via
//! [`spawn_socket`]; external code talks to it through a [`SocketHandle`]
//! and receives [`SocketNotification`]s, keeping the networking layer fully
//! asynchronous and decoupled from the engines.

pub mod backoff;
pub mod router;
pub mod socket;

pub use backoff::ReconnectPolicy;
pub use router::{EventRouter, HandlerId, RoutedEvent};
pub use socket::{
    spawn_socket, ConnectionState, FrameSink, SocketConfig, SocketHandle, SocketNotification,
};
