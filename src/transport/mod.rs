//! WebSocket transport layer.
//!
//! This module owns the socket side of the live link to the race server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐      LinkEvent       ┌─────────────────┐
//! │  Engine task    │◄─────────────────────│  I/O task       │
//! │  (RaceStore)    │─────────────────────►│  (Connection)   │
//! └─────────────────┘   ClientMessage      └────────┬────────┘
//!                                                   │ WebSocket
//!                                          ┌────────▼────────┐
//!                                          │  Race server    │
//!                                          │  :8383/sclx     │
//!                                          └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::open` - Spawn the I/O task and start connecting
//! 2. `LinkEvent::Opened` - Handshake done, frames start flowing
//! 3. `LinkEvent::Frame` - One per inbound text frame, in order
//! 4. `LinkEvent::Closed` - Exactly once, whatever ended the link
//!
//! Every event carries the [`ConnectionId`](crate::identifiers::ConnectionId)
//! of the link that produced it, so events from a superseded link can be
//! told apart and ignored.

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and I/O loop.
pub mod connection;

/// Local race-server stand-in for tests.
#[cfg(test)]
pub(crate) mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, LinkEvent};
