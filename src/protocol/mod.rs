//! WebSocket protocol message types.
//!
//! This module defines the JSON frames exchanged with the race server.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`ServerMessage`] | Server → Client | State pushes (nine kinds) |
//! | [`ClientMessage`] | Client → Server | User intents (three kinds) |
//!
//! Every frame is one JSON object with a `type` string. There are no
//! request ids and no acknowledgements.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound commands |
//! | `event` | Inbound messages and decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound command definitions.
pub mod command;

/// Inbound message types.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::ClientMessage;
pub use event::{KNOWN_TYPES, ServerMessage, ServerState, decode};
