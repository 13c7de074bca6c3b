//! Relay signaling server for huddle rooms.
//!
//! Tracks room membership per WebSocket connection, broadcasts membership
//! changes and forwards negotiation frames between members of one room.

mod config;
mod room;
mod router;
mod signaling;

pub use config::ServerConfig;
pub use room::{ConnectionId, Room};
pub use router::{router, serve, serve_on};
pub use signaling::{SignalingService, ws_handler};
