//! Client side of a full-mesh audio room.
//!
//! A [`SessionController`] joins one room at a time over a signaling
//! connection and keeps one negotiated media link per other participant.

pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod room;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ConnectionError, MediaAccessError, NegotiationError, SessionError};
pub use peer::{LinkStatus, NegotiationRole, NegotiationState};
pub use session::{SessionController, SessionEnd};
