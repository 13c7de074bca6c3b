mod engine;
mod link;
mod registry;

pub use engine::{LinkStatus, NegotiationEngine, NegotiationRole, NegotiationState};
pub use link::{LinkCommand, LinkEvent, LinkFactory, PeerLink};
pub use registry::PeerRegistry;
