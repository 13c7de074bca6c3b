mod connection;
mod ws_connector;

pub use connection::*;
pub use ws_connector::WsConnector;
