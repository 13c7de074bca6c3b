mod clock;
mod controller;
mod room_session;

pub use clock::{SessionClock, format_elapsed};
pub use controller::SessionController;
pub use room_session::SessionEnd;
