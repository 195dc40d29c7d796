pub mod session_transport;

pub use session_transport::{SessionTransport, Transport};
