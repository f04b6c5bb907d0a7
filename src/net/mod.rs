//! Wire protocol and WebTransport plumbing

pub mod broadcast;
pub mod framing;
pub mod protocol;
pub mod tls;
pub mod transport;
