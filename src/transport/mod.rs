//! Single-client duplex transport
//!
//! A named pipe on Windows and a Unix domain socket elsewhere. One client is
//! served at a time; after it leaves the server loops back to accepting.
//! Connection changes and inbound frames are published on an event channel,
//! outbound frames go through [`TransportHandle::send`].

pub mod endpoint;
pub mod server;

pub use endpoint::{default_endpoint, Connection, Endpoint};
pub use server::{ConnectionState, TransportError, TransportEvent, TransportHandle, TransportServer};
