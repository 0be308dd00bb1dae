//! Serial connection core.
//!
//! ```text
//! HTTP / service ─┬──> ConnectionManager ──┬──> PortRegistry (one handle)
//!                 └──> CommandWriter ──────┤
//!                                          └──> StatusProber ──> SerialBackend
//! ```
//!
//! The manager is the only component that mutates the registry. The writer
//! borrows the manager's operation lock, so writes never interleave with
//! opens or closes.

pub mod error;
pub mod manager;
pub mod prober;
pub mod registry;
pub mod writer;

pub use error::{ConnectionError, ConnectionResult};
pub use manager::ConnectionManager;
pub use prober::{PortStatus, StatusProber, PORT_NOT_FOUND};
pub use registry::{PortHandle, PortRegistry};
pub use writer::CommandWriter;
