//! Port abstraction layer for serial communication.
//!
//! Provides the backend traits, the OS implementation and a mock, so the
//! connection manager can be driven by real hardware or by tests.

pub mod error;
pub mod mock;
pub mod system;
pub mod traits;

pub use error::{is_busy_message, PortError};
pub use mock::MockSerialBackend;
pub use system::{SystemSerialBackend, SystemSerialLink};
pub use traits::*;
