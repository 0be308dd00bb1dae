//! Tests against a real serial device.
//!
//! Set `TEST_PORT` (and optionally `TEST_BAUD`) to the servo controller.

pub mod servo_tests;
