//! Mock device implementations for testing and development.
//!
//! These mocks simulate hardware at the report level so the driver, session
//! and everything above them run unchanged without a physical reader.

pub mod magstripe;

pub use magstripe::{MockMagstripe, MockMagstripeHandle};
