//! The `utils` module provides the pieces shared by every other module of
//! the bridge: the error taxonomy, logging setup and OS signal handling.

pub mod error;
pub mod logging;
pub mod signals;
