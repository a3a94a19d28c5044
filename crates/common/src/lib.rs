//! Error plumbing and small path helpers shared by every sharebridge crate.

pub mod error;
pub mod paths;

pub use error::{Error, FromMessage, Result};
