//! polystatus-core - shared building blocks for the polystatus helpers.
//!
//! Holds everything that does not touch processes or D-Bus: the config
//! schema and loader, the error type, logging setup, colour math and the
//! polybar markup tokens.

pub mod color;
pub mod config;
pub mod error;
pub mod logging;
pub mod markup;

pub use color::Rgb;
pub use config::Config;
pub use error::{Error, Result};
