//! Value definitions and their codecs.
//!
//! A [`ValueDef`] turns the raw bytes of its locations into an
//! [`Outcome<Reading>`] and back. Sentinel bytes decode to tagged outcomes
//! rather than errors.

pub mod definition;
pub mod error;
pub mod layout;
pub mod outcome;
pub mod reader;

mod encoder;
mod parser;
mod text;

pub use definition::{ValueDef, ValueKind};
pub use error::{DecodeError, EncodeError};
pub use outcome::{Celsius, Outcome, Quantity, Reading, VersionNumber};
