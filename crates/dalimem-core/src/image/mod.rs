//! JSON memory images and a bus simulator answering from them.
//!
//! Images stand in for real hardware in the CLI and in tests. All file I/O
//! of the crate lives here.

mod bus;
pub mod error;
pub mod model;

pub use bus::ImageBus;
pub use error::ImageError;
pub use model::{BankImage, DeviceImage, MemoryImage};
