//! Offline geocode formats found in map links.

pub mod plus_code;
pub mod s2;

pub use plus_code::{CodeArea, PlusCodeError};
pub use s2::{CellId, S2Error};
