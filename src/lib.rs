//! Data preparation for the Riyadh masjid audio directory.
//!
//! Four batch passes over the masjid list:
//! - `coords`: resolve each Google Maps link to coordinates ([`location`])
//! - `generate`: render the typed data module ([`datafile`])
//! - `download`: fetch YouTube audio with yt-dlp ([`audio`])
//! - `rewrite`: point audio URLs at the hosted copies ([`rewrite`])

pub mod audio;
pub mod config;
pub mod datafile;
pub mod error;
pub mod geocode;
pub mod location;
pub mod masjid;
pub mod rewrite;
pub mod sheet;

pub use error::{PrepError, Result};
