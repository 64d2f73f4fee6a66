//! Coordinate extraction from Google Maps links.
//!
//! Pattern matching on the link itself, short-link expansion, and a
//! persistent cache keyed by the link as it appears in the spreadsheet.

pub mod cache;
pub mod expander;
pub mod matchers;
pub mod resolver;
pub mod types;

pub use cache::{CacheEntry, CoordinateCache};
pub use expander::{ExpandError, HttpExpander, UrlExpander};
pub use matchers::MatchOutcome;
pub use resolver::{CoordinateResolver, FailedRow, RunSummary};
pub use types::{BoundingBox, Candidate, FailureReason, LatLng, Method, Resolution};
