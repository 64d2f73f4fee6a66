//! Core types for the coordinate resolver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, p: LatLng) -> bool {
        (self.lat_min..=self.lat_max).contains(&p.lat) && (self.lng_min..=self.lng_max).contains(&p.lng)
    }
}

/// How a coordinate was extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    AtCoords,
    DataParams,
    S2Cell,
    PlusCode,
    /// Cache entry written without (or with an unknown) method tag.
    Cached,
}

impl Method {
    pub fn tag(self) -> &'static str {
        match self {
            Self::AtCoords => "@coords",
            Self::DataParams => "!3d!4d",
            Self::S2Cell => "s2cell",
            Self::PlusCode => "plus_code",
            Self::Cached => "cached",
        }
    }
}

impl From<String> for Method {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "@coords" => Self::AtCoords,
            "!3d!4d" => Self::DataParams,
            "s2cell" => Self::S2Cell,
            "plus_code" => Self::PlusCode,
            _ => Self::Cached,
        }
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.tag().to_string()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A raw matcher result, before the bounding-box check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub point: LatLng,
    pub method: Method,
}

/// Why a URL produced no coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// No method recognised anything in the URL.
    NoMatch,
    /// A method decoded a point, but outside the bounding box.
    OutOfBounds(Candidate),
    /// The short link could not be expanded.
    Network(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => write!(f, "could not extract coords"),
            Self::OutOfBounds(c) => write!(f, "{} decoded {} outside bounds", c.method, c.point),
            Self::Network(msg) => write!(f, "short link not resolved: {}", msg),
        }
    }
}

/// Outcome of resolving one URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found {
        point: LatLng,
        method: Method,
        /// Served from the cache without any extraction.
        cached: bool,
    },
    Failed(FailureReason),
}

impl Resolution {
    pub fn point(&self) -> Option<LatLng> {
        match self {
            Self::Found { point, .. } => Some(*point),
            Self::Failed(_) => None,
        }
    }

    pub fn method(&self) -> Option<Method> {
        match self {
            Self::Found { method, .. } => Some(*method),
            Self::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_inclusive() {
        let b = BoundingBox { lat_min: 24.3, lat_max: 25.2, lng_min: 46.2, lng_max: 47.2 };
        assert!(b.contains(LatLng { lat: 24.3, lng: 47.2 }));
        assert!(b.contains(LatLng { lat: 24.71, lng: 46.68 }));
        assert!(!b.contains(LatLng { lat: 21.42, lng: 39.82 }));
        assert!(!b.contains(LatLng { lat: 24.71, lng: 47.21 }));
    }

    #[test]
    fn test_method_tags_round_trip() {
        for m in [Method::AtCoords, Method::DataParams, Method::S2Cell, Method::PlusCode, Method::Cached] {
            let json = serde_json::to_string(&m).unwrap();
            let back: Method = serde_json::from_str(&json).unwrap();
            assert_eq!(back, m);
        }
        assert_eq!(serde_json::to_string(&Method::DataParams).unwrap(), r#""!3d!4d""#);
    }

    #[test]
    fn test_unknown_method_is_cached() {
        let m: Method = serde_json::from_str(r#""geocoder""#).unwrap();
        assert_eq!(m, Method::Cached);
    }
}
