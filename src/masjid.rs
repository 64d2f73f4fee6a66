//! Masjid records as they move through the passes.

use crate::location::LatLng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Riyadh regions used to group the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Region {
    North,
    East,
    WestSouth,
}

impl Region {
    /// Display order in the generated data module.
    pub const ALL: [Region; 3] = [Region::North, Region::East, Region::WestSouth];

    /// Map a spreadsheet label (Arabic, or the English key) to a region.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "الشمال" | "north" => Some(Self::North),
            "الشرق" | "east" => Some(Self::East),
            "الغرب والجنوب" | "westSouth" => Some(Self::WestSouth),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::WestSouth => "westSouth",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::North => "North Region (الشمال)",
            Self::East => "East Region (الشرق)",
            Self::WestSouth => "West & South Region (الغرب والجنوب)",
        }
    }

    /// Prefix of generated ids, e.g. `ws-007`.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::North => "n",
            Self::East => "e",
            Self::WestSouth => "ws",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A region column value. Unknown labels are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionField {
    Known(Region),
    Other(String),
}

impl RegionField {
    pub fn from_label(label: &str) -> Self {
        match Region::from_label(label) {
            Some(r) => Self::Known(r),
            None => Self::Other(label.to_string()),
        }
    }

    pub fn region(&self) -> Option<Region> {
        match self {
            Self::Known(r) => Some(*r),
            Self::Other(_) => None,
        }
    }
}

/// One spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRecord {
    pub reader_name: String,
    pub masjid_name: String,
    pub region: RegionField,
    pub google_maps_url: String,
    pub audio_url: String,
    pub notes: Option<String>,
    pub coordinates: Option<LatLng>,
}

/// Round to 7 decimal places (about a centimetre).
pub fn round7(v: f64) -> f64 {
    (v * 1e7).round() / 1e7
}

/// A record in the extracted JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub reader_name: String,
    pub masjid_name: String,
    pub region: RegionField,
    pub google_maps_url: String,
    pub audio_url: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&PlaceRecord> for ExtractedRecord {
    fn from(r: &PlaceRecord) -> Self {
        Self {
            reader_name: r.reader_name.clone(),
            masjid_name: r.masjid_name.clone(),
            region: r.region.clone(),
            google_maps_url: r.google_maps_url.clone(),
            audio_url: r.audio_url.clone(),
            lat: r.coordinates.map(|p| round7(p.lat)),
            lng: r.coordinates.map(|p| round7(p.lng)),
            notes: r.notes.clone().filter(|n| !n.is_empty()),
        }
    }
}

impl ExtractedRecord {
    pub fn coordinates(&self) -> Option<LatLng> {
        Some(LatLng { lat: self.lat?, lng: self.lng? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(coords: Option<LatLng>, notes: Option<&str>) -> PlaceRecord {
        PlaceRecord {
            reader_name: "الشيخ فلان".into(),
            masjid_name: "جامع الملك خالد".into(),
            region: RegionField::from_label("الشمال"),
            google_maps_url: "https://maps.app.goo.gl/abc".into(),
            audio_url: "https://youtu.be/xyz".into(),
            notes: notes.map(String::from),
            coordinates: coords,
        }
    }

    #[test]
    fn test_region_labels() {
        assert_eq!(Region::from_label("الشمال"), Some(Region::North));
        assert_eq!(Region::from_label(" الشرق "), Some(Region::East));
        assert_eq!(Region::from_label("الغرب والجنوب"), Some(Region::WestSouth));
        assert_eq!(Region::from_label("westSouth"), Some(Region::WestSouth));
        assert_eq!(Region::from_label("الوسط"), None);
    }

    #[test]
    fn test_region_field_serialization() {
        assert_eq!(serde_json::to_value(RegionField::Known(Region::WestSouth)).unwrap(), json!("westSouth"));
        assert_eq!(serde_json::to_value(RegionField::from_label("الوسط")).unwrap(), json!("الوسط"));

        let parsed: RegionField = serde_json::from_value(json!("east")).unwrap();
        assert_eq!(parsed, RegionField::Known(Region::East));
        let parsed: RegionField = serde_json::from_value(json!("center")).unwrap();
        assert_eq!(parsed, RegionField::Other("center".into()));
    }

    #[test]
    fn test_round7() {
        assert_eq!(round7(24.71234567891), 24.7123457);
        assert_eq!(round7(46.68), 46.68);
    }

    #[test]
    fn test_extracted_success_json() {
        let r = record(Some(LatLng { lat: 24.712345678, lng: 46.68 }), Some("مواقف واسعة"));
        let value = serde_json::to_value(ExtractedRecord::from(&r)).unwrap();
        assert_eq!(
            value,
            json!({
                "readerName": "الشيخ فلان",
                "masjidName": "جامع الملك خالد",
                "region": "north",
                "googleMapsUrl": "https://maps.app.goo.gl/abc",
                "audioUrl": "https://youtu.be/xyz",
                "lat": 24.7123457,
                "lng": 46.68,
                "notes": "مواقف واسعة",
            })
        );
    }

    #[test]
    fn test_extracted_failure_json() {
        let value = serde_json::to_value(ExtractedRecord::from(&record(None, Some("")))).unwrap();
        assert_eq!(value["lat"], json!(null));
        assert_eq!(value["lng"], json!(null));
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_extracted_coordinates() {
        let mut r = ExtractedRecord::from(&record(Some(LatLng { lat: 24.7, lng: 46.6 }), None));
        assert_eq!(r.coordinates(), Some(LatLng { lat: 24.7, lng: 46.6 }));
        r.lng = None;
        assert_eq!(r.coordinates(), None);
    }
}
