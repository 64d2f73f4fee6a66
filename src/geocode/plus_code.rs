//! Open Location Code ("Plus Code") encode, decode and short-code recovery.
//!
//! A full code is 8 digits, a `+`, then 2 or more refinement digits. The
//! first 10 digits are interleaved latitude/longitude pairs in base 20; any
//! further digits subdivide the area on a 5-row by 4-column grid. A short
//! code drops leading digits and is recovered against a reference point.

use crate::location::LatLng;
use thiserror::Error;

const ALPHABET: &[u8; 20] = b"23456789CFGHJMPQRVWX";
const ENCODING_BASE: f64 = 20.0;
const SEPARATOR: char = '+';
const SEPARATOR_POSITION: usize = 8;
const PADDING: char = '0';

const PAIR_CODE_LENGTH: usize = 10;
const GRID_CODE_LENGTH: usize = 5;
const MAX_DIGIT_COUNT: usize = PAIR_CODE_LENGTH + GRID_CODE_LENGTH;
const GRID_COLUMNS: i64 = 4;
const GRID_ROWS: i64 = 5;

/// Degrees covered by one digit of each pair position.
const PAIR_RESOLUTIONS: [f64; 5] = [20.0, 1.0, 0.05, 0.0025, 0.000125];

// Integer precision of a full 15-digit code.
const PAIR_PRECISION: i64 = 8000;
const LAT_INTEGER_MULTIPLIER: i64 = PAIR_PRECISION * 3125; // 5^5 grid rows
const LNG_INTEGER_MULTIPLIER: i64 = PAIR_PRECISION * 1024; // 4^5 grid columns

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlusCodeError {
    #[error("invalid plus code '{0}'")]
    Invalid(String),
    #[error("'{0}' is not a full plus code")]
    NotFull(String),
    #[error("invalid code length {0}")]
    InvalidLength(usize),
}

/// The rectangle a code denotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeArea {
    pub lat_lo: f64,
    pub lng_lo: f64,
    pub lat_hi: f64,
    pub lng_hi: f64,
    pub code_length: usize,
}

impl CodeArea {
    pub fn center(&self) -> LatLng {
        LatLng {
            lat: (self.lat_lo + (self.lat_hi - self.lat_lo) / 2.0).min(90.0),
            lng: (self.lng_lo + (self.lng_hi - self.lng_lo) / 2.0).min(180.0),
        }
    }

    pub fn contains(&self, p: LatLng) -> bool {
        (self.lat_lo..self.lat_hi).contains(&p.lat) && (self.lng_lo..self.lng_hi).contains(&p.lng)
    }
}

fn digit_value(c: char) -> Option<usize> {
    let upper = c.to_ascii_uppercase() as u8;
    ALPHABET.iter().position(|&a| a == upper)
}

// ─── Validation ─────────────────────────────────────────────────

pub fn is_valid(code: &str) -> bool {
    let Some(sep) = code.find(SEPARATOR) else {
        return false;
    };
    if code.rfind(SEPARATOR) != Some(sep) || code.len() == 1 {
        return false;
    }
    if sep > SEPARATOR_POSITION || sep % 2 == 1 {
        return false;
    }

    if let Some(pad) = code.find(PADDING) {
        // Padding only in full-length prefixes, as an even run right before a trailing separator.
        if sep < SEPARATOR_POSITION || pad == 0 {
            return false;
        }
        if !code[pad..sep].chars().all(|c| c == PADDING) || (sep - pad) % 2 == 1 {
            return false;
        }
        if sep != code.len() - 1 {
            return false;
        }
    }

    if code.len() - sep - 1 == 1 {
        return false;
    }

    code.chars()
        .filter(|&c| c != SEPARATOR && c != PADDING)
        .all(|c| digit_value(c).is_some())
}

pub fn is_short(code: &str) -> bool {
    is_valid(code) && code.find(SEPARATOR).is_some_and(|sep| sep < SEPARATOR_POSITION)
}

pub fn is_full(code: &str) -> bool {
    if !is_valid(code) || is_short(code) {
        return false;
    }
    let mut chars = code.chars();
    let first_lat = chars.next().and_then(digit_value).unwrap_or(0) as f64;
    if first_lat * ENCODING_BASE >= 180.0 {
        return false;
    }
    if let Some(first_lng) = chars.next().and_then(digit_value) {
        if first_lng as f64 * ENCODING_BASE >= 360.0 {
            return false;
        }
    }
    true
}

// ─── Encode / decode ────────────────────────────────────────────

/// Encode a point to a full code with `code_length` digits (2..=15; even below 10).
pub fn encode(point: LatLng, code_length: usize) -> Result<String, PlusCodeError> {
    if code_length < 2 || (code_length < PAIR_CODE_LENGTH && code_length % 2 == 1) {
        return Err(PlusCodeError::InvalidLength(code_length));
    }
    let code_length = code_length.min(MAX_DIGIT_COUNT);

    let lat = point.lat.clamp(-90.0, 90.0);
    let lng = point.lng;

    let lat_max = 180 * LAT_INTEGER_MULTIPLIER;
    let mut lat_val = (((lat + 90.0) * LAT_INTEGER_MULTIPLIER as f64).floor() as i64).min(lat_max - 1);
    let mut lng_val = (((lng + 180.0) * LNG_INTEGER_MULTIPLIER as f64).floor() as i64)
        .rem_euclid(360 * LNG_INTEGER_MULTIPLIER);

    // Digits are produced least significant first.
    let mut reversed: Vec<u8> = Vec::with_capacity(MAX_DIGIT_COUNT);
    for _ in 0..GRID_CODE_LENGTH {
        let row = lat_val % GRID_ROWS;
        let col = lng_val % GRID_COLUMNS;
        reversed.push(ALPHABET[(row * GRID_COLUMNS + col) as usize]);
        lat_val /= GRID_ROWS;
        lng_val /= GRID_COLUMNS;
    }
    for _ in 0..PAIR_CODE_LENGTH / 2 {
        reversed.push(ALPHABET[(lng_val % 20) as usize]);
        reversed.push(ALPHABET[(lat_val % 20) as usize]);
        lat_val /= 20;
        lng_val /= 20;
    }
    let digits: String = reversed.iter().rev().map(|&b| b as char).collect();

    let mut code = String::with_capacity(MAX_DIGIT_COUNT + 1);
    if code_length < SEPARATOR_POSITION {
        code.push_str(&digits[..code_length]);
        code.extend(std::iter::repeat(PADDING).take(SEPARATOR_POSITION - code_length));
        code.push(SEPARATOR);
    } else {
        code.push_str(&digits[..SEPARATOR_POSITION]);
        code.push(SEPARATOR);
        code.push_str(&digits[SEPARATOR_POSITION..code_length]);
    }
    Ok(code)
}

/// Decode a full code to the area it covers.
pub fn decode(code: &str) -> Result<CodeArea, PlusCodeError> {
    if !is_full(code) {
        return Err(PlusCodeError::NotFull(code.to_string()));
    }
    let values: Vec<usize> = code
        .chars()
        .filter(|&c| c != SEPARATOR && c != PADDING)
        .take(MAX_DIGIT_COUNT)
        .filter_map(digit_value)
        .collect();

    let mut lat_lo = -90.0;
    let mut lng_lo = -180.0;
    let mut lat_size = PAIR_RESOLUTIONS[0];
    let mut lng_size = PAIR_RESOLUTIONS[0];

    for (pair, chunk) in values.iter().take(PAIR_CODE_LENGTH).collect::<Vec<_>>().chunks(2).enumerate() {
        let res = PAIR_RESOLUTIONS[pair];
        lat_lo += *chunk[0] as f64 * res;
        if let Some(lng_digit) = chunk.get(1) {
            lng_lo += **lng_digit as f64 * res;
        }
        lat_size = res;
        lng_size = res;
    }

    for &v in values.iter().skip(PAIR_CODE_LENGTH) {
        lat_size /= GRID_ROWS as f64;
        lng_size /= GRID_COLUMNS as f64;
        let row = v as i64 / GRID_COLUMNS;
        let col = v as i64 % GRID_COLUMNS;
        lat_lo += row as f64 * lat_size;
        lng_lo += col as f64 * lng_size;
    }

    Ok(CodeArea {
        lat_lo,
        lng_lo,
        lat_hi: lat_lo + lat_size,
        lng_hi: lng_lo + lng_size,
        code_length: values.len(),
    })
}

/// Recover the full code nearest to `reference` for a short code.
/// Full codes pass through, upper-cased.
pub fn recover_nearest(code: &str, reference: LatLng) -> Result<String, PlusCodeError> {
    if !is_short(code) {
        if is_full(code) {
            return Ok(code.to_ascii_uppercase());
        }
        return Err(PlusCodeError::Invalid(code.to_string()));
    }
    let code = code.to_ascii_uppercase();
    let ref_lat = reference.lat.clamp(-90.0, 90.0);
    let ref_lng = normalize_lng(reference.lng);

    let sep = code.find(SEPARATOR).unwrap_or(SEPARATOR_POSITION);
    let padding_length = SEPARATOR_POSITION - sep;
    let resolution = ENCODING_BASE.powi(2 - (padding_length / 2) as i32);
    let half = resolution / 2.0;

    let reference_code = encode(LatLng { lat: ref_lat, lng: ref_lng }, PAIR_CODE_LENGTH)?;
    let area = decode(&format!("{}{}", &reference_code[..padding_length], code))?;
    let mut center = area.center();

    // The recovered cell may sit a whole resolution step away from the reference.
    if ref_lat + half < center.lat && center.lat - resolution >= -90.0 {
        center.lat -= resolution;
    } else if ref_lat - half > center.lat && center.lat + resolution <= 90.0 {
        center.lat += resolution;
    }
    if ref_lng + half < center.lng {
        center.lng -= resolution;
    } else if ref_lng - half > center.lng {
        center.lng += resolution;
    }

    encode(center, area.code_length)
}

/// Recover and decode in one step, returning the area centre.
pub fn decode_near(code: &str, reference: LatLng) -> Result<LatLng, PlusCodeError> {
    let full = recover_nearest(code, reference)?;
    Ok(decode(&full)?.center())
}

fn normalize_lng(lng: f64) -> f64 {
    let mut lng = lng;
    while lng < -180.0 {
        lng += 360.0;
    }
    while lng >= 180.0 {
        lng -= 360.0;
    }
    lng
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RIYADH: LatLng = LatLng { lat: 24.7136, lng: 46.6753 };

    #[test]
    fn test_validity() {
        assert!(is_valid("8FVC9G8F+6X"));
        assert!(is_valid("8FVC0000+"));
        assert!(is_valid("9G8F+6X"));
        assert!(!is_valid("8FVC9G8F6X"));
        assert!(!is_valid("8FVC9G8F+6"));
        assert!(!is_valid("8FV+C9G8F"));
        assert!(!is_valid("8FVC00+"));
        assert!(!is_valid("8FVC0000+6X"));
        assert!(!is_valid("ABCD+12"));
        assert!(!is_valid("+"));
    }

    #[test]
    fn test_short_and_full() {
        assert!(is_full("8FVC9G8F+6X"));
        assert!(!is_short("8FVC9G8F+6X"));
        assert!(is_short("9G8F+6X"));
        assert!(!is_full("9G8F+6X"));
        // first latitude digit out of range
        assert!(!is_full("X2000000+"));
    }

    #[test]
    fn test_decode_known_code() {
        let area = decode("8FVC9G8F+6X").unwrap();
        assert_eq!(area.code_length, 10);
        let c = area.center();
        assert_abs_diff_eq!(c.lat, 47.3655625, epsilon = 1e-9);
        assert_abs_diff_eq!(c.lng, 8.5249375, epsilon = 1e-9);
    }

    #[test]
    fn test_decode_lowercase() {
        let upper = decode("8FVC9G8F+6X").unwrap();
        let lower = decode("8fvc9g8f+6x").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_decode_padded() {
        let area = decode("8FVC0000+").unwrap();
        assert_eq!(area.code_length, 4);
        assert_abs_diff_eq!(area.lat_hi - area.lat_lo, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_encode_contains_point() {
        for len in [2, 4, 6, 8, 10, 11, 13, 15] {
            let code = encode(RIYADH, len).unwrap();
            let area = decode(&code).unwrap();
            assert_eq!(area.code_length, len, "code {}", code);
            assert!(area.contains(RIYADH), "{} does not contain Riyadh", code);
        }
    }

    #[test]
    fn test_encode_rejects_odd_short_length() {
        assert_eq!(encode(RIYADH, 7), Err(PlusCodeError::InvalidLength(7)));
        assert_eq!(encode(RIYADH, 1), Err(PlusCodeError::InvalidLength(1)));
    }

    #[test]
    fn test_recover_known_short_code() {
        let full = recover_nearest("9G8F+6X", LatLng { lat: 47.4, lng: 8.6 }).unwrap();
        assert_eq!(full, "8FVC9G8F+6X");
    }

    #[test]
    fn test_recover_round_trip_near_riyadh() {
        let full = encode(RIYADH, 10).unwrap();
        let short = &full[4..];
        assert_eq!(recover_nearest(short, RIYADH).unwrap(), full);

        // a reference a few km away still recovers the same code
        let nearby = LatLng { lat: 24.75, lng: 46.62 };
        assert_eq!(recover_nearest(short, nearby).unwrap(), full);
    }

    #[test]
    fn test_recover_across_cell_boundary() {
        // point just north of a 1-degree line, reference just south of it
        let point = LatLng { lat: 25.02, lng: 46.7 };
        let full = encode(point, 10).unwrap();
        let short = &full[4..];
        let recovered = recover_nearest(short, LatLng { lat: 24.98, lng: 46.7 }).unwrap();
        assert_eq!(recovered, full);
    }

    #[test]
    fn test_recover_full_code_passthrough() {
        assert_eq!(recover_nearest("8fvc9g8f+6x", RIYADH).unwrap(), "8FVC9G8F+6X");
    }

    #[test]
    fn test_decode_near_invalid_token() {
        assert!(decode_near("ABCD+12", RIYADH).is_err());
        assert!(decode_near("not a code", RIYADH).is_err());
    }
}
