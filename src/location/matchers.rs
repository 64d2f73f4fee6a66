//! Coordinate matchers for Google Maps URLs.
//!
//! Each matcher is a pure function that looks for one encoding of a location
//! in the URL text and returns the raw decoded point. Matchers never apply the
//! bounding box; `first_match` does that, so an out-of-box decode can be told
//! apart from a URL the matcher does not recognise.

use super::types::{Candidate, LatLng, Method};
use crate::config::ResolverConfig;
use crate::geocode::{plus_code, s2};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

pub type Matcher = fn(&str, &ResolverConfig) -> Option<Candidate>;

/// Applied to the URL exactly as listed.
pub const DIRECT_MATCHERS: &[Matcher] = &[at_coords, data_params, ftid_cell];

/// Applied to a (twice) percent-decoded URL, usually one expanded from a short link.
pub const DECODED_MATCHERS: &[Matcher] = &[at_coords, data_params, ftid_cell, plus_code_query, ftid_param];

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Found(Candidate),
    /// Nothing in the box; the first candidate that fell outside it.
    Rejected(Candidate),
    NoMatch,
}

/// Run matchers in order; the first in-box candidate wins.
pub fn first_match(url: &str, matchers: &[Matcher], config: &ResolverConfig) -> MatchOutcome {
    let mut rejected = None;
    for matcher in matchers {
        let Some(candidate) = matcher(url, config) else {
            continue;
        };
        if config.bounds.contains(candidate.point) {
            return MatchOutcome::Found(candidate);
        }
        tracing::debug!(
            method = %candidate.method,
            lat = candidate.point.lat,
            lng = candidate.point.lng,
            "candidate outside bounding box"
        );
        rejected.get_or_insert(candidate);
    }
    rejected.map_or(MatchOutcome::NoMatch, MatchOutcome::Rejected)
}

pub fn extract_from_url(url: &str, config: &ResolverConfig) -> MatchOutcome {
    first_match(url, DIRECT_MATCHERS, config)
}

pub fn extract_from_resolved(resolved: &str, config: &ResolverConfig) -> MatchOutcome {
    let once = percent_decode(resolved);
    let decoded = percent_decode(&once);
    first_match(&decoded, DECODED_MATCHERS, config)
}

// ─── Matchers ───────────────────────────────────────────────────

/// `@24.7136,46.6753` path segment.
pub fn at_coords(url: &str, _config: &ResolverConfig) -> Option<Candidate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"@([-\d.]+),([-\d.]+)").unwrap());
    let caps = re.captures(url)?;
    let point = parse_pair(caps.get(1)?.as_str(), caps.get(2)?.as_str())?;
    Some(Candidate { point, method: Method::AtCoords })
}

/// `!3d24.7136!4d46.6753` data parameter.
pub fn data_params(url: &str, _config: &ResolverConfig) -> Option<Candidate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"!3d([-\d.]+)!4d([-\d.]+)").unwrap());
    let caps = re.captures(url)?;
    let point = parse_pair(caps.get(1)?.as_str(), caps.get(2)?.as_str())?;
    Some(Candidate { point, method: Method::DataParams })
}

/// Feature id (`ftid=0x…:0x…` or `!1s0x…:0x…`) whose first half is an S2 cell.
pub fn ftid_cell(url: &str, _config: &ResolverConfig) -> Option<Candidate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?:ftid=|!1s)(0x[0-9a-fA-F]+):0x[0-9a-fA-F]+").unwrap());
    let caps = re.captures(url)?;
    decode_cell(caps.get(1)?.as_str())
}

/// Plus Code in the `q` query parameter, recovered against the reference point.
pub fn plus_code_query(url: &str, config: &ResolverConfig) -> Option<Candidate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"([2-9CFGHJMPQRVWX]{4,8})[+ ]([2-9CFGHJMPQRVWX]{2,3})\b").unwrap()
    });
    let q = query_param(url, "q")?;
    let q = percent_decode(&q);
    let caps = re.captures(&q)?;
    let code = format!("{}+{}", caps.get(1)?.as_str(), caps.get(2)?.as_str());
    match plus_code::decode_near(&code, config.reference) {
        Ok(point) => Some(Candidate { point, method: Method::PlusCode }),
        Err(e) => {
            tracing::debug!(code = %code, error = %e, "plus code rejected");
            None
        }
    }
}

/// `ftid` query parameter that the path pattern did not catch.
pub fn ftid_param(url: &str, _config: &ResolverConfig) -> Option<Candidate> {
    let ftid = query_param(url, "ftid")?;
    let cell_hex = ftid.split(':').next()?;
    decode_cell(cell_hex)
}

fn decode_cell(hex: &str) -> Option<Candidate> {
    match s2::decode_hex(hex) {
        Ok(point) => Some(Candidate { point, method: Method::S2Cell }),
        Err(e) => {
            tracing::debug!(cell = hex, error = %e, "cell id rejected");
            None
        }
    }
}

fn parse_pair(lat: &str, lng: &str) -> Option<LatLng> {
    Some(LatLng {
        lat: lat.parse().ok()?,
        lng: lng.parse().ok()?,
    })
}

// ─── URL helpers ────────────────────────────────────────────────

/// Percent-decode, replacing invalid UTF-8. `+` is left alone.
pub fn percent_decode(s: &str) -> Cow<'_, str> {
    match urlencoding::decode_binary(s.as_bytes()) {
        Cow::Borrowed(_) => Cow::Borrowed(s),
        Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// First value of a query parameter, form-decoded (`+` becomes a space).
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or(query);
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if percent_decode(&key.replace('+', " ")) == name {
            Some(percent_decode(&value.replace('+', " ")).into_owned())
        } else {
            None
        }
    })
}

/// Lower-cased host of an absolute URL.
pub fn host(url: &str) -> Option<String> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(|c: char| c == '/' || c == '?' || c == '#').next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// Whether the URL points at one of the link shorteners (or a subdomain of one).
pub fn is_short_url(url: &str, short_hosts: &[String]) -> bool {
    let Some(host) = host(url) else {
        return false;
    };
    short_hosts.iter().any(|h| {
        let h = h.to_ascii_lowercase();
        host == h || host.ends_with(&format!(".{}", h))
    })
}
