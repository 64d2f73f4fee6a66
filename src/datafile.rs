//! The extracted JSON document and the generated `masjids.ts` module.
//!
//! `render_module` produces the TypeScript data file the web app imports;
//! `parse_entries` reads the same layout back for the audio passes.

use crate::error::Result;
use crate::masjid::{ExtractedRecord, Region};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

// ─── Extracted JSON ─────────────────────────────────────────────

/// Write the coordinates pass output, pretty-printed with UTF-8 kept as is.
pub fn write_extracted(path: &Path, records: &[ExtractedRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

pub fn read_extracted(path: &Path) -> Result<Vec<ExtractedRecord>> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

// ─── Rendering ──────────────────────────────────────────────────

/// Escape for a single-quoted TypeScript string literal.
pub fn escape_ts(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn unescape_ts(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// A rendered module plus what went into it.
#[derive(Debug, Clone)]
pub struct RenderedModule {
    pub text: String,
    /// Entries written per region, in display order.
    pub counts: [(Region, usize); 3],
    /// Entries left out for missing coordinates or an unknown region.
    pub skipped: usize,
}

impl RenderedModule {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

pub fn render_module(records: &[ExtractedRecord], source_name: &str, date: NaiveDate) -> RenderedModule {
    let mut skipped = 0;
    let mut grouped: [Vec<&ExtractedRecord>; 3] = Default::default();

    for r in records {
        let Some(region) = r.region.region() else {
            tracing::warn!(reader = %r.reader_name, region = ?r.region, "unknown region, entry skipped");
            skipped += 1;
            continue;
        };
        if r.coordinates().is_none() {
            tracing::warn!(reader = %r.reader_name, url = %r.google_maps_url, "no coordinates, entry skipped");
            skipped += 1;
            continue;
        }
        let slot = Region::ALL.iter().position(|&x| x == region).unwrap_or(0);
        grouped[slot].push(r);
    }

    let total: usize = grouped.iter().map(Vec::len).sum();
    let mut out = String::new();
    out.push_str("/**\n * Masjid Data\n *\n");
    let _ = writeln!(out, " * {} masjids across 3 regions in Riyadh.", total);
    let _ = writeln!(out, " * Auto-generated from {} on {}.", source_name, date.format("%Y-%m-%d"));
    out.push_str(" */\n\nimport type { Masjid } from '@/types'\n\nexport const MASJIDS: Masjid[] = [\n");

    for (region, entries) in Region::ALL.iter().zip(&grouped) {
        let _ = writeln!(out, "  // ─── {} ───", region.label());
        for (idx, r) in entries.iter().enumerate() {
            render_entry(&mut out, *region, idx + 1, r);
        }
        out.push('\n');
    }
    out.push_str("]\n");

    RenderedModule {
        text: out,
        counts: [
            (Region::North, grouped[0].len()),
            (Region::East, grouped[1].len()),
            (Region::WestSouth, grouped[2].len()),
        ],
        skipped,
    }
}

fn render_entry(out: &mut String, region: Region, n: usize, r: &ExtractedRecord) {
    let (lat, lng) = (r.lat.unwrap_or_default(), r.lng.unwrap_or_default());
    out.push_str("  {\n");
    let _ = writeln!(out, "    id: '{}-{:03}',", region.id_prefix(), n);
    let _ = writeln!(out, "    readerName: '{}',", escape_ts(&r.reader_name));
    let _ = writeln!(out, "    masjidName: '{}',", escape_ts(&r.masjid_name));
    let _ = writeln!(out, "    region: '{}',", region.key());
    let _ = writeln!(out, "    coordinates: {{ lat: {}, lng: {} }},", lat, lng);
    let _ = writeln!(out, "    googleMapsUrl: '{}',", escape_ts(&r.google_maps_url));
    let _ = writeln!(out, "    audioUrl: '{}',", escape_ts(&r.audio_url));
    if let Some(notes) = r.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "    notes: '{}',", escape_ts(notes));
    }
    out.push_str("  },\n");
}

/// Render `input` into `output`, stamping today's date.
pub fn generate(input: &Path, output: &Path, source_name: &str) -> Result<RenderedModule> {
    let records = read_extracted(input)?;
    let rendered = render_module(&records, source_name, chrono::Local::now().date_naive());
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &rendered.text)?;
    Ok(rendered)
}

// ─── Parsing ────────────────────────────────────────────────────

/// One entry read back from a data module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEntry {
    pub id: String,
    pub reader_name: String,
    pub masjid_name: String,
    pub region: String,
    pub audio_url: String,
}

/// Parse every entry with the generated field layout. Entries with an
/// empty `audioUrl` are not returned.
pub fn parse_entries(text: &str) -> Vec<DataEntry> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?s)\{\s*",
            r"id:\s*'((?:[^'\\]|\\.)+)'\s*,\s*",
            r"readerName:\s*'((?:[^'\\]|\\.)+)'\s*,\s*",
            r"masjidName:\s*'((?:[^'\\]|\\.)+)'\s*,\s*",
            r"region:\s*'([^']+)'\s*,\s*",
            r"coordinates:\s*\{[^}]+\}\s*,\s*",
            r"googleMapsUrl:\s*'(?:[^'\\]|\\.)*'\s*,\s*",
            r"audioUrl:\s*'((?:[^'\\]|\\.)+)'\s*,?",
            r"[^}]*\}",
        ))
        .unwrap()
    });

    re.captures_iter(text)
        .map(|caps| DataEntry {
            id: unescape_ts(&caps[1]),
            reader_name: unescape_ts(&caps[2]),
            masjid_name: unescape_ts(&caps[3]),
            region: caps[4].to_string(),
            audio_url: unescape_ts(&caps[5]),
        })
        .collect()
}

/// Entries whose audio still points at YouTube.
pub fn youtube_entries(text: &str) -> Vec<DataEntry> {
    parse_entries(text)
        .into_iter()
        .filter(|e| e.audio_url.contains("youtu"))
        .collect()
}
