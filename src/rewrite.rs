//! Point `audioUrl` entries at re-hosted files.
//!
//! Driven by the download manifest: each `audioUrl: '<sourceUrl>'` in the
//! data module becomes `audioUrl: '<base>/<filename>'`.

use crate::audio::Manifest;
use crate::datafile::escape_ts;
use crate::error::Result;
use std::fs;
use std::path::Path;

/// Default public location of the uploaded audio files.
pub const DEFAULT_BASE_URL: &str = "https://masjid.nawaf-alsheddi.com/youtube-audio";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub replaced: usize,
    /// Manifest ids whose source URL was not in the module.
    pub not_found: Vec<String>,
    pub youtube_remaining: usize,
    pub hosted: usize,
}

impl RewriteReport {
    pub fn print(&self) {
        if self.replaced > 0 {
            println!("\nUpdated {} audioUrl entries", self.replaced);
        } else {
            println!("\nNo changes made");
        }
        println!("  YouTube URLs remaining: {}", self.youtube_remaining);
        println!("  Hosted URLs: {}", self.hosted);
    }
}

/// Apply the manifest to the module text. Returns the new text and the report.
pub fn rewrite_audio_urls(text: &str, manifest: &Manifest, base_url: &str) -> (String, RewriteReport) {
    let base = base_url.trim_end_matches('/');
    let mut content = text.to_string();
    let mut report = RewriteReport::default();

    for (id, entry) in manifest {
        let from = format!("audioUrl: '{}'", escape_ts(&entry.source_url));
        if !content.contains(&from) {
            tracing::warn!(id = %id, url = %entry.source_url, "audioUrl not found in module");
            report.not_found.push(id.clone());
            continue;
        }
        let to = format!("audioUrl: '{}/{}'", base, escape_ts(&entry.filename));
        content = content.replace(&from, &to);
        report.replaced += 1;
    }

    let hosted_prefix = format!("audioUrl: '{}/", base);
    for line in content.lines() {
        let Some(pos) = line.find("audioUrl:") else {
            continue;
        };
        let rest = &line[pos..];
        if rest.contains("youtu") {
            report.youtube_remaining += 1;
        }
        if rest.starts_with(&hosted_prefix) {
            report.hosted += 1;
        }
    }

    (content, report)
}

/// Rewrite `module` in place. The file is only written when something changed.
pub fn rewrite_module(module: &Path, manifest: &Manifest, base_url: &str) -> Result<RewriteReport> {
    let original = fs::read_to_string(module)?;
    let (content, report) = rewrite_audio_urls(&original, manifest, base_url);
    if content != original {
        fs::write(module, content)?;
    }
    Ok(report)
}
