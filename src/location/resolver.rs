//! Coordinate resolver: orchestrates the fallback chain.
//!
//! Flow per URL: cache → direct matchers (`@lat,lng`, `!3d!4d`, ftid cell)
//! → short-link expansion (shortener hosts only) → decoded matchers
//! (adds Plus Code and ftid parameter) → failure.

use super::cache::CoordinateCache;
use super::expander::UrlExpander;
use super::matchers::{self, MatchOutcome};
use super::types::{Candidate, FailureReason, Resolution};
use crate::config::ResolverConfig;
use crate::masjid::PlaceRecord;
use std::collections::BTreeMap;

/// Resolves map URLs to coordinates, caching every success.
pub struct CoordinateResolver<E: UrlExpander> {
    cache: CoordinateCache,
    expander: E,
    config: ResolverConfig,
}

impl<E: UrlExpander> CoordinateResolver<E> {
    pub fn new(cache: CoordinateCache, expander: E, config: ResolverConfig) -> Self {
        Self { cache, expander, config }
    }

    /// Resolve one URL. Never fails hard; every problem becomes `Resolution::Failed`.
    pub fn resolve(&mut self, url: &str) -> Resolution {
        // 1. Cache
        if let Some(entry) = self.cache.get(url) {
            return Resolution::Found {
                point: entry.point(),
                method: entry.method(),
                cached: true,
            };
        }

        let mut rejected: Option<Candidate> = None;

        // 2–3. Coordinates or a cell id in the URL itself
        match matchers::extract_from_url(url, &self.config) {
            MatchOutcome::Found(c) => return self.remember(url, c),
            MatchOutcome::Rejected(c) => {
                rejected.get_or_insert(c);
            }
            MatchOutcome::NoMatch => {}
        }

        // 4. Expand short links; full URLs get the decoded pass as they are
        let target = if matchers::is_short_url(url, &self.config.short_url_hosts) {
            match self.expander.expand(url) {
                Ok(resolved) => {
                    tracing::debug!(url, resolved = %resolved, "short link expanded");
                    resolved
                }
                Err(e) => {
                    tracing::warn!(url, error = %e, "short link expansion failed");
                    return Resolution::Failed(FailureReason::Network(e.to_string()));
                }
            }
        } else {
            url.to_string()
        };

        match matchers::extract_from_resolved(&target, &self.config) {
            MatchOutcome::Found(c) => return self.remember(url, c),
            MatchOutcome::Rejected(c) => {
                rejected.get_or_insert(c);
            }
            MatchOutcome::NoMatch => {}
        }

        // 5. Nothing usable
        Resolution::Failed(rejected.map_or(FailureReason::NoMatch, FailureReason::OutOfBounds))
    }

    fn remember(&mut self, url: &str, c: Candidate) -> Resolution {
        self.cache.put(url, c.point, c.method);
        Resolution::Found {
            point: c.point,
            method: c.method,
            cached: false,
        }
    }

    /// Resolve every record in place, flushing the cache every
    /// `flush_every` records and once at the end.
    pub fn run(&mut self, places: &mut [PlaceRecord]) -> RunSummary {
        let total = places.len();
        let flush_every = self.config.flush_every.max(1);
        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };

        for (i, place) in places.iter_mut().enumerate() {
            let n = i + 1;
            let resolution = self.resolve(&place.google_maps_url);
            place.coordinates = resolution.point();

            match &resolution {
                Resolution::Found { point, method, cached } => {
                    summary.succeeded += 1;
                    if *cached {
                        summary.cache_hits += 1;
                    }
                    *summary.by_method.entry(method.tag()).or_insert(0) += 1;
                    println!(
                        "  [{}] {}/{}: {} -> {}{}",
                        method,
                        n,
                        total,
                        place.reader_name,
                        point,
                        if *cached { " (cached)" } else { "" }
                    );
                }
                Resolution::Failed(reason) => {
                    println!("  [FAIL] {}/{}: {} - {}", n, total, place.reader_name, reason);
                    summary.failures.push(FailedRow {
                        row: n,
                        reader_name: place.reader_name.clone(),
                        url: place.google_maps_url.clone(),
                        reason: reason.clone(),
                    });
                }
            }

            if n % flush_every == 0 && self.flush_cache() {
                println!("  ... cache saved ({}/{})", n, total);
            }
        }

        self.flush_cache();
        summary
    }

    /// Flush, downgrading a write failure to a warning. Returns whether the file was written.
    fn flush_cache(&mut self) -> bool {
        match self.cache.flush() {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!(path = %self.cache.path().display(), error = %e, "cache flush failed");
                false
            }
        }
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    pub fn expander(&self) -> &E {
        &self.expander
    }
}

/// A record that could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRow {
    /// 1-based position in the input.
    pub row: usize,
    pub reader_name: String,
    pub url: String,
    pub reason: FailureReason,
}

/// Counts for the end-of-run report.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub cache_hits: usize,
    /// Successes per method tag, cache hits under their stored tag.
    pub by_method: BTreeMap<&'static str, usize>,
    pub failures: Vec<FailedRow>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn print(&self) {
        println!(
            "\nResults: {} success, {} failed out of {}",
            self.succeeded,
            self.failed(),
            self.total
        );
        println!("\nMethods used:");
        for (method, count) in &self.by_method {
            println!("  {}: {}", method, count);
        }
        if !self.failures.is_empty() {
            println!("\nFailed entries:");
            for f in &self.failures {
                println!("  Row {}: {} - {} ({})", f.row, f.reader_name, f.url, f.reason);
            }
        }
    }
}
