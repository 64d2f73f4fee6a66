use anyhow::Context;
use clap::{Parser, Subcommand};
use masjid_prep::audio::{self, YtDlp};
use masjid_prep::config::PrepConfig;
use masjid_prep::datafile;
use masjid_prep::location::{CoordinateCache, CoordinateResolver, HttpExpander};
use masjid_prep::masjid::ExtractedRecord;
use masjid_prep::rewrite;
use masjid_prep::sheet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Masjid Prep: data passes for the Riyadh masjid audio directory.
///
/// Examples:
///   masjid-prep coords riyadh_list.xlsx
///   masjid-prep generate
///   masjid-prep download
///   masjid-prep rewrite --base-url https://cdn.example.com/audio
#[derive(Parser)]
#[command(name = "masjid-prep", version, about, long_about = None)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// JSON config file overriding the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve each row's Google Maps link to coordinates.
    Coords {
        /// Spreadsheet (.xlsx) or CSV export of the worksheet.
        input: PathBuf,

        /// Coordinate cache file.
        #[arg(long, default_value = "scripts/coordinates_cache.json")]
        cache: PathBuf,

        /// Output JSON document.
        #[arg(long, short = 'o', default_value = "scripts/masjids_extracted.json")]
        output: PathBuf,
    },

    /// Render the TypeScript data module from the extracted JSON.
    Generate {
        #[arg(long, short = 'i', default_value = "scripts/masjids_extracted.json")]
        input: PathBuf,

        #[arg(long, short = 'o', default_value = "src/data/masjids.ts")]
        output: PathBuf,

        /// Source name stamped into the module header.
        #[arg(long, default_value = "riyadh_list.xlsx")]
        source_name: String,
    },

    /// Download YouTube audio referenced by the data module.
    Download {
        #[arg(long, default_value = "src/data/masjids.ts")]
        module: PathBuf,

        #[arg(long, short = 'o', default_value = "downloads/youtube-audio")]
        output_dir: PathBuf,

        /// yt-dlp binary; defaults to scripts/.venv/bin/yt-dlp, then PATH.
        #[arg(long)]
        yt_dlp: Option<PathBuf>,
    },

    /// Point audioUrl entries at the hosted copies listed in the manifest.
    Rewrite {
        #[arg(long, default_value = "src/data/masjids.ts")]
        module: PathBuf,

        #[arg(long, default_value = "downloads/youtube-audio/manifest.json")]
        manifest: PathBuf,

        #[arg(long, default_value = rewrite::DEFAULT_BASE_URL)]
        base_url: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = PrepConfig::load(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Commands::Coords { input, cache, output } => run_coords(&config, &input, cache, &output),
        Commands::Generate { input, output, source_name } => run_generate(&input, &output, &source_name),
        Commands::Download { module, output_dir, yt_dlp } => {
            run_download(&config, &module, &output_dir, yt_dlp)
        }
        Commands::Rewrite { module, manifest, base_url } => run_rewrite(&module, &manifest, &base_url),
    }
}

// ── Passes ──────────────────────────────────────────────────────

fn run_coords(config: &PrepConfig, input: &Path, cache_path: PathBuf, output: &Path) -> anyhow::Result<()> {
    let mut places = sheet::read_places(input, config.worksheet())
        .with_context(|| format!("reading {}", input.display()))?;
    println!("Loaded {} rows from {}", places.len(), input.display());

    let cache = CoordinateCache::load_from(cache_path);
    println!("Cache: {} entries", cache.len());

    let expander = HttpExpander::new(&config.resolver);
    let mut resolver = CoordinateResolver::new(cache, expander, config.resolver.clone());
    let summary = resolver.run(&mut places);

    let records: Vec<ExtractedRecord> = places.iter().map(ExtractedRecord::from).collect();
    datafile::write_extracted(output, &records).with_context(|| format!("writing {}", output.display()))?;

    summary.print();
    println!("\nOutput: {}", output.display());
    Ok(())
}

fn run_generate(input: &Path, output: &Path, source_name: &str) -> anyhow::Result<()> {
    let rendered = datafile::generate(input, output, source_name)
        .with_context(|| format!("generating {} from {}", output.display(), input.display()))?;

    for (region, count) in &rendered.counts {
        println!("  {}: {} entries", region.label(), count);
    }
    println!("  Total: {} entries", rendered.total());
    if rendered.skipped > 0 {
        println!("  Skipped: {} entries", rendered.skipped);
    }
    println!("\nGenerated: {}", output.display());
    Ok(())
}

fn run_download(config: &PrepConfig, module: &Path, output_dir: &Path, yt_dlp: Option<PathBuf>) -> anyhow::Result<()> {
    let mut fetcher = match yt_dlp {
        Some(program) => YtDlp::new(program, &config.download),
        None => YtDlp::locate(Path::new("."), &config.download),
    };
    println!("Using yt-dlp: {}", fetcher.program().display());
    let version = fetcher.version()?;
    println!("yt-dlp version: {}", version);

    let text = std::fs::read_to_string(module).with_context(|| format!("reading {}", module.display()))?;
    let entries = datafile::youtube_entries(&text);
    println!("\nFound {} YouTube audio entries in {}\n", entries.len(), module.display());
    if entries.is_empty() {
        anyhow::bail!("no YouTube audio entries in {}", module.display());
    }

    let report = audio::download_all(&entries, output_dir, &mut fetcher)?;
    report.print();
    Ok(())
}

fn run_rewrite(module: &Path, manifest_path: &Path, base_url: &str) -> anyhow::Result<()> {
    let manifest = audio::read_manifest(manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    println!("Loaded manifest with {} entries", manifest.len());

    let report = rewrite::rewrite_module(module, &manifest, base_url)
        .with_context(|| format!("rewriting {}", module.display()))?;
    for id in &report.not_found {
        println!("  WARNING: could not find audioUrl for {}", id);
    }
    report.print();
    Ok(())
}
