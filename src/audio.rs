//! Audio download through `yt-dlp`.
//!
//! Every YouTube `audioUrl` in the data module is fetched to
//! `<output_dir>/<id>.<ext>`. Files already on disk are kept. The run
//! writes `manifest.json` (downloaded and kept files) and, when anything
//! failed, `failed.json` with the entries to retry.

use crate::config::DownloadConfig;
use crate::datafile::DataEntry;
use crate::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Extensions `yt-dlp` may produce for an audio-only download.
pub const AUDIO_EXTENSIONS: [&str; 6] = ["m4a", "webm", "opus", "ogg", "mp3", "aac"];

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FAILED_FILE: &str = "failed.json";

// ─── Manifest ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub filename: String,
    pub reader_name: String,
    pub masjid_name: String,
    pub region: String,
    pub source_url: String,
}

impl ManifestEntry {
    fn new(entry: &DataEntry, filename: String) -> Self {
        Self {
            filename,
            reader_name: entry.reader_name.clone(),
            masjid_name: entry.masjid_name.clone(),
            region: entry.region.clone(),
            source_url: entry.audio_url.clone(),
        }
    }
}

/// Masjid id → downloaded file.
pub type Manifest = BTreeMap<String, ManifestEntry>;

pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

// ─── Fetchers ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not start downloader: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("downloader exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("timeout after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("no audio file was written")]
    NoOutput,
}

/// Downloads one URL into `output_dir`, naming the file after `id`.
/// Returns the file name that was written.
pub trait AudioFetcher {
    fn fetch(&mut self, url: &str, output_dir: &Path, id: &str) -> std::result::Result<String, FetchError>;
}

/// Drives the `yt-dlp` binary.
pub struct YtDlp {
    program: PathBuf,
    format: String,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(program: PathBuf, config: &DownloadConfig) -> Self {
        Self {
            program,
            format: config.audio_format.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Prefer the project's virtualenv copy, else whatever is on `PATH`.
    pub fn locate(project_root: &Path, config: &DownloadConfig) -> Self {
        let venv = project_root.join("scripts").join(".venv").join("bin").join("yt-dlp");
        let program = if venv.exists() { venv } else { PathBuf::from("yt-dlp") };
        Self::new(program, config)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run `--version`; a missing or broken binary is a setup error.
    pub fn version(&self) -> Result<String> {
        let missing = |message: String| PrepError::MissingTool {
            tool: self.program.display().to_string(),
            message,
        };
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| missing(e.to_string()))?;
        if !output.status.success() {
            return Err(missing(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl AudioFetcher for YtDlp {
    fn fetch(&mut self, url: &str, output_dir: &Path, id: &str) -> std::result::Result<String, FetchError> {
        let template = output_dir.join(format!("{}.%(ext)s", id));
        let mut child = Command::new(&self.program)
            .arg("--format")
            .arg(&self.format)
            .arg("--output")
            .arg(&template)
            .args(["--no-playlist", "--quiet", "--no-warnings"])
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Read concurrently: the child blocks once the pipe buffer is full.
        let stderr_pipe = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_string(&mut buf);
            }
            buf
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FetchError::Timeout(self.timeout));
            }
            thread::sleep(Duration::from_millis(200));
        };

        let stderr = stderr_reader.join().unwrap_or_default();
        if !status.success() {
            return Err(FetchError::Failed {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        existing_audio(output_dir, id)
            .map(|(name, _)| name)
            .ok_or(FetchError::NoOutput)
    }
}

/// First non-empty `<id>.<ext>` audio file in `dir`, with its size in bytes.
pub fn existing_audio(dir: &Path, id: &str) -> Option<(String, u64)> {
    AUDIO_EXTENSIONS.iter().find_map(|ext| {
        let name = format!("{}.{}", id, ext);
        let len = fs::metadata(dir.join(&name)).ok()?.len();
        (len > 0).then_some((name, len))
    })
}

// ─── Batch ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: Vec<DataEntry>,
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub failed_path: Option<PathBuf>,
}

impl DownloadReport {
    pub fn print(&self) {
        let rule = "=".repeat(50);
        println!("\n{}\nDOWNLOAD COMPLETE\n{}", rule, rule);
        println!("  Success:  {}", self.downloaded);
        println!("  Skipped:  {}", self.skipped);
        println!("  Failed:   {}", self.failed.len());
        println!("  Total:    {}", self.total);
        println!("\n  Manifest: {}", self.manifest_path.display());
        if let Some(path) = &self.failed_path {
            println!("  Failed:   {}", path.display());
        }
    }
}

/// Download every entry in order. Per-entry failures are collected, never raised.
pub fn download_all<F: AudioFetcher>(
    entries: &[DataEntry],
    output_dir: &Path,
    fetcher: &mut F,
) -> Result<DownloadReport> {
    fs::create_dir_all(output_dir)?;
    let total = entries.len();
    let mut report = DownloadReport {
        total,
        ..DownloadReport::default()
    };

    for (i, entry) in entries.iter().enumerate() {
        let n = i + 1;
        if let Some((filename, _)) = existing_audio(output_dir, &entry.id) {
            println!("[{}/{}] SKIP {} (already exists: {})", n, total, entry.id, filename);
            report.skipped += 1;
            report.manifest.insert(entry.id.clone(), ManifestEntry::new(entry, filename));
            continue;
        }

        println!("[{}/{}] Downloading {} from {}...", n, total, entry.id, entry.audio_url);
        match fetcher.fetch(&entry.audio_url, output_dir, &entry.id) {
            Ok(filename) => {
                let size_kb = fs::metadata(output_dir.join(&filename))
                    .map(|m| m.len() as f64 / 1024.0)
                    .unwrap_or(0.0);
                println!("  OK ({:.0} KB) -> {}", size_kb, filename);
                report.downloaded += 1;
                report.manifest.insert(entry.id.clone(), ManifestEntry::new(entry, filename));
            }
            Err(e) => {
                println!("  FAIL: {}", e);
                tracing::warn!(id = %entry.id, url = %entry.audio_url, error = %e, "download failed");
                report.failed.push(entry.clone());
            }
        }
    }

    report.manifest_path = output_dir.join(MANIFEST_FILE);
    write_json(&report.manifest_path, &report.manifest)?;
    if !report.failed.is_empty() {
        let path = output_dir.join(FAILED_FILE);
        write_json(&path, &report.failed)?;
        report.failed_path = Some(path);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Writes a small file for known ids and fails the rest.
    struct FakeFetcher {
        ok: Vec<&'static str>,
        calls: Vec<String>,
    }

    impl AudioFetcher for FakeFetcher {
        fn fetch(&mut self, _url: &str, output_dir: &Path, id: &str) -> std::result::Result<String, FetchError> {
            self.calls.push(id.to_string());
            if !self.ok.iter().any(|ok| *ok == id) {
                return Err(FetchError::Failed {
                    status: "exit status: 1".into(),
                    stderr: "Video unavailable".into(),
                });
            }
            let name = format!("{}.webm", id);
            fs::write(output_dir.join(&name), vec![0u8; 2048])?;
            Ok(name)
        }
    }

    fn entry(id: &str) -> DataEntry {
        DataEntry {
            id: id.into(),
            reader_name: format!("قارئ {}", id),
            masjid_name: format!("جامع {}", id),
            region: "north".into(),
            audio_url: format!("https://youtu.be/{}", id),
        }
    }

    #[test]
    fn test_existing_audio() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("n-001.m4a"), b"").unwrap();
        fs::write(dir.path().join("n-001.txt"), b"notes").unwrap();
        assert_eq!(existing_audio(dir.path(), "n-001"), None);

        fs::write(dir.path().join("n-001.opus"), b"abc").unwrap();
        assert_eq!(existing_audio(dir.path(), "n-001"), Some(("n-001.opus".into(), 3)));
    }

    #[test]
    fn test_download_all() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("n-001.m4a"), b"already here").unwrap();
        let mut fetcher = FakeFetcher { ok: vec!["n-002"], calls: vec![] };
        let entries = vec![entry("n-001"), entry("n-002"), entry("e-001")];

        let report = download_all(&entries, dir.path(), &mut fetcher).unwrap();
        assert_eq!(fetcher.calls, vec!["n-002", "e-001"]);
        assert_eq!(report.total, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.downloaded, 1);
        assert_eq!(report.failed, vec![entry("e-001")]);

        let manifest = read_manifest(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest["n-001"].filename, "n-001.m4a");
        assert_eq!(manifest["n-002"].filename, "n-002.webm");
        assert_eq!(manifest["n-002"].source_url, "https://youtu.be/n-002");

        let failed: Vec<DataEntry> =
            serde_json::from_str(&fs::read_to_string(dir.path().join(FAILED_FILE)).unwrap()).unwrap();
        assert_eq!(failed[0].id, "e-001");
    }

    #[test]
    fn test_no_failed_file_when_clean() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = FakeFetcher { ok: vec!["ws-001"], calls: vec![] };
        let report = download_all(&[entry("ws-001")], dir.path(), &mut fetcher).unwrap();
        assert!(report.failed_path.is_none());
        assert!(!dir.path().join(FAILED_FILE).exists());
    }

    #[test]
    fn test_manifest_json_shape() {
        let e = ManifestEntry::new(&entry("n-003"), "n-003.m4a".into());
        let value = serde_json::to_value(&e).unwrap();
        assert_eq!(value["sourceUrl"], "https://youtu.be/n-003");
        assert_eq!(value["readerName"], "قارئ n-003");
    }

    #[test]
    fn test_missing_binary() {
        let ytdlp = YtDlp::new(PathBuf::from("/nonexistent/yt-dlp"), &DownloadConfig::default());
        assert!(matches!(ytdlp.version(), Err(PrepError::MissingTool { .. })));
    }

    /// Install a shell script standing in for yt-dlp. A child shell writes it,
    /// so no writable descriptor to it is ever open in this process (ETXTBSY).
    #[cfg(unix)]
    fn fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
        use std::io::Write;
        let path = dir.join("yt-dlp");
        let mut sh = Command::new("sh")
            .args(["-c", "cat > \"$0\" && chmod 755 \"$0\""])
            .arg(&path)
            .stdin(Stdio::piped())
            .spawn()
            .unwrap();
        let mut stdin = sh.stdin.take().unwrap();
        write!(stdin, "#!/bin/sh\n{}\n", body).unwrap();
        drop(stdin);
        assert!(sh.wait().unwrap().success());
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_noisy_failure_is_not_a_timeout() {
        let dir = TempDir::new().unwrap();
        // well past the pipe buffer before exiting
        let program = fake_ytdlp(dir.path(), "head -c 300000 /dev/zero | tr '\\0' x >&2\nexit 1");
        let config = DownloadConfig { timeout_secs: 30, ..DownloadConfig::default() };
        let mut ytdlp = YtDlp::new(program, &config);

        let started = Instant::now();
        match ytdlp.fetch("https://youtu.be/a", dir.path(), "n-001") {
            Err(FetchError::Failed { stderr, .. }) => assert_eq!(stderr.len(), 300_000),
            other => panic!("expected a failed download, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_download_times_out() {
        let dir = TempDir::new().unwrap();
        let program = fake_ytdlp(dir.path(), "sleep 5");
        let config = DownloadConfig { timeout_secs: 1, ..DownloadConfig::default() };
        let mut ytdlp = YtDlp::new(program, &config);
        assert!(matches!(
            ytdlp.fetch("https://youtu.be/a", dir.path(), "n-001"),
            Err(FetchError::Timeout(_))
        ));
    }

    #[test]
    fn test_locate_falls_back_to_path() {
        let dir = TempDir::new().unwrap();
        let ytdlp = YtDlp::locate(dir.path(), &DownloadConfig::default());
        assert_eq!(ytdlp.program(), Path::new("yt-dlp"));
    }
}
