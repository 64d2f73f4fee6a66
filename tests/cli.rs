#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_download_without_youtube_entries_fails() {
    let dir = TempDir::new().unwrap();
    let ytdlp = dir.path().join("yt-dlp");
    fs::write(&ytdlp, "#!/bin/sh\necho 2025.01.01\n").unwrap();
    fs::set_permissions(&ytdlp, fs::Permissions::from_mode(0o755)).unwrap();

    let module = dir.path().join("masjids.ts");
    fs::write(
        &module,
        "export const MASJIDS: Masjid[] = [
  {
    id: 'n-001',
    readerName: 'a',
    masjidName: 'b',
    region: 'north',
    coordinates: { lat: 24.8, lng: 46.6 },
    googleMapsUrl: 'https://maps.app.goo.gl/x',
    audioUrl: 'https://cdn.example.com/n-001.m4a',
  },
]
",
    )
    .unwrap();
    let out_dir = dir.path().join("audio");

    let status = Command::new(env!("CARGO_BIN_EXE_masjid-prep"))
        .arg("download")
        .arg("--module")
        .arg(&module)
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("--yt-dlp")
        .arg(&ytdlp)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(!out_dir.join("manifest.json").exists());
}
