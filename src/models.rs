//! Known whisper.cpp GGML models and a crash-safe downloader for them.
//!
//! Only multilingual models are listed; the English-only `.en` variants cannot transcribe
//! Hebrew lessons.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use reqwest::blocking::Client;

use crate::Result;
use crate::atomic_write::write_atomically;

const HF_BASE: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/";

/// Download source for a known model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    /// Name users type (e.g. "large-v3-turbo").
    pub name: &'static str,

    /// File written to disk (e.g. "ggml-large-v3-turbo.bin").
    pub filename: &'static str,
}

impl ModelSpec {
    pub fn url(&self) -> String {
        format!("{HF_BASE}{}", self.filename)
    }
}

macro_rules! models {
    ($($name:literal),* $(,)?) => {
        &[$(ModelSpec { name: $name, filename: concat!("ggml-", $name, ".bin") }),*]
    };
}

pub static WHISPER_MODELS: &[ModelSpec] = models![
    "tiny",
    "tiny-q5_1",
    "tiny-q8_0",
    "base",
    "base-q5_1",
    "base-q8_0",
    "small",
    "small-q5_1",
    "small-q8_0",
    "medium",
    "medium-q5_0",
    "medium-q8_0",
    "large-v2",
    "large-v2-q5_0",
    "large-v3",
    "large-v3-q5_0",
    "large-v3-turbo",
    "large-v3-turbo-q5_0",
    "large-v3-turbo-q8_0",
];

pub fn lookup_model(name: &str) -> Option<&'static ModelSpec> {
    WHISPER_MODELS.iter().find(|m| m.name == name)
}

pub fn model_list_string() -> String {
    let mut out = String::from("Whisper models:\n");
    for m in WHISPER_MODELS {
        out.push_str("  - ");
        out.push_str(m.name);
        out.push('\n');
    }
    out
}

/// Fetch `url` into `dest`. `progress` receives `(bytes so far, total if known)`.
///
/// An existing `dest` is left alone and reported as `Ok(false)`.
pub fn download_to_path<P>(client: &Client, url: &str, dest: &Path, progress: P) -> Result<bool>
where
    P: FnMut(u64, Option<u64>),
{
    if dest.exists() {
        return Ok(false);
    }

    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("download failed (bad status): {url}"))?;

    let total = resp.content_length();
    download_to_path_with_reader(resp, total, dest, progress)?;
    Ok(true)
}

/// Stream `reader` into `dest` through a `.part` file that is renamed on success and
/// removed on failure.
pub fn download_to_path_with_reader<R, P>(
    mut reader: R,
    total_bytes: Option<u64>,
    dest: &Path,
    mut progress: P,
) -> Result<()>
where
    R: Read,
    P: FnMut(u64, Option<u64>),
{
    write_atomically(dest, |file| {
        let mut buf = [0u8; 64 * 1024];
        let mut written = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            written += n as u64;
            progress(written, total_bytes);
        }
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic_write::part_path;

    #[test]
    fn lookup_model_finds_multilingual_specs_only() {
        let small = lookup_model("small").expect("expected small model spec");
        assert_eq!(small.filename, "ggml-small.bin");
        assert_eq!(
            small.url(),
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin"
        );

        assert!(lookup_model("large-v3-turbo").is_some());
        assert!(lookup_model("small.en").is_none());
        assert!(lookup_model("definitely-not-a-model").is_none());
    }

    #[test]
    fn model_list_string_includes_known_names() {
        let list = model_list_string();
        assert!(list.starts_with("Whisper models:\n"));
        assert!(list.contains("  - tiny\n"));
        assert!(list.contains("  - large-v3-turbo-q8_0\n"));
    }

    #[test]
    fn download_to_path_with_reader_writes_and_reports_progress() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("models/ggml-tiny.bin");

        let bytes = b"abc123".to_vec();
        let mut seen = Vec::new();
        download_to_path_with_reader(
            std::io::Cursor::new(bytes.clone()),
            Some(bytes.len() as u64),
            &dest,
            |done, total| seen.push((done, total)),
        )?;

        assert_eq!(std::fs::read(&dest)?, bytes);
        assert!(!part_path(&dest).exists());
        assert_eq!(seen.last(), Some(&(6, Some(6))));
        Ok(())
    }

    struct ErrorAfterNBytes {
        bytes: Vec<u8>,
        fail_at: usize,
        pos: usize,
    }

    impl Read for ErrorAfterNBytes {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.fail_at {
                return Err(std::io::Error::other("simulated read failure"));
            }

            let remaining = &self.bytes[self.pos..];
            let n = remaining.len().min(buf.len()).min(self.fail_at - self.pos);
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn failed_download_leaves_nothing_behind() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("ggml-tiny.bin");

        let reader = ErrorAfterNBytes {
            bytes: b"abc123".to_vec(),
            fail_at: 2,
            pos: 0,
        };

        let err = download_to_path_with_reader(reader, Some(6), &dest, |_, _| {}).unwrap_err();
        assert!(err.to_string().contains("simulated read failure"));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
        Ok(())
    }

    #[test]
    fn existing_destination_is_not_downloaded_again() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("ggml-tiny.bin");
        std::fs::write(&dest, b"cached")?;

        let client = Client::builder().build()?;
        let downloaded = download_to_path(&client, "http://127.0.0.1:9/never", &dest, |_, _| {})?;

        assert!(!downloaded);
        assert_eq!(std::fs::read(&dest)?, b"cached");
        Ok(())
    }
}
