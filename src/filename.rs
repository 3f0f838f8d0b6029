use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs::{File, OpenOptions};

use crate::model::OutputFormat;

static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="?([^"]+)"?"#).expect("valid filename pattern"));

/// Filename suggested by a `Content-Disposition` header, if it names one.
///
/// Only the plain `filename=` parameter is understood; the RFC 5987
/// `filename*=` form is not decoded.
pub fn from_content_disposition(header: &str) -> Option<String> {
    FILENAME_RE
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
}

/// `download.mp3` for audio, `download.mp4` otherwise
pub fn default_filename(format: OutputFormat) -> String {
    format!("download.{}", format.default_extension())
}

/// Picks the name a downloaded file is saved under
pub fn resolve(content_disposition: Option<&str>, format: OutputFormat) -> String {
    content_disposition
        .and_then(from_content_disposition)
        .map(|name| sanitize(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| default_filename(format))
}

/// Strips characters that cannot appear in a single path component
pub fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string()
}

/// Upper bound on " (n)" suffixes tried before giving up
const MAX_SUFFIX: u32 = 10_000;

/// Name tried on the `n`th attempt: `filename` itself, then "stem (n).ext"
pub fn candidate(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    match path.extension() {
        Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({n})"),
    }
}

/// Creates a new file for `filename` in `dir` without touching existing ones.
///
/// Each candidate is opened with `create_new`, so two downloads racing for
/// the same name end up in different files.
pub async fn create_unique(dir: &Path, filename: &str) -> io::Result<(PathBuf, File)> {
    for n in 0..=MAX_SUFFIX {
        let path = dir.join(candidate(filename, n));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {filename}"),
    ))
}
