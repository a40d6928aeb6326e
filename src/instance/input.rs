//! Input sources — selection, validation, and acquisition.
//!
//! A tool accepts a local file, an `http(s)` URL, a base64 `data:` URL, or
//! in-memory bytes. Selection validates the source against the tool's
//! declared input kinds; acquisition turns the source into one owned byte
//! buffer, reporting download progress where the transport allows it.

use base64::Engine as _;
use bytes::Bytes;
use futures::StreamExt;
use std::path::{Path, PathBuf};

use crate::types::{Error, FetchConfig, Result};

/// Coarse media kind inferred from a source's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    const VIDEO_EXTENSIONS: &'static [&'static str] = &["mp4", "mov", "avi", "webm", "mkv"];
    const AUDIO_EXTENSIONS: &'static [&'static str] =
        &["mp3", "wav", "flac", "ogg", "m4a", "aac"];
    const IMAGE_EXTENSIONS: &'static [&'static str] =
        &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if Self::VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if Self::AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else if Self::IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }
}

/// A selected input awaiting acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Url(String),
    Bytes { name: String, data: Bytes },
}

impl InputSource {
    /// Display name for log lines (file name or last URL segment).
    pub fn display_name(&self) -> String {
        match self {
            InputSource::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            InputSource::Url(url) => {
                if url.starts_with("data:") {
                    "inline data".to_string()
                } else {
                    url.split('/')
                        .next_back()
                        .filter(|s| !s.is_empty())
                        .unwrap_or(url)
                        .split('?')
                        .next()
                        .unwrap_or(url)
                        .to_string()
                }
            }
            InputSource::Bytes { name, .. } => name.clone(),
        }
    }

    fn extension(&self) -> Option<String> {
        let name = match self {
            InputSource::File(path) => return extension_of(path),
            InputSource::Url(url) if url.starts_with("data:") => return None,
            InputSource::Url(_) => self.display_name(),
            InputSource::Bytes { name, .. } => name.clone(),
        };
        Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
    }

    /// Media kind inferred from the extension, if recognizable.
    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            InputSource::Url(url) if url.starts_with("data:") => {
                data_url_media_kind(url)
            }
            _ => self
                .extension()
                .as_deref()
                .and_then(MediaKind::from_extension),
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().into_owned())
}

fn data_url_media_kind(url: &str) -> Option<MediaKind> {
    let mime = url.strip_prefix("data:")?.split([';', ',']).next()?;
    match mime.split('/').next()? {
        "video" => Some(MediaKind::Video),
        "audio" => Some(MediaKind::Audio),
        "image" => Some(MediaKind::Image),
        _ => None,
    }
}

/// Validate a source against a tool's accepted kinds.
pub fn validate(source: &InputSource, accepted: &[MediaKind]) -> Result<MediaKind> {
    let kind = source.kind().ok_or_else(|| {
        Error::unsupported_input(format!(
            "cannot determine media kind of '{}'",
            source.display_name()
        ))
    })?;

    if accepted.contains(&kind) {
        Ok(kind)
    } else {
        Err(Error::unsupported_input(format!(
            "'{}' is {}, tool accepts: {}",
            source.display_name(),
            kind.describe(),
            accepted
                .iter()
                .map(|k| k.describe())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

/// Acquire the source's bytes, reporting progress through `on_progress`
/// (0-100, best effort; transports without a known length report coarsely).
pub async fn acquire(
    source: &InputSource,
    fetch: &FetchConfig,
    on_progress: &mut (dyn FnMut(f64) + Send),
) -> Result<Bytes> {
    match source {
        InputSource::Bytes { data, .. } => {
            on_progress(100.0);
            Ok(data.clone())
        }
        InputSource::File(path) => {
            let data = tokio::fs::read(path).await.map_err(|e| {
                Error::input_preparation(format!("read {}: {e}", path.display()))
            })?;
            guard_size(data.len() as u64, fetch)?;
            on_progress(100.0);
            Ok(Bytes::from(data))
        }
        InputSource::Url(url) if url.starts_with("data:") => {
            let data = decode_data_url(url)?;
            guard_size(data.len() as u64, fetch)?;
            on_progress(100.0);
            Ok(data)
        }
        InputSource::Url(url) => fetch_url(url, fetch, on_progress).await,
    }
}

fn guard_size(len: u64, fetch: &FetchConfig) -> Result<()> {
    if len > fetch.max_input_bytes {
        return Err(Error::input_preparation(format!(
            "input of {len} bytes exceeds limit of {} bytes",
            fetch.max_input_bytes
        )));
    }
    Ok(())
}

fn decode_data_url(url: &str) -> Result<Bytes> {
    let body = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| Error::input_preparation("malformed data: URL"))?;

    let (meta, payload) = body;
    if !meta.ends_with(";base64") {
        return Err(Error::input_preparation(
            "only base64-encoded data: URLs are supported",
        ));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map(Bytes::from)
        .map_err(|e| Error::input_preparation(format!("data: URL decode: {e}")))
}

async fn fetch_url(
    url: &str,
    fetch: &FetchConfig,
    on_progress: &mut (dyn FnMut(f64) + Send),
) -> Result<Bytes> {
    let client = reqwest::Client::builder()
        .timeout(fetch.timeout)
        .build()
        .map_err(|e| Error::input_preparation(format!("http client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::input_preparation(format!("fetch {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::input_preparation(format!(
            "fetch {url}: HTTP {}",
            response.status()
        )));
    }

    let total = response.content_length();
    if let Some(total) = total {
        guard_size(total, fetch)?;
    }

    let mut stream = response.bytes_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::input_preparation(format!("fetch {url}: {e}")))?;
        buf.extend_from_slice(&chunk);
        guard_size(buf.len() as u64, fetch)?;
        match total {
            Some(total) if total > 0 => {
                on_progress(buf.len() as f64 / total as f64 * 100.0);
            }
            // Unknown length: hold at a coarse mid-point until done
            _ => on_progress(50.0),
        }
    }
    on_progress(100.0);

    Ok(Bytes::from(buf))
}

/// Human-readable byte count: `0 B`, `1 KB`, `12.34 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exp])
}
