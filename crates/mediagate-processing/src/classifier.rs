//! Content-based media classification.
//!
//! Only the leading bytes of the stored file are trusted. Client supplied
//! extensions and Content-Type headers never influence the result.

use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 512;

/// Reported when no signature matches.
pub const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Unsupported,
}

impl MediaKind {
    pub fn of(mime: &str) -> Self {
        if is_video(mime) {
            MediaKind::Video
        } else if is_audio(mime) {
            MediaKind::Audio
        } else {
            MediaKind::Unsupported
        }
    }
}

/// MIME type of a byte prefix by magic-number matching.
pub fn sniff(bytes: &[u8]) -> &'static str {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    infer::get(head)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_MIME)
}

/// Sniff the file at `path` from its first [`SNIFF_LEN`] bytes.
pub async fn classify(path: &Path) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut head = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = file.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(sniff(&head[..filled]).to_string())
}

pub fn is_video(mime: &str) -> bool {
    mime.starts_with("video/")
}

pub fn is_audio(mime: &str) -> bool {
    mime.starts_with("audio/")
}
