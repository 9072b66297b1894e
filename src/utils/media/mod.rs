use crate::bus::MediaKind;
use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Discord's upload limit for bots without boosts (10 MiB).
pub const MAX_MEDIA_BYTES: u64 = 10 * 1024 * 1024;

/// Outcome of a capped media download.
#[derive(Debug)]
pub enum MediaFetch {
    Downloaded(DownloadedMedia),
    /// The CDN answered 404: the reel or post is private or deleted.
    NotFound,
    /// The body reached the cap. `bytes` is what was seen before aborting.
    TooLarge { bytes: u64 },
}

/// A downloaded media file. The backing temp file is deleted on drop.
#[derive(Debug)]
pub struct DownloadedMedia {
    file: NamedTempFile,
    size: u64,
    file_name: String,
}

impl DownloadedMedia {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Return the directory used for temporary media, creating it if needed.
pub fn media_dir(configured: Option<&Path>) -> Result<PathBuf> {
    let dir = configured.map_or_else(|| std::env::temp_dir().join("reelay"), Path::to_path_buf);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create media directory: {}", dir.display()))?;
    Ok(dir)
}

/// File extension for a media URL. Reels are always mp4; posts keep a known
/// image extension from the URL path and default to jpg.
pub fn extension_for(url: &str, kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Reel => "mp4",
        MediaKind::Post => {
            let path = url::Url::parse(url)
                .map(|u| u.path().to_lowercase())
                .unwrap_or_else(|_| url.to_lowercase());
            if path.ends_with(".png") {
                "png"
            } else if path.ends_with(".jpeg") {
                "jpeg"
            } else {
                "jpg"
            }
        }
    }
}

/// Stream `url` into a temp file under `dir`, aborting once `max_bytes` is reached.
///
/// A `HEAD` probe runs first so private/deleted media is reported as
/// [`MediaFetch::NotFound`] without opening a download. Any partial file is
/// removed when the download is abandoned.
pub async fn download_media(
    client: &Client,
    url: &str,
    kind: MediaKind,
    max_bytes: u64,
    dir: &Path,
) -> Result<MediaFetch> {
    let head = client
        .head(url)
        .send()
        .await
        .with_context(|| format!("HEAD request for {} failed", kind))?;
    if head.status() == StatusCode::NOT_FOUND {
        info!("{} URL returned 404 (likely private/deleted)", kind);
        return Ok(MediaFetch::NotFound);
    }
    if !head.status().is_success() {
        bail!("{} URL returned status {}", kind, head.status());
    }

    let mut resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET request for {} failed", kind))?;
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(MediaFetch::NotFound);
    }
    if !resp.status().is_success() {
        bail!("failed to download {}: status {}", kind, resp.status());
    }

    if let Some(len) = resp.content_length()
        && len >= max_bytes
    {
        info!("{} too large: {} bytes", kind, len);
        return Ok(MediaFetch::TooLarge { bytes: len });
    }

    let ext = extension_for(url, kind);
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}_", kind))
        .suffix(&format!(".{}", ext))
        .tempfile_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;

    let mut total: u64 = 0;
    while let Some(chunk) = resp.chunk().await? {
        total += chunk.len() as u64;
        if total >= max_bytes {
            info!("{} too large: {} bytes (aborted mid-stream)", kind, total);
            return Ok(MediaFetch::TooLarge { bytes: total });
        }
        file.write_all(&chunk)
            .context("failed to write media chunk")?;
    }
    file.flush().context("failed to flush media file")?;

    debug!("downloaded {} ({} bytes) to {}", kind, total, file.path().display());
    Ok(MediaFetch::Downloaded(DownloadedMedia {
        file_name: format!("{}.{}", kind, ext),
        file,
        size: total,
    }))
}
