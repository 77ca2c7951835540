//! Persisting generated images.
//!
//! A terminal cannot show the bytes returned by the text-to-image endpoint, so
//! they are written to disk untouched and the resulting path is reported.

use chrono::{DateTime, Local};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

const MAX_NAME_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Unknown,
}

impl ImageFormat {
    /// Detects the container from its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
            ImageFormat::Png
        } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            ImageFormat::Jpeg
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            ImageFormat::Gif
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            ImageFormat::Webp
        } else {
            ImageFormat::Unknown
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
            ImageFormat::Unknown => "bin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDestination {
    /// Timestamped file inside this directory.
    Directory(PathBuf),
    /// Exact path; an existing file is replaced.
    File(PathBuf),
}

/// `image-<stamp>.<ext>`, or `image-<stamp>-<attempt>.<ext>` after a collision.
pub fn timestamped_file_name(stamp: &DateTime<Local>, format: ImageFormat, attempt: u32) -> String {
    let stamp = stamp.format("%Y%m%d-%H%M%S");
    let ext = format.extension();
    if attempt == 0 {
        format!("image-{stamp}.{ext}")
    } else {
        format!("image-{stamp}-{attempt}.{ext}")
    }
}

pub fn save_image(bytes: &[u8], destination: &ImageDestination) -> io::Result<PathBuf> {
    save_image_at(bytes, destination, &Local::now())
}

pub fn save_image_at(
    bytes: &[u8],
    destination: &ImageDestination,
    stamp: &DateTime<Local>,
) -> io::Result<PathBuf> {
    let saved = match destination {
        ImageDestination::File(path) => {
            let dir = parent_dir(path);
            std::fs::create_dir_all(&dir)?;
            let temp = write_temp(&dir, bytes)?;
            temp.persist(path).map_err(|err| err.error)?;
            path.clone()
        }
        ImageDestination::Directory(dir) => {
            std::fs::create_dir_all(dir)?;
            let format = ImageFormat::sniff(bytes);
            persist_unique(write_temp(dir, bytes)?, dir, stamp, format)?
        }
    };

    info!(path = %saved.display(), bytes = bytes.len(), "image saved");
    Ok(saved)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn write_temp(dir: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    Ok(temp)
}

/// Moves `temp` to the first free `image-<stamp>[-N].<ext>` name.
fn persist_unique(
    mut temp: NamedTempFile,
    dir: &Path,
    stamp: &DateTime<Local>,
    format: ImageFormat,
) -> io::Result<PathBuf> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = dir.join(timestamped_file_name(stamp, format, attempt));
        match temp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => temp = err.file,
            Err(err) => return Err(err.error),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free image name in {}", dir.display()),
    ))
}
