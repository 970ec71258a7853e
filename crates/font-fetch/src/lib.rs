//! Font Fetch - download-once font assets
//!
//! Fonts used for CJK text are large and rarely installed, so they are
//! fetched on first use and kept next to the job that needs them:
//!
//! ```ignore
//! use font_fetch::{load_font, FetchOptions, FontSource, WQY_MICROHEI_URL};
//!
//! let source = FontSource::new("wqy-microhei.ttc").with_url(WQY_MICROHEI_URL);
//! let data = load_font(&source, &FetchOptions::default())?;
//! ```
//!
//! The existence check and the download target are always the same path,
//! and a download only becomes visible at that path once it is complete.

use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// WenQuanYi Micro Hei, a TrueType collection covering simplified and traditional Chinese
pub const WQY_MICROHEI_URL: &str =
    "https://github.com/mzyy94/wqy-microhei/raw/master/wqy-microhei.ttc";

/// Errors that can occur while locating or downloading a font
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Font file {0} does not exist and no download URL is configured")]
    Missing(PathBuf),

    #[error("Failed to download {url}: {message}")]
    Http { url: String, message: String },

    #[error("Download of {url} failed with HTTP status {code}")]
    Status { url: String, code: u16 },

    #[error("{path} is not a usable font: {message}")]
    InvalidFont { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Where a font lives locally and where to get it from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSource {
    /// Local path, used both as cache check and download target
    pub path: PathBuf,
    /// Download URL; without one the font must already exist
    pub url: Option<String>,
    /// Face index the caller intends to use (checked when verifying)
    pub index: u32,
    /// Parse the file before accepting it
    pub verify: bool,
}

impl FontSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            url: None,
            index: 0,
            verify: true,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Accept any bytes without parsing them as a font
    pub fn without_verification(mut self) -> Self {
        self.verify = false;
        self
    }
}

/// HTTP settings for downloads
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Overall request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            user_agent: concat!("zhpdf/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// What `ensure_font` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file was already present
    Cached,
    /// The file was downloaded
    Downloaded { bytes: u64 },
}

/// Make sure the font exists at `source.path`, downloading it if needed
///
/// An existing file that fails verification is replaced when a URL is
/// available, and reported as `InvalidFont` otherwise.
pub fn ensure_font(source: &FontSource, options: &FetchOptions) -> Result<(PathBuf, FetchOutcome)> {
    if source.path.is_file() {
        match verify_file(source) {
            Ok(()) => {
                debug!("using cached font {}", source.path.display());
                return Ok((source.path.clone(), FetchOutcome::Cached));
            }
            Err(err) if source.url.is_some() => {
                warn!("{err}; downloading again");
            }
            Err(err) => return Err(err),
        }
    }

    let url = source
        .url
        .as_deref()
        .ok_or_else(|| FetchError::Missing(source.path.clone()))?;

    let bytes = download(url, source, options)?;
    Ok((source.path.clone(), FetchOutcome::Downloaded { bytes }))
}

/// `ensure_font` followed by reading the font bytes
pub fn load_font(source: &FontSource, options: &FetchOptions) -> Result<Vec<u8>> {
    let (path, _) = ensure_font(source, options)?;
    Ok(fs::read(path)?)
}

/// Check that `data` is a font containing face `index`
pub fn check_font(data: &[u8], index: u32) -> std::result::Result<(), String> {
    let faces = match ttf_parser::fonts_in_collection(data) {
        Some(count) => count,
        None => {
            ttf_parser::Face::parse(data, 0).map_err(|e| e.to_string())?;
            1
        }
    };

    if index >= faces {
        return Err(format!(
            "face index {index} out of range, font has {faces} face(s)"
        ));
    }

    ttf_parser::Face::parse(data, index)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn verify_file(source: &FontSource) -> Result<()> {
    if !source.verify {
        return Ok(());
    }
    verify_path(&source.path, source.index)
}

fn verify_path(path: &Path, index: u32) -> Result<()> {
    let data = fs::read(path)?;
    check_font(&data, index).map_err(|message| FetchError::InvalidFont {
        path: path.to_path_buf(),
        message,
    })
}

/// Download `url` next to the target, verify, then move it into place
fn download(url: &str, source: &FontSource, options: &FetchOptions) -> Result<u64> {
    info!("downloading {} -> {}", url, source.path.display());

    let agent = ureq::AgentBuilder::new()
        .timeout(options.timeout)
        .user_agent(&options.user_agent)
        .build();

    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            return Err(FetchError::Status {
                url: url.to_string(),
                code,
            })
        }
        Err(err) => {
            return Err(FetchError::Http {
                url: url.to_string(),
                message: err.to_string(),
            })
        }
    };

    if let Some(parent) = source.path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let partial = partial_path(&source.path);
    let written = match write_body(response.into_reader(), &partial) {
        Ok(written) => written,
        Err(err) => {
            fs::remove_file(&partial).ok();
            return Err(FetchError::Http {
                url: url.to_string(),
                message: err.to_string(),
            });
        }
    };

    if source.verify {
        if let Err(err) = verify_path(&partial, source.index) {
            fs::remove_file(&partial).ok();
            return Err(match err {
                FetchError::InvalidFont { message, .. } => FetchError::InvalidFont {
                    path: source.path.clone(),
                    message,
                },
                other => other,
            });
        }
    }

    if let Err(err) = fs::rename(&partial, &source.path) {
        fs::remove_file(&partial).ok();
        return Err(err.into());
    }
    info!("downloaded {} bytes to {}", written, source.path.display());

    Ok(written)
}

fn write_body(mut reader: impl io::Read, path: &Path) -> io::Result<u64> {
    let mut writer = BufWriter::new(File::create(path)?);
    let written = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(written)
}

/// Sibling path used while a download is in flight
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "font".to_string());
    path.with_file_name(format!(".{}.{}.part", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_is_sibling() {
        let partial = partial_path(Path::new("fonts/wqy-microhei.ttc"));
        assert_eq!(partial.parent(), Some(Path::new("fonts")));

        let name = partial.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".wqy-microhei.ttc."));
        assert!(name.ends_with(".part"));
    }

    #[test]
    fn test_check_font_rejects_garbage() {
        assert!(check_font(b"<html>rate limited</html>", 0).is_err());
        assert!(check_font(&[], 0).is_err());
    }

    #[test]
    fn test_source_builder() {
        let source = FontSource::new("wqy-microhei.ttc")
            .with_url(WQY_MICROHEI_URL)
            .with_index(1)
            .without_verification();

        assert_eq!(source.path, PathBuf::from("wqy-microhei.ttc"));
        assert_eq!(source.url.as_deref(), Some(WQY_MICROHEI_URL));
        assert_eq!(source.index, 1);
        assert!(!source.verify);
    }

    #[test]
    fn test_default_options() {
        let options = FetchOptions::default();
        assert!(options.user_agent.starts_with("zhpdf/"));
        assert_eq!(options.timeout, Duration::from_secs(120));
    }
}
