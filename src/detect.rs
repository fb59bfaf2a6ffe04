//! Upload format detection and validation.
//!
//! Only PDF, PNG and JPEG documents are accepted for analysis. Detection
//! looks at magic bytes first and falls back to the file extension.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// An accepted upload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadFormat {
    /// Portable Document Format
    Pdf,
    /// Portable Network Graphics
    Png,
    /// JPEG image (`.jpg` / `.jpeg`)
    Jpeg,
}

impl UploadFormat {
    /// Extensions accepted at the upload boundary, lowercase without the dot.
    pub const EXTENSIONS: [&'static str; 4] = ["pdf", "png", "jpg", "jpeg"];

    /// MIME type used when storing the upload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            UploadFormat::Pdf => "application/pdf",
            UploadFormat::Png => "image/png",
            UploadFormat::Jpeg => "image/jpeg",
        }
    }

    /// Map a file extension (case-insensitive, no dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(UploadFormat::Pdf),
            "png" => Some(UploadFormat::Png),
            "jpg" | "jpeg" => Some(UploadFormat::Jpeg),
            _ => None,
        }
    }
}

impl std::fmt::Display for UploadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UploadFormat::Pdf => "PDF",
            UploadFormat::Png => "PNG",
            UploadFormat::Jpeg => "JPEG",
        };
        f.write_str(name)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff";

/// Detect the upload format from the first bytes of a file.
///
/// # Returns
/// * `Ok(UploadFormat)` if the data starts with a PDF, PNG or JPEG signature
/// * `Err(Error::UnsupportedFormat)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<UploadFormat> {
    if data.starts_with(PDF_MAGIC) {
        Ok(UploadFormat::Pdf)
    } else if data.starts_with(PNG_MAGIC) {
        Ok(UploadFormat::Png)
    } else if data.starts_with(JPEG_MAGIC) {
        Ok(UploadFormat::Jpeg)
    } else {
        Err(Error::UnsupportedFormat(
            "content is not a PDF, PNG or JPEG".to_string(),
        ))
    }
}

/// Detect the upload format from a file name's extension.
pub fn detect_format_from_name(name: &str) -> Result<UploadFormat> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(UploadFormat::from_extension)
        .ok_or_else(|| Error::UnsupportedFormat(name.to_string()))
}

/// Detect the upload format of a named upload.
///
/// Magic bytes win; the name's extension is only consulted when the
/// content has no recognizable signature.
pub fn detect_upload(name: &str, data: &[u8]) -> Result<UploadFormat> {
    detect_format_from_bytes(data).or_else(|_| detect_format_from_name(name))
}

/// Detect the upload format of a file on disk.
///
/// # Example
/// ```no_run
/// use unscan::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("form.pdf").unwrap();
/// println!("{} ({})", format, format.mime_type());
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<UploadFormat> {
    let path = path.as_ref();
    let mut header = Vec::with_capacity(16);
    File::open(path)?.take(16).read_to_end(&mut header)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    detect_upload(&name, &header)
}

/// Check if a named upload would be accepted.
pub fn is_supported(name: &str, data: &[u8]) -> bool {
    detect_upload(name, data).is_ok()
}
