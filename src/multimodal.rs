//! File loading and MIME type detection for images sent to the model.
//!
//! # Example
//!
//! ```no_run
//! use medscan_agent::{Client, image_part_from_file};
//! use medscan_agent::wire::Part;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder("api-key".to_string()).build()?;
//! let image = image_part_from_file("scan.png").await?;
//!
//! let text = client
//!     .generate_content("gemini-2.0-flash-exp", vec![Part::text("What is shown?"), image])
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::errors::ApiError;
use crate::wire::Part;
use base64::Engine;
use std::path::Path;

/// Detects the MIME type of a medical image from its file extension.
///
/// # Supported Types
///
/// - `jpg`, `jpeg` → `image/jpeg`
/// - `png` → `image/png`
/// - `dicom`, `dcm` → `application/dicom`
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use medscan_agent::detect_mime_type;
///
/// assert_eq!(detect_mime_type(Path::new("scan.JPG")), Some("image/jpeg"));
/// assert_eq!(detect_mime_type(Path::new("study.dicom")), Some("application/dicom"));
/// assert_eq!(detect_mime_type(Path::new("notes.txt")), None);
/// ```
pub fn detect_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "dicom" | "dcm" => Some("application/dicom"),
        _ => None,
    }
}

async fn load_and_encode_file(path: &Path) -> Result<String, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        let suggestion = match e.kind() {
            std::io::ErrorKind::NotFound => " Check that the file path is correct.",
            std::io::ErrorKind::PermissionDenied => " Check file permissions.",
            _ => "",
        };
        let message = format!("failed to read file '{}': {e}.{suggestion}", path.display());
        ApiError::Io(std::io::Error::new(e.kind(), message))
    })?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&bytes))
}

/// Loads an image file as an inline-data [`Part`].
///
/// # Errors
///
/// Returns an error if:
/// - The file extension is not a supported image type
/// - The file cannot be read
pub async fn image_part_from_file(path: impl AsRef<Path>) -> Result<Part, ApiError> {
    let path = path.as_ref();
    let mime_type = detect_mime_type(path).ok_or_else(|| {
        ApiError::InvalidInput(format!(
            "File '{}' is not a supported image type (jpg, jpeg, png, dicom)",
            path.display()
        ))
    })?;
    let data = load_and_encode_file(path).await?;
    Ok(Part::inline_data(mime_type, data))
}
