//! Upload validation and the display preview.

use crate::errors::AnalysisError;
use base64::Engine;
use bytes::Bytes;
use image::imageops::FilterType;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Width of the display copy, in pixels.
pub const DEFAULT_PREVIEW_WIDTH: u32 = 500;

/// Upload formats accepted by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Jpg,
    Jpeg,
    Png,
    Dicom,
}

impl UploadFormat {
    pub const ALL: [Self; 4] = [Self::Jpg, Self::Jpeg, Self::Png, Self::Dicom];

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Dicom => "dicom",
        }
    }

    /// Value for the file input's `accept` attribute.
    #[must_use]
    pub fn accept_attribute() -> String {
        Self::ALL
            .iter()
            .map(|format| format!(".{}", format.extension()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Resolves the format from a file name's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnsupportedFormat`] for any extension outside
    /// the allow-list, including a missing one.
    pub fn from_file_name(file_name: &str) -> Result<Self, AnalysisError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        Self::ALL
            .into_iter()
            .find(|format| format.extension() == extension)
            .ok_or(AnalysisError::UnsupportedFormat { extension })
    }
}

impl fmt::Display for UploadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Previews may be at most this many times taller than they are wide.
pub const MAX_PREVIEW_ASPECT: u32 = 4;

/// Height of the display copy for an image scaled to `target_width`.
///
/// Follows `floor(target_width / (width / height))`, clamped to at least one
/// pixel so extremely wide images still produce a valid preview.
#[must_use]
pub fn preview_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let aspect_ratio = f64::from(width) / f64::from(height);
    let preview_height = (f64::from(target_width) / aspect_ratio).floor() as u32;
    (target_width, preview_height.max(1))
}

/// An accepted upload: the original bytes plus a PNG display copy.
#[derive(Clone)]
pub struct UploadedImage {
    file_name: String,
    bytes: Bytes,
    format: UploadFormat,
    width: u32,
    height: u32,
    preview_png: Vec<u8>,
    preview_width: u32,
    preview_height: u32,
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .field("dimensions", &(self.width, self.height))
            .field("preview", &(self.preview_width, self.preview_height))
            .finish()
    }
}

impl UploadedImage {
    /// Validates the extension, decodes the bytes and renders the preview.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::UnsupportedFormat`] when the extension is not allowed
    ///   (checked before the bytes are touched)
    /// - [`AnalysisError::UploadDecode`] when the bytes are empty, corrupt, or
    ///   not a raster format this build can decode
    pub fn decode(
        file_name: &str,
        bytes: Bytes,
        preview_width: u32,
    ) -> Result<Self, AnalysisError> {
        let format = UploadFormat::from_file_name(file_name)?;

        if bytes.is_empty() {
            return Err(AnalysisError::UploadDecode(format!(
                "'{file_name}' is empty"
            )));
        }
        if preview_width == 0 {
            return Err(AnalysisError::UploadDecode(
                "preview width must be positive".to_string(),
            ));
        }

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| AnalysisError::UploadDecode(format!("'{file_name}': {e}")))?;
        let (width, height) = (decoded.width(), decoded.height());

        let (preview_width, preview_height) = preview_dimensions(width, height, preview_width);
        if preview_height > preview_width.saturating_mul(MAX_PREVIEW_ASPECT) {
            return Err(AnalysisError::UploadDecode(format!(
                "'{file_name}' is {width}x{height}; images more than {MAX_PREVIEW_ASPECT} times \
taller than wide are not supported"
            )));
        }
        let preview = decoded.resize_exact(preview_width, preview_height, FilterType::Triangle);

        let mut preview_png = Vec::new();
        preview
            .write_to(&mut Cursor::new(&mut preview_png), image::ImageFormat::Png)
            .map_err(|e| AnalysisError::UploadDecode(format!("preview encoding failed: {e}")))?;

        tracing::info!(
            "Accepted upload '{file_name}' ({format}, {width}x{height}, {} bytes)",
            bytes.len()
        );

        Ok(Self {
            file_name: file_name.to_string(),
            bytes,
            format,
            width,
            height,
            preview_png,
            preview_width,
            preview_height,
        })
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The original upload, exactly as received.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[must_use]
    pub const fn format(&self) -> UploadFormat {
        self.format
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    #[must_use]
    pub const fn preview_dimensions(&self) -> (u32, u32) {
        (self.preview_width, self.preview_height)
    }

    #[must_use]
    pub fn preview_png(&self) -> &[u8] {
        &self.preview_png
    }

    /// `data:` URI of the preview, ready for an `<img src>`.
    #[must_use]
    pub fn preview_data_uri(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.preview_png)
        )
    }
}
