use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::fmt;
use std::path::{Path, PathBuf};
use tiny_skia::{ColorU8, Pixmap};
use tracing::info;

use crate::error::{ComposeError, ComposeResult};
use crate::geometry::{self, CropSelection, ScaledRegion};

/// Where the base image comes from.
#[derive(Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes { bytes: Vec<u8>, name: Option<String> },
    /// `data:<mime>;base64,<payload>`
    DataUrl(String),
}

impl ImageSource {
    /// Treats `data:` prefixed values as data URLs and anything else as a path.
    pub fn from_arg(value: &str) -> Self {
        if value.trim_start().starts_with("data:") {
            Self::DataUrl(value.trim().to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }

    pub fn load(&self) -> ComposeResult<SourceImage> {
        match self {
            Self::Path(path) => {
                let bytes = std::fs::read(path).map_err(|err| {
                    ComposeError::image_load(format!("failed to read {}: {}", path.display(), err))
                })?;
                SourceImage::decode(&bytes, Some(path))
            }
            Self::Bytes { bytes, name } => {
                let path = name.as_deref().map(Path::new);
                SourceImage::decode(bytes, path)
            }
            Self::DataUrl(url) => {
                let (mime, bytes) = decode_data_url(url)?;
                let image = SourceImage::decode(&bytes, None)?;
                if !mime.is_empty() && mime != image.mime {
                    info!("image: data url declares {} but payload is {}", mime, image.mime);
                }
                Ok(image)
            }
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes { bytes, name } => f
                .debug_struct("Bytes")
                .field("len", &bytes.len())
                .field("name", name)
                .finish(),
            Self::DataUrl(url) => f.debug_tuple("DataUrl").field(&url.len()).finish(),
        }
    }
}

/// Decoded base image at natural resolution.
///
/// Decoded once and shared read-only by every render; frames copy its pixels and
/// never write back.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pixmap: Pixmap,
    mime: String,
}

impl SourceImage {
    pub fn decode(bytes: &[u8], path: Option<&Path>) -> ComposeResult<Self> {
        let mime = detect_image_mime(bytes, path)?;
        let decoded = image::load_from_memory(bytes)
            .map_err(|err| ComposeError::image_load(format!("failed to decode {}: {}", mime, err)))?;
        let mut image = Self::from_rgba(&decoded.to_rgba8())?;
        info!(
            "image: {} {}x{}",
            mime,
            image.width(),
            image.height()
        );
        image.mime = mime;
        Ok(image)
    }

    pub fn from_rgba(rgba: &image::RgbaImage) -> ComposeResult<Self> {
        let (width, height) = rgba.dimensions();
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            ComposeError::image_load(format!("image has no pixels ({}x{})", width, height))
        })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self {
            pixmap,
            mime: IMAGE_RGBA_MIME.to_string(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Maps a selection drawn on the displayed image into natural pixels.
    pub fn scale_selection(&self, selection: &CropSelection) -> ComposeResult<ScaledRegion> {
        geometry::map_crop(
            &selection.region,
            self.width(),
            self.height(),
            selection.display_width,
            selection.display_height,
        )
    }
}

const IMAGE_RGBA_MIME: &str = "image/x-raw-rgba";

fn decode_data_url(url: &str) -> ComposeResult<(String, Vec<u8>)> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| ComposeError::image_load("data url must start with 'data:'"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ComposeError::image_load("data url has no payload"))?;
    let mut parts = meta.split(';');
    let mime = parts.next().unwrap_or_default().trim().to_lowercase();
    if !parts.any(|part| part.trim().eq_ignore_ascii_case("base64")) {
        return Err(ComposeError::image_load(
            "data url must be base64 encoded",
        ));
    }
    let compact: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|err| ComposeError::image_load(format!("invalid base64 in data url: {}", err)))?;
    Ok((mime, bytes))
}

fn detect_image_mime(bytes: &[u8], path: Option<&Path>) -> ComposeResult<String> {
    if bytes.is_empty() {
        return Err(ComposeError::image_load("image data is empty"));
    }
    if let Some(kind) = infer::get(bytes) {
        let detected = kind.mime_type();
        if !detected.starts_with("image/") {
            return Err(ComposeError::image_load(format!(
                "expected image data (detected '{}')",
                detected
            )));
        }
        return Ok(detected.to_string());
    }
    if let Some(mime) = extension_lower(path).and_then(|ext| mime_from_extension(&ext)) {
        return Ok(mime.to_string());
    }
    Err(ComposeError::image_load(format!(
        "unable to detect image type for '{}'",
        path.map(|value| value.display().to_string())
            .unwrap_or_else(|| "input".to_string())
    )))
}

fn extension_lower(path: Option<&Path>) -> Option<String> {
    path.and_then(|path| path.extension())
        .and_then(|value| value.to_str())
        .map(|value| value.to_lowercase())
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "tga" => Some("image/x-tga"),
        "pnm" | "ppm" | "pgm" => Some("image/x-portable-anymap"),
        _ => None,
    }
}
