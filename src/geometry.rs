use serde::{Deserialize, Serialize};

use crate::error::{ComposeError, ComposeResult};

/// Rectangle drawn by the user, in the coordinate space of the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A [`CropRegion`] together with the display size it was drawn against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSelection {
    pub region: CropRegion,
    pub display_width: f32,
    pub display_height: f32,
}

/// Crop rectangle in natural image pixels.
///
/// Only `x`, `y` and `width` drive text layout; `height` is carried along unused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub fn map_crop(
    crop: &CropRegion,
    source_width: u32,
    source_height: u32,
    display_width: f32,
    display_height: f32,
) -> ComposeResult<ScaledRegion> {
    if !(display_width.is_finite() && display_width > 0.0)
        || !(display_height.is_finite() && display_height > 0.0)
    {
        return Err(ComposeError::invalid_geometry(format!(
            "display size must be positive (got {}x{})",
            display_width, display_height
        )));
    }
    if source_width == 0 || source_height == 0 {
        return Err(ComposeError::invalid_geometry(format!(
            "source size must be positive (got {}x{})",
            source_width, source_height
        )));
    }
    let finite = [crop.x, crop.y, crop.width, crop.height]
        .iter()
        .all(|value| value.is_finite());
    if !finite || crop.width < 0.0 || crop.height < 0.0 {
        return Err(ComposeError::invalid_geometry(format!(
            "crop must be finite with non-negative size (got x={} y={} w={} h={})",
            crop.x, crop.y, crop.width, crop.height
        )));
    }

    let scale_x = source_width as f32 / display_width;
    let scale_y = source_height as f32 / display_height;
    Ok(ScaledRegion {
        x: crop.x * scale_x,
        y: crop.y * scale_y,
        width: crop.width * scale_x,
        height: crop.height * scale_y,
    })
}

/// Parses `x,y,w,h`.
pub fn parse_crop(value: &str) -> ComposeResult<CropRegion> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ComposeError::invalid_geometry(format!("invalid crop '{}': {}", value, err)))?;
    let &[x, y, width, height] = parts.as_slice() else {
        return Err(ComposeError::invalid_geometry(format!(
            "crop must be x,y,w,h (got '{}')",
            value
        )));
    };
    Ok(CropRegion {
        x,
        y,
        width,
        height,
    })
}

/// Parses `WxH`.
pub fn parse_size(value: &str) -> ComposeResult<(f32, f32)> {
    let lower = value.trim().to_ascii_lowercase();
    let Some((w, h)) = lower.split_once('x') else {
        return Err(ComposeError::invalid_geometry(format!(
            "size must be WxH (got '{}')",
            value
        )));
    };
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .map_err(|err| ComposeError::invalid_geometry(format!("invalid size '{}': {}", value, err)))
    };
    Ok((parse(w)?, parse(h)?))
}
