use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Width in pixels of `text` set at `font_size`.
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        let Ok(face) = Face::parse(&self.data, self.face_index) else {
            return estimate_text_width_units(text) * font_size;
        };
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == ' ' {
                advance = advance.saturating_add(self.space_advance as u32);
                continue;
            }
            let glyph_advance = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(self.space_advance);
            advance = advance.saturating_add(glyph_advance as u32);
        }
        advance as f32 * self.scale(font_size)
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascent(&self, font_size: f32) -> f32 {
        self.ascender.max(0) as f32 * self.scale(font_size)
    }

    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em.max(1) as f32
    }
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics")
            .field("family", &self.family)
            .field("units_per_em", &self.units_per_em)
            .field("face_index", &self.face_index)
            .finish()
    }
}

/// Reads a font file; in a collection the face named `preferred_family` wins over the first.
pub fn load_font_metrics(path: &Path, preferred_family: Option<&str>) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(&data, preferred_family)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Fonts shared by text measurement and drawing.
///
/// Layout and rasterization read the same metrics, so a preview and a batch frame of
/// the same row wrap identically.
pub struct FontContext {
    db: Arc<fontdb::Database>,
    family: String,
    metrics: Option<FontMetrics>,
}

impl FontContext {
    /// Loads system fonts (plus `font_path`, when given) and resolves `family`.
    ///
    /// A family that cannot be resolved is not fatal: drawing falls back to whatever
    /// fontdb picks and measuring falls back to a per-character estimate.
    pub fn load(family: &str, font_path: Option<&Path>) -> Result<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let metrics = match font_path {
            Some(path) => {
                let metrics = load_font_metrics(path, Some(family))?;
                db.load_font_data(metrics.data().to_vec());
                Some(metrics)
            }
            None => match resolve_family(&db, family) {
                Ok(metrics) => Some(metrics),
                Err(err) => {
                    warn!("font: {} ({}); using estimated metrics", family, err);
                    None
                }
            },
        };
        let family = metrics
            .as_ref()
            .and_then(|m| m.family())
            .map(|name| name.to_string())
            .unwrap_or_else(|| family.to_string());
        debug!(
            "font: family={} faces={} metrics={}",
            family,
            db.len(),
            metrics.is_some()
        );
        Ok(Self {
            db: Arc::new(db),
            family,
            metrics,
        })
    }

    /// Context with no fonts at all; text is measured by estimate and not drawn.
    pub fn empty(family: &str) -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
            family: family.to_string(),
            metrics: None,
        }
    }

    pub fn with_metrics(metrics: FontMetrics, family: &str) -> Self {
        let mut db = fontdb::Database::new();
        db.load_font_data(metrics.data().to_vec());
        let family = metrics.family().unwrap_or(family).to_string();
        Self {
            db: Arc::new(db),
            family,
            metrics: Some(metrics),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn metrics(&self) -> Option<&FontMetrics> {
        self.metrics.as_ref()
    }

    pub(crate) fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        match &self.metrics {
            Some(metrics) => metrics.measure(text, font_size),
            None => estimate_text_width_units(text) * font_size,
        }
    }

    pub fn ascent(&self, font_size: f32) -> f32 {
        match &self.metrics {
            Some(metrics) => metrics.ascent(font_size),
            None => font_size * ESTIMATED_ASCENT,
        }
    }
}

const ESTIMATED_ASCENT: f32 = 0.8;

#[cfg(target_os = "macos")]
fn fallback_families(generic: &fontdb::Family<'_>) -> &'static [&'static str] {
    match generic {
        fontdb::Family::SansSerif => &["Helvetica", "Arial"],
        fontdb::Family::Monospace => &["Menlo", "Courier New"],
        _ => &["Times New Roman", "Times"],
    }
}

#[cfg(target_os = "windows")]
fn fallback_families(generic: &fontdb::Family<'_>) -> &'static [&'static str] {
    match generic {
        fontdb::Family::SansSerif => &["Arial", "Segoe UI"],
        fontdb::Family::Monospace => &["Consolas", "Courier New"],
        _ => &["Times New Roman"],
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn fallback_families(generic: &fontdb::Family<'_>) -> &'static [&'static str] {
    match generic {
        fontdb::Family::SansSerif => &["DejaVu Sans", "Liberation Sans", "Noto Sans"],
        fontdb::Family::Monospace => &["DejaVu Sans Mono", "Liberation Mono", "Noto Sans Mono"],
        _ => &["Times New Roman", "Liberation Serif", "DejaVu Serif", "Noto Serif"],
    }
}

fn generic_family(family: &str) -> Option<fontdb::Family<'static>> {
    let lower = family.trim().to_ascii_lowercase();
    match lower.as_str() {
        "serif" => Some(fontdb::Family::Serif),
        "sans-serif" | "sans" => Some(fontdb::Family::SansSerif),
        "monospace" => Some(fontdb::Family::Monospace),
        _ => None,
    }
}

fn resolve_family(db: &fontdb::Database, family: &str) -> Result<FontMetrics> {
    if let Some(generic) = generic_family(family) {
        let fallbacks = fallback_families(&generic);
        if let Ok(metrics) = query_family(db, generic) {
            return Ok(metrics);
        }
        for candidate in fallbacks {
            if let Ok(metrics) = query_family(db, fontdb::Family::Name(candidate)) {
                return Ok(metrics);
            }
        }
        return Err(anyhow!("no fonts found for generic family"));
    }
    query_family(db, fontdb::Family::Name(family))
}

fn query_family(db: &fontdb::Database, family: fontdb::Family<'_>) -> Result<FontMetrics> {
    let families = [family];
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db.query(&query).ok_or_else(|| anyhow!("font not found"))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data"))?;
    parse_face(Arc::new(data), face_index).ok_or_else(|| anyhow!("failed to parse font face"))
}

fn estimate_char_units_for_width(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    ) {
        1.0
    } else {
        0.55
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units_for_width).sum()
}

fn load_font_metrics_from_data(data: &[u8], preferred_family: Option<&str>) -> Result<FontMetrics> {
    let mut fallback = None;
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    let shared = Arc::new(data.to_vec());
    for index in 0..count {
        let Some(metrics) = parse_face(Arc::clone(&shared), index) else {
            continue;
        };
        if let (Some(preferred), Some(found)) = (preferred_family, metrics.family()) {
            if found.eq_ignore_ascii_case(preferred) {
                return Ok(metrics);
            }
        }
        if fallback.is_none() {
            fallback = Some(metrics);
        }
    }
    fallback.ok_or_else(|| anyhow!("failed to parse font data"))
}

fn parse_face(data: Arc<Vec<u8>>, face_index: u32) -> Option<FontMetrics> {
    let face = Face::parse(&data, face_index).ok()?;
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    let ascender = face.ascender();
    let family = extract_family_name(&face);
    Some(FontMetrics {
        data,
        units_per_em,
        space_advance,
        ascender,
        family,
        face_index,
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_font_size() {
        let context = FontContext::empty("serif");
        let small = context.measure("Hi Bob", 10.0);
        let large = context.measure("Hi Bob", 20.0);
        assert!(small > 0.0);
        assert!((large - small * 2.0).abs() < 1e-4);
        assert_eq!(context.measure("", 30.0), 0.0);
    }

    #[test]
    fn estimate_ascent_is_proportional() {
        let context = FontContext::empty("serif");
        assert!((context.ascent(30.0) - 24.0).abs() < 1e-4);
    }

    #[test]
    fn empty_context_keeps_requested_family() {
        let context = FontContext::empty("Times New Roman");
        assert_eq!(context.family(), "Times New Roman");
        assert!(context.metrics().is_none());
    }

    #[test]
    fn generic_names_map_to_fontdb_generics() {
        assert!(matches!(generic_family("Serif"), Some(fontdb::Family::Serif)));
        assert!(matches!(
            generic_family("sans-serif"),
            Some(fontdb::Family::SansSerif)
        ));
        assert!(generic_family("Garamond").is_none());
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_font_metrics(&dir.path().join("missing.ttf"), None).is_err());
    }

    #[test]
    fn garbage_font_data_is_rejected() {
        assert!(load_font_metrics_from_data(b"not a font", None).is_err());
    }
}
