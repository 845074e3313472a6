mod color;
mod composite;
mod font;
mod layout;

use crate::error::{ComposeError, ComposeResult};
use crate::geometry::ScaledRegion;
use crate::source::SourceImage;
use crate::template;

pub use color::TextColor;
pub use composite::{Compositor, OutputFormat, OutputFrame};
pub use font::{FontContext, FontMetrics, load_font_metrics};
pub use layout::{PositionedLine, wrap_text};

pub const DEFAULT_FONT_FAMILY: &str = "serif";
pub const DEFAULT_FONT_SIZE: f32 = 30.0;
pub const DEFAULT_LINE_HEIGHT_RATIO: f32 = 1.2;

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: TextColor,
    pub font_size: f32,
    pub line_height_ratio: f32,
}

impl TextStyle {
    pub fn new(color: TextColor, font_size: f32) -> ComposeResult<Self> {
        let style = Self {
            color,
            font_size,
            line_height_ratio: DEFAULT_LINE_HEIGHT_RATIO,
        };
        style.validate()?;
        Ok(style)
    }

    pub fn with_line_height_ratio(mut self, ratio: f32) -> ComposeResult<Self> {
        self.line_height_ratio = ratio;
        self.validate()?;
        Ok(self)
    }

    pub fn line_height(&self) -> f32 {
        self.font_size * self.line_height_ratio
    }

    pub fn validate(&self) -> ComposeResult<()> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(ComposeError::config(format!(
                "font size must be positive (got {})",
                self.font_size
            )));
        }
        if !(self.line_height_ratio.is_finite() && self.line_height_ratio > 0.0) {
            return Err(ComposeError::config(format!(
                "line height ratio must be positive (got {})",
                self.line_height_ratio
            )));
        }
        Ok(())
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: TextColor::WHITE,
            font_size: DEFAULT_FONT_SIZE,
            line_height_ratio: DEFAULT_LINE_HEIGHT_RATIO,
        }
    }
}

/// Everything needed to produce one output frame.
///
/// Rendering a job reads only its own fields and the compositor's fonts, so jobs for
/// different rows can run on any thread in any order.
#[derive(Clone, Copy)]
pub struct RenderJob<'a> {
    pub image: &'a SourceImage,
    pub region: ScaledRegion,
    pub template: &'a str,
    pub headers: &'a [String],
    pub row: &'a [String],
    pub style: &'a TextStyle,
}

impl RenderJob<'_> {
    pub fn resolved_text(&self) -> String {
        template::resolve(self.template, self.headers, self.row)
    }

    pub fn layout(&self, fonts: &FontContext) -> Vec<PositionedLine> {
        let font_size = self.style.font_size;
        wrap_text(
            &self.resolved_text(),
            self.region.width,
            |line| fonts.measure(line, font_size),
            self.style.line_height(),
            self.region.x,
            self.region.y,
        )
    }

    pub fn render(&self, compositor: &Compositor) -> ComposeResult<OutputFrame> {
        let lines = self.layout(compositor.fonts());
        compositor.composite(self.image, &lines, self.style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_height_defaults_to_one_point_two() {
        let style = TextStyle::new(TextColor::WHITE, 30.0).unwrap();
        assert!((style.line_height() - 36.0).abs() < 1e-4);
        let style = style.with_line_height_ratio(1.5).unwrap();
        assert!((style.line_height() - 45.0).abs() < 1e-4);
    }

    #[test]
    fn non_positive_font_size_is_rejected() {
        assert!(matches!(
            TextStyle::new(TextColor::WHITE, 0.0),
            Err(ComposeError::Config(_))
        ));
        assert!(
            TextStyle::default()
                .with_line_height_ratio(-1.0)
                .is_err()
        );
    }
}
