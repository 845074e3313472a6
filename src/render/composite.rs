use resvg::render;
use std::io::Cursor;
use tiny_skia::Pixmap;
use usvg::{Options, Tree};

use super::font::FontContext;
use super::{PositionedLine, TextStyle};
use crate::error::{ComposeError, ComposeResult};
use crate::source::SourceImage;

/// Encoded file format of an output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
    Bmp,
    Tiff,
}

impl OutputFormat {
    pub fn from_mime(mime: &str) -> ComposeResult<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" | "png" => Ok(Self::Png),
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(Self::Jpeg),
            "image/webp" | "webp" => Ok(Self::WebP),
            "image/bmp" | "bmp" => Ok(Self::Bmp),
            "image/tiff" | "tiff" | "tif" => Ok(Self::Tiff),
            other => Err(ComposeError::config(format!(
                "unsupported output image mime '{}' (expected image/png, image/jpeg, image/webp, image/bmp, image/tiff)",
                other
            ))),
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::WebP => image::ImageFormat::WebP,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tiff => image::ImageFormat::Tiff,
        }
    }
}

/// A rendered frame at the source image's natural resolution.
pub struct OutputFrame {
    pixmap: Pixmap,
}

impl OutputFrame {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight-alpha RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut data = Vec::with_capacity(self.pixmap.pixels().len() * 4);
        for pixel in self.pixmap.pixels() {
            let color = pixel.demultiply();
            data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        image::RgbaImage::from_raw(self.width(), self.height(), data)
            .unwrap_or_else(|| image::RgbaImage::new(self.width(), self.height()))
    }

    pub fn encode(&self, format: OutputFormat) -> ComposeResult<Vec<u8>> {
        let rgba = image::DynamicImage::ImageRgba8(self.to_rgba_image());
        // JPEG has no alpha channel.
        let image = match format {
            OutputFormat::Jpeg => image::DynamicImage::ImageRgb8(rgba.to_rgb8()),
            _ => rgba,
        };
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format.image_format())
            .map_err(|err| ComposeError::encode(format!("{}: {}", format.mime(), err)))?;
        Ok(bytes)
    }
}

/// Paints wrapped text over a copy of the source image.
pub struct Compositor {
    fonts: FontContext,
}

impl Compositor {
    pub fn new(fonts: FontContext) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    /// The base layer is the source image at 1:1; lines are drawn left-aligned with
    /// their `y` as the top of the text, in the order given.
    pub fn composite(
        &self,
        image: &SourceImage,
        lines: &[PositionedLine],
        style: &TextStyle,
    ) -> ComposeResult<OutputFrame> {
        let mut pixmap = image.pixmap().clone();
        if lines.iter().all(|line| line.text.is_empty()) {
            return Ok(OutputFrame { pixmap });
        }

        let svg = overlay_svg(
            pixmap.width(),
            pixmap.height(),
            lines,
            style,
            self.fonts.family(),
            self.fonts.ascent(style.font_size),
        );
        let options = Options {
            fontdb: self.fonts.database(),
            ..Options::default()
        };
        let tree = Tree::from_str(&svg, &options)
            .map_err(|err| ComposeError::render(format!("failed to parse text overlay: {}", err)))?;
        render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
        Ok(OutputFrame { pixmap })
    }
}

pub(crate) fn overlay_svg(
    width: u32,
    height: u32,
    lines: &[PositionedLine],
    style: &TextStyle,
    family: &str,
    ascent: f32,
) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    let fill = style.color.svg_fill();
    let opacity = style.color.opacity();
    let family = escape_xml(family);
    for line in lines.iter().filter(|line| !line.text.is_empty()) {
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" font-family="{family}" fill="{fill}" fill-opacity="{opacity}" xml:space="preserve">{text}</text>"#,
            x = line.x,
            y = line.y + ascent,
            size = style.font_size,
            family = family,
            fill = fill,
            opacity = opacity,
            text = escape_xml(&line.text)
        ));
    }
    svg.push_str("</svg>");
    svg
}

/// Escapes markup characters and drops control characters XML 1.0 cannot carry.
fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            ch if (ch as u32) < 0x20 => {}
            '\u{FFFE}' | '\u{FFFF}' => {}
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TextColor;
    use crate::test_util::solid_source;

    fn line(text: &str, x: f32, y: f32) -> PositionedLine {
        PositionedLine {
            text: text.to_string(),
            x,
            y,
        }
    }

    #[test]
    fn overlay_markup_places_lines_top_down() {
        let style = TextStyle::new(TextColor::rgba(255, 255, 255, 255), 20.0).unwrap();
        let svg = overlay_svg(
            100,
            50,
            &[line("Olá <Ana>", 10.0, 5.0), line("", 10.0, 29.0), line("& co", 10.0, 53.0)],
            &style,
            "Times New Roman",
            16.0,
        );
        insta::assert_snapshot!(svg, @r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50" viewBox="0 0 100 50"><text x="10" y="21" font-size="20" font-family="Times New Roman" fill="#ffffff" fill-opacity="1" xml:space="preserve">Olá &lt;Ana&gt;</text><text x="10" y="69" font-size="20" font-family="Times New Roman" fill="#ffffff" fill-opacity="1" xml:space="preserve">&amp; co</text></svg>"##);
    }

    #[test]
    fn frame_matches_source_size_and_keeps_base_pixels() {
        let image = solid_source(64, 32, [0, 0, 255, 255]);
        let compositor = Compositor::new(FontContext::empty("serif"));
        let style = TextStyle::default();
        let frame = compositor
            .composite(&image, &[line("Hello", 2.0, 2.0)], &style)
            .unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 32));
        assert_eq!(frame.pixel(63, 31), Some([0, 0, 255, 255]));
        // The source buffer is untouched.
        let base = image.pixmap().pixel(0, 0).unwrap().demultiply();
        assert_eq!((base.red(), base.green(), base.blue()), (0, 0, 255));
    }

    #[test]
    fn empty_lines_copy_the_source() {
        let image = solid_source(8, 8, [1, 2, 3, 255]);
        let compositor = Compositor::new(FontContext::empty("serif"));
        let frame = compositor
            .composite(&image, &[line("", 0.0, 0.0)], &TextStyle::default())
            .unwrap();
        assert_eq!(frame.to_rgba_image().get_pixel(4, 4).0, [1, 2, 3, 255]);
    }

    #[test]
    fn encodes_png_and_jpeg() {
        let image = solid_source(16, 8, [200, 100, 50, 255]);
        let compositor = Compositor::new(FontContext::empty("serif"));
        let frame = compositor
            .composite(&image, &[], &TextStyle::default())
            .unwrap();

        let png = frame.encode(OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 8));
        assert_eq!(decoded.get_pixel(0, 0).0, [200, 100, 50, 255]);

        let jpeg = frame.encode(OutputFormat::Jpeg).unwrap();
        assert_eq!(
            image::guess_format(&jpeg).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn output_format_from_mime() {
        assert_eq!(OutputFormat::from_mime("image/png").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::from_mime("JPG").unwrap().extension(), "jpg");
        assert!(matches!(
            OutputFormat::from_mime("image/gif"),
            Err(ComposeError::Config(_))
        ));
    }

    #[test]
    fn control_characters_are_dropped_from_overlay() {
        assert_eq!(escape_xml("Bob\u{0B}Silva\u{0C}\u{0}!"), "BobSilva!");
        assert_eq!(escape_xml("a\tb\nc"), "a\tb\nc");

        let image = solid_source(40, 20, [0, 0, 0, 255]);
        let compositor = Compositor::new(FontContext::empty("serif"));
        let frame = compositor
            .composite(&image, &[line("Bob\u{0B}Silva", 2.0, 2.0)], &TextStyle::default())
            .unwrap();
        assert_eq!((frame.width(), frame.height()), (40, 20));
    }

    fn ink_bounds(frame: &OutputFrame, top: u32, bottom: u32) -> Option<(u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32)> = None;
        for y in top..bottom.min(frame.height()) {
            for x in 0..frame.width() {
                let [r, _, _, _] = frame.pixel(x, y).unwrap();
                if r > 128 {
                    let (min_x, max_x, min_y) = bounds.unwrap_or((x, x, y));
                    bounds = Some((min_x.min(x), max_x.max(x), min_y.min(y)));
                }
            }
        }
        bounds
    }

    #[test]
    fn system_font_paints_wrapped_lines_inside_region() {
        let fonts = FontContext::load("serif", None).unwrap();
        let Some(metrics) = fonts.metrics().cloned() else {
            eprintln!("no serif font installed; skipping");
            return;
        };
        let font_size = 30.0;
        let style = TextStyle::new(TextColor::WHITE, font_size).unwrap();
        let measure = |text: &str| metrics.measure(text, font_size);
        let (x, y, width) = (10.0, 10.0, 200.0);
        let lines = crate::render::wrap_text(
            "Hello Hello Hello Hello Hello",
            width,
            measure,
            style.line_height(),
            x,
            y,
        );
        assert!(lines.len() >= 2);

        let image = solid_source(320, 160, [0, 0, 0, 255]);
        let compositor = Compositor::new(fonts);
        let frame = compositor.composite(&image, &lines, &style).unwrap();

        let mut tops = Vec::new();
        for line in &lines {
            let top = line.y as u32;
            let bottom = (line.y + style.line_height()) as u32;
            let (min_x, max_x, min_y) = ink_bounds(&frame, top, bottom).expect("ink");
            assert!(min_x as f32 >= x - 1.0, "ink starts left of region: {}", min_x);
            assert!(max_x as f32 <= x + width, "ink past region: {}", max_x);
            assert!(max_x as f32 <= x + measure(&line.text) + 2.0);
            assert!((min_y as f32) < line.y + font_size * 0.5);
            tops.push(min_y as f32);
        }
        let gap = tops[1] - tops[0];
        assert!((gap - style.line_height()).abs() <= 2.0, "line gap {}", gap);
    }
}
