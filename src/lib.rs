pub mod batch;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod render;
pub mod settings;
pub mod source;
pub mod table;
pub mod template;

#[cfg(test)]
mod test_util;

use anyhow::{Context, Result, anyhow};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use batch::{
    BatchArchive, BatchInput, BatchOptions, BatchRenderer, BatchReport, DirectorySink, FrameSink,
    NamingScheme, RowOutcome, RowStatus, ZipSink, render_preview, render_row,
};
pub use error::{ComposeError, ComposeResult};
pub use geometry::{CropRegion, CropSelection, ScaledRegion, map_crop};
pub use render::{
    Compositor, FontContext, OutputFormat, OutputFrame, PositionedLine, RenderJob, TextColor,
    TextStyle, wrap_text,
};
pub use source::{ImageSource, SourceImage};
pub use table::Table;

/// Command line request, after argument parsing.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub image: String,
    pub table: PathBuf,
    pub template: String,
    pub crop: String,
    pub display: Option<String>,
    pub out: Option<PathBuf>,
    /// 1-based row to render alone.
    pub preview: Option<usize>,
    pub color: Option<String>,
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
    pub font_path: Option<String>,
    pub format: Option<String>,
    pub name_pattern: Option<String>,
    pub threads: Option<usize>,
    pub delimiter: Option<char>,
    pub settings_path: Option<String>,
    pub report: bool,
}

pub fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    apply_overrides(&mut settings, &config);

    let style = settings.text_style()?;
    let options = settings.batch_options()?;
    let table = Table::load(&config.table, config.delimiter)?;
    let image = ImageSource::from_arg(&config.image).load()?;

    let region = geometry::parse_crop(&config.crop)?;
    let (display_width, display_height) = match config.display.as_deref() {
        Some(value) => geometry::parse_size(value)?,
        None => (image.width() as f32, image.height() as f32),
    };
    let region = image.scale_selection(&CropSelection {
        region,
        display_width,
        display_height,
    })?;

    let font_path = settings.font_path.as_deref().map(Path::new);
    let fonts = FontContext::load(&settings.font_family, font_path)?;
    let compositor = Compositor::new(fonts);
    let input = BatchInput {
        region,
        template: &config.template,
        table: &table,
        style: &style,
    };

    if let Some(first) = table.row(0) {
        let missing = template::unresolved_placeholders(&config.template, table.headers(), first);
        if !missing.is_empty() {
            warn!("template: unresolved placeholders in row 1: {}", missing.join(", "));
        }
    }

    if let Some(row) = config.preview {
        let index = row
            .checked_sub(1)
            .ok_or_else(|| anyhow!("--preview rows are numbered from 1"))?;
        let bytes = render_preview(&compositor, &image, input, index, options.format)?;
        let out = config
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from(options.naming.file_name(index, options.format)));
        fs::write(&out, &bytes)
            .with_context(|| format!("failed to write preview: {}", out.display()))?;
        info!("preview: wrote {}", out.display());
        return Ok(format!("wrote {}", out.display()));
    }

    let out = config
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.archive_name));
    let renderer = BatchRenderer::new(&compositor, options)?;
    let report = if is_zip_path(&out) {
        let report = write_zip(&out, |sink| renderer.render_all(&image, input, sink))?;
        info!("archive: wrote {} ({} entries)", out.display(), report.succeeded().count());
        report
    } else {
        let mut sink = DirectorySink::create(&out)?;
        renderer.render_all(&image, input, &mut sink)?
    };

    if config.report {
        return serde_json::to_string_pretty(&report).context("failed to serialize report");
    }
    Ok(report.summary())
}

fn apply_overrides(settings: &mut settings::Settings, config: &Config) {
    if let Some(color) = &config.color {
        settings.text_color = color.clone();
    }
    if let Some(size) = config.font_size {
        settings.font_size = size;
    }
    if let Some(family) = &config.font_family {
        settings.font_family = family.clone();
    }
    if let Some(path) = &config.font_path {
        settings.font_path = Some(path.clone());
    }
    if let Some(format) = &config.format {
        settings.output_format = format.clone();
    }
    if let Some(pattern) = &config.name_pattern {
        settings.file_name = pattern.clone();
    }
    if config.threads.is_some() {
        settings.threads = config.threads;
    }
}

/// Writes a zip at `out`; a batch that aborts midway leaves no partial archive behind.
fn write_zip<F>(out: &Path, render: F) -> Result<BatchReport>
where
    F: FnOnce(&mut ZipSink<BufWriter<File>>) -> ComposeResult<BatchReport>,
{
    let file = File::create(out)
        .with_context(|| format!("failed to create archive: {}", out.display()))?;
    let mut sink = ZipSink::new(BufWriter::new(file));
    let written = render(&mut sink)
        .map_err(anyhow::Error::from)
        .and_then(|report| {
            sink.finish()?
                .flush()
                .with_context(|| format!("failed to flush archive: {}", out.display()))?;
            Ok(report)
        });
    if written.is_err() {
        if let Err(err) = fs::remove_file(out) {
            warn!("archive: failed to remove partial {}: {}", out.display(), err);
        }
    }
    written
}

fn is_zip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}
