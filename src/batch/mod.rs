mod naming;
mod sink;

use rayon::prelude::*;
use serde::Serialize;
use std::io::Cursor;
use tracing::{debug, info, warn};

use crate::error::{ComposeError, ComposeResult};
use crate::geometry::ScaledRegion;
use crate::render::{Compositor, OutputFormat, RenderJob, TextStyle};
use crate::source::{ImageSource, SourceImage};
use crate::table::Table;

pub use naming::{DEFAULT_NAME_PATTERN, NamingScheme};
pub use sink::{DirectorySink, FrameSink, ZipSink};

pub const DEFAULT_CHUNK_SIZE: usize = 16;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub naming: NamingScheme,
    pub format: OutputFormat,
    /// Worker threads; `None` uses one per CPU.
    pub threads: Option<usize>,
    /// Rows rendered per parallel round before their frames are flushed to the sink.
    pub chunk_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            naming: NamingScheme::default(),
            format: OutputFormat::Png,
            threads: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    Rendered { bytes: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    /// 0-based position in the table.
    pub index: usize,
    pub file_name: String,
    #[serde(flatten)]
    pub status: RowStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub rows: Vec<RowOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &RowOutcome> {
        self.rows
            .iter()
            .filter(|row| matches!(row.status, RowStatus::Rendered { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &RowOutcome> {
        self.rows
            .iter()
            .filter(|row| matches!(row.status, RowStatus::Failed { .. }))
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }

    /// One line for the user, e.g. `rendered 9 of 10 rows (failed: 4)`.
    pub fn summary(&self) -> String {
        let rendered = self.succeeded().count();
        let failed = self
            .failed()
            .map(|row| (row.index + 1).to_string())
            .collect::<Vec<_>>();
        let mut line = format!("rendered {} of {} rows", rendered, self.rows.len());
        if !failed.is_empty() {
            line.push_str(&format!(" (failed: {})", failed.join(", ")));
        }
        line
    }
}

/// A finished in-memory zip and the per-row results that went into it.
#[derive(Debug, Clone)]
pub struct BatchArchive {
    pub bytes: Vec<u8>,
    pub report: BatchReport,
}

/// Shared, read-only inputs of one batch.
#[derive(Clone, Copy)]
pub struct BatchInput<'a> {
    pub region: ScaledRegion,
    pub template: &'a str,
    pub table: &'a Table,
    pub style: &'a TextStyle,
}

pub struct BatchRenderer<'a> {
    compositor: &'a Compositor,
    options: BatchOptions,
    pool: rayon::ThreadPool,
}

impl<'a> BatchRenderer<'a> {
    pub fn new(compositor: &'a Compositor, options: BatchOptions) -> ComposeResult<Self> {
        if options.chunk_size == 0 {
            return Err(ComposeError::config("batch chunk size must be >= 1"));
        }
        let pool = build_thread_pool(options.threads)?;
        Ok(Self {
            compositor,
            options,
            pool,
        })
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Loads the shared image once, then renders every row into `sink`.
    ///
    /// An image that cannot be loaded fails the whole batch; nothing is rendered.
    pub fn render_source<S: FrameSink>(
        &self,
        source: &ImageSource,
        input: BatchInput<'_>,
        sink: &mut S,
    ) -> ComposeResult<BatchReport> {
        let image = source.load()?;
        self.render_all(&image, input, sink)
    }

    /// Renders one frame per table row, in table order, into `sink`.
    ///
    /// A row that fails to render or encode is recorded in the report and skipped.
    /// Sink errors abort the batch since the archive would be incomplete.
    pub fn render_all<S: FrameSink>(
        &self,
        image: &SourceImage,
        input: BatchInput<'_>,
        sink: &mut S,
    ) -> ComposeResult<BatchReport> {
        let format = self.options.format;
        self.render_rows_with(image, input, sink, |row| {
            render_row(self.compositor, image, input, row, format)
        })
    }

    /// Chunked fan-out shared by every batch entry point; `render` turns one row into
    /// encoded bytes.
    fn render_rows_with<S, F>(
        &self,
        image: &SourceImage,
        input: BatchInput<'_>,
        sink: &mut S,
        render: F,
    ) -> ComposeResult<BatchReport>
    where
        S: FrameSink,
        F: Fn(&[String]) -> ComposeResult<Vec<u8>> + Sync,
    {
        input.style.validate()?;
        let rows = input.table.rows();
        info!(
            "batch: {} rows, {}x{} image, {} threads",
            rows.len(),
            image.width(),
            image.height(),
            self.pool.current_num_threads()
        );

        let mut report = BatchReport {
            rows: Vec::with_capacity(rows.len()),
        };
        let chunk_size = self.options.chunk_size;
        for (chunk_idx, chunk) in rows.chunks(chunk_size).enumerate() {
            let base = chunk_idx * chunk_size;
            let rendered = self.pool.install(|| {
                chunk
                    .par_iter()
                    .map(|row| render(row.as_slice()))
                    .collect::<Vec<_>>()
            });

            for (offset, result) in rendered.into_iter().enumerate() {
                let index = base + offset;
                let file_name = self.options.naming.file_name(index, self.options.format);
                let status = match result {
                    Ok(bytes) => {
                        sink.add_frame(&file_name, &bytes)?;
                        RowStatus::Rendered { bytes: bytes.len() }
                    }
                    Err(err) => {
                        warn!("batch: row {} failed: {}", index + 1, err);
                        RowStatus::Failed {
                            reason: err.to_string(),
                        }
                    }
                };
                report.rows.push(RowOutcome {
                    index,
                    file_name,
                    status,
                });
            }
            debug!("batch: flushed rows {}..{}", base + 1, base + chunk.len());
        }

        info!("batch: {}", report.summary());
        Ok(report)
    }

    /// Renders the batch into an in-memory zip archive.
    pub fn render_archive(
        &self,
        image: &SourceImage,
        input: BatchInput<'_>,
    ) -> ComposeResult<BatchArchive> {
        let mut sink = ZipSink::new(Cursor::new(Vec::new()));
        let report = self.render_all(image, input, &mut sink)?;
        let bytes = sink.finish()?.into_inner();
        Ok(BatchArchive { bytes, report })
    }
}

/// Renders a single row to encoded bytes.
///
/// This is the same path the batch takes for every row, so a preview is
/// pixel-identical to the matching archive entry.
pub fn render_row(
    compositor: &Compositor,
    image: &SourceImage,
    input: BatchInput<'_>,
    row: &[String],
    format: OutputFormat,
) -> ComposeResult<Vec<u8>> {
    let job = RenderJob {
        image,
        region: input.region,
        template: input.template,
        headers: input.table.headers(),
        row,
        style: input.style,
    };
    job.render(compositor)?.encode(format)
}

/// Renders the row at 0-based `index` of the table.
pub fn render_preview(
    compositor: &Compositor,
    image: &SourceImage,
    input: BatchInput<'_>,
    index: usize,
    format: OutputFormat,
) -> ComposeResult<Vec<u8>> {
    input.style.validate()?;
    let row = input.table.row(index).ok_or_else(|| {
        ComposeError::config(format!(
            "row {} is out of range (table has {} rows)",
            index + 1,
            input.table.len()
        ))
    })?;
    render_row(compositor, image, input, row, format)
}

fn build_thread_pool(threads: Option<usize>) -> ComposeResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(ComposeError::config(
            "batch 'threads' must be >= 1 when set",
        ));
    }
    let threads = threads.unwrap_or_else(num_cpus::get).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|err| ComposeError::config(format!("failed to build render thread pool: {}", err)))
}
