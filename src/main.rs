use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "imprint",
    version,
    about = "Stamp templated text onto one image for every row of a table"
)]
struct Cli {
    /// Base image (file path or data:...;base64,... URL)
    #[arg(short = 'i', long = "image")]
    image: String,

    /// Delimited table (CSV); the first line holds the headers
    #[arg(short = 't', long = "table")]
    table: PathBuf,

    /// Text template; *Header* is replaced by the row's cell
    #[arg(short = 'T', long = "template")]
    template: String,

    /// Text box as x,y,width,height (in --display coordinates)
    #[arg(short = 'c', long = "crop")]
    crop: String,

    /// Size the crop was drawn at, as WxH (default: natural image size)
    #[arg(long = "display")]
    display: Option<String>,

    /// Output .zip file or directory (preview: output image file)
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,

    /// Render only this row (1-based)
    #[arg(short = 'p', long = "preview")]
    preview: Option<usize>,

    /// Text color (#rgb, #rrggbb, #rrggbbaa)
    #[arg(long = "color")]
    color: Option<String>,

    /// Font size in pixels
    #[arg(long = "font-size")]
    font_size: Option<f32>,

    /// Font family (serif, sans-serif, monospace or a family name)
    #[arg(long = "font-family")]
    font_family: Option<String>,

    /// Font file to use instead of system fonts
    #[arg(long = "font-path")]
    font_path: Option<String>,

    /// Output mime type (image/png, image/jpeg, image/webp, image/bmp, image/tiff)
    #[arg(short = 'f', long = "format")]
    format: Option<String>,

    /// Output file name pattern; {n} is the row number, {ext} the extension
    #[arg(long = "name-pattern")]
    name_pattern: Option<String>,

    /// Render threads (default: one per CPU)
    #[arg(long = "threads")]
    threads: Option<usize>,

    /// Table delimiter (default: detected from the header line)
    #[arg(short = 'd', long = "delimiter")]
    delimiter: Option<char>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Print the per-row report as JSON
    #[arg(long = "report")]
    report: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    imprint::logging::init(cli.verbose)?;

    let output = imprint::run(imprint::Config {
        image: cli.image,
        table: cli.table,
        template: cli.template,
        crop: cli.crop,
        display: cli.display,
        out: cli.out,
        preview: cli.preview,
        color: cli.color,
        font_size: cli.font_size,
        font_family: cli.font_family,
        font_path: cli.font_path,
        format: cli.format,
        name_pattern: cli.name_pattern,
        threads: cli.threads,
        delimiter: cli.delimiter,
        settings_path: cli.read_settings,
        report: cli.report,
    })?;

    println!("{}", output);
    Ok(())
}
