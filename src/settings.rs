use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::batch::{BatchOptions, DEFAULT_CHUNK_SIZE, DEFAULT_NAME_PATTERN, NamingScheme};
use crate::render::{
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_LINE_HEIGHT_RATIO, OutputFormat, TextColor,
    TextStyle,
};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const HOME_DIR_NAME: &str = ".imprint";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub text_color: String,
    pub font_size: f32,
    pub font_family: String,
    pub font_path: Option<String>,
    pub line_height_ratio: f32,
    pub output_format: String,
    pub file_name: String,
    pub archive_name: String,
    pub threads: Option<usize>,
    pub chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_color: "#FFFFFF".to_string(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_path: None,
            line_height_ratio: DEFAULT_LINE_HEIGHT_RATIO,
            output_format: "image/png".to_string(),
            file_name: DEFAULT_NAME_PATTERN.to_string(),
            archive_name: "output.zip".to_string(),
            threads: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    text: Option<TextSettings>,
    output: Option<OutputSettings>,
    batch: Option<BatchSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct TextSettings {
    color: Option<String>,
    font_size: Option<f32>,
    font_family: Option<String>,
    font_path: Option<String>,
    line_height_ratio: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    format: Option<String>,
    file_name: Option<String>,
    archive_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchSettings {
    threads: Option<usize>,
    chunk_size: Option<usize>,
}

/// Built-in defaults, then `./settings.toml`, `./settings.local.toml`, the same two
/// files under `$HOME/.imprint`, then `extra_path` if given.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }
    load_settings_from(&ordered_paths)
}

/// Merges existing files from `paths` in order over the built-in defaults.
pub fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).context("failed to parse built-in settings")?;
    settings.merge(defaults);

    for path in paths {
        if !path.exists() {
            continue;
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let parsed: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        settings.merge(parsed);
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(text) = incoming.text {
            if let Some(color) = non_blank(text.color) {
                self.text_color = color;
            }
            if let Some(size) = text.font_size.filter(|size| *size > 0.0) {
                self.font_size = size;
            }
            if let Some(family) = non_blank(text.font_family) {
                self.font_family = family;
            }
            if let Some(path) = non_blank(text.font_path) {
                self.font_path = Some(path);
            }
            if let Some(ratio) = text.line_height_ratio.filter(|ratio| *ratio > 0.0) {
                self.line_height_ratio = ratio;
            }
        }
        if let Some(output) = incoming.output {
            if let Some(format) = non_blank(output.format) {
                self.output_format = format;
            }
            if let Some(pattern) = non_blank(output.file_name) {
                self.file_name = pattern;
            }
            if let Some(name) = non_blank(output.archive_name) {
                self.archive_name = name;
            }
        }
        if let Some(batch) = incoming.batch {
            if let Some(threads) = batch.threads.filter(|threads| *threads > 0) {
                self.threads = Some(threads);
            }
            if let Some(chunk) = batch.chunk_size.filter(|chunk| *chunk > 0) {
                self.chunk_size = chunk;
            }
        }
    }

    pub fn text_style(&self) -> Result<TextStyle> {
        let color = TextColor::parse(&self.text_color)?;
        let style = TextStyle::new(color, self.font_size)?
            .with_line_height_ratio(self.line_height_ratio)?;
        Ok(style)
    }

    pub fn batch_options(&self) -> Result<BatchOptions> {
        Ok(BatchOptions {
            naming: NamingScheme::new(self.file_name.clone())?,
            format: OutputFormat::from_mime(&self.output_format)?,
            threads: self.threads,
            chunk_size: self.chunk_size,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(HOME_DIR_NAME))
        }
    })
}
