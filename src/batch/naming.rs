use crate::error::{ComposeError, ComposeResult};
use crate::render::OutputFormat;

pub const DEFAULT_NAME_PATTERN: &str = "output-{n}.{ext}";

/// File names for batch outputs.
///
/// `{n}` is the 1-based row number and is required, which keeps names unique within
/// a batch. `{ext}` expands to the output format's extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    pattern: String,
}

impl NamingScheme {
    pub fn new(pattern: impl Into<String>) -> ComposeResult<Self> {
        let pattern = pattern.into();
        if !pattern.contains("{n}") {
            return Err(ComposeError::config(format!(
                "file name pattern '{}' must contain {{n}}",
                pattern
            )));
        }
        if pattern.contains('/') || pattern.contains('\\') {
            return Err(ComposeError::config(format!(
                "file name pattern '{}' must not contain path separators",
                pattern
            )));
        }
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Name for the row at 0-based `index`.
    pub fn file_name(&self, index: usize, format: OutputFormat) -> String {
        self.pattern
            .replace("{n}", &(index + 1).to_string())
            .replace("{ext}", format.extension())
    }
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_NAME_PATTERN.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_are_one_based() {
        let naming = NamingScheme::default();
        assert_eq!(naming.file_name(0, OutputFormat::Png), "output-1.png");
        assert_eq!(naming.file_name(9, OutputFormat::Jpeg), "output-10.jpg");
    }

    #[test]
    fn custom_pattern_without_extension_placeholder() {
        let naming = NamingScheme::new("certificado-{n}.png").unwrap();
        assert_eq!(naming.file_name(2, OutputFormat::Png), "certificado-3.png");
    }

    #[test]
    fn pattern_must_number_rows() {
        assert!(matches!(
            NamingScheme::new("same.png"),
            Err(ComposeError::Config(_))
        ));
        assert!(NamingScheme::new("dir/{n}.png").is_err());
    }
}
