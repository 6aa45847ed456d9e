use std::fs;
use std::path::Path;
use std::str::FromStr;

use glslt_lang::{LexerOptions, ParserOptions, Version};
use glslt_printer::{PrintType, PrinterConfig};
use miette::{IntoDiagnostic, WrapErr, miette};
use serde::Deserialize;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "glslt.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Compact,
    Indented,
    Annotated,
}

impl From<Style> for PrintType {
    fn from(style: Style) -> Self {
        match style {
            Style::Compact => PrintType::Compact,
            Style::Indented => PrintType::Indented,
            Style::Annotated => PrintType::IndentedAnnotated,
        }
    }
}

/// Contents of `glslt.toml`. Every field is optional; unset fields keep the
/// library defaults.
///
/// ```toml
/// throw_parse_errors = false
///
/// [lexer]
/// version = 330
/// enable_strings = true
///
/// [printer]
/// style = "indented"
/// indent_width = 2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub lexer: LexerSection,
    pub printer: PrinterSection,
    pub throw_parse_errors: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LexerSection {
    pub version: Option<u16>,
    pub enable_strings: Option<bool>,
    pub enable_include_directive: Option<bool>,
    pub enable_custom_directive: Option<bool>,
    pub enable_mesh_shaders: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrinterSection {
    pub style: Option<Style>,
    pub indent_width: Option<usize>,
}

impl FromStr for Config {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).into_diagnostic()
    }
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        if !path.exists() {
            return Err(miette!("Config file not found: {}", path.display()));
        }

        let content = fs::read_to_string(path).into_diagnostic()?;
        let config = Config::from_str(&content)
            .wrap_err_with(|| format!("Invalid config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Loads `explicit` if given, else `glslt.toml` from the working
    /// directory if it exists, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> miette::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Fields set in `overrides` replace the ones in `self`.
    pub fn merge(mut self, overrides: Config) -> Self {
        let lexer = overrides.lexer;
        self.lexer.version = lexer.version.or(self.lexer.version);
        self.lexer.enable_strings = lexer.enable_strings.or(self.lexer.enable_strings);
        self.lexer.enable_include_directive = lexer
            .enable_include_directive
            .or(self.lexer.enable_include_directive);
        self.lexer.enable_custom_directive = lexer
            .enable_custom_directive
            .or(self.lexer.enable_custom_directive);
        self.lexer.enable_mesh_shaders = lexer.enable_mesh_shaders.or(self.lexer.enable_mesh_shaders);

        self.printer.style = overrides.printer.style.or(self.printer.style);
        self.printer.indent_width = overrides.printer.indent_width.or(self.printer.indent_width);

        self.throw_parse_errors = overrides.throw_parse_errors.or(self.throw_parse_errors);
        self
    }

    pub fn lexer_options(&self) -> miette::Result<LexerOptions> {
        let defaults = LexerOptions::default();
        let version = match self.lexer.version {
            Some(number) => Version::from_number(number)
                .ok_or_else(|| miette!("Unsupported GLSL version: {number}"))?,
            None => defaults.version,
        };

        Ok(LexerOptions {
            version,
            enable_custom_directive: self
                .lexer
                .enable_custom_directive
                .unwrap_or(defaults.enable_custom_directive),
            enable_include_directive: self
                .lexer
                .enable_include_directive
                .unwrap_or(defaults.enable_include_directive),
            enable_strings: self.lexer.enable_strings.unwrap_or(defaults.enable_strings),
            enable_mesh_shaders: self
                .lexer
                .enable_mesh_shaders
                .unwrap_or(defaults.enable_mesh_shaders),
        })
    }

    pub fn parser_options(&self) -> miette::Result<ParserOptions> {
        Ok(ParserOptions {
            lexer: self.lexer_options()?,
            throw_parse_errors: self
                .throw_parse_errors
                .unwrap_or(ParserOptions::default().throw_parse_errors),
        })
    }

    pub fn print_type(&self) -> PrintType {
        self.printer.style.unwrap_or_default().into()
    }

    pub fn printer_config(&self) -> PrinterConfig {
        match self.printer.indent_width {
            Some(indent_width) => PrinterConfig { indent_width },
            None => PrinterConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_full_config() {
        let config = Config::from_str(
            r#"
throw_parse_errors = false

[lexer]
version = 330
enable_strings = true
enable_mesh_shaders = true

[printer]
style = "annotated"
indent_width = 2
"#,
        )
        .unwrap();

        let options = config.parser_options().unwrap();
        assert_eq!(options.lexer.version, Version::GLSL330);
        assert!(options.lexer.enable_strings);
        assert!(options.lexer.enable_mesh_shaders);
        assert!(!options.lexer.enable_include_directive);
        assert!(!options.throw_parse_errors);
        assert_eq!(config.print_type(), PrintType::IndentedAnnotated);
        assert_eq!(config.printer_config().indent_width, 2);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.parser_options().unwrap(), ParserOptions::default());
        assert_eq!(config.print_type(), PrintType::Compact);
        assert_eq!(config.printer_config().indent_width, 4);
    }

    #[rstest]
    #[case::unknown_table("[formatter]\nwidth = 1")]
    #[case::unknown_key("[lexer]\nversion = 330\nstrings = true")]
    #[case::bad_style("[printer]\nstyle = \"pretty\"")]
    #[case::bad_type("throw_parse_errors = \"no\"")]
    fn test_invalid_config(#[case] content: &str) {
        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_unsupported_version() {
        let config = Config::from_str("[lexer]\nversion = 310").unwrap();

        assert!(config.lexer_options().is_err());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = Config::from_str(
            "throw_parse_errors = false\n[lexer]\nversion = 330\nenable_strings = true\n[printer]\nstyle = \"indented\"",
        )
        .unwrap();
        let flags = Config {
            lexer: LexerSection {
                version: Some(400),
                ..Default::default()
            },
            printer: PrinterSection {
                indent_width: Some(8),
                ..Default::default()
            },
            throw_parse_errors: None,
        };

        let merged = file.merge(flags);

        assert_eq!(merged.lexer.version, Some(400));
        assert_eq!(merged.lexer.enable_strings, Some(true));
        assert_eq!(merged.printer.style, Some(Style::Indented));
        assert_eq!(merged.printer.indent_width, Some(8));
        assert_eq!(merged.throw_parse_errors, Some(false));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[printer]\nstyle = \"compact\"\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.printer.style, Some(Style::Compact));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
        assert!(Config::discover(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
