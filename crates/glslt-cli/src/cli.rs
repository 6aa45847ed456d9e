use std::cell::RefCell;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use glslt_transformer::Transformer;
use miette::{IntoDiagnostic, miette};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LexerSection, PrinterSection, Style};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "GLSLT_LOG";

const STDIN_NAME: &str = "<stdin>";

#[derive(Parser, Debug, Default)]
#[command(name = "glslt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To reformat a shader:\n\
    glslt --style indented shader.frag\n\n\
    ## To read from stdin:\n\
    cat shader.vert | glslt\n\n\
    ## To validate shaders without printing them:\n\
    glslt --check --no-throw *.glsl")]
#[command(
    about = "glslt parses GLSL shaders and prints them back in a normalized layout.",
    long_about = None
)]
pub struct Cli {
    #[clap(flatten)]
    lexer: LexerArgs,

    #[clap(flatten)]
    output: OutputArgs,

    /// Read options from this TOML file instead of ./glslt.toml
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only parse the input and report syntax errors
    #[arg(long, default_value_t = false)]
    check: bool,

    /// Report every syntax error instead of stopping at the first one
    #[arg(long, default_value_t = false)]
    no_throw: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Shader files to process. Reads stdin when none are given
    files: Vec<PathBuf>,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct LexerArgs {
    /// GLSL version used to decide which words are reserved
    #[arg(id = "glsl_version", long = "glsl-version", value_name = "VERSION")]
    version: Option<u16>,

    /// Accept string literals
    #[arg(long, default_value_t = false)]
    enable_strings: bool,

    /// Accept #include directives
    #[arg(long, default_value_t = false)]
    enable_include: bool,

    /// Accept #custom directives
    #[arg(long, default_value_t = false)]
    enable_custom: bool,

    /// Reserve the mesh shader keywords
    #[arg(long, default_value_t = false)]
    enable_mesh_shaders: bool,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct OutputArgs {
    /// Output layout
    #[arg(short, long, value_enum)]
    style: Option<Style>,

    /// Number of spaces per indentation level
    #[arg(short, long)]
    indent_width: Option<usize>,
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        self.init_logging();

        let config = Config::discover(self.config.as_deref())?.merge(self.overrides());
        let errors = Rc::new(RefCell::new(Vec::new()));
        let transformer = Self::transformer(&config, Rc::clone(&errors))?;

        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());
        let mut failed = 0;

        for (name, content) in self.read_inputs()? {
            tracing::info!(input = %name, "processing");

            let result = if self.check {
                transformer
                    .parse_separate_translation_unit(&content)
                    .map(|_| None)
            } else {
                transformer.transform(&content).map(Some)
            };

            let reported = errors.take();
            if !reported.is_empty() {
                failed += 1;
                eprintln!("{}: {} syntax error(s)", name, reported.len());
                for error in reported {
                    eprintln!("{:?}", miette::Report::new(error));
                }
            }

            match result {
                Ok(Some(output)) => {
                    writeln!(handle, "{}", output.trim_end()).into_diagnostic()?;
                }
                Ok(None) => {}
                Err(error) => {
                    handle.flush().into_diagnostic()?;
                    tracing::error!(input = %name, "failed to process input");
                    return Err(miette::Report::new(error));
                }
            }
        }

        handle.flush().into_diagnostic()?;

        if failed > 0 {
            Err(miette!("Syntax errors found in {failed} input(s)"))
        } else {
            Ok(())
        }
    }

    fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
        // A subscriber may already be installed when running inside tests.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    }

    /// Flags expressed as a config so they can be layered over the file.
    fn overrides(&self) -> Config {
        let flag = |enabled: bool| enabled.then_some(true);

        Config {
            lexer: LexerSection {
                version: self.lexer.version,
                enable_strings: flag(self.lexer.enable_strings),
                enable_include_directive: flag(self.lexer.enable_include),
                enable_custom_directive: flag(self.lexer.enable_custom),
                enable_mesh_shaders: flag(self.lexer.enable_mesh_shaders),
            },
            printer: PrinterSection {
                style: self.output.style,
                indent_width: self.output.indent_width,
            },
            throw_parse_errors: self.no_throw.then_some(false),
        }
    }

    fn transformer(
        config: &Config,
        errors: Rc<RefCell<Vec<glslt_lang::Error>>>,
    ) -> miette::Result<Transformer> {
        let mut transformer = Transformer::default();
        transformer.set_parser_options(config.parser_options()?);
        transformer.set_print_type(config.print_type());
        transformer.set_printer_config(config.printer_config());
        transformer.add_error_listener(move |error: &glslt_lang::Error| {
            errors.borrow_mut().push(error.clone())
        });

        Ok(transformer)
    }

    fn read_inputs(&self) -> miette::Result<Vec<(String, String)>> {
        if self.files.is_empty() {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input).into_diagnostic()?;
            return Ok(vec![(STDIN_NAME.to_string(), input)]);
        }

        self.files
            .iter()
            .map(|file| {
                if !file.exists() {
                    return Err(miette!("File not found: {}", file.display()));
                }
                let content = fs::read_to_string(file).into_diagnostic()?;
                Ok((file.display().to_string(), content))
            })
            .collect()
    }
}
