//! `glslt-printer` turns a glslt syntax tree back into GLSL source.
//!
//! ```rust
//! use glslt_lang::{Frontend, Root};
//! use glslt_printer::{PrintType, print};
//!
//! let root = Root::default();
//! let tree = Frontend::default()
//!     .parse_translation_unit(&root, "int a=1,b;")
//!     .unwrap();
//!
//! assert_eq!(print(&tree, PrintType::Compact), "int a = 1, b; ");
//! assert_eq!(print(&tree, PrintType::Indented), "int a = 1, b;\n");
//! ```
mod printer;

pub use printer::{Printer, PrinterConfig};

/// Output layout of the printer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum PrintType {
    /// Everything on one line, separated by single spaces.
    #[default]
    Compact,
    /// One external declaration per line with indented blocks.
    Indented,
    /// Like `Indented`, with `#line` directives wherever the output line
    /// drifts from the recorded source line.
    #[strum(serialize = "annotated")]
    IndentedAnnotated,
}

/// Prints `node` with the default configuration.
pub fn print(node: &glslt_lang::Node, print_type: PrintType) -> String {
    Printer::new(None).print(node, print_type)
}
