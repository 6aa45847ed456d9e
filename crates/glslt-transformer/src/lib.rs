//! `glslt-transformer` runs GLSL source through parse, transform and print.
//!
//! ```rust
//! use glslt_lang::Shape;
//! use glslt_transformer::Transformer;
//!
//! let transformer: Transformer = Transformer::new(|job| {
//!     for literal in job.root().all_of_type(Shape::LiteralExpression) {
//!         literal.change_integer(|value| value + 1)?;
//!     }
//!     Ok(())
//! });
//!
//! assert_eq!(
//!     transformer.transform("int a = 1, b = (2, 3);").unwrap(),
//!     "int a = 2, b = (3, 4); "
//! );
//! ```
mod error;
mod filter;
mod job;
mod transformer;

pub use error::Error;
pub use filter::{MultiFilter, ParameterAccessor, ParameterizedFilter, PredicateFilter, TokenFilter};
pub use glslt_printer::{PrintType, PrinterConfig};
pub use job::Job;
pub use transformer::{State, Transformer};
