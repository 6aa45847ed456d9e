//! `glslt-lang` provides a GLSL lexer and parser producing a mutable syntax
//! tree that stays indexed while it is edited.
//!
//! ## Examples
//!
//! ```rust
//! use glslt_lang::{Frontend, ParserOptions, RootSupplier, Shape};
//!
//! let root = RootSupplier::DEFAULT.supply();
//! let frontend = Frontend::new(ParserOptions::default());
//! frontend
//!     .parse_translation_unit(&root, "int a = 1, b = a;")
//!     .unwrap();
//!
//! assert_eq!(root.count_of_type(Shape::DeclarationMember), 2);
//! assert_eq!(root.all_named("a").len(), 2);
//!
//! for identifier in root.all_named("a") {
//!     identifier.set_name("renamed").unwrap();
//! }
//! assert!(!root.has_identifier("a"));
//! ```
mod ast;
mod error;
mod frontend;
mod lexer;
mod literal;
mod range;
mod root;

pub use ast::error::{ParseError, TreeError};
pub use ast::inject::InjectionPoint;
pub use ast::kind::{
    AssignmentOp, BinaryOp, Directive, DirectiveKind, NodeKind, QualifierKind, Role, Shape,
    SlotSpec, UnaryOp,
};
pub use ast::node::{MembershipState, Node, NodeId, WeakNode};
pub use ast::parser::{MAX_NESTING_DEPTH, Parser as AstParser};
pub use ast::visit::{VisitResult, Visitor, walk};
pub use error::{Error, InnerError};
pub use frontend::{Frontend, ParseErrorListener, ParseUnit, ParserOptions};
pub use lexer::Lexer;
pub use lexer::Options as LexerOptions;
pub use lexer::error::LexerError;
pub use lexer::token::{Keyword, Token, TokenKind, Version, builtin_type_version};
pub use literal::{Literal, Radix};
pub use range::{Position, Range};
pub use root::{PrefixMatches, Registrar, Root, RootId, RootSupplier};

pub type Shared<T> = std::rc::Rc<T>;
pub type SharedCell<T> = std::cell::RefCell<T>;

/// Parses a translation unit with default options into a fresh root.
#[allow(clippy::result_large_err)]
pub fn parse(code: &str) -> Result<Root, Error> {
    let root = RootSupplier::DEFAULT.supply();
    Frontend::default().parse_translation_unit(&root, code)?;
    Ok(root)
}

#[allow(clippy::result_large_err)]
pub fn tokenize(code: &str, options: LexerOptions) -> Result<Vec<Token>, Error> {
    Lexer::new(options)
        .tokenize(code)
        .map_err(|e| Error::from_error(code, InnerError::Lexer(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("int a;", true)]
    #[case("int a", false)]
    #[case("int $;", false)]
    fn test_parse(#[case] code: &str, #[case] ok: bool) {
        assert_eq!(parse(code).is_ok(), ok);
    }

    #[test]
    fn test_tokenize_reports_location() {
        let error = tokenize("int\n  $", LexerOptions::default()).unwrap_err();
        assert_eq!(error.location.offset(), 6);
    }
}
