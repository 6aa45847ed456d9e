use std::fmt::{self, Debug, Formatter};

use crate::ast::node::Node;
use crate::ast::parser::Parser;
use crate::error::{Error, InnerError};
use crate::lexer::token::Token;
use crate::lexer::{Lexer, Options as LexerOptions};
use crate::root::{Root, RootSupplier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub lexer: LexerOptions,
    /// Fail on the first syntax error. When disabled, errors are reported to
    /// the registered listeners and parsing continues where it can.
    pub throw_parse_errors: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            lexer: LexerOptions::default(),
            throw_parse_errors: true,
        }
    }
}

/// Receives syntax errors produced while `throw_parse_errors` is disabled.
pub trait ParseErrorListener {
    fn syntax_error(&self, error: &Error);
}

impl<F> ParseErrorListener for F
where
    F: Fn(&Error),
{
    fn syntax_error(&self, error: &Error) {
        self(error)
    }
}

/// The grammar rule a piece of source is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseUnit {
    TranslationUnit,
    ExternalDeclaration,
    Statement,
    Expression,
}

/// Lexes and parses source text into nodes registered with a [`Root`].
#[derive(Default)]
pub struct Frontend {
    options: ParserOptions,
    listeners: Vec<Box<dyn ParseErrorListener>>,
}

impl Debug for Frontend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frontend")
            .field("options", &self.options)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[allow(clippy::result_large_err)]
impl Frontend {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            listeners: Vec::new(),
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ParserOptions) {
        self.options = options;
    }

    pub fn add_error_listener(&mut self, listener: impl ParseErrorListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn report(&self, error: &Error) {
        tracing::warn!(%error, "syntax error");
        for listener in &self.listeners {
            listener.syntax_error(error);
        }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, Error> {
        let lexer = Lexer::new(self.options.lexer);

        if self.options.throw_parse_errors {
            return lexer
                .tokenize(input)
                .map_err(|e| Error::from_error(input, InnerError::Lexer(e)));
        }

        let (tokens, errors) = lexer.tokenize_with_recovery(input);
        for error in errors {
            self.report(&Error::from_error(input, InnerError::Lexer(error)));
        }
        Ok(tokens)
    }

    /// Parses already lexed tokens. `input` is only used for diagnostics.
    ///
    /// A translation unit becomes the tree of `root`; any other unit is
    /// registered with `root` as a standalone tree.
    pub fn parse_tokens(
        &self,
        root: &Root,
        input: &str,
        tokens: Vec<Token>,
        unit: ParseUnit,
    ) -> Result<Node, Error> {
        let throw = self.options.throw_parse_errors;
        let mut parser = Parser::new(tokens).with_recovery(!throw);

        let result = match unit {
            ParseUnit::TranslationUnit => parser.parse_translation_unit(),
            ParseUnit::ExternalDeclaration => parser.parse_external_declaration(),
            ParseUnit::Statement => parser.parse_statement(),
            ParseUnit::Expression => parser.parse_expression(),
        };

        for error in parser.take_errors() {
            self.report(&Error::from_error(input, InnerError::Parse(error)));
        }

        let node = result.map_err(|e| {
            let error = Error::from_error(input, InnerError::Parse(e));
            if !throw {
                self.report(&error);
            }
            error
        })?;

        match unit {
            ParseUnit::TranslationUnit => {
                root.set_tree(&node)
                    .map_err(|e| Error::from_error(input, InnerError::Tree(e)))?;
            }
            _ => root.attach_subtree(&node),
        }

        tracing::debug!(root = %root.id(), ?unit, "parsed");
        Ok(node)
    }

    pub fn parse(&self, root: &Root, input: &str, unit: ParseUnit) -> Result<Node, Error> {
        let tokens = self.tokenize(input)?;
        self.parse_tokens(root, input, tokens, unit)
    }

    /// Parses `input` into a new root made by `supplier`.
    pub fn parse_with_supplier(
        &self,
        supplier: RootSupplier,
        input: &str,
        unit: ParseUnit,
    ) -> Result<(Root, Node), Error> {
        let root = supplier.supply();
        let node = self.parse(&root, input, unit)?;
        Ok((root, node))
    }

    pub fn parse_translation_unit(&self, root: &Root, input: &str) -> Result<Node, Error> {
        self.parse(root, input, ParseUnit::TranslationUnit)
    }

    pub fn parse_external_declaration(&self, root: &Root, input: &str) -> Result<Node, Error> {
        self.parse(root, input, ParseUnit::ExternalDeclaration)
    }

    pub fn parse_statement(&self, root: &Root, input: &str) -> Result<Node, Error> {
        self.parse(root, input, ParseUnit::Statement)
    }

    pub fn parse_expression(&self, root: &Root, input: &str) -> Result<Node, Error> {
        self.parse(root, input, ParseUnit::Expression)
    }
}
