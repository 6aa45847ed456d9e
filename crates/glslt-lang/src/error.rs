use miette::{Diagnostic, LabeledSpan, SourceOffset, SourceSpan};

use crate::ast::error::{ParseError, TreeError};
use crate::lexer::error::LexerError;
use crate::lexer::token::Token;

#[allow(clippy::useless_conversion)]
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl InnerError {
    pub fn token(&self) -> Option<&Token> {
        match self {
            InnerError::Lexer(err) => Some(err.token()),
            InnerError::Parse(err) => err.token(),
            InnerError::Tree(_) => None,
        }
    }
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, Clone, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The source code related to the error.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: InnerError) -> Self {
        let source_code = source_code.into();

        let location = match cause.token() {
            Some(token) if !token.is_eof() => {
                let start = SourceOffset::from_location(
                    &source_code,
                    token.range.start.line as usize,
                    token.range.start.column,
                );
                let end = SourceOffset::from_location(
                    &source_code,
                    token.range.end.line as usize,
                    token.range.end.column,
                );

                SourceSpan::new(
                    start,
                    std::cmp::max(end.offset().saturating_sub(start.offset()), 1),
                )
            }
            Some(_) => {
                let lines = source_code.lines();
                let line = lines.clone().count().max(1);
                let column = lines.last().map(|line| line.len()).unwrap_or(0);
                SourceSpan::new(SourceOffset::from_location(&source_code, line, column), 1)
            }
            None => SourceSpan::new(SourceOffset::from(0), 0),
        };

        Self {
            cause,
            source_code,
            location,
        }
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match &self.cause {
            InnerError::Lexer(LexerError::NoViableAlternative(_)) => {
                "LexerError::NoViableAlternative"
            }
            InnerError::Lexer(LexerError::FailedPredicate { .. }) => "LexerError::FailedPredicate",
            InnerError::Lexer(LexerError::UnterminatedComment(_)) => {
                "LexerError::UnterminatedComment"
            }
            InnerError::Parse(ParseError::InputMismatch { .. }) => "ParseError::InputMismatch",
            InnerError::Parse(ParseError::NoViableAlternative(_)) => {
                "ParseError::NoViableAlternative"
            }
            InnerError::Parse(ParseError::UnexpectedEof(_)) => "ParseError::UnexpectedEof",
            InnerError::Parse(ParseError::NestingTooDeep { .. }) => "ParseError::NestingTooDeep",
            InnerError::Parse(ParseError::Tree(_)) | InnerError::Tree(_) => "TreeError",
        };

        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(LexerError::NoViableAlternative(_)) => {
                Some("Remove or replace the character; it does not start any GLSL token.".to_string())
            }
            InnerError::Lexer(LexerError::FailedPredicate { feature, .. }) => {
                Some(format!("Enable {feature} in the lexer options to accept this input."))
            }
            InnerError::Lexer(LexerError::UnterminatedComment(_)) => {
                Some("Close the block comment with `*/`.".to_string())
            }
            InnerError::Parse(ParseError::InputMismatch { expected, .. }) => {
                Some(format!("Insert {expected} here."))
            }
            InnerError::Parse(ParseError::NoViableAlternative(_)) => Some(
                "Check the selected GLSL version; words reserved in later versions cannot be used as names."
                    .to_string(),
            ),
            InnerError::Parse(ParseError::UnexpectedEof(_)) => Some(
                "Input ended unexpectedly. Check for missing closing brackets or semicolons."
                    .to_string(),
            ),
            InnerError::Parse(ParseError::NestingTooDeep { .. }) => Some(
                "Split the expression or block into smaller pieces.".to_string(),
            ),
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            None,
            self.location,
        ))))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::TokenKind;
    use crate::range::{Position, Range};
    use rstest::rstest;

    fn token(kind: TokenKind, start: (u32, usize), end: (u32, usize)) -> Token {
        Token {
            range: Range::new(Position::new(start.0, start.1), Position::new(end.0, end.1)),
            kind,
        }
    }

    #[rstest]
    #[case::lexer(
        InnerError::Lexer(LexerError::NoViableAlternative(token(TokenKind::Identifier("$".into()), (1, 5), (1, 6)))),
        "int $;",
        SourceSpan::new(4.into(), 1)
    )]
    #[case::mismatch(
        InnerError::Parse(ParseError::InputMismatch {
            expected: "`;`",
            found: token(TokenKind::Identifier("b".into()), (2, 1), (2, 2)),
        }),
        "int a\nb",
        SourceSpan::new(6.into(), 1)
    )]
    #[case::tree(InnerError::Tree(TreeError::Deleted), "int a;", SourceSpan::new(0.into(), 0))]
    fn test_from_error_location(
        #[case] cause: InnerError,
        #[case] source: &str,
        #[case] expected: SourceSpan,
    ) {
        let error = Error::from_error(source, cause);

        assert_eq!(error.location, expected);
        assert_eq!(error.source_code, source);
    }

    #[test]
    fn test_diagnostic_code() {
        let error = Error::from_error(
            "int",
            InnerError::Parse(ParseError::UnexpectedEof(token(TokenKind::Eof, (1, 4), (1, 4)))),
        );

        assert_eq!(
            error.code().map(|code| code.to_string()),
            Some("ParseError::UnexpectedEof".to_string())
        );
        assert!(error.help().is_some());
    }
}
