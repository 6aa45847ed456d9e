use thiserror::Error;

use super::token::Token;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum LexerError {
    #[error("No viable alternative at input `{0}`")]
    NoViableAlternative(Token),
    #[error("`{token}` requires {feature} to be enabled")]
    FailedPredicate { token: Token, feature: &'static str },
    #[error("Unterminated block comment")]
    UnterminatedComment(Token),
}

impl LexerError {
    pub fn token(&self) -> &Token {
        match self {
            LexerError::NoViableAlternative(token)
            | LexerError::FailedPredicate { token, .. }
            | LexerError::UnterminatedComment(token) => token,
        }
    }
}
