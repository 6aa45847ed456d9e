use smol_str::SmolStr;
use thiserror::Error;

use super::kind::{Role, Shape};
use crate::Token;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ParseError {
    #[error("Mismatched input `{}`, expected {expected}", if .found.is_eof() { "EOF".to_string() } else { .found.to_string() })]
    InputMismatch { expected: &'static str, found: Token },
    #[error("No viable alternative at input `{}`", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    NoViableAlternative(Token),
    #[error("Unexpected EOF detected")]
    UnexpectedEof(Token),
    #[error("Nesting exceeds {limit} levels at `{found}`")]
    NestingTooDeep { limit: u32, found: Token },
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ParseError {
    pub fn token(&self) -> Option<&Token> {
        match self {
            ParseError::InputMismatch { found, .. } | ParseError::NestingTooDeep { found, .. } => {
                Some(found)
            }
            ParseError::NoViableAlternative(token) | ParseError::UnexpectedEof(token) => {
                Some(token)
            }
            ParseError::Tree(_) => None,
        }
    }
}

/// Contract violations raised by structural and index operations.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum TreeError {
    #[error("Node has been deleted")]
    Deleted,
    #[error("Node has no parent")]
    NoParent,
    #[error("Node already has a parent")]
    AlreadyHasParent,
    #[error("Node cannot be placed inside its own subtree")]
    Cycle,
    #[error("Cannot swap a node with its own ancestor or descendant")]
    NestedSwap,
    #[error("{shape} has no `{role}` slot")]
    NoSuchSlot { shape: Shape, role: Role },
    #[error("`{role}` of {shape} is not a list slot")]
    NotAList { shape: Shape, role: Role },
    #[error("`{role}` of {shape} is a list slot")]
    NotASingleSlot { shape: Shape, role: Role },
    #[error("Index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Expected exactly one match for {query}, found {found}")]
    ExactlyOne { query: SmolStr, found: usize },
    #[error("Expected {expected} but found {found}")]
    WrongKind { expected: Shape, found: Shape },
    #[error("Root was not configured with a prefix index")]
    PrefixIndexUnavailable,
    #[error("Node is registered in another root")]
    CrossRoot,
}
