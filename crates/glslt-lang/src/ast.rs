pub mod error;
pub mod inject;
pub mod kind;
pub mod node;
pub mod parser;
pub mod visit;
