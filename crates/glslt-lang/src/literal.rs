use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Radix {
    #[default]
    Decimal,
    Octal,
    Hex,
}

/// A literal value as written in the source.
///
/// Floats keep their source text so that printing an unedited tree reproduces
/// the original spelling (`1.`, `1e3`, `2.0lf`).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int {
        value: i64,
        unsigned: bool,
        radix: Radix,
    },
    Float {
        value: f64,
        text: SmolStr,
    },
    String(SmolStr),
}

impl Literal {
    pub fn int(value: i64) -> Self {
        Literal::Int {
            value,
            unsigned: false,
            radix: Radix::Decimal,
        }
    }

    pub fn uint(value: i64) -> Self {
        Literal::Int {
            value,
            unsigned: true,
            radix: Radix::Decimal,
        }
    }

    pub fn float(value: f64) -> Self {
        Literal::Float {
            value,
            text: format!("{value:?}").into(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Float { value, .. } => Some(*value),
            Literal::Int { value, .. } => Some(*value as f64),
            _ => None,
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Literal::Int { value, .. } => *value < 0,
            Literal::Float { value, .. } => value.is_sign_negative() && *value != 0.0,
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns a copy holding `value`, keeping the signedness and radix.
    pub fn with_int(&self, value: i64) -> Option<Self> {
        match self {
            Literal::Int {
                unsigned, radix, ..
            } => Some(Literal::Int {
                value,
                unsigned: *unsigned,
                radix: *radix,
            }),
            _ => None,
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int {
                value,
                unsigned,
                radix,
            } => {
                let suffix = if *unsigned { "u" } else { "" };
                let sign = if *value < 0 { "-" } else { "" };
                let magnitude = value.unsigned_abs();
                match radix {
                    Radix::Decimal => write!(f, "{value}{suffix}"),
                    Radix::Octal if magnitude == 0 => write!(f, "0{suffix}"),
                    Radix::Octal => write!(f, "{sign}0{magnitude:o}{suffix}"),
                    Radix::Hex => write!(f, "{sign}0x{magnitude:x}{suffix}"),
                }
            }
            Literal::Float { text, .. } => write!(f, "{text}"),
            Literal::String(s) => write!(f, "\"{}\"", s.escape_default()),
        }
    }
}
