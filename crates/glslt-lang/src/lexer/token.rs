use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;
use strum::{EnumString, IntoStaticStr};

use crate::ast::kind::Directive;
use crate::literal::Literal;
use crate::range::Range;

/// Language versions the lexer can target. Keywords introduced after the
/// selected version are lexed as plain identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Version {
    GLSL110,
    GLSL120,
    GLSL130,
    GLSL140,
    GLSL150,
    GLSL330,
    GLSL400,
    GLSL410,
    GLSL420,
    GLSL430,
    GLSL440,
    GLSL450,
    #[default]
    GLSL460,
}

impl Version {
    pub const LATEST: Version = Version::GLSL460;

    pub fn number(self) -> u16 {
        match self {
            Version::GLSL110 => 110,
            Version::GLSL120 => 120,
            Version::GLSL130 => 130,
            Version::GLSL140 => 140,
            Version::GLSL150 => 150,
            Version::GLSL330 => 330,
            Version::GLSL400 => 400,
            Version::GLSL410 => 410,
            Version::GLSL420 => 420,
            Version::GLSL430 => 430,
            Version::GLSL440 => 440,
            Version::GLSL450 => 450,
            Version::GLSL460 => 460,
        }
    }

    pub fn from_number(number: u16) -> Option<Version> {
        match number {
            110 => Some(Version::GLSL110),
            120 => Some(Version::GLSL120),
            130 => Some(Version::GLSL130),
            140 => Some(Version::GLSL140),
            150 => Some(Version::GLSL150),
            330 => Some(Version::GLSL330),
            400 => Some(Version::GLSL400),
            410 => Some(Version::GLSL410),
            420 => Some(Version::GLSL420),
            430 => Some(Version::GLSL430),
            440 => Some(Version::GLSL440),
            450 => Some(Version::GLSL450),
            460 => Some(Version::GLSL460),
            _ => None,
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
pub enum Keyword {
    #[strum(serialize = "attribute")]
    Attribute,
    #[strum(serialize = "break")]
    Break,
    #[strum(serialize = "buffer")]
    Buffer,
    #[strum(serialize = "case")]
    Case,
    #[strum(serialize = "centroid")]
    Centroid,
    #[strum(serialize = "coherent")]
    Coherent,
    #[strum(serialize = "const")]
    Const,
    #[strum(serialize = "continue")]
    Continue,
    #[strum(serialize = "default")]
    Default,
    #[strum(serialize = "discard")]
    Discard,
    #[strum(serialize = "do")]
    Do,
    #[strum(serialize = "else")]
    Else,
    #[strum(serialize = "flat")]
    Flat,
    #[strum(serialize = "for")]
    For,
    #[strum(serialize = "highp")]
    Highp,
    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "inout")]
    Inout,
    #[strum(serialize = "invariant")]
    Invariant,
    #[strum(serialize = "layout")]
    Layout,
    #[strum(serialize = "lowp")]
    Lowp,
    #[strum(serialize = "mediump")]
    Mediump,
    #[strum(serialize = "noperspective")]
    Noperspective,
    #[strum(serialize = "out")]
    Out,
    #[strum(serialize = "patch")]
    Patch,
    #[strum(serialize = "precise")]
    Precise,
    #[strum(serialize = "precision")]
    Precision,
    #[strum(serialize = "readonly")]
    Readonly,
    #[strum(serialize = "restrict")]
    Restrict,
    #[strum(serialize = "return")]
    Return,
    #[strum(serialize = "sample")]
    Sample,
    #[strum(serialize = "shared")]
    Shared,
    #[strum(serialize = "smooth")]
    Smooth,
    #[strum(serialize = "struct")]
    Struct,
    #[strum(serialize = "subroutine")]
    Subroutine,
    #[strum(serialize = "switch")]
    Switch,
    #[strum(serialize = "uniform")]
    Uniform,
    #[strum(serialize = "varying")]
    Varying,
    #[strum(serialize = "volatile")]
    Volatile,
    #[strum(serialize = "while")]
    While,
    #[strum(serialize = "writeonly")]
    Writeonly,
    #[strum(serialize = "taskNV")]
    TaskNV,
    #[strum(serialize = "perprimitiveNV")]
    PerprimitiveNV,
    #[strum(serialize = "perviewNV")]
    PerviewNV,
    #[strum(serialize = "perprimitiveEXT")]
    PerprimitiveEXT,
    #[strum(serialize = "taskPayloadSharedEXT")]
    TaskPayloadSharedEXT,
}

impl Keyword {
    /// The first language version that reserves this word.
    pub fn min_version(self) -> Version {
        match self {
            Keyword::Centroid | Keyword::Invariant => Version::GLSL120,
            Keyword::Case
            | Keyword::Default
            | Keyword::Switch
            | Keyword::Flat
            | Keyword::Smooth
            | Keyword::Noperspective
            | Keyword::Highp
            | Keyword::Mediump
            | Keyword::Lowp
            | Keyword::Precision => Version::GLSL130,
            Keyword::Layout => Version::GLSL140,
            Keyword::Sample | Keyword::Patch | Keyword::Precise | Keyword::Subroutine => {
                Version::GLSL400
            }
            Keyword::Coherent
            | Keyword::Volatile
            | Keyword::Restrict
            | Keyword::Readonly
            | Keyword::Writeonly => Version::GLSL420,
            Keyword::Buffer | Keyword::Shared => Version::GLSL430,
            _ => Version::GLSL110,
        }
    }

    pub fn is_mesh_shader(self) -> bool {
        matches!(
            self,
            Keyword::TaskNV
                | Keyword::PerprimitiveNV
                | Keyword::PerviewNV
                | Keyword::PerprimitiveEXT
                | Keyword::TaskPayloadSharedEXT
        )
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Returns the version that introduced a builtin type name, or `None` if the
/// word is not a builtin type.
pub fn builtin_type_version(word: &str) -> Option<Version> {
    match word {
        "void" | "bool" | "int" | "float" | "vec2" | "vec3" | "vec4" | "bvec2" | "bvec3"
        | "bvec4" | "ivec2" | "ivec3" | "ivec4" | "mat2" | "mat3" | "mat4" | "sampler1D"
        | "sampler2D" | "sampler3D" | "samplerCube" | "sampler1DShadow" | "sampler2DShadow" => {
            Some(Version::GLSL110)
        }
        "mat2x2" | "mat2x3" | "mat2x4" | "mat3x2" | "mat3x3" | "mat3x4" | "mat4x2" | "mat4x3"
        | "mat4x4" => Some(Version::GLSL120),
        "uint" | "uvec2" | "uvec3" | "uvec4" | "samplerCubeShadow" | "sampler1DArray"
        | "sampler2DArray" | "sampler1DArrayShadow" | "sampler2DArrayShadow" | "isampler1D"
        | "isampler2D" | "isampler3D" | "isamplerCube" | "isampler1DArray"
        | "isampler2DArray" | "usampler1D" | "usampler2D" | "usampler3D" | "usamplerCube"
        | "usampler1DArray" | "usampler2DArray" => Some(Version::GLSL130),
        "sampler2DRect" | "sampler2DRectShadow" | "isampler2DRect" | "usampler2DRect"
        | "samplerBuffer" | "isamplerBuffer" | "usamplerBuffer" => Some(Version::GLSL140),
        "sampler2DMS" | "isampler2DMS" | "usampler2DMS" | "sampler2DMSArray"
        | "isampler2DMSArray" | "usampler2DMSArray" => Some(Version::GLSL150),
        "double" | "dvec2" | "dvec3" | "dvec4" | "dmat2" | "dmat3" | "dmat4" | "dmat2x2"
        | "dmat2x3" | "dmat2x4" | "dmat3x2" | "dmat3x3" | "dmat3x4" | "dmat4x2" | "dmat4x3"
        | "dmat4x4" | "samplerCubeArray" | "samplerCubeArrayShadow" | "isamplerCubeArray"
        | "usamplerCubeArray" => Some(Version::GLSL400),
        "atomic_uint" | "image1D" | "image2D" | "image3D" | "imageCube" | "image2DRect"
        | "image1DArray" | "image2DArray" | "imageBuffer" | "imageCubeArray" | "image2DMS"
        | "image2DMSArray" | "iimage1D" | "iimage2D" | "iimage3D" | "iimageCube"
        | "iimage2DArray" | "iimageBuffer" | "uimage1D" | "uimage2D" | "uimage3D"
        | "uimageCube" | "uimage2DArray" | "uimageBuffer" => Some(Version::GLSL420),
        _ => None,
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::Comment(_))
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum TokenKind {
    AddAssign,
    AndAnd,
    AndAssign,
    Ampersand,
    Assign,
    Bang,
    BuiltinType(SmolStr),
    Caret,
    Colon,
    Comma,
    Comment(String),
    Dec,
    Directive(Directive),
    DivAssign,
    Dot,
    Eof,
    EqEq,
    Gt,
    Gte,
    Identifier(SmolStr),
    Inc,
    Keyword(Keyword),
    LBrace,
    LBracket,
    LeftAssign,
    Literal(Literal),
    LParen,
    Lt,
    Lte,
    Minus,
    ModAssign,
    MulAssign,
    NeEq,
    OrAssign,
    OrOr,
    Percent,
    Pipe,
    Plus,
    Question,
    RBrace,
    RBracket,
    RightAssign,
    RParen,
    SemiColon,
    ShiftLeft,
    ShiftRight,
    Slash,
    Star,
    SubAssign,
    Tilde,
    XorAssign,
    XorXor,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            TokenKind::AddAssign => write!(f, "+="),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::AndAssign => write!(f, "&="),
            TokenKind::Ampersand => write!(f, "&"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::BuiltinType(name) => write!(f, "{name}"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Comment(comment) => write!(f, "{comment}"),
            TokenKind::Dec => write!(f, "--"),
            TokenKind::Directive(directive) => write!(f, "{directive}"),
            TokenKind::DivAssign => write!(f, "/="),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::Inc => write!(f, "++"),
            TokenKind::Keyword(keyword) => write!(f, "{}", keyword.as_str()),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::LeftAssign => write!(f, "<<="),
            TokenKind::Literal(literal) => write!(f, "{literal}"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::ModAssign => write!(f, "%="),
            TokenKind::MulAssign => write!(f, "*="),
            TokenKind::NeEq => write!(f, "!="),
            TokenKind::OrAssign => write!(f, "|="),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Question => write!(f, "?"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::RightAssign => write!(f, ">>="),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::SemiColon => write!(f, ";"),
            TokenKind::ShiftLeft => write!(f, "<<"),
            TokenKind::ShiftRight => write!(f, ">>"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::SubAssign => write!(f, "-="),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::XorAssign => write!(f, "^="),
            TokenKind::XorXor => write!(f, "^^"),
        }
    }
}
