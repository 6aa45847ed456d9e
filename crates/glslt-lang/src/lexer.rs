pub mod error;
pub mod token;

use std::str::FromStr;

use error::LexerError;
use nom::Parser;
use nom::bytes::complete::take_until;
use nom::character::complete::{
    alpha0, anychar, digit0, digit1, hex_digit1, line_ending, multispace0, not_line_ending,
    oct_digit1, one_of, space0,
};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{alpha1, alphanumeric1, char, none_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
};
use smol_str::SmolStr;
use token::{Keyword, Token, TokenKind, Version, builtin_type_version};

use crate::ast::kind::{Directive, DirectiveKind};
use crate::literal::{Literal, Radix};
use crate::range::{Position, Range, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, TokenKind> {
            value($kind, tag($tag)).parse(input)
        }
    };
}

/// Per-call lexical configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Options {
    pub version: Version,
    pub enable_custom_directive: bool,
    pub enable_include_directive: bool,
    pub enable_strings: bool,
    pub enable_mesh_shaders: bool,
}

pub struct Lexer {
    options: Options,
}

impl Lexer {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Tokenizes `input`, failing on the first unrecognized or disabled construct.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        let (tokens, errors) = self.scan(input, false);

        match errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(tokens),
        }
    }

    /// Tokenizes `input`, skipping over anything it cannot recognize.
    pub fn tokenize_with_recovery(&self, input: &str) -> (Vec<Token>, Vec<LexerError>) {
        self.scan(input, true)
    }

    fn scan(&self, input: &str, recover: bool) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut span = Span::new(input);

        loop {
            let rest = skip_whitespace(span);
            let start = Position::from(rest);

            if rest.fragment().is_empty() {
                tokens.push(Token {
                    range: Range::new(start, start),
                    kind: TokenKind::Eof,
                });
                break;
            }

            match token(rest) {
                Ok((next, kind)) => {
                    let token = Token {
                        range: Range::new(start, Position::from(next)),
                        kind: self.classify(kind),
                    };

                    match self.check_feature(token) {
                        Ok(token) => tokens.push(token),
                        Err(error) => {
                            errors.push(error);
                            if !recover {
                                break;
                            }
                        }
                    }
                    span = next;
                }
                Err(_) => {
                    errors.push(unexpected_input(rest, start));
                    if !recover {
                        break;
                    }
                    span = anychar::<Span, nom::error::Error<Span>>(rest)
                        .map(|(next, _)| next)
                        .unwrap_or(rest);
                }
            }
        }

        (tokens, errors)
    }

    fn classify(&self, kind: TokenKind) -> TokenKind {
        let word = match kind {
            TokenKind::Identifier(word) => word,
            other => return other,
        };

        if word == "true" {
            return TokenKind::Literal(Literal::Bool(true));
        } else if word == "false" {
            return TokenKind::Literal(Literal::Bool(false));
        }

        if let Ok(keyword) = Keyword::from_str(&word) {
            if self.is_reserved(keyword) {
                return TokenKind::Keyword(keyword);
            }
        }

        match builtin_type_version(&word) {
            Some(version) if version <= self.options.version => TokenKind::BuiltinType(word),
            _ => TokenKind::Identifier(word),
        }
    }

    fn is_reserved(&self, keyword: Keyword) -> bool {
        if keyword.is_mesh_shader() {
            self.options.enable_mesh_shaders
        } else {
            keyword.min_version() <= self.options.version
        }
    }

    fn check_feature(&self, token: Token) -> Result<Token, LexerError> {
        let feature = match &token.kind {
            TokenKind::Literal(Literal::String(_)) if !self.options.enable_strings => {
                Some("string literals")
            }
            TokenKind::Directive(Directive {
                kind: DirectiveKind::Include,
                ..
            }) if !self.options.enable_include_directive => Some("the include directive"),
            TokenKind::Directive(Directive {
                kind: DirectiveKind::Custom,
                ..
            }) if !self.options.enable_custom_directive => Some("the custom directive"),
            _ => None,
        };

        match feature {
            Some(feature) => Err(LexerError::FailedPredicate { token, feature }),
            None => Ok(token),
        }
    }
}

fn skip_whitespace(span: Span) -> Span {
    multispace0::<Span, nom::error::Error<Span>>(span)
        .map(|(rest, _)| rest)
        .unwrap_or(span)
}

fn unexpected_input(rest: Span, start: Position) -> LexerError {
    let fragment = rest.fragment();

    if fragment.starts_with("/*") {
        return LexerError::UnterminatedComment(Token {
            range: Range::new(start, start),
            kind: TokenKind::Comment(fragment.to_string()),
        });
    }

    let text = fragment.chars().next().map(String::from).unwrap_or_default();
    LexerError::NoViableAlternative(Token {
        range: Range::new(start, Position::new(start.line, start.column + 1)),
        kind: TokenKind::Identifier(text.into()),
    })
}

fn line_comment(input: Span) -> IResult<Span, TokenKind> {
    map(recognize(pair(tag("//"), not_line_ending)), |span: Span| {
        TokenKind::Comment(span.fragment().to_string())
    })
    .parse(input)
}

fn block_comment(input: Span) -> IResult<Span, TokenKind> {
    map(
        recognize((tag("/*"), take_until("*/"), tag("*/"))),
        |span: Span| TokenKind::Comment(span.fragment().to_string()),
    )
    .parse(input)
}

fn directive_body(input: Span) -> IResult<Span, String> {
    let mut body = String::new();
    let mut span = input;

    loop {
        let (rest, line) = not_line_ending(span)?;

        match line.fragment().strip_suffix('\\') {
            Some(continued) => {
                body.push_str(continued);
                match line_ending::<Span, nom::error::Error<Span>>(rest) {
                    Ok((next, _)) => span = next,
                    Err(_) => return Ok((rest, body)),
                }
            }
            None => {
                body.push_str(line.fragment());
                return Ok((rest, body));
            }
        }
    }
}

fn directive(input: Span) -> IResult<Span, TokenKind> {
    let (span, _) = char('#')(input)?;
    let (span, _) = space0(span)?;
    let (span, name) = alpha0(span)?;
    let (span, body) = directive_body(span)?;

    let kind = match *name.fragment() {
        "" => DirectiveKind::Empty,
        "version" => DirectiveKind::Version,
        "extension" => DirectiveKind::Extension,
        "pragma" => DirectiveKind::Pragma,
        "line" => DirectiveKind::Line,
        "include" => DirectiveKind::Include,
        "custom" => DirectiveKind::Custom,
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )));
        }
    };

    Ok((
        span,
        TokenKind::Directive(Directive {
            kind,
            content: SmolStr::new(body.trim()),
        }),
    ))
}

fn exponent(input: Span) -> IResult<Span, Span> {
    recognize((one_of("eE"), opt(one_of("+-")), digit1)).parse(input)
}

fn float_literal(input: Span) -> IResult<Span, TokenKind> {
    map_res(
        recognize(pair(
            alt((
                recognize((digit1, char('.'), digit0, opt(exponent))),
                recognize((char('.'), digit1, opt(exponent))),
                recognize(pair(digit1, exponent)),
            )),
            opt(alt((tag("lf"), tag("LF"), tag("f"), tag("F")))),
        )),
        |span: Span| {
            let text = *span.fragment();
            text.trim_end_matches(['f', 'F', 'l', 'L'])
                .parse::<f64>()
                .map(|value| {
                    TokenKind::Literal(Literal::Float {
                        value,
                        text: text.into(),
                    })
                })
        },
    )
    .parse(input)
}

fn int_literal(input: Span) -> IResult<Span, TokenKind> {
    let (span, (radix, digits)) = alt((
        map(
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |digits: Span| (Radix::Hex, digits),
        ),
        map(
            preceded(char('0'), oct_digit1),
            |digits: Span| (Radix::Octal, digits),
        ),
        map(digit1, |digits: Span| (Radix::Decimal, digits)),
    ))
    .parse(input)?;
    let (span, suffix) = opt(one_of("uU")).parse(span)?;

    let parsed = match radix {
        Radix::Hex => i64::from_str_radix(digits.fragment(), 16),
        Radix::Octal => i64::from_str_radix(digits.fragment(), 8),
        Radix::Decimal => digits.fragment().parse::<i64>(),
    };
    let value = parsed.map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;

    Ok((
        span,
        TokenKind::Literal(Literal::Int {
            value,
            unsigned: suffix.is_some(),
            radix,
        }),
    ))
}

fn string_literal(input: Span) -> IResult<Span, TokenKind> {
    map(
        delimited(
            char('"'),
            opt(escaped_transform(
                none_of("\"\\"),
                '\\',
                alt((
                    value('\\', char('\\')),
                    value('"', char('"')),
                    value('\n', char('n')),
                    value('\r', char('r')),
                    value('\t', char('t')),
                )),
            )),
            char('"'),
        ),
        |s: Option<String>| TokenKind::Literal(Literal::String(s.unwrap_or_default().into())),
    )
    .parse(input)
}

fn word(input: Span) -> IResult<Span, TokenKind> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |span: Span| TokenKind::Identifier(SmolStr::new(span.fragment())),
    )
    .parse(input)
}

define_token_parser!(left_assign, "<<=", TokenKind::LeftAssign);
define_token_parser!(right_assign, ">>=", TokenKind::RightAssign);
define_token_parser!(shift_left, "<<", TokenKind::ShiftLeft);
define_token_parser!(shift_right, ">>", TokenKind::ShiftRight);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(eq_eq, "==", TokenKind::EqEq);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(and_and, "&&", TokenKind::AndAnd);
define_token_parser!(or_or, "||", TokenKind::OrOr);
define_token_parser!(xor_xor, "^^", TokenKind::XorXor);
define_token_parser!(inc, "++", TokenKind::Inc);
define_token_parser!(dec, "--", TokenKind::Dec);
define_token_parser!(add_assign, "+=", TokenKind::AddAssign);
define_token_parser!(sub_assign, "-=", TokenKind::SubAssign);
define_token_parser!(mul_assign, "*=", TokenKind::MulAssign);
define_token_parser!(div_assign, "/=", TokenKind::DivAssign);
define_token_parser!(mod_assign, "%=", TokenKind::ModAssign);
define_token_parser!(and_assign, "&=", TokenKind::AndAssign);
define_token_parser!(or_assign, "|=", TokenKind::OrAssign);
define_token_parser!(xor_assign, "^=", TokenKind::XorAssign);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(star, "*", TokenKind::Star);
define_token_parser!(slash, "/", TokenKind::Slash);
define_token_parser!(percent, "%", TokenKind::Percent);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(assign, "=", TokenKind::Assign);
define_token_parser!(bang, "!", TokenKind::Bang);
define_token_parser!(tilde, "~", TokenKind::Tilde);
define_token_parser!(ampersand, "&", TokenKind::Ampersand);
define_token_parser!(pipe, "|", TokenKind::Pipe);
define_token_parser!(caret, "^", TokenKind::Caret);
define_token_parser!(question, "?", TokenKind::Question);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(l_brace, "{", TokenKind::LBrace);
define_token_parser!(r_brace, "}", TokenKind::RBrace);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(semi_colon, ";", TokenKind::SemiColon);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(dot, ".", TokenKind::Dot);

fn shift_and_compare(input: Span) -> IResult<Span, TokenKind> {
    alt((
        left_assign,
        right_assign,
        shift_left,
        shift_right,
        lte,
        gte,
        eq_eq,
        ne_eq,
        and_and,
        or_or,
        xor_xor,
    ))
    .parse(input)
}

fn compound_assignments(input: Span) -> IResult<Span, TokenKind> {
    alt((
        inc, dec, add_assign, sub_assign, mul_assign, div_assign, mod_assign, and_assign,
        or_assign, xor_assign,
    ))
    .parse(input)
}

fn operators(input: Span) -> IResult<Span, TokenKind> {
    alt((
        plus, minus, star, slash, percent, lt, gt, assign, bang, tilde, ampersand, pipe, caret,
        question,
    ))
    .parse(input)
}

fn punctuations(input: Span) -> IResult<Span, TokenKind> {
    alt((
        l_paren, r_paren, l_bracket, r_bracket, l_brace, r_brace, comma, semi_colon, colon, dot,
    ))
    .parse(input)
}

fn token(input: Span) -> IResult<Span, TokenKind> {
    alt((
        line_comment,
        block_comment,
        directive,
        float_literal,
        int_literal,
        string_literal,
        word,
        shift_and_compare,
        compound_assignments,
        operators,
        punctuations,
    ))
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(input: &str, options: Options) -> Result<Vec<TokenKind>, LexerError> {
        Lexer::new(options)
            .tokenize(input)
            .map(|tokens| tokens.into_iter().map(|t| t.kind).collect())
    }

    #[test]
    fn test_token_ranges() {
        let tokens = Lexer::new(Options::default()).tokenize("int a;\n  a").unwrap();

        assert_eq!(
            tokens,
            vec![
                Token {
                    range: Range::new(Position::new(1, 1), Position::new(1, 4)),
                    kind: TokenKind::BuiltinType("int".into()),
                },
                Token {
                    range: Range::new(Position::new(1, 5), Position::new(1, 6)),
                    kind: TokenKind::Identifier("a".into()),
                },
                Token {
                    range: Range::new(Position::new(1, 6), Position::new(1, 7)),
                    kind: TokenKind::SemiColon,
                },
                Token {
                    range: Range::new(Position::new(2, 3), Position::new(2, 4)),
                    kind: TokenKind::Identifier("a".into()),
                },
                Token {
                    range: Range::new(Position::new(2, 4), Position::new(2, 4)),
                    kind: TokenKind::Eof,
                },
            ]
        );
    }

    #[rstest]
    #[case("a+=b", vec![TokenKind::Identifier("a".into()), TokenKind::AddAssign, TokenKind::Identifier("b".into()), TokenKind::Eof])]
    #[case("x<<=2u", vec![
        TokenKind::Identifier("x".into()),
        TokenKind::LeftAssign,
        TokenKind::Literal(Literal::Int { value: 2, unsigned: true, radix: Radix::Decimal }),
        TokenKind::Eof,
    ])]
    #[case("0x1F 017 0", vec![
        TokenKind::Literal(Literal::Int { value: 31, unsigned: false, radix: Radix::Hex }),
        TokenKind::Literal(Literal::Int { value: 15, unsigned: false, radix: Radix::Octal }),
        TokenKind::Literal(Literal::int(0)),
        TokenKind::Eof,
    ])]
    #[case("1.5f .5 2e3", vec![
        TokenKind::Literal(Literal::Float { value: 1.5, text: "1.5f".into() }),
        TokenKind::Literal(Literal::Float { value: 0.5, text: ".5".into() }),
        TokenKind::Literal(Literal::Float { value: 2000.0, text: "2e3".into() }),
        TokenKind::Eof,
    ])]
    #[case("a.xyz++", vec![
        TokenKind::Identifier("a".into()),
        TokenKind::Dot,
        TokenKind::Identifier("xyz".into()),
        TokenKind::Inc,
        TokenKind::Eof,
    ])]
    #[case("true && !false", vec![
        TokenKind::Literal(Literal::Bool(true)),
        TokenKind::AndAnd,
        TokenKind::Bang,
        TokenKind::Literal(Literal::Bool(false)),
        TokenKind::Eof,
    ])]
    #[case("a; // note\nb; /* block\n */ c;", vec![
        TokenKind::Identifier("a".into()),
        TokenKind::SemiColon,
        TokenKind::Comment("// note".into()),
        TokenKind::Identifier("b".into()),
        TokenKind::SemiColon,
        TokenKind::Comment("/* block\n */".into()),
        TokenKind::Identifier("c".into()),
        TokenKind::SemiColon,
        TokenKind::Eof,
    ])]
    #[case("#version 330 core\nint", vec![
        TokenKind::Directive(Directive { kind: DirectiveKind::Version, content: "330 core".into() }),
        TokenKind::BuiltinType("int".into()),
        TokenKind::Eof,
    ])]
    #[case("#pragma debug(on) \\\n more\n", vec![
        TokenKind::Directive(Directive { kind: DirectiveKind::Pragma, content: "debug(on)  more".into() }),
        TokenKind::Eof,
    ])]
    fn test_tokenize(#[case] input: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(input, Options::default()), Ok(expected));
    }

    #[rstest]
    #[case(Version::GLSL330, TokenKind::Identifier("sample".into()))]
    #[case(Version::GLSL400, TokenKind::Keyword(Keyword::Sample))]
    #[case(Version::GLSL460, TokenKind::Keyword(Keyword::Sample))]
    fn test_version_gated_keyword(#[case] version: Version, #[case] expected: TokenKind) {
        let options = Options {
            version,
            ..Options::default()
        };
        assert_eq!(kinds("sample", options), Ok(vec![expected, TokenKind::Eof]));
    }

    #[rstest]
    #[case(false, TokenKind::Identifier("taskNV".into()))]
    #[case(true, TokenKind::Keyword(Keyword::TaskNV))]
    fn test_mesh_shader_keywords(#[case] enabled: bool, #[case] expected: TokenKind) {
        let options = Options {
            enable_mesh_shaders: enabled,
            ..Options::default()
        };
        assert_eq!(kinds("taskNV", options), Ok(vec![expected, TokenKind::Eof]));
    }

    #[rstest]
    #[case("\"bar\"", Options { enable_strings: true, ..Options::default() }, true)]
    #[case("\"bar\"", Options::default(), false)]
    #[case("#include <file>\n", Options { enable_include_directive: true, ..Options::default() }, true)]
    #[case("#include <file>\n", Options::default(), false)]
    #[case("#custom directive\n", Options { enable_custom_directive: true, ..Options::default() }, true)]
    #[case("#custom directive\n", Options::default(), false)]
    fn test_feature_flags(#[case] input: &str, #[case] options: Options, #[case] accepted: bool) {
        let result = kinds(input, options);
        if accepted {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(LexerError::FailedPredicate { .. })));
        }
    }

    #[rstest]
    #[case("§")]
    #[case("int a = 1 @ 2;")]
    #[case("#define FOO 1\n")]
    fn test_no_viable_alternative(#[case] input: &str) {
        assert!(matches!(
            kinds(input, Options::default()),
            Err(LexerError::NoViableAlternative(_))
        ));
    }

    #[test]
    fn test_unterminated_comment() {
        assert!(matches!(
            kinds("a /* b", Options::default()),
            Err(LexerError::UnterminatedComment(_))
        ));
    }

    #[test]
    fn test_tokenize_with_recovery() {
        let (tokens, errors) = Lexer::new(Options::default()).tokenize_with_recovery("a @ b");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            tokens.into_iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
    }
}
