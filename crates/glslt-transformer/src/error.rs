use glslt_lang::TreeError;
use miette::Diagnostic;

/// Failure of a transform call. There is no partial result: the pipeline
/// stops at the first error.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] glslt_lang::Error),

    #[error(transparent)]
    #[diagnostic(
        code(glslt::tree),
        help("Detach the node or clone it into the target root before reusing it.")
    )]
    Tree(#[from] TreeError),

    #[error("transformation failed: {message}")]
    #[diagnostic(code(glslt::transformation))]
    Transformation { message: String },
}

impl Error {
    pub fn transformation(message: impl Into<String>) -> Self {
        Error::Transformation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::Tree(TreeError::Deleted), "glslt::tree")]
    #[case(Error::transformation("no main"), "glslt::transformation")]
    fn test_diagnostic_code(#[case] error: Error, #[case] expected: &str) {
        assert_eq!(error.code().map(|code| code.to_string()), Some(expected.to_string()));
    }

    #[test]
    fn test_parse_error_is_transparent() {
        let error = Error::from(glslt_lang::parse("int a").unwrap_err());

        assert_eq!(
            error.code().map(|code| code.to_string()),
            Some("ParseError::UnexpectedEof".to_string())
        );
        assert!(error.source_code().is_some());
    }
}
