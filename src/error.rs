//! Error types for compiling template and group sources

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("syntax error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    /// The scanner hit the end of input inside an expression or subtemplate
    #[error("unterminated {construct} starting at {span:?}")]
    Unterminated { span: Span, construct: &'static str },

    /// A character that cannot start any expression token
    #[error("invalid character {found:?} at {span:?}")]
    InvalidCharacter { span: Span, found: char },
}

impl CompileError {
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self::Syntax {
            span,
            message: message.into(),
            expected: Vec::new(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Self::Syntax { span, .. }
            | Self::Unterminated { span, .. }
            | Self::InvalidCharacter { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let (message, detail) = match self {
            CompileError::Syntax {
                message, expected, ..
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };
                (message.clone(), format!("{}{}", message, expected_str))
            }
            other => (other.to_string(), other.to_string()),
        };

        let span = self.span().clone();
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(detail)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => format!("{}: {}", filename, message),
        }
    }
}

/// Convert chumsky's rich errors over a token type into [`CompileError`]
macro_rules! impl_from_rich {
    ($token:ty, $describe:path) => {
        impl<'a> From<chumsky::error::Rich<'a, $token>> for CompileError {
            fn from(err: chumsky::error::Rich<'a, $token>) -> Self {
                use chumsky::error::RichReason;

                let message = match err.reason() {
                    RichReason::ExpectedFound { found, .. } => {
                        let found_str = match found {
                            Some(tok) => $describe(tok),
                            None => "end of input".to_string(),
                        };
                        format!("unexpected {}", found_str)
                    }
                    RichReason::Custom(msg) => msg.to_string(),
                };

                let expected: Vec<String> = err
                    .expected()
                    .filter_map(|e| match e {
                        chumsky::error::RichPattern::Token(tok) => Some($describe(tok)),
                        chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                        chumsky::error::RichPattern::EndOfInput => {
                            Some("end of input".to_string())
                        }
                        chumsky::error::RichPattern::Identifier(s) => {
                            Some(format!("identifier '{}'", s))
                        }
                        chumsky::error::RichPattern::Any => Some("any token".to_string()),
                        chumsky::error::RichPattern::SomethingElse => None,
                    })
                    .collect();

                CompileError::Syntax {
                    span: err.span().into_range(),
                    message,
                    expected,
                }
            }
        }
    };
}

impl_from_rich!(crate::parser::lexer::Token, format_token);
impl_from_rich!(crate::parser::group::GroupToken, format_group_token);

/// Format a token for human-readable error messages
pub(crate) fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Text(s) => format!("text {:?}", s),
        Token::Open => "expression start".to_string(),
        Token::Close => "expression end".to_string(),
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::Pipe => "'|'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Semi => "';'".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::Bang => "'!'".to_string(),
        Token::AndAnd => "'&&'".to_string(),
        Token::OrOr => "'||'".to_string(),
        Token::Super => "keyword 'super'".to_string(),
        Token::If => "keyword 'if'".to_string(),
        Token::ElseIf => "keyword 'elseif'".to_string(),
        Token::Else => "keyword 'else'".to_string(),
        Token::EndIf => "keyword 'endif'".to_string(),
        Token::True => "keyword 'true'".to_string(),
        Token::False => "keyword 'false'".to_string(),
    }
}

/// Format a group-file token for human-readable error messages
pub(crate) fn format_group_token(tok: &crate::parser::group::GroupToken) -> String {
    use crate::parser::group::GroupToken;
    match tok {
        GroupToken::Ident(s) => format!("identifier '{}'", s),
        GroupToken::Str(_) => "template string".to_string(),
        GroupToken::BigString(_) => "template block".to_string(),
        GroupToken::ParenOpen => "'('".to_string(),
        GroupToken::ParenClose => "')'".to_string(),
        GroupToken::Comma => "','".to_string(),
        GroupToken::Define => "'::='".to_string(),
        GroupToken::BlockComment => "comment".to_string(),
    }
}
