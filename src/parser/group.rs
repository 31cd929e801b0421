//! Reader for group sources
//!
//! A group source is a list of template definitions:
//!
//! ```text
//! // line comment
//! t(x, y) ::= "<x> and <y>"
//! page(title) ::= <<
//! <h1><title></h1>
//! >>
//! ```
//!
//! Quoted bodies resolve only `\"`; every other escape is left for the
//! template lexer. Block bodies lose one leading and one trailing newline.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use logos::{FilterResult, Logos};

use crate::error::CompileError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum GroupToken {
    /// `/* ... */`; never produced, the callback skips it
    #[token("/*", skip_block_comment)]
    BlockComment,

    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token("::=")]
    Define,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote_template(lex.slice()))]
    Str(String),

    #[token("<<", lex_block)]
    BigString(String),
}

fn unquote_template(slice: &str) -> String {
    slice[1..slice.len() - 1].replace("\\\"", "\"")
}

/// Consume a `<< ... >>` block; the body ends at the last `>` of the first
/// `>>` run, so `<<<x>>>` holds `<x>`
fn lex_block(lex: &mut logos::Lexer<GroupToken>) -> Option<String> {
    let rest = lex.remainder();
    let mut end = rest.find(">>")?;
    while rest[end + 2..].starts_with('>') {
        end += 1;
    }

    let raw = &rest[..end];
    let raw = raw
        .strip_prefix("\r\n")
        .or_else(|| raw.strip_prefix('\n'))
        .unwrap_or(raw);
    let raw = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(raw);
    let body = raw.to_string();

    lex.bump(end + 2);
    Some(body)
}

/// Skip to the end of a `/* ... */` comment; an unclosed comment is an error
fn skip_block_comment(lex: &mut logos::Lexer<GroupToken>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => FilterResult::Error(()),
    }
}

/// One `name(params) ::= body` definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: String,
    /// Span of the whole definition in the group source
    pub span: Span,
}

/// Lex a group source
pub fn lex_group(source: &str) -> Result<Vec<(GroupToken, Span)>, CompileError> {
    let mut tokens = Vec::new();
    let mut lexer = GroupToken::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let found = source[span.start..].chars().next().unwrap_or('\0');
                if source[span.start..].starts_with("<<") {
                    return Err(CompileError::Unterminated {
                        span: span.start..source.len(),
                        construct: "template block",
                    });
                }
                if source[span.start..].starts_with("/*") {
                    return Err(CompileError::Unterminated {
                        span: span.start..source.len(),
                        construct: "comment",
                    });
                }
                return Err(CompileError::InvalidCharacter { span, found });
            }
        }
    }
    Ok(tokens)
}

/// Read the template definitions of a group source
pub fn parse_group(source: &str) -> Result<Vec<TemplateDecl>, Vec<CompileError>> {
    let len = source.len();

    let tokens = lex_group(source).map_err(|e| vec![e])?;
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (tok, SimpleSpan::from(span)));

    let token_stream =
        Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    group_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn group_parser<'a, I>(
) -> impl Parser<'a, I, Vec<TemplateDecl>, extra::Err<Rich<'a, GroupToken>>> + Clone
where
    I: ValueInput<'a, Token = GroupToken, Span = SimpleSpan>,
{
    let identifier = select! {
        GroupToken::Ident(s) => s,
    };

    let params = identifier
        .separated_by(just(GroupToken::Comma))
        .collect::<Vec<_>>()
        .delimited_by(just(GroupToken::ParenOpen), just(GroupToken::ParenClose));

    let body = select! {
        GroupToken::Str(s) => s,
        GroupToken::BigString(s) => s,
    }
    .labelled("template body");

    let definition = identifier
        .then(params)
        .then_ignore(just(GroupToken::Define))
        .then(body)
        .map_with(|((name, params), body), e| {
            let span: SimpleSpan = e.span();
            TemplateDecl {
                name,
                params,
                body,
                span: span.start..span.end,
            }
        });

    definition.repeated().collect::<Vec<_>>().then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_definitions() {
        let decls = parse_group(
            r#"
            t() ::= "<u()>"
            u(x, y) ::= "<x>"
            "#,
        )
        .expect("Should parse");

        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "t");
        assert!(decls[0].params.is_empty());
        assert_eq!(decls[0].body, "<u()>");
        assert_eq!(decls[1].params, vec!["x", "y"]);
    }

    #[test]
    fn test_block_body_strips_one_newline() {
        let decls = parse_group("page(title) ::= <<\n<h1><title></h1>\n>>\n").expect("Should parse");
        assert_eq!(decls[0].body, "<h1><title></h1>");
    }

    #[test]
    fn test_block_body_ends_at_last_angle_of_run() {
        let decls = parse_group("t(x) ::= <<<x>>>").expect("Should parse");
        assert_eq!(decls[0].body, "<x>");
    }

    #[test]
    fn test_quoted_body_keeps_template_escapes() {
        let decls = parse_group(r#"t() ::= "say \"hi\" \<x\>""#).expect("Should parse");
        assert_eq!(decls[0].body, r#"say "hi" \<x\>"#);
    }

    #[test]
    fn test_comments_are_skipped() {
        let decls = parse_group(
            "// first\n/* block\n comment */\nt() ::= \"a\"\n",
        )
        .expect("Should parse");
        assert_eq!(decls.len(), 1);
    }

    #[test]
    fn test_block_comment_between_definitions() {
        let decls = parse_group(
            "t() ::= \"a\" /* one ** two */ u(x) ::= \"b\"\n/**/\n",
        )
        .expect("Should parse");
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["t", "u"]);
        assert_eq!(decls[1].params, vec!["x"]);
    }

    #[test]
    fn test_block_comment_keeps_template_text() {
        let decls = parse_group("t() ::= \"/* not a comment */\"").expect("Should parse");
        assert_eq!(decls[0].body, "/* not a comment */");
    }

    #[test]
    fn test_unterminated_block_comment() {
        let errors = parse_group("/* never closed\nt() ::= \"a\"").unwrap_err();
        assert!(matches!(
            errors[0],
            CompileError::Unterminated {
                construct: "comment",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_body_is_error() {
        let errors = parse_group("t() ::= ").unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_unterminated_block() {
        let errors = parse_group("t() ::= << abc").unwrap_err();
        assert!(matches!(
            errors[0],
            CompileError::Unterminated {
                construct: "template block",
                ..
            }
        ));
    }
}
