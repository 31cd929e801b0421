//! Lexer for template bodies
//!
//! Template text alternates between literal text and expression islands
//! (`<name.prop>`). Inside an island the tokens come from a logos lexer;
//! a `{` inside an island opens a subtemplate whose body is text again, so
//! the scanner keeps a small mode stack and drives logos one token at a time.

use logos::Logos;

use crate::config::Delimiters;
use crate::error::CompileError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Tokens recognized inside an expression island
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum ExprToken {
    // Keywords
    #[token("super")]
    Super,
    #[token("if")]
    If,
    #[token("elseif")]
    ElseIf,
    #[token("else")]
    Else,
    #[token("endif")]
    EndIf,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Operators (longer first)
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("|")]
    Pipe,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("=")]
    Equals,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape_string(lex.slice()))]
    Str(String),
}

/// Token stream consumed by the grammar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Literal template text between islands
    Text(String),
    /// Start delimiter of an island
    Open,
    /// Stop delimiter of an island
    Close,

    Ident(String),
    Str(String),

    Super,
    If,
    ElseIf,
    Else,
    EndIf,
    True,
    False,

    AndAnd,
    OrOr,
    Bang,
    Pipe,

    BraceOpen,
    BraceClose,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    Comma,
    Colon,
    Semi,
    Dot,
    Equals,
}

impl From<ExprToken> for Token {
    fn from(tok: ExprToken) -> Self {
        match tok {
            ExprToken::Super => Token::Super,
            ExprToken::If => Token::If,
            ExprToken::ElseIf => Token::ElseIf,
            ExprToken::Else => Token::Else,
            ExprToken::EndIf => Token::EndIf,
            ExprToken::True => Token::True,
            ExprToken::False => Token::False,
            ExprToken::AndAnd => Token::AndAnd,
            ExprToken::OrOr => Token::OrOr,
            ExprToken::Bang => Token::Bang,
            ExprToken::Pipe => Token::Pipe,
            ExprToken::BraceOpen => Token::BraceOpen,
            ExprToken::ParenOpen => Token::ParenOpen,
            ExprToken::ParenClose => Token::ParenClose,
            ExprToken::BracketOpen => Token::BracketOpen,
            ExprToken::BracketClose => Token::BracketClose,
            ExprToken::Comma => Token::Comma,
            ExprToken::Colon => Token::Colon,
            ExprToken::Semi => Token::Semi,
            ExprToken::Dot => Token::Dot,
            ExprToken::Equals => Token::Equals,
            ExprToken::Ident(s) => Token::Ident(s),
            ExprToken::Str(s) => Token::Str(s),
        }
    }
}

/// Strip the quotes of a string literal and resolve its escapes
fn unescape_string(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Split a template body into text, island and subtemplate tokens
pub fn tokenize(source: &str, delimiters: &Delimiters) -> Result<Vec<(Token, Span)>, CompileError> {
    let mut scanner = Scanner {
        src: source,
        pos: 0,
        delimiters: *delimiters,
        tokens: Vec::new(),
    };
    scanner.scan_text(None)?;
    Ok(scanner.tokens)
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    delimiters: Delimiters,
    tokens: Vec<(Token, Span)>,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn push(&mut self, token: Token, span: Span) {
        self.tokens.push((token, span));
    }

    /// Scan literal text until end of input, or until the `}` closing the
    /// subtemplate that started at `subtemplate` (its `{` span)
    fn scan_text(&mut self, subtemplate: Option<Span>) -> Result<(), CompileError> {
        let mut buf = String::new();
        let mut buf_start = self.pos;

        while let Some(c) = self.peek() {
            if c == '\\' {
                match self.peek_second() {
                    Some(next)
                        if next == self.delimiters.start
                            || next == self.delimiters.stop
                            || next == '{'
                            || next == '}'
                            || next == '\\' =>
                    {
                        self.bump();
                        self.bump();
                        buf.push(next);
                    }
                    _ => {
                        self.bump();
                        buf.push('\\');
                    }
                }
                continue;
            }

            if c == self.delimiters.start {
                self.flush_text(&mut buf, buf_start);
                self.scan_island()?;
                buf_start = self.pos;
                continue;
            }

            if c == '}' && subtemplate.is_some() {
                self.flush_text(&mut buf, buf_start);
                let start = self.pos;
                self.bump();
                self.push(Token::BraceClose, start..self.pos);
                return Ok(());
            }

            self.bump();
            buf.push(c);
        }

        self.flush_text(&mut buf, buf_start);
        match subtemplate {
            Some(span) => Err(CompileError::Unterminated {
                span,
                construct: "subtemplate",
            }),
            None => Ok(()),
        }
    }

    fn flush_text(&mut self, buf: &mut String, start: usize) {
        if !buf.is_empty() {
            let text = std::mem::take(buf);
            self.push(Token::Text(text), start..self.pos);
        }
    }

    /// Scan one island starting at the start delimiter
    fn scan_island(&mut self) -> Result<(), CompileError> {
        let open = self.pos;
        self.bump();

        // <! comment !>
        if self.peek() == Some('!') {
            let terminator = format!("!{}", self.delimiters.stop);
            return match self.src[self.pos + 1..].find(&terminator) {
                Some(offset) => {
                    self.pos = self.pos + 1 + offset + terminator.len();
                    Ok(())
                }
                None => Err(CompileError::Unterminated {
                    span: open..self.src.len(),
                    construct: "comment",
                }),
            };
        }

        self.push(Token::Open, open..self.pos);

        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                return Err(CompileError::Unterminated {
                    span: open..self.src.len(),
                    construct: "expression",
                });
            };

            if c == self.delimiters.stop {
                let start = self.pos;
                self.bump();
                self.push(Token::Close, start..self.pos);
                return Ok(());
            }

            let (token, span) = self.lex_one()?;
            if token == ExprToken::BraceOpen {
                self.push(Token::BraceOpen, span.clone());
                self.scan_subtemplate_header();
                self.scan_text(Some(span))?;
            } else {
                self.push(token.into(), span);
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    /// Lex a single expression token at the current position
    fn lex_one(&mut self) -> Result<(ExprToken, Span), CompileError> {
        let base = self.pos;
        let mut lexer = ExprToken::lexer(&self.src[base..]);
        match lexer.next() {
            Some(Ok(token)) => {
                let span = lexer.span();
                self.pos = base + span.end;
                Ok((token, base + span.start..base + span.end))
            }
            _ => {
                let found = self.peek().unwrap_or('\0');
                Err(CompileError::InvalidCharacter {
                    span: base..base + found.len_utf8(),
                    found,
                })
            }
        }
    }

    /// Consume `a, b |` after a `{` if present; otherwise leave the body alone
    fn scan_subtemplate_header(&mut self) {
        let base = self.pos;
        let mut header = Vec::new();
        let mut expect_ident = true;

        for (token, span) in ExprToken::lexer(&self.src[base..]).spanned() {
            let span = base + span.start..base + span.end;
            match (token, expect_ident) {
                (Ok(ExprToken::Ident(name)), true) => {
                    header.push((Token::Ident(name), span));
                    expect_ident = false;
                }
                (Ok(ExprToken::Comma), false) => {
                    header.push((Token::Comma, span));
                    expect_ident = true;
                }
                (Ok(ExprToken::Pipe), false) => {
                    header.push((Token::Pipe, span.clone()));
                    self.tokens.extend(header);
                    self.pos = span.end;
                    // whitespace right after the `|` belongs to the header
                    self.skip_whitespace();
                    return;
                }
                _ => return,
            }
        }
    }
}

/// Lex input string into tokens with spans, using the default delimiters
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, CompileError> {
    tokenize(input, &Delimiters::default())
}
