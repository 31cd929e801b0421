//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::config::Delimiters;
use crate::error::CompileError;
use crate::parser::ast::*;
use crate::parser::lexer::{self, Token};

/// Parse a template body into its elements
pub fn parse_template(
    source: &str,
    delimiters: &Delimiters,
) -> Result<Vec<Element>, Vec<CompileError>> {
    let len = source.len();

    let tokens = lexer::tokenize(source, delimiters).map_err(|e| vec![e])?;
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (tok, SimpleSpan::from(span)));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    template_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// One `.member` or `.(expr)` step after a primary expression
#[derive(Debug, Clone)]
enum Access {
    Member(Spanned<Identifier>),
    Indirect(Spanned<Expr>),
}

fn template_parser<'a, I>() -> impl Parser<'a, I, Vec<Element>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let mut body = Recursive::declare();
    // Expression without top-level commas: arguments, parenthesized
    // expressions and option values
    let mut expr = Recursive::declare();

    let identifier = select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

    let args = expr
        .clone()
        .separated_by(just(Token::Comma))
        .collect::<Vec<Spanned<Expr>>>()
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

    // {a, b | body} or {body}
    let subtemplate = identifier
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .then_ignore(just(Token::Pipe))
        .or_not()
        .then(body.clone())
        .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
        .map(|(params, body)| Subtemplate::Source {
            params: params.unwrap_or_default(),
            body,
        });

    let super_include = just(Token::Super)
        .ignore_then(just(Token::Dot))
        .ignore_then(identifier.clone())
        .then(args.clone());

    let named_include = identifier.clone().then(args.clone());

    let paren = expr
        .clone()
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

    // Template applied by `:` in maps and zips
    let template_ref = choice((
        super_include
            .clone()
            .map(|(name, args)| TemplateRef::Named {
                name,
                args,
                is_super: true,
            }),
        named_include
            .clone()
            .map(|(name, args)| TemplateRef::Named {
                name,
                args,
                is_super: false,
            }),
        paren
            .clone()
            .then(args.clone())
            .map(|(name, args)| TemplateRef::Indirect {
                name: Box::new(name),
                args,
            }),
        subtemplate.clone().map(TemplateRef::Anonymous),
    ))
    .map_with(|r, e| Spanned::new(r, span_range(&e.span())))
    .boxed();

    let list_literal = expr
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
        .map(Expr::List);

    // Built-in functions share the include syntax; they take exactly one argument
    let call_or_include = named_include.validate(|(name, mut args), e, emitter| {
        match Function::from_name(name.node.as_str()) {
            Some(function) => {
                if args.len() != 1 {
                    emitter.emit(Rich::custom(
                        e.span(),
                        format!(
                            "function {} expects 1 argument, got {}",
                            function.name(),
                            args.len()
                        ),
                    ));
                }
                let arg = if args.is_empty() {
                    Spanned::new(Expr::Str(String::new()), name.span.clone())
                } else {
                    args.swap_remove(0)
                };
                Expr::Call {
                    function,
                    arg: Box::new(arg),
                }
            }
            None => Expr::Include {
                name,
                args,
                is_super: false,
            },
        }
    });

    let primary = choice((
        select! {
            Token::Str(s) => Expr::Str(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
        },
        subtemplate.clone().map(Expr::Subtemplate),
        list_literal,
        super_include.map(|(name, args)| Expr::Include {
            name,
            args,
            is_super: true,
        }),
        call_or_include,
        // (expr)(args) includes the template named by expr; (expr) alone groups
        paren
            .clone()
            .then(args.clone().or_not())
            .map(|(inner, args)| match args {
                Some(args) => Expr::IndirectInclude {
                    name: Box::new(inner),
                    args,
                },
                None => inner.node,
            }),
        identifier.clone().map(|id| Expr::Attribute(id.node)),
    ))
    .map_with(|expr, e| Spanned::new(expr, span_range(&e.span())))
    .boxed();

    let access = just(Token::Dot).ignore_then(choice((
        identifier.clone().map(Access::Member),
        paren.clone().map(Access::Indirect),
    )));

    let member = primary
        .foldl(access.repeated(), |target, access| {
            let start = target.span.start;
            match access {
                Access::Member(member) => {
                    let end = member.span.end;
                    Spanned::new(
                        Expr::Property {
                            target: Box::new(target),
                            member,
                        },
                        start..end,
                    )
                }
                Access::Indirect(member) => {
                    let end = member.span.end;
                    Spanned::new(
                        Expr::IndirectProperty {
                            target: Box::new(target),
                            member: Box::new(member),
                        },
                        start..end,
                    )
                }
            }
        })
        .boxed();

    // a : t() : u()  (no alternation, so it can sit in argument lists)
    expr.define(
        member
            .clone()
            .then(
                just(Token::Colon)
                    .ignore_then(template_ref.clone())
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map_with(|(target, stages), e| {
                if stages.is_empty() {
                    target
                } else {
                    Spanned::new(
                        Expr::Map {
                            target: Box::new(target),
                            stages: stages.into_iter().map(|r| vec![r]).collect(),
                        },
                        span_range(&e.span()),
                    )
                }
            }),
    );

    // a, b, c : t()
    let zip = member
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(2)
        .collect::<Vec<_>>()
        .then_ignore(just(Token::Colon))
        .then(template_ref.clone())
        .map_with(|(lists, template), e| {
            Spanned::new(
                Expr::Zip {
                    lists,
                    template: Box::new(template),
                },
                span_range(&e.span()),
            )
        });

    // a : t1(), t2() : u()
    let mapped = member
        .clone()
        .then(
            just(Token::Colon)
                .ignore_then(
                    template_ref
                        .clone()
                        .separated_by(just(Token::Comma))
                        .at_least(1)
                        .collect::<Vec<_>>(),
                )
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map_with(|(target, stages), e| {
            if stages.is_empty() {
                target
            } else {
                Spanned::new(
                    Expr::Map {
                        target: Box::new(target),
                        stages,
                    },
                    span_range(&e.span()),
                )
            }
        });

    let top = choice((zip, mapped)).boxed();

    let condition = recursive(|condition| {
        let atom = choice((
            expr.clone(),
            condition
                .clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ));

        let unary = just(Token::Bang)
            .map_with(|_, e| span_range(&e.span()))
            .repeated()
            .foldr(atom, |bang, operand: Spanned<Expr>| {
                let span = bang.start..operand.span.end;
                Spanned::new(Expr::Not(Box::new(operand)), span)
            });

        let conjunction = unary.clone().foldl(
            just(Token::AndAnd).ignore_then(unary).repeated(),
            |lhs, rhs| {
                let span = lhs.span.start..rhs.span.end;
                Spanned::new(Expr::And(Box::new(lhs), Box::new(rhs)), span)
            },
        );

        conjunction.clone().foldl(
            just(Token::OrOr).ignore_then(conjunction).repeated(),
            |lhs, rhs| {
                let span = lhs.span.start..rhs.span.end;
                Spanned::new(Expr::Or(Box::new(lhs), Box::new(rhs)), span)
            },
        )
    });

    // ; separator=", ", null="n/a", anchor, wrap
    let option = identifier
        .clone()
        .then(just(Token::Equals).ignore_then(expr.clone()).or_not());

    let options = just(Token::Semi)
        .ignore_then(
            option
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .or_not()
        .validate(|opts, _e, emitter| {
            let mut options = Options::default();
            for (name, value) in opts.unwrap_or_default() {
                let span: SimpleSpan = name.span.clone().into();
                match (name.node.as_str(), value) {
                    ("separator", Some(v)) => options.separator = Some(v),
                    ("null", Some(v)) => options.null = Some(v),
                    ("wrap", _) => options.wrap = true,
                    ("anchor", _) => options.anchor = true,
                    ("separator", None) | ("null", None) => emitter.emit(Rich::custom(
                        span,
                        format!("option '{}' requires a value", name.node),
                    )),
                    (other, _) => {
                        emitter.emit(Rich::custom(span, format!("unknown option '{}'", other)))
                    }
                }
            }
            options
        });

    let island = just(Token::Open)
        .map_with(|_, e| span_range(&e.span()))
        .then(top)
        .then(options)
        .then_ignore(just(Token::Close))
        .map(|((open, expr), options)| Element::Island(Island { expr, options, open }));

    let cond_island = |keyword: Token| {
        just(Token::Open)
            .ignore_then(just(keyword))
            .ignore_then(
                condition
                    .clone()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .then_ignore(just(Token::Close))
    };

    let if_block = cond_island(Token::If)
        .then(body.clone())
        .then(
            cond_island(Token::ElseIf)
                .then(body.clone())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then(
            just(Token::Open)
                .ignore_then(just(Token::Else))
                .ignore_then(just(Token::Close))
                .ignore_then(body.clone())
                .or_not(),
        )
        .then_ignore(
            just(Token::Open)
                .then(just(Token::EndIf))
                .then(just(Token::Close)),
        )
        .map(|(((cond, then), elseifs), otherwise)| {
            let mut branches = vec![(cond, then)];
            branches.extend(elseifs);
            Element::If(IfBlock {
                branches,
                otherwise,
            })
        });

    let text = select! {
        Token::Text(s) => Element::Text(s),
    };

    body.define(
        choice((if_block, island, text))
            .repeated()
            .collect::<Vec<_>>()
            .boxed(),
    );

    body.then_ignore(end())
}
