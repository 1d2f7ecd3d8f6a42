//! Parser for the configuration language, written with `chumsky` over the
//! tokens produced by [`crate::lexer`].
//!
//! The grammar never gives up on the first error. Every construct has a
//! fallback branch that reports a custom error and resynchronises at its
//! own boundary (end of line for body items, the matching closing
//! delimiter for collections), so one malformed item produces exactly one
//! diagnostic. A collection that runs into the end of input, or into a
//! closer that belongs to an enclosing construct, is reported as unclosed
//! at its opening delimiter and leaves that closer for its owner.

use chumsky::error::RichReason;
use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::ast::{
    Attribute, Block, Body, ExprKind, Expression, Label, ObjectItem, ObjectKey, Structure,
    Traversal, TraversalStep,
};
use crate::diagnostic::{Diagnostic, DiagnosticCategory, Diagnostics};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::pos::{LineIndex, SourceRange};
use crate::wrap::WRAPPER_ATTRIBUTE;

type Extra<'a> = extra::Err<Rich<'a, TokenKind, SimpleSpan>>;

const INVALID_EXPRESSION: &str = "Invalid expression";
const EXTRA_CHARACTERS: &str = "Extra characters after expression";
const UNEXPECTED_CLOSING_BRACE: &str = "Unexpected closing brace";
const DEFINITION_REQUIRED: &str = "Argument or block definition required";
const INVALID_DEFINITION: &str = "Invalid argument or block definition";
const MISSING_NEWLINE: &str = "Missing newline after argument";
const INVALID_BLOCK: &str = "Invalid block definition";
const UNCLOSED_BLOCK: &str = "Unclosed configuration block";
const INVALID_ATTRIBUTE_NAME: &str = "Invalid attribute name";
const MISSING_INDEX_BRACKET: &str = "Missing close bracket on index";
const MISSING_ARGUMENT_SEPARATOR: &str = "Missing argument separator";
const UNCLOSED_CALL: &str = "Unterminated function call";
const MISSING_ITEM_SEPARATOR: &str = "Missing item separator";
const UNCLOSED_TUPLE: &str = "Unclosed tuple constructor";
const UNCLOSED_OBJECT: &str = "Unclosed object constructor";
const MISSING_KEY_VALUE_SEPARATOR: &str = "Missing key/value separator";
const MISSING_ATTRIBUTE_SEPARATOR: &str = "Missing attribute separator";
const INVALID_OBJECT_KEY: &str = "Invalid object key";
const UNBALANCED_PARENTHESES: &str = "Unbalanced parentheses";

const OPENERS: [TokenKind; 3] = [TokenKind::OBrace, TokenKind::OBrack, TokenKind::OParen];
const CLOSERS: [TokenKind; 3] = [TokenKind::CBrace, TokenKind::CBrack, TokenKind::CParen];
const DELIMITERS: [TokenKind; 6] = [
    TokenKind::OBrace,
    TokenKind::OBrack,
    TokenKind::OParen,
    TokenKind::CBrace,
    TokenKind::CBrack,
    TokenKind::CParen,
];

fn detail(summary: &str, found: &str) -> String {
    let text = match summary {
        INVALID_EXPRESSION => {
            return format!("Expected the start of an expression, but found {found}.");
        }
        EXTRA_CHARACTERS => {
            "An expression was successfully parsed, but extra characters were found after it."
        }
        UNEXPECTED_CLOSING_BRACE => "There is no matching opening brace for this closing brace.",
        DEFINITION_REQUIRED => "An argument or block definition is required here.",
        INVALID_DEFINITION => {
            "An equals sign (\"=\") must follow an argument name, or a block label or opening brace must follow a block type."
        }
        MISSING_NEWLINE => "An argument definition must end with a newline.",
        INVALID_BLOCK => {
            "Either a quoted string block label or an opening brace (\"{\") is expected here."
        }
        UNCLOSED_BLOCK => "There is no closing brace for this block before the end of the file.",
        INVALID_ATTRIBUTE_NAME => "An attribute name is required after a dot.",
        MISSING_INDEX_BRACKET => "The index operator must end with a closing bracket (\"]\").",
        MISSING_ARGUMENT_SEPARATOR => {
            "A comma is required to separate each function argument from the next."
        }
        UNCLOSED_CALL => "There is no closing parenthesis for this function call.",
        MISSING_ITEM_SEPARATOR => "Expected a comma to mark the beginning of the next item.",
        UNCLOSED_TUPLE => "There is no closing bracket for this tuple.",
        UNCLOSED_OBJECT => "There is no closing brace for this object.",
        MISSING_KEY_VALUE_SEPARATOR => {
            "Expected an equals sign (\"=\") to mark the beginning of the attribute value."
        }
        MISSING_ATTRIBUTE_SEPARATOR => {
            "Expected a newline or comma to mark the beginning of the next attribute."
        }
        INVALID_OBJECT_KEY => {
            "Expected an attribute name, a quoted string, or a parenthesized expression."
        }
        UNBALANCED_PARENTHESES => "Expected a closing parenthesis to terminate the expression.",
        _ => return format!("Unexpected {found}."),
    };
    text.to_string()
}

/// Shared state for one parse: the token list and how to turn spans into
/// [`SourceRange`]s.
struct Ctx<'a> {
    filename: &'a str,
    lines: LineIndex<'a>,
    tokens: &'a [Token],
    len: usize,
    /// Offsets at or past this point describe themselves as end of file.
    eof: usize,
    /// The final closing brace of a wrapped container ends the input.
    container: bool,
}

impl<'a> Ctx<'a> {
    fn new(src: &'a str, filename: &'a str, tokens: &'a [Token], container: bool) -> Self {
        let eof = if container {
            container_eof(tokens, src.len())
        } else {
            src.len()
        };
        Self {
            filename,
            lines: LineIndex::new(src),
            tokens,
            len: src.len(),
            eof,
            container,
        }
    }

    fn eoi(&self) -> SimpleSpan {
        SimpleSpan::from(self.len..self.len)
    }

    fn range(&self, span: SimpleSpan) -> SourceRange {
        let span = span.into_range();
        SourceRange::new(
            self.filename,
            self.lines.pos(span.start),
            self.lines.pos(span.end),
        )
    }

    fn found(&self, span: SimpleSpan) -> String {
        let start = span.into_range().start;
        if start >= self.eof {
            return "end of file".to_string();
        }
        match self.tokens.binary_search_by_key(&start, |token| token.start.byte) {
            Ok(at) => self.tokens[at].kind.describe(),
            Err(_) => "end of file".to_string(),
        }
    }

    fn diagnostic(&self, err: &Rich<'_, TokenKind>) -> Diagnostic {
        let span = *err.span();
        let found = self.found(span);
        let (summary, detail) = match err.reason() {
            RichReason::Custom(summary) => (summary.clone(), detail(summary, &found)),
            _ => ("Invalid syntax".to_string(), detail("", &found)),
        };
        Diagnostic::error(DiagnosticCategory::Syntax, summary, detail)
            .with_subject(self.range(span))
    }
}

/// Where the user content of a wrapped container ends: the newline in
/// front of the final closing brace.
fn container_eof(tokens: &[Token], len: usize) -> usize {
    let Some(at) = tokens.iter().rposition(|t| t.kind != TokenKind::Newline) else {
        return len;
    };
    if tokens[at].kind != TokenKind::CBrace {
        return len;
    }
    match at.checked_sub(1).map(|prev| &tokens[prev]) {
        Some(prev) if prev.kind == TokenKind::Newline => prev.start.byte,
        _ => tokens[at].start.byte,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closing {
    Closed,
    /// Ran into the end of input or somebody else's closer.
    Unclosed,
    /// An error was already reported and the input skipped.
    Broken,
}

fn newlines<'a, I>() -> impl Parser<'a, I, (), Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    just(TokenKind::Newline).repeated()
}

/// End of input. Inside a container the final closing brace counts as the
/// end. Never consumes anything.
fn boundary<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, SimpleSpan, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    let container = ctx.container;
    choice((
        end().to(ctx.eoi()),
        select! { TokenKind::CBrace if container => () }
            .map_with(|_, e| e.span())
            .then_ignore(newlines())
            .then_ignore(end()),
    ))
    .rewind()
}

/// The span of the next token, or of the end of input.
fn lookahead<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, SimpleSpan, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    choice((boundary(ctx), any().map_with(|_, e| e.span()).rewind()))
}

/// Reports `summary` at the span `at` yields.
fn report<'a, I, P>(at: P, summary: &'static str) -> impl Parser<'a, I, SimpleSpan, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
    P: Parser<'a, I, SimpleSpan, Extra<'a>> + Clone,
{
    at.validate(move |span, _, emitter| {
        emitter.emit(Rich::custom(span, summary));
        span
    })
}

/// Skips balanced groups up to the closer `own` and consumes it. Stops in
/// front of any other closer.
fn skip_to_close<'a, I>(ctx: &'a Ctx<'a>, own: TokenKind) -> impl Parser<'a, I, (), Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    let inner_closer = one_of(CLOSERS).and_is(boundary(ctx).not());
    let group = recursive(|group| {
        choice((
            one_of(OPENERS)
                .ignore_then(group.repeated())
                .ignore_then(inner_closer.or_not())
                .ignored(),
            none_of(DELIMITERS).ignored(),
        ))
    });
    group
        .repeated()
        .ignore_then(just(own).and_is(boundary(ctx).not()).or_not())
        .ignored()
}

/// Skips the rest of the line along with its newline.
fn recover_line<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, (), Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    none_of([TokenKind::Newline])
        .and_is(boundary(ctx).not())
        .repeated()
        .then(just(TokenKind::Newline).or_not())
        .ignored()
}

/// How a delimited construct ends, given its closer `own`.
fn closing<'a, I>(ctx: &'a Ctx<'a>, own: TokenKind) -> impl Parser<'a, I, Closing, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    choice((
        just(own.clone())
            .and_is(boundary(ctx).not())
            .to(Closing::Closed),
        boundary(ctx).to(Closing::Unclosed),
        one_of(CLOSERS)
            .and_is(just(own).not())
            .rewind()
            .to(Closing::Unclosed),
    ))
}

/// The newline ending an attribute or block. A closing brace or the end
/// of input also ends it, without being consumed.
fn end_of_item<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, (), Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    choice((
        just(TokenKind::Newline).ignored(),
        just(TokenKind::CBrace).ignored().or(end()).rewind(),
        report(lookahead(ctx), MISSING_NEWLINE).ignore_then(recover_line(ctx)),
    ))
}

fn ident<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, (String, SourceRange), Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    select! { TokenKind::Ident(name) => name }.map_with(move |name, e| (name, ctx.range(e.span())))
}

/// Stands in for a missing expression. Terminators stay in place for the
/// enclosing construct; anything else is consumed.
fn invalid_expression<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, Expression, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    let terminator = one_of([
        TokenKind::Newline,
        TokenKind::Comma,
        TokenKind::CBrace,
        TokenKind::CBrack,
        TokenKind::CParen,
    ])
    .map_with(|_, e| e.span())
    .rewind();
    let at = choice((boundary(ctx), terminator, any().map_with(|_, e| e.span())));
    report(at, INVALID_EXPRESSION).map(move |span| Expression {
        kind: ExprKind::Null,
        range: ctx.range(span),
    })
}

/// `root.attr.0[index]`, with `index` parsing bracketed keys.
fn traversal<'a, I, V>(ctx: &'a Ctx<'a>, index: V) -> impl Parser<'a, I, Traversal, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
    V: Parser<'a, I, Expression, Extra<'a>> + Clone,
{
    let attr = just(TokenKind::Dot)
        .ignore_then(select! { TokenKind::Ident(name) => name })
        .map_with(move |name, e| TraversalStep::Attr {
            name,
            range: ctx.range(e.span()),
        });
    let numeric = just(TokenKind::Dot)
        .ignore_then(select! { TokenKind::Number(text) => text }.map_with(move |text, e| {
            Expression {
                kind: ExprKind::Number(text),
                range: ctx.range(e.span()),
            }
        }))
        .map_with(move |key, e| TraversalStep::Index {
            key: Box::new(key),
            range: ctx.range(e.span()),
        });
    let bracketed = just(TokenKind::OBrack)
        .ignore_then(newlines())
        .ignore_then(index)
        .then_ignore(newlines())
        .then_ignore(choice((
            just(TokenKind::CBrack).ignored(),
            report(lookahead(ctx), MISSING_INDEX_BRACKET)
                .ignore_then(skip_to_close(ctx, TokenKind::CBrack)),
        )))
        .map_with(move |key, e| TraversalStep::Index {
            key: Box::new(key),
            range: ctx.range(e.span()),
        });
    let dangling = just(TokenKind::Dot).ignore_then(report(lookahead(ctx), INVALID_ATTRIBUTE_NAME));

    ident(ctx)
        .then(choice((attr, numeric, bracketed)).repeated().collect::<Vec<_>>())
        .then_ignore(dangling.or_not())
        .map_with(move |((root, root_range), steps), e| Traversal {
            root,
            root_range,
            steps,
            range: ctx.range(e.span()),
        })
}

/// An object key: a traversal, or an expression that starts like a
/// quoted string, number, negation, or parenthesized expression.
fn object_key<'a, I, X, V>(ctx: &'a Ctx<'a>, expr: X, index: V) -> impl Parser<'a, I, ObjectKey, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
    X: Parser<'a, I, Expression, Extra<'a>> + Clone,
    V: Parser<'a, I, Expression, Extra<'a>> + Clone,
{
    let starts_key = any()
        .filter(|token: &TokenKind| {
            matches!(
                token,
                TokenKind::Str(_)
                    | TokenKind::Heredoc(_)
                    | TokenKind::Number(_)
                    | TokenKind::OParen
                    | TokenKind::Minus
            )
        })
        .rewind();
    choice((
        traversal(ctx, index).map(ObjectKey::Traversal),
        starts_key.ignore_then(expr).map(ObjectKey::Expression),
    ))
}

/// Comma-separated entries up to `close`, for tuples and call arguments.
fn comma_list<'a, I, V>(
    ctx: &'a Ctx<'a>,
    entry: V,
    close: TokenKind,
    missing: &'static str,
) -> impl Parser<'a, I, (Vec<Expression>, Closing), Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
    V: Parser<'a, I, Expression, Extra<'a>> + Clone,
{
    let entry = one_of(CLOSERS)
        .ignored()
        .or(end())
        .not()
        .ignore_then(entry);
    let separator = newlines()
        .then(just(TokenKind::Comma))
        .then(newlines());
    newlines()
        .ignore_then(
            entry
                .separated_by(separator)
                .allow_trailing()
                .collect::<Vec<_>>(),
        )
        .then_ignore(newlines())
        .then(choice((
            closing(ctx, close.clone()),
            report(lookahead(ctx), missing)
                .ignore_then(skip_to_close(ctx, close))
                .to(Closing::Broken),
        )))
}

fn expression<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, Expression, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    recursive(|expr| {
        let value = expr.clone().or(invalid_expression(ctx));

        let literal = select! {
            TokenKind::Number(text) => ExprKind::Number(text),
            TokenKind::Str(value) => ExprKind::String(value),
            TokenKind::Heredoc(value) => ExprKind::String(value),
            TokenKind::Ident(name) if name == "true" => ExprKind::Bool(true),
            TokenKind::Ident(name) if name == "false" => ExprKind::Bool(false),
            TokenKind::Ident(name) if name == "null" => ExprKind::Null,
        };

        let negate = just(TokenKind::Minus)
            .ignore_then(value.clone())
            .map(|operand| ExprKind::Negate(Box::new(operand)));

        let call = ident(ctx)
            .then(just(TokenKind::OParen).map_with(|_, e| e.span()))
            .then(comma_list(
                ctx,
                value.clone(),
                TokenKind::CParen,
                MISSING_ARGUMENT_SEPARATOR,
            ))
            .validate(|(((name, _), open), (args, closing)), _, emitter| {
                if closing == Closing::Unclosed {
                    emitter.emit(Rich::custom(open, UNCLOSED_CALL));
                }
                ExprKind::FunctionCall { name, args }
            });

        let tuple = just(TokenKind::OBrack)
            .map_with(|_, e| e.span())
            .then(comma_list(
                ctx,
                value.clone(),
                TokenKind::CBrack,
                MISSING_ITEM_SEPARATOR,
            ))
            .validate(|(open, (items, closing)), _, emitter| {
                if closing == Closing::Unclosed {
                    emitter.emit(Rich::custom(open, UNCLOSED_TUPLE));
                }
                ExprKind::Tuple(items)
            });

        let key = object_key(ctx, expr.clone(), value.clone());
        let item = key
            .clone()
            .then_ignore(one_of([TokenKind::Equal, TokenKind::Colon]))
            .then(value.clone())
            .map(|(key, value)| ObjectItem { key, value });
        let separated = newlines()
            .ignore_then(item.clone())
            .then_ignore(one_of([TokenKind::Comma, TokenKind::Newline]))
            .repeated()
            .collect::<Vec<_>>();
        let after_value = choice((
            closing(ctx, TokenKind::CBrace),
            report(lookahead(ctx), MISSING_ATTRIBUTE_SEPARATOR)
                .ignore_then(skip_to_close(ctx, TokenKind::CBrace))
                .to(Closing::Broken),
        ));
        let at_item = choice((
            closing(ctx, TokenKind::CBrace),
            key.ignore_then(report(lookahead(ctx), MISSING_KEY_VALUE_SEPARATOR))
                .ignore_then(skip_to_close(ctx, TokenKind::CBrace))
                .to(Closing::Broken),
            report(lookahead(ctx), INVALID_OBJECT_KEY)
                .ignore_then(skip_to_close(ctx, TokenKind::CBrace))
                .to(Closing::Broken),
        ));
        let tail = choice((
            item.map(Some).then(after_value),
            at_item.map(|closing| (None, closing)),
        ));
        let object = just(TokenKind::OBrace)
            .map_with(|_, e| e.span())
            .then(separated.then_ignore(newlines()).then(tail))
            .validate(|(open, (mut items, (last, closing))), _, emitter| {
                items.extend(last);
                if closing == Closing::Unclosed {
                    emitter.emit(Rich::custom(open, UNCLOSED_OBJECT));
                }
                ExprKind::Object(items)
            });

        let parens = just(TokenKind::OParen)
            .ignore_then(newlines())
            .ignore_then(value.clone())
            .then_ignore(newlines())
            .then_ignore(choice((
                just(TokenKind::CParen).ignored(),
                report(lookahead(ctx), UNBALANCED_PARENTHESES).ignore_then(choice((
                    boundary(ctx).ignored(),
                    one_of([TokenKind::CBrace, TokenKind::CBrack]).rewind().ignored(),
                    skip_to_close(ctx, TokenKind::CParen),
                ))),
            )))
            .map(|inner| ExprKind::Parens(Box::new(inner)));

        choice((
            literal,
            negate,
            call,
            traversal(ctx, value).map(ExprKind::Traversal),
            tuple,
            object,
            parens,
        ))
        .map_with(move |kind, e| Expression {
            kind,
            range: ctx.range(e.span()),
        })
        .boxed()
    })
}

/// One attribute or block. Malformed items report an error, skip their
/// line, and yield `None`.
fn structure<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, Option<Structure>, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    let value = expression(ctx).or(invalid_expression(ctx));
    recursive(move |structure| {
        let attribute = ident(ctx)
            .then_ignore(just(TokenKind::Equal))
            .then(value.clone())
            .then_ignore(end_of_item(ctx))
            .map(|((name, name_range), expr)| {
                let range = name_range.to(&expr.range);
                Some(Structure::Attribute(Attribute {
                    name,
                    name_range,
                    expr,
                    range,
                }))
            });

        let label = select! {
            TokenKind::Str(value) => value,
            TokenKind::Ident(value) => value,
        }
        .map_with(move |value, e| Label {
            value,
            range: ctx.range(e.span()),
        });

        let body = just(TokenKind::OBrace)
            .map_with(|_, e| e.span())
            .then(
                newlines()
                    .ignore_then(structure)
                    .repeated()
                    .collect::<Vec<_>>()
                    .then_ignore(newlines()),
            )
            .then(just(TokenKind::CBrace).or_not())
            .map_with(move |((open, items), close), e| {
                let body = Body {
                    items: items.into_iter().flatten().collect(),
                    range: ctx.range(e.span()),
                };
                (open, close.is_some(), body)
            });

        let block = ident(ctx)
            .then(label.clone().repeated().collect::<Vec<_>>())
            .then(body)
            .map_with(move |(((kind, kind_range), labels), (open, closed, body)), e| {
                let block = Block {
                    kind,
                    kind_range,
                    labels,
                    body,
                    range: ctx.range(e.span()),
                };
                (block, open, closed)
            })
            .validate(|(block, open, closed), _, emitter| {
                if !closed {
                    emitter.emit(Rich::custom(open, UNCLOSED_BLOCK));
                }
                Some(Structure::Block(block))
            })
            .then_ignore(end_of_item(ctx));

        let invalid_block = ident(ctx)
            .then(label.repeated().at_least(1))
            .ignore_then(report(lookahead(ctx), INVALID_BLOCK))
            .ignore_then(recover_line(ctx))
            .to(None);

        let invalid_definition = ident(ctx)
            .ignore_then(report(lookahead(ctx), INVALID_DEFINITION))
            .ignore_then(recover_line(ctx))
            .to(None);

        let required = report(
            none_of([TokenKind::CBrace]).map_with(|_, e| e.span()).rewind(),
            DEFINITION_REQUIRED,
        )
        .ignore_then(recover_line(ctx))
        .to(None);

        choice((attribute, block, invalid_block, invalid_definition, required)).boxed()
    })
}

fn body<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, Body, Extra<'a>>
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    let stray = report(
        just(TokenKind::CBrace).map_with(|_, e| e.span()),
        UNEXPECTED_CLOSING_BRACE,
    )
    .to(None);
    newlines()
        .ignore_then(choice((structure(ctx), stray)))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(newlines())
        .then_ignore(end())
        .map_with(move |items, e| Body {
            items: items.into_iter().flatten().collect(),
            range: ctx.range(e.span()),
        })
}

/// `__overrides__ = { ... }` where every entry is written like a body
/// attribute: one `key = value` per line, no commas between entries.
fn container<'a, I>(ctx: &'a Ctx<'a>) -> impl Parser<'a, I, Body, Extra<'a>>
where
    I: ValueInput<'a, Token = TokenKind, Span = SimpleSpan>,
{
    let value = expression(ctx).or(invalid_expression(ctx));
    let key = object_key(ctx, expression(ctx), value.clone());
    let assignment = choice((
        key.clone()
            .then_ignore(just(TokenKind::Equal))
            .then(value)
            .then_ignore(end_of_item(ctx))
            .map(|(key, value)| Some(ObjectItem { key, value })),
        key.ignore_then(report(lookahead(ctx), MISSING_KEY_VALUE_SEPARATOR))
            .ignore_then(recover_line(ctx))
            .to(None),
        report(
            just(TokenKind::CBrace)
                .and_is(boundary(ctx).not())
                .map_with(|_, e| e.span()),
            UNEXPECTED_CLOSING_BRACE,
        )
        .to(None),
        report(
            any()
                .and_is(boundary(ctx).not())
                .map_with(|_, e| e.span())
                .rewind(),
            DEFINITION_REQUIRED,
        )
        .ignore_then(recover_line(ctx))
        .to(None),
    ));

    let header = select! { TokenKind::Ident(name) if name == WRAPPER_ATTRIBUTE => name }
        .map_with(move |name, e| (name, ctx.range(e.span())))
        .then_ignore(just(TokenKind::Equal));
    // The final brace is missing when a heredoc or comment ran over it.
    let object = just(TokenKind::OBrace)
        .ignore_then(
            newlines()
                .ignore_then(assignment)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(newlines())
        .then_ignore(just(TokenKind::CBrace).or_not())
        .map_with(move |items, e| Expression {
            kind: ExprKind::Object(items.into_iter().flatten().collect()),
            range: ctx.range(e.span()),
        });

    newlines()
        .ignore_then(header)
        .then(object)
        .then_ignore(newlines())
        .then_ignore(end())
        .map_with(move |((name, name_range), expr), e| {
            let range = name_range.to(&expr.range);
            Body {
                items: vec![Structure::Attribute(Attribute {
                    name,
                    name_range,
                    expr,
                    range,
                })],
                range: ctx.range(e.span()),
            }
        })
}

/// Parses `src` as a body of attributes and blocks.
pub fn parse_body(src: &str, filename: &str) -> (Body, Diagnostics) {
    let (tokens, mut diags) = tokenize(src, filename);
    let ctx = Ctx::new(src, filename, &tokens, false);
    let input = Stream::from_iter(
        tokens
            .iter()
            .map(|token| (token.kind.clone(), SimpleSpan::from(token.span()))),
    )
    .map(ctx.eoi(), |(kind, span): (_, _)| (kind, span));
    let (body, errors) = body(&ctx).parse(input).into_output_errors();
    diags.extend(errors.iter().map(|err| ctx.diagnostic(err)).collect());

    let body = body.unwrap_or_else(|| Body {
        items: Vec::new(),
        range: SourceRange::whole(filename, src),
    });
    tracing::trace!(filename, items = body.items.len(), "parsed body");
    (body, diags)
}

/// Parses the output of [`crate::wrap::WrappedSource::wrap`].
///
/// Entries inside the wrapper follow body rules rather than object rules:
/// each `key = value` ends with a newline and commas between entries are
/// errors. Unclosed collections stop at the wrapper's final brace, so the
/// diagnostics match what [`parse_body`] reports for the unwrapped content.
pub fn parse_container(src: &str, filename: &str) -> (Body, Diagnostics) {
    let (tokens, mut diags) = tokenize(src, filename);
    let ctx = Ctx::new(src, filename, &tokens, true);
    let input = Stream::from_iter(
        tokens
            .iter()
            .map(|token| (token.kind.clone(), SimpleSpan::from(token.span()))),
    )
    .map(ctx.eoi(), |(kind, span): (_, _)| (kind, span));
    let (body, errors) = container(&ctx).parse(input).into_output_errors();
    diags.extend(errors.iter().map(|err| ctx.diagnostic(err)).collect());

    let body = body.unwrap_or_else(|| Body {
        items: Vec::new(),
        range: SourceRange::whole(filename, src),
    });
    tracing::trace!(filename, errors = diags.len(), "parsed override container");
    (body, diags)
}

/// Parses `src` as exactly one expression.
pub fn parse_expression(src: &str, filename: &str) -> (Expression, Diagnostics) {
    let (tokens, mut diags) = tokenize(src, filename);
    let ctx = Ctx::new(src, filename, &tokens, false);
    let input = Stream::from_iter(
        tokens
            .iter()
            .map(|token| (token.kind.clone(), SimpleSpan::from(token.span()))),
    )
    .map(ctx.eoi(), |(kind, span): (_, _)| (kind, span));
    let parser = newlines()
        .ignore_then(expression(&ctx).or(invalid_expression(&ctx)))
        .then_ignore(newlines())
        .then_ignore(choice((
            end(),
            report(lookahead(&ctx), EXTRA_CHARACTERS).ignore_then(any().repeated()),
        )))
        .then_ignore(end());
    let (expr, errors) = parser.parse(input).into_output_errors();
    diags.extend(errors.iter().map(|err| ctx.diagnostic(err)).collect());

    let expr = expr.unwrap_or_else(|| Expression {
        kind: ExprKind::Null,
        range: SourceRange::whole(filename, src),
    });
    (expr, diags)
}
