//! Tokenizer for the configuration language.
//!
//! Newlines are significant and emitted as tokens; whitespace and comments
//! are skipped. String literals and heredocs are decoded by their token
//! callbacks, so the parser only ever sees their final text.

use std::ops::Range;

use logos::{Lexer, Logos, Skip};

use crate::diagnostic::{Diagnostic, DiagnosticCategory, Diagnostics};
use crate::pos::{LineIndex, Pos, SourceRange};

/// Diagnostics collected by the token callbacks.
#[derive(Debug, Default)]
pub struct LexState {
    filename: String,
    diags: Diagnostics,
}

impl LexState {
    fn error(
        &mut self,
        src: &str,
        span: Range<usize>,
        category: DiagnosticCategory,
        summary: &str,
        detail: impl Into<String>,
    ) {
        let subject = SourceRange::new(
            self.filename.as_str(),
            Pos::from_offset(src, span.start),
            Pos::from_offset(src, span.end),
        );
        self.diags
            .push(Diagnostic::error(category, summary, detail).with_subject(subject));
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(extras = LexState)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    #[regex(r"[\p{L}_][\p{L}\p{N}_\-]*", |lex| lex.slice().to_string())]
    Ident(String),
    /// Numeric literal text, exactly as written.
    #[regex("[0-9]+", number)]
    Number(String),
    /// Decoded quoted string.
    #[regex(r#""([^"\\\n]|\\.)*""#, quoted_string)]
    #[regex(r#""([^"\\\n]|\\.)*"#, unterminated_string)]
    Str(String),
    /// Decoded heredoc body.
    #[regex(r"<<-?[\p{L}_][\p{L}\p{N}_\-]*\n", heredoc)]
    #[regex(r"<<-?([\p{L}_][\p{L}\p{N}_\-]*)?", invalid_heredoc)]
    Heredoc(String),
    #[token("{")]
    OBrace,
    #[token("}")]
    CBrace,
    #[token("[")]
    OBrack,
    #[token("]")]
    CBrack,
    #[token("(")]
    OParen,
    #[token(")")]
    CParen,
    #[token("=")]
    Equal,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("\n")]
    Newline,
    /// `/* ... */`, skipped by its callback.
    #[token("/*", block_comment)]
    BlockComment,
    /// A character no token starts with.
    Invalid(char),
}

impl TokenKind {
    /// Human-readable name used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier {name:?}"),
            Self::Number(text) => format!("number {text}"),
            Self::Str(_) => "quoted string".to_string(),
            Self::Heredoc(_) => "heredoc".to_string(),
            Self::OBrace => "opening brace".to_string(),
            Self::CBrace => "closing brace".to_string(),
            Self::OBrack => "opening bracket".to_string(),
            Self::CBrack => "closing bracket".to_string(),
            Self::OParen => "opening parenthesis".to_string(),
            Self::CParen => "closing parenthesis".to_string(),
            Self::Equal => "equals sign".to_string(),
            Self::Colon => "colon".to_string(),
            Self::Comma => "comma".to_string(),
            Self::Dot => "dot".to_string(),
            Self::Minus => "minus sign".to_string(),
            Self::Newline => "newline".to_string(),
            Self::BlockComment => "comment".to_string(),
            Self::Invalid(ch) => format!("character {ch:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Pos,
    pub end: Pos,
}

impl Token {
    pub fn span(&self) -> Range<usize> {
        self.start.byte..self.end.byte
    }
}

/// Tokenizes `src`, returning every token and any lexical diagnostics.
pub fn tokenize(src: &str, filename: &str) -> (Vec<Token>, Diagnostics) {
    let lines = LineIndex::new(src);
    let state = LexState {
        filename: filename.to_string(),
        diags: Diagnostics::new(),
    };
    let mut lexer = TokenKind::lexer_with_extras(src, state);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let kind = match result {
            Ok(kind) => kind,
            Err(()) => {
                let ch = lexer.slice().chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                lexer.extras.error(
                    src,
                    span.clone(),
                    DiagnosticCategory::Syntax,
                    "Invalid character",
                    format!("The character {ch:?} is not valid here."),
                );
                TokenKind::Invalid(ch)
            }
        };
        tokens.push(Token {
            kind,
            start: lines.pos(span.start),
            end: lines.pos(span.end),
        });
    }
    tracing::trace!(filename, tokens = tokens.len(), "tokenized source");
    (tokens, lexer.extras.diags)
}

fn ascii_digits(text: &str) -> usize {
    text.bytes().take_while(u8::is_ascii_digit).count()
}

/// Extends an integer match with an optional fraction and exponent.
fn number(lex: &mut Lexer<TokenKind>) -> String {
    let rest = lex.remainder();
    let mut len = 0;
    if rest.starts_with('.') {
        let fraction = ascii_digits(&rest[1..]);
        if fraction > 0 {
            len = 1 + fraction;
        }
    }
    if rest[len..].starts_with(['e', 'E']) {
        let sign = usize::from(rest[len + 1..].starts_with(['+', '-']));
        let exponent = ascii_digits(&rest[len + 1 + sign..]);
        if exponent > 0 {
            len += 1 + sign + exponent;
        }
    }
    lex.bump(len);
    lex.slice().to_string()
}

fn quoted_string(lex: &mut Lexer<TokenKind>) -> String {
    let start = lex.span().start;
    let slice = lex.slice();
    let src = lex.source();
    decode_template(&mut lex.extras, src, &slice[1..slice.len() - 1], start + 1, true)
}

fn unterminated_string(lex: &mut Lexer<TokenKind>) -> String {
    let span = lex.span();
    let slice = lex.slice();
    let src = lex.source();
    let text = decode_template(&mut lex.extras, src, &slice[1..], span.start + 1, true);
    lex.extras.error(
        src,
        span,
        DiagnosticCategory::Syntax,
        "Unterminated template string",
        "No closing marker was found for the string.",
    );
    text
}

/// Consumes heredoc lines up to the closing marker.
fn heredoc(lex: &mut Lexer<TokenKind>) -> String {
    let start = lex.span().start;
    let body_start = lex.span().end;
    let intro = lex.slice().trim_end_matches('\n');
    let indented = intro[2..].starts_with('-');
    let marker = intro[2..].trim_start_matches('-');
    let src = lex.source();
    let rest = lex.remainder();

    let mut lines = Vec::new();
    let mut consumed = 0;
    let mut closed = false;
    for line in rest.split_inclusive('\n') {
        let text = line.strip_suffix('\n').unwrap_or(line);
        if text.trim() == marker {
            consumed += text.len();
            closed = true;
            break;
        }
        lines.push(decode_template(&mut lex.extras, src, text, body_start + consumed, false));
        consumed += line.len();
    }
    if !closed {
        lex.extras.error(
            src,
            start..src.len(),
            DiagnosticCategory::Syntax,
            "Unterminated heredoc",
            format!("The heredoc is never closed by a line containing only {marker:?}."),
        );
    }
    lex.bump(consumed);

    if indented {
        let indent = lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
            .min()
            .unwrap_or(0);
        for line in &mut lines {
            *line = line.chars().skip(indent).collect();
        }
    }

    let mut body = lines.join("\n");
    if !lines.is_empty() {
        body.push('\n');
    }
    body
}

fn invalid_heredoc(lex: &mut Lexer<TokenKind>) -> String {
    let span = lex.span();
    let src = lex.source();
    lex.extras.error(
        src,
        span,
        DiagnosticCategory::Syntax,
        "Invalid heredoc introducer",
        "A heredoc must start with \"<<\" or \"<<-\", an identifier, and a newline.",
    );
    String::new()
}

fn block_comment(lex: &mut Lexer<TokenKind>) -> Skip {
    match lex.remainder().find("*/") {
        Some(end) => lex.bump(end + 2),
        None => {
            let start = lex.span().start;
            let src = lex.source();
            lex.bump(lex.remainder().len());
            lex.extras.error(
                src,
                start..src.len(),
                DiagnosticCategory::Syntax,
                "Unterminated block comment",
                "There is no closing marker (\"*/\") for this comment.",
            );
        }
    }
    Skip
}

/// Decodes literal template text found at byte `offset` of `src`.
///
/// `$${` and `%%{` unescape to `${` and `%{`; a bare `${` or `%{` is
/// rejected. Backslash escapes apply only to quoted strings.
fn decode_template(
    state: &mut LexState,
    src: &str,
    text: &str,
    offset: usize,
    escapes: bool,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((at, ch)) = chars.next() {
        match ch {
            '\\' if escapes => {
                let start = offset + at;
                match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((marker_at, marker @ ('u' | 'U'))) => {
                        let len = if marker == 'u' { 4 } else { 8 };
                        let hex: String = text[marker_at + 1..]
                            .chars()
                            .take(len)
                            .take_while(char::is_ascii_hexdigit)
                            .collect();
                        for _ in 0..hex.len() {
                            chars.next();
                        }
                        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                            Some(decoded) if hex.len() == len => out.push(decoded),
                            _ => state.error(
                                src,
                                start..offset + marker_at + 1 + hex.len(),
                                DiagnosticCategory::Syntax,
                                "Invalid escape sequence",
                                format!(
                                    "A \\u or \\U escape must be followed by {len} hexadecimal \
                                     digits naming a valid character."
                                ),
                            ),
                        }
                    }
                    other => {
                        let end = other.map_or(start + 1, |(next_at, next)| {
                            offset + next_at + next.len_utf8()
                        });
                        state.error(
                            src,
                            start..end,
                            DiagnosticCategory::Syntax,
                            "Invalid escape sequence",
                            "The symbol following the backslash is not a recognized escape. \
                             Use \"\\\\\" for a literal backslash.",
                        );
                    }
                }
            }
            '$' | '%' => {
                let tail = &text[at + 1..];
                if tail.starts_with(ch) && tail[1..].starts_with('{') {
                    out.push(ch);
                    out.push('{');
                    chars.nth(1);
                } else if tail.starts_with('{') {
                    state.error(
                        src,
                        offset + at..offset + at + 2,
                        DiagnosticCategory::UnsupportedConstruct,
                        "Template sequences not allowed",
                        "Interpolation and directive sequences cannot be used in variable values. \
                         Escape the sequence by doubling the leading character.",
                    );
                    out.push(ch);
                    out.push('{');
                    chars.next();
                } else {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, diags) = tokenize(src, "test.hcl");
        assert!(!diags.has_errors(), "unexpected diagnostics: {diags}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_attribute_with_comments() {
        assert_eq!(
            kinds("# leading\nname = \"web\" // trailing\n/* block\n */ x"),
            vec![
                TokenKind::Newline,
                TokenKind::Ident("name".into()),
                TokenKind::Equal,
                TokenKind::Str("web".into()),
                TokenKind::Newline,
                TokenKind::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn numbers_keep_their_text() {
        assert_eq!(
            kinds("1.50e+3 7 2e"),
            vec![
                TokenKind::Number("1.50e+3".into()),
                TokenKind::Number("7".into()),
                TokenKind::Number("2".into()),
                TokenKind::Ident("e".into()),
            ]
        );
    }

    #[test]
    fn traversal_index_is_not_a_decimal() {
        assert_eq!(
            kinds("a.0 1.x"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Dot,
                TokenKind::Number("0".into()),
                TokenKind::Number("1".into()),
                TokenKind::Dot,
                TokenKind::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn identifiers_allow_dashes_after_the_first_char() {
        assert_eq!(
            kinds("my-var -x"),
            vec![
                TokenKind::Ident("my-var".into()),
                TokenKind::Minus,
                TokenKind::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn string_escapes_are_decoded() {
        assert_eq!(
            kinds(r#""a\"b\né é $${x} %%{y}""#),
            vec![TokenKind::Str("a\"b\né é ${x} %{y}".into())]
        );
    }

    #[test]
    fn interpolation_is_rejected() {
        let (_, diags) = tokenize("\"${var.x}\"", "test.hcl");
        assert_eq!(diags.len(), 1);
        let diag = diags.first().cloned().expect("one diagnostic");
        assert_eq!(diag.category, DiagnosticCategory::UnsupportedConstruct);
        assert_eq!(
            diag.subject.map(|s| (s.start.byte, s.end.byte)),
            Some((1, 3))
        );
    }

    #[test]
    fn bad_unicode_escape_is_reported() {
        let (tokens, diags) = tokenize(r#""\u00zz""#, "test.hcl");
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.first().map(|d| d.summary.as_str()),
            Some("Invalid escape sequence")
        );
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn unterminated_string_reports_once() {
        let (tokens, diags) = tokenize("\"abc\nx", "test.hcl");
        assert_eq!(diags.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Str("abc".into()));
        assert_eq!(tokens[1].kind, TokenKind::Newline);
    }

    #[test]
    fn heredoc_strips_indent() {
        let src = "<<-EOT\n    one\n      two\n    EOT\n";
        assert_eq!(
            kinds(src),
            vec![TokenKind::Heredoc("one\n  two\n".into()), TokenKind::Newline]
        );
    }

    #[test]
    fn unterminated_heredoc_runs_to_the_end() {
        let src = "<<EOT\nbody\n";
        let (tokens, diags) = tokenize(src, "test.hcl");
        assert_eq!(tokens.len(), 1);
        let diag = diags.first().cloned().expect("one diagnostic");
        assert_eq!(diag.summary, "Unterminated heredoc");
        assert_eq!(diag.subject.map(|s| s.end), Some(Pos::end_of(src)));
    }

    #[test]
    fn unterminated_block_comment_is_reported() {
        let (tokens, diags) = tokenize("a /* never closed", "test.hcl");
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            diags.first().map(|d| d.summary.as_str()),
            Some("Unterminated block comment")
        );
    }

    #[test]
    fn invalid_characters_become_tokens() {
        let (tokens, diags) = tokenize("a + b", "test.hcl");
        assert_eq!(tokens[1].kind, TokenKind::Invalid('+'));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn token_positions_are_exact() {
        let (tokens, _) = tokenize("ab = 1\ncd", "test.hcl");
        let cd = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Ident("cd".into()))
            .map(|t| (t.start, t.end));
        assert_eq!(cd, Some((Pos::new(2, 1, 7), Pos::new(2, 3, 9))));
    }
}
