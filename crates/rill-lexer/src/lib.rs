// Rill lexer -- tokenizer for the Rill programming language.
//
// Converts source text into a token stream. Scanning never aborts: lexical
// failures produce inline `Error` tokens plus diagnostics, and the stream
// is always terminated by `Eof`.

mod cursor;

use std::sync::Arc;

use cursor::Cursor;
use rill_common::diagnostics::Diagnostic;
use rill_common::span::{Position, Span};
use rill_common::token::{
    builtin_type_from_str, keyword_from_str, IntWidth, Token, TokenKind, TokenValue,
};

/// The Rill lexer. Converts source text into a stream of tokens.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    file: Arc<str>,
    diagnostics: Vec<Diagnostic>,
}

/// Tokenize an entire source file.
///
/// Returns the token sequence (always ending in `Eof`) and any lexical
/// diagnostics. Errors are non-fatal: an `Error` token is emitted inline
/// and scanning continues with the next character.
pub fn tokenize(file: &str, source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(file, source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    (tokens, lexer.diagnostics)
}

impl<'src> Lexer<'src> {
    pub fn new(file: &str, source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            file: Arc::from(file),
            diagnostics: Vec::new(),
        }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.cursor.pos();

        let Some(c) = self.cursor.peek() else {
            return self.token(TokenKind::Eof, start);
        };

        match c {
            // ── Delimiters and simple punctuation ──────────────────────
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '%' => self.single(TokenKind::Percent, start),
            '?' => self.single(TokenKind::Question, start),

            // ── Multi-character operators ──────────────────────────────
            '=' => self.lex_eq(start),
            '!' => self.lex_bang(start),
            '<' => self.lex_lt(start),
            '>' => self.lex_gt(start),
            '&' => self.lex_amp(start),
            '|' => self.lex_pipe(start),
            '+' => self.lex_plus(start),
            '-' => self.lex_minus(start),
            '*' => self.lex_star(start),
            '/' => self.single(TokenKind::Slash, start),
            ':' => self.lex_colon(start),
            '.' => self.lex_dot(start),

            // ── Unicode operator symbols ───────────────────────────────
            'ƒ' | 'λ' => self.single(TokenKind::Fn, start),
            '→' => self.single(TokenKind::Arrow, start),
            '←' => self.single(TokenKind::LArrow, start),
            '≠' => self.single(TokenKind::NotEq, start),
            '≤' => self.single(TokenKind::LtEq, start),
            '≥' => self.single(TokenKind::GtEq, start),
            '∧' => self.single(TokenKind::AmpAmp, start),
            '∨' => self.single(TokenKind::PipePipe, start),
            '¬' => self.single(TokenKind::Bang, start),
            'ℤ' => self.lex_double_struck_int(start),
            'ℕ' => self.single(TokenKind::TyNat, start),
            'ℝ' => self.single(TokenKind::TyFloat, start),

            // ── Literals ───────────────────────────────────────────────
            '0'..='9' => self.lex_number(start),
            '"' => self.lex_string(start),
            '`' => self.lex_template(start),

            // ── Identifiers, keywords, type identifiers ────────────────
            c if is_ident_start(c) => self.lex_ident(start),

            // ── Unknown character (error recovery) ─────────────────────
            c => {
                self.cursor.advance();
                self.error_token(start, format!("unexpected character: {c:?}"))
            }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn span_from(&self, start: Position) -> Span {
        Span::new(self.file.clone(), start, self.cursor.pos())
    }

    fn token(&self, kind: TokenKind, start: Position) -> Token {
        Token::new(kind, self.span_from(start))
    }

    /// Consume one character and return a token of the given kind.
    fn single(&mut self, kind: TokenKind, start: Position) -> Token {
        self.cursor.advance();
        self.token(kind, start)
    }

    /// Emit an `Error` token and record the matching diagnostic.
    fn error_token(&mut self, start: Position, message: String) -> Token {
        let span = self.span_from(start);
        self.diagnostics
            .push(Diagnostic::syntax(message.clone(), span.clone()));
        Token::with_value(TokenKind::Error, span, TokenValue::Error(message))
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            self.cursor
                .eat_while(|c| c == ' ' || c == '\t' || c == '\n' || c == '\r');
            if self.cursor.peek() == Some('/') {
                match self.cursor.peek_next() {
                    Some('/') => {
                        self.cursor.eat_while(|c| c != '\n');
                        continue;
                    }
                    Some('*') => {
                        self.skip_block_comment();
                        continue;
                    }
                    _ => {}
                }
            }
            break;
        }
    }

    /// Skip a nestable block comment `/* ... */`. Unterminated comments
    /// produce a diagnostic; scanning resumes at end of input.
    fn skip_block_comment(&mut self) {
        let start = self.cursor.pos();
        self.cursor.advance(); // /
        self.cursor.advance(); // *
        let mut depth: u32 = 1;
        loop {
            match self.cursor.peek() {
                None => {
                    let span = self.span_from(start);
                    self.diagnostics
                        .push(Diagnostic::syntax("unterminated block comment", span));
                    return;
                }
                Some('/') if self.cursor.peek_next() == Some('*') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    depth += 1;
                }
                Some('*') if self.cursor.peek_next() == Some('/') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    // ── Operator lexing ────────────────────────────────────────────────

    /// `=` -> `Eq`, `==` -> `EqEq`, `=?` -> `EqQuestion`
    fn lex_eq(&mut self, start: Position) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('=') => self.single(TokenKind::EqEq, start),
            Some('?') => self.single(TokenKind::EqQuestion, start),
            _ => self.token(TokenKind::Eq, start),
        }
    }

    /// `!` -> `Bang`, `!=` -> `NotEq`
    fn lex_bang(&mut self, start: Position) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('=') {
            self.single(TokenKind::NotEq, start)
        } else {
            self.token(TokenKind::Bang, start)
        }
    }

    /// `<` -> `Lt`, `<=` -> `LtEq`, `<-` -> `LArrow`
    fn lex_lt(&mut self, start: Position) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('=') => self.single(TokenKind::LtEq, start),
            Some('-') => self.single(TokenKind::LArrow, start),
            _ => self.token(TokenKind::Lt, start),
        }
    }

    /// `>` -> `Gt`, `>=` -> `GtEq`
    fn lex_gt(&mut self, start: Position) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('=') {
            self.single(TokenKind::GtEq, start)
        } else {
            self.token(TokenKind::Gt, start)
        }
    }

    /// `&&` -> `AmpAmp`; a single `&` is not an operator in Rill.
    fn lex_amp(&mut self, start: Position) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('&') {
            self.single(TokenKind::AmpAmp, start)
        } else {
            self.error_token(start, "unexpected character: '&' (did you mean `&&`?)".into())
        }
    }

    /// `||` -> `PipePipe`, `|>` -> `PipeGt`, single `|` -> `Bar`
    fn lex_pipe(&mut self, start: Position) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('|') => self.single(TokenKind::PipePipe, start),
            Some('>') => self.single(TokenKind::PipeGt, start),
            _ => self.token(TokenKind::Bar, start),
        }
    }

    /// `+` -> `Plus`, `++` -> `PlusPlus`
    fn lex_plus(&mut self, start: Position) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('+') {
            self.single(TokenKind::PlusPlus, start)
        } else {
            self.token(TokenKind::Plus, start)
        }
    }

    /// `-` -> `Minus`, `->` -> `Arrow`
    fn lex_minus(&mut self, start: Position) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('>') {
            self.single(TokenKind::Arrow, start)
        } else {
            self.token(TokenKind::Minus, start)
        }
    }

    /// `*` -> `Star`, `**` -> `StarStar`
    fn lex_star(&mut self, start: Position) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('*') {
            self.single(TokenKind::StarStar, start)
        } else {
            self.token(TokenKind::Star, start)
        }
    }

    /// `:` -> `Colon`, `::` -> `ColonColon`
    fn lex_colon(&mut self, start: Position) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some(':') {
            self.single(TokenKind::ColonColon, start)
        } else {
            self.token(TokenKind::Colon, start)
        }
    }

    /// `.` -> `Dot`, `..` -> `DotDot`, `..=` -> `DotDotEq`,
    /// `.` followed by a digit -> float literal.
    fn lex_dot(&mut self, start: Position) -> Token {
        if self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            return self.lex_number(start);
        }
        self.cursor.advance();
        if self.cursor.peek() == Some('.') {
            self.cursor.advance();
            if self.cursor.peek() == Some('=') {
                self.single(TokenKind::DotDotEq, start)
            } else {
                self.token(TokenKind::DotDot, start)
            }
        } else {
            self.token(TokenKind::Dot, start)
        }
    }

    /// `ℤ` -> `Int`; `ℤ32`/`ℤ64` -> the type names `Int32`/`Int64`,
    /// which the type checker resolves back to `Int`.
    fn lex_double_struck_int(&mut self, start: Position) -> Token {
        self.cursor.advance();
        let width = match (self.cursor.peek(), self.cursor.peek_next()) {
            (Some('3'), Some('2')) => Some("32"),
            (Some('6'), Some('4')) => Some("64"),
            _ => None,
        };
        if let Some(width) = width {
            self.cursor.advance();
            self.cursor.advance();
            return Token::with_value(
                TokenKind::TypeIdent,
                self.span_from(start),
                TokenValue::Ident(format!("Int{width}")),
            );
        }
        self.token(TokenKind::TyInt, start)
    }

    // ── Number literals ────────────────────────────────────────────────

    /// Lex a number literal: decimal (int or float), `0x` hex, `0b` binary.
    ///
    /// Underscore separators are stripped. Integer values are normalized
    /// to canonical decimal digit strings regardless of source radix, so
    /// arbitrary-precision values survive. A `.` is only a decimal point
    /// when it sits between digits (or starts the literal, `.5`); `..`
    /// always terminates the integer part.
    fn lex_number(&mut self, start: Position) -> Token {
        let first = self.cursor.peek().unwrap_or('0');

        if first == '0' {
            match self.cursor.peek_next() {
                Some('x' | 'X') => return self.lex_radix(start, 16),
                Some('b' | 'B') => return self.lex_radix(start, 2),
                _ => {}
            }
        }

        let mut text = String::new();
        if first == '.' {
            // Leading-dot float: `.5`
            text.push('0');
        } else {
            self.eat_digits_into(&mut text);
        }

        let mut is_float = false;

        if self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.cursor.advance(); // '.'
            text.push('.');
            self.eat_digits_into(&mut text);
        }

        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            is_float = true;
            text.push('e');
            self.cursor.advance();
            if matches!(self.cursor.peek(), Some('+' | '-')) {
                text.push(self.cursor.advance().unwrap());
            }
            self.eat_digits_into(&mut text);
        }

        if is_float {
            let value = match text.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    return self.error_token(start, format!("invalid number literal: {text}"));
                }
            };
            return Token::with_value(
                TokenKind::Float,
                self.span_from(start),
                TokenValue::Float(value),
            );
        }

        let width = self.lex_width_suffix();
        Token::with_value(
            TokenKind::Int,
            self.span_from(start),
            TokenValue::Int { digits: canonical_decimal(&text), width },
        )
    }

    /// Lex hex or binary digits after `0x`/`0b`.
    fn lex_radix(&mut self, start: Position, radix: u32) -> Token {
        self.cursor.advance(); // 0
        self.cursor.advance(); // x or b
        let mut text = String::new();
        while let Some(c) = self.cursor.peek() {
            if c == '_' {
                self.cursor.advance();
            } else if c.is_digit(radix) {
                text.push(c);
                self.cursor.advance();
            } else {
                break;
            }
        }
        if text.is_empty() {
            return self.error_token(start, "invalid number literal: missing digits".into());
        }
        let width = self.lex_width_suffix();
        Token::with_value(
            TokenKind::Int,
            self.span_from(start),
            TokenValue::Int { digits: decimal_from_radix(&text, radix), width },
        )
    }

    /// Consume an optional `i32`/`i64` width suffix.
    ///
    /// The suffix must not be followed by another identifier character,
    /// so `42i32x` leaves `i32x` as a separate (erroneous) identifier.
    fn lex_width_suffix(&mut self) -> Option<IntWidth> {
        if self.cursor.peek() != Some('i') {
            return None;
        }
        if self.cursor.peek_nth(3).is_some_and(is_ident_continue) {
            return None;
        }
        let width = match (self.cursor.peek_nth(1), self.cursor.peek_nth(2)) {
            (Some('3'), Some('2')) => IntWidth::I32,
            (Some('6'), Some('4')) => IntWidth::I64,
            _ => return None,
        };
        self.cursor.advance();
        self.cursor.advance();
        self.cursor.advance();
        Some(width)
    }

    fn eat_digits_into(&mut self, text: &mut String) {
        while let Some(c) = self.cursor.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.cursor.advance();
            } else if c == '_' {
                self.cursor.advance();
            } else {
                break;
            }
        }
    }

    // ── String literals ────────────────────────────────────────────────

    /// Lex a `"..."` or `"""..."""` string literal.
    fn lex_string(&mut self, start: Position) -> Token {
        self.cursor.advance(); // first '"'
        if self.cursor.peek() == Some('"') && self.cursor.peek_next() == Some('"') {
            self.cursor.advance();
            self.cursor.advance();
            return self.lex_triple_string(start);
        }
        let mut content = String::new();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    return self.error_token(start, "unterminated string literal".into());
                }
                Some('"') => {
                    self.cursor.advance();
                    return Token::with_value(
                        TokenKind::Str,
                        self.span_from(start),
                        TokenValue::Str(content),
                    );
                }
                Some('\\') => {
                    let esc_start = self.cursor.pos();
                    self.cursor.advance();
                    match self.cursor.advance() {
                        Some(c) => match escape_char(c) {
                            Some(e) => content.push(e),
                            None => {
                                let span = self.span_from(esc_start);
                                self.diagnostics.push(Diagnostic::syntax(
                                    format!("invalid escape sequence: \\{c}"),
                                    span,
                                ));
                                content.push('\\');
                                content.push(c);
                            }
                        },
                        None => {
                            return self
                                .error_token(start, "unterminated string literal".into());
                        }
                    }
                }
                Some(c) => {
                    content.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    /// Lex the body of a triple-quoted string (opening `"""` consumed).
    ///
    /// Newline-tolerant; a newline immediately after the opening quotes is
    /// discarded; invalid escapes are kept literally.
    fn lex_triple_string(&mut self, start: Position) -> Token {
        let mut content = String::new();
        if self.cursor.peek() == Some('\r') {
            self.cursor.advance();
        }
        if self.cursor.peek() == Some('\n') {
            self.cursor.advance();
        }
        loop {
            match self.cursor.peek() {
                None => {
                    return self.error_token(start, "unterminated string literal".into());
                }
                Some('"') => {
                    // Closing requires three quotes in a row.
                    if self.cursor.peek_next() == Some('"') {
                        let quote_off = self.cursor.offset();
                        self.cursor.advance();
                        self.cursor.advance();
                        if self.cursor.peek() == Some('"') {
                            self.cursor.advance();
                            return Token::with_value(
                                TokenKind::Str,
                                self.span_from(start),
                                TokenValue::Str(content),
                            );
                        }
                        // Two quotes are content.
                        content.push_str(self.cursor.slice(quote_off, quote_off + 2));
                    } else {
                        content.push('"');
                        self.cursor.advance();
                    }
                }
                Some('\\') => {
                    self.cursor.advance();
                    match self.cursor.advance() {
                        Some(c) => match escape_char(c) {
                            Some(e) => content.push(e),
                            None => {
                                content.push('\\');
                                content.push(c);
                            }
                        },
                        None => {
                            return self
                                .error_token(start, "unterminated string literal".into());
                        }
                    }
                }
                Some(c) => {
                    content.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    /// Lex a template string in backticks.
    ///
    /// `${...}` interpolations are preserved textually, matching nested
    /// braces, so a later pass (or the back-end) can split them.
    fn lex_template(&mut self, start: Position) -> Token {
        self.cursor.advance(); // '`'
        let mut content = String::new();
        loop {
            match self.cursor.peek() {
                None => {
                    return self.error_token(start, "unterminated template string".into());
                }
                Some('`') => {
                    self.cursor.advance();
                    return Token::with_value(
                        TokenKind::TemplateStr,
                        self.span_from(start),
                        TokenValue::Str(content),
                    );
                }
                Some('\\') => {
                    self.cursor.advance();
                    match self.cursor.advance() {
                        Some(c) => match escape_char(c) {
                            Some(e) => content.push(e),
                            None => {
                                content.push('\\');
                                content.push(c);
                            }
                        },
                        None => {
                            return self
                                .error_token(start, "unterminated template string".into());
                        }
                    }
                }
                Some('$') if self.cursor.peek_next() == Some('{') => {
                    content.push('$');
                    content.push('{');
                    self.cursor.advance();
                    self.cursor.advance();
                    let mut depth: u32 = 1;
                    loop {
                        match self.cursor.peek() {
                            None => {
                                return self.error_token(
                                    start,
                                    "unterminated template string".into(),
                                );
                            }
                            Some('{') => {
                                depth += 1;
                                content.push('{');
                                self.cursor.advance();
                            }
                            Some('}') => {
                                depth -= 1;
                                content.push('}');
                                self.cursor.advance();
                                if depth == 0 {
                                    break;
                                }
                            }
                            Some(c) => {
                                content.push(c);
                                self.cursor.advance();
                            }
                        }
                    }
                }
                Some(c) => {
                    content.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    // ── Identifiers and keywords ───────────────────────────────────────

    /// Lex an identifier, keyword, type identifier, or built-in type name.
    fn lex_ident(&mut self, start: Position) -> Token {
        let first = self.cursor.peek().unwrap();
        self.cursor.advance();
        self.cursor.eat_while(is_ident_continue);
        let text = self
            .cursor
            .slice(start.offset, self.cursor.offset())
            .to_string();

        if first.is_uppercase() {
            if let Some(kind) = builtin_type_from_str(&text) {
                return self.token(kind, start);
            }
            return Token::with_value(
                TokenKind::TypeIdent,
                self.span_from(start),
                TokenValue::Ident(text),
            );
        }

        if let Some(kind) = keyword_from_str(&text) {
            return self.token(kind, start);
        }
        Token::with_value(
            TokenKind::Ident,
            self.span_from(start),
            TokenValue::Ident(text),
        )
    }
}

/// Whether a character can start an identifier.
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Whether a character can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Resolve a recognized escape character, or `None` for invalid escapes.
fn escape_char(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '\\' => Some('\\'),
        '"' => Some('"'),
        '\'' => Some('\''),
        '0' => Some('\0'),
        '`' => Some('`'),
        '$' => Some('$'),
        _ => None,
    }
}

/// Canonicalize a decimal digit string: strip leading zeros, keep one `0`.
fn canonical_decimal(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Convert digits in the given radix to a canonical decimal string.
///
/// Works digit-by-digit over a little-endian decimal accumulator, so the
/// value's precision is unbounded.
fn decimal_from_radix(digits: &str, radix: u32) -> String {
    let mut acc: Vec<u8> = vec![0];
    for ch in digits.chars() {
        let d = ch.to_digit(radix).expect("caller validated digits");
        let mut carry = d;
        for slot in acc.iter_mut() {
            let v = *slot as u32 * radix + carry;
            *slot = (v % 10) as u8;
            carry = v / 10;
        }
        while carry > 0 {
            acc.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    let mut out: String = acc.iter().rev().map(|d| (b'0' + d) as char).collect();
    let trimmed = out.trim_start_matches('0').len();
    if trimmed == 0 {
        out = "0".to_string();
    } else {
        out = out[out.len() - trimmed..].to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize("test.rill", source).0.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_simple_let() {
        assert_eq!(
            kinds("let x = 42"),
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Int,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_unicode_operators_match_ascii() {
        assert_eq!(kinds("a ≠ b"), kinds("a != b"));
        assert_eq!(kinds("a ≤ b"), kinds("a <= b"));
        assert_eq!(kinds("a ∧ b"), kinds("a && b"));
        assert_eq!(kinds("¬a"), kinds("!a"));
        assert_eq!(kinds("ƒ f() → ℤ"), kinds("fn f() -> Int"));
    }

    #[test]
    fn lex_double_struck_widths() {
        let (tokens, errs) = tokenize("t", "ℤ32 ℤ64 ℤ");
        assert!(errs.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::TypeIdent);
        assert_eq!(tokens[0].ident_text(), "Int32");
        assert_eq!(tokens[1].ident_text(), "Int64");
        assert_eq!(tokens[2].kind, TokenKind::TyInt);
    }

    #[test]
    fn lex_spans_carry_positions() {
        let (tokens, _) = tokenize("t", "let x\nlet y");
        // second `let` starts line 2, column 1, offset 6
        let p = tokens[2].span.start;
        assert_eq!((p.line, p.column, p.offset), (2, 1, 6));
    }

    #[test]
    fn lex_int_values() {
        let (tokens, errs) = tokenize("t", "42 1_000 0xFF 0b1010 7i32 9i64");
        assert!(errs.is_empty());
        let digit_strings: Vec<_> = tokens
            .iter()
            .filter_map(|t| match &t.value {
                Some(TokenValue::Int { digits, .. }) => Some(digits.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(digit_strings, vec!["42", "1000", "255", "10", "7", "9"]);
        assert!(matches!(
            tokens[4].value,
            Some(TokenValue::Int { width: Some(IntWidth::I32), .. })
        ));
        assert!(matches!(
            tokens[5].value,
            Some(TokenValue::Int { width: Some(IntWidth::I64), .. })
        ));
    }

    #[test]
    fn lex_big_hex_keeps_precision() {
        let (tokens, _) = tokenize("t", "0xFFFFFFFFFFFFFFFFFFFFFFFF");
        match &tokens[0].value {
            Some(TokenValue::Int { digits, .. }) => {
                assert_eq!(digits, "79228162514264337593543950335");
            }
            other => panic!("expected Int, got {other:?}"),
        }
    }

    #[test]
    fn lex_floats() {
        let (tokens, errs) = tokenize("t", "3.14 1e10 2.5e-3 .5");
        assert!(errs.is_empty());
        let values: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t.value {
                Some(TokenValue::Float(v)) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![3.14, 1e10, 2.5e-3, 0.5]);
    }

    #[test]
    fn dot_between_digits_vs_range() {
        assert_eq!(
            kinds("1..5"),
            vec![TokenKind::Int, TokenKind::DotDot, TokenKind::Int, TokenKind::Eof]
        );
        assert_eq!(
            kinds("1..=5"),
            vec![TokenKind::Int, TokenKind::DotDotEq, TokenKind::Int, TokenKind::Eof]
        );
        assert_eq!(kinds("1.5"), vec![TokenKind::Float, TokenKind::Eof]);
        assert_eq!(
            kinds("x.len"),
            vec![TokenKind::Ident, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn bar_is_distinct_from_pipes() {
        assert_eq!(
            kinds("x | y || z |> w"),
            vec![
                TokenKind::Ident,
                TokenKind::Bar,
                TokenKind::Ident,
                TokenKind::PipePipe,
                TokenKind::Ident,
                TokenKind::PipeGt,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_string_with_escapes() {
        let (tokens, errs) = tokenize("t", r#""a\nb\"c""#);
        assert!(errs.is_empty());
        assert_eq!(
            tokens[0].value,
            Some(TokenValue::Str("a\nb\"c".to_string()))
        );
    }

    #[test]
    fn lex_unterminated_string_recovers() {
        let (tokens, errs) = tokenize("t", "\"abc\nlet");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[1].kind, TokenKind::Let);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, "E0001");
    }

    #[test]
    fn lex_triple_string_discards_leading_newline() {
        let (tokens, errs) = tokenize("t", "\"\"\"\nline1\nline2\"\"\"");
        assert!(errs.is_empty());
        assert_eq!(
            tokens[0].value,
            Some(TokenValue::Str("line1\nline2".to_string()))
        );
    }

    #[test]
    fn lex_triple_string_keeps_invalid_escape() {
        let (tokens, errs) = tokenize("t", r#""""a\qb""""#);
        assert!(errs.is_empty());
        assert_eq!(tokens[0].value, Some(TokenValue::Str("a\\qb".to_string())));
    }

    #[test]
    fn lex_template_preserves_interpolation() {
        let (tokens, errs) = tokenize("t", "`x = ${compute({a: 1})} done`");
        assert!(errs.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::TemplateStr);
        assert_eq!(
            tokens[0].value,
            Some(TokenValue::Str("x = ${compute({a: 1})} done".to_string()))
        );
    }

    #[test]
    fn lex_nested_block_comment() {
        assert_eq!(
            kinds("/* outer /* inner */ still */ x"),
            vec![TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn lex_unterminated_block_comment_diagnoses() {
        let (tokens, errs) = tokenize("t", "/* open");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn lex_type_idents_and_builtins() {
        let (tokens, _) = tokenize("t", "Option Int Direction Bool");
        assert_eq!(tokens[0].kind, TokenKind::TypeIdent);
        assert_eq!(tokens[1].kind, TokenKind::TyInt);
        assert_eq!(tokens[2].kind, TokenKind::TypeIdent);
        assert_eq!(tokens[3].kind, TokenKind::TyBool);
    }

    #[test]
    fn lex_error_token_continues() {
        let (tokens, errs) = tokenize("t", "let @ x");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Let, TokenKind::Error, TokenKind::Ident, TokenKind::Eof]
        );
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn lex_eq_question_reserved() {
        assert_eq!(
            kinds("x =? y"),
            vec![TokenKind::Ident, TokenKind::EqQuestion, TokenKind::Ident, TokenKind::Eof]
        );
    }
}
