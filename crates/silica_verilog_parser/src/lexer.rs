//! Lexical analyzer for Verilog-2005 source text.
//!
//! Converts source text into a sequence of [`Token`]s: case-sensitive
//! keywords, identifiers, sized/based literals (resolved at lex time),
//! strings with C-style escapes, maximal-munch operators, attribute
//! instances `(* ... *)` as single tokens, and system identifiers.
//! Compiler directives (`` `timescale``, `` `define`` …) are discarded
//! without expansion. Escaped identifiers are not supported and produce an
//! error. Errors are reported to the [`DiagnosticSink`] and yield
//! [`VerilogToken::Error`] tokens; the stream always ends with `Eof`.

use crate::number;
use crate::token::{lookup_keyword, Token, VerilogToken};
use silica_diagnostics::code::{Category, DiagnosticCode};
use silica_diagnostics::{Diagnostic, DiagnosticSink};
use silica_source::{FileId, Span};

/// Lexes the given source text into a vector of tokens ending in `Eof`.
pub fn lex(source: &str, file: FileId, sink: &DiagnosticSink) -> Vec<Token> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        file,
        sink,
    };
    lexer.lex_all()
}

const L100: DiagnosticCode = DiagnosticCode::new(Category::Lex, 100);

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    file: FileId,
    sink: &'a DiagnosticSink,
}

impl Lexer<'_> {
    fn lex_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_comments_directives();
            if self.pos >= self.source.len() {
                tokens.push(Token::new(
                    VerilogToken::Eof,
                    Span::new(self.file, self.pos as u32, self.pos as u32),
                ));
                break;
            }
            tokens.push(self.next_token());
        }
        tokens
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let idx = self.pos + offset;
        if idx < self.source.len() {
            self.source[idx]
        } else {
            0
        }
    }

    fn advance(&mut self) -> u8 {
        let b = self.source[self.pos];
        self.pos += 1;
        b
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.file, start as u32, self.pos as u32)
    }

    fn error(&self, msg: impl Into<String>, span: Span) {
        self.sink.emit(Diagnostic::error(L100, msg, span));
    }

    fn skip_whitespace_comments_directives(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos >= self.source.len() {
                return;
            }
            // Line comment; a comment at EOF with no newline is legal.
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                self.pos += 2;
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            // Block comment (non-nesting).
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos >= self.source.len() {
                        self.error("unterminated block comment", self.span_from(start));
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.peek_at(1) == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            // Compiler directive: discard through end of line without
            // expansion. Spans are byte offsets, so line bookkeeping is
            // unaffected.
            if self.peek() == b'`' {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let b = self.peek();

        if is_ident_start(b) {
            return self.lex_identifier_or_keyword(start);
        }

        if b == b'\\' {
            // Escaped identifiers extend to the next whitespace; consume so
            // one error is reported instead of one per character.
            while self.pos < self.source.len() && !self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            self.error(
                "escaped identifiers are not supported",
                self.span_from(start),
            );
            return Token::new(VerilogToken::Error, self.span_from(start));
        }

        if b == b'$' {
            return self.lex_system_identifier(start);
        }

        if b.is_ascii_digit() {
            return self.lex_number(start);
        }

        // Unsized based literal: 'b1, 'hFF, 'sb1 (tick without digits before).
        if b == b'\'' {
            let next = self.peek_at(1).to_ascii_lowercase();
            if matches!(next, b'b' | b'o' | b'd' | b'h' | b's') {
                return self.lex_number(start);
            }
        }

        if b == b'"' {
            return self.lex_string(start);
        }

        // Attribute instance `(* ... *)` — but `(*)` is the sensitivity
        // wildcard, not an attribute.
        if b == b'(' && self.peek_at(1) == b'*' && self.peek_at(2) != b')' {
            return self.lex_attribute(start);
        }

        self.lex_operator(start)
    }

    fn lex_identifier_or_keyword(&mut self, start: usize) -> Token {
        while self.pos < self.source.len() && is_ident_char(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
        let kind = lookup_keyword(text).unwrap_or(VerilogToken::Identifier);
        Token::new(kind, self.span_from(start))
    }

    fn lex_system_identifier(&mut self, start: usize) -> Token {
        self.pos += 1; // $
        if self.pos < self.source.len() && is_ident_start(self.source[self.pos]) {
            while self.pos < self.source.len() && is_ident_char(self.source[self.pos]) {
                self.pos += 1;
            }
            Token::new(VerilogToken::SystemIdentifier, self.span_from(start))
        } else {
            self.error("expected identifier after '$'", self.span_from(start));
            Token::new(VerilogToken::Error, self.span_from(start))
        }
    }

    /// Consumes a number literal and resolves its value via
    /// [`number::parse_number`], so `{value, width, signed}` travels in the
    /// token.
    fn lex_number(&mut self, start: usize) -> Token {
        self.eat_decimal_digits();

        let mut is_real = false;
        if self.peek() == b'\'' {
            // Sized/based: optionally 's', then base letter, then digits.
            let mut offset = 1;
            if matches!(self.peek_at(1), b's' | b'S') {
                offset = 2;
            }
            if matches!(
                self.peek_at(offset).to_ascii_lowercase(),
                b'b' | b'o' | b'd' | b'h'
            ) {
                self.pos += offset + 1;
                self.eat_based_digits(self.source[start..self.pos].last().copied().unwrap_or(0));
            }
        } else {
            // Real: fraction and/or exponent.
            if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
                is_real = true;
                self.pos += 1;
                self.eat_decimal_digits();
            }
            if matches!(self.peek(), b'e' | b'E') {
                is_real = true;
                self.pos += 1;
                if matches!(self.peek(), b'+' | b'-') {
                    self.pos += 1;
                }
                self.eat_decimal_digits();
            }
        }

        let span = self.span_from(start);
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
        match number::parse_number(text) {
            Some(value) => {
                let kind = if is_real {
                    VerilogToken::RealNumber
                } else {
                    VerilogToken::Number
                };
                Token {
                    kind,
                    span,
                    number: Some(value),
                }
            }
            None => {
                self.error(format!("malformed number literal `{text}`"), span);
                Token::new(VerilogToken::Error, span)
            }
        }
    }

    fn eat_decimal_digits(&mut self) {
        while self.pos < self.source.len()
            && (self.source[self.pos].is_ascii_digit() || self.source[self.pos] == b'_')
        {
            self.pos += 1;
        }
    }

    fn eat_based_digits(&mut self, base: u8) {
        while self.pos < self.source.len() {
            let ch = self.source[self.pos].to_ascii_lowercase();
            let valid = match base.to_ascii_lowercase() {
                b'b' => matches!(ch, b'0' | b'1' | b'x' | b'z' | b'?' | b'_'),
                b'o' => matches!(ch, b'0'..=b'7' | b'x' | b'z' | b'?' | b'_'),
                b'd' => ch.is_ascii_digit() || ch == b'_',
                b'h' => ch.is_ascii_hexdigit() || matches!(ch, b'x' | b'z' | b'?' | b'_'),
                _ => false,
            };
            if valid {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self, start: usize) -> Token {
        self.pos += 1; // opening "
        loop {
            if self.pos >= self.source.len() || self.source[self.pos] == b'\n' {
                self.error("unterminated string literal", self.span_from(start));
                return Token::new(VerilogToken::Error, self.span_from(start));
            }
            match self.source[self.pos] {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return Token::new(VerilogToken::StringLiteral, self.span_from(start));
                }
                _ => self.pos += 1,
            }
        }
    }

    fn lex_attribute(&mut self, start: usize) -> Token {
        self.pos += 2; // (*
        loop {
            if self.pos >= self.source.len() {
                self.error("unterminated attribute", self.span_from(start));
                return Token::new(VerilogToken::Error, self.span_from(start));
            }
            if self.source[self.pos] == b'*' && self.peek_at(1) == b')' {
                self.pos += 2;
                return Token::new(VerilogToken::Attribute, self.span_from(start));
            }
            self.pos += 1;
        }
    }

    fn lex_operator(&mut self, start: usize) -> Token {
        let b = self.advance();
        let kind = match b {
            b'(' => VerilogToken::LeftParen,
            b')' => VerilogToken::RightParen,
            b'[' => VerilogToken::LeftBracket,
            b']' => VerilogToken::RightBracket,
            b'{' => VerilogToken::LeftBrace,
            b'}' => VerilogToken::RightBrace,
            b',' => VerilogToken::Comma,
            b';' => VerilogToken::Semicolon,
            b':' => VerilogToken::Colon,
            b'.' => VerilogToken::Dot,
            b'#' => VerilogToken::Hash,
            b'@' => VerilogToken::At,
            b'?' => VerilogToken::Question,
            b'=' => {
                if self.peek() == b'=' {
                    self.pos += 1;
                    if self.peek() == b'=' {
                        self.pos += 1;
                        VerilogToken::TripleEquals
                    } else {
                        VerilogToken::DoubleEquals
                    }
                } else {
                    VerilogToken::Equals
                }
            }
            b'!' => {
                if self.peek() == b'=' {
                    self.pos += 1;
                    if self.peek() == b'=' {
                        self.pos += 1;
                        VerilogToken::BangDoubleEquals
                    } else {
                        VerilogToken::BangEquals
                    }
                } else {
                    VerilogToken::Bang
                }
            }
            b'<' => {
                if self.peek() == b'=' {
                    self.pos += 1;
                    VerilogToken::LessEquals
                } else if self.peek() == b'<' {
                    self.pos += 1;
                    if self.peek() == b'<' {
                        self.pos += 1;
                        VerilogToken::TripleLess
                    } else {
                        VerilogToken::DoubleLess
                    }
                } else {
                    VerilogToken::LessThan
                }
            }
            b'>' => {
                if self.peek() == b'=' {
                    self.pos += 1;
                    VerilogToken::GreaterEquals
                } else if self.peek() == b'>' {
                    self.pos += 1;
                    if self.peek() == b'>' {
                        self.pos += 1;
                        VerilogToken::TripleGreater
                    } else {
                        VerilogToken::DoubleGreater
                    }
                } else {
                    VerilogToken::GreaterThan
                }
            }
            b'+' => {
                if self.peek() == b':' {
                    self.pos += 1;
                    VerilogToken::PlusColon
                } else {
                    VerilogToken::Plus
                }
            }
            b'-' => {
                if self.peek() == b':' {
                    self.pos += 1;
                    VerilogToken::MinusColon
                } else if self.peek() == b'>' {
                    self.pos += 1;
                    VerilogToken::Arrow
                } else {
                    VerilogToken::Minus
                }
            }
            b'*' => {
                if self.peek() == b'*' {
                    self.pos += 1;
                    VerilogToken::DoubleStar
                } else {
                    VerilogToken::Star
                }
            }
            b'/' => VerilogToken::Slash,
            b'%' => VerilogToken::Percent,
            b'&' => {
                if self.peek() == b'&' {
                    self.pos += 1;
                    VerilogToken::DoubleAmpersand
                } else {
                    VerilogToken::Ampersand
                }
            }
            b'|' => {
                if self.peek() == b'|' {
                    self.pos += 1;
                    VerilogToken::DoublePipe
                } else {
                    VerilogToken::Pipe
                }
            }
            b'^' => {
                if self.peek() == b'~' {
                    self.pos += 1;
                    VerilogToken::TildeCaret
                } else {
                    VerilogToken::Caret
                }
            }
            b'~' => {
                if self.peek() == b'^' {
                    self.pos += 1;
                    VerilogToken::TildeCaret
                } else if self.peek() == b'&' {
                    self.pos += 1;
                    VerilogToken::TildeAmpersand
                } else if self.peek() == b'|' {
                    self.pos += 1;
                    VerilogToken::TildePipe
                } else {
                    VerilogToken::Tilde
                }
            }
            _ => {
                self.error(
                    format!("unrecognized character '{}'", b as char),
                    self.span_from(start),
                );
                VerilogToken::Error
            }
        };
        Token::new(kind, self.span_from(start))
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::NumberValue;

    fn lex_ok(source: &str) -> Vec<Token> {
        let sink = DiagnosticSink::new();
        let tokens = lex(source, FileId::from_raw(0), &sink);
        assert!(
            !sink.has_errors(),
            "unexpected errors: {:?}",
            sink.diagnostics()
        );
        tokens
    }

    fn lex_with_errors(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let sink = DiagnosticSink::new();
        let tokens = lex(source, FileId::from_raw(0), &sink);
        (tokens, sink.take_all())
    }

    fn kinds(tokens: &[Token]) -> Vec<VerilogToken> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input() {
        assert_eq!(kinds(&lex_ok("")), vec![VerilogToken::Eof]);
        assert_eq!(kinds(&lex_ok("  \t\n  ")), vec![VerilogToken::Eof]);
    }

    #[test]
    fn keywords_case_sensitive() {
        let tokens = lex_ok("module Module MODULE");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Module,
                VerilogToken::Identifier,
                VerilogToken::Identifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn identifiers_with_dollar() {
        let tokens = lex_ok("my_signal data$q _tmp0");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Identifier,
                VerilogToken::Identifier,
                VerilogToken::Identifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn system_identifiers() {
        let tokens = lex_ok("$display $clog2");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::SystemIdentifier,
                VerilogToken::SystemIdentifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn sized_literal_resolved_in_token() {
        let tokens = lex_ok("8'hFF");
        assert_eq!(tokens[0].kind, VerilogToken::Number);
        assert_eq!(
            tokens[0].number,
            Some(NumberValue::Int {
                value: 255,
                width: 8,
                signed: false,
                sized: true
            })
        );
    }

    #[test]
    fn number_forms() {
        let tokens = lex_ok("42 4'b1010 8'o77 32'd255 'hFF 8'sb1010_1010 4'bxx0z");
        let k = kinds(&tokens);
        assert!(k[..7].iter().all(|&t| t == VerilogToken::Number));
        assert_eq!(tokens[0].number.unwrap().as_int(), Some(42));
        assert_eq!(tokens[1].number.unwrap().as_int(), Some(0b1010));
        assert_eq!(tokens[6].number.unwrap().as_int(), Some(0b0000));
    }

    #[test]
    fn real_literals() {
        let tokens = lex_ok("1.5 1.0e3 2.5E-2 1e3");
        assert!(kinds(&tokens)[..4]
            .iter()
            .all(|&t| t == VerilogToken::RealNumber));
        assert_eq!(tokens[0].number, Some(NumberValue::Real(1.5)));
        assert_eq!(tokens[3].number, Some(NumberValue::Real(1000.0)));
    }

    #[test]
    fn string_literal_with_escapes() {
        let tokens = lex_ok("\"say \\\"hi\\\"\\n\"");
        assert_eq!(
            kinds(&tokens),
            vec![VerilogToken::StringLiteral, VerilogToken::Eof]
        );
    }

    #[test]
    fn maximal_munch_operators() {
        let tokens = lex_ok("<<< >>> === !== << >> == != <= >= && || +: -: -> ** ~& ~| ~^");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::TripleLess,
                VerilogToken::TripleGreater,
                VerilogToken::TripleEquals,
                VerilogToken::BangDoubleEquals,
                VerilogToken::DoubleLess,
                VerilogToken::DoubleGreater,
                VerilogToken::DoubleEquals,
                VerilogToken::BangEquals,
                VerilogToken::LessEquals,
                VerilogToken::GreaterEquals,
                VerilogToken::DoubleAmpersand,
                VerilogToken::DoublePipe,
                VerilogToken::PlusColon,
                VerilogToken::MinusColon,
                VerilogToken::Arrow,
                VerilogToken::DoubleStar,
                VerilogToken::TildeAmpersand,
                VerilogToken::TildePipe,
                VerilogToken::TildeCaret,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn comments_discarded() {
        let tokens = lex_ok("wire // c\nclk /* block\ncomment */ rst");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::Wire,
                VerilogToken::Identifier,
                VerilogToken::Identifier,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn line_comment_at_eof_without_newline() {
        let tokens = lex_ok("wire a // trailing");
        assert_eq!(tokens.last().unwrap().kind, VerilogToken::Eof);
    }

    #[test]
    fn directives_discarded_silently() {
        let tokens = lex_ok("`timescale 1ns/1ps\n`define FOO 1\nmodule top;");
        assert_eq!(kinds(&tokens)[0], VerilogToken::Module);
    }

    #[test]
    fn directive_preserves_line_positions() {
        let sink = DiagnosticSink::new();
        let src = "`timescale 1ns/1ps\nmodule";
        let tokens = lex(src, FileId::from_raw(0), &sink);
        // `module` starts on line 2 at byte 19.
        assert_eq!(tokens[0].span.start, 19);
    }

    #[test]
    fn attribute_single_token() {
        let tokens = lex_ok("(* keep = \"true\" *) wire a;");
        assert_eq!(tokens[0].kind, VerilogToken::Attribute);
        assert_eq!(tokens[1].kind, VerilogToken::Wire);
    }

    #[test]
    fn sensitivity_star_is_not_attribute() {
        let tokens = lex_ok("@(*)");
        assert_eq!(
            kinds(&tokens),
            vec![
                VerilogToken::At,
                VerilogToken::LeftParen,
                VerilogToken::Star,
                VerilogToken::RightParen,
                VerilogToken::Eof,
            ]
        );
    }

    #[test]
    fn escaped_identifier_rejected() {
        let (tokens, errors) = lex_with_errors("\\my+sig ");
        assert!(tokens.iter().any(|t| t.kind == VerilogToken::Error));
        assert!(errors[0].message.contains("escaped identifiers"));
    }

    #[test]
    fn unterminated_string_error() {
        let (tokens, errors) = lex_with_errors("\"oops\n");
        assert!(tokens.iter().any(|t| t.kind == VerilogToken::Error));
        assert!(!errors.is_empty());
    }

    #[test]
    fn unterminated_block_comment_error() {
        let (tokens, errors) = lex_with_errors("/* oops");
        assert_eq!(tokens.last().unwrap().kind, VerilogToken::Eof);
        assert!(!errors.is_empty());
    }

    #[test]
    fn unrecognized_char_error() {
        let (tokens, errors) = lex_with_errors("§");
        assert!(tokens.iter().any(|t| t.kind == VerilogToken::Error));
        assert!(!errors.is_empty());
    }

    #[test]
    fn spans_point_at_first_byte() {
        let tokens = lex_ok("module top");
        assert_eq!((tokens[0].span.start, tokens[0].span.end), (0, 6));
        assert_eq!((tokens[1].span.start, tokens[1].span.end), (7, 10));
    }
}
