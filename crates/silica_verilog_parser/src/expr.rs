//! Pratt expression parser for Verilog-2005.
//!
//! Operator precedence follows IEEE 1364-2005 Table 5-4:
//!
//! | BP (L,R) | Operators |
//! |----------|-----------|
//! | (1,2)    | `\|\|` |
//! | (3,4)    | `&&` |
//! | (5,6)    | `\|` |
//! | (7,8)    | `^` `~^` `^~` |
//! | (9,10)   | `&` |
//! | (11,12)  | `==` `!=` `===` `!==` |
//! | (13,14)  | `<` `<=` `>` `>=` |
//! | (15,16)  | `<<` `>>` `<<<` `>>>` |
//! | (17,18)  | `+` `-` |
//! | (19,20)  | `*` `/` `%` |
//! | (22,21)  | `**` (right-associative) |
//! | prefix 23 | `+` `-` `!` `~` `&` `~&` `\|` `~\|` `^` `~^` |
//!
//! Ternary `? :` is handled at min_bp = 0 and is right-associative. `<=` is
//! a comparison here; the statement parser never reaches this code for a
//! non-blocking assignment's LHS.

use crate::ast::*;
use crate::number::NumberValue;
use crate::parser::VerilogParser;
use crate::token::VerilogToken;

/// Binding powers `(left, right)` for a binary operator.
fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::LogOr => (1, 2),
        BinaryOp::LogAnd => (3, 4),
        BinaryOp::BitOr => (5, 6),
        BinaryOp::BitXor | BinaryOp::BitXnor => (7, 8),
        BinaryOp::BitAnd => (9, 10),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::CaseEq | BinaryOp::CaseNe => (11, 12),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => (13, 14),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::AShl | BinaryOp::AShr => (15, 16),
        BinaryOp::Add | BinaryOp::Sub => (17, 18),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (19, 20),
        BinaryOp::Pow => (22, 21),
    }
}

impl VerilogParser<'_> {
    /// Parses an expression.
    pub fn parse_expr(&mut self) -> Expr {
        self.parse_expr_bp(0)
    }

    pub(crate) fn parse_expr_bp(&mut self, min_bp: u8) -> Expr {
        let mut lhs = self.parse_prefix_expr();

        loop {
            if self.at_eof() {
                break;
            }

            if self.at(VerilogToken::Question) && min_bp == 0 {
                let op_span = self.current_span();
                self.advance();
                let then_expr = self.parse_expr_bp(0);
                self.expect(VerilogToken::Colon);
                let else_expr = self.parse_expr_bp(0); // right-associative
                let span = lhs.span().merge(else_expr.span()).merge(op_span);
                lhs = Expr::Ternary {
                    condition: Box::new(lhs),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                    span,
                };
                continue;
            }

            if self.at(VerilogToken::LeftBracket) {
                lhs = self.parse_postfix_index(lhs);
                continue;
            }

            if self.at(VerilogToken::Dot) {
                lhs = self.parse_dot_suffix(lhs);
                continue;
            }

            let op = match self.current_as_binary_op() {
                Some(op) => op,
                None => break,
            };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.advance();

            let rhs = self.parse_expr_bp(r_bp);
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        lhs
    }

    fn parse_prefix_expr(&mut self) -> Expr {
        let start = self.current_span();

        if let Some(op) = self.current_as_unary_op() {
            self.advance();
            let operand = self.parse_expr_bp(23);
            let span = start.merge(operand.span());
            return Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            };
        }

        match self.current() {
            VerilogToken::Number => {
                let token = *self.current_token();
                let raw = self.current_text().to_string();
                self.advance();
                match token.number {
                    Some(NumberValue::Int {
                        value,
                        width,
                        signed,
                        ..
                    }) => Expr::Number {
                        value,
                        width,
                        signed,
                        raw,
                        span: token.span,
                    },
                    _ => Expr::Error(token.span),
                }
            }
            VerilogToken::RealNumber => {
                let token = *self.current_token();
                let raw = self.current_text().to_string();
                self.advance();
                match token.number {
                    Some(NumberValue::Real(value)) => Expr::RealNumber {
                        value,
                        raw,
                        span: token.span,
                    },
                    _ => Expr::Error(token.span),
                }
            }
            VerilogToken::StringLiteral => {
                let span = self.current_span();
                let value = unescape_string(self.current_text());
                self.advance();
                Expr::StringLiteral { value, span }
            }
            // Parentheses group but leave no node behind; the printer
            // re-derives them from precedence.
            VerilogToken::LeftParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(VerilogToken::RightParen);
                inner
            }
            VerilogToken::LeftBrace => self.parse_concat_or_replication(),
            VerilogToken::SystemIdentifier => {
                let name = self.interner.intern(self.current_text());
                self.advance();
                let args = if self.at(VerilogToken::LeftParen) {
                    self.parse_call_args()
                } else {
                    Vec::new()
                };
                let span = start.merge(self.prev_span());
                Expr::SystemCall { name, args, span }
            }
            VerilogToken::Identifier => {
                let name = self.expect_ident();
                if self.at(VerilogToken::LeftParen) {
                    let args = self.parse_call_args();
                    let span = start.merge(self.prev_span());
                    Expr::FunctionCall { name, args, span }
                } else {
                    Expr::Identifier { name, span: start }
                }
            }
            _ => {
                let span = self.current_span();
                self.expected("expression");
                self.advance();
                Expr::Error(span)
            }
        }
    }

    /// Parses `{a, b}` or `{n{a, b}}`.
    pub(crate) fn parse_concat_or_replication(&mut self) -> Expr {
        let start = self.current_span();
        self.expect(VerilogToken::LeftBrace);

        if self.at(VerilogToken::RightBrace) {
            self.advance();
            self.error("empty concatenation");
            return Expr::Error(start);
        }

        let first = self.parse_expr();

        // {count{…}} — a second opening brace right after the first
        // expression marks a replication.
        if self.at(VerilogToken::LeftBrace) {
            self.advance();
            let mut parts = vec![self.parse_expr()];
            while self.eat(VerilogToken::Comma) {
                parts.push(self.parse_expr());
            }
            self.expect(VerilogToken::RightBrace);
            self.expect(VerilogToken::RightBrace);
            let span = start.merge(self.prev_span());
            return Expr::Replication {
                count: Box::new(first),
                parts,
                span,
            };
        }

        let mut parts = vec![first];
        while self.eat(VerilogToken::Comma) {
            parts.push(self.parse_expr());
        }
        self.expect(VerilogToken::RightBrace);
        let span = start.merge(self.prev_span());
        Expr::Concat { parts, span }
    }

    /// Parses a postfix select: `expr[i]`, `expr[m:l]`, `expr[i+:w]`,
    /// `expr[i-:w]`. The `+:`/`-:` pairs arrive as single tokens from the
    /// lexer, so the index expression parses with the full grammar.
    pub(crate) fn parse_postfix_index(&mut self, base: Expr) -> Expr {
        let start = base.span();
        self.expect(VerilogToken::LeftBracket);
        let first = self.parse_expr();

        match self.current() {
            VerilogToken::Colon => {
                self.advance();
                let lsb = self.parse_expr();
                self.expect(VerilogToken::RightBracket);
                Expr::RangeSelect {
                    base: Box::new(base),
                    msb: Box::new(first),
                    lsb: Box::new(lsb),
                    span: start.merge(self.prev_span()),
                }
            }
            VerilogToken::PlusColon | VerilogToken::MinusColon => {
                let ascending = self.at(VerilogToken::PlusColon);
                self.advance();
                let width = self.parse_expr();
                self.expect(VerilogToken::RightBracket);
                Expr::PartSelect {
                    base: Box::new(base),
                    index: Box::new(first),
                    ascending,
                    width: Box::new(width),
                    span: start.merge(self.prev_span()),
                }
            }
            _ => {
                self.expect(VerilogToken::RightBracket);
                Expr::Index {
                    base: Box::new(base),
                    index: Box::new(first),
                    span: start.merge(self.prev_span()),
                }
            }
        }
    }

    /// Extends an identifier with `.part` suffixes into a hierarchical name.
    pub(crate) fn parse_dot_suffix(&mut self, base: Expr) -> Expr {
        let start = base.span();
        let mut parts = match base {
            Expr::Identifier { name, .. } => vec![name],
            Expr::HierarchicalName { parts, .. } => parts,
            other => {
                self.error("'.' selection requires a name on the left");
                self.advance();
                let _ = self.expect_ident();
                return other;
            }
        };

        while self.eat(VerilogToken::Dot) {
            parts.push(self.expect_ident());
        }

        let span = start.merge(self.prev_span());
        Expr::HierarchicalName { parts, span }
    }

    /// Parses `( expr {, expr} )`.
    pub(crate) fn parse_call_args(&mut self) -> Vec<Expr> {
        self.expect(VerilogToken::LeftParen);
        let mut args = Vec::new();
        if !self.at(VerilogToken::RightParen) {
            args.push(self.parse_expr());
            while self.eat(VerilogToken::Comma) {
                args.push(self.parse_expr());
            }
        }
        self.expect(VerilogToken::RightParen);
        args
    }

    fn current_as_binary_op(&self) -> Option<BinaryOp> {
        match self.current() {
            VerilogToken::DoublePipe => Some(BinaryOp::LogOr),
            VerilogToken::DoubleAmpersand => Some(BinaryOp::LogAnd),
            VerilogToken::Pipe => Some(BinaryOp::BitOr),
            VerilogToken::Caret => Some(BinaryOp::BitXor),
            VerilogToken::TildeCaret => Some(BinaryOp::BitXnor),
            VerilogToken::Ampersand => Some(BinaryOp::BitAnd),
            VerilogToken::DoubleEquals => Some(BinaryOp::Eq),
            VerilogToken::BangEquals => Some(BinaryOp::Ne),
            VerilogToken::TripleEquals => Some(BinaryOp::CaseEq),
            VerilogToken::BangDoubleEquals => Some(BinaryOp::CaseNe),
            VerilogToken::LessThan => Some(BinaryOp::Lt),
            VerilogToken::LessEquals => Some(BinaryOp::Le),
            VerilogToken::GreaterThan => Some(BinaryOp::Gt),
            VerilogToken::GreaterEquals => Some(BinaryOp::Ge),
            VerilogToken::DoubleLess => Some(BinaryOp::Shl),
            VerilogToken::DoubleGreater => Some(BinaryOp::Shr),
            VerilogToken::TripleLess => Some(BinaryOp::AShl),
            VerilogToken::TripleGreater => Some(BinaryOp::AShr),
            VerilogToken::Plus => Some(BinaryOp::Add),
            VerilogToken::Minus => Some(BinaryOp::Sub),
            VerilogToken::Star => Some(BinaryOp::Mul),
            VerilogToken::Slash => Some(BinaryOp::Div),
            VerilogToken::Percent => Some(BinaryOp::Mod),
            VerilogToken::DoubleStar => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    fn current_as_unary_op(&self) -> Option<UnaryOp> {
        match self.current() {
            VerilogToken::Plus => Some(UnaryOp::Plus),
            VerilogToken::Minus => Some(UnaryOp::Minus),
            VerilogToken::Bang => Some(UnaryOp::LogNot),
            VerilogToken::Tilde => Some(UnaryOp::BitNot),
            VerilogToken::Ampersand => Some(UnaryOp::RedAnd),
            VerilogToken::TildeAmpersand => Some(UnaryOp::RedNand),
            VerilogToken::Pipe => Some(UnaryOp::RedOr),
            VerilogToken::TildePipe => Some(UnaryOp::RedNor),
            VerilogToken::Caret => Some(UnaryOp::RedXor),
            VerilogToken::TildeCaret => Some(UnaryOp::RedXnor),
            _ => None,
        }
    }
}

/// Resolves the C-style escapes the lexer accepted inside a string token.
fn unescape_string(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    out
}
