//! Statement parsing for Verilog-2005.
//!
//! Covers blocking and non-blocking assignments, `if`/`case`/`for`/`while`/
//! `repeat`/`forever`/`wait`, event and delay control, begin/end blocks,
//! task and system task calls, event triggers, and `disable`.
//!
//! **`<=` disambiguation:** the LHS of a statement is parsed as an lvalue
//! (name, selects, or concatenation) without entering the Pratt parser, so a
//! following `<=` reads as non-blocking assignment. Inside conditions the
//! Pratt parser owns `<=` and it reads as a comparison.

use crate::ast::*;
use crate::parser::VerilogParser;
use crate::token::VerilogToken;

impl VerilogParser<'_> {
    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Statement {
        // Attributes may precede a statement; they bind to it but carry no
        // synthesis meaning here, so the payloads are dropped.
        let _ = self.collect_attrs();

        match self.current() {
            VerilogToken::Begin => self.parse_block(),
            VerilogToken::If => self.parse_if(),
            VerilogToken::Case | VerilogToken::Casex | VerilogToken::Casez => self.parse_case(),
            VerilogToken::For => self.parse_for(),
            VerilogToken::While => self.parse_while(),
            VerilogToken::Forever => self.parse_forever(),
            VerilogToken::Repeat => self.parse_repeat(),
            VerilogToken::Wait => self.parse_wait(),
            VerilogToken::At => self.parse_event_control(),
            VerilogToken::Hash => self.parse_delay(),
            VerilogToken::Arrow => self.parse_event_trigger(),
            VerilogToken::Disable => self.parse_disable(),
            VerilogToken::SystemIdentifier => self.parse_system_task_call(),
            VerilogToken::Semicolon => {
                let span = self.current_span();
                self.advance();
                Statement::Null { span }
            }
            VerilogToken::Identifier | VerilogToken::LeftBrace => {
                self.parse_assignment_or_task_call()
            }
            _ => {
                let span = self.current_span();
                self.expected("statement");
                self.recover_to_semicolon();
                Statement::Error(span)
            }
        }
    }

    fn parse_block(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::Begin);

        let label = if self.eat(VerilogToken::Colon) {
            Some(self.expect_ident())
        } else {
            None
        };

        let mut decls = Vec::new();
        if label.is_some() {
            // Named blocks may declare locals before their statements.
            while !self.at(VerilogToken::End) && !self.at_eof() && self.is_at_declaration_start() {
                if let Some(item) = self.parse_module_item_inner() {
                    decls.push(item);
                }
            }
        }

        let mut stmts = Vec::new();
        while !self.at(VerilogToken::End) && !self.at_eof() {
            stmts.push(self.parse_statement());
        }

        self.expect(VerilogToken::End);
        Statement::Block {
            label,
            decls,
            stmts,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_if(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::If);
        self.expect(VerilogToken::LeftParen);
        let condition = self.parse_expr();
        self.expect(VerilogToken::RightParen);

        let then_stmt = self.parse_statement();
        let else_stmt = if self.eat(VerilogToken::Else) {
            Some(Box::new(self.parse_statement()))
        } else {
            None
        };

        Statement::If {
            condition,
            then_stmt: Box::new(then_stmt),
            else_stmt,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_case(&mut self) -> Statement {
        let start = self.current_span();
        let kind = match self.current() {
            VerilogToken::Casex => CaseKind::Casex,
            VerilogToken::Casez => CaseKind::Casez,
            _ => CaseKind::Case,
        };
        self.advance();

        self.expect(VerilogToken::LeftParen);
        let expr = self.parse_expr();
        self.expect(VerilogToken::RightParen);

        let mut arms = Vec::new();
        while !self.at(VerilogToken::Endcase) && !self.at_eof() {
            arms.push(self.parse_case_arm());
        }
        self.expect(VerilogToken::Endcase);

        Statement::Case {
            kind,
            expr,
            arms,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_case_arm(&mut self) -> CaseArm {
        let start = self.current_span();

        if self.eat(VerilogToken::Default) {
            self.eat(VerilogToken::Colon);
            let body = self.parse_statement();
            CaseArm {
                patterns: Vec::new(),
                is_default: true,
                body,
                span: start.merge(self.prev_span()),
            }
        } else {
            let mut patterns = vec![self.parse_expr()];
            while self.eat(VerilogToken::Comma) {
                patterns.push(self.parse_expr());
            }
            self.expect(VerilogToken::Colon);
            let body = self.parse_statement();
            CaseArm {
                patterns,
                is_default: false,
                body,
                span: start.merge(self.prev_span()),
            }
        }
    }

    fn parse_for(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::For);
        self.expect(VerilogToken::LeftParen);

        let init = self.parse_blocking_assignment(true);
        let condition = self.parse_expr();
        self.expect(VerilogToken::Semicolon);
        let step = self.parse_blocking_assignment(false);

        self.expect(VerilogToken::RightParen);
        let body = self.parse_statement();

        Statement::For {
            init: Box::new(init),
            condition,
            step: Box::new(step),
            body: Box::new(body),
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses `lvalue = expr`, with or without a trailing semicolon
    /// (`for` steps omit it).
    pub(crate) fn parse_blocking_assignment(&mut self, semicolon: bool) -> Statement {
        let start = self.current_span();
        let lhs = self.parse_lvalue();
        self.expect(VerilogToken::Equals);
        let rhs = self.parse_expr();
        if semicolon {
            self.expect(VerilogToken::Semicolon);
        }
        Statement::Blocking {
            lhs,
            rhs,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_while(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::While);
        self.expect(VerilogToken::LeftParen);
        let condition = self.parse_expr();
        self.expect(VerilogToken::RightParen);
        let body = self.parse_statement();
        Statement::While {
            condition,
            body: Box::new(body),
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_forever(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::Forever);
        let body = self.parse_statement();
        Statement::Forever {
            body: Box::new(body),
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_repeat(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::Repeat);
        self.expect(VerilogToken::LeftParen);
        let count = self.parse_expr();
        self.expect(VerilogToken::RightParen);
        let body = self.parse_statement();
        Statement::Repeat {
            count,
            body: Box::new(body),
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_wait(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::Wait);
        self.expect(VerilogToken::LeftParen);
        let condition = self.parse_expr();
        self.expect(VerilogToken::RightParen);

        let body = if self.eat(VerilogToken::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_statement()))
        };

        Statement::Wait {
            condition,
            body,
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses `@(...) stmt` or `@* stmt`.
    pub(crate) fn parse_event_control(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::At);
        let sensitivity = self.parse_sensitivity_list();
        let body = self.parse_statement();
        Statement::EventControl {
            sensitivity,
            body: Box::new(body),
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses the sensitivity part after `@`: `*`, `(*)`, or
    /// `(item {or|, item})`.
    pub(crate) fn parse_sensitivity_list(&mut self) -> SensitivityList {
        if self.eat(VerilogToken::Star) {
            return SensitivityList::Star;
        }

        self.expect(VerilogToken::LeftParen);
        if self.at(VerilogToken::Star) {
            self.advance();
            self.expect(VerilogToken::RightParen);
            return SensitivityList::Star;
        }

        let mut items = vec![self.parse_sensitivity_item()];
        while self.eat(VerilogToken::Or) || self.eat(VerilogToken::Comma) {
            items.push(self.parse_sensitivity_item());
        }
        self.expect(VerilogToken::RightParen);
        SensitivityList::List { items }
    }

    fn parse_sensitivity_item(&mut self) -> SensitivityItem {
        let start = self.current_span();
        let edge = if self.eat(VerilogToken::Posedge) {
            Some(EdgeKind::Posedge)
        } else if self.eat(VerilogToken::Negedge) {
            Some(EdgeKind::Negedge)
        } else {
            None
        };
        let signal = self.parse_expr();
        let span = start.merge(signal.span());
        SensitivityItem { edge, signal, span }
    }

    fn parse_delay(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::Hash);
        let delay = self.parse_expr_bp(23); // just the delay value
        let body = self.parse_statement();
        Statement::Delay {
            delay,
            body: Box::new(body),
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_event_trigger(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::Arrow);
        let target = self.expect_ident();
        self.expect(VerilogToken::Semicolon);
        Statement::EventTrigger {
            target,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_disable(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(VerilogToken::Disable);
        let target = self.expect_ident();
        self.expect(VerilogToken::Semicolon);
        Statement::Disable {
            target,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_system_task_call(&mut self) -> Statement {
        let start = self.current_span();
        let name = self.interner.intern(self.current_text());
        self.advance();

        let args = if self.at(VerilogToken::LeftParen) {
            self.parse_call_args()
        } else {
            Vec::new()
        };
        self.expect(VerilogToken::Semicolon);
        Statement::SystemTaskCall {
            name,
            args,
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses a statement starting with an lvalue: blocking/non-blocking
    /// assignment, or a task call.
    fn parse_assignment_or_task_call(&mut self) -> Statement {
        let start = self.current_span();
        let lhs = self.parse_lvalue();

        match self.current() {
            VerilogToken::Equals => {
                self.advance();
                let rhs = self.parse_expr();
                self.expect(VerilogToken::Semicolon);
                Statement::Blocking {
                    lhs,
                    rhs,
                    span: start.merge(self.prev_span()),
                }
            }
            VerilogToken::LessEquals => {
                self.advance();
                let rhs = self.parse_expr();
                self.expect(VerilogToken::Semicolon);
                Statement::NonBlocking {
                    lhs,
                    rhs,
                    span: start.merge(self.prev_span()),
                }
            }
            VerilogToken::Semicolon => {
                self.advance();
                let span = start.merge(self.prev_span());
                match lhs {
                    Expr::FunctionCall { name, args, .. } => {
                        Statement::TaskCall { name, args, span }
                    }
                    Expr::Identifier { name, .. } => Statement::TaskCall {
                        name,
                        args: Vec::new(),
                        span,
                    },
                    _ => {
                        self.error("expected '=' or '<=' after assignment target");
                        Statement::Error(span)
                    }
                }
            }
            _ => {
                let span = self.current_span();
                self.expected("'=', '<=', or ';'");
                self.recover_to_semicolon();
                Statement::Error(start.merge(span))
            }
        }
    }

    /// Parses an lvalue — identifier with selects and dots, or a
    /// concatenation — without consuming a following `<=`.
    pub(crate) fn parse_lvalue(&mut self) -> Expr {
        let start = self.current_span();

        if self.at(VerilogToken::LeftBrace) {
            return self.parse_concat_or_replication();
        }

        let name = self.expect_ident();
        let mut expr = Expr::Identifier { name, span: start };

        loop {
            match self.current() {
                VerilogToken::Dot => expr = self.parse_dot_suffix(expr),
                VerilogToken::LeftBracket => expr = self.parse_postfix_index(expr),
                VerilogToken::LeftParen => {
                    let args = self.parse_call_args();
                    let span = start.merge(self.prev_span());
                    return Expr::FunctionCall { name, args, span };
                }
                _ => break,
            }
        }

        expr
    }
}
