//! Core parser infrastructure and top-level Verilog-2005 rules.
//!
//! [`VerilogParser`] provides the primitive operations (advance, expect, eat),
//! attribute collection, error reporting with suggestions, and recovery; the
//! top-level methods here parse source files, modules, parameter port lists,
//! and port lists. Non-ANSI port lists are normalized into ANSI-shaped
//! [`PortDecl`]s before the module is returned.

use crate::ast::*;
use crate::token::{Token, VerilogToken};
use silica_common::{Ident, Interner};
use silica_diagnostics::code::{Category, DiagnosticCode};
use silica_diagnostics::{Diagnostic, DiagnosticSink, Label, SuggestedFix};
use silica_source::{FileId, Span};

pub(crate) const P101: DiagnosticCode = DiagnosticCode::new(Category::Parse, 101);

/// A recursive descent parser for Verilog-2005 token streams.
///
/// Errors are reported to the diagnostic sink with a source label, a
/// heuristic suggestion, and — where the fix is mechanical — an insertable
/// replacement. The parser recovers at `;`/`end`/`endmodule` boundaries and
/// leaves `Error` nodes in the tree.
pub struct VerilogParser<'src> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) source: &'src str,
    #[allow(dead_code)]
    pub(crate) file: FileId,
    pub(crate) interner: &'src Interner,
    pub(crate) sink: &'src DiagnosticSink,
}

impl<'src> VerilogParser<'src> {
    /// Creates a parser over `tokens`, which must have been lexed from
    /// `source` for `file`.
    pub fn new(
        tokens: Vec<Token>,
        source: &'src str,
        file: FileId,
        interner: &'src Interner,
        sink: &'src DiagnosticSink,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            file,
            interner,
            sink,
        }
    }

    // ========================================================================
    // Primitive operations
    // ========================================================================

    pub(crate) fn current(&self) -> VerilogToken {
        self.tokens[self.pos].kind
    }

    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    pub(crate) fn current_text(&self) -> &'src str {
        let span = self.current_span();
        &self.source[span.start as usize..span.end as usize]
    }

    pub(crate) fn at(&self, kind: VerilogToken) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.current() == VerilogToken::Eof
    }

    pub(crate) fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    pub(crate) fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    pub(crate) fn eat(&mut self, kind: VerilogToken) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: VerilogToken) {
        if !self.eat(kind) {
            self.expected(&describe(kind));
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Ident {
        if self.at(VerilogToken::Identifier) {
            let text = self.current_text();
            let ident = self.interner.intern(text);
            self.advance();
            ident
        } else {
            self.expected("identifier");
            self.interner.intern("<missing>")
        }
    }

    pub(crate) fn peek_is(&self, kind: VerilogToken) -> bool {
        self.peek_kind(1) == kind
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> VerilogToken {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(VerilogToken::Eof)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Consumes any attribute tokens at the current position and returns
    /// their payloads (the raw text between `(*` and `*)`, trimmed).
    pub(crate) fn collect_attrs(&mut self) -> AttrList {
        let mut attrs = Vec::new();
        while self.at(VerilogToken::Attribute) {
            let text = self.current_text();
            let payload = text
                .strip_prefix("(*")
                .and_then(|t| t.strip_suffix("*)"))
                .unwrap_or("")
                .trim()
                .to_string();
            attrs.push(payload);
            self.advance();
        }
        attrs
    }

    // ========================================================================
    // Error handling and recovery
    // ========================================================================

    pub(crate) fn error(&self, msg: &str) {
        self.sink
            .emit(Diagnostic::error(P101, msg, self.current_span()));
    }

    /// Reports "expected X, found Y" with a label, a suggestion keyed to the
    /// expected/found pair, and — for a missing semicolon — an insertable
    /// fix.
    pub(crate) fn expected(&self, what: &str) {
        let got = self.describe_current();
        let span = self.current_span();
        let mut diag = Diagnostic::error(P101, format!("expected {what}, found {got}"), span)
            .with_label(Label::primary(span, format!("expected {what}")));

        if what == "';'" {
            diag = diag
                .with_help("add a semicolon after the previous statement or declaration")
                .with_fix(SuggestedFix::insert_before(
                    span,
                    ";",
                    "insert the missing ';'",
                ));
        } else if what == "')'" {
            diag = diag.with_help("check for an unmatched '(' earlier on this line");
        } else if what == "identifier" && self.current() != VerilogToken::Eof {
            if let Some(kw) = self.keyword_text() {
                diag = diag.with_help(format!("'{kw}' is a reserved keyword and cannot be used as a name"));
            }
        }
        if self.at_eof() {
            diag = diag
                .with_help("unexpected end of file; check for an unbalanced 'begin'/'end' or a missing 'endmodule'");
        }

        self.sink.emit(diag);
    }

    fn describe_current(&self) -> String {
        match self.current() {
            VerilogToken::Eof => "end of file".to_string(),
            VerilogToken::Identifier
            | VerilogToken::SystemIdentifier
            | VerilogToken::Number
            | VerilogToken::RealNumber
            | VerilogToken::StringLiteral => format!("'{}'", self.current_text()),
            _ => format!("'{}'", self.current_text()),
        }
    }

    fn keyword_text(&self) -> Option<&'src str> {
        crate::token::lookup_keyword(self.current_text()).map(|_| self.current_text())
    }

    /// Skips forward to just past the next semicolon (or to a block
    /// boundary, whichever comes first).
    pub(crate) fn recover_to_semicolon(&mut self) {
        while !self.at_eof()
            && !self.at(VerilogToken::Semicolon)
            && !self.at(VerilogToken::End)
            && !self.at(VerilogToken::Endmodule)
        {
            self.advance();
        }
        self.eat(VerilogToken::Semicolon);
    }

    // ========================================================================
    // Top-level parsing
    // ========================================================================

    /// Parses a complete source file.
    pub fn parse_source_file(&mut self) -> VerilogSourceFile {
        let start = self.current_span();
        let mut items = Vec::new();

        while !self.at_eof() {
            let attrs = self.collect_attrs();
            match self.current() {
                VerilogToken::Module => {
                    items.push(VerilogItem::Module(self.parse_module(attrs)));
                }
                VerilogToken::Eof => break,
                _ => {
                    let span = self.current_span();
                    self.expected("'module'");
                    self.advance();
                    items.push(VerilogItem::Error(span));
                }
            }
        }

        let span = if items.is_empty() {
            start
        } else {
            start.merge(self.prev_span())
        };
        VerilogSourceFile { items, span }
    }

    /// Parses one module declaration, normalizing its ports.
    fn parse_module(&mut self, attrs: AttrList) -> ModuleDecl {
        let start = self.current_span();
        self.expect(VerilogToken::Module);
        let name = self.expect_ident();

        let params = if self.at(VerilogToken::Hash) {
            self.parse_parameter_port_list()
        } else {
            Vec::new()
        };

        let (port_style, mut ports, header_names) = if self.at(VerilogToken::LeftParen) {
            self.parse_port_list()
        } else {
            (PortStyle::Empty, Vec::new(), Vec::new())
        };

        self.expect(VerilogToken::Semicolon);

        let mut items = self.parse_module_items();

        self.expect(VerilogToken::Endmodule);
        let span = start.merge(self.prev_span());

        if port_style == PortStyle::NonAnsi {
            ports = self.normalize_ports(&header_names, &mut items);
        }

        ModuleDecl {
            name,
            port_style,
            params,
            ports,
            items,
            attrs,
            span,
        }
    }

    /// Merges body port declarations into an ANSI-shaped port list, in
    /// header order. Body `reg` declarations matching an output port upgrade
    /// the port's net type, mirroring the `output q; reg q;` idiom.
    fn normalize_ports(
        &mut self,
        header_names: &[Ident],
        items: &mut Vec<ModuleItem>,
    ) -> Vec<PortDecl> {
        let mut decls: Vec<PortDecl> = Vec::new();
        items.retain(|item| match item {
            ModuleItem::PortDecl(pd) => {
                decls.push(pd.clone());
                false
            }
            _ => true,
        });

        let mut ports = Vec::new();
        for &name in header_names {
            match decls.iter().find(|d| d.name == name) {
                Some(decl) => {
                    let mut port = decl.clone();
                    // output q; reg [7:0] q; — the reg declaration supplies
                    // storage class and range.
                    for item in items.iter() {
                        if let ModuleItem::NetDecl(nd) = item {
                            if nd.net_type == NetType::Reg
                                && nd.names.iter().any(|n| n.name == name)
                            {
                                port.net_type = Some(NetType::Reg);
                                if port.range.is_none() {
                                    port.range = nd.range.clone();
                                }
                            }
                        }
                    }
                    ports.push(port);
                }
                None => {
                    self.sink.emit(Diagnostic::error(
                        P101,
                        format!(
                            "port '{}' is listed in the module header but never declared",
                            self.interner.resolve(name)
                        ),
                        self.prev_span(),
                    ));
                }
            }
        }

        for decl in &decls {
            if !header_names.contains(&decl.name) {
                self.sink.emit(Diagnostic::error(
                    P101,
                    format!(
                        "port '{}' is declared but does not appear in the module header",
                        self.interner.resolve(decl.name)
                    ),
                    decl.span,
                ));
            }
        }

        ports
    }

    /// Parses `#( parameter_decl {, parameter_decl} )`.
    fn parse_parameter_port_list(&mut self) -> Vec<ParameterDecl> {
        self.expect(VerilogToken::Hash);
        self.expect(VerilogToken::LeftParen);

        let mut params = Vec::new();
        if !self.at(VerilogToken::RightParen) {
            loop {
                params.push(self.parse_single_parameter_decl(false, Vec::new()));
                if !self.eat(VerilogToken::Comma) {
                    break;
                }
            }
        }

        self.expect(VerilogToken::RightParen);
        params
    }

    /// Parses a single parameter declaration; the leading `parameter`/
    /// `localparam` keyword is optional (inherited inside `#(...)` lists).
    pub(crate) fn parse_single_parameter_decl(
        &mut self,
        local: bool,
        attrs: AttrList,
    ) -> ParameterDecl {
        let start = self.current_span();
        let is_localparam = if self.eat(VerilogToken::Localparam) {
            true
        } else {
            self.eat(VerilogToken::Parameter);
            local
        };

        let signed = self.eat(VerilogToken::Signed);
        let range = self.try_parse_range();
        let name = self.expect_ident();
        let value = if self.eat(VerilogToken::Equals) {
            Some(self.parse_expr())
        } else {
            None
        };

        let span = start.merge(self.prev_span());
        ParameterDecl {
            is_localparam,
            signed,
            range,
            name,
            value,
            attrs,
            span,
        }
    }

    /// Parses a port list, detecting ANSI vs non-ANSI style.
    ///
    /// Returns `(style, ansi_ports, header_names)` — exactly one of the last
    /// two is populated.
    fn parse_port_list(&mut self) -> (PortStyle, Vec<PortDecl>, Vec<Ident>) {
        self.expect(VerilogToken::LeftParen);

        if self.at(VerilogToken::RightParen) {
            self.advance();
            return (PortStyle::Empty, Vec::new(), Vec::new());
        }

        if self.current().is_direction() || self.at(VerilogToken::Attribute) {
            let ports = self.parse_ansi_port_list();
            self.expect(VerilogToken::RightParen);
            (PortStyle::Ansi, ports, Vec::new())
        } else {
            let mut names = vec![self.expect_ident()];
            while self.eat(VerilogToken::Comma) {
                names.push(self.expect_ident());
            }
            self.expect(VerilogToken::RightParen);
            (PortStyle::NonAnsi, Vec::new(), names)
        }
    }

    /// Parses ANSI port declarations, flattening `input a, b` groups into
    /// one [`PortDecl`] per name. Direction and type are inherited across
    /// commas until the next direction keyword.
    fn parse_ansi_port_list(&mut self) -> Vec<PortDecl> {
        let mut ports: Vec<PortDecl> = Vec::new();
        let mut dir = Direction::Input;
        let mut net_type: Option<NetType> = None;
        let mut signed = false;
        let mut range: Option<Range> = None;

        loop {
            let attrs = self.collect_attrs();
            let start = self.current_span();

            let explicit_dir = match self.current() {
                VerilogToken::Input => Some(Direction::Input),
                VerilogToken::Output => Some(Direction::Output),
                VerilogToken::Inout => Some(Direction::Inout),
                _ => None,
            };
            if let Some(d) = explicit_dir {
                self.advance();
                dir = d;
                net_type = self.eat_net_type();
                signed = self.eat(VerilogToken::Signed);
                range = self.try_parse_range();
            }

            let name = self.expect_ident();
            let mut unpacked_dims = Vec::new();
            while self.at(VerilogToken::LeftBracket) {
                unpacked_dims.push(self.parse_range());
            }

            let span = start.merge(self.prev_span());
            ports.push(PortDecl {
                direction: dir,
                net_type,
                signed,
                range: range.clone(),
                name,
                unpacked_dims,
                attrs,
                span,
            });

            if !self.eat(VerilogToken::Comma) {
                break;
            }
        }

        ports
    }

    /// Tries to consume a net-type keyword.
    pub(crate) fn eat_net_type(&mut self) -> Option<NetType> {
        let ty = match self.current() {
            VerilogToken::Wire => NetType::Wire,
            VerilogToken::Reg => NetType::Reg,
            VerilogToken::Integer => NetType::Integer,
            VerilogToken::Real => NetType::Real,
            VerilogToken::Realtime => NetType::Realtime,
            VerilogToken::Time => NetType::Time,
            VerilogToken::Event => NetType::Event,
            VerilogToken::Tri => NetType::Tri,
            VerilogToken::Supply0 => NetType::Supply0,
            VerilogToken::Supply1 => NetType::Supply1,
            _ => return None,
        };
        self.advance();
        Some(ty)
    }

    /// Parses `[ expr : expr ]`.
    pub(crate) fn parse_range(&mut self) -> Range {
        let start = self.current_span();
        self.expect(VerilogToken::LeftBracket);
        let msb = self.parse_expr();
        self.expect(VerilogToken::Colon);
        let lsb = self.parse_expr();
        self.expect(VerilogToken::RightBracket);
        let span = start.merge(self.prev_span());
        Range { msb, lsb, span }
    }

    /// Parses a range if one starts here.
    pub(crate) fn try_parse_range(&mut self) -> Option<Range> {
        if self.at(VerilogToken::LeftBracket) {
            Some(self.parse_range())
        } else {
            None
        }
    }

    /// Parses `name {, name}`.
    pub(crate) fn parse_identifier_list(&mut self) -> Vec<Ident> {
        let mut names = vec![self.expect_ident()];
        while self.eat(VerilogToken::Comma) {
            names.push(self.expect_ident());
        }
        names
    }
}

/// Human-readable name of a token kind, for error messages.
pub(crate) fn describe(kind: VerilogToken) -> String {
    let text = match kind {
        VerilogToken::Semicolon => "';'",
        VerilogToken::Colon => "':'",
        VerilogToken::Comma => "','",
        VerilogToken::Dot => "'.'",
        VerilogToken::LeftParen => "'('",
        VerilogToken::RightParen => "')'",
        VerilogToken::LeftBracket => "'['",
        VerilogToken::RightBracket => "']'",
        VerilogToken::LeftBrace => "'{'",
        VerilogToken::RightBrace => "'}'",
        VerilogToken::Equals => "'='",
        VerilogToken::Hash => "'#'",
        VerilogToken::At => "'@'",
        VerilogToken::Identifier => "identifier",
        VerilogToken::Number => "number",
        VerilogToken::Module => "'module'",
        VerilogToken::Endmodule => "'endmodule'",
        VerilogToken::Begin => "'begin'",
        VerilogToken::End => "'end'",
        VerilogToken::Endcase => "'endcase'",
        VerilogToken::Endfunction => "'endfunction'",
        VerilogToken::Endtask => "'endtask'",
        VerilogToken::Endgenerate => "'endgenerate'",
        VerilogToken::Eof => "end of file",
        _ => return format!("{kind:?}"),
    };
    text.to_string()
}
