//! Declaration and module item parsing for Verilog-2005.
//!
//! Handles net/reg/integer declarations, parameters, non-ANSI port
//! declarations, continuous assigns, always/initial blocks, module and gate
//! instantiations, generate constructs (for/if/case and the plain wrapper),
//! genvar, functions, tasks, and defparam.
//!
//! **Instantiation detection:** an identifier at module-item level followed
//! by another identifier or `#` is a module instantiation; anything else is
//! an error.

use crate::ast::*;
use crate::parser::VerilogParser;
use crate::token::VerilogToken;
use silica_source::Span;

impl VerilogParser<'_> {
    /// Parses module items until `endmodule` or EOF.
    pub fn parse_module_items(&mut self) -> Vec<ModuleItem> {
        let mut items = Vec::new();
        while !self.at(VerilogToken::Endmodule) && !self.at_eof() {
            self.parse_module_item_into(&mut items);
        }
        items
    }

    /// Returns `true` if the current token can begin a declaration.
    pub(crate) fn is_at_declaration_start(&self) -> bool {
        self.current().is_net_type()
            || matches!(
                self.current(),
                VerilogToken::Parameter
                    | VerilogToken::Localparam
                    | VerilogToken::Input
                    | VerilogToken::Output
                    | VerilogToken::Inout
                    | VerilogToken::Genvar
            )
    }

    /// Parses one module item, appending the resulting item(s) to `out`.
    /// Multi-name declarations (`parameter A = 1, B = 2;`, `input a, b;`)
    /// append one item per name.
    pub(crate) fn parse_module_item_into(&mut self, out: &mut Vec<ModuleItem>) {
        let attrs = self.collect_attrs();

        match self.current() {
            t if t.is_net_type() => out.push(self.parse_net_declaration(attrs)),

            VerilogToken::Parameter => self.parse_parameter_items(false, attrs, out),
            VerilogToken::Localparam => self.parse_parameter_items(true, attrs, out),

            VerilogToken::Input | VerilogToken::Output | VerilogToken::Inout => {
                for port in self.parse_port_decl_group(attrs) {
                    out.push(ModuleItem::PortDecl(port));
                }
            }

            VerilogToken::Assign => out.push(self.parse_continuous_assign(attrs)),
            VerilogToken::Always => out.push(self.parse_always_block(attrs)),
            VerilogToken::Initial => out.push(self.parse_initial_block(attrs)),
            VerilogToken::Generate => out.push(self.parse_generate_wrapper(attrs)),
            VerilogToken::For => {
                // Generate-for without the generate..endgenerate wrapper.
                let start = self.current_span();
                let block = self.parse_generate_for(start);
                out.push(ModuleItem::Generate(block));
            }
            VerilogToken::Genvar => out.push(self.parse_genvar_declaration(attrs)),
            VerilogToken::Function => out.push(self.parse_function_declaration(attrs)),
            VerilogToken::Task => out.push(self.parse_task_declaration(attrs)),
            VerilogToken::Defparam => out.push(self.parse_defparam(attrs)),

            t if t.is_gate_primitive() => out.push(self.parse_gate_instantiation(attrs)),

            VerilogToken::Identifier => {
                let next = self.peek_kind(1);
                if next == VerilogToken::Identifier || next == VerilogToken::Hash {
                    out.push(self.parse_module_instantiation(attrs));
                } else {
                    let span = self.current_span();
                    self.expected("module item");
                    self.recover_to_semicolon();
                    out.push(ModuleItem::Error(span));
                }
            }

            _ => {
                let span = self.current_span();
                self.expected("module item");
                self.recover_to_semicolon();
                out.push(ModuleItem::Error(span));
            }
        }
    }

    /// Single-item variant for contexts that hold exactly one declaration.
    pub(crate) fn parse_module_item_inner(&mut self) -> Option<ModuleItem> {
        let mut items = Vec::new();
        self.parse_module_item_into(&mut items);
        items.into_iter().next()
    }

    /// Parses a net/variable declaration of any net type.
    fn parse_net_declaration(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        let net_type = self.eat_net_type().expect("caller checked net type");
        let signed = self.eat(VerilogToken::Signed);
        let range = self.try_parse_range();

        let mut names = vec![self.parse_decl_name()];
        while self.eat(VerilogToken::Comma) {
            names.push(self.parse_decl_name());
        }
        self.expect(VerilogToken::Semicolon);

        ModuleItem::NetDecl(NetDecl {
            net_type,
            signed,
            range,
            names,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parses one declared name with optional unpacked dimensions and
    /// initializer.
    fn parse_decl_name(&mut self) -> DeclName {
        let start = self.current_span();
        let name = self.expect_ident();
        let mut unpacked_dims = Vec::new();
        while self.at(VerilogToken::LeftBracket) {
            unpacked_dims.push(self.parse_range());
        }
        let init = if self.eat(VerilogToken::Equals) {
            Some(self.parse_expr())
        } else {
            None
        };
        DeclName {
            name,
            unpacked_dims,
            init,
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses `parameter`/`localparam` declarations, one item per name.
    fn parse_parameter_items(&mut self, local: bool, attrs: AttrList, out: &mut Vec<ModuleItem>) {
        out.push(ModuleItem::ParamDecl(
            self.parse_single_parameter_decl(local, attrs.clone()),
        ));
        while self.eat(VerilogToken::Comma) {
            let start = self.current_span();
            let signed = self.eat(VerilogToken::Signed);
            let range = self.try_parse_range();
            let name = self.expect_ident();
            let value = if self.eat(VerilogToken::Equals) {
                Some(self.parse_expr())
            } else {
                None
            };
            out.push(ModuleItem::ParamDecl(ParameterDecl {
                is_localparam: local,
                signed,
                range,
                name,
                value,
                attrs: attrs.clone(),
                span: start.merge(self.prev_span()),
            }));
        }
        self.expect(VerilogToken::Semicolon);
    }

    /// Parses a non-ANSI port declaration group, one [`PortDecl`] per name.
    fn parse_port_decl_group(&mut self, attrs: AttrList) -> Vec<PortDecl> {
        let start = self.current_span();
        let direction = match self.current() {
            VerilogToken::Input => Direction::Input,
            VerilogToken::Output => Direction::Output,
            VerilogToken::Inout => Direction::Inout,
            _ => {
                self.expected("port direction");
                Direction::Input
            }
        };
        self.advance();

        let net_type = self.eat_net_type();
        let signed = self.eat(VerilogToken::Signed);
        let range = self.try_parse_range();

        let mut ports = Vec::new();
        loop {
            let name_span = self.current_span();
            let name = self.expect_ident();
            let mut unpacked_dims = Vec::new();
            while self.at(VerilogToken::LeftBracket) {
                unpacked_dims.push(self.parse_range());
            }
            ports.push(PortDecl {
                direction,
                net_type,
                signed,
                range: range.clone(),
                name,
                unpacked_dims,
                attrs: attrs.clone(),
                span: start.merge(name_span),
            });
            if !self.eat(VerilogToken::Comma) {
                break;
            }
        }
        self.expect(VerilogToken::Semicolon);
        ports
    }

    fn parse_continuous_assign(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Assign);
        let lhs = self.parse_lvalue();
        self.expect(VerilogToken::Equals);
        let rhs = self.parse_expr();
        self.expect(VerilogToken::Semicolon);
        ModuleItem::ContinuousAssign(ContinuousAssign {
            lhs,
            rhs,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parses an always block, hoisting the leading event control's
    /// sensitivity list onto the [`AlwaysBlock`] node.
    fn parse_always_block(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Always);
        let stmt = self.parse_statement();
        let span = start.merge(self.prev_span());

        let (sensitivity, body) = match stmt {
            Statement::EventControl {
                sensitivity, body, ..
            } => (sensitivity, *body),
            other => {
                self.sink.emit(silica_diagnostics::Diagnostic::error(
                    crate::parser::P101,
                    "always block requires an event control '@(...)'",
                    other.span(),
                ));
                (SensitivityList::Star, other)
            }
        };

        ModuleItem::AlwaysBlock(AlwaysBlock {
            sensitivity,
            body,
            attrs,
            span,
        })
    }

    fn parse_initial_block(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Initial);
        let body = self.parse_statement();
        ModuleItem::InitialBlock(InitialBlock {
            body,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_module_instantiation(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        let module_name = self.expect_ident();

        let param_overrides = if self.eat(VerilogToken::Hash) {
            self.parse_connection_list()
        } else {
            Vec::new()
        };

        let mut instances = Vec::new();
        loop {
            instances.push(self.parse_single_instance());
            if !self.eat(VerilogToken::Comma) {
                break;
            }
        }
        self.expect(VerilogToken::Semicolon);

        ModuleItem::Instantiation(Instantiation {
            module_name,
            param_overrides,
            instances,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_single_instance(&mut self) -> Instance {
        let start = self.current_span();
        let name = self.expect_ident();
        let range = self.try_parse_range();
        let connections = self.parse_connection_list();
        Instance {
            name,
            range,
            connections,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_connection_list(&mut self) -> Vec<Connection> {
        self.expect(VerilogToken::LeftParen);
        let mut connections = Vec::new();
        if !self.at(VerilogToken::RightParen) {
            loop {
                connections.push(self.parse_connection());
                if !self.eat(VerilogToken::Comma) {
                    break;
                }
            }
        }
        self.expect(VerilogToken::RightParen);
        connections
    }

    fn parse_connection(&mut self) -> Connection {
        let start = self.current_span();
        if self.at(VerilogToken::Dot) {
            self.advance();
            let formal = self.expect_ident();
            self.expect(VerilogToken::LeftParen);
            let actual = if self.at(VerilogToken::RightParen) {
                None // explicit disconnect: .port()
            } else {
                Some(self.parse_expr())
            };
            self.expect(VerilogToken::RightParen);
            Connection {
                formal: Some(formal),
                actual,
                span: start.merge(self.prev_span()),
            }
        } else {
            let actual = self.parse_expr();
            let span = start.merge(actual.span());
            Connection {
                formal: None,
                actual: Some(actual),
                span,
            }
        }
    }

    fn parse_gate_instantiation(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        let kind = match self.current() {
            VerilogToken::And => GateKind::And,
            VerilogToken::Or => GateKind::Or,
            VerilogToken::Nand => GateKind::Nand,
            VerilogToken::Nor => GateKind::Nor,
            VerilogToken::Xor => GateKind::Xor,
            VerilogToken::Xnor => GateKind::Xnor,
            VerilogToken::Not => GateKind::Not,
            _ => GateKind::Buf,
        };
        self.advance();

        let name = if self.at(VerilogToken::Identifier) && self.peek_is(VerilogToken::LeftParen) {
            Some(self.expect_ident())
        } else {
            None
        };

        self.expect(VerilogToken::LeftParen);
        let mut ports = Vec::new();
        if !self.at(VerilogToken::RightParen) {
            ports.push(self.parse_expr());
            while self.eat(VerilogToken::Comma) {
                ports.push(self.parse_expr());
            }
        }
        self.expect(VerilogToken::RightParen);
        self.expect(VerilogToken::Semicolon);

        ModuleItem::GateInst(GateInst {
            kind,
            name,
            ports,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }

    // ========================================================================
    // Generate
    // ========================================================================

    fn parse_generate_wrapper(&mut self, _attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Generate);

        let block = match self.current() {
            VerilogToken::For => self.parse_generate_for(start),
            VerilogToken::If => self.parse_generate_if(start),
            VerilogToken::Case => self.parse_generate_case(start),
            _ => {
                let mut items = Vec::new();
                while !self.at(VerilogToken::Endgenerate) && !self.at_eof() {
                    self.parse_module_item_into(&mut items);
                }
                self.expect(VerilogToken::Endgenerate);
                return ModuleItem::Generate(GenerateBlock::Block {
                    items,
                    span: start.merge(self.prev_span()),
                });
            }
        };

        self.expect(VerilogToken::Endgenerate);
        ModuleItem::Generate(block)
    }

    /// Parses `for (gv = init; cond; gv = step) [begin[:label]] items [end]`.
    pub(crate) fn parse_generate_for(&mut self, start: Span) -> GenerateBlock {
        self.expect(VerilogToken::For);
        self.expect(VerilogToken::LeftParen);

        let genvar = self.expect_ident();
        self.expect(VerilogToken::Equals);
        let init = self.parse_expr();
        self.expect(VerilogToken::Semicolon);

        let condition = self.parse_expr();
        self.expect(VerilogToken::Semicolon);

        let step_var = self.expect_ident();
        if step_var != genvar {
            self.error("generate loop must step its own genvar");
        }
        self.expect(VerilogToken::Equals);
        let step = self.parse_expr();
        self.expect(VerilogToken::RightParen);

        let mut label = None;
        let mut items = Vec::new();
        if self.eat(VerilogToken::Begin) {
            if self.eat(VerilogToken::Colon) {
                label = Some(self.expect_ident());
            }
            while !self.at(VerilogToken::End) && !self.at_eof() {
                self.parse_module_item_into(&mut items);
            }
            self.expect(VerilogToken::End);
        } else {
            self.parse_module_item_into(&mut items);
        }

        GenerateBlock::For {
            genvar,
            init,
            condition,
            step,
            label,
            items,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_generate_if(&mut self, start: Span) -> GenerateBlock {
        self.expect(VerilogToken::If);
        self.expect(VerilogToken::LeftParen);
        let condition = self.parse_expr();
        self.expect(VerilogToken::RightParen);

        let then_items = self.parse_generate_body();
        let else_items = if self.eat(VerilogToken::Else) {
            if self.at(VerilogToken::If) {
                // else-if chain nests as a single-item else branch
                let nested_start = self.current_span();
                let nested = self.parse_generate_if(nested_start);
                vec![ModuleItem::Generate(nested)]
            } else {
                self.parse_generate_body()
            }
        } else {
            Vec::new()
        };

        GenerateBlock::If {
            condition,
            then_items,
            else_items,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_generate_case(&mut self, start: Span) -> GenerateBlock {
        self.expect(VerilogToken::Case);
        self.expect(VerilogToken::LeftParen);
        let expr = self.parse_expr();
        self.expect(VerilogToken::RightParen);

        let mut arms = Vec::new();
        while !self.at(VerilogToken::Endcase) && !self.at_eof() {
            let arm_start = self.current_span();
            let (patterns, is_default) = if self.eat(VerilogToken::Default) {
                self.eat(VerilogToken::Colon);
                (Vec::new(), true)
            } else {
                let mut patterns = vec![self.parse_expr()];
                while self.eat(VerilogToken::Comma) {
                    patterns.push(self.parse_expr());
                }
                self.expect(VerilogToken::Colon);
                (patterns, false)
            };
            let items = self.parse_generate_body();
            arms.push(GenerateCaseArm {
                patterns,
                is_default,
                items,
                span: arm_start.merge(self.prev_span()),
            });
        }
        self.expect(VerilogToken::Endcase);

        GenerateBlock::Case {
            expr,
            arms,
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses a generate branch body: `begin [:label] items end` or one item.
    fn parse_generate_body(&mut self) -> Vec<ModuleItem> {
        let mut items = Vec::new();
        if self.eat(VerilogToken::Begin) {
            if self.eat(VerilogToken::Colon) {
                let _ = self.expect_ident();
            }
            while !self.at(VerilogToken::End) && !self.at_eof() {
                self.parse_module_item_into(&mut items);
            }
            self.expect(VerilogToken::End);
        } else {
            self.parse_module_item_into(&mut items);
        }
        items
    }

    fn parse_genvar_declaration(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Genvar);
        let names = self.parse_identifier_list();
        self.expect(VerilogToken::Semicolon);
        ModuleItem::GenvarDecl(GenvarDecl {
            names,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_defparam(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Defparam);
        let target = self.parse_expr();
        self.expect(VerilogToken::Equals);
        let value = self.parse_expr();
        self.expect(VerilogToken::Semicolon);
        ModuleItem::DefparamDecl(DefparamDecl {
            target,
            value,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }

    // ========================================================================
    // Functions and tasks
    // ========================================================================

    fn parse_function_declaration(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Function);

        let automatic = self.eat(VerilogToken::Automatic);
        let signed = self.eat(VerilogToken::Signed);
        let return_range = self.try_parse_range();
        let name = self.expect_ident();
        self.expect(VerilogToken::Semicolon);

        let mut inputs = Vec::new();
        let mut decls = Vec::new();
        while !self.at(VerilogToken::Begin)
            && !self.at(VerilogToken::Endfunction)
            && !self.at_eof()
        {
            if self.at(VerilogToken::Input) {
                inputs.extend(self.parse_port_decl_group(Vec::new()));
            } else if self.is_at_declaration_start() {
                if let Some(item) = self.parse_module_item_inner() {
                    decls.push(item);
                }
            } else {
                break;
            }
        }

        let mut body = Vec::new();
        while !self.at(VerilogToken::Endfunction) && !self.at_eof() {
            body.push(self.parse_statement());
        }
        self.expect(VerilogToken::Endfunction);

        ModuleItem::FunctionDecl(FunctionDecl {
            automatic,
            signed,
            return_range,
            name,
            inputs,
            decls,
            body,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_task_declaration(&mut self, attrs: AttrList) -> ModuleItem {
        let start = self.current_span();
        self.expect(VerilogToken::Task);

        let automatic = self.eat(VerilogToken::Automatic);
        let name = self.expect_ident();
        self.expect(VerilogToken::Semicolon);

        let mut ports = Vec::new();
        let mut decls = Vec::new();
        while !self.at(VerilogToken::Begin) && !self.at(VerilogToken::Endtask) && !self.at_eof() {
            if self.current().is_direction() {
                ports.extend(self.parse_port_decl_group(Vec::new()));
            } else if self.is_at_declaration_start() {
                if let Some(item) = self.parse_module_item_inner() {
                    decls.push(item);
                }
            } else {
                break;
            }
        }

        let mut body = Vec::new();
        while !self.at(VerilogToken::Endtask) && !self.at_eof() {
            body.push(self.parse_statement());
        }
        self.expect(VerilogToken::Endtask);

        ModuleItem::TaskDecl(TaskDecl {
            automatic,
            name,
            ports,
            decls,
            body,
            attrs,
            span: start.merge(self.prev_span()),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer;
    use crate::parser::VerilogParser;
    use silica_common::Interner;
    use silica_diagnostics::DiagnosticSink;
    use silica_source::FileId;

    fn parse_module(source: &str) -> ModuleDecl {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let file = FileId::from_raw(0);
        let tokens = lexer::lex(source, file, &sink);
        let mut parser = VerilogParser::new(tokens, source, file, &interner, &sink);
        let ast = parser.parse_source_file();
        assert!(
            !sink.has_errors(),
            "unexpected errors: {:?}",
            sink.diagnostics()
        );
        match ast.items.into_iter().next().unwrap() {
            VerilogItem::Module(m) => m,
            VerilogItem::Error(_) => panic!("expected module"),
        }
    }

    #[test]
    fn wire_declaration_with_range() {
        let m = parse_module("module t; wire [7:0] data; endmodule");
        match &m.items[0] {
            ModuleItem::NetDecl(n) => {
                assert_eq!(n.net_type, NetType::Wire);
                assert!(n.range.is_some());
                assert_eq!(n.names.len(), 1);
            }
            other => panic!("expected net decl, got {other:?}"),
        }
    }

    #[test]
    fn reg_memory_declaration() {
        let m = parse_module("module t; reg [7:0] mem [0:255]; endmodule");
        match &m.items[0] {
            ModuleItem::NetDecl(n) => {
                assert_eq!(n.net_type, NetType::Reg);
                assert_eq!(n.names[0].unpacked_dims.len(), 1);
            }
            other => panic!("expected net decl, got {other:?}"),
        }
    }

    #[test]
    fn reg_with_initializer() {
        let m = parse_module("module t; reg r = 1'b0; endmodule");
        match &m.items[0] {
            ModuleItem::NetDecl(n) => assert!(n.names[0].init.is_some()),
            other => panic!("expected net decl, got {other:?}"),
        }
    }

    #[test]
    fn multi_parameter_declaration() {
        let m = parse_module("module t; parameter A = 1, B = 2; localparam C = 3; endmodule");
        let params: Vec<_> = m
            .items
            .iter()
            .filter_map(|i| match i {
                ModuleItem::ParamDecl(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(params.len(), 3);
        assert!(!params[0].is_localparam);
        assert!(!params[1].is_localparam);
        assert!(params[2].is_localparam);
    }

    #[test]
    fn instantiation_named_and_params() {
        let m = parse_module(
            "module t;
                counter #(.WIDTH(8)) u1 (.clk(clk), .rst(rst), .count(count));
            endmodule",
        );
        match &m.items[0] {
            ModuleItem::Instantiation(inst) => {
                assert_eq!(inst.param_overrides.len(), 1);
                assert_eq!(inst.instances.len(), 1);
                let conns = &inst.instances[0].connections;
                assert_eq!(conns.len(), 3);
                assert!(conns[0].formal.is_some());
            }
            other => panic!("expected instantiation, got {other:?}"),
        }
    }

    #[test]
    fn instantiation_positional_and_disconnect() {
        let m = parse_module("module t; adder u1 (a, b, .cout(), sum); endmodule");
        match &m.items[0] {
            ModuleItem::Instantiation(inst) => {
                let conns = &inst.instances[0].connections;
                assert_eq!(conns.len(), 4);
                assert!(conns[0].formal.is_none());
                assert!(conns[2].formal.is_some());
                assert!(conns[2].actual.is_none()); // .cout()
            }
            other => panic!("expected instantiation, got {other:?}"),
        }
    }

    #[test]
    fn multiple_instances_one_item() {
        let m = parse_module("module t; inv u1 (y1, a), u2 (y2, b); endmodule");
        match &m.items[0] {
            ModuleItem::Instantiation(inst) => assert_eq!(inst.instances.len(), 2),
            other => panic!("expected instantiation, got {other:?}"),
        }
    }

    #[test]
    fn gate_instantiation() {
        let m = parse_module("module t; and g1(y, a, b); nand (z, a, b); endmodule");
        match &m.items[0] {
            ModuleItem::GateInst(g) => {
                assert_eq!(g.kind, GateKind::And);
                assert_eq!(g.ports.len(), 3);
                assert!(g.name.is_some());
            }
            other => panic!("expected gate, got {other:?}"),
        }
        match &m.items[1] {
            ModuleItem::GateInst(g) => {
                assert_eq!(g.kind, GateKind::Nand);
                assert!(g.name.is_none());
            }
            other => panic!("expected gate, got {other:?}"),
        }
    }

    #[test]
    fn generate_for_with_label() {
        let m = parse_module(
            "module t;
                genvar i;
                generate
                    for (i = 0; i < 8; i = i + 1) begin : gen_bits
                        assign y[i] = a[i] & b[i];
                    end
                endgenerate
            endmodule",
        );
        assert!(matches!(m.items[0], ModuleItem::GenvarDecl(_)));
        match &m.items[1] {
            ModuleItem::Generate(GenerateBlock::For { label, items, .. }) => {
                assert!(label.is_some());
                assert_eq!(items.len(), 1);
            }
            other => panic!("expected generate for, got {other:?}"),
        }
    }

    #[test]
    fn generate_for_without_wrapper() {
        let m = parse_module(
            "module t;
                genvar i;
                for (i = 0; i < 4; i = i + 1) begin : g
                    wire w;
                end
            endmodule",
        );
        assert!(matches!(
            m.items[1],
            ModuleItem::Generate(GenerateBlock::For { .. })
        ));
    }

    #[test]
    fn generate_if_else() {
        let m = parse_module(
            "module t #(parameter W = 8);
                generate
                    if (W > 8) begin
                        wire [15:0] wide;
                    end else begin
                        wire [7:0] narrow;
                    end
                endgenerate
            endmodule",
        );
        match &m.items[0] {
            ModuleItem::Generate(GenerateBlock::If {
                then_items,
                else_items,
                ..
            }) => {
                assert_eq!(then_items.len(), 1);
                assert_eq!(else_items.len(), 1);
            }
            other => panic!("expected generate if, got {other:?}"),
        }
    }

    #[test]
    fn generate_case() {
        let m = parse_module(
            "module t #(parameter MODE = 0);
                generate
                    case (MODE)
                        0: begin wire a; end
                        1, 2: begin wire b; end
                        default: begin wire c; end
                    endcase
                endgenerate
            endmodule",
        );
        match &m.items[0] {
            ModuleItem::Generate(GenerateBlock::Case { arms, .. }) => {
                assert_eq!(arms.len(), 3);
                assert_eq!(arms[1].patterns.len(), 2);
                assert!(arms[2].is_default);
            }
            other => panic!("expected generate case, got {other:?}"),
        }
    }

    #[test]
    fn function_declaration() {
        let m = parse_module(
            "module t;
                function automatic [7:0] add;
                    input [7:0] a;
                    input [7:0] b;
                    begin
                        add = a + b;
                    end
                endfunction
            endmodule",
        );
        match &m.items[0] {
            ModuleItem::FunctionDecl(f) => {
                assert!(f.automatic);
                assert_eq!(f.inputs.len(), 2);
                assert!(f.return_range.is_some());
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn task_declaration() {
        let m = parse_module(
            "module t;
                task flip;
                    input a;
                    output b;
                    begin
                        b = ~a;
                    end
                endtask
            endmodule",
        );
        match &m.items[0] {
            ModuleItem::TaskDecl(t) => {
                assert_eq!(t.ports.len(), 2);
                assert_eq!(t.ports[1].direction, Direction::Output);
            }
            other => panic!("expected task, got {other:?}"),
        }
    }

    #[test]
    fn defparam() {
        let m = parse_module("module t; defparam u1.WIDTH = 16; endmodule");
        assert!(matches!(m.items[0], ModuleItem::DefparamDecl(_)));
    }

    #[test]
    fn attributes_bind_to_items() {
        let m = parse_module(
            "module t;
                (* keep *) wire w;
                (* ram_style = \"block\" *) reg [7:0] mem [0:15];
            endmodule",
        );
        match &m.items[0] {
            ModuleItem::NetDecl(n) => assert_eq!(n.attrs, vec!["keep".to_string()]),
            other => panic!("expected net decl, got {other:?}"),
        }
        match &m.items[1] {
            ModuleItem::NetDecl(n) => {
                assert_eq!(n.attrs, vec!["ram_style = \"block\"".to_string()])
            }
            other => panic!("expected net decl, got {other:?}"),
        }
    }

    #[test]
    fn event_declaration_parses() {
        let m = parse_module("module t; event ready; endmodule");
        match &m.items[0] {
            ModuleItem::NetDecl(n) => assert_eq!(n.net_type, NetType::Event),
            other => panic!("expected net decl, got {other:?}"),
        }
    }
}
