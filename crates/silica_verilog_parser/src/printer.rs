//! Canonical Verilog-2005 pretty-printer.
//!
//! Emits a normalized rendering of the AST: ANSI-style port lists, one
//! declaration per line, four-space indents, and parentheses derived from
//! operator precedence. `parse(print(ast))` reproduces the tree (spans
//! aside): number literals print their `raw` text and parenthesization is
//! inserted exactly where precedence demands, so reparsing introduces no new
//! nodes.

use crate::ast::*;
use silica_common::Interner;
use std::fmt::Write;

/// Pretty-prints AST nodes as canonical Verilog source.
pub struct Printer<'a> {
    interner: &'a Interner,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    /// Creates a printer resolving names through `interner`.
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            out: String::new(),
            indent: 0,
        }
    }

    /// Prints a whole source file.
    pub fn print_source_file(mut self, file: &VerilogSourceFile) -> String {
        for (i, item) in file.items.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            if let VerilogItem::Module(m) = item {
                self.print_module(m);
            }
        }
        self.out
    }

    /// Prints a single module.
    pub fn print_module_decl(mut self, module: &ModuleDecl) -> String {
        self.print_module(module);
        self.out
    }

    /// Prints a single expression.
    pub fn print_expr_string(mut self, expr: &Expr) -> String {
        self.print_expr(expr, 0);
        self.out
    }

    fn name(&self, ident: silica_common::Ident) -> &'a str {
        self.interner.resolve(ident)
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn print_attrs_inline(&mut self, attrs: &AttrList, buf: &mut String) {
        for attr in attrs {
            let _ = write!(buf, "(* {attr} *) ");
        }
    }

    // ========================================================================
    // Module
    // ========================================================================

    fn print_module(&mut self, module: &ModuleDecl) {
        let mut header = String::new();
        self.print_attrs_inline(&module.attrs, &mut header);
        let _ = write!(header, "module {}", self.name(module.name));

        if !module.params.is_empty() {
            header.push_str(" #(");
            for (i, param) in module.params.iter().enumerate() {
                if i > 0 {
                    header.push_str(", ");
                }
                header.push_str(&self.format_parameter(param, true));
            }
            header.push(')');
        }

        if module.ports.is_empty() {
            header.push(';');
            self.line(&header);
        } else {
            header.push_str(" (");
            self.line(&header);
            self.indent += 1;
            for (i, port) in module.ports.iter().enumerate() {
                let sep = if i + 1 < module.ports.len() { "," } else { "" };
                let text = format!("{}{sep}", self.format_port(port));
                self.line(&text);
            }
            self.indent -= 1;
            self.line(");");
        }

        self.indent += 1;
        for item in &module.items {
            self.print_module_item(item);
        }
        self.indent -= 1;
        self.line("endmodule");
    }

    fn format_port(&mut self, port: &PortDecl) -> String {
        let mut s = String::new();
        self.print_attrs_inline(&port.attrs, &mut s);
        s.push_str(match port.direction {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Inout => "inout",
        });
        if let Some(ty) = port.net_type {
            let _ = write!(s, " {}", net_type_keyword(ty));
        }
        if port.signed {
            s.push_str(" signed");
        }
        if let Some(range) = &port.range {
            let _ = write!(s, " {}", self.format_range(range));
        }
        let _ = write!(s, " {}", self.name(port.name));
        for dim in &port.unpacked_dims {
            let _ = write!(s, " {}", self.format_range(dim));
        }
        s
    }

    fn format_parameter(&mut self, param: &ParameterDecl, in_header: bool) -> String {
        let mut s = String::new();
        if !in_header {
            self.print_attrs_inline(&param.attrs, &mut s);
        }
        s.push_str(if param.is_localparam {
            "localparam"
        } else {
            "parameter"
        });
        if param.signed {
            s.push_str(" signed");
        }
        if let Some(range) = &param.range {
            let _ = write!(s, " {}", self.format_range(range));
        }
        let _ = write!(s, " {}", self.name(param.name));
        if let Some(value) = &param.value {
            let mut v = String::new();
            self.write_expr(&mut v, value, 0);
            let _ = write!(s, " = {v}");
        }
        s
    }

    fn format_range(&mut self, range: &Range) -> String {
        let mut msb = String::new();
        let mut lsb = String::new();
        self.write_expr(&mut msb, &range.msb, 0);
        self.write_expr(&mut lsb, &range.lsb, 0);
        format!("[{msb}:{lsb}]")
    }

    // ========================================================================
    // Items
    // ========================================================================

    fn print_module_item(&mut self, item: &ModuleItem) {
        match item {
            ModuleItem::NetDecl(decl) => {
                let mut head = String::new();
                self.print_attrs_inline(&decl.attrs, &mut head);
                head.push_str(net_type_keyword(decl.net_type));
                if decl.signed {
                    head.push_str(" signed");
                }
                if let Some(range) = &decl.range {
                    let _ = write!(head, " {}", self.format_range(range));
                }
                let mut names = String::new();
                for (i, name) in decl.names.iter().enumerate() {
                    if i > 0 {
                        names.push_str(", ");
                    }
                    names.push_str(self.name(name.name));
                    for dim in &name.unpacked_dims {
                        let _ = write!(names, " {}", self.format_range(dim));
                    }
                    if let Some(init) = &name.init {
                        let mut v = String::new();
                        self.write_expr(&mut v, init, 0);
                        let _ = write!(names, " = {v}");
                    }
                }
                self.line(&format!("{head} {names};"));
            }
            ModuleItem::ParamDecl(param) => {
                let text = format!("{};", self.format_parameter(param, false));
                self.line(&text);
            }
            ModuleItem::PortDecl(port) => {
                let text = format!("{};", self.format_port(port));
                self.line(&text);
            }
            ModuleItem::ContinuousAssign(assign) => {
                let mut s = String::new();
                self.print_attrs_inline(&assign.attrs, &mut s);
                let mut lhs = String::new();
                let mut rhs = String::new();
                self.write_expr(&mut lhs, &assign.lhs, 0);
                self.write_expr(&mut rhs, &assign.rhs, 0);
                let _ = write!(s, "assign {lhs} = {rhs};");
                self.line(&s);
            }
            ModuleItem::AlwaysBlock(block) => {
                let mut s = String::new();
                self.print_attrs_inline(&block.attrs, &mut s);
                let _ = write!(s, "always @{}", self.format_sensitivity(&block.sensitivity));
                self.line(&s);
                self.indent += 1;
                self.print_statement(&block.body);
                self.indent -= 1;
            }
            ModuleItem::InitialBlock(block) => {
                let mut s = String::new();
                self.print_attrs_inline(&block.attrs, &mut s);
                s.push_str("initial");
                self.line(&s);
                self.indent += 1;
                self.print_statement(&block.body);
                self.indent -= 1;
            }
            ModuleItem::Instantiation(inst) => self.print_instantiation(inst),
            ModuleItem::GateInst(gate) => {
                let mut s = String::new();
                self.print_attrs_inline(&gate.attrs, &mut s);
                s.push_str(gate_keyword(gate.kind));
                if let Some(name) = gate.name {
                    let _ = write!(s, " {}", self.name(name));
                }
                s.push_str(" (");
                for (i, port) in gate.ports.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    self.write_expr(&mut s, port, 0);
                }
                s.push_str(");");
                self.line(&s);
            }
            ModuleItem::Generate(block) => {
                self.line("generate");
                self.indent += 1;
                self.print_generate(block);
                self.indent -= 1;
                self.line("endgenerate");
            }
            ModuleItem::GenvarDecl(decl) => {
                let names: Vec<&str> = decl.names.iter().map(|&n| self.name(n)).collect();
                self.line(&format!("genvar {};", names.join(", ")));
            }
            ModuleItem::FunctionDecl(f) => self.print_function(f),
            ModuleItem::TaskDecl(t) => self.print_task(t),
            ModuleItem::DefparamDecl(d) => {
                let mut target = String::new();
                let mut value = String::new();
                self.write_expr(&mut target, &d.target, 0);
                self.write_expr(&mut value, &d.value, 0);
                self.line(&format!("defparam {target} = {value};"));
            }
            ModuleItem::Error(_) => self.line("// <parse error>"),
        }
    }

    fn print_instantiation(&mut self, inst: &Instantiation) {
        let mut s = String::new();
        self.print_attrs_inline(&inst.attrs, &mut s);
        s.push_str(self.name(inst.module_name));

        if !inst.param_overrides.is_empty() {
            s.push_str(" #(");
            for (i, conn) in inst.param_overrides.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                self.write_connection(&mut s, conn);
            }
            s.push(')');
        }

        for (i, instance) in inst.instances.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            let _ = write!(s, " {}", self.name(instance.name));
            if let Some(range) = &instance.range {
                let _ = write!(s, " {}", self.format_range(range));
            }
            s.push_str(" (");
            for (j, conn) in instance.connections.iter().enumerate() {
                if j > 0 {
                    s.push_str(", ");
                }
                self.write_connection(&mut s, conn);
            }
            s.push(')');
        }
        s.push(';');
        self.line(&s);
    }

    fn write_connection(&mut self, s: &mut String, conn: &Connection) {
        match (&conn.formal, &conn.actual) {
            (Some(formal), Some(actual)) => {
                let _ = write!(s, ".{}(", self.name(*formal));
                self.write_expr(s, actual, 0);
                s.push(')');
            }
            (Some(formal), None) => {
                let _ = write!(s, ".{}()", self.name(*formal));
            }
            (None, Some(actual)) => self.write_expr(s, actual, 0),
            (None, None) => {}
        }
    }

    fn print_generate(&mut self, block: &GenerateBlock) {
        match block {
            GenerateBlock::For {
                genvar,
                init,
                condition,
                step,
                label,
                items,
                ..
            } => {
                let gv = self.name(*genvar).to_string();
                let mut init_s = String::new();
                let mut cond_s = String::new();
                let mut step_s = String::new();
                self.write_expr(&mut init_s, init, 0);
                self.write_expr(&mut cond_s, condition, 0);
                self.write_expr(&mut step_s, step, 0);
                let label_s = label
                    .map(|l| format!(" : {}", self.name(l)))
                    .unwrap_or_default();
                self.line(&format!(
                    "for ({gv} = {init_s}; {cond_s}; {gv} = {step_s}) begin{label_s}"
                ));
                self.indent += 1;
                for item in items {
                    self.print_module_item(item);
                }
                self.indent -= 1;
                self.line("end");
            }
            GenerateBlock::If {
                condition,
                then_items,
                else_items,
                ..
            } => {
                let mut cond_s = String::new();
                self.write_expr(&mut cond_s, condition, 0);
                self.line(&format!("if ({cond_s}) begin"));
                self.indent += 1;
                for item in then_items {
                    self.print_module_item(item);
                }
                self.indent -= 1;
                if else_items.is_empty() {
                    self.line("end");
                } else {
                    self.line("end else begin");
                    self.indent += 1;
                    for item in else_items {
                        self.print_module_item(item);
                    }
                    self.indent -= 1;
                    self.line("end");
                }
            }
            GenerateBlock::Case { expr, arms, .. } => {
                let mut sel = String::new();
                self.write_expr(&mut sel, expr, 0);
                self.line(&format!("case ({sel})"));
                self.indent += 1;
                for arm in arms {
                    let head = if arm.is_default {
                        "default:".to_string()
                    } else {
                        let mut pats = String::new();
                        for (i, pattern) in arm.patterns.iter().enumerate() {
                            if i > 0 {
                                pats.push_str(", ");
                            }
                            self.write_expr(&mut pats, pattern, 0);
                        }
                        format!("{pats}:")
                    };
                    self.line(&format!("{head} begin"));
                    self.indent += 1;
                    for item in &arm.items {
                        self.print_module_item(item);
                    }
                    self.indent -= 1;
                    self.line("end");
                }
                self.indent -= 1;
                self.line("endcase");
            }
            GenerateBlock::Block { items, .. } => {
                for item in items {
                    self.print_module_item(item);
                }
            }
        }
    }

    fn print_function(&mut self, f: &FunctionDecl) {
        let mut head = String::new();
        self.print_attrs_inline(&f.attrs, &mut head);
        head.push_str("function");
        if f.automatic {
            head.push_str(" automatic");
        }
        if f.signed {
            head.push_str(" signed");
        }
        if let Some(range) = &f.return_range {
            let _ = write!(head, " {}", self.format_range(range));
        }
        let _ = write!(head, " {};", self.name(f.name));
        self.line(&head);
        self.indent += 1;
        for input in &f.inputs {
            let text = format!("{};", self.format_port(input));
            self.line(&text);
        }
        for decl in &f.decls {
            self.print_module_item(decl);
        }
        for stmt in &f.body {
            self.print_statement(stmt);
        }
        self.indent -= 1;
        self.line("endfunction");
    }

    fn print_task(&mut self, t: &TaskDecl) {
        let mut head = String::new();
        self.print_attrs_inline(&t.attrs, &mut head);
        head.push_str("task");
        if t.automatic {
            head.push_str(" automatic");
        }
        let _ = write!(head, " {};", self.name(t.name));
        self.line(&head);
        self.indent += 1;
        for port in &t.ports {
            let text = format!("{};", self.format_port(port));
            self.line(&text);
        }
        for decl in &t.decls {
            self.print_module_item(decl);
        }
        for stmt in &t.body {
            self.print_statement(stmt);
        }
        self.indent -= 1;
        self.line("endtask");
    }

    fn format_sensitivity(&mut self, list: &SensitivityList) -> String {
        match list {
            SensitivityList::Star => "(*)".to_string(),
            SensitivityList::List { items } => {
                let mut s = String::from("(");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        s.push_str(" or ");
                    }
                    match item.edge {
                        Some(EdgeKind::Posedge) => s.push_str("posedge "),
                        Some(EdgeKind::Negedge) => s.push_str("negedge "),
                        None => {}
                    }
                    self.write_expr(&mut s, &item.signal, 0);
                }
                s.push(')');
                s
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn print_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Blocking { lhs, rhs, .. } => {
                let mut l = String::new();
                let mut r = String::new();
                self.write_expr(&mut l, lhs, 0);
                self.write_expr(&mut r, rhs, 0);
                self.line(&format!("{l} = {r};"));
            }
            Statement::NonBlocking { lhs, rhs, .. } => {
                let mut l = String::new();
                let mut r = String::new();
                self.write_expr(&mut l, lhs, 0);
                self.write_expr(&mut r, rhs, 0);
                self.line(&format!("{l} <= {r};"));
            }
            Statement::Block {
                label,
                decls,
                stmts,
                ..
            } => {
                match label {
                    Some(l) => {
                        let text = format!("begin : {}", self.name(*l));
                        self.line(&text);
                    }
                    None => self.line("begin"),
                }
                self.indent += 1;
                for decl in decls {
                    self.print_module_item(decl);
                }
                for s in stmts {
                    self.print_statement(s);
                }
                self.indent -= 1;
                self.line("end");
            }
            Statement::If {
                condition,
                then_stmt,
                else_stmt,
                ..
            } => {
                let mut c = String::new();
                self.write_expr(&mut c, condition, 0);
                self.line(&format!("if ({c})"));
                self.indent += 1;
                self.print_statement(then_stmt);
                self.indent -= 1;
                if let Some(e) = else_stmt {
                    self.line("else");
                    self.indent += 1;
                    self.print_statement(e);
                    self.indent -= 1;
                }
            }
            Statement::Case {
                kind, expr, arms, ..
            } => {
                let kw = match kind {
                    CaseKind::Case => "case",
                    CaseKind::Casex => "casex",
                    CaseKind::Casez => "casez",
                };
                let mut sel = String::new();
                self.write_expr(&mut sel, expr, 0);
                self.line(&format!("{kw} ({sel})"));
                self.indent += 1;
                for arm in arms {
                    let head = if arm.is_default {
                        "default:".to_string()
                    } else {
                        let mut pats = String::new();
                        for (i, pattern) in arm.patterns.iter().enumerate() {
                            if i > 0 {
                                pats.push_str(", ");
                            }
                            self.write_expr(&mut pats, pattern, 0);
                        }
                        format!("{pats}:")
                    };
                    self.line(&head);
                    self.indent += 1;
                    self.print_statement(&arm.body);
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.line("endcase");
            }
            Statement::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                let init_s = self.format_inline_assign(init);
                let mut cond_s = String::new();
                self.write_expr(&mut cond_s, condition, 0);
                let step_s = self.format_inline_assign(step);
                self.line(&format!("for ({init_s}; {cond_s}; {step_s})"));
                self.indent += 1;
                self.print_statement(body);
                self.indent -= 1;
            }
            Statement::While {
                condition, body, ..
            } => {
                let mut c = String::new();
                self.write_expr(&mut c, condition, 0);
                self.line(&format!("while ({c})"));
                self.indent += 1;
                self.print_statement(body);
                self.indent -= 1;
            }
            Statement::Repeat { count, body, .. } => {
                let mut c = String::new();
                self.write_expr(&mut c, count, 0);
                self.line(&format!("repeat ({c})"));
                self.indent += 1;
                self.print_statement(body);
                self.indent -= 1;
            }
            Statement::Forever { body, .. } => {
                self.line("forever");
                self.indent += 1;
                self.print_statement(body);
                self.indent -= 1;
            }
            Statement::Wait {
                condition, body, ..
            } => {
                let mut c = String::new();
                self.write_expr(&mut c, condition, 0);
                match body {
                    Some(b) => {
                        self.line(&format!("wait ({c})"));
                        self.indent += 1;
                        self.print_statement(b);
                        self.indent -= 1;
                    }
                    None => self.line(&format!("wait ({c});")),
                }
            }
            Statement::EventControl {
                sensitivity, body, ..
            } => {
                let text = format!("@{}", self.format_sensitivity(sensitivity));
                self.line(&text);
                self.indent += 1;
                self.print_statement(body);
                self.indent -= 1;
            }
            Statement::Delay { delay, body, .. } => {
                let mut d = String::new();
                self.write_expr(&mut d, delay, 24);
                self.line(&format!("#{d}"));
                self.indent += 1;
                self.print_statement(body);
                self.indent -= 1;
            }
            Statement::EventTrigger { target, .. } => {
                let text = format!("-> {};", self.name(*target));
                self.line(&text);
            }
            Statement::Disable { target, .. } => {
                let text = format!("disable {};", self.name(*target));
                self.line(&text);
            }
            Statement::TaskCall { name, args, .. } => {
                let mut s = self.name(*name).to_string();
                if !args.is_empty() {
                    s.push('(');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            s.push_str(", ");
                        }
                        self.write_expr(&mut s, arg, 0);
                    }
                    s.push(')');
                }
                s.push(';');
                self.line(&s);
            }
            Statement::SystemTaskCall { name, args, .. } => {
                let mut s = self.name(*name).to_string();
                if !args.is_empty() {
                    s.push('(');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            s.push_str(", ");
                        }
                        self.write_expr(&mut s, arg, 0);
                    }
                    s.push(')');
                }
                s.push(';');
                self.line(&s);
            }
            Statement::Null { .. } => self.line(";"),
            Statement::Error(_) => self.line("// <parse error>"),
        }
    }

    fn format_inline_assign(&mut self, stmt: &Statement) -> String {
        match stmt {
            Statement::Blocking { lhs, rhs, .. } => {
                let mut l = String::new();
                let mut r = String::new();
                self.write_expr(&mut l, lhs, 0);
                self.write_expr(&mut r, rhs, 0);
                format!("{l} = {r}")
            }
            _ => String::new(),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn print_expr(&mut self, expr: &Expr, min_prec: u8) {
        let mut s = String::new();
        self.write_expr(&mut s, expr, min_prec);
        self.out.push_str(&s);
    }

    /// Writes `expr`, parenthesizing when its precedence is below
    /// `min_prec`.
    fn write_expr(&mut self, s: &mut String, expr: &Expr, min_prec: u8) {
        let prec = expr_precedence(expr);
        let parens = prec < min_prec;
        if parens {
            s.push('(');
        }
        match expr {
            Expr::Identifier { name, .. } => s.push_str(self.name(*name)),
            Expr::HierarchicalName { parts, .. } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        s.push('.');
                    }
                    s.push_str(self.name(*part));
                }
            }
            Expr::Number { raw, .. } => s.push_str(raw),
            Expr::RealNumber { raw, .. } => s.push_str(raw),
            Expr::StringLiteral { value, .. } => {
                s.push('"');
                for c in value.chars() {
                    match c {
                        '\n' => s.push_str("\\n"),
                        '\t' => s.push_str("\\t"),
                        '\\' => s.push_str("\\\\"),
                        '"' => s.push_str("\\\""),
                        other => s.push(other),
                    }
                }
                s.push('"');
            }
            Expr::Index { base, index, .. } => {
                self.write_expr(s, base, PRIMARY);
                s.push('[');
                self.write_expr(s, index, 0);
                s.push(']');
            }
            Expr::RangeSelect { base, msb, lsb, .. } => {
                self.write_expr(s, base, PRIMARY);
                s.push('[');
                self.write_expr(s, msb, 0);
                s.push(':');
                self.write_expr(s, lsb, 0);
                s.push(']');
            }
            Expr::PartSelect {
                base,
                index,
                ascending,
                width,
                ..
            } => {
                self.write_expr(s, base, PRIMARY);
                s.push('[');
                self.write_expr(s, index, 0);
                s.push_str(if *ascending { "+:" } else { "-:" });
                self.write_expr(s, width, 0);
                s.push(']');
            }
            Expr::Concat { parts, .. } => {
                s.push('{');
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    self.write_expr(s, part, 0);
                }
                s.push('}');
            }
            Expr::Replication { count, parts, .. } => {
                s.push('{');
                self.write_expr(s, count, PRIMARY);
                s.push('{');
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    self.write_expr(s, part, 0);
                }
                s.push_str("}}");
            }
            Expr::Unary { op, operand, .. } => {
                s.push_str(unary_op_text(*op));
                // A primary operand prints bare; anything else (including a
                // nested unary, whose operator could fuse with ours) gets
                // parentheses.
                self.write_expr(s, operand, PRIMARY);
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let (l_prec, r_prec) = binary_child_precs(*op);
                self.write_expr(s, lhs, l_prec);
                let _ = write!(s, " {} ", binary_op_text(*op));
                self.write_expr(s, rhs, r_prec);
            }
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                self.write_expr(s, condition, TERNARY + 1);
                s.push_str(" ? ");
                self.write_expr(s, then_expr, TERNARY + 1);
                s.push_str(" : ");
                self.write_expr(s, else_expr, TERNARY);
            }
            Expr::FunctionCall { name, args, .. } | Expr::SystemCall { name, args, .. } => {
                s.push_str(self.name(*name));
                s.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    self.write_expr(s, arg, 0);
                }
                s.push(')');
            }
            Expr::Error(_) => s.push_str("/* error */ 0"),
        }
        if parens {
            s.push(')');
        }
    }
}

const TERNARY: u8 = 1;
const PRIMARY: u8 = 24;

/// Precedence level of an expression's top node; higher binds tighter.
fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Ternary { .. } => TERNARY,
        Expr::Binary { op, .. } => binary_precedence(*op),
        Expr::Unary { .. } => 23,
        _ => PRIMARY,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::LogOr => 2,
        BinaryOp::LogAnd => 4,
        BinaryOp::BitOr => 6,
        BinaryOp::BitXor | BinaryOp::BitXnor => 8,
        BinaryOp::BitAnd => 10,
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::CaseEq | BinaryOp::CaseNe => 12,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 14,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::AShl | BinaryOp::AShr => 16,
        BinaryOp::Add | BinaryOp::Sub => 18,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 20,
        BinaryOp::Pow => 21,
    }
}

/// Minimum precedences for a binary node's children: equal precedence stays
/// bare on the associative side and parenthesizes on the other.
fn binary_child_precs(op: BinaryOp) -> (u8, u8) {
    let p = binary_precedence(op);
    if matches!(op, BinaryOp::Pow) {
        (p + 1, p) // right-associative
    } else {
        (p, p + 1)
    }
}

fn unary_op_text(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
        UnaryOp::LogNot => "!",
        UnaryOp::BitNot => "~",
        UnaryOp::RedAnd => "&",
        UnaryOp::RedNand => "~&",
        UnaryOp::RedOr => "|",
        UnaryOp::RedNor => "~|",
        UnaryOp::RedXor => "^",
        UnaryOp::RedXnor => "~^",
    }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::CaseEq => "===",
        BinaryOp::CaseNe => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::LogAnd => "&&",
        BinaryOp::LogOr => "||",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::BitXnor => "~^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::AShl => "<<<",
        BinaryOp::AShr => ">>>",
    }
}

fn net_type_keyword(ty: NetType) -> &'static str {
    match ty {
        NetType::Wire => "wire",
        NetType::Reg => "reg",
        NetType::Integer => "integer",
        NetType::Real => "real",
        NetType::Realtime => "realtime",
        NetType::Time => "time",
        NetType::Event => "event",
        NetType::Tri => "tri",
        NetType::Supply0 => "supply0",
        NetType::Supply1 => "supply1",
    }
}

fn gate_keyword(kind: GateKind) -> &'static str {
    match kind {
        GateKind::And => "and",
        GateKind::Or => "or",
        GateKind::Nand => "nand",
        GateKind::Nor => "nor",
        GateKind::Xor => "xor",
        GateKind::Xnor => "xnor",
        GateKind::Not => "not",
        GateKind::Buf => "buf",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser::VerilogParser;
    use silica_common::Interner;
    use silica_diagnostics::DiagnosticSink;
    use silica_source::FileId;

    fn parse(source: &str, interner: &Interner) -> VerilogSourceFile {
        let sink = DiagnosticSink::new();
        let file = FileId::from_raw(0);
        let tokens = lexer::lex(source, file, &sink);
        let mut parser = VerilogParser::new(tokens, source, file, interner, &sink);
        let ast = parser.parse_source_file();
        assert!(
            !sink.has_errors(),
            "parse of {source:?} failed: {:?}",
            sink.diagnostics()
        );
        ast
    }

    fn print(ast: &VerilogSourceFile, interner: &Interner) -> String {
        Printer::new(interner).print_source_file(ast)
    }

    /// Printing is a fixpoint: print → parse → print reproduces the text.
    fn assert_roundtrip(source: &str) {
        let interner = Interner::new();
        let once = print(&parse(source, &interner), &interner);
        let twice = print(&parse(&once, &interner), &interner);
        assert_eq!(once, twice, "printer not stable for:\n{source}");
    }

    #[test]
    fn expr_precedence_parens() {
        let interner = Interner::new();
        let ast = parse("module t(output y); assign y = (a + b) * c; endmodule", &interner);
        let text = print(&ast, &interner);
        assert!(text.contains("assign y = (a + b) * c;"), "got:\n{text}");
    }

    #[test]
    fn no_spurious_parens() {
        let interner = Interner::new();
        let ast = parse("module t(output y); assign y = a + b * c; endmodule", &interner);
        let text = print(&ast, &interner);
        assert!(text.contains("assign y = a + b * c;"), "got:\n{text}");
    }

    #[test]
    fn number_raw_preserved() {
        let interner = Interner::new();
        let ast = parse(
            "module t(output [7:0] y); assign y = 8'b1111_1111; endmodule",
            &interner,
        );
        let text = print(&ast, &interner);
        assert!(text.contains("8'b1111_1111"), "got:\n{text}");
    }

    #[test]
    fn roundtrip_combinational_module() {
        assert_roundtrip(
            "module m(input a, input b, output c);
                assign c = a & b;
            endmodule",
        );
    }

    #[test]
    fn roundtrip_sequential_module() {
        assert_roundtrip(
            "module counter(input clk, input rst, input en, output reg [7:0] count);
                always @(posedge clk) begin
                    if (rst)
                        count <= 8'd0;
                    else if (en)
                        count <= count + 8'd1;
                end
            endmodule",
        );
    }

    #[test]
    fn roundtrip_case_and_selects() {
        assert_roundtrip(
            "module mux4(input [1:0] sel, input [3:0] d, output reg y);
                always @(*)
                    case (sel)
                        2'b00: y = d[0];
                        2'b01: y = d[1];
                        2'b10: y = d[2];
                        default: y = d[3];
                    endcase
            endmodule",
        );
    }

    #[test]
    fn roundtrip_instantiation_and_generate() {
        assert_roundtrip(
            "module top(input [3:0] a, b, output [3:0] s);
                genvar i;
                generate
                    for (i = 0; i < 4; i = i + 1) begin : bits
                        full_adder fa (.a(a[i]), .b(b[i]), .s(s[i]));
                    end
                endgenerate
            endmodule",
        );
    }

    #[test]
    fn roundtrip_parameters_and_memory() {
        assert_roundtrip(
            "module ram #(parameter WIDTH = 8, parameter DEPTH = 256)(
                input clk,
                input [7:0] addr,
                input [WIDTH-1:0] din,
                output [WIDTH-1:0] dout
            );
                reg [WIDTH-1:0] mem [0:DEPTH-1];
                always @(posedge clk)
                    mem[addr] <= din;
                assign dout = mem[addr];
            endmodule",
        );
    }

    #[test]
    fn roundtrip_unary_and_ternary() {
        assert_roundtrip(
            "module t(input [7:0] a, b, input s, output [7:0] y, output p);
                assign y = s ? ~a : a - b;
                assign p = ^(a ^ b);
            endmodule",
        );
    }

    #[test]
    fn roundtrip_attributes() {
        assert_roundtrip(
            "module t(input a, output y);
                (* keep *) wire w;
                assign w = a;
                assign y = w;
            endmodule",
        );
    }
}
