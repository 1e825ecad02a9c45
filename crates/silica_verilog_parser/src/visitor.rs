//! Traversal and rewriting over the Verilog AST.
//!
//! [`Visit`] is the read-only walk: implement the `visit_*` hooks you care
//! about and call the matching `walk_*` function to recurse into child
//! slots. [`Transform`] is the rewriting walk: each hook consumes a node and
//! returns its (possibly new) replacement; the default implementations
//! rebuild every child slot through the transformer, so an override only has
//! to handle the variants it rewrites. Generate unrolling uses `Transform`
//! to substitute genvars with their constant values.

use crate::ast::*;

/// Read-only AST visitor with default recursion.
pub trait Visit {
    /// Visits a source file.
    fn visit_source_file(&mut self, file: &VerilogSourceFile) {
        walk_source_file(self, file);
    }

    /// Visits a module declaration.
    fn visit_module(&mut self, module: &ModuleDecl) {
        walk_module(self, module);
    }

    /// Visits a module item.
    fn visit_module_item(&mut self, item: &ModuleItem) {
        walk_module_item(self, item);
    }

    /// Visits a statement.
    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    /// Visits an expression.
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    /// Visits a range.
    fn visit_range(&mut self, range: &Range) {
        self.visit_expr(&range.msb);
        self.visit_expr(&range.lsb);
    }
}

/// Recurses into every module of a source file.
pub fn walk_source_file<V: Visit + ?Sized>(v: &mut V, file: &VerilogSourceFile) {
    for item in &file.items {
        if let VerilogItem::Module(m) = item {
            v.visit_module(m);
        }
    }
}

/// Recurses into a module's parameters, ports, and items.
pub fn walk_module<V: Visit + ?Sized>(v: &mut V, module: &ModuleDecl) {
    for param in &module.params {
        if let Some(range) = &param.range {
            v.visit_range(range);
        }
        if let Some(value) = &param.value {
            v.visit_expr(value);
        }
    }
    for port in &module.ports {
        if let Some(range) = &port.range {
            v.visit_range(range);
        }
        for dim in &port.unpacked_dims {
            v.visit_range(dim);
        }
    }
    for item in &module.items {
        v.visit_module_item(item);
    }
}

/// Recurses into a module item's child slots.
pub fn walk_module_item<V: Visit + ?Sized>(v: &mut V, item: &ModuleItem) {
    match item {
        ModuleItem::NetDecl(decl) => {
            if let Some(range) = &decl.range {
                v.visit_range(range);
            }
            for name in &decl.names {
                for dim in &name.unpacked_dims {
                    v.visit_range(dim);
                }
                if let Some(init) = &name.init {
                    v.visit_expr(init);
                }
            }
        }
        ModuleItem::ParamDecl(decl) => {
            if let Some(range) = &decl.range {
                v.visit_range(range);
            }
            if let Some(value) = &decl.value {
                v.visit_expr(value);
            }
        }
        ModuleItem::PortDecl(decl) => {
            if let Some(range) = &decl.range {
                v.visit_range(range);
            }
        }
        ModuleItem::ContinuousAssign(assign) => {
            v.visit_expr(&assign.lhs);
            v.visit_expr(&assign.rhs);
        }
        ModuleItem::AlwaysBlock(block) => {
            if let SensitivityList::List { items } = &block.sensitivity {
                for item in items {
                    v.visit_expr(&item.signal);
                }
            }
            v.visit_statement(&block.body);
        }
        ModuleItem::InitialBlock(block) => v.visit_statement(&block.body),
        ModuleItem::Instantiation(inst) => {
            for conn in &inst.param_overrides {
                if let Some(actual) = &conn.actual {
                    v.visit_expr(actual);
                }
            }
            for instance in &inst.instances {
                for conn in &instance.connections {
                    if let Some(actual) = &conn.actual {
                        v.visit_expr(actual);
                    }
                }
            }
        }
        ModuleItem::GateInst(gate) => {
            for port in &gate.ports {
                v.visit_expr(port);
            }
        }
        ModuleItem::Generate(block) => walk_generate(v, block),
        ModuleItem::GenvarDecl(_) => {}
        ModuleItem::FunctionDecl(f) => {
            for stmt in &f.body {
                v.visit_statement(stmt);
            }
        }
        ModuleItem::TaskDecl(t) => {
            for stmt in &t.body {
                v.visit_statement(stmt);
            }
        }
        ModuleItem::DefparamDecl(d) => {
            v.visit_expr(&d.target);
            v.visit_expr(&d.value);
        }
        ModuleItem::Error(_) => {}
    }
}

fn walk_generate<V: Visit + ?Sized>(v: &mut V, block: &GenerateBlock) {
    match block {
        GenerateBlock::For {
            init,
            condition,
            step,
            items,
            ..
        } => {
            v.visit_expr(init);
            v.visit_expr(condition);
            v.visit_expr(step);
            for item in items {
                v.visit_module_item(item);
            }
        }
        GenerateBlock::If {
            condition,
            then_items,
            else_items,
            ..
        } => {
            v.visit_expr(condition);
            for item in then_items.iter().chain(else_items) {
                v.visit_module_item(item);
            }
        }
        GenerateBlock::Case { expr, arms, .. } => {
            v.visit_expr(expr);
            for arm in arms {
                for pattern in &arm.patterns {
                    v.visit_expr(pattern);
                }
                for item in &arm.items {
                    v.visit_module_item(item);
                }
            }
        }
        GenerateBlock::Block { items, .. } => {
            for item in items {
                v.visit_module_item(item);
            }
        }
    }
}

/// Recurses into a statement's child slots.
pub fn walk_statement<V: Visit + ?Sized>(v: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Blocking { lhs, rhs, .. } | Statement::NonBlocking { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Statement::Block { decls, stmts, .. } => {
            for decl in decls {
                v.visit_module_item(decl);
            }
            for s in stmts {
                v.visit_statement(s);
            }
        }
        Statement::If {
            condition,
            then_stmt,
            else_stmt,
            ..
        } => {
            v.visit_expr(condition);
            v.visit_statement(then_stmt);
            if let Some(e) = else_stmt {
                v.visit_statement(e);
            }
        }
        Statement::Case { expr, arms, .. } => {
            v.visit_expr(expr);
            for arm in arms {
                for pattern in &arm.patterns {
                    v.visit_expr(pattern);
                }
                v.visit_statement(&arm.body);
            }
        }
        Statement::For {
            init,
            condition,
            step,
            body,
            ..
        } => {
            v.visit_statement(init);
            v.visit_expr(condition);
            v.visit_statement(step);
            v.visit_statement(body);
        }
        Statement::While {
            condition, body, ..
        } => {
            v.visit_expr(condition);
            v.visit_statement(body);
        }
        Statement::Repeat { count, body, .. } => {
            v.visit_expr(count);
            v.visit_statement(body);
        }
        Statement::Forever { body, .. } => v.visit_statement(body),
        Statement::Wait {
            condition, body, ..
        } => {
            v.visit_expr(condition);
            if let Some(b) = body {
                v.visit_statement(b);
            }
        }
        Statement::EventControl {
            sensitivity, body, ..
        } => {
            if let SensitivityList::List { items } = sensitivity {
                for item in items {
                    v.visit_expr(&item.signal);
                }
            }
            v.visit_statement(body);
        }
        Statement::Delay { delay, body, .. } => {
            v.visit_expr(delay);
            v.visit_statement(body);
        }
        Statement::TaskCall { args, .. } | Statement::SystemTaskCall { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Statement::EventTrigger { .. }
        | Statement::Disable { .. }
        | Statement::Null { .. }
        | Statement::Error(_) => {}
    }
}

/// Recurses into an expression's child slots.
pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Index { base, index, .. } => {
            v.visit_expr(base);
            v.visit_expr(index);
        }
        Expr::RangeSelect { base, msb, lsb, .. } => {
            v.visit_expr(base);
            v.visit_expr(msb);
            v.visit_expr(lsb);
        }
        Expr::PartSelect {
            base, index, width, ..
        } => {
            v.visit_expr(base);
            v.visit_expr(index);
            v.visit_expr(width);
        }
        Expr::Concat { parts, .. } => {
            for part in parts {
                v.visit_expr(part);
            }
        }
        Expr::Replication { count, parts, .. } => {
            v.visit_expr(count);
            for part in parts {
                v.visit_expr(part);
            }
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
            ..
        } => {
            v.visit_expr(condition);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        Expr::FunctionCall { args, .. } | Expr::SystemCall { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Identifier { .. }
        | Expr::HierarchicalName { .. }
        | Expr::Number { .. }
        | Expr::RealNumber { .. }
        | Expr::StringLiteral { .. }
        | Expr::Error(_) => {}
    }
}

/// Rewriting AST walk: each hook returns the node that replaces the
/// original in its parent slot.
pub trait Transform {
    /// Transforms an expression.
    fn transform_expr(&mut self, expr: Expr) -> Expr {
        map_expr(self, expr)
    }

    /// Transforms a statement.
    fn transform_statement(&mut self, stmt: Statement) -> Statement {
        map_statement(self, stmt)
    }

    /// Transforms a module item.
    fn transform_module_item(&mut self, item: ModuleItem) -> ModuleItem {
        map_module_item(self, item)
    }

    /// Transforms a range.
    fn transform_range(&mut self, range: Range) -> Range {
        Range {
            msb: self.transform_expr(range.msb),
            lsb: self.transform_expr(range.lsb),
            span: range.span,
        }
    }
}

/// Rebuilds an expression with every child passed through the transformer.
pub fn map_expr<T: Transform + ?Sized>(t: &mut T, expr: Expr) -> Expr {
    match expr {
        Expr::Index { base, index, span } => Expr::Index {
            base: Box::new(t.transform_expr(*base)),
            index: Box::new(t.transform_expr(*index)),
            span,
        },
        Expr::RangeSelect {
            base,
            msb,
            lsb,
            span,
        } => Expr::RangeSelect {
            base: Box::new(t.transform_expr(*base)),
            msb: Box::new(t.transform_expr(*msb)),
            lsb: Box::new(t.transform_expr(*lsb)),
            span,
        },
        Expr::PartSelect {
            base,
            index,
            ascending,
            width,
            span,
        } => Expr::PartSelect {
            base: Box::new(t.transform_expr(*base)),
            index: Box::new(t.transform_expr(*index)),
            ascending,
            width: Box::new(t.transform_expr(*width)),
            span,
        },
        Expr::Concat { parts, span } => Expr::Concat {
            parts: parts.into_iter().map(|p| t.transform_expr(p)).collect(),
            span,
        },
        Expr::Replication { count, parts, span } => Expr::Replication {
            count: Box::new(t.transform_expr(*count)),
            parts: parts.into_iter().map(|p| t.transform_expr(p)).collect(),
            span,
        },
        Expr::Unary { op, operand, span } => Expr::Unary {
            op,
            operand: Box::new(t.transform_expr(*operand)),
            span,
        },
        Expr::Binary { op, lhs, rhs, span } => Expr::Binary {
            op,
            lhs: Box::new(t.transform_expr(*lhs)),
            rhs: Box::new(t.transform_expr(*rhs)),
            span,
        },
        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
            span,
        } => Expr::Ternary {
            condition: Box::new(t.transform_expr(*condition)),
            then_expr: Box::new(t.transform_expr(*then_expr)),
            else_expr: Box::new(t.transform_expr(*else_expr)),
            span,
        },
        Expr::FunctionCall { name, args, span } => Expr::FunctionCall {
            name,
            args: args.into_iter().map(|a| t.transform_expr(a)).collect(),
            span,
        },
        Expr::SystemCall { name, args, span } => Expr::SystemCall {
            name,
            args: args.into_iter().map(|a| t.transform_expr(a)).collect(),
            span,
        },
        leaf @ (Expr::Identifier { .. }
        | Expr::HierarchicalName { .. }
        | Expr::Number { .. }
        | Expr::RealNumber { .. }
        | Expr::StringLiteral { .. }
        | Expr::Error(_)) => leaf,
    }
}

/// Rebuilds a statement with every child passed through the transformer.
pub fn map_statement<T: Transform + ?Sized>(t: &mut T, stmt: Statement) -> Statement {
    match stmt {
        Statement::Blocking { lhs, rhs, span } => Statement::Blocking {
            lhs: t.transform_expr(lhs),
            rhs: t.transform_expr(rhs),
            span,
        },
        Statement::NonBlocking { lhs, rhs, span } => Statement::NonBlocking {
            lhs: t.transform_expr(lhs),
            rhs: t.transform_expr(rhs),
            span,
        },
        Statement::Block {
            label,
            decls,
            stmts,
            span,
        } => Statement::Block {
            label,
            decls: decls
                .into_iter()
                .map(|d| t.transform_module_item(d))
                .collect(),
            stmts: stmts
                .into_iter()
                .map(|s| t.transform_statement(s))
                .collect(),
            span,
        },
        Statement::If {
            condition,
            then_stmt,
            else_stmt,
            span,
        } => Statement::If {
            condition: t.transform_expr(condition),
            then_stmt: Box::new(t.transform_statement(*then_stmt)),
            else_stmt: else_stmt.map(|e| Box::new(t.transform_statement(*e))),
            span,
        },
        Statement::Case {
            kind,
            expr,
            arms,
            span,
        } => Statement::Case {
            kind,
            expr: t.transform_expr(expr),
            arms: arms
                .into_iter()
                .map(|arm| CaseArm {
                    patterns: arm
                        .patterns
                        .into_iter()
                        .map(|p| t.transform_expr(p))
                        .collect(),
                    is_default: arm.is_default,
                    body: t.transform_statement(arm.body),
                    span: arm.span,
                })
                .collect(),
            span,
        },
        Statement::For {
            init,
            condition,
            step,
            body,
            span,
        } => Statement::For {
            init: Box::new(t.transform_statement(*init)),
            condition: t.transform_expr(condition),
            step: Box::new(t.transform_statement(*step)),
            body: Box::new(t.transform_statement(*body)),
            span,
        },
        Statement::While {
            condition,
            body,
            span,
        } => Statement::While {
            condition: t.transform_expr(condition),
            body: Box::new(t.transform_statement(*body)),
            span,
        },
        Statement::Repeat { count, body, span } => Statement::Repeat {
            count: t.transform_expr(count),
            body: Box::new(t.transform_statement(*body)),
            span,
        },
        Statement::Forever { body, span } => Statement::Forever {
            body: Box::new(t.transform_statement(*body)),
            span,
        },
        Statement::Wait {
            condition,
            body,
            span,
        } => Statement::Wait {
            condition: t.transform_expr(condition),
            body: body.map(|b| Box::new(t.transform_statement(*b))),
            span,
        },
        Statement::EventControl {
            sensitivity,
            body,
            span,
        } => Statement::EventControl {
            sensitivity: map_sensitivity(t, sensitivity),
            body: Box::new(t.transform_statement(*body)),
            span,
        },
        Statement::Delay { delay, body, span } => Statement::Delay {
            delay: t.transform_expr(delay),
            body: Box::new(t.transform_statement(*body)),
            span,
        },
        Statement::TaskCall { name, args, span } => Statement::TaskCall {
            name,
            args: args.into_iter().map(|a| t.transform_expr(a)).collect(),
            span,
        },
        Statement::SystemTaskCall { name, args, span } => Statement::SystemTaskCall {
            name,
            args: args.into_iter().map(|a| t.transform_expr(a)).collect(),
            span,
        },
        leaf @ (Statement::EventTrigger { .. }
        | Statement::Disable { .. }
        | Statement::Null { .. }
        | Statement::Error(_)) => leaf,
    }
}

fn map_sensitivity<T: Transform + ?Sized>(t: &mut T, list: SensitivityList) -> SensitivityList {
    match list {
        SensitivityList::Star => SensitivityList::Star,
        SensitivityList::List { items } => SensitivityList::List {
            items: items
                .into_iter()
                .map(|item| SensitivityItem {
                    edge: item.edge,
                    signal: t.transform_expr(item.signal),
                    span: item.span,
                })
                .collect(),
        },
    }
}

/// Rebuilds a module item with every child passed through the transformer.
pub fn map_module_item<T: Transform + ?Sized>(t: &mut T, item: ModuleItem) -> ModuleItem {
    match item {
        ModuleItem::NetDecl(decl) => ModuleItem::NetDecl(NetDecl {
            net_type: decl.net_type,
            signed: decl.signed,
            range: decl.range.map(|r| t.transform_range(r)),
            names: decl
                .names
                .into_iter()
                .map(|n| DeclName {
                    name: n.name,
                    unpacked_dims: n
                        .unpacked_dims
                        .into_iter()
                        .map(|d| t.transform_range(d))
                        .collect(),
                    init: n.init.map(|i| t.transform_expr(i)),
                    span: n.span,
                })
                .collect(),
            attrs: decl.attrs,
            span: decl.span,
        }),
        ModuleItem::ParamDecl(decl) => ModuleItem::ParamDecl(ParameterDecl {
            is_localparam: decl.is_localparam,
            signed: decl.signed,
            range: decl.range.map(|r| t.transform_range(r)),
            name: decl.name,
            value: decl.value.map(|v| t.transform_expr(v)),
            attrs: decl.attrs,
            span: decl.span,
        }),
        ModuleItem::ContinuousAssign(assign) => ModuleItem::ContinuousAssign(ContinuousAssign {
            lhs: t.transform_expr(assign.lhs),
            rhs: t.transform_expr(assign.rhs),
            attrs: assign.attrs,
            span: assign.span,
        }),
        ModuleItem::AlwaysBlock(block) => ModuleItem::AlwaysBlock(AlwaysBlock {
            sensitivity: map_sensitivity(t, block.sensitivity),
            body: t.transform_statement(block.body),
            attrs: block.attrs,
            span: block.span,
        }),
        ModuleItem::InitialBlock(block) => ModuleItem::InitialBlock(InitialBlock {
            body: t.transform_statement(block.body),
            attrs: block.attrs,
            span: block.span,
        }),
        ModuleItem::Instantiation(inst) => ModuleItem::Instantiation(Instantiation {
            module_name: inst.module_name,
            param_overrides: inst
                .param_overrides
                .into_iter()
                .map(|c| map_connection(t, c))
                .collect(),
            instances: inst
                .instances
                .into_iter()
                .map(|i| Instance {
                    name: i.name,
                    range: i.range.map(|r| t.transform_range(r)),
                    connections: i
                        .connections
                        .into_iter()
                        .map(|c| map_connection(t, c))
                        .collect(),
                    span: i.span,
                })
                .collect(),
            attrs: inst.attrs,
            span: inst.span,
        }),
        ModuleItem::GateInst(gate) => ModuleItem::GateInst(GateInst {
            kind: gate.kind,
            name: gate.name,
            ports: gate
                .ports
                .into_iter()
                .map(|p| t.transform_expr(p))
                .collect(),
            attrs: gate.attrs,
            span: gate.span,
        }),
        ModuleItem::Generate(block) => ModuleItem::Generate(map_generate(t, block)),
        leaf @ (ModuleItem::PortDecl(_)
        | ModuleItem::GenvarDecl(_)
        | ModuleItem::FunctionDecl(_)
        | ModuleItem::TaskDecl(_)
        | ModuleItem::DefparamDecl(_)
        | ModuleItem::Error(_)) => leaf,
    }
}

fn map_connection<T: Transform + ?Sized>(t: &mut T, conn: Connection) -> Connection {
    Connection {
        formal: conn.formal,
        actual: conn.actual.map(|a| t.transform_expr(a)),
        span: conn.span,
    }
}

fn map_generate<T: Transform + ?Sized>(t: &mut T, block: GenerateBlock) -> GenerateBlock {
    match block {
        GenerateBlock::For {
            genvar,
            init,
            condition,
            step,
            label,
            items,
            span,
        } => GenerateBlock::For {
            genvar,
            init: t.transform_expr(init),
            condition: t.transform_expr(condition),
            step: t.transform_expr(step),
            label,
            items: items
                .into_iter()
                .map(|i| t.transform_module_item(i))
                .collect(),
            span,
        },
        GenerateBlock::If {
            condition,
            then_items,
            else_items,
            span,
        } => GenerateBlock::If {
            condition: t.transform_expr(condition),
            then_items: then_items
                .into_iter()
                .map(|i| t.transform_module_item(i))
                .collect(),
            else_items: else_items
                .into_iter()
                .map(|i| t.transform_module_item(i))
                .collect(),
            span,
        },
        GenerateBlock::Case { expr, arms, span } => GenerateBlock::Case {
            expr: t.transform_expr(expr),
            arms: arms
                .into_iter()
                .map(|arm| GenerateCaseArm {
                    patterns: arm
                        .patterns
                        .into_iter()
                        .map(|p| t.transform_expr(p))
                        .collect(),
                    is_default: arm.is_default,
                    items: arm
                        .items
                        .into_iter()
                        .map(|i| t.transform_module_item(i))
                        .collect(),
                    span: arm.span,
                })
                .collect(),
            span,
        },
        GenerateBlock::Block { items, span } => GenerateBlock::Block {
            items: items
                .into_iter()
                .map(|i| t.transform_module_item(i))
                .collect(),
            span,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser::VerilogParser;
    use silica_common::{Ident, Interner};
    use silica_diagnostics::DiagnosticSink;
    use silica_source::FileId;

    fn parse(source: &str, interner: &Interner) -> VerilogSourceFile {
        let sink = DiagnosticSink::new();
        let file = FileId::from_raw(0);
        let tokens = lexer::lex(source, file, &sink);
        let mut parser = VerilogParser::new(tokens, source, file, interner, &sink);
        let ast = parser.parse_source_file();
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        ast
    }

    struct IdentCounter {
        target: Ident,
        count: usize,
    }

    impl Visit for IdentCounter {
        fn visit_expr(&mut self, expr: &Expr) {
            if let Expr::Identifier { name, .. } = expr {
                if *name == self.target {
                    self.count += 1;
                }
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn visitor_counts_identifier_uses() {
        let interner = Interner::new();
        let ast = parse(
            "module t(input a, b, output y);
                assign y = (a & b) | (a ^ b);
            endmodule",
            &interner,
        );
        let mut counter = IdentCounter {
            target: interner.intern("a"),
            count: 0,
        };
        counter.visit_source_file(&ast);
        assert_eq!(counter.count, 2);
    }

    struct Substitute {
        from: Ident,
        value: u64,
    }

    impl Transform for Substitute {
        fn transform_expr(&mut self, expr: Expr) -> Expr {
            match expr {
                Expr::Identifier { name, span } if name == self.from => Expr::Number {
                    value: self.value,
                    width: 32,
                    signed: true,
                    raw: self.value.to_string(),
                    span,
                },
                other => map_expr(self, other),
            }
        }
    }

    #[test]
    fn transformer_substitutes_in_place() {
        let interner = Interner::new();
        let ast = parse(
            "module t(output [7:0] y); assign y = i + i * 2; endmodule",
            &interner,
        );
        let module = match &ast.items[0] {
            VerilogItem::Module(m) => m.clone(),
            VerilogItem::Error(_) => panic!(),
        };
        let mut subst = Substitute {
            from: interner.intern("i"),
            value: 3,
        };
        let rewritten = subst.transform_module_item(module.items[0].clone());

        let mut counter = IdentCounter {
            target: interner.intern("i"),
            count: 0,
        };
        counter.visit_module_item(&rewritten);
        assert_eq!(counter.count, 0, "all uses of `i` replaced");
    }

    #[test]
    fn transformer_reaches_generate_bodies() {
        let interner = Interner::new();
        let ast = parse(
            "module t;
                genvar g;
                for (g = 0; g < 2; g = g + 1) begin : u
                    assign y[g] = a[g];
                end
            endmodule",
            &interner,
        );
        let module = match &ast.items[0] {
            VerilogItem::Module(m) => m.clone(),
            VerilogItem::Error(_) => panic!(),
        };
        let mut subst = Substitute {
            from: interner.intern("g"),
            value: 1,
        };
        let rewritten = subst.transform_module_item(module.items[1].clone());
        let mut counter = IdentCounter {
            target: interner.intern("g"),
            count: 0,
        };
        counter.visit_module_item(&rewritten);
        assert_eq!(counter.count, 0);
    }
}
