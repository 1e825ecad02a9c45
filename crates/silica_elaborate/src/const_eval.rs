//! Compile-time constant evaluation.
//!
//! Evaluates parameter values, ranges, genvar bounds, and case selectors
//! over a [`ConstEnv`] of bindings. Environments are persistent scope
//! chains: extending one produces a child sharing the parent, so generate
//! unrolling can specialize the same body under different genvar values
//! without side effects.
//!
//! Folding is all-or-nothing per node: an operator folds only when every
//! operand folds, and any non-constant operand stops evaluation at that
//! node (the caller then lowers to cells instead).

use crate::errors;
use silica_common::{Ident, Interner};
use silica_diagnostics::Diagnostic;
use silica_verilog_parser::ast::{BinaryOp, Expr, UnaryOp};
use std::collections::HashMap;
use std::rc::Rc;

/// A constant value: integer or real.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ConstValue {
    /// A (signed) integer.
    Int(i64),
    /// A real number.
    Real(f64),
}

impl ConstValue {
    /// The value as an integer; reals truncate toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            ConstValue::Int(v) => v,
            ConstValue::Real(f) => f as i64,
        }
    }

    /// The value as a real.
    pub fn as_f64(self) -> f64 {
        match self {
            ConstValue::Int(v) => v as f64,
            ConstValue::Real(f) => f,
        }
    }

    fn is_real(self) -> bool {
        matches!(self, ConstValue::Real(_))
    }
}

/// A persistent chain of constant bindings.
///
/// `extend`/`bind` return a new environment whose parent is `self`; lookups
/// walk child to parent, so inner bindings shadow outer ones.
#[derive(Clone, Default)]
pub struct ConstEnv(Option<Rc<Frame>>);

struct Frame {
    vars: HashMap<Ident, ConstValue>,
    parent: ConstEnv,
}

impl ConstEnv {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self(None)
    }

    /// Returns a child environment with the given bindings added.
    pub fn extend(&self, vars: HashMap<Ident, ConstValue>) -> ConstEnv {
        ConstEnv(Some(Rc::new(Frame {
            vars,
            parent: self.clone(),
        })))
    }

    /// Returns a child environment with one binding added.
    pub fn bind(&self, name: Ident, value: ConstValue) -> ConstEnv {
        self.extend(HashMap::from([(name, value)]))
    }

    /// Looks up a binding, innermost scope first.
    pub fn lookup(&self, name: Ident) -> Option<ConstValue> {
        let mut frame = &self.0;
        while let Some(f) = frame {
            if let Some(&v) = f.vars.get(&name) {
                return Some(v);
            }
            frame = &f.parent.0;
        }
        None
    }
}

/// Sign-interprets a literal's resolved bits.
pub fn literal_value(value: u64, width: u32, signed: bool) -> i64 {
    if signed && width < 64 && width > 0 && (value >> (width - 1)) & 1 != 0 {
        value as i64 - (1i64 << width)
    } else {
        value as i64
    }
}

/// `$clog2` per IEEE 1364-2005: ceil(log2(n)), with `clog2(0) = 0` and
/// `clog2(1) = 0`.
pub fn clog2(n: i64) -> i64 {
    if n <= 1 {
        return 0;
    }
    let mut result = 0;
    let mut v = n - 1;
    while v > 0 {
        result += 1;
        v >>= 1;
    }
    result
}

/// Evaluates a constant expression.
///
/// Returns `Err` with a positioned diagnostic when the expression is not
/// constant over `env`, divides by zero, or uses an operator with no
/// constant meaning.
pub fn eval(expr: &Expr, env: &ConstEnv, interner: &Interner) -> Result<ConstValue, Diagnostic> {
    match expr {
        Expr::Number {
            value,
            width,
            signed,
            ..
        } => Ok(ConstValue::Int(literal_value(*value, *width, *signed))),

        Expr::RealNumber { value, .. } => Ok(ConstValue::Real(*value)),

        Expr::Identifier { name, span } => env.lookup(*name).ok_or_else(|| {
            errors::not_constant(
                &format!("`{}`", interner.resolve(*name)),
                *span,
            )
        }),

        Expr::Unary { op, operand, span } => {
            let v = eval(operand, env, interner)?;
            match op {
                UnaryOp::Plus => Ok(v),
                UnaryOp::Minus => Ok(match v {
                    ConstValue::Int(i) => ConstValue::Int(-i),
                    ConstValue::Real(f) => ConstValue::Real(-f),
                }),
                UnaryOp::LogNot => Ok(ConstValue::Int((v.as_i64() == 0) as i64)),
                UnaryOp::BitNot => Ok(ConstValue::Int(!v.as_i64())),
                _ => Err(errors::not_constant("reduction operand", *span)),
            }
        }

        Expr::Binary { op, lhs, rhs, span } => {
            let l = eval(lhs, env, interner)?;
            let r = eval(rhs, env, interner)?;
            eval_binary(*op, l, r, *span)
        }

        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
            ..
        } => {
            if eval(condition, env, interner)?.as_i64() != 0 {
                eval(then_expr, env, interner)
            } else {
                eval(else_expr, env, interner)
            }
        }

        Expr::SystemCall { name, args, span } => {
            eval_system_call(interner.resolve(*name), args, env, interner, *span)
        }

        other => Err(errors::not_constant("expression", other.span())),
    }
}

fn eval_binary(
    op: BinaryOp,
    l: ConstValue,
    r: ConstValue,
    span: silica_source::Span,
) -> Result<ConstValue, Diagnostic> {
    use BinaryOp::*;

    // Mixed int/real arithmetic promotes to real (IEEE 1364-2005 §5).
    if l.is_real() || r.is_real() {
        let (a, b) = (l.as_f64(), r.as_f64());
        return match op {
            Add => Ok(ConstValue::Real(a + b)),
            Sub => Ok(ConstValue::Real(a - b)),
            Mul => Ok(ConstValue::Real(a * b)),
            Div => {
                if b == 0.0 {
                    Err(errors::divide_by_zero(span))
                } else {
                    Ok(ConstValue::Real(a / b))
                }
            }
            Pow => Ok(ConstValue::Real(a.powf(b))),
            Eq => Ok(ConstValue::Int((a == b) as i64)),
            Ne => Ok(ConstValue::Int((a != b) as i64)),
            Lt => Ok(ConstValue::Int((a < b) as i64)),
            Le => Ok(ConstValue::Int((a <= b) as i64)),
            Gt => Ok(ConstValue::Int((a > b) as i64)),
            Ge => Ok(ConstValue::Int((a >= b) as i64)),
            _ => Err(errors::not_constant("real operand", span)),
        };
    }

    let (a, b) = (l.as_i64(), r.as_i64());
    let v = match op {
        Add => a.wrapping_add(b),
        Sub => a.wrapping_sub(b),
        Mul => a.wrapping_mul(b),
        Div => {
            if b == 0 {
                return Err(errors::divide_by_zero(span));
            }
            a.wrapping_div(b)
        }
        Mod => {
            if b == 0 {
                return Err(errors::divide_by_zero(span));
            }
            a.wrapping_rem(b)
        }
        Pow => {
            if b < 0 {
                0
            } else {
                a.wrapping_pow(b.min(63) as u32)
            }
        }
        Eq | CaseEq => (a == b) as i64,
        Ne | CaseNe => (a != b) as i64,
        Lt => (a < b) as i64,
        Le => (a <= b) as i64,
        Gt => (a > b) as i64,
        Ge => (a >= b) as i64,
        LogAnd => (a != 0 && b != 0) as i64,
        LogOr => (a != 0 || b != 0) as i64,
        BitAnd => a & b,
        BitOr => a | b,
        BitXor => a ^ b,
        BitXnor => !(a ^ b),
        Shl | AShl => a.wrapping_shl(b.clamp(0, 63) as u32),
        Shr => ((a as u64).wrapping_shr(b.clamp(0, 63) as u32)) as i64,
        AShr => a.wrapping_shr(b.clamp(0, 63) as u32),
    };
    Ok(ConstValue::Int(v))
}

fn eval_system_call(
    name: &str,
    args: &[Expr],
    env: &ConstEnv,
    interner: &Interner,
    span: silica_source::Span,
) -> Result<ConstValue, Diagnostic> {
    let arg = |i: usize| -> Result<ConstValue, Diagnostic> {
        args.get(i)
            .ok_or_else(|| errors::not_constant(&format!("argument of {name}"), span))
            .and_then(|e| eval(e, env, interner))
    };

    match name {
        "$clog2" => Ok(ConstValue::Int(clog2(arg(0)?.as_i64()))),
        "$bits" => match args.first() {
            Some(Expr::Number { width, .. }) => Ok(ConstValue::Int(*width as i64)),
            // Anything evaluable in a constant context is integer-typed.
            Some(e) => {
                eval(e, env, interner)?;
                Ok(ConstValue::Int(32))
            }
            None => Err(errors::not_constant("argument of $bits", span)),
        },
        "$unsigned" => {
            let v = arg(0)?.as_i64();
            Ok(ConstValue::Int((v as u32) as i64))
        }
        "$signed" => {
            let v = arg(0)?.as_i64();
            Ok(ConstValue::Int((v as u32) as i32 as i64))
        }
        _ => Err(errors::unsupported(
            &format!("system function `{name}` in a constant context"),
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_diagnostics::DiagnosticSink;
    use silica_source::FileId;
    use silica_verilog_parser as parser_crate;

    fn eval_str(source: &str, env: &ConstEnv, interner: &Interner) -> Result<ConstValue, Diagnostic> {
        let sink = DiagnosticSink::new();
        let file = FileId::from_raw(0);
        let tokens = parser_crate::lexer::lex(source, file, &sink);
        let mut p = parser_crate::VerilogParser::new(tokens, source, file, interner, &sink);
        let expr = p.parse_expr();
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        eval(&expr, env, interner)
    }

    fn eval_ok(source: &str) -> i64 {
        let interner = Interner::new();
        eval_str(source, &ConstEnv::new(), &interner)
            .unwrap()
            .as_i64()
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(eval_ok("2 + 3 * 4"), 14);
        assert_eq!(eval_ok("(2 + 3) * 4"), 20);
        assert_eq!(eval_ok("10 / 3"), 3);
        assert_eq!(eval_ok("10 % 3"), 1);
        assert_eq!(eval_ok("2 ** 10"), 1024);
    }

    #[test]
    fn comparisons_and_logical() {
        assert_eq!(eval_ok("3 < 5"), 1);
        assert_eq!(eval_ok("3 >= 5"), 0);
        assert_eq!(eval_ok("1 && 0"), 0);
        assert_eq!(eval_ok("1 || 0"), 1);
        assert_eq!(eval_ok("!0"), 1);
    }

    #[test]
    fn shifts_and_bitwise() {
        assert_eq!(eval_ok("1 << 4"), 16);
        assert_eq!(eval_ok("256 >> 4"), 16);
        assert_eq!(eval_ok("12 & 10"), 8);
        assert_eq!(eval_ok("12 | 10"), 14);
        assert_eq!(eval_ok("12 ^ 10"), 6);
    }

    #[test]
    fn sized_literals_sign_interpret() {
        assert_eq!(eval_ok("8'hFF"), 255);
        assert_eq!(eval_ok("8'shFF"), -1);
        assert_eq!(eval_ok("4'sb1000"), -8);
    }

    #[test]
    fn ternary_selects_branch() {
        assert_eq!(eval_ok("1 ? 10 : 20"), 10);
        assert_eq!(eval_ok("0 ? 10 : 20"), 20);
    }

    #[test]
    fn parameters_resolve_through_scopes() {
        let interner = Interner::new();
        let w = interner.intern("WIDTH");
        let env = ConstEnv::new().bind(w, ConstValue::Int(8));
        let v = eval_str("WIDTH - 1", &env, &interner).unwrap();
        assert_eq!(v.as_i64(), 7);
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let interner = Interner::new();
        let g = interner.intern("g");
        let outer = ConstEnv::new().bind(g, ConstValue::Int(1));
        let inner = outer.bind(g, ConstValue::Int(2));
        assert_eq!(outer.lookup(g), Some(ConstValue::Int(1)));
        assert_eq!(inner.lookup(g), Some(ConstValue::Int(2)));
    }

    #[test]
    fn clog2_reference_points() {
        assert_eq!(clog2(0), 0);
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(3), 2);
        assert_eq!(clog2(4), 2);
        assert_eq!(clog2(256), 8);
        assert_eq!(clog2(257), 9);
    }

    #[test]
    fn system_functions() {
        assert_eq!(eval_ok("$clog2(256)"), 8);
        assert_eq!(eval_ok("$bits(8'hFF)"), 8);
        assert_eq!(eval_ok("$unsigned(8'shFF)"), 255);
        assert_eq!(eval_ok("$signed(32'hFFFFFFFF)"), -1);
    }

    #[test]
    fn divide_by_zero_is_an_error() {
        let interner = Interner::new();
        let err = eval_str("8 / 0", &ConstEnv::new(), &interner).unwrap_err();
        assert!(err.message.contains("division by zero"));
        let err = eval_str("8 % 0", &ConstEnv::new(), &interner).unwrap_err();
        assert!(err.message.contains("division by zero"));
    }

    #[test]
    fn free_identifier_is_not_constant() {
        let interner = Interner::new();
        assert!(eval_str("x + 1", &ConstEnv::new(), &interner).is_err());
    }

    #[test]
    fn real_promotion() {
        let interner = Interner::new();
        let v = eval_str("1.5 * 2", &ConstEnv::new(), &interner).unwrap();
        assert_eq!(v, ConstValue::Real(3.0));
    }
}
