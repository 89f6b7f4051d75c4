//! Constant folding over literal operands.
//!
//! Runs between the `BeforeInference` hooks and inference when
//! `fold_constants` is set. A folded node keeps the id and span of the
//! operation it replaces. Anything whose value would differ from the origin
//! language at run time (overflow, division by zero, negative powers) is left
//! alone.

use brace_syntax::{BinOp, Literal, Node, NodeKind, UnaryOp};

/// Fold every foldable operation under `node`, bottom-up. Returns the number
/// of operations folded.
pub fn fold_constants(node: &mut Node) -> usize {
    let mut folded = 0;
    for child in node.children_mut() {
        folded += fold_constants(child);
    }
    if let Some(value) = evaluate(&node.kind) {
        node.kind = NodeKind::Constant { value };
        folded += 1;
    }
    folded
}

fn evaluate(kind: &NodeKind) -> Option<Literal> {
    match kind {
        NodeKind::BinaryOp { left, op, right } => binary(*op, left.as_literal()?, right.as_literal()?),
        NodeKind::UnaryOp { op, operand } => unary(*op, operand.as_literal()?),
        _ => None,
    }
}

fn binary(op: BinOp, left: &Literal, right: &Literal) -> Option<Literal> {
    match (left, right) {
        (Literal::Int(a), Literal::Int(b)) => int_binary(op, *a, *b),
        (Literal::Float(_), Literal::Int(_))
        | (Literal::Int(_), Literal::Float(_))
        | (Literal::Float(_), Literal::Float(_)) => {
            float_binary(op, as_float(left)?, as_float(right)?)
        }
        (Literal::Str(a), Literal::Str(b)) if op == BinOp::Add => {
            Some(Literal::Str(format!("{a}{b}")))
        }
        _ => None,
    }
}

fn int_binary(op: BinOp, a: i64, b: i64) -> Option<Literal> {
    let value = match op {
        BinOp::Add => a.checked_add(b)?,
        BinOp::Sub => a.checked_sub(b)?,
        BinOp::Mul => a.checked_mul(b)?,
        BinOp::Div => {
            if b == 0 {
                return None;
            }
            return Some(Literal::Float(a as f64 / b as f64));
        }
        // Floor semantics: the quotient rounds toward negative infinity and
        // the remainder takes the divisor's sign.
        BinOp::FloorDiv => {
            let q = a.checked_div(b)?;
            if (a % b != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q }
        }
        BinOp::Mod => {
            let r = a.checked_rem(b)?;
            if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
        }
        BinOp::Pow => {
            let exp = u32::try_from(b).ok()?;
            a.checked_pow(exp)?
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::LShift => {
            let shift = u32::try_from(b).ok()?;
            let value = a.checked_shl(shift)?;
            if value >> shift != a {
                return None;
            }
            value
        }
        BinOp::RShift => a.checked_shr(u32::try_from(b).ok()?)?,
        BinOp::And | BinOp::Or => return None,
    };
    Some(Literal::Int(value))
}

fn float_binary(op: BinOp, a: f64, b: f64) -> Option<Literal> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div if b != 0.0 => a / b,
        _ => return None,
    };
    value.is_finite().then_some(Literal::Float(value))
}

fn unary(op: UnaryOp, operand: &Literal) -> Option<Literal> {
    match (op, operand) {
        (UnaryOp::Neg, Literal::Int(v)) => v.checked_neg().map(Literal::Int),
        (UnaryOp::Neg, Literal::Float(v)) => Some(Literal::Float(-v)),
        (UnaryOp::Pos, Literal::Int(_) | Literal::Float(_)) => Some(operand.clone()),
        (UnaryOp::Invert, Literal::Int(v)) => Some(Literal::Int(!v)),
        (UnaryOp::Not, Literal::Bool(v)) => Some(Literal::Bool(!v)),
        _ => None,
    }
}

fn as_float(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Int(v) => Some(*v as f64),
        Literal::Float(v) => Some(*v),
        _ => None,
    }
}
