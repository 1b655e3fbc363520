use crate::config::Tolerance;
use crate::store::{Operator, Value};

/// Why a built-in operator could not produce a value.
///
/// Positions refer to the operand list; the engine maps them to node ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Arity { expected: usize, actual: usize },
    TypeMismatch { positions: Vec<usize> },
    DivisionByZero,
    Overflow,
}

/// Applies a built-in operator to already-computed operand values.
///
/// Hints are not handled here; they need the store's function table.
pub(crate) fn execute_instruction(op: Operator, args: &[Value], tolerance: &Tolerance) -> Result<Value, Fault> {
    if args.len() != op.arity() {
        return Err(Fault::Arity { expected: op.arity(), actual: args.len() });
    }
    match op {
        Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
            binary(op, args[0], args[1])
        }
        Operator::Neg => match args[0] {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(Fault::Overflow),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Bool(_) => Err(Fault::TypeMismatch { positions: vec![0] }),
        },
        Operator::Equal => Ok(Value::Bool(values_equal(&args[0], &args[1], tolerance))),
        Operator::Hint { .. } => unreachable!("hints are dispatched by the engine"),
    }
}

fn binary(op: Operator, lhs: Value, rhs: Value) -> Result<Value, Fault> {
    let positions: Vec<usize> = [lhs, rhs]
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v, Value::Bool(_)))
        .map(|(i, _)| i)
        .collect();
    if !positions.is_empty() {
        return Err(Fault::TypeMismatch { positions });
    }

    if let (Value::Int(l), Value::Int(r)) = (lhs, rhs) {
        let out = match op {
            Operator::Add => l.checked_add(r),
            Operator::Sub => l.checked_sub(r),
            Operator::Mul => l.checked_mul(r),
            Operator::Div => {
                if r == 0 {
                    return Err(Fault::DivisionByZero);
                }
                return Ok(Value::Float(l as f64 / r as f64));
            }
            _ => unreachable!(),
        };
        return out.map(Value::Int).ok_or(Fault::Overflow);
    }

    // At least one float: promote both.
    let (l, r) = match (lhs.as_f64(), rhs.as_f64()) {
        (Some(l), Some(r)) => (l, r),
        _ => unreachable!("booleans rejected above"),
    };
    let out = match op {
        Operator::Add => l + r,
        Operator::Sub => l - r,
        Operator::Mul => l * r,
        Operator::Div => {
            if r == 0.0 {
                return Err(Fault::DivisionByZero);
            }
            l / r
        }
        _ => unreachable!(),
    };
    Ok(Value::Float(out))
}

/// Value equality: exact for int/int and bool/bool, tolerant once a float is
/// involved, false across bool and number.
pub fn values_equal(a: &Value, b: &Value, tolerance: &Tolerance) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => false,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => tolerance.is_close(x, y),
            _ => false,
        },
    }
}
