use std::cmp::Ordering;

use thiserror::Error;

use crate::ast::*;
use crate::data::{Dataset, Value};
use crate::lexer::Span;
use crate::parser::{ParseError, Parser};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Unknown column '{name}' at position {span:?}")]
    UnknownColumn { name: String, span: Span },
    #[error("Row {row}: cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        row: usize,
        op: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("Row {row}: cannot apply '{op}' to {operand}")]
    InvalidOperand {
        row: usize,
        op: String,
        operand: &'static str,
    },
    #[error("Row {row}: query evaluated to {found}, expected a boolean")]
    NotBoolean { row: usize, found: &'static str },
}

/// Parses `source` and evaluates it against every row of `dataset`.
pub fn evaluate(dataset: &Dataset, source: &str) -> Result<Vec<bool>, EvalError> {
    let expr = Parser::parse(source)?;
    evaluate_expr(dataset, &expr)
}

/// Evaluates a parsed query against every row of `dataset`.
///
/// Column references are resolved before any row is touched, so an unknown
/// column is reported even for an empty dataset. `Null` results count as false.
pub fn evaluate_expr(dataset: &Dataset, expr: &Expr) -> Result<Vec<bool>, EvalError> {
    if let Some(missing) = expr
        .columns()
        .into_iter()
        .find(|c| dataset.column_index(&c.name).is_none())
    {
        return Err(EvalError::UnknownColumn {
            name: missing.name.clone(),
            span: missing.span,
        });
    }

    let evaluator = Evaluator { dataset };
    (0..dataset.len())
        .map(|row| match evaluator.eval(expr, row)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(EvalError::NotBoolean {
                row,
                found: other.type_name(),
            }),
        })
        .collect()
}

struct Evaluator<'a> {
    dataset: &'a Dataset,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr, row: usize) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(Literal::Number(n)) => Ok(Value::Number(*n)),
            Expr::Literal(Literal::String(s)) => Ok(Value::Str(s.clone())),
            Expr::Literal(Literal::Bool(b)) => Ok(Value::Bool(*b)),
            Expr::Column(column) => {
                let idx = self
                    .dataset
                    .column_index(&column.name)
                    .ok_or_else(|| EvalError::UnknownColumn {
                        name: column.name.clone(),
                        span: column.span,
                    })?;
                Ok(self.dataset.value(row, idx).clone())
            }
            Expr::Paren(inner) => self.eval(inner, row),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, row)?;
                self.unary(*op, value, row)
            }
            Expr::BinaryOp {
                left,
                op: BinaryOp::And,
                right,
            } => {
                if !self.condition(left, row, BinaryOp::And)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.condition(right, row, BinaryOp::And)?))
            }
            Expr::BinaryOp {
                left,
                op: BinaryOp::Or,
                right,
            } => {
                if self.condition(left, row, BinaryOp::Or)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.condition(right, row, BinaryOp::Or)?))
            }
            Expr::BinaryOp { left, op, right } => {
                let l = self.eval(left, row)?;
                let r = self.eval(right, row)?;
                match op {
                    BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                        compare(&l, &r, *op, row).map(Value::Bool)
                    }
                    _ => arithmetic(l, r, *op, row),
                }
            }
            Expr::Membership { needle, list, negated } => {
                let needle = self.eval(needle, row)?;
                let mut found = false;
                for item in list {
                    let item = self.eval(item, row)?;
                    if equals(&needle, &item) {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Bool(found != *negated))
            }
        }
    }

    fn condition(&self, expr: &Expr, row: usize, op: BinaryOp) -> Result<bool, EvalError> {
        match self.eval(expr, row)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(EvalError::InvalidOperand {
                row,
                op: op.to_string(),
                operand: other.type_name(),
            }),
        }
    }

    fn unary(&self, op: UnaryOp, value: Value, row: usize) -> Result<Value, EvalError> {
        match (op, value) {
            (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOp::Neg, Value::Bool(b)) => Ok(Value::Number(-(b as u8 as f64))),
            (UnaryOp::Neg, Value::Null) => Ok(Value::Null),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Not, Value::Null) => Ok(Value::Bool(true)),
            (op, other) => Err(EvalError::InvalidOperand {
                row,
                op: op.to_string(),
                operand: other.type_name(),
            }),
        }
    }
}

/// Numeric view of a value; booleans count as 0/1.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(*b as u8 as f64),
        _ => None,
    }
}

fn equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => match (as_number(l), as_number(r)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn compare(l: &Value, r: &Value, op: BinaryOp, row: usize) -> Result<bool, EvalError> {
    match op {
        BinaryOp::Eq => return Ok(equals(l, r)),
        BinaryOp::Ne => return Ok(!equals(l, r)),
        _ => {}
    }

    let ordering = match (l, r) {
        (Value::Null, _) | (_, Value::Null) => return Ok(false),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (as_number(l), as_number(r)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(EvalError::TypeMismatch {
                    row,
                    op: op.to_string(),
                    left: l.type_name(),
                    right: r.type_name(),
                });
            }
        },
    };

    // NaN compares false under every ordering operator
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    })
}

fn arithmetic(l: Value, r: Value, op: BinaryOp, row: usize) -> Result<Value, EvalError> {
    if matches!(l, Value::Null) || matches!(r, Value::Null) {
        return Ok(Value::Null);
    }
    if let (BinaryOp::Add, Value::Str(a), Value::Str(b)) = (op, &l, &r) {
        return Ok(Value::Str(format!("{}{}", a, b)));
    }

    let (Some(a), Some(b)) = (as_number(&l), as_number(&r)) else {
        return Err(EvalError::TypeMismatch {
            row,
            op: op.to_string(),
            left: l.type_name(),
            right: r.type_name(),
        });
    };

    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        // Floored modulo: the result takes the sign of the divisor
        BinaryOp::Mod => a - b * (a / b).floor(),
        _ => f64::NAN,
    };
    Ok(Value::Number(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Dataset {
        let mut ds = Dataset::new(["age", "country", "smoker", "blood type"]).unwrap();
        ds.push_row(vec![25.0.into(), "US".into(), true.into(), "O".into()]).unwrap();
        ds.push_row(vec![40.0.into(), "CA".into(), false.into(), "A".into()]).unwrap();
        ds.push_row(vec![Value::Null, "FR".into(), false.into(), Value::Null]).unwrap();
        ds.push_row(vec![67.0.into(), "US".into(), Value::Null, "O".into()]).unwrap();
        ds
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(evaluate(&people(), "age > 30").unwrap(), vec![false, true, false, true]);
        assert_eq!(evaluate(&people(), "age != 40").unwrap(), vec![true, false, true, true]);
    }

    #[test]
    fn test_boolean_connectives() {
        assert_eq!(
            evaluate(&people(), "country == 'US' and not smoker").unwrap(),
            vec![false, false, false, true]
        );
        assert_eq!(
            evaluate(&people(), "(age < 30) | (country == \"FR\")").unwrap(),
            vec![true, false, true, false]
        );
        assert_eq!(evaluate(&people(), "~smoker").unwrap(), vec![false, true, true, true]);
    }

    #[test]
    fn test_membership() {
        assert_eq!(
            evaluate(&people(), "country in ['US', 'CA']").unwrap(),
            vec![true, true, false, true]
        );
        assert_eq!(
            evaluate(&people(), "country not in ['US']").unwrap(),
            vec![false, true, true, false]
        );
    }

    #[test]
    fn test_arithmetic_and_quoted_columns() {
        assert_eq!(
            evaluate(&people(), "age % 2 == 1 or `blood type` == 'A'").unwrap(),
            vec![true, true, false, true]
        );
        assert_eq!(evaluate(&people(), "age / 0 > 1e300").unwrap(), vec![true, true, false, true]);
        assert_eq!(evaluate(&people(), "smoker + 1 == 2").unwrap(), vec![true, false, false, false]);
    }

    #[test]
    fn test_constant_queries() {
        assert_eq!(evaluate(&people(), "True").unwrap(), vec![true; 4]);
        assert_eq!(evaluate(&people(), "1 > 2").unwrap(), vec![false; 4]);
    }

    #[test]
    fn test_unknown_column_on_empty_dataset() {
        let ds = Dataset::new(["age"]).unwrap();
        let err = evaluate(&ds, "height > 170").unwrap_err();
        assert_eq!(
            err,
            EvalError::UnknownColumn {
                name: "height".to_string(),
                span: Span::new(0, 6),
            }
        );
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(
            evaluate(&people(), "country > 3"),
            Err(EvalError::TypeMismatch { row: 0, .. })
        ));
        assert!(matches!(
            evaluate(&people(), "age"),
            Err(EvalError::NotBoolean { row: 0, found: "number" })
        ));
        assert!(matches!(
            evaluate(&people(), "not country"),
            Err(EvalError::InvalidOperand { row: 0, .. })
        ));
        assert!(matches!(evaluate(&people(), "age >"), Err(EvalError::Parse(_))));
    }
}
