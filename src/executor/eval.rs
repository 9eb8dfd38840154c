//! Bound expressions and their evaluation
//!
//! The planner resolves column names to ordinals and variables to their
//! values, producing a [`BoundExpr`]. Evaluation follows SQL three-valued
//! logic: comparisons with NULL yield NULL, and a NULL predicate does not
//! select a row.

use std::cmp::Ordering;

use chrono::Local;
use regex::Regex;
use uuid::Uuid;

use super::planner::SelectPlan;
use crate::error::{Error, Result};
use crate::sql::ast::BinaryOperator;
use crate::storage::{ArithOp, Value};

/// Scalar functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Upper,
    Lower,
    Length,
    Coalesce,
    NewId,
    Now,
}

impl Function {
    /// Resolve a function name; `IDENTITY` is bound as a literal instead
    pub fn from_name(name: &str) -> Option<Function> {
        match name.to_ascii_uppercase().as_str() {
            "UPPER" => Some(Function::Upper),
            "LOWER" => Some(Function::Lower),
            "LENGTH" | "LEN" => Some(Function::Length),
            "COALESCE" => Some(Function::Coalesce),
            "NEWID" => Some(Function::NewId),
            "NOW" | "GETDATE" => Some(Function::Now),
            _ => None,
        }
    }

    /// Accepted argument counts (min, max)
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Upper | Function::Lower | Function::Length => (1, 1),
            Function::Coalesce => (1, usize::MAX),
            Function::NewId | Function::Now => (0, 0),
        }
    }
}

/// An expression with names resolved
#[derive(Debug, Clone)]
pub enum BoundExpr {
    Literal(Value),
    /// Column of the current row, by ordinal
    Column(usize),
    Binary {
        left: Box<BoundExpr>,
        op: BinaryOperator,
        right: Box<BoundExpr>,
    },
    Not(Box<BoundExpr>),
    Negate(Box<BoundExpr>),
    IsNull {
        expr: Box<BoundExpr>,
        negated: bool,
    },
    Between {
        expr: Box<BoundExpr>,
        low: Box<BoundExpr>,
        high: Box<BoundExpr>,
        negated: bool,
    },
    InList {
        expr: Box<BoundExpr>,
        list: Vec<BoundExpr>,
        negated: bool,
    },
    Like {
        expr: Box<BoundExpr>,
        pattern: Box<BoundExpr>,
        escape: Option<char>,
        /// Pattern compiled at bind time when it is a literal
        compiled: Option<Regex>,
        negated: bool,
    },
    Function {
        func: Function,
        args: Vec<BoundExpr>,
    },
    /// Uncorrelated subqueries; the executor replaces them with their
    /// results before evaluation
    Subquery(Box<SelectPlan>),
    InSubquery {
        expr: Box<BoundExpr>,
        subquery: Box<SelectPlan>,
        negated: bool,
    },
    Exists(Box<SelectPlan>),
}

impl BoundExpr {
    /// Evaluate against a row
    pub fn eval(&self, row: &[Value]) -> Result<Value> {
        match self {
            BoundExpr::Literal(v) => Ok(v.clone()),

            BoundExpr::Column(i) => row
                .get(*i)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("column ordinal {} out of range", i))),

            BoundExpr::Binary { left, op, right } => match op {
                BinaryOperator::And => {
                    let l = truth(&left.eval(row)?)?;
                    if l == Some(false) {
                        return Ok(Value::Bit(false));
                    }
                    let r = truth(&right.eval(row)?)?;
                    Ok(match (l, r) {
                        (_, Some(false)) => Value::Bit(false),
                        (Some(true), Some(true)) => Value::Bit(true),
                        _ => Value::Null,
                    })
                }
                BinaryOperator::Or => {
                    let l = truth(&left.eval(row)?)?;
                    if l == Some(true) {
                        return Ok(Value::Bit(true));
                    }
                    let r = truth(&right.eval(row)?)?;
                    Ok(match (l, r) {
                        (_, Some(true)) => Value::Bit(true),
                        (Some(false), Some(false)) => Value::Bit(false),
                        _ => Value::Null,
                    })
                }
                _ => binary_op(&left.eval(row)?, *op, &right.eval(row)?),
            },

            BoundExpr::Not(inner) => Ok(match truth(&inner.eval(row)?)? {
                Some(b) => Value::Bit(!b),
                None => Value::Null,
            }),

            BoundExpr::Negate(inner) => inner.eval(row)?.negate(),

            BoundExpr::IsNull { expr, negated } => {
                Ok(Value::Bit(expr.eval(row)?.is_null() != *negated))
            }

            BoundExpr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let v = expr.eval(row)?;
                let lo = compare(&v, &low.eval(row)?)?;
                let hi = compare(&v, &high.eval(row)?)?;
                let within = match (lo, hi) {
                    (Some(l), Some(h)) => Some(l != Ordering::Less && h != Ordering::Greater),
                    (Some(Ordering::Less), None) | (None, Some(Ordering::Greater)) => Some(false),
                    _ => None,
                };
                Ok(negate_opt(within, *negated))
            }

            BoundExpr::InList {
                expr,
                list,
                negated,
            } => {
                let v = expr.eval(row)?;
                let mut candidates = Vec::with_capacity(list.len());
                for item in list {
                    candidates.push(item.eval(row)?);
                }
                Ok(negate_opt(in_values(&v, &candidates)?, *negated))
            }

            BoundExpr::Like {
                expr,
                pattern,
                escape,
                compiled,
                negated,
            } => {
                let v = expr.eval(row)?;
                let p = pattern.eval(row)?;
                if v.is_null() || p.is_null() {
                    return Ok(Value::Null);
                }
                let text = v.to_text().unwrap_or_default();
                let matched = match compiled {
                    Some(re) => re.is_match(&text),
                    None => {
                        let pattern_text = p.to_text().unwrap_or_default();
                        like_regex(&pattern_text, *escape)?.is_match(&text)
                    }
                };
                Ok(Value::Bit(matched != *negated))
            }

            BoundExpr::Function { func, args } => call_function(*func, args, row),

            BoundExpr::Subquery(_) | BoundExpr::InSubquery { .. } | BoundExpr::Exists(_) => Err(
                Error::Internal("subquery evaluated before it was materialized".to_string()),
            ),
        }
    }

    /// Evaluate as a predicate: only TRUE selects the row
    pub fn matches(&self, row: &[Value]) -> Result<bool> {
        Ok(truth(&self.eval(row)?)? == Some(true))
    }

    /// Evaluate without a row
    pub fn eval_const(&self) -> Result<Value> {
        self.eval(&[])
    }

    /// True when the expression reads neither the current row nor a table
    pub fn is_constant(&self) -> bool {
        match self {
            BoundExpr::Literal(_) => true,
            BoundExpr::Column(_)
            | BoundExpr::Subquery(_)
            | BoundExpr::InSubquery { .. }
            | BoundExpr::Exists(_) => false,
            BoundExpr::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
            BoundExpr::Not(e) | BoundExpr::Negate(e) | BoundExpr::IsNull { expr: e, .. } => {
                e.is_constant()
            }
            BoundExpr::Between {
                expr, low, high, ..
            } => expr.is_constant() && low.is_constant() && high.is_constant(),
            BoundExpr::InList { expr, list, .. } => {
                expr.is_constant() && list.iter().all(BoundExpr::is_constant)
            }
            BoundExpr::Like { expr, pattern, .. } => expr.is_constant() && pattern.is_constant(),
            BoundExpr::Function { args, .. } => args.iter().all(BoundExpr::is_constant),
        }
    }
}

/// Truth value of a predicate result: `None` is UNKNOWN
fn truth(value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        other => other.as_bool().map(Some).ok_or_else(|| Error::TypeMismatch {
            from: other.type_name().to_string(),
            to: "BIT".to_string(),
        }),
    }
}

fn negate_opt(value: Option<bool>, negated: bool) -> Value {
    match value {
        Some(b) => Value::Bit(b != negated),
        None => Value::Null,
    }
}

/// Compare two values; `None` when either is NULL. Incomparable types are
/// an error.
fn compare(a: &Value, b: &Value) -> Result<Option<Ordering>> {
    if a.is_null() || b.is_null() {
        return Ok(None);
    }
    a.compare(b).map(Some).ok_or_else(|| Error::TypeMismatch {
        from: a.type_name().to_string(),
        to: b.type_name().to_string(),
    })
}

/// `v IN (candidates)` with SQL NULL semantics
pub(crate) fn in_values(v: &Value, candidates: &[Value]) -> Result<Option<bool>> {
    if v.is_null() {
        return Ok(None);
    }
    let mut saw_null = false;
    for c in candidates {
        match compare(v, c)? {
            Some(Ordering::Equal) => return Ok(Some(true)),
            Some(_) => {}
            None => saw_null = true,
        }
    }
    Ok(if saw_null { None } else { Some(false) })
}

fn binary_op(left: &Value, op: BinaryOperator, right: &Value) -> Result<Value> {
    let arith = match op {
        BinaryOperator::Add => Some(ArithOp::Add),
        BinaryOperator::Sub => Some(ArithOp::Sub),
        BinaryOperator::Mul => Some(ArithOp::Mul),
        BinaryOperator::Div => Some(ArithOp::Div),
        BinaryOperator::Mod => Some(ArithOp::Rem),
        _ => None,
    };
    if let Some(arith) = arith {
        return left.arithmetic(arith, right);
    }

    if op == BinaryOperator::Concat {
        return Ok(match (left.to_text(), right.to_text()) {
            (Some(a), Some(b)) => Value::String(a + &b),
            _ => Value::Null,
        });
    }

    let ordering = match compare(left, right)? {
        Some(o) => o,
        None => return Ok(Value::Null),
    };
    let result = match op {
        BinaryOperator::Eq => ordering == Ordering::Equal,
        BinaryOperator::Neq => ordering != Ordering::Equal,
        BinaryOperator::Lt => ordering == Ordering::Less,
        BinaryOperator::Gt => ordering == Ordering::Greater,
        BinaryOperator::Lte => ordering != Ordering::Greater,
        BinaryOperator::Gte => ordering != Ordering::Less,
        _ => {
            return Err(Error::Internal(format!("operator {:?} is not a comparison", op)));
        }
    };
    Ok(Value::Bit(result))
}

fn call_function(func: Function, args: &[BoundExpr], row: &[Value]) -> Result<Value> {
    let arg = |i: usize| -> Result<Value> {
        args.get(i)
            .ok_or_else(|| Error::Internal(format!("{:?} is missing argument {}", func, i)))?
            .eval(row)
    };

    match func {
        Function::Upper => Ok(match arg(0)?.to_text() {
            Some(s) => Value::String(s.to_uppercase()),
            None => Value::Null,
        }),
        Function::Lower => Ok(match arg(0)?.to_text() {
            Some(s) => Value::String(s.to_lowercase()),
            None => Value::Null,
        }),
        Function::Length => Ok(match arg(0)? {
            Value::Null => Value::Null,
            Value::Blob(b) => Value::Int(b.len() as i32),
            // trailing blanks do not count, as with padded CHAR values
            other => Value::Int(
                other
                    .to_text()
                    .unwrap_or_default()
                    .trim_end_matches(' ')
                    .chars()
                    .count() as i32,
            ),
        }),
        Function::Coalesce => {
            for a in args {
                let v = a.eval(row)?;
                if !v.is_null() {
                    return Ok(v);
                }
            }
            Ok(Value::Null)
        }
        Function::NewId => Ok(Value::Guid(Uuid::new_v4())),
        Function::Now => Ok(Value::DateTime(Local::now().naive_local())),
    }
}

/// Translate a LIKE pattern into an anchored regular expression
pub fn like_regex(pattern: &str, escape: Option<char>) -> Result<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str("(?s)^");

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            match chars.next() {
                Some(next) => re.push_str(&regex::escape(&next.to_string())),
                None => {
                    return Err(Error::ExecutionError(format!(
                        "LIKE pattern '{}' ends with the escape character",
                        pattern
                    )))
                }
            }
            continue;
        }
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|e| Error::Internal(format!("LIKE pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: impl Into<Value>) -> Box<BoundExpr> {
        Box::new(BoundExpr::Literal(v.into()))
    }

    fn binary(l: Box<BoundExpr>, op: BinaryOperator, r: Box<BoundExpr>) -> BoundExpr {
        BoundExpr::Binary { left: l, op, right: r }
    }

    #[test]
    fn test_three_valued_logic() {
        let null = || lit(Value::Null);
        let t = || lit(true);
        let f = || lit(false);

        assert_eq!(binary(null(), BinaryOperator::And, f()).eval_const().unwrap(), Value::Bit(false));
        assert_eq!(binary(null(), BinaryOperator::And, t()).eval_const().unwrap(), Value::Null);
        assert_eq!(binary(null(), BinaryOperator::Or, t()).eval_const().unwrap(), Value::Bit(true));
        assert_eq!(binary(null(), BinaryOperator::Or, f()).eval_const().unwrap(), Value::Null);
        assert_eq!(BoundExpr::Not(null()).eval_const().unwrap(), Value::Null);

        let cmp = binary(null(), BinaryOperator::Eq, lit(1));
        assert_eq!(cmp.eval_const().unwrap(), Value::Null);
        assert!(!cmp.matches(&[]).unwrap());
    }

    #[test]
    fn test_comparison_across_numeric_types() {
        let e = binary(
            Box::new(BoundExpr::Column(0)),
            BinaryOperator::Lt,
            lit(Value::BigInt(10)),
        );
        assert!(e.matches(&[Value::Int(3)]).unwrap());
        assert!(!e.matches(&[Value::Float(10.5)]).unwrap());
    }

    #[test]
    fn test_incomparable_types_error() {
        let e = binary(lit(1), BinaryOperator::Eq, lit("abc"));
        assert!(matches!(e.eval_const(), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_in_list_with_null() {
        assert_eq!(
            in_values(&Value::Int(1), &[Value::Int(2), Value::Null]).unwrap(),
            None
        );
        assert_eq!(
            in_values(&Value::Int(2), &[Value::Int(2), Value::Null]).unwrap(),
            Some(true)
        );
        assert_eq!(in_values(&Value::Int(3), &[Value::Int(2)]).unwrap(), Some(false));
    }

    #[test]
    fn test_like_patterns() {
        let re = like_regex("A%c_", None).unwrap();
        assert!(re.is_match("Abcd"));
        assert!(re.is_match("Acx"));
        assert!(!re.is_match("abcd"));

        let re = like_regex("100!%", Some('!')).unwrap();
        assert!(re.is_match("100%"));
        assert!(!re.is_match("1000"));

        let re = like_regex("a.b", None).unwrap();
        assert!(!re.is_match("axb"));

        assert!(like_regex("abc!", Some('!')).is_err());
    }

    #[test]
    fn test_functions() {
        let upper = BoundExpr::Function {
            func: Function::Upper,
            args: vec![BoundExpr::Literal(Value::from("abc"))],
        };
        assert_eq!(upper.eval_const().unwrap(), Value::from("ABC"));

        let coalesce = BoundExpr::Function {
            func: Function::Coalesce,
            args: vec![BoundExpr::Literal(Value::Null), BoundExpr::Column(0)],
        };
        assert_eq!(coalesce.eval(&[Value::Int(7)]).unwrap(), Value::Int(7));

        let length = BoundExpr::Function {
            func: Function::Length,
            args: vec![BoundExpr::Literal(Value::from("ab  "))],
        };
        assert_eq!(length.eval_const().unwrap(), Value::Int(2));
        assert!(matches!(
            BoundExpr::Function { func: Function::NewId, args: vec![] }.eval_const().unwrap(),
            Value::Guid(_)
        ));
    }

    #[test]
    fn test_between() {
        let e = BoundExpr::Between {
            expr: Box::new(BoundExpr::Column(0)),
            low: lit(1),
            high: lit(5),
            negated: false,
        };
        assert!(e.matches(&[Value::Int(5)]).unwrap());
        assert!(!e.matches(&[Value::Int(6)]).unwrap());
        assert!(!e.matches(&[Value::Null]).unwrap());
    }
}
