//! Deferred expression trees over parameter values.
//!
//! A `Call` is a constant leaf, a parameter-value invocation leaf, or
//! an operator node. `realize` walks the tree post-order with an
//! explicit stack (no recursion) and reduces operator nodes
//! numerically; failures come back as `Evaluation` errors carrying the
//! offending sub-expression.

use std::fmt;

use entgrid_common::{EngineError, EngineErrorKind};

use crate::time::Update;
use crate::value::{ParameterValue, ValueQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

impl CallOp {
    fn is_infix(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }
}

impl fmt::Display for CallOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Min => "min",
            Self::Max => "max",
        })
    }
}

#[derive(Debug, Clone)]
pub enum Call {
    /// A constant leaf.
    Constant(ParameterValue),
    /// A parameter value to invoke at realization time, with the query
    /// it was captured with.
    Parameter {
        name: String,
        value: ParameterValue,
        query: ValueQuery,
    },
    /// An operator over sub-expressions.
    Op { op: CallOp, args: Vec<Call> },
}

impl Call {
    pub fn constant(value: impl Into<ParameterValue>) -> Self {
        Self::Constant(value.into())
    }

    pub fn parameter<S: Into<String>>(name: S, value: ParameterValue, query: ValueQuery) -> Self {
        Self::Parameter { name: name.into(), value, query }
    }

    pub fn op(op: CallOp, args: Vec<Call>) -> Self {
        Self::Op { op, args }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => write!(f, "{v}"),
            Self::Parameter { name, .. } => write!(f, "{name}(..)"),
            Self::Op { op, args } if op.is_infix() => {
                write!(f, "(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {op} ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Op { op, args } => {
                write!(f, "{op}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Realize an expression tree: children first, then each operator node
/// reduces over its children's results. An observer callback, when
/// given, reaches every parameter-value leaf so rolling re-triggers the
/// whole expression.
pub fn realize(call: &Call, update: Option<Update>) -> Result<ParameterValue, EngineError> {
    enum Step<'a> {
        Enter(&'a Call),
        Reduce(&'a Call),
    }

    let mut work = vec![Step::Enter(call)];
    let mut results: Vec<ParameterValue> = Vec::new();
    while let Some(step) = work.pop() {
        match step {
            Step::Enter(node) => match node {
                Call::Constant(v) => results.push(v.clone()),
                Call::Parameter { value, query, .. } => {
                    let mut query = query.clone();
                    if query.update.is_none() {
                        query.update = update.clone();
                    }
                    results.push(value.call(&query));
                }
                Call::Op { args, .. } => {
                    work.push(Step::Reduce(node));
                    for arg in args.iter().rev() {
                        work.push(Step::Enter(arg));
                    }
                }
            },
            Step::Reduce(node) => {
                let Call::Op { op, args } = node else {
                    unreachable!("only operator nodes are reduced")
                };
                let operands = results.split_off(results.len() - args.len());
                let reduced =
                    apply(*op, &operands).map_err(|e| e.with_expression(node.to_string()))?;
                results.push(reduced);
            }
        }
    }
    Ok(results.pop().unwrap_or(ParameterValue::Nothing))
}

fn apply(op: CallOp, operands: &[ParameterValue]) -> Result<ParameterValue, EngineError> {
    if operands.is_empty() {
        return Err(EngineError::new(EngineErrorKind::Evaluation)
            .with_message(format!("operator '{op}' got no operands")));
    }
    let numbers: Vec<f64> = operands
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                EngineError::new(EngineErrorKind::Evaluation)
                    .with_message(format!("operand '{v}' is not numeric"))
            })
        })
        .collect::<Result<_, _>>()?;
    let result = match op {
        CallOp::Add => numbers.iter().sum(),
        CallOp::Sub => numbers[1..].iter().fold(numbers[0], |acc, x| acc - x),
        CallOp::Mul => numbers.iter().product(),
        CallOp::Div => numbers[1..].iter().fold(numbers[0], |acc, x| acc / x),
        CallOp::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        CallOp::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    // Integer operands stay integral under the closed operators.
    let all_int = operands.iter().all(|v| matches!(v, ParameterValue::Int(_)));
    if all_int && !matches!(op, CallOp::Div) && result.fract() == 0.0 {
        Ok(ParameterValue::Int(result as i64))
    } else {
        Ok(ParameterValue::Float(result))
    }
}
