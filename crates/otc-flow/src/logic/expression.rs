use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::value::LogicValue;

/// Operator names the rule language reserves without interpreting them here.
const RESERVED_OPERATORS: &[&str] = &[
    "===", "!==", "!!", "%", "?:", "in", "cat", "substr", "min", "max", "map", "filter", "reduce",
    "all", "some", "none", "merge", "missing", "missing_some", "log", "method",
];

/// Error raised for expressions a pack author got wrong.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogicError {
    #[error("operator {0} not supported")]
    UnsupportedOperator(String),
    #[error("operator {operator} expects a list of operands")]
    OperandList { operator: &'static str },
    #[error("var expects a dotted path or a list of path segments, found {0}")]
    InvalidPath(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    fn apply(self, left: &LogicValue, right: &LogicValue) -> bool {
        match self {
            Comparison::Equal => left.strict_equals(right),
            Comparison::NotEqual => !left.strict_equals(right),
            Comparison::Greater => left.loose_cmp(right) == Some(Ordering::Greater),
            Comparison::GreaterOrEqual => matches!(
                left.loose_cmp(right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Comparison::Less => left.loose_cmp(right) == Some(Ordering::Less),
            Comparison::LessOrEqual => {
                matches!(left.loose_cmp(right), Some(Ordering::Less | Ordering::Equal))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Arithmetic {
    fn apply(self, values: &[LogicValue]) -> f64 {
        match self {
            Arithmetic::Add => values.iter().fold(0.0, |total, value| total + value.to_operand()),
            Arithmetic::Multiply => values
                .iter()
                .fold(1.0, |total, value| total * value.to_operand()),
            Arithmetic::Subtract => match values {
                [] => 0.0,
                [only] => -only.to_operand(),
                [first, rest @ ..] => rest
                    .iter()
                    .fold(first.to_operand(), |total, value| total - value.to_operand()),
            },
            // A zero divisor yields +infinity regardless of the dividend.
            Arithmetic::Divide => match values {
                [] => 0.0,
                [first, rest @ ..] => rest.iter().fold(first.to_operand(), |total, value| {
                    let divisor = value.to_operand();
                    if divisor == 0.0 {
                        f64::INFINITY
                    } else {
                        total / divisor
                    }
                }),
            },
        }
    }
}

/// Parsed condition tree. Operators resolve against a fixed name table; any other
/// single-key object is data.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(LogicValue),
    List(Vec<Expression>),
    Record(BTreeMap<String, Expression>),
    /// `None` reads the whole context.
    Var(Option<Vec<String>>),
    Compare(Comparison, Box<Expression>, Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
    Arithmetic(Arithmetic, Vec<Expression>),
    If(Vec<Expression>),
    Includes(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn parse(value: &Value) -> Result<Self, LogicError> {
        match value {
            Value::Array(items) => Ok(Expression::List(parse_each(items)?)),
            Value::Object(map) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((key, operand)), None) => parse_operator(key, operand, map),
                    _ => parse_record(map),
                }
            }
            literal => Ok(Expression::Literal(LogicValue::from(literal))),
        }
    }

    pub fn evaluate(&self, data: &LogicValue) -> LogicValue {
        match self {
            Expression::Literal(value) => value.clone(),
            Expression::List(items) => {
                LogicValue::Array(items.iter().map(|item| item.evaluate(data)).collect())
            }
            Expression::Record(fields) => LogicValue::Object(
                fields
                    .iter()
                    .map(|(key, field)| (key.clone(), field.evaluate(data)))
                    .collect(),
            ),
            Expression::Var(None) => data.clone(),
            Expression::Var(Some(segments)) => data.lookup(segments.iter().map(String::as_str)),
            Expression::Compare(comparison, left, right) => {
                let left = left.evaluate(data);
                let right = right.evaluate(data);
                LogicValue::Bool(comparison.apply(&left, &right))
            }
            Expression::And(operands) => LogicValue::Bool(
                operands
                    .iter()
                    .all(|operand| operand.evaluate(data).is_truthy()),
            ),
            Expression::Or(operands) => LogicValue::Bool(
                operands
                    .iter()
                    .any(|operand| operand.evaluate(data).is_truthy()),
            ),
            Expression::Not(operand) => LogicValue::Bool(!operand.evaluate(data).is_truthy()),
            Expression::Arithmetic(operator, operands) => {
                let values: Vec<LogicValue> =
                    operands.iter().map(|operand| operand.evaluate(data)).collect();
                LogicValue::Number(operator.apply(&values))
            }
            Expression::If(arguments) => evaluate_ladder(arguments, data),
            Expression::Includes(collection, needle) => {
                let needle = needle.evaluate(data);
                let found = match collection.evaluate(data) {
                    LogicValue::Array(items) => items.iter().any(|item| item.same_value_zero(&needle)),
                    LogicValue::String(text) => text.contains(&needle.to_display()),
                    _ => false,
                };
                LogicValue::Bool(found)
            }
        }
    }
}

/// Parses and evaluates in one step.
pub fn evaluate(expression: &Value, data: &LogicValue) -> Result<LogicValue, LogicError> {
    Ok(Expression::parse(expression)?.evaluate(data))
}

fn parse_operator(
    key: &str,
    operand: &Value,
    map: &Map<String, Value>,
) -> Result<Expression, LogicError> {
    let expression = match key {
        "var" => Expression::Var(parse_path(operand)?),
        "==" => compare(Comparison::Equal, "==", operand)?,
        "!=" => compare(Comparison::NotEqual, "!=", operand)?,
        ">" => compare(Comparison::Greater, ">", operand)?,
        ">=" => compare(Comparison::GreaterOrEqual, ">=", operand)?,
        "<" => compare(Comparison::Less, "<", operand)?,
        "<=" => compare(Comparison::LessOrEqual, "<=", operand)?,
        "and" => Expression::And(parse_spread(operand)?),
        "or" => Expression::Or(parse_spread(operand)?),
        "!" => {
            let inner = match operand {
                Value::Array(items) if items.len() == 1 => &items[0],
                other => other,
            };
            Expression::Not(Box::new(Expression::parse(inner)?))
        }
        "+" => Expression::Arithmetic(Arithmetic::Add, parse_spread(operand)?),
        "-" => Expression::Arithmetic(Arithmetic::Subtract, parse_spread(operand)?),
        "*" => Expression::Arithmetic(Arithmetic::Multiply, parse_spread(operand)?),
        "/" => Expression::Arithmetic(Arithmetic::Divide, parse_spread(operand)?),
        "if" => Expression::If(parse_spread(operand)?),
        "includes" => {
            let (collection, needle) = parse_pair("includes", operand)?;
            Expression::Includes(Box::new(collection), Box::new(needle))
        }
        name if RESERVED_OPERATORS.contains(&name) => {
            return Err(LogicError::UnsupportedOperator(name.to_string()))
        }
        _ => parse_record(map)?,
    };
    Ok(expression)
}

fn compare(
    comparison: Comparison,
    operator: &'static str,
    operand: &Value,
) -> Result<Expression, LogicError> {
    let (left, right) = parse_pair(operator, operand)?;
    Ok(Expression::Compare(comparison, Box::new(left), Box::new(right)))
}

fn parse_pair(
    operator: &'static str,
    operand: &Value,
) -> Result<(Expression, Expression), LogicError> {
    let Value::Array(items) = operand else {
        return Err(LogicError::OperandList { operator });
    };
    let mut parsed = parse_each(items)?.into_iter();
    let left = parsed.next().unwrap_or(Expression::Literal(LogicValue::Undefined));
    let right = parsed.next().unwrap_or(Expression::Literal(LogicValue::Undefined));
    Ok((left, right))
}

/// Variadic operators accept a bare operand as a one-element list.
fn parse_spread(operand: &Value) -> Result<Vec<Expression>, LogicError> {
    match operand {
        Value::Array(items) => parse_each(items),
        single => Ok(vec![Expression::parse(single)?]),
    }
}

fn parse_each(items: &[Value]) -> Result<Vec<Expression>, LogicError> {
    items.iter().map(Expression::parse).collect()
}

fn parse_record(map: &Map<String, Value>) -> Result<Expression, LogicError> {
    let fields = map
        .iter()
        .map(|(key, value)| Ok((key.clone(), Expression::parse(value)?)))
        .collect::<Result<BTreeMap<_, _>, LogicError>>()?;
    Ok(Expression::Record(fields))
}

fn parse_path(operand: &Value) -> Result<Option<Vec<String>>, LogicError> {
    match operand {
        Value::Null => Ok(None),
        Value::String(path) if path.is_empty() => Ok(None),
        Value::String(path) => Ok(Some(path.split('.').map(str::to_string).collect())),
        Value::Number(_) => Ok(Some(
            LogicValue::from(operand)
                .to_display()
                .split('.')
                .map(str::to_string)
                .collect(),
        )),
        Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                Value::String(segment) => Ok(segment.clone()),
                Value::Number(_) => Ok(LogicValue::from(part).to_display()),
                other => Err(LogicError::InvalidPath(other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(LogicError::InvalidPath(other.to_string())),
    }
}

fn evaluate_ladder(arguments: &[Expression], data: &LogicValue) -> LogicValue {
    let mut pairs = arguments.chunks_exact(2);
    for pair in pairs.by_ref() {
        if pair[0].evaluate(data).is_truthy() {
            return pair[1].evaluate(data);
        }
    }
    match pairs.remainder() {
        [otherwise] => otherwise.evaluate(data),
        _ => LogicValue::Null,
    }
}
