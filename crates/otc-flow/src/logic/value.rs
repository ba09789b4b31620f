use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

/// Dynamic value flowing through expressions and templates.
///
/// `Undefined` is distinct from `Null`: a path lookup that misses yields `Undefined`, while a
/// normalised-but-unanswered intake field is `Null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LogicValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<LogicValue>),
    Object(BTreeMap<String, LogicValue>),
}

impl LogicValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            LogicValue::Undefined | LogicValue::Null => false,
            LogicValue::Bool(value) => *value,
            LogicValue::Number(value) => *value != 0.0 && !value.is_nan(),
            LogicValue::String(value) => !value.is_empty(),
            LogicValue::Array(_) | LogicValue::Object(_) => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, LogicValue::Undefined | LogicValue::Null)
    }

    /// Numeric conversion used by relational operators.
    pub fn to_number(&self) -> f64 {
        match self {
            LogicValue::Undefined | LogicValue::Object(_) => f64::NAN,
            LogicValue::Null => 0.0,
            LogicValue::Bool(value) => f64::from(u8::from(*value)),
            LogicValue::Number(value) => *value,
            LogicValue::String(value) => parse_numeric(value),
            LogicValue::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => LogicValue::String(single.to_display()).to_number(),
                _ => f64::NAN,
            },
        }
    }

    /// Arithmetic operand coercion: falsy values count as zero.
    pub fn to_operand(&self) -> f64 {
        if self.is_truthy() {
            self.to_number()
        } else {
            0.0
        }
    }

    /// Text form used when a value is interpolated into prose.
    pub fn to_display(&self) -> String {
        match self {
            LogicValue::Undefined => "undefined".to_string(),
            LogicValue::Null => "null".to_string(),
            LogicValue::Bool(value) => value.to_string(),
            LogicValue::Number(value) => format_number(*value),
            LogicValue::String(value) => value.clone(),
            LogicValue::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_display()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            LogicValue::Object(_) => "[object Object]".to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LogicValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> LogicValue {
        match self {
            LogicValue::Object(map) => map.get(key).cloned().unwrap_or_default(),
            LogicValue::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .cloned()
                .unwrap_or_default(),
            LogicValue::String(value) if key == "length" => {
                LogicValue::Number(value.chars().count() as f64)
            }
            _ => LogicValue::Undefined,
        }
    }

    /// Walks a dotted path; any missing segment yields `Undefined`.
    pub fn lookup<'a, I>(&self, segments: I) -> LogicValue
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self.clone();
        for segment in segments {
            if current.is_nullish() {
                return LogicValue::Undefined;
            }
            current = current.get(segment);
        }
        current
    }

    pub fn lookup_path(&self, path: &str) -> LogicValue {
        if path.is_empty() {
            return self.clone();
        }
        self.lookup(path.split('.'))
    }

    pub fn strict_equals(&self, other: &LogicValue) -> bool {
        self == other
    }

    /// Membership test that treats NaN as equal to itself.
    pub fn same_value_zero(&self, other: &LogicValue) -> bool {
        match (self, other) {
            (LogicValue::Number(left), LogicValue::Number(right)) => {
                (left.is_nan() && right.is_nan()) || left == right
            }
            _ => self == other,
        }
    }

    /// Relational ordering: strings compare lexically, everything else numerically.
    pub fn loose_cmp(&self, other: &LogicValue) -> Option<Ordering> {
        if let (LogicValue::String(left), LogicValue::String(right)) = (self, other) {
            return Some(left.cmp(right));
        }
        self.to_number().partial_cmp(&other.to_number())
    }

    pub fn to_json(&self) -> Value {
        match self {
            LogicValue::Undefined | LogicValue::Null => Value::Null,
            LogicValue::Bool(value) => Value::Bool(*value),
            LogicValue::Number(value) => number_to_json(*value),
            LogicValue::String(value) => Value::String(value.clone()),
            LogicValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            LogicValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

impl From<&Value> for LogicValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => LogicValue::Null,
            Value::Bool(flag) => LogicValue::Bool(*flag),
            Value::Number(number) => LogicValue::Number(number.as_f64().unwrap_or(f64::NAN)),
            Value::String(text) => LogicValue::String(text.clone()),
            Value::Array(items) => LogicValue::Array(items.iter().map(LogicValue::from).collect()),
            Value::Object(map) => LogicValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), LogicValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for LogicValue {
    fn from(value: Value) -> Self {
        LogicValue::from(&value)
    }
}

impl From<bool> for LogicValue {
    fn from(value: bool) -> Self {
        LogicValue::Bool(value)
    }
}

impl From<f64> for LogicValue {
    fn from(value: f64) -> Self {
        LogicValue::Number(value)
    }
}

impl From<&str> for LogicValue {
    fn from(value: &str) -> Self {
        LogicValue::String(value.to_string())
    }
}

impl From<String> for LogicValue {
    fn from(value: String) -> Self {
        LogicValue::String(value)
    }
}

impl<T: Into<LogicValue>> From<Option<T>> for LogicValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(LogicValue::Null)
    }
}

pub(crate) fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1.0e21 {
        return format!("{}", value as i128);
    }
    value.to_string()
}

fn parse_numeric(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => {
            f64::NAN
        }
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}
