//! Declarative condition language interpreted by rule packs.

mod expression;
mod template;
mod value;

pub use expression::{evaluate, Arithmetic, Comparison, Expression, LogicError};
pub use template::{render_template, resolve, EXPRESSION_MARKER};
pub use value::LogicValue;

pub(crate) use value::{format_number, number_to_json};
