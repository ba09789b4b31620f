use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use super::expression::{evaluate, LogicError};
use super::value::LogicValue;

/// Key that marks a single-key object as an expression rather than data.
pub const EXPRESSION_MARKER: &str = "expr";

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([^}]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Expands `{{path}}` placeholders; missing values render as `unknown`.
pub fn render_template(template: &str, data: &LogicValue) -> String {
    placeholder()
        .replace_all(template, |captures: &Captures<'_>| {
            match data.lookup_path(captures[1].trim()) {
                LogicValue::Undefined | LogicValue::Null => "unknown".to_string(),
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
                    .join(", "),
                other => other.to_display(),
            }
        })
        .into_owned()
}

/// Materialises a declarative value against the evaluation context.
pub fn resolve(value: &Value, data: &LogicValue) -> Result<LogicValue, LogicError> {
    match value {
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                let item = resolve(item, data)?;
                if !is_blank(&item) {
                    resolved.push(item);
                }
            }
            Ok(LogicValue::Array(resolved))
        }
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(expression) = map.get(EXPRESSION_MARKER) {
                    if LogicValue::from(expression).is_truthy() {
                        return evaluate(expression, data);
                    }
                }
            }
            let mut resolved = std::collections::BTreeMap::new();
            for (key, child) in map {
                resolved.insert(key.clone(), resolve(child, data)?);
            }
            Ok(LogicValue::Object(resolved))
        }
        Value::String(template) => Ok(LogicValue::String(render_template(template, data))),
        literal => Ok(LogicValue::from(literal)),
    }
}

fn is_blank(value: &LogicValue) -> bool {
    match value {
        LogicValue::Undefined | LogicValue::Null => true,
        LogicValue::String(text) => text.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> LogicValue {
        LogicValue::from(json!({
            "patient": { "age": 28, "sex": "female", "postcode": null },
            "answers": { "durationDays": 2, "symptoms": ["dysuria", "frequency"] },
            "derived": { "symptomCount": 2 }
        }))
    }

    #[test]
    fn placeholders_render_values_lists_and_unknowns() {
        let data = context();
        assert_eq!(
            render_template("Duration recorded as {{ answers.durationDays }} day(s).", &data),
            "Duration recorded as 2 day(s)."
        );
        assert_eq!(render_template("{{answers.symptoms}}", &data), "dysuria, frequency");
        assert_eq!(render_template("Postcode {{patient.postcode}}", &data), "Postcode unknown");
        assert_eq!(render_template("No placeholders", &data), "No placeholders");
    }

    #[test]
    fn arrays_drop_blank_entries() {
        let resolved = resolve(
            &json!([
                "Hydration advice.",
                { "expr": { "if": [{ "var": "answers.missing" }, "Never shown."] } },
                "",
                null,
                "{{derived.symptomCount}} core symptoms recorded."
            ]),
            &context(),
        )
        .expect("resolves");
        assert_eq!(
            resolved,
            LogicValue::from(json!(["Hydration advice.", "2 core symptoms recorded."]))
        );
    }

    #[test]
    fn expression_marker_delegates_to_evaluator() {
        let resolved = resolve(
            &json!({ "expr": { ">=": [{ "var": "derived.symptomCount" }, 2] } }),
            &context(),
        )
        .expect("resolves");
        assert_eq!(resolved, LogicValue::Bool(true));
    }

    #[test]
    fn objects_resolve_keywise() {
        let resolved = resolve(
            &json!({
                "product": "Nitrofurantoin 100 mg modified release capsules",
                "notes": "Patient aged {{patient.age}}.",
                "expr": "kept as data alongside other keys"
            }),
            &context(),
        )
        .expect("resolves");
        assert_eq!(
            resolved,
            LogicValue::from(json!({
                "product": "Nitrofurantoin 100 mg modified release capsules",
                "notes": "Patient aged 28.",
                "expr": "kept as data alongside other keys"
            }))
        );
    }

    #[test]
    fn unsupported_operator_inside_marker_is_an_error() {
        let error = resolve(&json!({ "expr": { "max": [1, 2] } }), &context())
            .expect_err("reserved operator");
        assert_eq!(error, LogicError::UnsupportedOperator("max".to_string()));
    }
}
