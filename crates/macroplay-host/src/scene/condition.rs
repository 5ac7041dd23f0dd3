//! Loop conditions evaluated against an in-memory scene
//!
//! A condition is `True`, `False`, a single operand tested for truthiness, or
//! a comparison `<operand> <op> <operand>`. Operands are numbers, quoted
//! strings, booleans, `selected_count`, or scene property names (optionally
//! written as `bpy.context.scene.<name>`).

use std::cmp::Ordering;

use macroplay_core::HostError;
use macroplay_events::CONTEXT_PREFIX;
use serde_json::Value;

use super::SceneState;

const OPERATORS: [&str; 6] = ["<=", ">=", "==", "!=", "<", ">"];

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Operand {
    fn truthy(&self) -> bool {
        match self {
            Operand::Number(n) => *n != 0.0,
            Operand::Text(s) => !s.is_empty(),
            Operand::Bool(b) => *b,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            Operand::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Operand::Text(_) => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Operand::Number(_) => "float",
            Operand::Text(_) => "str",
            Operand::Bool(_) => "bool",
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Operand::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Operand::Number),
            Value::String(s) => Some(Operand::Text(s.clone())),
            _ => None,
        }
    }
}

/// Parse a literal as written in a command (`3`, `-1.5`, `'text'`, `True`)
pub(crate) fn parse_literal(text: &str) -> Option<Value> {
    let text = text.trim();
    match text {
        "True" => return Some(Value::Bool(true)),
        "False" => return Some(Value::Bool(false)),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::from(n));
    }
    if let Ok(n) = text.parse::<f64>() {
        return serde_json::Number::from_f64(n).map(Value::Number);
    }
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(Value::String(text[1..text.len() - 1].to_string()));
        }
    }
    None
}

/// Property key for a name as written in a command or condition
pub(crate) fn property_key(name: &str) -> &str {
    let name = name.trim();
    let name = name.strip_prefix(CONTEXT_PREFIX).unwrap_or(name);
    name.strip_prefix("scene.").unwrap_or(name)
}

fn operand(state: &SceneState, text: &str) -> Result<Operand, HostError> {
    if let Some(value) = parse_literal(text) {
        if let Some(operand) = Operand::from_value(&value) {
            return Ok(operand);
        }
    }

    let key = property_key(text);
    if key == "selected_count" {
        return Ok(Operand::Number(state.selected().len() as f64));
    }
    state
        .properties
        .get(key)
        .and_then(Operand::from_value)
        .ok_or_else(|| HostError::new(format!("name '{}' is not defined", key)))
}

fn compare(lhs: &Operand, op: &str, rhs: &Operand) -> Result<bool, HostError> {
    let ordering = match (lhs, rhs) {
        (Operand::Text(a), Operand::Text(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };

    match (op, ordering) {
        ("==", ordering) => Ok(ordering == Some(Ordering::Equal)),
        ("!=", ordering) => Ok(ordering != Some(Ordering::Equal)),
        (_, None) => Err(HostError::new(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op,
            lhs.type_name(),
            rhs.type_name()
        ))),
        ("<", Some(o)) => Ok(o == Ordering::Less),
        ("<=", Some(o)) => Ok(o != Ordering::Greater),
        (">", Some(o)) => Ok(o == Ordering::Greater),
        (">=", Some(o)) => Ok(o != Ordering::Less),
        (op, _) => Err(HostError::new(format!("unsupported operator {}", op))),
    }
}

/// Evaluate a loop condition
pub fn evaluate(state: &SceneState, expression: &str) -> Result<bool, HostError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(HostError::new("invalid syntax: empty condition"));
    }

    for op in OPERATORS {
        if let Some(pos) = expression.find(op) {
            let lhs = operand(state, &expression[..pos])?;
            let rhs = operand(state, &expression[pos + op.len()..])?;
            return compare(&lhs, op, &rhs);
        }
    }

    operand(state, expression).map(|o| o.truthy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SceneState {
        let mut state = SceneState::default();
        state.set_property("counter", Value::from(2));
        state.set_property("mode", Value::from("EDIT"));
        state.add_object("Cube");
        state.add_object("Lamp");
        state
    }

    #[test]
    fn test_literals() {
        let state = state();
        assert!(evaluate(&state, "True").unwrap());
        assert!(!evaluate(&state, "False").unwrap());
        assert!(!evaluate(&state, "0").unwrap());
    }

    #[test]
    fn test_comparisons() {
        let state = state();
        assert!(evaluate(&state, "counter < 3").unwrap());
        assert!(evaluate(&state, "counter <= 2").unwrap());
        assert!(!evaluate(&state, "counter > 2").unwrap());
        assert!(evaluate(&state, "bpy.context.scene.counter == 2").unwrap());
        assert!(evaluate(&state, "mode == 'EDIT'").unwrap());
        assert!(evaluate(&state, "mode != 'OBJECT'").unwrap());
    }

    #[test]
    fn test_selected_count() {
        let mut state = state();
        assert!(evaluate(&state, "selected_count == 0").unwrap());
        state.object_mut("Cube").unwrap().selected = true;
        assert!(evaluate(&state, "selected_count >= 1").unwrap());
    }

    #[test]
    fn test_unknown_name() {
        let err = evaluate(&state(), "missing < 3").unwrap_err();
        assert_eq!(err.to_string(), "name 'missing' is not defined");
    }

    #[test]
    fn test_mismatched_ordering() {
        assert!(evaluate(&state(), "mode < 3").is_err());
        assert!(!evaluate(&state(), "mode == 3").unwrap());
    }
}
