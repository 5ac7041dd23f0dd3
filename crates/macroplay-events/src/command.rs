//! Plain (non-event) macro commands
//!
//! Recorded commands are textual invocation expressions. They are parsed once
//! into a [`PlainCommand`]; operator calls keep their arguments as raw
//! `key=value` text so they can be forwarded to the host untouched.

use crate::{CONTEXT_PREFIX, DATA_PREFIX, OPERATOR_PREFIX};

/// A call into the host's operator namespace, e.g. `bpy.ops.object.select_all(action='SELECT')`
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorCall {
    /// Operator module (`object` in `object.select_all`)
    pub module: String,
    /// Operator name (`select_all` in `object.select_all`)
    pub name: String,
    /// Raw positional arguments preceding the first `key=value`, empty when none
    pub positional: String,
    /// Arguments as `(key, raw value)` pairs, in call order
    pub args: Vec<(String, String)>,
}

impl OperatorCall {
    /// Operator id in `module.name` form
    pub fn id(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    /// Raw value of an argument
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Argument value with surrounding quotes removed
    pub fn string_arg(&self, key: &str) -> Option<String> {
        self.arg(key).map(|value| unquote(value).to_string())
    }

    /// Whether the call carries exactly this set of arguments
    pub fn has_exactly_args(&self, expected: &[(&str, &str)]) -> bool {
        self.args.len() == expected.len()
            && expected
                .iter()
                .all(|(key, value)| self.arg(key) == Some(*value))
    }

    /// Render the call with an execution context injected as first argument
    pub fn render_with_context(&self, execution_context: &str) -> String {
        let mut parts = vec![format!("\"{}\"", execution_context)];
        if !self.positional.is_empty() {
            parts.push(self.positional.clone());
        }
        parts.extend(self.args.iter().map(|(k, v)| format!("{}={}", k, v)));
        format!("{}{}({})", OPERATOR_PREFIX, self.id(), parts.join(", "))
    }
}

/// A parsed plain command
#[derive(Debug, Clone, PartialEq)]
pub enum PlainCommand {
    /// `bpy.ops.<module>.<name>(<args>)`
    Operator(OperatorCall),
    /// `bpy.context.<path> = <value>`
    ContextAssign { path: Vec<String>, value: String },
    /// Anything else, handed to the host verbatim
    Expression(String),
}

impl PlainCommand {
    pub fn parse(command: &str) -> Self {
        let trimmed = command.trim();
        if let Some(call) = parse_operator(trimmed) {
            return PlainCommand::Operator(call);
        }
        if let Some(rest) = trimmed.strip_prefix(CONTEXT_PREFIX) {
            if let Some((lhs, rhs)) = split_assignment(rest) {
                return PlainCommand::ContextAssign {
                    path: lhs.split('.').map(|s| s.trim().to_string()).collect(),
                    value: rhs.trim().to_string(),
                };
            }
        }
        PlainCommand::Expression(trimmed.to_string())
    }
}

fn parse_operator(command: &str) -> Option<OperatorCall> {
    let rest = command.strip_prefix(OPERATOR_PREFIX)?;
    let (path, tail) = rest.split_once('(')?;
    let inner = tail.trim_end().strip_suffix(')')?;
    let (module, name) = path.trim().rsplit_once('.')?;
    if module.is_empty() || name.is_empty() {
        return None;
    }

    let (positional, keywords) = split_positional(inner);
    let args = extract_properties(keywords)
        .into_iter()
        .filter_map(|prop| {
            prop.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect();

    Some(OperatorCall {
        module: module.to_string(),
        name: name.to_string(),
        positional: positional.to_string(),
        args,
    })
}

/// Split an argument list into its leading positional text and the keyword part
fn split_positional(inner: &str) -> (&str, &str) {
    let mut offset = 0;
    for piece in inner.split(',') {
        if starts_property(piece) {
            break;
        }
        offset += piece.len() + 1;
    }
    let offset = offset.min(inner.len());
    let positional = inner[..offset].trim().trim_end_matches(',').trim_end();
    (positional, &inner[offset..])
}

/// Whether a comma-separated piece looks like `identifier=...`
fn starts_property(piece: &str) -> bool {
    piece
        .split_once('=')
        .is_some_and(|(key, _)| is_identifier(key.trim()))
}

/// Split `lhs = rhs` on the first lone `=` (not part of `==`, `<=`, ...)
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'=' {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1).copied();
        if matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || next == Some(b'=') {
            continue;
        }
        return Some((&text[..i], &text[i + 1..]));
    }
    None
}

/// Split an argument list `prop1=a, prop2=(1, 2)` into `["prop1=a", "prop2=(1, 2)"]`
///
/// A comma-separated piece only starts a new property when it looks like
/// `identifier=...`; otherwise it belongs to the previous property's value.
pub fn extract_properties(properties: &str) -> Vec<String> {
    let mut props: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for piece in properties.split(',') {
        if starts_property(piece) {
            if let Some(done) = current.take() {
                props.push(done.trim().to_string());
            }
            current = Some(piece.to_string());
        } else if let Some(prop) = current.as_mut() {
            prop.push(',');
            prop.push_str(piece);
        }
    }

    if let Some(done) = current {
        props.push(done.trim().to_string());
    }
    props
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Short human-readable label for a command, used in listings
///
/// Operators show their id, context assignments show `property = value`
/// (data-block references reduced to their name), and context paths without
/// an assignment show their last two segments.
pub fn display_name(command: &str) -> Option<String> {
    let command = command.trim();
    if command.starts_with(OPERATOR_PREFIX) {
        return parse_operator(command).map(|call| call.id());
    }

    let rest = command.strip_prefix(CONTEXT_PREFIX)?;
    match split_assignment(rest) {
        Some((lhs, rhs)) => {
            let prop = lhs.trim().rsplit('.').next().unwrap_or_default();
            let mut value = rhs.trim();
            if value.starts_with(DATA_PREFIX) {
                value = value
                    .rsplit('[')
                    .next()
                    .unwrap_or(value)
                    .trim_end_matches(']');
                value = unquote(value);
            }
            Some(format!("{} = {}", prop, value))
        }
        None => {
            let segments: Vec<&str> = command.split('.').collect();
            let start = segments.len().saturating_sub(2);
            Some(segments[start..].join("."))
        }
    }
}
