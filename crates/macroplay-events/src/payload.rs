use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::EVENT_PREFIX;
use crate::error::EventError;

/// Decoded pseudo-event, discriminated by its `Type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum EventPayload {
    /// Suspend playback for `Time` seconds
    Timer {
        #[serde(rename = "Time")]
        time: f64,
    },
    /// Start of a loop body
    Loop(LoopEvent),
    /// End of the innermost loop body
    EndLoop,
    /// Change the ambient object selection
    #[serde(rename = "Select Object")]
    SelectObject(SelectObjectEvent),
    /// Execute a transient script
    #[serde(rename = "Run Script")]
    RunScript {
        #[serde(rename = "ScriptText")]
        script_text: String,
    },
    /// Suspend until the host reports a finished render
    #[serde(rename = "Render Complete")]
    RenderComplete,
}

const KNOWN_TYPES: [&str; 6] = [
    "Timer",
    "Loop",
    "EndLoop",
    "Select Object",
    "Run Script",
    "Render Complete",
];

impl EventPayload {
    /// Decode the JSON part of an `ar.event:<json>` command
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value.get("Type").and_then(|t| t.as_str()) {
            Some(kind) if KNOWN_TYPES.contains(&kind) => Ok(serde_json::from_value(value)?),
            Some(kind) => Err(EventError::UnknownType(kind.to_string())),
            None => Err(EventError::UnknownType(String::from("<missing>"))),
        }
    }

    /// Encode as a macro command string
    pub fn to_command(&self) -> String {
        // Serializing a plain data enum cannot fail
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("{}:{}", EVENT_PREFIX, json)
    }

    /// Delay of a timer event
    ///
    /// NaN and negative values collapse to zero; values too large for a
    /// [`Duration`] saturate to [`Duration::MAX`].
    pub fn timer_delay(&self) -> Option<Duration> {
        match self {
            EventPayload::Timer { time } if *time > 0.0 => {
                Some(Duration::try_from_secs_f64(*time).unwrap_or(Duration::MAX))
            }
            EventPayload::Timer { .. } => Some(Duration::ZERO),
            _ => None,
        }
    }
}

/// Raw fields of a `Loop` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopEvent {
    #[serde(rename = "StatementType", default)]
    pub statement_type: String,

    #[serde(rename = "PyStatement", default, skip_serializing_if = "Option::is_none")]
    pub py_statement: Option<String>,

    #[serde(rename = "Startnumber", default, skip_serializing_if = "Option::is_none")]
    pub start_number: Option<f64>,

    #[serde(rename = "Endnumber", default, skip_serializing_if = "Option::is_none")]
    pub end_number: Option<f64>,

    #[serde(rename = "Stepnumber", default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<f64>,

    #[serde(rename = "RepeatCount", default, skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<i64>,
}

/// How a loop decides how often its body runs
#[derive(Debug, Clone, PartialEq)]
pub enum LoopStatement {
    /// Re-run the body while the host evaluates the expression to true
    Condition(String),
    /// Deprecated numeric range `start..end` by `step`
    Range { start: f64, end: f64, step: f64 },
    /// Run the body a fixed number of times, cooperating with timers
    Repeat(i64),
}

impl LoopEvent {
    /// Counted loop running the body `count` times
    pub fn repeat(count: i64) -> Self {
        Self {
            statement_type: String::from("count_loop"),
            repeat_count: Some(count),
            ..Default::default()
        }
    }

    /// Conditional loop evaluated against ambient state
    pub fn condition(statement: impl Into<String>) -> Self {
        Self {
            statement_type: String::from("python"),
            py_statement: Some(statement.into()),
            ..Default::default()
        }
    }

    /// Resolve the statement kind, checking that its fields are present
    pub fn statement(&self) -> Result<LoopStatement, EventError> {
        match self.statement_type.as_str() {
            "python" => self
                .py_statement
                .clone()
                .map(LoopStatement::Condition)
                .ok_or(EventError::MissingField {
                    kind: "Loop",
                    field: "PyStatement",
                }),
            "count" => {
                let missing = |field| EventError::MissingField {
                    kind: "Loop",
                    field,
                };
                Ok(LoopStatement::Range {
                    start: self.start_number.ok_or_else(|| missing("Startnumber"))?,
                    end: self.end_number.ok_or_else(|| missing("Endnumber"))?,
                    step: self.step_number.ok_or_else(|| missing("Stepnumber"))?,
                })
            }
            _ => self
                .repeat_count
                .map(LoopStatement::Repeat)
                .ok_or(EventError::MissingField {
                    kind: "Loop",
                    field: "RepeatCount",
                }),
        }
    }
}

/// Fields of a `Select Object` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectObjectEvent {
    #[serde(rename = "KeepSelection", default)]
    pub keep_selection: bool,

    #[serde(rename = "Objects", default)]
    pub objects: Vec<String>,

    #[serde(rename = "Object", default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
}

impl SelectObjectEvent {
    /// The primary object, treating an empty name as absent
    pub fn primary(&self) -> Option<&str> {
        self.object.as_deref().filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_timer() {
        let payload = EventPayload::from_json(r#"{"Type": "Timer", "Time": 1.5}"#).unwrap();
        assert_eq!(payload, EventPayload::Timer { time: 1.5 });
        assert_eq!(payload.timer_delay(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_negative_timer_is_immediate() {
        let payload = EventPayload::Timer { time: -3.0 };
        assert_eq!(payload.timer_delay(), Some(Duration::ZERO));
    }

    #[test]
    fn test_huge_timer_saturates() {
        let payload = EventPayload::from_json(r#"{"Type": "Timer", "Time": 1e20}"#).unwrap();
        assert_eq!(payload.timer_delay(), Some(Duration::MAX));
        assert_eq!(
            EventPayload::Timer { time: f64::NAN }.timer_delay(),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_decode_select_object_defaults() {
        let payload =
            EventPayload::from_json(r#"{"Type": "Select Object", "Object": ""}"#).unwrap();
        let EventPayload::SelectObject(select) = payload else {
            panic!("expected select object");
        };
        assert!(!select.keep_selection);
        assert!(select.objects.is_empty());
        assert_eq!(select.primary(), None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = EventPayload::from_json(r#"{"Type": "Teleport"}"#).unwrap_err();
        assert!(matches!(err, EventError::UnknownType(ref t) if t == "Teleport"));

        let err = EventPayload::from_json(r#"{"Time": 2}"#).unwrap_err();
        assert!(matches!(err, EventError::UnknownType(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = EventPayload::from_json("{not json").unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));
    }

    #[test]
    fn test_loop_statements() {
        let python = LoopEvent::condition("n < 3");
        assert_eq!(
            python.statement().unwrap(),
            LoopStatement::Condition("n < 3".to_string())
        );

        let legacy: LoopEvent = serde_json::from_str(
            r#"{"StatementType": "count", "Startnumber": 0, "Endnumber": 4, "Stepnumber": 2}"#,
        )
        .unwrap();
        assert_eq!(
            legacy.statement().unwrap(),
            LoopStatement::Range {
                start: 0.0,
                end: 4.0,
                step: 2.0
            }
        );

        assert_eq!(LoopEvent::repeat(3).statement().unwrap(), LoopStatement::Repeat(3));
    }

    #[test]
    fn test_loop_missing_fields() {
        let counted = LoopEvent {
            statement_type: "count_loop".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            counted.statement(),
            Err(EventError::MissingField {
                field: "RepeatCount",
                ..
            })
        ));

        let legacy = LoopEvent {
            statement_type: "count".to_string(),
            start_number: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            legacy.statement(),
            Err(EventError::MissingField {
                field: "Endnumber",
                ..
            })
        ));
    }

    #[test]
    fn test_to_command_uses_wire_names() {
        let command = EventPayload::RunScript {
            script_text: "print()".to_string(),
        }
        .to_command();
        assert!(command.starts_with("ar.event:"));
        assert!(command.contains(r#""Type":"Run Script""#));
        assert!(command.contains(r#""ScriptText":"print()""#));
    }
}
