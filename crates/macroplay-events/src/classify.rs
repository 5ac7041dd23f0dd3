use crate::EVENT_PREFIX;
use crate::command::PlainCommand;
use crate::error::EventError;
use crate::payload::EventPayload;

/// Kind of a macro record, as seen by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Plain,
    Timer,
    Loop,
    EndLoop,
    SelectObject,
    RunScript,
    RenderCompleteWait,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Plain => "plain",
            EventKind::Timer => "timer",
            EventKind::Loop => "loop",
            EventKind::EndLoop => "end loop",
            EventKind::SelectObject => "select object",
            EventKind::RunScript => "run script",
            EventKind::RenderCompleteWait => "render complete",
        };
        f.write_str(name)
    }
}

/// A macro command decoded into its typed form
#[derive(Debug, Clone, PartialEq)]
pub enum MacroCommand {
    Plain(PlainCommand),
    Event(EventPayload),
}

impl MacroCommand {
    pub fn kind(&self) -> EventKind {
        match self {
            MacroCommand::Plain(_) => EventKind::Plain,
            MacroCommand::Event(EventPayload::Timer { .. }) => EventKind::Timer,
            MacroCommand::Event(EventPayload::Loop(_)) => EventKind::Loop,
            MacroCommand::Event(EventPayload::EndLoop) => EventKind::EndLoop,
            MacroCommand::Event(EventPayload::SelectObject(_)) => EventKind::SelectObject,
            MacroCommand::Event(EventPayload::RunScript { .. }) => EventKind::RunScript,
            MacroCommand::Event(EventPayload::RenderComplete) => EventKind::RenderCompleteWait,
        }
    }
}

/// Split an event command into its JSON part, if it carries the event prefix
fn event_json(command: &str) -> Option<&str> {
    command
        .split_once(':')
        .filter(|(head, _)| *head == EVENT_PREFIX)
        .map(|(_, json)| json)
}

/// Whether the command is a pseudo-event (`ar.event:<json>`)
pub fn is_event(command: &str) -> bool {
    event_json(command).is_some()
}

/// Decode a macro command
///
/// Plain commands never fail to classify; only event payloads are decoded and
/// may be rejected.
pub fn classify(command: &str) -> Result<MacroCommand, EventError> {
    match event_json(command) {
        Some(json) => EventPayload::from_json(json).map(MacroCommand::Event),
        None => Ok(MacroCommand::Plain(PlainCommand::parse(command))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::LoopEvent;

    #[test]
    fn test_classify_kinds() {
        let cases = [
            (r#"ar.event:{"Type": "Timer", "Time": 1}"#, EventKind::Timer),
            (
                r#"ar.event:{"Type": "Loop", "StatementType": "count_loop", "RepeatCount": 2}"#,
                EventKind::Loop,
            ),
            (r#"ar.event:{"Type": "EndLoop"}"#, EventKind::EndLoop),
            (
                r#"ar.event:{"Type": "Select Object", "Objects": ["Cube"]}"#,
                EventKind::SelectObject,
            ),
            (
                r#"ar.event:{"Type": "Run Script", "ScriptText": "x"}"#,
                EventKind::RunScript,
            ),
            (
                r#"ar.event:{"Type": "Render Complete"}"#,
                EventKind::RenderCompleteWait,
            ),
            ("bpy.ops.object.delete()", EventKind::Plain),
        ];

        for (command, expected) in cases {
            assert_eq!(classify(command).unwrap().kind(), expected, "{command}");
        }
    }

    #[test]
    fn test_json_may_contain_colons() {
        let command = r#"ar.event:{"Type": "Run Script", "ScriptText": "a: b"}"#;
        let MacroCommand::Event(EventPayload::RunScript { script_text }) =
            classify(command).unwrap()
        else {
            panic!("expected run script");
        };
        assert_eq!(script_text, "a: b");
    }

    #[test]
    fn test_prefix_must_be_exact() {
        assert!(!is_event("ar.events:{}"));
        assert!(!is_event("bpy.ops.ar.event()"));
        assert!(is_event("ar.event:{}"));
    }

    #[test]
    fn test_malformed_event_is_an_error() {
        assert!(classify("ar.event:{oops").is_err());
    }

    #[test]
    fn test_encoded_loop_classifies_back() {
        let command = EventPayload::Loop(LoopEvent::repeat(4)).to_command();
        let decoded = classify(&command).unwrap();
        assert_eq!(decoded, MacroCommand::Event(EventPayload::Loop(LoopEvent::repeat(4))));
    }
}
