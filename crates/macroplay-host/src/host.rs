//! The application collaborator the player drives

use macroplay_core::{AreaId, HostError, OperatorContext, SurfaceContext, WindowManager};
use macroplay_events::PlainCommand;

/// A plain command ready to be handed to the host
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: PlainCommand,
    pub operator_context: OperatorContext,
    /// Command text as recorded
    pub raw: String,
}

impl Invocation {
    pub fn new(raw: &str, operator_context: OperatorContext) -> Self {
        Self {
            command: PlainCommand::parse(raw),
            operator_context,
            raw: raw.trim().to_string(),
        }
    }

    /// Command text as dispatched, with the execution context injected into operator calls
    pub fn rendered(&self) -> String {
        match &self.command {
            PlainCommand::Operator(call) => call.render_with_context(self.operator_context.as_str()),
            _ => self.raw.clone(),
        }
    }
}

/// Transient script materialised for a single `Run Script` event
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptUnit {
    pub name: String,
    pub source: String,
}

impl ScriptUnit {
    /// Point an error report at this unit instead of the anonymous `<string>` source
    pub fn blame(&self, message: &str) -> String {
        message.replace("\"<string>\"", &format!("\"{}\"", self.name))
    }
}

/// Ambient application state and command execution
///
/// The player is the only caller while a pass runs, so implementations need
/// no internal locking.
pub trait Host {
    /// Window, screen, area and region the user is currently working in
    fn ambient_context(&self) -> SurfaceContext;

    fn surfaces(&self) -> &WindowManager;

    fn surfaces_mut(&mut self) -> &mut WindowManager;

    /// Whether an object with this name exists at all
    fn object_exists(&self, name: &str) -> bool;

    /// Whether the object is part of the active view layer
    fn object_in_view_layer(&self, name: &str) -> bool;

    /// Names of the selected objects, in selection order
    fn selected_objects(&self) -> Vec<String>;

    /// Change an object's selection state, returns false if it does not exist
    fn select_object(&mut self, name: &str, selected: bool) -> bool;

    fn deselect_all(&mut self) {
        for name in self.selected_objects() {
            self.select_object(&name, false);
        }
    }

    fn active_object(&self) -> Option<String>;

    fn set_active_object(&mut self, name: Option<&str>);

    /// Execute a plain command against a concrete surface
    fn invoke(&mut self, invocation: &Invocation, context: &SurfaceContext) -> Result<(), HostError>;

    /// Evaluate a loop condition against ambient state
    fn evaluate(&mut self, expression: &str) -> Result<bool, HostError>;

    fn run_script(&mut self, unit: &ScriptUnit) -> Result<(), HostError>;

    /// Ask the host to repaint an area after it was changed
    fn tag_redraw(&mut self, _area: AreaId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_injects_context() {
        let invocation = Invocation::new(
            "bpy.ops.object.select_all(action='SELECT')",
            OperatorContext::InvokeDefault,
        );
        assert_eq!(
            invocation.rendered(),
            r#"bpy.ops.object.select_all("INVOKE_DEFAULT", action='SELECT')"#
        );
    }

    #[test]
    fn test_rendered_keeps_non_operator_text() {
        let invocation = Invocation::new(" bpy.context.scene.frame_current = 2", OperatorContext::ExecDefault);
        assert_eq!(invocation.rendered(), "bpy.context.scene.frame_current = 2");
    }

    #[test]
    fn test_blame_rewrites_placeholder() {
        let unit = ScriptUnit {
            name: "m42".to_string(),
            source: String::new(),
        };
        let message = "Traceback:\n  File \"<string>\", line 3, in <module>\nNameError";
        assert_eq!(
            unit.blame(message),
            "Traceback:\n  File \"m42\", line 3, in <module>\nNameError"
        );
    }
}
