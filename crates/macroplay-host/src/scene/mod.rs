//! In-memory host used by the command-line player and the tests
//!
//! [`SceneHost`] keeps a flat list of named objects, scene properties and a
//! window layout, and executes operator calls through a [`CommandRegistry`].
//! Every successful invocation is recorded in a journal.

mod condition;
mod registry;

use std::collections::BTreeMap;

use macroplay_core::{
    Area, AreaId, HostError, OperatorContext, Region, RegionId, RegionKind, Screen, ScreenId,
    SurfaceContext, Window, WindowId, WindowManager,
};
use macroplay_events::PlainCommand;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::host::{Host, Invocation, ScriptUnit};

pub use condition::evaluate;
pub use registry::{CommandHandler, CommandRegistry};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default = "default_true")]
    pub in_view_layer: bool,
    #[serde(default)]
    pub selected: bool,
    /// Labels attached by `object.tag`
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Mutable state of the in-memory scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default = "default_surfaces")]
    pub surfaces: WindowManager,
    /// Surface the user is working in; the first window when unset
    #[serde(default)]
    pub ambient: SurfaceContext,
}

/// A single window showing a 3D viewport
pub fn default_surfaces() -> WindowManager {
    let regions = [
        RegionKind::Header,
        RegionKind::Tools,
        RegionKind::Ui,
        RegionKind::Window,
    ];
    WindowManager {
        windows: vec![Window {
            id: WindowId(1),
            screen: Screen {
                id: ScreenId(1),
                areas: vec![Area {
                    id: AreaId(1),
                    ui_type: "VIEW_3D".to_string(),
                    regions: regions
                        .into_iter()
                        .zip(1..)
                        .map(|(kind, id)| Region {
                            id: RegionId(id),
                            kind,
                        })
                        .collect(),
                }],
            },
        }],
    }
}

impl Default for SceneState {
    fn default() -> Self {
        let surfaces = default_surfaces();
        let ambient = surfaces
            .windows
            .first()
            .map(SurfaceContext::for_window)
            .unwrap_or_default();
        Self {
            objects: Vec::new(),
            active: None,
            properties: BTreeMap::new(),
            surfaces,
            ambient,
        }
    }
}

impl SceneState {
    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.name == name)
    }

    /// Insert an unselected object into the view layer, or return the existing one
    pub fn add_object(&mut self, name: &str) -> &mut SceneObject {
        let index = match self.objects.iter().position(|object| object.name == name) {
            Some(index) => index,
            None => {
                self.objects.push(SceneObject {
                    name: name.to_string(),
                    in_view_layer: true,
                    selected: false,
                    tags: Vec::new(),
                });
                self.objects.len() - 1
            }
        };
        &mut self.objects[index]
    }

    pub fn selected(&self) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|object| object.selected)
            .map(|object| object.name.as_str())
            .collect()
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(condition::property_key(key))
    }

    pub fn set_property(&mut self, key: &str, value: Value) {
        self.properties
            .insert(condition::property_key(key).to_string(), value);
    }

    fn area_type(&self, context: &SurfaceContext) -> Option<&str> {
        context
            .area
            .and_then(|id| self.surfaces.area(id))
            .map(|area| area.ui_type.as_str())
    }
}

/// One executed command
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Command text as dispatched
    pub command: String,
    pub context: SurfaceContext,
    /// UI type of the target area when the command ran
    pub ui_type: Option<String>,
    pub active: Option<String>,
    pub selected: Vec<String>,
}

/// [`Host`] over a [`SceneState`]
#[derive(Debug)]
pub struct SceneHost {
    state: SceneState,
    registry: CommandRegistry,
    journal: Vec<JournalEntry>,
    redraws: Vec<AreaId>,
}

impl Default for SceneHost {
    fn default() -> Self {
        Self::new(SceneState::default())
    }
}

impl SceneHost {
    pub fn new(state: SceneState) -> Self {
        Self::with_registry(state, CommandRegistry::with_builtins())
    }

    pub fn with_registry(mut state: SceneState, registry: CommandRegistry) -> Self {
        if state.ambient.area.is_none() {
            if let Some(window) = state.surfaces.windows.first() {
                state.ambient = SurfaceContext::for_window(window);
            }
        }
        Self {
            state,
            registry,
            journal: Vec::new(),
            redraws: Vec::new(),
        }
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Dispatched command texts, in execution order
    pub fn executed(&self) -> Vec<&str> {
        self.journal.iter().map(|entry| entry.command.as_str()).collect()
    }

    /// Areas a redraw was requested for
    pub fn redraws(&self) -> &[AreaId] {
        &self.redraws
    }

    fn dispatch(&mut self, invocation: &Invocation, context: &SurfaceContext) -> Result<(), HostError> {
        match &invocation.command {
            PlainCommand::Operator(call) => {
                let id = call.id();
                let handler = self.registry.get(&id).ok_or_else(|| {
                    HostError::new(format!(
                        "Calling operator \"bpy.ops.{}\" error, could not be found",
                        id
                    ))
                })?;
                if let Some(required) = handler.required_area() {
                    if self.state.area_type(context) != Some(required) {
                        return Err(HostError::new(format!(
                            "Operator bpy.ops.{}.poll() failed, context is incorrect",
                            id
                        )));
                    }
                }
                handler.invoke(&mut self.state, call, context)
            }
            PlainCommand::ContextAssign { path, value } => {
                let value = condition::parse_literal(value)
                    .ok_or_else(|| HostError::new(format!("invalid syntax: {}", value)))?;
                self.state.set_property(&path.join("."), value);
                Ok(())
            }
            PlainCommand::Expression(text) => {
                Err(HostError::new(format!("invalid syntax: {}", text)))
            }
        }
    }
}

impl Host for SceneHost {
    fn ambient_context(&self) -> SurfaceContext {
        self.state.ambient
    }

    fn surfaces(&self) -> &WindowManager {
        &self.state.surfaces
    }

    fn surfaces_mut(&mut self) -> &mut WindowManager {
        &mut self.state.surfaces
    }

    fn object_exists(&self, name: &str) -> bool {
        self.state.object(name).is_some()
    }

    fn object_in_view_layer(&self, name: &str) -> bool {
        self.state.object(name).is_some_and(|object| object.in_view_layer)
    }

    fn selected_objects(&self) -> Vec<String> {
        self.state.selected().into_iter().map(String::from).collect()
    }

    fn select_object(&mut self, name: &str, selected: bool) -> bool {
        match self.state.object_mut(name) {
            Some(object) => {
                object.selected = selected;
                true
            }
            None => false,
        }
    }

    fn active_object(&self) -> Option<String> {
        self.state.active.clone()
    }

    fn set_active_object(&mut self, name: Option<&str>) {
        self.state.active = name.map(String::from);
    }

    fn invoke(&mut self, invocation: &Invocation, context: &SurfaceContext) -> Result<(), HostError> {
        self.dispatch(invocation, context)?;
        let entry = JournalEntry {
            command: invocation.rendered(),
            context: *context,
            ui_type: self.state.area_type(context).map(String::from),
            active: self.state.active.clone(),
            selected: self.selected_objects(),
        };
        debug!(target: "playback", "Executed {}", entry.command);
        self.journal.push(entry);
        Ok(())
    }

    fn evaluate(&mut self, expression: &str) -> Result<bool, HostError> {
        condition::evaluate(&self.state, expression)
    }

    fn run_script(&mut self, unit: &ScriptUnit) -> Result<(), HostError> {
        let context = self.state.ambient;
        for (index, line) in unit.source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invocation = Invocation::new(line, OperatorContext::ExecDefault);
            if let Err(err) = self.invoke(&invocation, &context) {
                return Err(HostError::new(format!(
                    "Traceback (most recent call last):\n  File \"<string>\", line {}, in <module>\n{}",
                    index + 1,
                    err
                )));
            }
        }
        Ok(())
    }

    fn tag_redraw(&mut self, area: AreaId) {
        self.redraws.push(area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let host = SceneHost::default();
        let context = host.ambient_context();
        assert_eq!(context.area, Some(AreaId(1)));
        assert_eq!(context.region, Some(RegionId(4)));
    }

    #[test]
    fn test_context_assignment_sets_property() {
        let mut host = SceneHost::default();
        let invocation = Invocation::new("bpy.context.scene.frame_current = 7", OperatorContext::ExecDefault);
        let context = host.ambient_context();
        host.invoke(&invocation, &context).unwrap();
        assert_eq!(host.state().property("frame_current"), Some(&Value::from(7)));
    }

    #[test]
    fn test_unknown_operator() {
        let mut host = SceneHost::default();
        let invocation = Invocation::new("bpy.ops.object.fly()", OperatorContext::ExecDefault);
        let context = host.ambient_context();
        let err = host.invoke(&invocation, &context).unwrap_err();
        assert!(err.to_string().contains("bpy.ops.object.fly"));
        assert!(host.journal().is_empty());
    }

    #[test]
    fn test_poll_checks_area_type() {
        let mut host = SceneHost::default();
        let invocation = Invocation::new("bpy.ops.view3d.snap_cursor_to_center()", OperatorContext::ExecDefault);
        let context = host.ambient_context();
        host.invoke(&invocation, &context).unwrap();

        host.state_mut().surfaces.area_mut(AreaId(1)).unwrap().ui_type = "IMAGE_EDITOR".to_string();
        let err = host.invoke(&invocation, &context).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operator bpy.ops.view3d.snap_cursor_to_center.poll() failed, context is incorrect"
        );
    }

    #[test]
    fn test_script_failure_reports_line() {
        let mut host = SceneHost::default();
        let unit = ScriptUnit {
            name: "script".to_string(),
            source: "# setup\nbpy.ops.object.add(name='A')\n\nbpy.ops.object.fly()".to_string(),
        };
        let err = host.run_script(&unit).unwrap_err();
        assert!(err.to_string().contains("File \"<string>\", line 4, in <module>"));
        assert!(host.state().object("A").is_some());
    }

    #[test]
    fn test_scene_state_from_json() {
        let state: SceneState = serde_json::from_str(
            r#"{"objects": [{"name": "Cube", "selected": true}, {"name": "Hidden", "in_view_layer": false}]}"#,
        )
        .unwrap();
        let host = SceneHost::new(state);
        assert!(host.object_in_view_layer("Cube"));
        assert!(host.object_exists("Hidden"));
        assert!(!host.object_in_view_layer("Hidden"));
        assert_eq!(host.selected_objects(), vec!["Cube"]);
        assert_eq!(host.ambient_context().area, Some(AreaId(1)));
    }
}
