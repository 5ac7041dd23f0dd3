//! Operator handlers of the in-memory scene

use std::collections::HashMap;

use macroplay_core::{HostError, SurfaceContext};
use macroplay_events::OperatorCall;
use serde_json::Value;

use super::SceneState;
use super::condition::parse_literal;

/// One operator the scene knows how to run
pub trait CommandHandler {
    /// UI type the operator's poll requires, if any
    fn required_area(&self) -> Option<&str> {
        None
    }

    fn invoke(
        &self,
        scene: &mut SceneState,
        call: &OperatorCall,
        context: &SurfaceContext,
    ) -> Result<(), HostError>;
}

struct FnHandler<F> {
    area: Option<String>,
    f: F,
}

impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&mut SceneState, &OperatorCall) -> Result<(), HostError>,
{
    fn required_area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    fn invoke(
        &self,
        scene: &mut SceneState,
        call: &OperatorCall,
        _context: &SurfaceContext,
    ) -> Result<(), HostError> {
        (self.f)(scene, call)
    }
}

/// Operator id (`module.name`) to handler
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the scene's built-in object and property operators
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_fn("object.add", add_object);
        registry.register_fn("object.delete", delete_objects);
        registry.register_fn("object.select_all", select_all);
        registry.register_fn("object.tag", tag_selected);
        registry.register_fn("scene.increment", increment);
        registry.register_fn_in_area("view3d.snap_cursor_to_center", "VIEW_3D", |scene, _| {
            scene.set_property("cursor_location", Value::from(vec![0.0, 0.0, 0.0]));
            Ok(())
        });
        registry
    }

    pub fn register(&mut self, id: impl Into<String>, handler: Box<dyn CommandHandler>) {
        self.handlers.insert(id.into(), handler);
    }

    pub fn register_fn<F>(&mut self, id: impl Into<String>, f: F)
    where
        F: Fn(&mut SceneState, &OperatorCall) -> Result<(), HostError> + 'static,
    {
        self.register(id, Box::new(FnHandler { area: None, f }));
    }

    /// Register an operator whose poll only succeeds in one UI type
    pub fn register_fn_in_area<F>(&mut self, id: impl Into<String>, area: &str, f: F)
    where
        F: Fn(&mut SceneState, &OperatorCall) -> Result<(), HostError> + 'static,
    {
        self.register(
            id,
            Box::new(FnHandler {
                area: Some(area.to_string()),
                f,
            }),
        );
    }

    pub fn get(&self, id: &str) -> Option<&dyn CommandHandler> {
        self.handlers.get(id).map(|handler| handler.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    /// Registered operator ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("handlers", &self.ids())
            .finish()
    }
}

fn required_string(call: &OperatorCall, key: &str) -> Result<String, HostError> {
    call.string_arg(key).ok_or_else(|| {
        HostError::new(format!(
            "{}.{}() missing required keyword argument '{}'",
            call.module, call.name, key
        ))
    })
}

fn add_object(scene: &mut SceneState, call: &OperatorCall) -> Result<(), HostError> {
    let name = required_string(call, "name")?;
    if scene.object(&name).is_some() {
        return Err(HostError::new(format!("Object '{}' already exists", name)));
    }
    for object in &mut scene.objects {
        object.selected = false;
    }
    scene.add_object(&name).selected = true;
    scene.active = Some(name);
    Ok(())
}

fn delete_objects(scene: &mut SceneState, _call: &OperatorCall) -> Result<(), HostError> {
    scene.objects.retain(|object| !object.selected);
    if scene
        .active
        .as_deref()
        .is_some_and(|active| scene.object(active).is_none())
    {
        scene.active = None;
    }
    Ok(())
}

fn select_all(scene: &mut SceneState, call: &OperatorCall) -> Result<(), HostError> {
    let action = call.string_arg("action").unwrap_or_else(|| "TOGGLE".to_string());
    let any_selected = scene.objects.iter().any(|object| object.selected);
    let apply: fn(bool, bool) -> bool = match action.as_str() {
        "SELECT" => |_, _| true,
        "DESELECT" => |_, _| false,
        "INVERT" => |selected, _| !selected,
        "TOGGLE" => |_, any_selected| !any_selected,
        other => {
            return Err(HostError::new(format!(
                "enum \"{}\" not found in ('TOGGLE', 'SELECT', 'DESELECT', 'INVERT')",
                other
            )));
        }
    };
    for object in scene.objects.iter_mut().filter(|object| object.in_view_layer) {
        object.selected = apply(object.selected, any_selected);
    }
    Ok(())
}

fn tag_selected(scene: &mut SceneState, call: &OperatorCall) -> Result<(), HostError> {
    let tag = required_string(call, "tag")?;
    let mut tagged = 0;
    for object in scene.objects.iter_mut().filter(|object| object.selected) {
        object.tags.push(tag.clone());
        tagged += 1;
    }
    if tagged == 0 {
        return Err(HostError::new("No objects selected"));
    }
    Ok(())
}

fn increment(scene: &mut SceneState, call: &OperatorCall) -> Result<(), HostError> {
    let key = required_string(call, "key")?;
    let amount = match call.arg("amount") {
        Some(raw) => parse_literal(raw)
            .and_then(|value| value.as_f64())
            .ok_or_else(|| HostError::new(format!("amount must be a number, not {}", raw)))?,
        None => 1.0,
    };

    let current = match scene.properties.get(&key) {
        Some(value) => value
            .as_f64()
            .ok_or_else(|| HostError::new(format!("property '{}' is not a number", key)))?,
        None => 0.0,
    };

    let next = current + amount;
    let value = if next.fract() == 0.0 && next.abs() < i64::MAX as f64 {
        Value::from(next as i64)
    } else {
        Value::from(next)
    };
    scene.set_property(&key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroplay_events::PlainCommand;

    fn call(command: &str) -> OperatorCall {
        match PlainCommand::parse(command) {
            PlainCommand::Operator(call) => call,
            other => panic!("not an operator: {:?}", other),
        }
    }

    fn run(scene: &mut SceneState, command: &str) -> Result<(), HostError> {
        let call = call(command);
        let registry = CommandRegistry::with_builtins();
        let handler = registry.get(&call.id()).unwrap();
        handler.invoke(scene, &call, &SurfaceContext::default())
    }

    #[test]
    fn test_add_selects_and_activates() {
        let mut scene = SceneState::default();
        scene.add_object("Cube").selected = true;
        run(&mut scene, "bpy.ops.object.add(name='Suzanne')").unwrap();

        assert_eq!(scene.selected(), vec!["Suzanne"]);
        assert_eq!(scene.active.as_deref(), Some("Suzanne"));
        assert!(run(&mut scene, "bpy.ops.object.add(name='Suzanne')").is_err());
    }

    #[test]
    fn test_delete_removes_selection() {
        let mut scene = SceneState::default();
        scene.add_object("Cube").selected = true;
        scene.add_object("Lamp");
        scene.active = Some("Cube".to_string());
        run(&mut scene, "bpy.ops.object.delete()").unwrap();

        assert!(scene.object("Cube").is_none());
        assert!(scene.object("Lamp").is_some());
        assert!(scene.active.is_none());
    }

    #[test]
    fn test_select_all_actions() {
        let mut scene = SceneState::default();
        scene.add_object("A");
        scene.add_object("B").selected = true;

        run(&mut scene, "bpy.ops.object.select_all(action='SELECT')").unwrap();
        assert_eq!(scene.selected(), vec!["A", "B"]);
        run(&mut scene, "bpy.ops.object.select_all(action='TOGGLE')").unwrap();
        assert!(scene.selected().is_empty());
        assert!(run(&mut scene, "bpy.ops.object.select_all(action='BOGUS')").is_err());
    }

    #[test]
    fn test_increment() {
        let mut scene = SceneState::default();
        run(&mut scene, "bpy.ops.scene.increment(key='counter')").unwrap();
        run(&mut scene, "bpy.ops.scene.increment(key='counter', amount=4)").unwrap();
        assert_eq!(scene.property("counter"), Some(&Value::from(5)));

        run(&mut scene, "bpy.ops.scene.increment(key='counter', amount=0.5)").unwrap();
        assert_eq!(scene.property("counter"), Some(&Value::from(5.5)));
    }

    #[test]
    fn test_tag_needs_selection() {
        let mut scene = SceneState::default();
        scene.add_object("A");
        assert!(run(&mut scene, "bpy.ops.object.tag(tag='x')").is_err());
        scene.object_mut("A").unwrap().selected = true;
        run(&mut scene, "bpy.ops.object.tag(tag='x')").unwrap();
        assert_eq!(scene.object("A").unwrap().tags, vec!["x"]);
    }

    #[test]
    fn test_area_requirement_is_declared() {
        let registry = CommandRegistry::with_builtins();
        assert_eq!(
            registry.get("view3d.snap_cursor_to_center").unwrap().required_area(),
            Some("VIEW_3D")
        );
        assert_eq!(registry.get("object.add").unwrap().required_area(), None);
        assert!(!registry.contains("object.fly"));
    }
}
