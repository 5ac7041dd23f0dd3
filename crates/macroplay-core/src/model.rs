//! Recorded actions and the library that owns them
//!
//! The library is the narrow storage interface the player consumes: look up an
//! action by type and id, read its macros, and raise alert flags on failure.
//! Editing (add/move/remove) belongs to the editing layer.

use macroplay_events::{EventError, MacroCommand, classify};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::naming::check_for_duplicates;

/// Invocation mode injected into operator calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorContext {
    /// The operator runs immediately
    #[default]
    #[serde(rename = "EXEC_DEFAULT")]
    ExecDefault,
    /// The operator may wait for user input
    #[serde(rename = "INVOKE_DEFAULT")]
    InvokeDefault,
}

impl OperatorContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorContext::ExecDefault => "EXEC_DEFAULT",
            OperatorContext::InvokeDefault => "INVOKE_DEFAULT",
        }
    }
}

/// How an action's plain commands treat the selected objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionMode {
    /// Run each command once on the whole selection
    #[default]
    Group,
    /// Run each command once per selected object
    Individual,
}

/// Which collection of the library an action lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    #[serde(alias = "global_actions")]
    Global,
    #[serde(alias = "local_actions")]
    Local,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Global => f.write_str("global_actions"),
            ActionType::Local => f.write_str("local_actions"),
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn default_true() -> bool {
    true
}

/// One recorded step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    #[serde(default = "new_id")]
    pub id: String,

    #[serde(default)]
    pub label: String,

    /// Plain invocation expression or `ar.event:<json>` payload
    pub command: String,

    /// Inactive macros are skipped entirely during playback
    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub operator_execution_context: OperatorContext,

    /// UI type the command must run in, empty when any surface will do
    #[serde(default)]
    pub ui_type: String,

    /// Set on the macro that caused the last failure
    #[serde(default)]
    pub alert: bool,
}

impl Macro {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            label: String::new(),
            command: command.into(),
            active: true,
            operator_execution_context: OperatorContext::default(),
            ui_type: String::new(),
            alert: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_ui_type(mut self, ui_type: impl Into<String>) -> Self {
        self.ui_type = ui_type.into();
        self
    }

    pub fn with_operator_context(mut self, context: OperatorContext) -> Self {
        self.operator_execution_context = context;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Decode the command into its typed form
    pub fn parse(&self) -> Result<MacroCommand, EventError> {
        classify(&self.command)
    }

    /// The declared UI type requirement, if any
    pub fn required_ui_type(&self) -> Option<&str> {
        Some(self.ui_type.as_str()).filter(|t| !t.is_empty())
    }
}

/// A named, ordered sequence of macros
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default = "new_id")]
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub macros: Vec<Macro>,

    #[serde(default)]
    pub execution_mode: ExecutionMode,

    #[serde(default)]
    pub alert: bool,
}

impl Action {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            label: label.into(),
            description: String::new(),
            macros: Vec::new(),
            execution_mode: ExecutionMode::default(),
            alert: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_macros(mut self, macros: impl IntoIterator<Item = Macro>) -> Self {
        self.macros.extend(macros);
        self
    }

    /// Index of a macro by id
    pub fn find_macro(&self, id: &str) -> Option<usize> {
        self.macros.iter().position(|m| m.id == id)
    }
}

/// Mode filter of a category visibility entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeFilter {
    /// The category applies to every mode of the area
    All,
    Mode(String),
}

impl std::fmt::Display for ModeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeFilter::All => f.write_str("all"),
            ModeFilter::Mode(mode) => f.write_str(mode),
        }
    }
}

/// One `(area type, mode)` pair where a category is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visibility {
    pub area_type: String,
    pub mode: ModeFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaVisibility {
    #[serde(rename = "type")]
    pub area_type: String,
    #[serde(default)]
    pub modes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub areas: Vec<AreaVisibility>,
    /// Ids of the global actions shown in this category
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Category {
    /// Every `(area, mode)` pair where the category is visible, in declaration order
    pub fn visibility(&self) -> Vec<Visibility> {
        let mut visibility = Vec::new();
        for area in &self.areas {
            if area.modes.is_empty() {
                visibility.push(Visibility {
                    area_type: area.area_type.clone(),
                    mode: ModeFilter::All,
                });
                continue;
            }
            visibility.extend(area.modes.iter().map(|mode| Visibility {
                area_type: area.area_type.clone(),
                mode: ModeFilter::Mode(mode.clone()),
            }));
        }
        visibility
    }
}

/// All categories and actions known to the application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionLibrary {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub global_actions: Vec<Action>,
    #[serde(default)]
    pub local_actions: Vec<Action>,
    #[serde(default)]
    pub selected_category: Option<String>,
}

impl ActionLibrary {
    pub fn actions(&self, action_type: ActionType) -> &[Action] {
        match action_type {
            ActionType::Global => &self.global_actions,
            ActionType::Local => &self.local_actions,
        }
    }

    fn actions_mut(&mut self, action_type: ActionType) -> &mut Vec<Action> {
        match action_type {
            ActionType::Global => &mut self.global_actions,
            ActionType::Local => &mut self.local_actions,
        }
    }

    pub fn action(&self, action_type: ActionType, id: &str) -> Option<&Action> {
        self.actions(action_type).iter().find(|a| a.id == id)
    }

    pub fn action_mut(&mut self, action_type: ActionType, id: &str) -> Option<&mut Action> {
        self.actions_mut(action_type).iter_mut().find(|a| a.id == id)
    }

    /// Look up an action by id, falling back to its label
    pub fn find_action(&self, action_type: ActionType, id_or_label: &str) -> Option<&Action> {
        self.action(action_type, id_or_label).or_else(|| {
            self.actions(action_type)
                .iter()
                .find(|a| a.label == id_or_label)
        })
    }

    /// Add an action, renaming its label if another action already uses it
    pub fn add_action(&mut self, action_type: ActionType, mut action: Action) -> &Action {
        let actions = self.actions_mut(action_type);
        action.label = check_for_duplicates(actions.iter().map(|a| a.label.as_str()), &action.label);
        actions.push(action);
        let index = actions.len() - 1;
        &actions[index]
    }

    pub fn remove_action(&mut self, action_type: ActionType, id: &str) -> Option<Action> {
        let actions = self.actions_mut(action_type);
        let index = actions.iter().position(|a| a.id == id)?;
        Some(actions.remove(index))
    }

    /// Flag an action and one of its macros as failed
    ///
    /// Returns false when the action no longer exists.
    pub fn mark_alert(&mut self, action_type: ActionType, action_id: &str, macro_id: &str) -> bool {
        let Some(action) = self.action_mut(action_type, action_id) else {
            debug!(target: "playback", "Cannot flag missing action {} ({})", action_id, action_type);
            return false;
        };
        action.alert = true;
        if let Some(m) = action.macros.iter_mut().find(|m| m.id == macro_id) {
            m.alert = true;
        }
        true
    }

    /// Resolve a category id, falling back to the index and then the selected category
    pub fn category_id(&self, id: &str, index: Option<usize>) -> Option<String> {
        if self.categories.iter().any(|c| c.id == id) {
            return Some(id.to_string());
        }
        if let Some(category) = index.and_then(|i| self.categories.get(i)) {
            return Some(category.id.clone());
        }
        self.selected_category.clone()
    }

    /// Visibility descriptor of a category, `None` when it does not exist
    pub fn category_visibility(&self, id: &str) -> Option<Vec<Visibility>> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(Category::visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ActionLibrary {
        let mut library = ActionLibrary::default();
        library.global_actions.push(
            Action::new("Cleanup")
                .with_id("a1")
                .with_macros([Macro::new("bpy.ops.object.delete()").with_id("m1")]),
        );
        library.categories.push(Category {
            id: "c1".to_string(),
            label: "Modelling".to_string(),
            areas: vec![
                AreaVisibility {
                    area_type: "VIEW_3D".to_string(),
                    modes: vec!["OBJECT".to_string(), "EDIT_MESH".to_string()],
                },
                AreaVisibility {
                    area_type: "IMAGE_EDITOR".to_string(),
                    modes: vec![],
                },
            ],
            actions: vec!["a1".to_string()],
        });
        library
    }

    #[test]
    fn test_find_action_by_id_or_label() {
        let library = library();
        assert_eq!(library.find_action(ActionType::Global, "a1").unwrap().label, "Cleanup");
        assert_eq!(library.find_action(ActionType::Global, "Cleanup").unwrap().id, "a1");
        assert!(library.find_action(ActionType::Local, "a1").is_none());
    }

    #[test]
    fn test_mark_alert() {
        let mut library = library();
        assert!(library.mark_alert(ActionType::Global, "a1", "m1"));
        let action = library.action(ActionType::Global, "a1").unwrap();
        assert!(action.alert);
        assert!(action.macros[0].alert);

        assert!(!library.mark_alert(ActionType::Global, "missing", "m1"));
    }

    #[test]
    fn test_add_action_dedupes_label() {
        let mut library = library();
        let added = library.add_action(ActionType::Global, Action::new("Cleanup"));
        assert_eq!(added.label, "Cleanup.001");
    }

    #[test]
    fn test_category_visibility() {
        let library = library();
        let visibility = library.category_visibility("c1").unwrap();
        assert_eq!(visibility.len(), 3);
        assert_eq!(visibility[0].area_type, "VIEW_3D");
        assert_eq!(visibility[0].mode, ModeFilter::Mode("OBJECT".to_string()));
        assert_eq!(visibility[2].area_type, "IMAGE_EDITOR");
        assert_eq!(visibility[2].mode, ModeFilter::All);

        assert!(library.category_visibility("nope").is_none());
    }

    #[test]
    fn test_category_id_fallback() {
        let mut library = library();
        assert_eq!(library.category_id("c1", None).as_deref(), Some("c1"));
        assert_eq!(library.category_id("gone", Some(0)).as_deref(), Some("c1"));
        assert_eq!(library.category_id("gone", Some(7)), None);

        library.selected_category = Some("c1".to_string());
        assert_eq!(library.category_id("gone", None).as_deref(), Some("c1"));
    }

    #[test]
    fn test_macro_defaults_from_json() {
        let m: Macro = serde_json::from_str(r#"{"command": "bpy.ops.object.delete()"}"#).unwrap();
        assert!(m.active);
        assert!(!m.id.is_empty());
        assert_eq!(m.operator_execution_context, OperatorContext::ExecDefault);
        assert_eq!(m.required_ui_type(), None);
    }

    #[test]
    fn test_action_type_accepts_collection_names() {
        let t: ActionType = serde_json::from_str(r#""local_actions""#).unwrap();
        assert_eq!(t, ActionType::Local);
        assert_eq!(ActionType::Global.to_string(), "global_actions");
    }
}
