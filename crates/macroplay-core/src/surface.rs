//! Execution surfaces of the host application
//!
//! A window hosts one screen; a screen is split into areas, each with a UI
//! type (`VIEW_3D`, `IMAGE_EDITOR`, ...); an area is split into regions, of
//! which the `WINDOW` region is the one that accepts command execution.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AreaId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u32);

/// Kind of a region inside an area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegionKind {
    /// Primary content region, the valid target for command execution
    Window,
    Header,
    Tools,
    Ui,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub kind: RegionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub ui_type: String,
    #[serde(default)]
    pub regions: Vec<Region>,
}

impl Area {
    /// The last primary content region of this area
    pub fn content_region(&self) -> Option<RegionId> {
        self.regions
            .iter()
            .rev()
            .find(|region| region.kind == RegionKind::Window)
            .map(|region| region.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: ScreenId,
    #[serde(default)]
    pub areas: Vec<Area>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub screen: Screen,
}

impl Window {
    /// The first area of the window's screen
    pub fn primary_area(&self) -> Option<&Area> {
        self.screen.areas.first()
    }
}

/// All open top-level windows, in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowManager {
    #[serde(default)]
    pub windows: Vec<Window>,
}

impl WindowManager {
    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn area(&self, id: AreaId) -> Option<&Area> {
        self.windows
            .iter()
            .flat_map(|w| w.screen.areas.iter())
            .find(|a| a.id == id)
    }

    pub fn area_mut(&mut self, id: AreaId) -> Option<&mut Area> {
        self.windows
            .iter_mut()
            .flat_map(|w| w.screen.areas.iter_mut())
            .find(|a| a.id == id)
    }

    /// Most recently created window whose primary area has the given UI type
    pub fn latest_with_primary_type(&self, ui_type: &str) -> Option<&Window> {
        self.windows
            .iter()
            .rev()
            .find(|w| w.primary_area().is_some_and(|a| a.ui_type == ui_type))
    }
}

/// A concrete execution target: window, screen, area and region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceContext {
    #[serde(default)]
    pub window: Option<WindowId>,
    #[serde(default)]
    pub screen: Option<ScreenId>,
    #[serde(default)]
    pub area: Option<AreaId>,
    #[serde(default)]
    pub region: Option<RegionId>,
}

impl SurfaceContext {
    /// Context pointing at a window's primary area
    pub fn for_window(window: &Window) -> Self {
        let area = window.primary_area();
        Self {
            window: Some(window.id),
            screen: Some(window.screen.id),
            area: area.map(|a| a.id),
            region: area.and_then(Area::content_region),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(id: u32, ui_type: &str, regions: &[(u32, RegionKind)]) -> Area {
        Area {
            id: AreaId(id),
            ui_type: ui_type.to_string(),
            regions: regions
                .iter()
                .map(|(rid, kind)| Region {
                    id: RegionId(*rid),
                    kind: kind.clone(),
                })
                .collect(),
        }
    }

    fn window(id: u32, areas: Vec<Area>) -> Window {
        Window {
            id: WindowId(id),
            screen: Screen {
                id: ScreenId(id),
                areas,
            },
        }
    }

    #[test]
    fn test_content_region_is_last_window_region() {
        let area = area(
            1,
            "VIEW_3D",
            &[
                (1, RegionKind::Window),
                (2, RegionKind::Header),
                (3, RegionKind::Window),
                (4, RegionKind::Ui),
            ],
        );
        assert_eq!(area.content_region(), Some(RegionId(3)));
    }

    #[test]
    fn test_latest_window_wins() {
        let wm = WindowManager {
            windows: vec![
                window(1, vec![area(10, "IMAGE_EDITOR", &[])]),
                window(2, vec![area(20, "IMAGE_EDITOR", &[])]),
                window(3, vec![area(30, "VIEW_3D", &[])]),
            ],
        };
        let found = wm.latest_with_primary_type("IMAGE_EDITOR").unwrap();
        assert_eq!(found.id, WindowId(2));
        assert!(wm.latest_with_primary_type("TEXT_EDITOR").is_none());
    }

    #[test]
    fn test_region_kind_serde() {
        let kinds: Vec<RegionKind> =
            serde_json::from_str(r#"["WINDOW", "HEADER", "NAVIGATION_BAR"]"#).unwrap();
        assert_eq!(kinds[0], RegionKind::Window);
        assert_eq!(kinds[1], RegionKind::Header);
        assert_eq!(kinds[2], RegionKind::Other("NAVIGATION_BAR".to_string()));
    }
}
