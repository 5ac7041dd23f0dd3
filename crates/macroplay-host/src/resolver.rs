//! Choosing the surface a plain command runs against

use macroplay_core::{AreaId, SurfaceContext, WindowManager};
use tracing::debug;

/// Surface chosen for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    pub context: SurfaceContext,
    /// Area whose UI type was temporarily changed, with its original type
    pub coerced: Option<(AreaId, String)>,
}

/// Resolve the surface for a command declaring an optional UI type requirement
///
/// Without a requirement, or when the base area already has the required type,
/// the base surface is used. Otherwise the most recently created window whose
/// primary area has the type is used, and failing that the base area's type
/// is coerced until [`restore`] is called. The region is always the last
/// `WINDOW` region of the chosen area.
pub fn resolve(
    surfaces: &mut WindowManager,
    base: SurfaceContext,
    ui_type: Option<&str>,
) -> ResolvedContext {
    let mut context = base;
    let mut coerced = None;

    let base_type = base
        .area
        .and_then(|id| surfaces.area(id))
        .map(|area| area.ui_type.clone());

    if let (Some(required), Some(current)) = (ui_type, base_type) {
        if current != required {
            if let Some(window) = surfaces.latest_with_primary_type(required) {
                debug!(target: "playback", "Running in window {:?} for UI type {}", window.id, required);
                context = SurfaceContext::for_window(window);
            } else if let Some(area) = base.area.and_then(|id| surfaces.area_mut(id)) {
                debug!(target: "playback", "Switching area {:?} from {} to {}", area.id, current, required);
                area.ui_type = required.to_string();
                coerced = Some((area.id, current));
            }
        }
    }

    if let Some(region) = context
        .area
        .and_then(|id| surfaces.area(id))
        .and_then(|area| area.content_region())
    {
        context.region = Some(region);
    }

    ResolvedContext { context, coerced }
}

/// Undo a UI type coercion made by [`resolve`]
pub fn restore(surfaces: &mut WindowManager, resolved: &ResolvedContext) {
    if let Some((id, ui_type)) = &resolved.coerced {
        if let Some(area) = surfaces.area_mut(*id) {
            area.ui_type = ui_type.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroplay_core::{Area, Region, RegionId, RegionKind, Screen, ScreenId, Window, WindowId};

    fn window(id: u32, ui_type: &str) -> Window {
        Window {
            id: WindowId(id),
            screen: Screen {
                id: ScreenId(id),
                areas: vec![Area {
                    id: AreaId(id * 10),
                    ui_type: ui_type.to_string(),
                    regions: vec![
                        Region {
                            id: RegionId(id * 100),
                            kind: RegionKind::Header,
                        },
                        Region {
                            id: RegionId(id * 100 + 1),
                            kind: RegionKind::Window,
                        },
                    ],
                }],
            },
        }
    }

    fn manager() -> WindowManager {
        WindowManager {
            windows: vec![window(1, "VIEW_3D"), window(2, "IMAGE_EDITOR"), window(3, "IMAGE_EDITOR")],
        }
    }

    fn base(wm: &WindowManager) -> SurfaceContext {
        SurfaceContext::for_window(&wm.windows[0])
    }

    #[test]
    fn test_no_requirement_keeps_base() {
        let mut wm = manager();
        let ctx = base(&wm);
        let resolved = resolve(&mut wm, ctx, None);
        assert_eq!(resolved.context.area, Some(AreaId(10)));
        assert_eq!(resolved.context.region, Some(RegionId(101)));
        assert!(resolved.coerced.is_none());
    }

    #[test]
    fn test_matching_requirement_keeps_base() {
        let mut wm = manager();
        let ctx = base(&wm);
        let resolved = resolve(&mut wm, ctx, Some("VIEW_3D"));
        assert_eq!(resolved.context.window, Some(WindowId(1)));
        assert!(resolved.coerced.is_none());
    }

    #[test]
    fn test_latest_matching_window_is_used() {
        let mut wm = manager();
        let ctx = base(&wm);
        let resolved = resolve(&mut wm, ctx, Some("IMAGE_EDITOR"));
        assert_eq!(resolved.context.window, Some(WindowId(3)));
        assert_eq!(resolved.context.area, Some(AreaId(30)));
        assert_eq!(resolved.context.region, Some(RegionId(301)));
        assert!(resolved.coerced.is_none());
    }

    #[test]
    fn test_coerce_and_restore() {
        let mut wm = manager();
        let ctx = base(&wm);
        let resolved = resolve(&mut wm, ctx, Some("TEXT_EDITOR"));
        assert_eq!(resolved.context.area, Some(AreaId(10)));
        assert_eq!(resolved.coerced, Some((AreaId(10), "VIEW_3D".to_string())));
        assert_eq!(wm.area(AreaId(10)).unwrap().ui_type, "TEXT_EDITOR");

        restore(&mut wm, &resolved);
        assert_eq!(wm.area(AreaId(10)).unwrap().ui_type, "VIEW_3D");
    }

    #[test]
    fn test_no_base_area_is_left_alone() {
        let mut wm = manager();
        let resolved = resolve(&mut wm, SurfaceContext::default(), Some("TEXT_EDITOR"));
        assert_eq!(resolved.context, SurfaceContext::default());
        assert!(resolved.coerced.is_none());
    }
}
