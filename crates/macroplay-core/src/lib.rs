//! Action library, execution surfaces and configuration shared by the
//! macroplay player and its front ends.

pub mod config;
pub mod error;
pub mod model;
pub mod naming;
pub mod surface;

pub use error::HostError;
pub use model::{
    Action, ActionLibrary, ActionType, AreaVisibility, Category, ExecutionMode, Macro,
    ModeFilter, OperatorContext, Visibility,
};
pub use surface::{
    Area, AreaId, Region, RegionId, RegionKind, Screen, ScreenId, SurfaceContext, Window,
    WindowId, WindowManager,
};
