//! Systems that update component state between frames
//!
//! Each system takes the store explicitly in its `update` entry point.

pub mod animation_system;
pub mod camera_system;
pub mod collision_system;
pub mod picking_system;
pub mod view_track_system;

pub use animation_system::AnimationSystem;
pub use camera_system::{BlendState, CameraMixed, CameraPriority, CameraSystem};
pub use collision_system::{CollisionSystem, WorldBox};
pub use picking_system::set_picking_ray;
pub use view_track_system::ViewTrackSystem;
