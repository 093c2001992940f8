//! Component types stored by the entity-component store

pub mod animation;
pub mod camera;
pub mod collider;
pub mod gui;
pub mod light;
pub mod mesh;
pub mod transform;
pub mod view_track;

pub use animation::Animation;
pub use camera::{Camera, CameraView};
pub use collider::{Collider, ColliderType};
pub use gui::{GuiAnchor, GuiElement, GuiLayout, GuiText, ScreenBounds};
pub use light::{Light, LightType};
pub use mesh::{Mesh, RenderMode};
pub use transform::Transform;
pub use view_track::ViewTrack;
