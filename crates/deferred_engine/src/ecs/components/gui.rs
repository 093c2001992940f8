//! Screen-space GUI components
//!
//! Data only; drawing and input routing belong to the GUI layer.

use serde::{Deserialize, Serialize};

use crate::ecs::component::impl_component;
use crate::ecs::ComponentBase;
use crate::foundation::math::{Vec2, Vec3};

/// Point of the screen an element is positioned against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum GuiAnchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// Pixel rectangle occupied by an element on screen
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenBounds {
    /// Left edge
    pub x_min: f32,
    /// Right edge
    pub x_max: f32,
    /// Bottom edge
    pub y_min: f32,
    /// Top edge
    pub y_max: f32,
}

impl ScreenBounds {
    /// Whether the point lies strictly inside the rectangle
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.x_min && x < self.x_max && y > self.y_min && y < self.y_max
    }
}

/// Size and placement shared by textured and text elements
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GuiLayout {
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
    /// Screen anchor
    pub anchor: GuiAnchor,
    /// Offset from the anchor in pixels
    pub offset: Vec2,
    /// Resolved rectangle, written by the GUI layer
    pub bounds: ScreenBounds,
}

/// Textured rectangle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuiElement {
    pub(crate) base: ComponentBase,
    /// Texture id in the resource registry
    pub texture: Option<usize>,
    /// Placement
    pub layout: GuiLayout,
}

impl_component!(GuiElement, GuiElement, gui_elements);

/// Default glyph size of text elements
pub const DEFAULT_FONT_SIZE: u32 = 32;

/// Line of text
#[derive(Debug, Clone, PartialEq)]
pub struct GuiText {
    pub(crate) base: ComponentBase,
    /// Placement
    pub layout: GuiLayout,
    /// Displayed string
    pub text: String,
    /// Font face name
    pub font_face: String,
    /// Glyph size in pixels
    pub font_size: u32,
    /// Text colour
    pub color: Vec3,
}

impl_component!(GuiText, GuiText, gui_texts);

impl Default for GuiText {
    fn default() -> Self {
        Self {
            base: ComponentBase::default(),
            layout: GuiLayout::default(),
            text: String::new(),
            font_face: String::new(),
            font_size: DEFAULT_FONT_SIZE,
            color: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_strict() {
        let bounds = ScreenBounds { x_min: 0.0, x_max: 10.0, y_min: 0.0, y_max: 5.0 };
        assert!(bounds.contains(5.0, 2.0));
        assert!(!bounds.contains(0.0, 2.0));
        assert!(!bounds.contains(5.0, 5.0));
    }

    #[test]
    fn test_text_defaults() {
        let text = GuiText::default();
        assert_eq!(text.font_size, 32);
        assert_eq!(text.layout.anchor, GuiAnchor::Center);
    }
}
