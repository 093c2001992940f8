//! Camera blend layer
//!
//! Keeps a list of transitional cameras, each with a priority tier and a
//! blend weight, and mixes them into one output camera per frame:
//!
//! 1. Start from the default camera's view.
//! 2. Walk the tiers in ascending order. Advance each camera's blend timer,
//!    derive its weight, ease it, and lerp the running result towards it.
//! 3. A gameplay camera at full weight is retired: the default camera
//!    takes over the blended state so the switch is invisible.
//! 4. Drop cameras whose weight fell to zero.
//! 5. Write the result into the output camera and its transform.

use crate::ecs::components::{Camera, CameraView, Transform};
use crate::ecs::{EcsResult, EntityComponentStore, EntityId};
use crate::foundation::easing::Easing;
use crate::foundation::math::{utils, Mat4};

/// Blend tier; higher tiers are mixed in later and win
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CameraPriority {
    /// Ambient cameras
    #[default]
    Default = 0,
    /// Gameplay cameras, retired once fully blended in
    Gameplay = 1,
    /// Short-lived cutaways
    Temporary = 2,
    /// Developer cameras
    Debug = 3,
}

impl CameraPriority {
    /// Tiers in blend order
    pub const ALL: [Self; 4] = [Self::Default, Self::Gameplay, Self::Temporary, Self::Debug];
}

/// Phase of a transitional camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendState {
    /// Weight ramping towards 1
    BlendingIn,
    /// Weight held
    Idle,
    /// Weight ramping towards 0
    BlendingOut,
}

/// A camera taking part in the blend
#[derive(Debug, Clone, PartialEq)]
pub struct CameraMixed {
    /// Entity holding the Camera component
    pub camera: EntityId,
    /// Current phase
    pub state: BlendState,
    /// Tier
    pub priority: CameraPriority,
    /// Seconds to reach full weight
    pub blend_in_time: f32,
    /// Seconds to reach zero weight
    pub blend_out_time: f32,
    /// Contribution in `[0, 1]`
    pub weight: f32,
    /// Weight held when the blend-out started
    pub blend_out_from: f32,
    /// Seconds spent in the current phase
    pub time: f32,
    /// Curve applied to the weight before interpolating
    pub easing: Option<Easing>,
}

impl CameraMixed {
    fn new(camera: EntityId, priority: CameraPriority, easing: Option<Easing>) -> Self {
        Self {
            camera,
            state: BlendState::Idle,
            priority,
            blend_in_time: 0.0,
            blend_out_time: 0.0,
            weight: 0.0,
            blend_out_from: 0.0,
            time: 0.0,
            easing,
        }
    }

    /// Start ramping in; a zero duration takes effect immediately
    pub fn blend_in(&mut self, duration: f32) {
        self.blend_in_time = duration;
        self.time = 0.0;
        if duration <= 0.0 {
            self.state = BlendState::Idle;
            self.weight = 1.0;
        } else {
            self.state = BlendState::BlendingIn;
        }
    }

    /// Start ramping out from the current weight
    pub fn blend_out(&mut self, duration: f32) {
        self.blend_out_time = duration;
        self.blend_out_from = self.weight;
        self.time = 0.0;
        self.state = BlendState::BlendingOut;
    }

    fn advance(&mut self, dt: f32) {
        self.time += dt;
        match self.state {
            BlendState::BlendingIn => {
                self.weight = utils::clamp(self.time / self.blend_in_time, 0.0, 1.0);
                if self.weight >= 1.0 {
                    self.state = BlendState::Idle;
                    self.time = 0.0;
                }
            }
            BlendState::BlendingOut => {
                self.weight = if self.blend_out_time <= 0.0 {
                    0.0
                } else {
                    self.blend_out_from * (1.0 - utils::clamp(self.time / self.blend_out_time, 0.0, 1.0))
                };
            }
            BlendState::Idle => {}
        }
    }

    fn is_finished(&self) -> bool {
        self.weight <= 0.0 && self.state != BlendState::BlendingIn
    }
}

/// Mixes transitional cameras into the output camera
#[derive(Debug, Clone)]
pub struct CameraSystem {
    default_camera: Option<EntityId>,
    output_camera: Option<EntityId>,
    mixed: Vec<CameraMixed>,
    aspect: f32,
}

impl Default for CameraSystem {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl CameraSystem {
    /// Create an empty blend layer for a viewport of the given aspect ratio
    pub fn new(aspect: f32) -> Self {
        Self {
            default_camera: None,
            output_camera: None,
            mixed: Vec::new(),
            aspect,
        }
    }

    /// Camera used as the base of every blend
    pub fn set_default_camera(&mut self, camera: EntityId) {
        self.default_camera = Some(camera);
    }

    /// Camera that receives the blended result
    pub fn set_output_camera(&mut self, camera: EntityId) {
        self.output_camera = Some(camera);
    }

    /// Current default camera
    pub const fn default_camera(&self) -> Option<EntityId> {
        self.default_camera
    }

    /// Current output camera
    pub const fn output_camera(&self) -> Option<EntityId> {
        self.output_camera
    }

    /// Viewport aspect ratio used for the output projection
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Active transitional cameras
    pub fn mixed_cameras(&self) -> &[CameraMixed] {
        &self.mixed
    }

    /// Blend entry for `camera`, if active
    pub fn mixed_camera(&self, camera: EntityId) -> Option<&CameraMixed> {
        self.mixed.iter().find(|m| m.camera == camera)
    }

    /// Start blending `camera` in; ignored when it is already active
    pub fn blend_in_camera(
        &mut self,
        camera: EntityId,
        duration: f32,
        priority: CameraPriority,
        easing: Option<Easing>,
    ) -> bool {
        if self.mixed_camera(camera).is_some() {
            log::debug!("Camera {} is already blending, ignoring blend-in", camera);
            return false;
        }

        let mut entry = CameraMixed::new(camera, priority, easing);
        entry.blend_in(duration);
        self.mixed.push(entry);
        log::debug!("Blending in camera {} over {:.2}s at {:?}", camera, duration, priority);
        true
    }

    /// Start blending `camera` out; no-op when it is not active
    pub fn blend_out_camera(&mut self, camera: EntityId, duration: f32) -> bool {
        match self.mixed.iter_mut().find(|m| m.camera == camera) {
            Some(entry) => {
                entry.blend_out(duration);
                log::debug!("Blending out camera {} over {:.2}s", camera, duration);
                true
            }
            None => false,
        }
    }

    /// Advance every blend and write the output camera
    pub fn update(&mut self, store: &mut EntityComponentStore, dt: f32) -> EcsResult<()> {
        let mut result = match self.default_camera.or(self.output_camera) {
            Some(entity) => store.get::<Camera>(entity)?.view.clone(),
            None => CameraView::default(),
        };

        for tier in CameraPriority::ALL {
            for entry in self.mixed.iter_mut().filter(|m| m.priority == tier) {
                entry.advance(dt);
                if entry.weight > 0.0 {
                    let ratio = entry.easing.map_or(entry.weight, |e| e.apply(entry.weight));
                    let target = &store.get::<Camera>(entry.camera)?.view;
                    result = blend_cameras(&result, target, ratio, self.aspect);
                }
            }
        }

        self.retire_gameplay_cameras(store, &result)?;
        self.mixed.retain(|m| !m.is_finished());

        if let Some(output) = self.output_camera {
            let view = &mut store.get_mut::<Camera>(output)?.view;
            *view = blend_cameras(&result, &result, 1.0, self.aspect);
            let position = view.position;
            store.get_mut::<Transform>(output)?.set_position(position);
        }

        Ok(())
    }

    /// View-projection of the output camera
    pub fn output_view_projection(&self, store: &EntityComponentStore) -> EcsResult<Option<Mat4>> {
        self.output_camera
            .map(|e| store.get::<Camera>(e).map(|c| c.view.view_projection))
            .transpose()
    }

    fn retire_gameplay_cameras(&mut self, store: &mut EntityComponentStore, result: &CameraView) -> EcsResult<()> {
        let mut retired = false;
        for entry in &mut self.mixed {
            if entry.priority == CameraPriority::Gameplay && entry.weight >= 1.0 {
                entry.weight = 0.0;
                entry.state = BlendState::Idle;
                retired = true;
                log::debug!("Gameplay camera {} reached full weight, handing over to default", entry.camera);
            }
        }

        if retired {
            if let Some(default) = self.default_camera {
                store.get_mut::<Camera>(default)?.view = result.clone();
                store.get_mut::<Transform>(default)?.set_position(result.position);
            }
        }
        Ok(())
    }
}

/// Lerp position, forward, fov, near and far from `a` to `b`
///
/// The result carries a fresh perspective projection and view matrices.
pub fn blend_cameras(a: &CameraView, b: &CameraView, t: f32, aspect: f32) -> CameraView {
    let mut out = a.clone();
    out.position = utils::lerp_vec3(&a.position, &b.position, t);
    out.forward = utils::lerp_vec3(&a.forward, &b.forward, t);
    out.fov = utils::lerp(a.fov, b.fov, t);
    out.near = utils::lerp(a.near, b.near, t);
    out.far = utils::lerp(a.far, b.far, t);

    out.set_perspective(out.fov, aspect, out.near, out.far);
    let position = out.position;
    out.look_at(position, position + out.forward);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    struct Rig {
        store: EntityComponentStore,
        system: CameraSystem,
        default: EntityId,
        output: EntityId,
        other: EntityId,
    }

    fn rig() -> Rig {
        let mut store = EntityComponentStore::new();
        let mut make = |name: &str, position: Vec3| {
            let e = store.create_entity(name).unwrap();
            let cam = store.create_component::<Camera>(e).unwrap();
            cam.view.position = position;
            cam.view.update();
            e
        };
        let default = make("camera_default", Vec3::new(0.0, 0.0, 0.0));
        let output = make("camera_main", Vec3::new(0.0, 0.0, 0.0));
        let other = make("camera_other", Vec3::new(10.0, 0.0, 0.0));

        let mut system = CameraSystem::new(1.5);
        system.set_default_camera(default);
        system.set_output_camera(output);
        Rig { store, system, default, output, other }
    }

    #[test]
    fn test_blend_in_reaches_full_weight_and_idles() {
        let mut r = rig();
        assert!(r.system.blend_in_camera(r.other, 2.0, CameraPriority::Temporary, None));
        for _ in 0..4 {
            r.system.update(&mut r.store, 0.5).unwrap();
        }
        let entry = r.system.mixed_camera(r.other).unwrap();
        assert_eq!(entry.weight, 1.0);
        assert_eq!(entry.state, BlendState::Idle);

        let out = r.store.get::<Camera>(r.output).unwrap();
        assert_relative_eq!(out.view.position, Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_blend_out_reaches_zero_and_is_removed() {
        let mut r = rig();
        r.system.blend_in_camera(r.other, 0.0, CameraPriority::Temporary, None);
        assert_eq!(r.system.mixed_camera(r.other).unwrap().weight, 1.0);
        assert!(r.system.blend_out_camera(r.other, 1.0));

        r.system.update(&mut r.store, 0.5).unwrap();
        assert_relative_eq!(r.system.mixed_camera(r.other).unwrap().weight, 0.5);
        r.system.update(&mut r.store, 0.5).unwrap();
        assert!(r.system.mixed_camera(r.other).is_none());
        assert!(r.system.mixed_cameras().is_empty());
    }

    #[test]
    fn test_blend_out_ramps_down_from_partial_weight() {
        let mut r = rig();
        r.system.blend_in_camera(r.other, 2.0, CameraPriority::Temporary, None);
        r.system.update(&mut r.store, 1.0).unwrap();
        assert_relative_eq!(r.system.mixed_camera(r.other).unwrap().weight, 0.5);

        assert!(r.system.blend_out_camera(r.other, 1.0));
        r.system.update(&mut r.store, 0.1).unwrap();
        let entry = r.system.mixed_camera(r.other).unwrap();
        assert_eq!(entry.state, BlendState::BlendingOut);
        assert_relative_eq!(entry.weight, 0.45, epsilon = 1e-6);

        r.system.update(&mut r.store, 0.4).unwrap();
        assert_relative_eq!(r.system.mixed_camera(r.other).unwrap().weight, 0.25, epsilon = 1e-6);
        r.system.update(&mut r.store, 0.6).unwrap();
        assert!(r.system.mixed_camera(r.other).is_none());
    }

    #[test]
    fn test_halfway_blend_position() {
        let mut r = rig();
        r.system.blend_in_camera(r.other, 1.0, CameraPriority::Temporary, None);
        r.system.update(&mut r.store, 0.5).unwrap();
        let out = r.store.get::<Camera>(r.output).unwrap();
        assert_relative_eq!(out.view.position.x, 5.0, epsilon = 1e-5);
        assert_eq!(r.store.get::<Transform>(r.output).unwrap().position(), out.view.position);
    }

    #[test]
    fn test_easing_shapes_ratio() {
        let mut r = rig();
        let easing = Easing::Quad(crate::foundation::easing::EaseMode::In);
        r.system.blend_in_camera(r.other, 1.0, CameraPriority::Temporary, Some(easing));
        r.system.update(&mut r.store, 0.5).unwrap();
        let out = r.store.get::<Camera>(r.output).unwrap();
        assert_relative_eq!(out.view.position.x, 2.5, epsilon = 1e-5);
    }

    #[test]
    fn test_gameplay_camera_is_retired_at_full_weight() {
        let mut r = rig();
        r.system.blend_in_camera(r.other, 1.0, CameraPriority::Gameplay, None);
        r.system.update(&mut r.store, 1.0).unwrap();

        assert!(r.system.mixed_cameras().is_empty());
        let default = r.store.get::<Camera>(r.default).unwrap();
        assert_relative_eq!(default.view.position, Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-5);

        // The default now holds the blended state, so the output does not jump back.
        r.system.update(&mut r.store, 0.1).unwrap();
        let out = r.store.get::<Camera>(r.output).unwrap();
        assert_relative_eq!(out.view.position, Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_duplicate_and_missing_requests() {
        let mut r = rig();
        assert!(r.system.blend_in_camera(r.other, 1.0, CameraPriority::Default, None));
        assert!(!r.system.blend_in_camera(r.other, 1.0, CameraPriority::Debug, None));
        assert!(!r.system.blend_out_camera(r.default, 1.0));
        assert_eq!(r.system.mixed_cameras().len(), 1);
    }

    #[test]
    fn test_output_view_projection_exposed() {
        let mut r = rig();
        r.system.update(&mut r.store, 0.016).unwrap();
        let vp = r.system.output_view_projection(&r.store).unwrap().unwrap();
        assert_eq!(vp, r.store.get::<Camera>(r.output).unwrap().view.view_projection);
    }
}
