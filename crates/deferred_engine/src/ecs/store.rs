//! Entity-component store
//!
//! Owns every entity and one dense array per component type. Entities point
//! into the arrays through their index tables, and each component points back
//! at its owner. Every mutation in this module keeps both directions in sync;
//! [`EntityComponentStore::check_consistency`] verifies it.
//!
//! The store is passed explicitly to every system's update entry point.
//! There is no global instance.

use std::collections::HashMap;

use super::components::{
    Animation, Camera, Collider, GuiElement, GuiText, Light, Mesh, Transform, ViewTrack,
};
use super::{Component, ComponentType, EcsError, EcsResult, Entity, EntityId};
use crate::foundation::math::Mat4;

/// Dense per-type component arrays
///
/// Reached through [`Component::array`]; one field per [`ComponentType`].
#[derive(Debug, Default)]
pub struct ComponentArrays {
    pub(crate) transforms: Vec<Transform>,
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) cameras: Vec<Camera>,
    pub(crate) lights: Vec<Light>,
    pub(crate) colliders: Vec<Collider>,
    pub(crate) gui_elements: Vec<GuiElement>,
    pub(crate) gui_texts: Vec<GuiText>,
    pub(crate) animations: Vec<Animation>,
    pub(crate) view_tracks: Vec<ViewTrack>,
}

impl ComponentArrays {
    /// Owner recorded by the component at `index` of the array tagged `component_type`
    fn owner_at(&self, component_type: ComponentType, index: usize) -> Option<EntityId> {
        fn owner<T: Component>(array: &[T], index: usize) -> Option<EntityId> {
            array.get(index).map(Component::owner)
        }

        match component_type {
            ComponentType::Transform => owner(&self.transforms, index),
            ComponentType::Mesh => owner(&self.meshes, index),
            ComponentType::Camera => owner(&self.cameras, index),
            ComponentType::Light => owner(&self.lights, index),
            ComponentType::Collider => owner(&self.colliders, index),
            ComponentType::GuiElement => owner(&self.gui_elements, index),
            ComponentType::GuiText => owner(&self.gui_texts, index),
            ComponentType::Animation => owner(&self.animations, index),
            ComponentType::ViewTrack => owner(&self.view_tracks, index),
        }
    }

    fn len_of(&self, component_type: ComponentType) -> usize {
        match component_type {
            ComponentType::Transform => self.transforms.len(),
            ComponentType::Mesh => self.meshes.len(),
            ComponentType::Camera => self.cameras.len(),
            ComponentType::Light => self.lights.len(),
            ComponentType::Collider => self.colliders.len(),
            ComponentType::GuiElement => self.gui_elements.len(),
            ComponentType::GuiText => self.gui_texts.len(),
            ComponentType::Animation => self.animations.len(),
            ComponentType::ViewTrack => self.view_tracks.len(),
        }
    }
}

/// Container for all game-object state
#[derive(Debug, Default)]
pub struct EntityComponentStore {
    entities: Vec<Entity>,
    names: HashMap<String, EntityId>,
    arrays: ComponentArrays,
}

impl EntityComponentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named entity together with its Transform
    ///
    /// Empty names are allowed any number of times; such entities can only
    /// be reached by handle.
    pub fn create_entity(&mut self, name: &str) -> EcsResult<EntityId> {
        if !name.is_empty() && self.names.contains_key(name) {
            return Err(EcsError::DuplicateEntityName(name.to_string()));
        }

        let id = self.entities.len();
        self.entities.push(Entity::new(name));
        if !name.is_empty() {
            self.names.insert(name.to_string(), id);
        }
        self.create_component::<Transform>(id)?;

        log::trace!("Created entity {} '{}'", id, name);
        Ok(id)
    }

    /// Handle of the entity called `name`
    pub fn entity_id(&self, name: &str) -> EcsResult<EntityId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| EcsError::EntityNotFound(name.to_string()))
    }

    /// Entity by handle
    pub fn entity(&self, id: EntityId) -> EcsResult<&Entity> {
        self.entities.get(id).ok_or(EcsError::InvalidEntity(id))
    }

    /// Mutable entity by handle
    pub fn entity_mut(&mut self, id: EntityId) -> EcsResult<&mut Entity> {
        self.entities.get_mut(id).ok_or(EcsError::InvalidEntity(id))
    }

    /// Every entity in creation order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Append a default `T` owned by `entity` and return it
    ///
    /// The reference is invalidated by the next insertion or reordering of
    /// `T`; hold handles, not references, across those.
    pub fn create_component<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        let slot = self.entity(entity)?.component_index(T::TYPE);
        if slot.is_some() {
            return Err(EcsError::DuplicateComponent { entity, component: T::TYPE });
        }

        let array = T::array_mut(&mut self.arrays);
        let index = array.len();
        let mut component = T::default();
        *component.base_mut() = super::ComponentBase { owner: entity, index };
        array.push(component);

        self.entities[entity].set_component_index(T::TYPE, index);

        let array = T::array_mut(&mut self.arrays);
        Ok(&mut array[index])
    }

    /// Whether `entity` owns a `T`
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|e| e.has(T::TYPE))
    }

    /// Slot of `entity`'s `T` in the `T` array
    pub fn component_index<T: Component>(&self, entity: EntityId) -> EcsResult<usize> {
        self.entity(entity)?
            .component_index(T::TYPE)
            .ok_or(EcsError::ComponentNotPresent { entity, component: T::TYPE })
    }

    /// `entity`'s component of type `T`
    pub fn get<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        let index = self.component_index::<T>(entity)?;
        Ok(&T::array(&self.arrays)[index])
    }

    /// Mutable access to `entity`'s component of type `T`
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        let index = self.component_index::<T>(entity)?;
        Ok(&mut T::array_mut(&mut self.arrays)[index])
    }

    /// Component of type `T` owned by the entity called `name`
    pub fn get_by_name<T: Component>(&self, name: &str) -> EcsResult<&T> {
        let entity = self.entity_id(name)?;
        self.get::<T>(entity)
    }

    /// Mutable component of type `T` owned by the entity called `name`
    pub fn get_by_name_mut<T: Component>(&mut self, name: &str) -> EcsResult<&mut T> {
        let entity = self.entity_id(name)?;
        self.get_mut::<T>(entity)
    }

    /// Component at `index` of the `T` array
    pub fn component<T: Component>(&self, index: usize) -> Option<&T> {
        T::array(&self.arrays).get(index)
    }

    /// Mutable component at `index` of the `T` array
    pub fn component_mut<T: Component>(&mut self, index: usize) -> Option<&mut T> {
        T::array_mut(&mut self.arrays).get_mut(index)
    }

    /// Dense array of every `T`, in storage order
    pub fn all<T: Component>(&self) -> &[T] {
        T::array(&self.arrays)
    }

    /// Mutable dense array of every `T`
    ///
    /// Elements may be edited in place. Reordering must go through
    /// [`Self::sort_components_by_key`] so entity tables follow.
    pub fn all_mut<T: Component>(&mut self) -> &mut [T] {
        T::array_mut(&mut self.arrays)
    }

    /// Number of components of type `T`
    pub fn count<T: Component>(&self) -> usize {
        T::array(&self.arrays).len()
    }

    /// Stable-sort the `T` array by `key` and remap every owner's index table
    ///
    /// Returns the old-index to new-index map. The array order, each
    /// component's own index and each entity's slot are all updated before
    /// this returns. Sorting transforms also rewrites every parent link.
    pub fn sort_components_by_key<T, K, F>(&mut self, mut key: F) -> Vec<usize>
    where
        T: Component,
        K: Ord,
        F: FnMut(&T) -> K,
    {
        let array = T::array_mut(&mut self.arrays);
        for (i, component) in array.iter_mut().enumerate() {
            component.base_mut().index = i;
        }
        array.sort_by_key(|c| key(c));

        let mut remap = vec![0; array.len()];
        for (new_index, component) in array.iter_mut().enumerate() {
            let base = component.base_mut();
            remap[base.index] = new_index;
            base.index = new_index;
            self.entities[base.owner].set_component_index(T::TYPE, new_index);
        }

        if T::TYPE == ComponentType::Transform {
            for transform in &mut self.arrays.transforms {
                transform.parent = transform.parent.map(|parent| remap[parent]);
            }
        }

        log::debug!("Sorted {} {} components", remap.len(), T::TYPE);
        remap
    }

    /// Global matrix of the transform at `index`
    ///
    /// Multiplies the parent chain root-first. A chain longer than the
    /// transform array must revisit a transform, so it is reported as a
    /// cycle instead of looping forever.
    pub fn global_matrix(&self, index: usize) -> EcsResult<Mat4> {
        let transforms = &self.arrays.transforms;
        let mut current = transforms.get(index).ok_or(EcsError::InvalidTransform(index))?;
        let mut global = current.local;
        let mut steps = 0;

        while let Some(parent) = current.parent {
            steps += 1;
            if steps > transforms.len() {
                return Err(EcsError::CyclicTransform(index));
            }
            current = transforms
                .get(parent)
                .ok_or(EcsError::InvalidParent { transform: current.base.index, parent })?;
            global = current.local * global;
        }

        Ok(global)
    }

    /// Global matrix of `entity`'s transform
    pub fn world_matrix(&self, entity: EntityId) -> EcsResult<Mat4> {
        let index = self.component_index::<Transform>(entity)?;
        self.global_matrix(index)
    }

    /// Parent `child`'s transform under `parent`'s transform
    ///
    /// Rejects links that would close a cycle.
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> EcsResult<()> {
        let child_index = self.component_index::<Transform>(child)?;
        let parent_index = self.component_index::<Transform>(parent)?;

        let transforms = &self.arrays.transforms;
        let mut cursor = Some(parent_index);
        let mut steps = 0;
        while let Some(index) = cursor {
            if index == child_index || steps > transforms.len() {
                return Err(EcsError::CyclicTransform(child_index));
            }
            cursor = transforms.get(index).and_then(|t| t.parent);
            steps += 1;
        }

        self.arrays.transforms[child_index].parent = Some(parent_index);
        Ok(())
    }

    /// Verify the entity/component bidirectional mapping
    pub fn check_consistency(&self) -> EcsResult<()> {
        for (id, entity) in self.entities.iter().enumerate() {
            for component_type in ComponentType::ALL {
                let Some(index) = entity.component_index(component_type) else {
                    continue;
                };
                match self.arrays.owner_at(component_type, index) {
                    Some(owner) if owner == id => {}
                    Some(owner) => {
                        return Err(EcsError::InconsistentIndex {
                            entity: id,
                            component: component_type,
                            detail: format!("slot {index} is owned by entity {owner}"),
                        })
                    }
                    None => {
                        return Err(EcsError::InconsistentIndex {
                            entity: id,
                            component: component_type,
                            detail: format!("slot {index} is out of range"),
                        })
                    }
                }
            }
        }

        for component_type in ComponentType::ALL {
            for index in 0..self.arrays.len_of(component_type) {
                let owner = self.arrays.owner_at(component_type, index).unwrap_or(usize::MAX);
                let back = self.entities.get(owner).and_then(|e| e.component_index(component_type));
                if back != Some(index) {
                    return Err(EcsError::InconsistentIndex {
                        entity: owner,
                        component: component_type,
                        detail: format!("component {index} is not referenced by its owner"),
                    });
                }
            }
        }

        for (index, transform) in self.arrays.transforms.iter().enumerate() {
            if let Some(parent) = transform.parent {
                if parent >= self.arrays.transforms.len() {
                    return Err(EcsError::InvalidParent { transform: index, parent });
                }
            }
        }

        Ok(())
    }
}
