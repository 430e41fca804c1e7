//! Custom model attachment: per-character handler state, the attached-prop
//! registry, and the systems that swap scene instances in and out while
//! keeping registered props parented to the right socket.

use crate::bundle::BundleCache;
use crate::catalog::ModelCatalog;
use crate::character::DontHideAsEquipment;
use crate::rig::{AnimationSourceInfo, DEFAULT_ATTACK_TIME, MELEE_ATTACK_LAYER, ModelAnimator};
use bevy::prelude::*;
use bevy::scene::SceneRoot;
use std::collections::HashMap;

/// Per-character model state. Attached to a character by the host once its
/// model hierarchy exists; `initialized` stays false until then and gates the
/// whole attachment registry.
#[derive(Component, Debug, Default)]
pub struct ModelHandler {
    pub initialized: bool,
    /// The host's own model root for this character.
    pub original_model: Option<Entity>,
    /// Root of the currently active custom model instance, if any.
    pub custom_model: Option<Entity>,
    /// Animation definition scraped from the host's primary rig.
    pub primary_animation: Option<AnimationSourceInfo>,
    /// Fallback definition from the host's magic-blend rig.
    pub magic_blend_animation: Option<AnimationSourceInfo>,
    pub attached: Vec<Entity>,
}

impl ModelHandler {
    pub fn new(original_model: Entity) -> Self {
        Self {
            initialized: true,
            original_model: Some(original_model),
            ..Default::default()
        }
    }

    /// Adds a prop to the registry. Dropped silently when the handler is not
    /// initialized, and never duplicates an entry.
    pub fn register_custom_socket_object(&mut self, object: Entity) -> bool {
        if !self.initialized || self.attached.contains(&object) {
            return false;
        }
        self.attached.push(object);
        true
    }

    /// Removes a prop from the registry; a no-op when it was never tracked.
    pub fn unregister_custom_socket_object(&mut self, object: Entity) -> bool {
        let before = self.attached.len();
        self.attached.retain(|entry| *entry != object);
        self.attached.len() != before
    }

    pub fn attached_objects(&self) -> &[Entity] {
        &self.attached
    }

    /// Attack ramp duration; the primary rig definition wins over the
    /// magic-blend one.
    pub fn attack_timing(&self) -> f32 {
        self.animation_source()
            .map(|info| info.attack_time)
            .unwrap_or(DEFAULT_ATTACK_TIME)
    }

    pub fn attack_curve(&self) -> Option<&crate::rig::AttackCurve> {
        self.animation_source()
            .and_then(|info| info.attack_curve.as_ref())
    }

    pub fn has_dash_control_animation(&self) -> bool {
        self.animation_source()
            .map(|info| info.has_dash_control_animation)
            .unwrap_or(true)
    }

    fn animation_source(&self) -> Option<&AnimationSourceInfo> {
        self.primary_animation
            .as_ref()
            .or(self.magic_blend_animation.as_ref())
    }
}

/// Named socket entities inside a spawned custom model, populated by whoever
/// post-processes the scene instance.
#[derive(Component, Debug, Default)]
pub struct ModelSockets {
    pub by_name: HashMap<String, Entity>,
}

/// Prop spawned by the host that belongs to a named logical socket on the
/// character's model.
#[derive(Component, Debug, Clone)]
pub struct SpawnedProp {
    pub character: Entity,
    pub socket_name: String,
}

/// Added once a prop is accepted into a character's registry; remembers the
/// parent to fall back to when no matching custom socket exists.
#[derive(Component, Debug, Clone)]
pub struct CustomSocketMarker {
    pub origin_parent: Entity,
}

/// Request to activate (`Some(id)`) or clear (`None`) a character's custom
/// model.
#[derive(Message, Debug, Clone)]
pub struct ModelSwapRequest {
    pub character: Entity,
    pub model_id: Option<String>,
}

/// Applies pending swap requests: spawns the requested model's scene as a
/// child of the character, hides the original model, migrates registered
/// props off the outgoing custom model, and despawns it.
pub fn apply_model_swaps(
    mut requests: MessageReader<ModelSwapRequest>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    catalog: Res<ModelCatalog>,
    mut bundles: ResMut<BundleCache>,
    mut handlers: Query<&mut ModelHandler>,
    mut visibilities: Query<&mut Visibility>,
    markers: Query<&CustomSocketMarker>,
    entities: Query<Entity>,
) {
    for request in requests.read() {
        let Ok(mut handler) = handlers.get_mut(request.character) else {
            warn!("model swap requested for a character without a handler");
            continue;
        };
        if !handler.initialized {
            continue;
        }

        let new_model = match &request.model_id {
            Some(model_id) => {
                let Some((bundle, model)) = catalog.find_model(model_id).and_then(|pair| {
                    catalog
                        .model(pair)
                        .map(|(bundle, model)| (bundle.clone(), model.clone()))
                }) else {
                    error!("model '{}' is not in the catalog", model_id);
                    continue;
                };
                let Some(prefab_path) = bundles.load_model_prefab(&bundle, &model) else {
                    continue;
                };
                let scene: Handle<Scene> =
                    asset_server.load(format!("{}#Scene0", prefab_path.display()));
                let spawned = commands
                    .spawn((
                        SceneRoot(scene),
                        Transform::default(),
                        Visibility::Inherited,
                        ModelAnimator::with_layers([MELEE_ATTACK_LAYER]),
                        ChildOf(request.character),
                    ))
                    .id();
                Some(spawned)
            }
            None => None,
        };

        // Registered props fall back to their original parents while the new
        // model's sockets materialize (or for good, when clearing).
        for object in handler.attached_objects().to_vec() {
            if !entities.contains(object) {
                continue;
            }
            if let Ok(marker) = markers.get(object) {
                if entities.contains(marker.origin_parent) {
                    commands.entity(object).insert(ChildOf(marker.origin_parent));
                }
            }
        }

        if let Some(previous) = handler.custom_model.take() {
            if entities.contains(previous) {
                commands.entity(previous).try_despawn();
            }
        }
        handler.custom_model = new_model;

        if let Some(original) = handler.original_model {
            if let Ok(mut visibility) = visibilities.get_mut(original) {
                *visibility = match new_model {
                    Some(_) => Visibility::Hidden,
                    None => Visibility::Inherited,
                };
            }
        }
    }
}

/// Accepts newly spawned props into their character's registry. Props on an
/// un-initialized character stay where the host put them.
pub fn register_spawned_props(
    mut commands: Commands,
    props: Query<(Entity, &SpawnedProp, &ChildOf), Added<SpawnedProp>>,
    mut handlers: Query<&mut ModelHandler>,
) {
    for (prop, spawned, child_of) in &props {
        let Ok(mut handler) = handlers.get_mut(spawned.character) else {
            continue;
        };
        if handler.register_custom_socket_object(prop) {
            commands.entity(prop).insert((
                CustomSocketMarker {
                    origin_parent: child_of.parent(),
                },
                DontHideAsEquipment,
            ));
        }
    }
}

/// Re-parents registered props under the matching named socket of the active
/// custom model, once that socket exists.
pub fn attach_objects_to_named_sockets(
    mut commands: Commands,
    props: Query<(Entity, &SpawnedProp, &ChildOf), With<CustomSocketMarker>>,
    handlers: Query<&ModelHandler>,
    sockets: Query<&ModelSockets>,
    entities: Query<Entity>,
) {
    for (prop, spawned, child_of) in &props {
        let Ok(handler) = handlers.get(spawned.character) else {
            continue;
        };
        let Some(model) = handler.custom_model else {
            continue;
        };
        let Ok(model_sockets) = sockets.get(model) else {
            continue;
        };
        if let Some(socket) = model_sockets.by_name.get(&spawned.socket_name) {
            if child_of.parent() != *socket && entities.contains(*socket) {
                commands.entity(prop).insert(ChildOf(*socket));
            }
        }
    }
}

/// Drops despawned props from every registry. A prop never tracked anywhere
/// makes this a sweep of no-ops.
pub fn unregister_despawned_props(
    mut removed: RemovedComponents<SpawnedProp>,
    mut handlers: Query<&mut ModelHandler>,
) {
    for prop in removed.read() {
        for mut handler in &mut handlers {
            handler.unregister_custom_socket_object(prop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_rejects_duplicates() {
        let mut world = World::new();
        let object = world.spawn_empty().id();
        let mut handler = ModelHandler {
            initialized: true,
            ..Default::default()
        };
        assert!(handler.register_custom_socket_object(object));
        assert!(!handler.register_custom_socket_object(object));
        assert_eq!(handler.attached_objects().len(), 1);
    }

    #[test]
    fn registry_drops_registration_when_uninitialized() {
        let mut world = World::new();
        let object = world.spawn_empty().id();
        let mut handler = ModelHandler::default();
        assert!(!handler.register_custom_socket_object(object));
        assert!(handler.attached_objects().is_empty());
    }

    #[test]
    fn unregistering_unknown_object_is_noop() {
        let mut world = World::new();
        let object = world.spawn_empty().id();
        let mut handler = ModelHandler {
            initialized: true,
            ..Default::default()
        };
        assert!(!handler.unregister_custom_socket_object(object));
    }

    #[test]
    fn attack_timing_prefers_primary_source() {
        let mut handler = ModelHandler::default();
        assert_eq!(handler.attack_timing(), DEFAULT_ATTACK_TIME);
        handler.magic_blend_animation = Some(AnimationSourceInfo {
            attack_time: 0.9,
            ..Default::default()
        });
        assert_eq!(handler.attack_timing(), 0.9);
        handler.primary_animation = Some(AnimationSourceInfo {
            attack_time: 0.5,
            ..Default::default()
        });
        assert_eq!(handler.attack_timing(), 0.5);
    }
}
