//! App wiring: resources, messages, and the Update-schedule pipeline that
//! runs refresh stepping, model swaps, and the per-tick relays in order.

use crate::attachment::{
    ModelHandler, ModelSwapRequest, apply_model_swaps, attach_objects_to_named_sockets,
    register_spawned_props, unregister_despawned_props,
};
use crate::bundle::BundleCache;
use crate::catalog::refresh::{
    ModelRefresh, RefreshCompleted, RefreshProgress, RefreshStarted, advance_model_refresh,
};
use crate::catalog::{ModelCatalog, ModelDirectory};
use crate::character::{AttackTriggered, GameplayContext};
use crate::relays::animator::{relay_animator_state, restore_equipment_on_relay_removal};
use crate::relays::sound::{AiNoiseEmitted, FootstepEmitted, relay_movement_sound};
use crate::settings::{SETTINGS_FILE_PATH, SettingsResource, ensure_settings_file_exists,
    load_settings_or_default};
use bevy::prelude::*;
use std::path::{Path, PathBuf};

/// Master switch flipped by the configured toggle key. Disabling it clears
/// every character back to its original model.
#[derive(Resource, Debug, Clone, Copy)]
pub struct CustomModelsEnabled(pub bool);

impl Default for CustomModelsEnabled {
    fn default() -> Self {
        Self(true)
    }
}

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelPipeline {
    Refresh,
    Swap,
    Relay,
}

pub struct ReskinPlugin {
    pub model_directory: PathBuf,
    pub settings_path: PathBuf,
}

impl ReskinPlugin {
    pub fn new(model_directory: impl Into<PathBuf>) -> Self {
        Self {
            model_directory: model_directory.into(),
            settings_path: PathBuf::from(SETTINGS_FILE_PATH),
        }
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }
}

impl Plugin for ReskinPlugin {
    fn build(&self, app: &mut App) {
        if let Err(error) = ensure_settings_file_exists(&self.settings_path) {
            warn!("{error}");
        }
        let settings = load_settings_or_default(&self.settings_path);

        app.insert_resource(ModelDirectory {
            root: self.model_directory.clone(),
        })
        .insert_resource(SettingsResource { current: settings })
        .init_resource::<ModelCatalog>()
        .init_resource::<BundleCache>()
        .init_resource::<ModelRefresh>()
        .init_resource::<GameplayContext>()
        .init_resource::<CustomModelsEnabled>()
        .init_resource::<Time>()
        .init_resource::<ButtonInput<KeyCode>>()
        .add_message::<AttackTriggered>()
        .add_message::<ModelSwapRequest>()
        .add_message::<RefreshStarted>()
        .add_message::<RefreshProgress>()
        .add_message::<RefreshCompleted>()
        .add_message::<AiNoiseEmitted>()
        .add_message::<FootstepEmitted>()
        .configure_sets(
            Update,
            (
                ModelPipeline::Refresh,
                ModelPipeline::Swap,
                ModelPipeline::Relay,
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                advance_model_refresh.in_set(ModelPipeline::Refresh),
                (
                    toggle_custom_models,
                    clear_models_when_disabled,
                    apply_model_swaps,
                    register_spawned_props,
                    attach_objects_to_named_sockets,
                    unregister_despawned_props,
                )
                    .chain()
                    .in_set(ModelPipeline::Swap),
                (
                    relay_animator_state,
                    relay_movement_sound,
                    restore_equipment_on_relay_removal,
                )
                    .in_set(ModelPipeline::Relay),
            ),
        );
    }
}

/// Flips the master switch on the configured key.
pub fn toggle_custom_models(
    keys: Res<ButtonInput<KeyCode>>,
    settings: Res<SettingsResource>,
    mut enabled: ResMut<CustomModelsEnabled>,
) {
    if keys.just_pressed(settings.current.toggle_key.to_bevy()) {
        enabled.0 = !enabled.0;
        info!(
            "custom models {}",
            if enabled.0 { "enabled" } else { "disabled" }
        );
    }
}

/// When the master switch turns off, every character with an active custom
/// model gets a clearing swap request.
pub fn clear_models_when_disabled(
    enabled: Res<CustomModelsEnabled>,
    handlers: Query<(Entity, &ModelHandler)>,
    mut swaps: MessageWriter<ModelSwapRequest>,
) {
    if !enabled.is_changed() || enabled.0 {
        return;
    }
    for (character, handler) in &handlers {
        if handler.custom_model.is_some() {
            swaps.write(ModelSwapRequest {
                character,
                model_id: None,
            });
        }
    }
}

/// Convenience for hosts that keep the default settings location.
pub fn default_settings_path() -> &'static Path {
    Path::new(SETTINGS_FILE_PATH)
}
