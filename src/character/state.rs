//! Read-only contracts the host game exposes on its character entities.
//!
//! The original simulation owns all of this state; the relays only mirror it
//! onto the custom model, so every component here is written by the host and
//! read by this crate.

use bevy::prelude::*;

/// Health snapshot for a character. Absent on characters without a health
/// component; the animation relay then reports a full health rate.
#[derive(Component, Debug, Clone)]
pub struct CharacterHealth {
    pub current: f32,
    pub max: f32,
    pub is_dead: bool,
}

/// Hydration and carry-weight state plus whether the character has an item
/// container at all (characters without one never emit movement sound).
#[derive(Component, Debug, Clone)]
pub struct CharacterVitals {
    pub current_water: f32,
    pub max_water: f32,
    pub total_weight: f32,
    pub max_weight: f32,
    pub has_character_item: bool,
}

impl Default for CharacterVitals {
    fn default() -> Self {
        Self {
            current_water: 1.0,
            max_water: 1.0,
            total_weight: 0.0,
            max_weight: 1.0,
            has_character_item: true,
        }
    }
}

/// Per-tick movement state mirrored verbatim onto the rig.
#[derive(Component, Debug, Clone, Default)]
pub struct CharacterMovement {
    pub velocity: Vec3,
    /// Speed value the host feeds its own animation controller.
    pub anim_move_speed: f32,
    /// Movement direction in the character's local frame.
    pub local_move_direction: Vec2,
    pub on_ground: bool,
    pub moving: bool,
    pub running: bool,
    pub dashing: bool,
    /// True while the player can still steer the dash.
    pub dash_can_control: bool,
    /// Aim-down-sights input; gates movement sound.
    pub aiming: bool,
}

/// In-progress carry action (e.g. hauling a crate). Its weight counts toward
/// the carried total while running.
#[derive(Component, Debug, Clone, Default)]
pub struct CarryAction {
    pub running: bool,
    pub weight: f32,
}

#[derive(Component, Debug, Clone, Default)]
pub struct ReloadAction {
    pub running: bool,
}

/// The host's currently held item reference, if any.
#[derive(Component, Debug, Clone, Default)]
pub struct HeldItem {
    pub agent: Option<Entity>,
}

/// State of an item entity a character can hold.
#[derive(Component, Debug, Clone)]
pub struct ItemAgent {
    /// Hand-pose code the rig understands.
    pub hand_pose: i32,
    pub active: bool,
}

/// Firearm readiness, present only on gun items.
#[derive(Component, Debug, Clone, Default)]
pub struct GunState {
    pub ammo: u32,
    pub reloading: bool,
}

/// Base footstep cadence and audible distances the host uses for its own
/// model. The sound relay rescales these for the custom model's stride.
#[derive(Component, Debug, Clone)]
pub struct FootstepProfile {
    pub walk_frequency: f32,
    pub run_frequency: f32,
    pub walk_distance: f32,
    pub run_distance: f32,
}

impl Default for FootstepProfile {
    fn default() -> Self {
        Self {
            walk_frequency: 3.0,
            run_frequency: 5.0,
            walk_distance: 8.0,
            run_distance: 14.0,
        }
    }
}

/// Whether the current map is a qualifying gameplay mode. Outside a raid the
/// discrete weight state always collapses to `normal`.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct GameplayContext {
    pub in_raid: bool,
}

/// Raised by the host whenever a character attacks or shoots.
#[derive(Message, Debug, Clone, Copy)]
pub struct AttackTriggered {
    pub character: Entity,
}
