//! Sound relay: turns accumulated moving-time into AI-perceptible noise
//! pings and cosmetic footstep events, on two independent cadences.

use crate::character::{CharacterMovement, CharacterVitals, FootstepProfile};
use bevy::prelude::*;

/// Below this movement speed both cadence timers reset and no sound fires.
pub const MOVE_SOUND_SPEED_THRESHOLD: f32 = 0.5;
/// Cosmetic footstep cadence for the custom model's stride.
pub const CUSTOM_WALK_FREQUENCY: f32 = 4.0;
pub const CUSTOM_RUN_FREQUENCY: f32 = 7.0;
/// Carried-weight fraction at and above which footfalls count as heavy.
pub const HEAVY_WEIGHT_RATE: f32 = 0.75;
/// AI noise radius multiplier while heavy.
pub const HEAVY_RADIUS_SCALE: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootstepCategory {
    WalkLight,
    WalkHeavy,
    RunLight,
    RunHeavy,
}

pub fn footstep_category(running: bool, heavy: bool) -> FootstepCategory {
    match (running, heavy) {
        (false, false) => FootstepCategory::WalkLight,
        (false, true) => FootstepCategory::WalkHeavy,
        (true, false) => FootstepCategory::RunLight,
        (true, true) => FootstepCategory::RunHeavy,
    }
}

/// Noise the game's AI can react to.
#[derive(Message, Debug, Clone, Copy)]
pub struct AiNoiseEmitted {
    pub position: Vec3,
    pub radius: f32,
    pub character: Entity,
}

/// Cosmetic footstep audio cue.
#[derive(Message, Debug, Clone, Copy)]
pub struct FootstepEmitted {
    pub position: Vec3,
    pub category: FootstepCategory,
    pub character: Entity,
}

/// Per-character cadence timers. The AI-noise timer runs at the host's own
/// footstep frequency; the custom timer at the custom model's stride.
#[derive(Component, Debug, Clone)]
pub struct CharacterSoundRelay {
    move_sound_timer: f32,
    custom_move_sound_timer: f32,
    pub custom_walk_frequency: f32,
    pub custom_run_frequency: f32,
}

impl Default for CharacterSoundRelay {
    fn default() -> Self {
        Self {
            move_sound_timer: 0.0,
            custom_move_sound_timer: 0.0,
            custom_walk_frequency: CUSTOM_WALK_FREQUENCY,
            custom_run_frequency: CUSTOM_RUN_FREQUENCY,
        }
    }
}

pub fn relay_movement_sound(
    time: Res<Time>,
    mut characters: Query<(
        Entity,
        &mut CharacterSoundRelay,
        &CharacterMovement,
        &CharacterVitals,
        &FootstepProfile,
        &GlobalTransform,
    )>,
    mut noise: MessageWriter<AiNoiseEmitted>,
    mut footsteps: MessageWriter<FootstepEmitted>,
) {
    let delta = time.delta_secs();
    for (character, mut relay, movement, vitals, profile, transform) in &mut characters {
        if movement.velocity.length() < MOVE_SOUND_SPEED_THRESHOLD {
            relay.move_sound_timer = 0.0;
            relay.custom_move_sound_timer = 0.0;
            continue;
        }
        relay.move_sound_timer += delta;
        relay.custom_move_sound_timer += delta;

        // Aiming or item-less characters stay silent, but their cadences
        // still tick over so sound resumes on beat.
        let skip = movement.aiming || !vitals.has_character_item;
        let running = movement.running;
        let heavy =
            vitals.max_weight > 0.0 && vitals.total_weight >= HEAVY_WEIGHT_RATE * vitals.max_weight;
        let position = transform.translation();

        let noise_frequency = if running {
            profile.run_frequency
        } else {
            profile.walk_frequency
        };
        if noise_frequency > 0.0 && relay.move_sound_timer > 1.0 / noise_frequency {
            relay.move_sound_timer = 0.0;
            if !skip {
                let base = if running {
                    profile.run_distance
                } else {
                    profile.walk_distance
                };
                let radius = base * if heavy { HEAVY_RADIUS_SCALE } else { 1.0 };
                if radius > 0.0 {
                    noise.write(AiNoiseEmitted {
                        position,
                        radius,
                        character,
                    });
                }
            }
        }

        let step_frequency = if running {
            relay.custom_run_frequency
        } else {
            relay.custom_walk_frequency
        };
        if step_frequency > 0.0 && relay.custom_move_sound_timer > 1.0 / step_frequency {
            relay.custom_move_sound_timer = 0.0;
            if !skip {
                footsteps.write(FootstepEmitted {
                    position,
                    category: footstep_category(running, heavy),
                    character,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_follows_running_and_heavy_flags() {
        assert_eq!(footstep_category(false, false), FootstepCategory::WalkLight);
        assert_eq!(footstep_category(false, true), FootstepCategory::WalkHeavy);
        assert_eq!(footstep_category(true, false), FootstepCategory::RunLight);
        assert_eq!(footstep_category(true, true), FootstepCategory::RunHeavy);
    }
}
