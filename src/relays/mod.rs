//! Per-tick relays that mirror host character state onto the custom model:
//! animation parameters and movement sound.

pub mod animator;
pub mod sound;

pub use animator::{AnimatorRelay, WeightState, weight_state};
pub use sound::{AiNoiseEmitted, CharacterSoundRelay, FootstepCategory, FootstepEmitted};
