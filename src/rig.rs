//! The custom model's animation rig surface: a write-only, fire-and-forget
//! named-parameter sink plus the timing/capability info carried over from the
//! original model's animation definition.

use bevy::prelude::*;
use std::collections::HashMap;

/// Parameter names the relays write every tick. These match the parameter set
/// custom model rigs are authored against.
pub mod params {
    pub const DIE: &str = "Die";
    pub const MOVE_SPEED: &str = "MoveSpeed";
    pub const MOVE_DIR_X: &str = "MoveDirX";
    pub const MOVE_DIR_Y: &str = "MoveDirY";
    pub const GROUNDED: &str = "Grounded";
    pub const MOVING: &str = "Moving";
    pub const RUNNING: &str = "Running";
    pub const DASHING: &str = "Dashing";
    pub const ATTACK: &str = "Attack";
    pub const HAND_STATE: &str = "HandState";
    pub const GUN_READY: &str = "GunReady";
    pub const RELOADING: &str = "Reloading";
    pub const RIGHT_HAND_OUT: &str = "RightHandOut";
    pub const HEALTH_RATE: &str = "HealthRate";
    pub const WATER_RATE: &str = "WaterRate";
    pub const WEIGHT_RATE: &str = "WeightRate";
    pub const WEIGHT_STATE: &str = "WeightState";
    pub const HIDE_ORIGINAL_EQUIPMENT: &str = "HideOriginalEquipment";
}

/// Name of the blend layer driven by the melee attack weight ramp.
pub const MELEE_ATTACK_LAYER: &str = "MeleeAttack";

#[derive(Debug, Clone)]
pub struct AnimatorLayer {
    pub name: String,
    pub weight: f32,
}

/// Named-parameter sink on a custom model instance. The relays write into it
/// each tick; whatever drives the rig's playback reads from it. Writes never
/// fail — unknown parameters are simply recorded.
#[derive(Component, Debug, Default)]
pub struct ModelAnimator {
    bools: HashMap<&'static str, bool>,
    floats: HashMap<&'static str, f32>,
    ints: HashMap<&'static str, i32>,
    triggers: Vec<&'static str>,
    layers: Vec<AnimatorLayer>,
}

impl ModelAnimator {
    pub fn with_layers(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            layers: names
                .into_iter()
                .map(|name| AnimatorLayer {
                    name: name.into(),
                    weight: 1.0,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn set_bool(&mut self, name: &'static str, value: bool) {
        self.bools.insert(name, value);
    }

    pub fn set_float(&mut self, name: &'static str, value: f32) {
        self.floats.insert(name, value);
    }

    pub fn set_int(&mut self, name: &'static str, value: i32) {
        self.ints.insert(name, value);
    }

    pub fn set_trigger(&mut self, name: &'static str) {
        self.triggers.push(name);
    }

    pub fn bool_param(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }

    pub fn float_param(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    pub fn int_param(&self, name: &str) -> Option<i32> {
        self.ints.get(name).copied()
    }

    /// Drains triggers fired since the last call; the rig driver consumes
    /// these once per frame.
    pub fn take_triggers(&mut self) -> Vec<&'static str> {
        std::mem::take(&mut self.triggers)
    }

    pub fn pending_triggers(&self) -> &[&'static str] {
        &self.triggers
    }

    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.name == name)
    }

    pub fn set_layer_weight(&mut self, index: usize, weight: f32) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.weight = weight;
        }
    }

    pub fn layer_weight(&self, index: usize) -> Option<f32> {
        self.layers.get(index).map(|layer| layer.weight)
    }
}

/// Piecewise-linear blend curve, sampled with clamped ends.
#[derive(Debug, Clone)]
pub struct AttackCurve {
    keys: Vec<(f32, f32)>,
}

impl AttackCurve {
    /// Keys are (time, value) pairs; they are sorted by time on construction.
    pub fn new(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<(f32, f32)> = keys.into_iter().collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let Some(first) = self.keys.first() else {
            return 0.0;
        };
        if t <= first.0 {
            return first.1;
        }
        let last = self.keys[self.keys.len() - 1];
        if t >= last.0 {
            return last.1;
        }
        for window in self.keys.windows(2) {
            let (t0, v0) = window[0];
            let (t1, v1) = window[1];
            if t <= t1 {
                let span = t1 - t0;
                if span <= f32::EPSILON {
                    return v1;
                }
                return v0 + (v1 - v0) * ((t - t0) / span);
            }
        }
        last.1
    }
}

/// Attack timing and capability flags read from one of the original model's
/// animation definitions.
#[derive(Debug, Clone)]
pub struct AnimationSourceInfo {
    /// Whether the rig has a dedicated dash animation usable while the dash
    /// is still player-controllable.
    pub has_dash_control_animation: bool,
    pub attack_curve: Option<AttackCurve>,
    pub attack_time: f32,
}

impl Default for AnimationSourceInfo {
    fn default() -> Self {
        Self {
            has_dash_control_animation: false,
            attack_curve: None,
            attack_time: DEFAULT_ATTACK_TIME,
        }
    }
}

pub const DEFAULT_ATTACK_TIME: f32 = 0.3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_interpolates_between_keys() {
        let curve = AttackCurve::new([(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)]);
        assert_eq!(curve.evaluate(0.0), 0.0);
        assert!((curve.evaluate(0.25) - 0.5).abs() < 1e-6);
        assert_eq!(curve.evaluate(0.5), 1.0);
        assert!((curve.evaluate(0.75) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn curve_clamps_outside_key_range() {
        let curve = AttackCurve::new([(0.2, 0.3), (0.8, 0.9)]);
        assert_eq!(curve.evaluate(-1.0), 0.3);
        assert_eq!(curve.evaluate(2.0), 0.9);
    }

    #[test]
    fn empty_curve_samples_zero() {
        let curve = AttackCurve::new([]);
        assert_eq!(curve.evaluate(0.5), 0.0);
    }

    #[test]
    fn layer_lookup_and_weight() {
        let mut animator = ModelAnimator::with_layers(["Base", MELEE_ATTACK_LAYER]);
        let index = animator.layer_index(MELEE_ATTACK_LAYER).unwrap();
        assert_eq!(index, 1);
        animator.set_layer_weight(index, 0.4);
        assert_eq!(animator.layer_weight(index), Some(0.4));
        assert_eq!(animator.layer_index("Missing"), None);
    }

    #[test]
    fn triggers_drain_once() {
        let mut animator = ModelAnimator::default();
        animator.set_trigger(params::ATTACK);
        assert_eq!(animator.take_triggers(), vec![params::ATTACK]);
        assert!(animator.take_triggers().is_empty());
    }
}
