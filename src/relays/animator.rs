//! Animation relay: once per tick, pushes the host character's state onto the
//! custom rig's named parameters, in a fixed category order (dead, movement,
//! vitals, hand, firearm, equipment, melee attack).

use crate::attachment::ModelHandler;
use crate::character::{
    AttackTriggered, CarryAction, CharacterHealth, CharacterMovement, CharacterVitals,
    DontHideAsEquipment, EquipSocket, EquipmentSockets, GameplayContext, GunState, HeldItem,
    ItemAgent, ReloadAction,
};
use crate::rig::{MELEE_ATTACK_LAYER, ModelAnimator, params};
use crate::settings::SettingsResource;
use bevy::prelude::*;
use std::collections::HashSet;

/// Discrete carry-weight state reported to the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightState {
    Light,
    Normal,
    SuperHeavy,
    OverWeight,
}

impl WeightState {
    pub fn param_value(self) -> i32 {
        match self {
            Self::Light => 0,
            Self::Normal => 1,
            Self::SuperHeavy => 2,
            Self::OverWeight => 3,
        }
    }
}

/// Maps a weight rate onto the discrete state. Outside a raid the state is
/// always `Normal`, whatever the rate.
pub fn weight_state(weight_rate: f32, in_raid: bool) -> WeightState {
    if !in_raid {
        return WeightState::Normal;
    }
    if weight_rate > 1.0 {
        WeightState::OverWeight
    } else if weight_rate > 0.75 {
        WeightState::SuperHeavy
    } else if weight_rate > 0.25 {
        WeightState::Normal
    } else {
        WeightState::Light
    }
}

/// Per-character relay state. Re-binds itself whenever the handler's custom
/// model changes, and stays dormant while there is none.
#[derive(Component, Debug, Default)]
pub struct AnimatorRelay {
    initialized: bool,
    rig: Option<Entity>,
    attack_layer: Option<usize>,
    attacking: bool,
    attack_timer: f32,
    /// Cached held-item agent backing the hand-pose code; only refreshed once
    /// the cached reference goes inactive.
    hand_item: Option<Entity>,
    hand_state: i32,
    /// Last firearm seen in hand; survives the firearm being holstered so the
    /// rig keeps the stale readiness until a new item replaces it.
    gun_item: Option<Entity>,
}

impl AnimatorRelay {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_attacking(&self) -> bool {
        self.attacking
    }
}

pub fn relay_animator_state(
    time: Res<Time>,
    context: Res<GameplayContext>,
    settings: Res<SettingsResource>,
    mut attacks: MessageReader<AttackTriggered>,
    mut characters: Query<(
        Entity,
        &mut AnimatorRelay,
        &ModelHandler,
        &CharacterMovement,
        Option<&CharacterHealth>,
        Option<&CharacterVitals>,
        Option<&CarryAction>,
        Option<&ReloadAction>,
        Option<&HeldItem>,
        Option<&EquipmentSockets>,
    )>,
    mut animators: Query<&mut ModelAnimator>,
    items: Query<&ItemAgent>,
    guns: Query<&GunState>,
    children_query: Query<&Children>,
    mut visibilities: Query<&mut Visibility>,
    dont_hide: Query<(), With<DontHideAsEquipment>>,
    entities: Query<Entity>,
) {
    let triggered: HashSet<Entity> = attacks.read().map(|attack| attack.character).collect();

    for (character, mut relay, handler, movement, health, vitals, carry, reload, held, sockets) in
        &mut characters
    {
        if relay.rig != handler.custom_model {
            relay.rig = handler.custom_model;
            relay.initialized = handler.custom_model.is_some();
            relay.attack_layer = None;
            relay.attacking = false;
            relay.attack_timer = 0.0;
            if !relay.initialized {
                // Rig gone: everything hidden on its behalf comes back.
                if let Some(sockets) = sockets {
                    restore_socket_children(sockets, &children_query, &mut visibilities);
                }
            }
        }
        if !relay.initialized {
            continue;
        }
        let Some(rig) = relay.rig else {
            continue;
        };
        let Ok(mut animator) = animators.get_mut(rig) else {
            continue;
        };
        if relay.attack_layer.is_none() {
            relay.attack_layer = animator.layer_index(MELEE_ATTACK_LAYER);
            if let Some(layer) = relay.attack_layer {
                animator.set_layer_weight(layer, 0.0);
            }
        }

        // Dead state, written only when the host tracks health at all.
        if let Some(health) = health {
            animator.set_bool(params::DIE, health.is_dead);
        }

        // Movement.
        animator.set_float(params::MOVE_SPEED, movement.anim_move_speed);
        animator.set_float(params::MOVE_DIR_X, movement.local_move_direction.x);
        animator.set_float(params::MOVE_DIR_Y, movement.local_move_direction.y);
        animator.set_bool(params::GROUNDED, movement.on_ground);
        animator.set_bool(params::MOVING, movement.moving);
        animator.set_bool(params::RUNNING, movement.running);
        let mut dashing = movement.dashing;
        if !handler.has_dash_control_animation() && movement.dash_can_control {
            dashing = false;
        }
        animator.set_bool(params::DASHING, dashing);

        // Vitals and carry weight.
        let health_rate = health
            .map(|health| {
                if health.max > 0.0 {
                    health.current / health.max
                } else {
                    0.0
                }
            })
            .unwrap_or(1.0);
        animator.set_float(params::HEALTH_RATE, health_rate);
        let water_rate = vitals
            .map(|vitals| {
                if vitals.max_water <= 0.0 {
                    1.0
                } else {
                    vitals.current_water / vitals.max_water
                }
            })
            .unwrap_or(1.0);
        animator.set_float(params::WATER_RATE, water_rate);
        let carrying = carry.map(|carry| carry.running).unwrap_or(false);
        let weight_rate = vitals
            .map(|vitals| {
                let carried = vitals.total_weight
                    + carry
                        .filter(|carry| carry.running)
                        .map(|carry| carry.weight)
                        .unwrap_or(0.0);
                if vitals.max_weight > 0.0 {
                    carried / vitals.max_weight
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0);
        animator.set_float(params::WEIGHT_RATE, weight_rate);
        animator.set_int(
            params::WEIGHT_STATE,
            weight_state(weight_rate, context.in_raid).param_value(),
        );

        // Hand state. Carrying overrides everything; otherwise the cached
        // pose holds until the cached item goes inactive.
        let held_agent = held.and_then(|held| held.agent);
        if carrying {
            animator.set_int(params::HAND_STATE, -1);
        } else {
            let cached_active = relay
                .hand_item
                .and_then(|item| items.get(item).ok())
                .map(|item| item.active)
                .unwrap_or(false);
            if !cached_active {
                relay.hand_item = held_agent;
                relay.hand_state = relay
                    .hand_item
                    .and_then(|item| items.get(item).ok())
                    .map(|item| item.hand_pose)
                    .unwrap_or(0);
            }
            animator.set_int(params::HAND_STATE, relay.hand_state);
        }
        let held_active = held_agent
            .and_then(|item| items.get(item).ok())
            .map(|item| item.active)
            .unwrap_or(false);
        let reloading_action = reload.map(|reload| reload.running).unwrap_or(false);
        animator.set_bool(params::RIGHT_HAND_OUT, held_active && !reloading_action);

        // Firearm readiness.
        if let Some(agent) = held_agent.filter(|agent| guns.contains(*agent)) {
            relay.gun_item = Some(agent);
        } else if relay
            .gun_item
            .is_some_and(|agent| !entities.contains(agent))
        {
            relay.gun_item = None;
        }
        let gun = relay.gun_item.and_then(|agent| guns.get(agent).ok());
        let (gun_reloading, gun_ready) = match gun {
            Some(gun) => (gun.reloading, gun.ammo > 0 && !gun.reloading),
            None => (false, false),
        };
        animator.set_bool(params::RELOADING, gun_reloading);
        animator.set_bool(params::GUN_READY, gun_ready);

        // Equipment occupancy and original-equipment visibility.
        let hide_equipment = settings.current.hide_original_equipment;
        animator.set_bool(params::HIDE_ORIGINAL_EQUIPMENT, hide_equipment);
        if let Some(sockets) = sockets {
            for socket in EquipSocket::ALL {
                let occupied = sockets
                    .get(socket)
                    .and_then(|entity| children_query.get(entity).ok())
                    .map(|children| !children.is_empty())
                    .unwrap_or(false);
                animator.set_bool(socket.equip_param(), occupied);
            }
            for socket in EquipSocket::HIDDEN_WHEN_REPLACED {
                let Some(children) = sockets
                    .get(socket)
                    .and_then(|entity| children_query.get(entity).ok())
                else {
                    continue;
                };
                for child in children.iter() {
                    if dont_hide.contains(child) {
                        continue;
                    }
                    if let Ok(mut visibility) = visibilities.get_mut(child) {
                        *visibility = if hide_equipment {
                            Visibility::Hidden
                        } else {
                            Visibility::Inherited
                        };
                    }
                }
            }
        }

        // Melee attack blend ramp.
        if triggered.contains(&character) {
            relay.attacking = true;
            relay.attack_timer = 0.0;
            animator.set_trigger(params::ATTACK);
        }
        if let Some(layer) = relay.attack_layer {
            if relay.attacking {
                relay.attack_timer += time.delta_secs();
                let duration = handler.attack_timing();
                if relay.attack_timer >= duration {
                    relay.attacking = false;
                    animator.set_layer_weight(layer, 0.0);
                } else {
                    let t = relay.attack_timer / duration;
                    let weight = handler
                        .attack_curve()
                        .map(|curve| curve.evaluate(t))
                        .unwrap_or(0.0);
                    animator.set_layer_weight(layer, weight);
                }
            } else if animator.layer_weight(layer) != Some(0.0) {
                animator.set_layer_weight(layer, 0.0);
            }
        }
    }
}

/// Teardown path: a removed relay always leaves the original equipment
/// visible, markers or not.
pub fn restore_equipment_on_relay_removal(
    mut removed: RemovedComponents<AnimatorRelay>,
    sockets: Query<&EquipmentSockets>,
    children_query: Query<&Children>,
    mut visibilities: Query<&mut Visibility>,
) {
    for character in removed.read() {
        if let Ok(sockets) = sockets.get(character) {
            restore_socket_children(sockets, &children_query, &mut visibilities);
        }
    }
}

fn restore_socket_children(
    sockets: &EquipmentSockets,
    children_query: &Query<&Children>,
    visibilities: &mut Query<&mut Visibility>,
) {
    for socket in EquipSocket::ALL {
        let Some(children) = sockets
            .get(socket)
            .and_then(|entity| children_query.get(entity).ok())
        else {
            continue;
        };
        for child in children.iter() {
            if let Ok(mut visibility) = visibilities.get_mut(child) {
                *visibility = Visibility::Inherited;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_state_thresholds() {
        assert_eq!(weight_state(0.1, true), WeightState::Light);
        assert_eq!(weight_state(0.25, true), WeightState::Light);
        assert_eq!(weight_state(0.26, true), WeightState::Normal);
        assert_eq!(weight_state(0.75, true), WeightState::Normal);
        assert_eq!(weight_state(0.76, true), WeightState::SuperHeavy);
        assert_eq!(weight_state(1.0, true), WeightState::SuperHeavy);
        assert_eq!(weight_state(1.01, true), WeightState::OverWeight);
    }

    #[test]
    fn weight_state_collapses_outside_raid() {
        for rate in [0.0, 0.3, 0.9, 5.0] {
            assert_eq!(weight_state(rate, false), WeightState::Normal);
        }
    }
}
