pub mod sockets;
pub mod state;

pub use sockets::{DontHideAsEquipment, EquipSocket, EquipmentSockets};
pub use state::{
    AttackTriggered, CarryAction, CharacterHealth, CharacterMovement, CharacterVitals,
    FootstepProfile, GameplayContext, GunState, HeldItem, ItemAgent, ReloadAction,
};
