use bevy::prelude::*;
use std::collections::HashMap;

/// The eight named equipment sockets on a character model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EquipSocket {
    LeftHand,
    RightHand,
    Armor,
    Helmet,
    Face,
    Backpack,
    MeleeWeapon,
    PopText,
}

impl EquipSocket {
    pub const ALL: [Self; 8] = [
        Self::LeftHand,
        Self::RightHand,
        Self::Armor,
        Self::Helmet,
        Self::Face,
        Self::Backpack,
        Self::MeleeWeapon,
        Self::PopText,
    ];

    /// Sockets whose children are hidden while a custom model replaces the
    /// original equipment meshes.
    pub const HIDDEN_WHEN_REPLACED: [Self; 4] =
        [Self::Helmet, Self::Face, Self::Armor, Self::Backpack];

    pub fn name(self) -> &'static str {
        match self {
            Self::LeftHand => "LeftHand",
            Self::RightHand => "RightHand",
            Self::Armor => "Armor",
            Self::Helmet => "Helmet",
            Self::Face => "Face",
            Self::Backpack => "Backpack",
            Self::MeleeWeapon => "MeleeWeapon",
            Self::PopText => "PopText",
        }
    }

    /// Rig parameter reporting whether the socket is occupied.
    pub fn equip_param(self) -> &'static str {
        match self {
            Self::LeftHand => "LeftHandEquip",
            Self::RightHand => "RightHandEquip",
            Self::Armor => "ArmorEquip",
            Self::Helmet => "HelmetEquip",
            Self::Face => "FaceEquip",
            Self::Backpack => "BackpackEquip",
            Self::MeleeWeapon => "MeleeWeaponEquip",
            Self::PopText => "HavePopText",
        }
    }
}

/// Map from socket to the transform entity the host parents equipment under.
/// The host fills this in when the character model is built; socket child
/// visibility is the only thing this crate ever writes back.
#[derive(Component, Debug, Default)]
pub struct EquipmentSockets {
    sockets: HashMap<EquipSocket, Entity>,
}

impl EquipmentSockets {
    pub fn new(sockets: impl IntoIterator<Item = (EquipSocket, Entity)>) -> Self {
        Self {
            sockets: sockets.into_iter().collect(),
        }
    }

    pub fn set(&mut self, socket: EquipSocket, entity: Entity) {
        self.sockets.insert(socket, entity);
    }

    pub fn get(&self, socket: EquipSocket) -> Option<Entity> {
        self.sockets.get(&socket).copied()
    }
}

/// Marker for socket children that must stay visible even while original
/// equipment is hidden (carried props, effect anchors).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct DontHideAsEquipment;
