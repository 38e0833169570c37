//! Carried and equipped items, as far as item theft needs to see them

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// An item in a character's pack. Equipped items also appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItem {
    pub id: ItemId,
    pub name: String,
}

impl EquipmentItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
        }
    }
}
