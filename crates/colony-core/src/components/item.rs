//! Item Components
//!
//! Physical, stateful units of world content. An item's location carries a
//! back-reference to whatever currently owns it.

use bevy_math::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{AgentId, ContainerId, ItemId, StationId};

/// Processing state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Raw,
    Prepped,
    Cooked,
    Dirty,
    Broken,
}

impl ItemState {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemState::Raw => "raw",
            ItemState::Prepped => "prepped",
            ItemState::Cooked => "cooked",
            ItemState::Dirty => "dirty",
            ItemState::Broken => "broken",
        }
    }

    /// Guesses the state implied by an item tag such as `chopped_veg`.
    ///
    /// Returns `None` when the tag carries no hint.
    pub fn infer_from_tag(tag: &str) -> Option<Self> {
        let tag = tag.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| tag.contains(w));
        if has(&["broken", "shattered"]) {
            Some(ItemState::Broken)
        } else if has(&["dirty", "used", "soiled"]) {
            Some(ItemState::Dirty)
        } else if has(&["cooked", "meal", "baked", "fried", "roast", "boiled"]) {
            Some(ItemState::Cooked)
        } else if has(&["prepped", "chopped", "sliced", "diced", "mixed", "washed"]) {
            Some(ItemState::Prepped)
        } else if has(&["raw"]) {
            Some(ItemState::Raw)
        } else {
            None
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(ItemState::Raw),
            "prepped" => Ok(ItemState::Prepped),
            "cooked" => Ok(ItemState::Cooked),
            "dirty" => Ok(ItemState::Dirty),
            "broken" => Ok(ItemState::Broken),
            _ => Err(format!("unknown item state '{}'", s)),
        }
    }
}

/// Which slot row of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Input,
    Output,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Input => f.write_str("input"),
            SlotKind::Output => f.write_str("output"),
        }
    }
}

/// Where an item is, and who owns that place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemLocation {
    InContainer(ContainerId),
    InHand(AgentId),
    InSlot {
        station: StationId,
        kind: SlotKind,
        index: usize,
    },
    OnGround(Vec2),
}

impl ItemLocation {
    pub fn is_in_hand_of(&self, agent: AgentId) -> bool {
        matches!(self, ItemLocation::InHand(holder) if *holder == agent)
    }

    /// Short label used in snapshots and logs.
    pub fn describe(&self) -> String {
        match self {
            ItemLocation::InContainer(id) => format!("in_container:{}", id.raw()),
            ItemLocation::InHand(id) => format!("in_hand:{}", id.raw()),
            ItemLocation::InSlot {
                station,
                kind,
                index,
            } => format!("in_slot:{}/{}/{}", station.raw(), kind, index),
            ItemLocation::OnGround(pos) => format!("on_ground:{:.1},{:.1}", pos.x, pos.y),
        }
    }
}

/// A physical unit of world content.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub tag: String,
    pub state: ItemState,
    pub location: ItemLocation,
    reserved_by: Option<AgentId>,
}

impl Item {
    pub fn new(id: ItemId, tag: impl Into<String>, state: ItemState, location: ItemLocation) -> Self {
        Self {
            id,
            tag: tag.into(),
            state,
            location,
            reserved_by: None,
        }
    }

    pub fn reserved_by(&self) -> Option<AgentId> {
        self.reserved_by
    }

    /// Succeeds iff unreserved or already held by the same agent.
    pub fn reserve(&mut self, agent: AgentId) -> bool {
        match self.reserved_by {
            None => {
                self.reserved_by = Some(agent);
                true
            }
            Some(holder) => holder == agent,
        }
    }

    pub fn release(&mut self) {
        self.reserved_by = None;
    }

    /// True when `agent` may take this item: unreserved or reserved by them,
    /// and not in somebody's hands.
    pub fn is_available_to(&self, agent: AgentId) -> bool {
        let reservation_ok = self.reserved_by.map_or(true, |holder| holder == agent);
        let free = match self.location {
            ItemLocation::InHand(holder) => holder == agent,
            _ => true,
        };
        reservation_ok && free
    }

    /// Rewrites tag and state, returning the previous tag.
    pub fn transform(&mut self, tag: &str, state: Option<ItemState>) -> String {
        let previous = std::mem::replace(&mut self.tag, tag.to_string());
        if let Some(state) = state.or_else(|| ItemState::infer_from_tag(tag)) {
            self.state = state;
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_item(tag: &str) -> Item {
        Item::new(ItemId(1), tag, ItemState::Raw, ItemLocation::OnGround(Vec2::ZERO))
    }

    #[test]
    fn test_reserve_single_owner() {
        let mut item = ground_item("raw_food");
        assert!(item.reserve(AgentId(1)));
        assert!(item.reserve(AgentId(1)));
        assert!(!item.reserve(AgentId(2)));
        assert_eq!(item.reserved_by(), Some(AgentId(1)));

        item.release();
        assert!(item.reserve(AgentId(2)));
    }

    #[test]
    fn test_availability() {
        let mut item = ground_item("soap");
        assert!(item.is_available_to(AgentId(1)));
        item.reserve(AgentId(2));
        assert!(!item.is_available_to(AgentId(1)));
        assert!(item.is_available_to(AgentId(2)));

        item.release();
        item.location = ItemLocation::InHand(AgentId(3));
        assert!(!item.is_available_to(AgentId(1)));
    }

    #[test]
    fn test_transform_infers_state() {
        let mut item = ground_item("raw_food");
        let old = item.transform("chopped_food", None);
        assert_eq!(old, "raw_food");
        assert_eq!(item.tag, "chopped_food");
        assert_eq!(item.state, ItemState::Prepped);

        item.transform("cooked_meal", None);
        assert_eq!(item.state, ItemState::Cooked);
    }

    #[test]
    fn test_transform_explicit_state_wins() {
        let mut item = ground_item("plate");
        item.transform("plate", Some(ItemState::Dirty));
        assert_eq!(item.state, ItemState::Dirty);

        // No hint in the tag keeps the current state
        item.transform("dish", None);
        assert_eq!(item.state, ItemState::Dirty);
    }

    #[test]
    fn test_location_describe() {
        let loc = ItemLocation::InSlot {
            station: StationId(2),
            kind: SlotKind::Input,
            index: 0,
        };
        assert_eq!(loc.describe(), "in_slot:2/input/0");
        assert_eq!(ItemLocation::InHand(AgentId(4)).describe(), "in_hand:4");
    }
}
