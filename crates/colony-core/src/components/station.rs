//! Station Components
//!
//! Fixed interaction points: a counter, a stove, a bed. Stations hold items in
//! ordered input/output slots and may advertise motives they fulfill on direct
//! use.

use bevy_math::Vec2;
use std::collections::BTreeMap;

use super::ids::{AgentId, ItemId, StationId};
use super::item::{Item, ItemLocation, SlotKind};
use super::motive::MotiveKind;

/// A slotted interaction point with a single-agent reservation.
#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    /// Station type matched against recipe steps
    pub tag: String,
    /// Where the station itself sits
    pub position: Vec2,
    /// Where an agent stands to use it
    pub footprint: Vec2,
    /// Motive → fulfillment per game minute of direct use
    pub advertisements: BTreeMap<MotiveKind, f32>,
    input_slots: Vec<Option<ItemId>>,
    output_slots: Vec<Option<ItemId>>,
    reserved_by: Option<AgentId>,
}

impl Station {
    pub fn new(
        id: StationId,
        name: impl Into<String>,
        tag: impl Into<String>,
        position: Vec2,
        footprint: Vec2,
        input_slots: usize,
        output_slots: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            tag: tag.into(),
            position,
            footprint,
            advertisements: BTreeMap::new(),
            input_slots: vec![None; input_slots],
            output_slots: vec![None; output_slots],
            reserved_by: None,
        }
    }

    pub fn with_advertisement(mut self, motive: MotiveKind, rate: f32) -> Self {
        self.advertisements.insert(motive, rate);
        self
    }

    /// Fulfillment rate for a motive, zero when not advertised.
    pub fn rate_for(&self, motive: MotiveKind) -> f32 {
        self.advertisements.get(&motive).copied().unwrap_or(0.0)
    }

    pub fn slots(&self, kind: SlotKind) -> &[Option<ItemId>] {
        match kind {
            SlotKind::Input => &self.input_slots,
            SlotKind::Output => &self.output_slots,
        }
    }

    fn slots_mut(&mut self, kind: SlotKind) -> &mut Vec<Option<ItemId>> {
        match kind {
            SlotKind::Input => &mut self.input_slots,
            SlotKind::Output => &mut self.output_slots,
        }
    }

    /// Items currently sitting in a slot row, in slot order.
    pub fn items_in(&self, kind: SlotKind) -> Vec<ItemId> {
        self.slots(kind).iter().flatten().copied().collect()
    }

    pub fn first_free_slot(&self, kind: SlotKind) -> Option<usize> {
        self.slots(kind).iter().position(Option::is_none)
    }

    pub fn slot_of(&self, item: ItemId) -> Option<(SlotKind, usize)> {
        for kind in [SlotKind::Input, SlotKind::Output] {
            if let Some(index) = self.slots(kind).iter().position(|s| *s == Some(item)) {
                return Some((kind, index));
            }
        }
        None
    }

    /// Puts an item into a slot and points its location here.
    ///
    /// Fails when the index is out of range or the slot is occupied.
    pub fn place(&mut self, kind: SlotKind, index: usize, item: &mut Item) -> bool {
        let station = self.id;
        match self.slots_mut(kind).get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(item.id);
                item.location = ItemLocation::InSlot {
                    station,
                    kind,
                    index,
                };
                true
            }
            _ => false,
        }
    }

    /// Empties a slot, returning what was there. The caller relocates it.
    pub fn take(&mut self, kind: SlotKind, index: usize) -> Option<ItemId> {
        self.slots_mut(kind).get_mut(index).and_then(Option::take)
    }

    pub fn reserved_by(&self) -> Option<AgentId> {
        self.reserved_by
    }

    pub fn is_available_to(&self, agent: AgentId) -> bool {
        self.reserved_by.map_or(true, |holder| holder == agent)
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
}
