//! World Objects Registry
//!
//! Owns every item, container and station. Relocating an item goes through
//! this registry so the item's location and its owner's back-reference change
//! together.

use bevy_ecs::prelude::*;
use bevy_math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::container::Container;
use super::ids::{AgentId, ContainerId, ItemId, StationId};
use super::item::{Item, ItemLocation, ItemState, SlotKind};
use super::motive::MotiveKind;
use super::station::Station;

/// Description of a station to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSpec {
    pub name: String,
    pub tag: String,
    pub position: [f32; 2],
    /// Defaults to the station position
    #[serde(default)]
    pub footprint: Option<[f32; 2]>,
    #[serde(default = "default_slots")]
    pub input_slots: usize,
    #[serde(default = "default_slots")]
    pub output_slots: usize,
    #[serde(default)]
    pub advertisements: BTreeMap<MotiveKind, f32>,
}

fn default_slots() -> usize {
    2
}

/// Description of a container to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub position: [f32; 2],
    pub capacity: usize,
    #[serde(default)]
    pub allowed_tags: Vec<String>,
}

/// Where a newly spawned item should appear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Container(ContainerId),
    Ground(Vec2),
    Slot {
        station: StationId,
        kind: SlotKind,
    },
}

/// An available item and where an agent must stand to take it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemSource {
    pub item: ItemId,
    pub position: Vec2,
    /// Stored in a container rather than lying loose
    pub stored: bool,
}

/// Resource: registry of all items, containers and stations.
#[derive(Resource, Debug, Default)]
pub struct WorldObjects {
    items: BTreeMap<ItemId, Item>,
    containers: BTreeMap<ContainerId, Container>,
    stations: BTreeMap<StationId, Station>,
    next_id: u64,
}

impl WorldObjects {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id)
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn stations_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Station> + 'a {
        self.stations.values().filter(move |s| s.tag == tag)
    }

    /// Items currently in the agent's hands, in id order.
    pub fn held_by(&self, agent: AgentId) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|i| i.location.is_in_hand_of(agent))
            .map(|i| i.id)
            .collect()
    }

    pub fn count_tag(&self, tag: &str) -> usize {
        self.items.values().filter(|i| i.tag == tag).count()
    }

    /// World position of an item, resolving its owner.
    pub fn item_position(&self, id: ItemId) -> Option<Vec2> {
        let item = self.items.get(&id)?;
        match item.location {
            ItemLocation::InContainer(c) => self.containers.get(&c).map(|c| c.position),
            ItemLocation::InSlot { station, .. } => self.stations.get(&station).map(|s| s.footprint),
            ItemLocation::OnGround(pos) => Some(pos),
            ItemLocation::InHand(_) => None,
        }
    }

    /// Items with `tag` that `agent` could take, containers first, then
    /// loose items in slots or on the ground. Each group is in id order.
    pub fn available_sources(&self, tag: &str, agent: AgentId) -> Vec<ItemSource> {
        let mut stored = Vec::new();
        let mut loose = Vec::new();
        for item in self.items.values() {
            if item.tag != tag || !item.is_available_to(agent) {
                continue;
            }
            if item.location.is_in_hand_of(agent) {
                continue;
            }
            let Some(position) = self.item_position(item.id) else {
                continue;
            };
            let is_stored = matches!(item.location, ItemLocation::InContainer(_));
            let source = ItemSource {
                item: item.id,
                position,
                stored: is_stored,
            };
            if is_stored {
                stored.push(source);
            } else {
                loose.push(source);
            }
        }
        stored.extend(loose);
        stored
    }

    pub fn count_available(&self, tag: &str, agent: AgentId) -> usize {
        self.available_sources(tag, agent).len()
    }

    // ------------------------------------------------------------------
    // Spawning and removal
    // ------------------------------------------------------------------

    pub fn spawn_container(&mut self, spec: &ContainerSpec) -> ContainerId {
        let id = ContainerId(self.allocate());
        let container = Container::new(id, spec.name.clone(), to_vec2(spec.position), spec.capacity)
            .with_allowed_tags(spec.allowed_tags.iter().cloned());
        self.containers.insert(id, container);
        id
    }

    pub fn spawn_station(&mut self, spec: &StationSpec) -> StationId {
        let id = StationId(self.allocate());
        let position = to_vec2(spec.position);
        let footprint = spec.footprint.map_or(position, to_vec2);
        let mut station = Station::new(
            id,
            spec.name.clone(),
            spec.tag.clone(),
            position,
            footprint,
            spec.input_slots,
            spec.output_slots,
        );
        station.advertisements = spec.advertisements.clone();
        self.stations.insert(id, station);
        id
    }

    /// Creates an item at the placement. Fails without side effects when the
    /// placement cannot take it.
    pub fn spawn_item(&mut self, tag: &str, state: ItemState, placement: Placement) -> Option<ItemId> {
        match placement {
            Placement::Container(c) => {
                let container = self.containers.get(&c)?;
                if container.is_full() || !container.accepts(tag) {
                    return None;
                }
            }
            Placement::Slot { station, kind } => {
                self.stations.get(&station)?.first_free_slot(kind)?;
            }
            Placement::Ground(_) => {}
        }

        let id = ItemId(self.allocate());
        let mut item = Item::new(id, tag, state, ItemLocation::OnGround(Vec2::ZERO));
        let placed = match placement {
            Placement::Container(c) => self
                .containers
                .get_mut(&c)
                .is_some_and(|container| container.add(&mut item)),
            Placement::Slot { station, kind } => match self.stations.get_mut(&station) {
                Some(s) => match s.first_free_slot(kind) {
                    Some(index) => s.place(kind, index, &mut item),
                    None => false,
                },
                None => false,
            },
            Placement::Ground(pos) => {
                item.location = ItemLocation::OnGround(pos);
                true
            }
        };
        if !placed {
            return None;
        }
        self.items.insert(id, item);
        Some(id)
    }

    /// Removes an item from the world, detaching it from its owner.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        self.detach(id);
        self.items.remove(&id)
    }

    /// Removes a container; its items fall to the ground where it stood.
    pub fn remove_container(&mut self, id: ContainerId) -> Option<Container> {
        let container = self.containers.remove(&id)?;
        for item_id in container.items() {
            if let Some(item) = self.items.get_mut(item_id) {
                item.location = ItemLocation::OnGround(container.position);
            }
        }
        Some(container)
    }

    /// Removes a station; slotted items fall to the ground at its footprint.
    pub fn remove_station(&mut self, id: StationId) -> Option<Station> {
        let station = self.stations.remove(&id)?;
        for kind in [SlotKind::Input, SlotKind::Output] {
            for item_id in station.items_in(kind) {
                if let Some(item) = self.items.get_mut(&item_id) {
                    item.location = ItemLocation::OnGround(station.footprint);
                }
            }
        }
        Some(station)
    }

    // ------------------------------------------------------------------
    // Reservations
    // ------------------------------------------------------------------

    pub fn reserve_item(&mut self, id: ItemId, agent: AgentId) -> bool {
        self.items.get_mut(&id).is_some_and(|i| i.reserve(agent))
    }

    pub fn release_item(&mut self, id: ItemId) {
        if let Some(item) = self.items.get_mut(&id) {
            item.release();
        }
    }

    pub fn reserve_station(&mut self, id: StationId, agent: AgentId) -> bool {
        self.stations.get_mut(&id).is_some_and(|s| s.reserve(agent))
    }

    pub fn release_station(&mut self, id: StationId) {
        if let Some(station) = self.stations.get_mut(&id) {
            station.release();
        }
    }

    pub fn reserve_container(&mut self, id: ContainerId, agent: AgentId) -> bool {
        self.containers.get_mut(&id).is_some_and(|c| c.reserve(agent))
    }

    pub fn release_container(&mut self, id: ContainerId) {
        if let Some(container) = self.containers.get_mut(&id) {
            container.release();
        }
    }

    /// Clears every reservation held by `agent`. Returns how many were cleared.
    pub fn release_all_for(&mut self, agent: AgentId) -> usize {
        let mut cleared = 0;
        for item in self.items.values_mut() {
            if item.reserved_by() == Some(agent) {
                item.release();
                cleared += 1;
            }
        }
        for station in self.stations.values_mut() {
            if station.reserved_by() == Some(agent) {
                station.release();
                cleared += 1;
            }
        }
        for container in self.containers.values_mut() {
            if container.reserved_by() == Some(agent) {
                container.release();
                cleared += 1;
            }
        }
        cleared
    }

    // ------------------------------------------------------------------
    // Relocation
    // ------------------------------------------------------------------

    /// Clears the owner's back-reference to the item. The item keeps its
    /// stale location until the caller assigns a new one.
    fn detach(&mut self, id: ItemId) {
        let Some(location) = self.items.get(&id).map(|i| i.location) else {
            return;
        };
        match location {
            ItemLocation::InContainer(c) => {
                if let Some(container) = self.containers.get_mut(&c) {
                    container.remove(id);
                }
            }
            ItemLocation::InSlot {
                station,
                kind,
                index,
            } => {
                if let Some(s) = self.stations.get_mut(&station) {
                    s.take(kind, index);
                }
            }
            ItemLocation::InHand(_) | ItemLocation::OnGround(_) => {}
        }
    }

    /// Moves an item into the agent's hands and reserves it for them.
    ///
    /// Fails when the item is gone or held/reserved by someone else.
    pub fn pick_up(&mut self, id: ItemId, agent: AgentId) -> bool {
        let available = self
            .items
            .get(&id)
            .is_some_and(|item| item.is_available_to(agent));
        if !available {
            return false;
        }
        self.detach(id);
        match self.items.get_mut(&id) {
            Some(item) => {
                item.location = ItemLocation::InHand(agent);
                item.reserve(agent)
            }
            None => false,
        }
    }

    /// Puts an item on the ground and clears its reservation.
    pub fn drop_item(&mut self, id: ItemId, position: Vec2) -> bool {
        if !self.items.contains_key(&id) {
            return false;
        }
        self.detach(id);
        match self.items.get_mut(&id) {
            Some(item) => {
                item.location = ItemLocation::OnGround(position);
                item.release();
                true
            }
            None => false,
        }
    }

    /// Moves an item into the first free slot of a station row.
    pub fn place_in_station(&mut self, id: ItemId, station: StationId, kind: SlotKind) -> bool {
        let Some(index) = self.stations.get(&station).and_then(|s| s.first_free_slot(kind)) else {
            return false;
        };
        if !self.items.contains_key(&id) {
            return false;
        }
        self.detach(id);
        match (self.stations.get_mut(&station), self.items.get_mut(&id)) {
            (Some(s), Some(item)) => s.place(kind, index, item),
            _ => false,
        }
    }

    /// Takes a slotted item into the agent's hands.
    pub fn take_from_station(
        &mut self,
        station: StationId,
        kind: SlotKind,
        index: usize,
        agent: AgentId,
    ) -> Option<ItemId> {
        let id = self.stations.get_mut(&station)?.take(kind, index)?;
        if let Some(item) = self.items.get_mut(&id) {
            item.location = ItemLocation::InHand(agent);
            item.reserve(agent);
        }
        Some(id)
    }

    /// Stores an item into a container.
    pub fn store(&mut self, id: ItemId, container: ContainerId) -> bool {
        let fits = match (self.containers.get(&container), self.items.get(&id)) {
            (Some(c), Some(item)) => !c.is_full() && c.accepts(&item.tag) && !c.contains(id),
            _ => false,
        };
        if !fits {
            return false;
        }
        self.detach(id);
        match (self.containers.get_mut(&container), self.items.get_mut(&id)) {
            (Some(c), Some(item)) => c.add(item),
            _ => false,
        }
    }

    /// Rewrites an item's tag and state. Returns the previous tag.
    pub fn transform_item(&mut self, id: ItemId, tag: &str, state: Option<ItemState>) -> Option<String> {
        self.items.get_mut(&id).map(|item| item.transform(tag, state))
    }

    // ------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------

    /// Verifies ownership back-references. Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut owners: BTreeMap<ItemId, String> = BTreeMap::new();
        let mut claim = |item: ItemId, owner: String| -> Result<(), String> {
            if let Some(previous) = owners.insert(item, owner.clone()) {
                return Err(format!("{} referenced by both {} and {}", item, previous, owner));
            }
            Ok(())
        };

        for container in self.containers.values() {
            if container.len() > container.capacity {
                return Err(format!("{} over capacity", container.id));
            }
            for id in container.items() {
                claim(*id, container.id.to_string())?;
                match self.items.get(id).map(|i| i.location) {
                    Some(ItemLocation::InContainer(c)) if c == container.id => {}
                    _ => return Err(format!("{} in {} has a stale location", id, container.id)),
                }
            }
        }
        for station in self.stations.values() {
            for kind in [SlotKind::Input, SlotKind::Output] {
                for (index, slot) in station.slots(kind).iter().enumerate() {
                    let Some(id) = slot else { continue };
                    claim(*id, format!("{}/{}/{}", station.id, kind, index))?;
                    let expected = ItemLocation::InSlot {
                        station: station.id,
                        kind,
                        index,
                    };
                    if self.items.get(id).map(|i| i.location) != Some(expected) {
                        return Err(format!("{} in {} has a stale location", id, station.id));
                    }
                }
            }
        }
        for item in self.items.values() {
            let referenced = owners.contains_key(&item.id);
            let owned_location = matches!(
                item.location,
                ItemLocation::InContainer(_) | ItemLocation::InSlot { .. }
            );
            if owned_location && !referenced {
                return Err(format!("{} points at an owner that does not list it", item.id));
            }
            if let ItemLocation::InHand(holder) = item.location {
                if item.reserved_by() != Some(holder) {
                    return Err(format!("{} held by {} without reservation", item.id, holder));
                }
            }
        }
        Ok(())
    }
}

pub fn to_vec2(p: [f32; 2]) -> Vec2 {
    Vec2::new(p[0], p[1])
}
