//! Container Components
//!
//! Bounded, tag-filtered storage for items.

use bevy_math::Vec2;

use super::ids::{AgentId, ContainerId, ItemId};
use super::item::{Item, ItemLocation};

/// Bounded item storage such as a fridge or cupboard.
#[derive(Debug, Clone)]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    /// Where an agent stands to use the container
    pub position: Vec2,
    pub capacity: usize,
    /// Accepted tags; empty accepts everything
    pub allowed_tags: Vec<String>,
    items: Vec<ItemId>,
    reserved_by: Option<AgentId>,
}

impl Container {
    pub fn new(id: ContainerId, name: impl Into<String>, position: Vec2, capacity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            capacity,
            allowed_tags: Vec::new(),
            items: Vec::new(),
            reserved_by: None,
        }
    }

    pub fn with_allowed_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    pub fn accepts(&self, tag: &str) -> bool {
        self.allowed_tags.is_empty() || self.allowed_tags.iter().any(|t| t == tag)
    }

    /// Stores the item and points its location here.
    ///
    /// Fails when full, when the tag is disallowed, or when already stored.
    pub fn add(&mut self, item: &mut Item) -> bool {
        if self.is_full() || !self.accepts(&item.tag) || self.contains(item.id) {
            return false;
        }
        self.items.push(item.id);
        item.location = ItemLocation::InContainer(self.id);
        true
    }

    /// Forgets the item. The caller relocates it.
    pub fn remove(&mut self, item: ItemId) -> bool {
        match self.items.iter().position(|id| *id == item) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn reserved_by(&self) -> Option<AgentId> {
        self.reserved_by
    }

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
