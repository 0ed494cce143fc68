//! Actor identity and draw order
//!
//! The [`ActorDirectory`] is the single source of truth for which actors
//! exist. It allocates ids and keeps every actor's [`DrawOrder`], plus the
//! parent-entry and ghost side tables.
//!
//! ## Draw order
//!
//! A draw order is a `(value, tie_break)` pair compared lexicographically.
//! Inserting "in front of" or "behind" something does not renumber the
//! other actors. Instead the new actor copies the neighbor's value and takes
//! a tie-break from a shared counter that only decreases. "In front"
//! uses `+t`, "behind" uses `-t`. A later insert therefore gets a smaller
//! magnitude and lands closer to its neighbor than any earlier insert
//! relative to the same neighbor.
//!
//! The relation only holds against a neighbor whose tie-break is zero, so a
//! stale neighbor forces [`ActorDirectory::ensure_draw_order_sort`] first.
//! That pass sorts, compacts values to `0..n` and resets all tie-breaks.

use crate::identity::ActorId;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Position of an actor in draw order (back to front)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DrawOrder {
    pub value: i32,
    pub tie_break: i32,
}

impl DrawOrder {
    /// Sentinel behind every real actor
    pub const BACK: DrawOrder = DrawOrder {
        value: i32::MIN,
        tie_break: 0,
    };

    /// Sentinel in front of every real actor
    pub const FRONT: DrawOrder = DrawOrder {
        value: i32::MAX,
        tie_break: 0,
    };

    pub fn new(value: i32, tie_break: i32) -> Self {
        Self { value, tie_break }
    }
}

/// Where a new (or moved) actor goes in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawOrderParams {
    #[default]
    FrontOfAll,
    BehindAll,
    FrontOfActor(ActorId),
    BehindActor(ActorId),
    /// In front of the actor currently at compacted position `value`
    FrontOfValue(i32),
    /// Behind the actor currently at compacted position `value`
    BehindValue(i32),
}

/// Request to create an actor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorDesc {
    /// Honored only if the id is free; otherwise a fresh id is allocated
    pub requested_id: Option<ActorId>,
    pub parent_entry_id: Option<String>,
    pub is_ghost: bool,
    pub draw_order: DrawOrderParams,
}

impl ActorDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: ActorId) -> Self {
        self.requested_id = Some(id);
        self
    }

    pub fn with_parent_entry(mut self, entry_id: impl Into<String>) -> Self {
        self.parent_entry_id = Some(entry_id.into());
        self
    }

    pub fn ghost(mut self) -> Self {
        self.is_ghost = true;
        self
    }

    pub fn with_draw_order(mut self, params: DrawOrderParams) -> Self {
        self.draw_order = params;
        self
    }
}

const TIE_BREAK_START: i32 = i32::MAX - 1;

/// Default counter level at which tie-breaks are reclaimed
pub const DEFAULT_TIE_BREAK_HEADROOM: i32 = 1024;

/// Registry of live actors
#[derive(Debug, Clone)]
pub struct ActorDirectory {
    orders: IndexMap<ActorId, DrawOrder>,
    parent_entries: IndexMap<ActorId, String>,
    ghosts: IndexSet<ActorId>,
    next_id: u32,
    next_tie_break: i32,
    headroom: i32,
    /// Materialized back-to-front sequence, valid when `needs_sort` is false
    sorted: Vec<ActorId>,
    needs_sort: bool,
}

impl Default for ActorDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorDirectory {
    pub fn new() -> Self {
        Self::with_headroom(DEFAULT_TIE_BREAK_HEADROOM)
    }

    /// Create a directory that reclaims tie-breaks once the counter falls to `headroom`
    pub fn with_headroom(headroom: i32) -> Self {
        Self {
            orders: IndexMap::new(),
            parent_entries: IndexMap::new(),
            ghosts: IndexSet::new(),
            next_id: 1,
            next_tie_break: TIE_BREAK_START,
            headroom: headroom.clamp(1, TIE_BREAK_START),
            sorted: Vec::new(),
            needs_sort: false,
        }
    }

    /// Create an actor and return its id
    pub fn add_actor(&mut self, desc: ActorDesc) -> ActorId {
        self.reclaim_tie_breaks_if_low();

        let id = match desc.requested_id {
            Some(requested) if !self.has_actor(requested) => {
                self.next_id = self.next_id.max(requested.0.saturating_add(1));
                requested
            }
            requested => {
                let id = self.allocate_id();
                if let Some(requested) = requested {
                    tracing::debug!(requested = %requested, actor = %id, "requested actor id in use, allocated a fresh one");
                }
                id
            }
        };

        let order = self.resolve_draw_order(desc.draw_order, None);
        self.orders.insert(id, order);
        self.needs_sort = true;

        if let Some(entry_id) = desc.parent_entry_id {
            self.parent_entries.insert(id, entry_id);
        }
        if desc.is_ghost {
            self.ghosts.insert(id);
        }

        tracing::debug!(actor = %id, ghost = desc.is_ghost, ?order, "actor added");
        id
    }

    /// Free an actor's identity. Returns `false` if it was not live.
    ///
    /// Does not renumber the remaining actors.
    pub fn remove_actor(&mut self, id: ActorId) -> bool {
        if self.orders.shift_remove(&id).is_none() {
            return false;
        }
        self.parent_entries.shift_remove(&id);
        self.ghosts.shift_remove(&id);
        self.sorted.retain(|other| *other != id);
        tracing::debug!(actor = %id, "actor removed");
        true
    }

    /// Reposition an existing actor. Returns `false` if it is not live.
    ///
    /// Requests relative to the actor itself leave it where it is.
    pub fn move_actor(&mut self, id: ActorId, params: DrawOrderParams) -> bool {
        if !self.has_actor(id) {
            return false;
        }
        if let DrawOrderParams::FrontOfActor(target) | DrawOrderParams::BehindActor(target) = params {
            if target == id {
                return true;
            }
        }
        self.reclaim_tie_breaks_if_low();
        let order = self.resolve_draw_order(params, Some(id));
        self.orders.insert(id, order);
        self.needs_sort = true;
        true
    }

    pub fn has_actor(&self, id: ActorId) -> bool {
        self.orders.contains_key(&id)
    }

    /// Number of live actors, ghosts included
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn draw_order(&self, id: ActorId) -> Option<DrawOrder> {
        self.orders.get(&id).copied()
    }

    pub fn parent_entry_id(&self, id: ActorId) -> Option<&str> {
        self.parent_entries.get(&id).map(String::as_str)
    }

    pub fn set_parent_entry_id(&mut self, id: ActorId, entry_id: Option<String>) {
        if !self.has_actor(id) {
            return;
        }
        match entry_id {
            Some(entry_id) => {
                self.parent_entries.insert(id, entry_id);
            }
            None => {
                self.parent_entries.shift_remove(&id);
            }
        }
    }

    pub fn is_ghost(&self, id: ActorId) -> bool {
        self.ghosts.contains(&id)
    }

    /// Non-ghost actor ids in creation order
    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.orders
            .keys()
            .copied()
            .filter(move |id| !self.ghosts.contains(id))
    }

    /// Ghost actor ids in creation order
    pub fn ghost_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.ghosts.iter().copied()
    }

    /// Sort and compact draw orders if anything changed since the last pass
    ///
    /// Afterwards values are `0..n` in back-to-front order and every
    /// tie-break is zero.
    pub fn ensure_draw_order_sort(&mut self) {
        if !self.needs_sort {
            return;
        }
        let mut ids: Vec<ActorId> = self.orders.keys().copied().collect();
        ids.sort_by_key(|id| (self.orders[id], *id));
        for (index, id) in ids.iter().enumerate() {
            if let Some(order) = self.orders.get_mut(id) {
                *order = DrawOrder::new(index as i32, 0);
            }
        }
        self.sorted = ids;
        self.needs_sort = false;
    }

    /// Non-ghost actors back to front
    pub fn actors_by_draw_order(&mut self) -> Vec<ActorId> {
        self.ensure_draw_order_sort();
        self.sorted
            .iter()
            .copied()
            .filter(|id| !self.ghosts.contains(id))
            .collect()
    }

    /// Visit non-ghost actors back to front
    ///
    /// Iterates a snapshot, so `f` never observes a half-updated sequence.
    pub fn for_each_actor_by_draw_order(&mut self, mut f: impl FnMut(ActorId)) {
        for id in self.actors_by_draw_order() {
            f(id);
        }
    }

    /// All actors (ghosts included) back to front, without mutating
    ///
    /// Borrows the materialized sequence when it is current and sorts a
    /// copy otherwise.
    pub fn ordered_ids(&self) -> Cow<'_, [ActorId]> {
        if !self.needs_sort {
            return Cow::Borrowed(&self.sorted[..]);
        }
        let mut ids: Vec<ActorId> = self.orders.keys().copied().collect();
        ids.sort_by_key(|id| (self.orders[id], *id));
        Cow::Owned(ids)
    }

    /// The non-ghost actor at back-to-front position `index`
    pub fn index_actor(&mut self, index: usize) -> Option<ActorId> {
        self.actors_by_draw_order().get(index).copied()
    }

    /// Back-to-front position of a non-ghost actor
    pub fn position_of(&mut self, id: ActorId) -> Option<usize> {
        if self.is_ghost(id) {
            return None;
        }
        self.actors_by_draw_order().iter().position(|other| *other == id)
    }

    /// Remove every actor
    ///
    /// Id allocation continues where it left off, so an id handed out before
    /// the clear is never handed out again unless explicitly requested.
    pub fn clear(&mut self) {
        let next_id = self.next_id;
        *self = Self::with_headroom(self.headroom);
        self.next_id = next_id;
    }

    fn allocate_id(&mut self) -> ActorId {
        while self.orders.contains_key(&ActorId(self.next_id)) {
            self.next_id = self.next_id.saturating_add(1);
        }
        let id = ActorId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn take_tie_break(&mut self) -> i32 {
        let tie_break = self.next_tie_break;
        self.next_tie_break -= 1;
        tie_break
    }

    fn reclaim_tie_breaks_if_low(&mut self) {
        if self.next_tie_break > self.headroom {
            return;
        }
        // Compaction zeroes every tie-break, so the whole range is free again
        self.needs_sort = true;
        self.ensure_draw_order_sort();
        self.next_tie_break = TIE_BREAK_START;
        tracing::debug!(actors = self.orders.len(), "draw order tie-breaks reclaimed");
    }

    /// Compute a draw order for `params`. `moving` is excluded from the
    /// compaction used to resolve value-relative requests.
    fn resolve_draw_order(&mut self, params: DrawOrderParams, moving: Option<ActorId>) -> DrawOrder {
        match params {
            DrawOrderParams::FrontOfAll => {
                DrawOrder::new(DrawOrder::FRONT.value, -self.take_tie_break())
            }
            DrawOrderParams::BehindAll => {
                DrawOrder::new(DrawOrder::BACK.value, self.take_tie_break())
            }
            DrawOrderParams::FrontOfActor(target) | DrawOrderParams::BehindActor(target) => {
                let front = matches!(params, DrawOrderParams::FrontOfActor(_));
                let Some(mut neighbor) = self.draw_order(target) else {
                    tracing::debug!(target = %target, "draw order target missing, placing in front");
                    return self.resolve_draw_order(DrawOrderParams::FrontOfAll, moving);
                };
                if neighbor.tie_break != 0 {
                    self.ensure_draw_order_sort();
                    neighbor = self.draw_order(target).unwrap_or(neighbor);
                }
                let tie_break = self.take_tie_break();
                DrawOrder::new(neighbor.value, if front { tie_break } else { -tie_break })
            }
            DrawOrderParams::FrontOfValue(value) | DrawOrderParams::BehindValue(value) => {
                let front = matches!(params, DrawOrderParams::FrontOfValue(_));
                if let Some(moving) = moving {
                    // Compact the others so `value` indexes the sequence without the mover
                    self.orders.shift_remove(&moving);
                    self.needs_sort = true;
                }
                self.ensure_draw_order_sort();
                let tie_break = self.take_tie_break();
                DrawOrder::new(value, if front { tie_break } else { -tie_break })
            }
        }
    }
}
