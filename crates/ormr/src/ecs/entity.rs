//! # Entity — Lightweight Identifiers for World Objects
//!
//! An [`Entity`] carries no data of its own: it is an `(index, generation)`
//! pair that the [`World`](super::world::World) resolves to component storage
//! on every access. Handles are `Copy` and freely passed around; only the
//! world can say whether one still points at anything.
//!
//! ## Generational Indices
//!
//! Slot indices are recycled after despawn, so a bare index would let a stale
//! handle silently refer to whatever entity reused the slot. Each slot
//! therefore carries a **generation** counter that is bumped when the slot is
//! freed. A handle is live only while its generation matches the slot's
//! current generation, so stale handles fail every lookup instead of aliasing
//! the new occupant:
//!
//! ```text
//! despawn(3v0)           slot 3 advances to generation 1
//! handle 3v0 is stale    every lookup now returns None / false
//! allocate() → 3v1       the recycled slot, under its new generation
//! ```
//!
//! A slot whose generation counter reaches `u32::MAX` is retired: it is never
//! returned to the freelist, so the counter cannot wrap and resurrect handles
//! from four billion despawns ago.

use std::fmt;

/// A handle to an entity in the [`World`](super::world::World).
///
/// Two handles are equal only if both index and generation match. A handle is
/// only meaningful to the world that minted it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// Slot index. Useful for diagnostics, not for identity comparisons.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was minted.
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Pack the handle into a single 64-bit value (generation in the high
    /// half). Round-trips through [`Entity::from_bits`].
    pub fn to_bits(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Reconstruct a handle from [`Entity::to_bits`].
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Allocates and recycles entity handles.
///
/// Three pieces of state: `generations` remembers the current generation of
/// every slot ever handed out, `free_list` holds the slots waiting to be
/// reused, and `len` is the high-water mark — the index a brand-new slot
/// would get. Allocation prefers the free list; despawned slots come back
/// under a higher generation.
pub(crate) struct EntityAllocator {
    /// Current generation of each slot, indexed by `Entity::index`.
    generations: Vec<u32>,
    /// Freed slots available for reuse.
    free_list: Vec<u32>,
    /// Total slots ever allocated; also the next fresh index.
    len: u32,
    /// Slots whose generation counter saturated and were taken out of
    /// circulation.
    retired: u32,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            retired: 0,
        }
    }

    /// Mint a handle, reusing a freed slot when one is available.
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped when the slot was freed.
            let generation = self.generations[index as usize];
            Entity { index, generation }
        } else {
            let index = self.len;
            self.len += 1;
            self.generations.push(0);
            Entity { index, generation: 0 }
        }
    }

    /// Free a handle's slot, making all copies of the handle stale.
    ///
    /// Returns `false` if the handle was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        if idx < self.generations.len() && self.generations[idx] == entity.generation {
            self.generations[idx] += 1;
            if self.generations[idx] == u32::MAX {
                // Out of generations: retire the slot instead of recycling it.
                self.retired += 1;
            } else {
                self.free_list.push(entity.index);
            }
            true
        } else {
            false
        }
    }

    /// Whether the handle still refers to a live entity.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        idx < self.generations.len() && self.generations[idx] == entity.generation
    }

    /// Number of currently live entities.
    pub fn alive_count(&self) -> usize {
        self.len as usize - self.free_list.len() - self.retired as usize
    }

    /// Forget every slot. All previously issued handles become stale because
    /// their index no longer exists.
    pub fn clear(&mut self) {
        self.generations.clear();
        self.free_list.clear();
        self.len = 0;
        self.retired = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_sequential() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        let e1 = alloc.allocate();
        assert_eq!(e0.index, 0);
        assert_eq!(e1.index, 1);
        assert_eq!(e0.generation, 0);
        assert_eq!(e1.generation, 0);
        assert_ne!(e0, e1);
    }

    #[test]
    fn recycle_bumps_generation() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        assert!(alloc.deallocate(e0));
        let reused = alloc.allocate();
        assert_eq!(reused.index, 0);
        assert!(reused.generation > e0.generation);
        assert_ne!(reused, e0);
    }

    #[test]
    fn stale_handle_detected() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        assert!(alloc.is_alive(e0));
        alloc.deallocate(e0);
        assert!(!alloc.is_alive(e0));
    }

    #[test]
    fn double_free_returns_false() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        assert!(alloc.deallocate(e0));
        assert!(!alloc.deallocate(e0));
    }

    #[test]
    fn alive_count_tracks_lifecycle() {
        let mut alloc = EntityAllocator::new();
        assert_eq!(alloc.alive_count(), 0);
        let e0 = alloc.allocate();
        let _e1 = alloc.allocate();
        assert_eq!(alloc.alive_count(), 2);
        alloc.deallocate(e0);
        assert_eq!(alloc.alive_count(), 1);
    }

    #[test]
    fn clear_invalidates_all_handles() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        let e1 = alloc.allocate();
        alloc.clear();
        assert!(!alloc.is_alive(e0));
        assert!(!alloc.is_alive(e1));
        assert_eq!(alloc.alive_count(), 0);
        // Fresh allocations start over.
        let e = alloc.allocate();
        assert_eq!(e.index, 0);
        assert_eq!(e.generation, 0);
    }

    #[test]
    fn bits_round_trip() {
        let e = Entity { index: 42, generation: 7 };
        assert_eq!(Entity::from_bits(e.to_bits()), e);
        let other = Entity { index: 42, generation: 8 };
        assert_ne!(e.to_bits(), other.to_bits());
    }
}
