//! Slot arena backing the reference-counting collector
//!
//! Layout:
//! ```text
//! slots: [ Live(gen 0) | Free(gen 1) -> 3 | Live(gen 0) | Free(gen 2) -> end ]
//!                          ^ free_head
//! ```
//!
//! A [`Handle`] names a slot by index and generation. Freeing a slot bumps
//! its generation, so any handle still pointing at it is detected as stale
//! at lookup time instead of aliasing whatever is allocated there next.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::HeapError;

/// Reference counter stored in every live block header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counter(u32);

impl Counter {
    #[inline]
    pub const fn new(count: u32) -> Self {
        Counter(count)
    }

    #[inline]
    pub fn inc(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    #[inline]
    pub fn dec(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Per-block bookkeeping kept next to the stored value
#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    pub counter: Counter,
}

impl BlockHeader {
    #[inline]
    pub const fn new(count: u32) -> Self {
        BlockHeader {
            counter: Counter::new(count),
        }
    }

    /// A block with count 0 was never registered with the collector
    #[inline]
    pub const fn is_tracked(&self) -> bool {
        self.counter.get() != 0
    }
}

/// Generation-checked reference into a [`Heap`]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[inline]
    const fn new(index: u32, generation: u32) -> Self {
        Handle {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the slot had when this handle was issued
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

enum SlotState<T> {
    Live { header: BlockHeader, value: T },
    Free { next_free: Option<u32> },
}

struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

/// Arena of reusable slots
pub struct Heap<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    live: usize,
}

impl<T> Heap<T> {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a heap with room for `capacity` blocks before reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Heap {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            live: 0,
        }
    }

    /// Number of live blocks
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of slots waiting on the free list
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.slots.len() - self.live
    }

    /// Slots the backing vector can hold without reallocating
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Store `value` with the given initial count, reusing a freed slot if any
    pub fn alloc(&mut self, value: T, count: u32) -> Handle<T> {
        let state = SlotState::Live {
            header: BlockHeader::new(count),
            value,
        };
        self.live += 1;

        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            self.free_head = match slot.state {
                SlotState::Free { next_free } => next_free,
                SlotState::Live { .. } => unreachable!("free list points at a live slot"),
            };
            slot.state = state;
            return Handle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state,
        });
        Handle::new(index, 0)
    }

    /// Release the slot and hand back its value
    ///
    /// Returns None if the handle is stale.
    pub fn free(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let previous = std::mem::replace(
            &mut slot.state,
            SlotState::Free {
                next_free: self.free_head,
            },
        );
        match previous {
            SlotState::Live { value, .. } => {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_head = Some(handle.index);
                self.live -= 1;
                Some(value)
            }
            SlotState::Free { next_free } => {
                // Generation matched but the slot was already free; undo.
                slot.state = SlotState::Free { next_free };
                None
            }
        }
    }

    /// Check whether a handle still names a live block
    #[inline]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.block(handle).is_ok()
    }

    fn block(&self, handle: Handle<T>) -> Result<(&BlockHeader, &T), HeapError> {
        let slot = self
            .slots
            .get(handle.index as usize)
            .ok_or(HeapError::OutOfBounds {
                index: handle.index,
            })?;
        let current = slot.generation == handle.generation;
        match &slot.state {
            SlotState::Live { header, value } if current => Ok((header, value)),
            _ => Err(HeapError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            }),
        }
    }

    fn block_mut(&mut self, handle: Handle<T>) -> Result<(&mut BlockHeader, &mut T), HeapError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .ok_or(HeapError::OutOfBounds {
                index: handle.index,
            })?;
        let current = slot.generation == handle.generation;
        match &mut slot.state {
            SlotState::Live { header, value } if current => Ok((header, value)),
            _ => Err(HeapError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            }),
        }
    }

    /// Borrow the value behind a handle
    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Result<&T, HeapError> {
        self.block(handle).map(|(_, value)| value)
    }

    /// Mutably borrow the value behind a handle
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, HeapError> {
        self.block_mut(handle).map(|(_, value)| value)
    }

    /// Borrow the block header
    #[inline]
    pub fn header(&self, handle: Handle<T>) -> Result<&BlockHeader, HeapError> {
        self.block(handle).map(|(header, _)| header)
    }

    /// Mutably borrow the block header
    #[inline]
    pub fn header_mut(&mut self, handle: Handle<T>) -> Result<&mut BlockHeader, HeapError> {
        self.block_mut(handle).map(|(header, _)| header)
    }

    /// Iterator over all live blocks
    pub fn iter_blocks(&self) -> BlockIterator<'_, T> {
        BlockIterator {
            heap: self,
            index: 0,
        }
    }
}

impl<T> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over live blocks in slot order
pub struct BlockIterator<'a, T> {
    heap: &'a Heap<T>,
    index: usize,
}

impl<'a, T> Iterator for BlockIterator<'a, T> {
    type Item = (Handle<T>, &'a BlockHeader, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(slot) = self.heap.slots.get(self.index) {
            let index = self.index as u32;
            self.index += 1;
            if let SlotState::Live { header, value } = &slot.state {
                return Some((Handle::new(index, slot.generation), header, value));
            }
        }
        None
    }
}
