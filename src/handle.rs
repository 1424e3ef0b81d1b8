//! Typed handles to engine-owned objects
//!
//! Callers refer to ciphertexts, plaintexts, polynomials and transforms by
//! small integer handles. Freed indices are reused smallest-first, and every
//! allocation carries a fresh generation so a handle to a reused slot no
//! longer resolves.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::{EngineError, Result};

/// Reference to an object of type `T` held by a [`HandleAllocator`]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index, the integer id exposed to callers
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
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

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Allocator mapping handles to owned objects
#[derive(Debug)]
pub struct HandleAllocator<T> {
    kind: &'static str,
    slots: Vec<Slot<T>>,
    free: BinaryHeap<Reverse<u32>>,
    next_generation: u32,
    live: usize,
}

impl<T> HandleAllocator<T> {
    /// `kind` names the object type in `NotFound` errors
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: BinaryHeap::new(),
            next_generation: 0,
            live: 0,
        }
    }

    /// Store `value` under the smallest free index
    pub fn allocate(&mut self, value: T) -> Handle<T> {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.live += 1;

        if let Some(Reverse(index)) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = generation;
            slot.value = Some(value);
            return Handle::new(index, generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation,
            value: Some(value),
        });
        Handle::new(index, generation)
    }

    fn not_found(&self, handle: Handle<T>) -> EngineError {
        EngineError::NotFound {
            kind: self.kind,
            index: handle.index,
        }
    }

    fn slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle<T>) -> Result<&T> {
        self.slot(handle)
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| self.not_found(handle))
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T> {
        if !self.contains(handle) {
            return Err(self.not_found(handle));
        }
        self.slots[handle.index as usize]
            .value
            .as_mut()
            .ok_or_else(|| EngineError::NotFound {
                kind: self.kind,
                index: handle.index,
            })
    }

    /// Remove the object; unknown or stale handles are ignored
    pub fn release(&mut self, handle: Handle<T>) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        let value = self.slots[handle.index as usize].value.take();
        self.free.push(Reverse(handle.index));
        self.live -= 1;
        value
    }

    /// Drop every object. Indices restart at 0; earlier handles stay stale.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }

    /// Handles of every live object, by ascending index
    pub fn live_handles(&self) -> Vec<Handle<T>> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(i, slot)| Handle::new(i as u32, slot.generation))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
