//! Fixed-capacity object pools
//!
//! A [`Pool`] is a slot map whose backing storage is reserved once at
//! construction and never grows. Keys carry a generation counter, so a key
//! kept after its slot was freed (and possibly reused) resolves to nothing
//! instead of aliasing the new occupant.

use slotmap::{Key, SlotMap};

/// Pool errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Every slot is in use
    #[error("pool '{pool}' exhausted (capacity {capacity})")]
    Exhausted {
        /// Pool name
        pool: &'static str,
        /// Configured capacity
        capacity: usize,
    },
}

/// Fixed-capacity slot allocator with generational keys
pub struct Pool<K: Key, T> {
    name: &'static str,
    slots: SlotMap<K, T>,
    capacity: usize,
}

impl<K: Key, T> Pool<K, T> {
    /// Create a pool holding at most `capacity` live values
    pub fn new(name: &'static str, capacity: usize) -> Self {
        log::debug!("Creating pool '{name}' with capacity {capacity}");
        Self {
            name,
            slots: SlotMap::with_capacity_and_key(capacity),
            capacity,
        }
    }

    /// Store `value` in a free slot
    pub fn allocate(&mut self, value: T) -> Result<K, PoolError> {
        self.ensure_free_slot()?;
        Ok(self.slots.insert(value))
    }

    /// Store the value built from its own key
    pub fn allocate_with<F>(&mut self, build: F) -> Result<K, PoolError>
    where
        F: FnOnce(K) -> T,
    {
        self.ensure_free_slot()?;
        Ok(self.slots.insert_with_key(build))
    }

    /// Store a default-constructed value
    pub fn allocate_default(&mut self) -> Result<K, PoolError>
    where
        T: Default,
    {
        self.allocate(T::default())
    }

    /// Return the slot to the free list, yielding its value
    pub fn free(&mut self, key: K) -> Option<T> {
        self.slots.remove(key)
    }

    /// Borrow a live value
    pub fn get(&self, key: K) -> Option<&T> {
        self.slots.get(key)
    }

    /// Mutably borrow a live value
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots.get_mut(key)
    }

    /// Mutably borrow several distinct live values at once
    pub fn get_disjoint_mut<const N: usize>(&mut self, keys: [K; N]) -> Option<[&mut T; N]> {
        self.slots.get_disjoint_mut(keys)
    }

    /// Whether `key` refers to a live value
    pub fn contains(&self, key: K) -> bool {
        self.slots.contains_key(key)
    }

    /// Iterate over live values
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots.iter()
    }

    /// Iterate mutably over live values
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> {
        self.slots.iter_mut()
    }

    /// Keys of live values
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.slots.keys()
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool holds no live values
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of live values
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pool name used in diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Free every slot; all outstanding keys become stale
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    fn ensure_free_slot(&self) -> Result<(), PoolError> {
        if self.slots.len() >= self.capacity {
            log::warn!("Pool '{}' exhausted at {} slots", self.name, self.capacity);
            return Err(PoolError::Exhausted {
                pool: self.name,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl<K: Key, T> std::fmt::Debug for Pool<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("len", &self.slots.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
