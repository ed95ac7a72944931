//! Dirty-Attribute Cache
//!
//! Write-coalescing storage for server-side attributes. Every field is a
//! [`Dirty`] cell; an owner groups its cells into an [`AttributeCache`]
//! which turns the dirty ones into a single [`ValueList`] (mask + values),
//! the shape every X11 "create/change with attribute mask" request uses.

/// One cached attribute: last value written plus whether it still has to be sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dirty<T> {
    dirty: bool,
    value: T,
}

impl<T: Copy> Dirty<T> {
    /// A clean cell holding `value`
    pub fn new(value: T) -> Self {
        Self { dirty: false, value }
    }

    /// Store `value` and mark the cell dirty. Last write wins.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The pending value, if any, without clearing it
    pub fn pending(&self) -> Option<T> {
        self.dirty.then_some(self.value)
    }

    /// The pending value, if any, clearing the dirty bit
    pub fn take_if_dirty(&mut self) -> Option<T> {
        let pending = self.pending();
        self.dirty = false;
        pending
    }

    pub fn clear(&mut self) {
        self.dirty = false;
    }
}

/// Attribute mask plus one value per set bit, in ascending bit order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueList {
    mask: u32,
    values: Vec<u32>,
}

impl ValueList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one field. Bits must be pushed in ascending order, once each.
    pub fn push(&mut self, bit: u32, value: u32) {
        debug_assert_eq!(bit.count_ones(), 1, "field bit must be a single bit");
        debug_assert!(bit > self.mask, "fields must be pushed in ascending bit order");
        self.mask |= bit;
        self.values.push(value);
    }

    /// Append `value` under `bit` if present
    pub fn push_opt(&mut self, bit: u32, value: Option<u32>) {
        if let Some(value) = value {
            self.push(bit, value);
        }
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value stored under `bit`
    pub fn get(&self, bit: u32) -> Option<u32> {
        self.iter().find(|(b, _)| *b == bit).map(|(_, v)| v)
    }

    /// `(bit, value)` pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let bits = (0..32)
            .map(|shift| 1u32 << shift)
            .filter(move |bit| self.mask & bit != 0);
        bits.zip(self.values.iter().copied())
    }
}

/// A fixed set of [`Dirty`] fields that flush as one request
pub trait AttributeCache {
    /// Dirty fields only, visited in the declared field order
    fn pending(&self) -> ValueList;

    /// Clear every dirty bit
    fn mark_clean(&mut self);

    /// Number of fields waiting to be sent
    fn dirty_count(&self) -> usize {
        self.pending().len()
    }

    fn is_dirty(&self) -> bool {
        self.dirty_count() > 0
    }

    /// Pending request, clearing the cache. `None` when nothing is dirty.
    fn take_request(&mut self) -> Option<ValueList> {
        let request = self.pending();
        self.mark_clean();
        (!request.is_empty()).then_some(request)
    }
}
