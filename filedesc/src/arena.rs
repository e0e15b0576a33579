//! Pre-sized storage for the declarations of one file.
//!
//! The total count of each declaration kind is computed before seeding
//! starts. Slots are handed out in contiguous ranges and addressed by index,
//! so a child may record its parent's slot while siblings are still being
//! allocated. The backing vector never grows past the expected count.

use std::ops::Range;

use crate::utils::mismatch;

pub(crate) struct Arena<T> {
    kind: &'static str,
    expected: usize,
    slots: Vec<T>,
}

impl<T: Default> Arena<T> {
    pub fn with_capacity(kind: &'static str, expected: usize) -> Arena<T> {
        Arena {
            kind,
            expected,
            slots: Vec::with_capacity(expected),
        }
    }

    /// Reserves the next `n` slots and returns their indices.
    pub fn alloc(&mut self, path: &str, n: usize) -> Range<usize> {
        let start = self.slots.len();
        let end = start + n;
        if end > self.expected {
            mismatch(
                path,
                format_args!("{} arena overflow: {} allocated, {} expected", self.kind, end, self.expected),
            );
        }
        self.slots.resize_with(end, T::default);
        start..end
    }

    pub fn get(&self, index: usize) -> &T {
        &self.slots[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut T {
        &mut self.slots[index]
    }

    /// Checks that every expected slot was handed out.
    pub fn finish(self, path: &str) -> Box<[T]> {
        if self.slots.len() != self.expected {
            mismatch(
                path,
                format_args!(
                    "mismatching cardinality: {} {} allocated, {} expected",
                    self.slots.len(),
                    self.kind,
                    self.expected
                ),
            );
        }
        self.slots.into_boxed_slice()
    }
}
