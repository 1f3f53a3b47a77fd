//! Hash-consing unique table.
//!
//! Every value put into the table gets a stable index, and putting an equal
//! value again returns the index of the existing entry. Scheduling graphs
//! use this to memoize state identities: a progress vector reached along two
//! different paths resolves to the same node.

use std::ops::Index;

use crate::utils::MyHash;

/// Largest number of bucket bits the table grows to.
const MAX_BUCKET_BITS: usize = 24;

#[derive(Clone, Debug)]
struct Entry<T> {
    value: T,
    next: usize,
}

impl<T> Entry<T> {
    /// Create a new cell with the given value.
    fn new(value: T) -> Self {
        Self { value, next: 0 }
    }
}

#[derive(Clone, Debug)]
pub struct Table<T> {
    /// Index 0 is a sentinel, real entries start at 1.
    data: Vec<Entry<T>>,

    buckets: Vec<usize>,
    bucket_bits: usize,
    bitmask: u64,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let bucket_bits = bits.min(16);
        let buckets_size = 1 << bucket_bits;

        Self {
            data: vec![Entry::new(T::default())],
            buckets: vec![0; buckets_size],
            bucket_bits,
            bitmask: (buckets_size - 1) as u64,
        }
    }
}

impl<T> Table<T> {
    /// Get the number of stored values.
    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    /// Check whether the table holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    /// Get the index of the next cell in the same bucket.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }

    /// Iterate over all valid indices, in insertion order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        1..self.data.len()
    }

    fn add(&mut self, value: T) -> usize {
        self.data.push(Entry::new(value));
        self.data.len() - 1
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Find the index of a value equal to `value`, if present.
    pub fn find(&self, value: &T) -> Option<usize> {
        let mut index = self.buckets[self.bucket_index(value)];
        while index != 0 {
            if &self.data[index].value == value {
                return Some(index);
            }
            index = self.data[index].next;
        }
        None
    }

    /// Put a value into the table.
    ///
    /// Returns the index of the stored value and whether it was newly added.
    pub fn put(&mut self, value: T) -> (usize, bool) {
        if let Some(index) = self.find(&value) {
            return (index, false);
        }

        let bucket_index = self.bucket_index(&value);
        let i = self.add(value);
        // Prepend to the bucket chain.
        self.data[i].next = self.buckets[bucket_index];
        self.buckets[bucket_index] = i;

        if self.len() > 2 * self.buckets.len() && self.bucket_bits < MAX_BUCKET_BITS {
            self.grow();
        }

        (i, true)
    }

    /// Double the number of buckets and rebuild the chains.
    fn grow(&mut self) {
        self.bucket_bits += 1;
        let buckets_size = 1usize << self.bucket_bits;
        self.buckets = vec![0; buckets_size];
        self.bitmask = (buckets_size - 1) as u64;

        for i in 1..self.data.len() {
            let bucket_index = self.bucket_index(&self.data[i].value);
            self.data[i].next = self.buckets[bucket_index];
            self.buckets[bucket_index] = i;
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
