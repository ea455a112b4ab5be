//! Reference-counting collector
//!
//! Every block carries a counter:
//! 1. `allocate` stores a value with count 1
//! 2. `inc_counter` / `dec_counter` adjust it
//! 3. when a count reaches 0 the block is freed, and every handle the
//!    freed value holds (reported through [`Trace`]) is decremented in turn
//!
//! Step 3 runs off a worklist, so releasing a long chain of nested arrays
//! does not grow the native stack.

use std::fmt;

use log::{debug, trace, warn};

use super::HeapError;
use super::allocator::{BlockIterator, Handle, Heap};

/// Values that can hold handles into the collector that stores them
pub trait Trace: Sized {
    /// Push every handle this value keeps alive onto `edges`
    fn trace(&self, _edges: &mut Vec<Handle<Self>>) {}
}

macro_rules! impl_leaf_trace {
    ($($ty:ty),* $(,)?) => {
        $(impl Trace for $ty {})*
    };
}

impl_leaf_trace!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, bool, char, String);

/// Reference-counted store for values of type `T`
pub struct GarbageCollector<T: Trace> {
    heap: Heap<T>,
}

impl<T: Trace> GarbageCollector<T> {
    /// Create an empty collector
    pub fn new() -> Self {
        GarbageCollector { heap: Heap::new() }
    }

    /// Create a collector with room for `capacity` values before growing
    pub fn with_capacity(capacity: usize) -> Self {
        GarbageCollector {
            heap: Heap::with_capacity(capacity),
        }
    }

    /// Allocate a default value with count 1
    pub fn allocate(&mut self) -> Handle<T>
    where
        T: Default,
    {
        self.allocate_with(T::default())
    }

    /// Allocate `value` with count 1
    pub fn allocate_with(&mut self, value: T) -> Handle<T> {
        let handle = self.heap.alloc(value, 1);
        trace!("gc: allocate {handle:?}");
        handle
    }

    /// Store a value the collector does not yet count (count 0)
    ///
    /// The first `inc_counter` starts tracking it at 1; `dec_counter` on it
    /// is a no-op until then.
    pub fn insert_untracked(&mut self, value: T) -> Handle<T> {
        self.heap.alloc(value, 0)
    }

    /// Increment the count of a live block
    ///
    /// An untracked block is registered at count 1. A stale handle is ignored.
    pub fn inc_counter(&mut self, handle: Handle<T>) {
        match self.heap.header_mut(handle) {
            Ok(header) => {
                if !header.is_tracked() {
                    debug!("gc: inc_counter registered untracked {handle:?}");
                }
                header.counter.inc();
            }
            Err(err) => warn!("gc: inc_counter ignored: {err}"),
        }
    }

    /// Decrement the count of a live block, freeing it at zero
    ///
    /// Stale handles and untracked blocks are left alone.
    pub fn dec_counter(&mut self, handle: Handle<T>) {
        let mut pending = vec![handle];

        while let Some(handle) = pending.pop() {
            let header = match self.heap.header_mut(handle) {
                Ok(header) => header,
                Err(err) => {
                    warn!("gc: dec_counter ignored: {err}");
                    continue;
                }
            };
            if !header.is_tracked() {
                continue;
            }

            header.counter.dec();
            if header.counter.get() == 0 {
                if let Some(value) = self.heap.free(handle) {
                    trace!("gc: free {handle:?}");
                    value.trace(&mut pending);
                }
            }
        }
    }

    /// Current count of a block, 0 if stale or untracked
    pub fn get_counter(&self, handle: Handle<T>) -> u32 {
        self.heap
            .header(handle)
            .map(|header| header.counter.get())
            .unwrap_or(0)
    }

    /// Release every handle `value` holds, as if it had just been freed
    pub fn release(&mut self, value: T) {
        let mut edges = Vec::new();
        value.trace(&mut edges);
        for edge in edges {
            self.dec_counter(edge);
        }
    }

    /// Increment every handle `value` holds
    pub fn retain_edges(&mut self, value: &T) {
        let mut edges = Vec::new();
        value.trace(&mut edges);
        for edge in edges {
            self.inc_counter(edge);
        }
    }

    /// Borrow a live value
    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Result<&T, HeapError> {
        self.heap.get(handle)
    }

    /// Mutably borrow a live value
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, HeapError> {
        self.heap.get_mut(handle)
    }

    /// Check whether a handle still names a live value
    #[inline]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.heap.contains(handle)
    }

    /// Run `f` on the value behind `handle` while also handing it the collector
    ///
    /// The value is moved out of its slot for the duration of the call, so
    /// a lookup of `handle` from inside `f` sees `T::default()`. If `f`
    /// frees the slot, the value is released instead of put back.
    pub fn with_mut<R>(
        &mut self,
        handle: Handle<T>,
        f: impl FnOnce(&mut T, &mut Self) -> R,
    ) -> Result<R, HeapError>
    where
        T: Default,
    {
        let mut value = std::mem::take(self.heap.get_mut(handle)?);
        let result = f(&mut value, self);
        match self.heap.get_mut(handle) {
            Ok(slot) => *slot = value,
            Err(_) => self.release(value),
        }
        Ok(result)
    }

    /// Number of live values
    #[inline]
    pub fn get_variables_count(&self) -> usize {
        self.heap.live()
    }

    /// Underlying arena
    #[inline]
    pub fn heap(&self) -> &Heap<T> {
        &self.heap
    }

    /// Iterator over live values with their counts
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, u32, &T)> + '_ {
        let blocks: BlockIterator<'_, T> = self.heap.iter_blocks();
        blocks.map(|(handle, header, value)| (handle, header.counter.get(), value))
    }
}

impl<T: Trace + fmt::Debug> GarbageCollector<T> {
    /// Human-readable listing of every live block
    pub fn dump(&self) -> String {
        let mut res = String::new();
        for (handle, count, value) in self.iter() {
            res.push_str(&format!(
                "[ handle: {handle:?} counter: {count} data: {value:?} ]\n"
            ));
        }
        res
    }
}

impl<T: Trace> Default for GarbageCollector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Trace> Drop for GarbageCollector<T> {
    fn drop(&mut self) {
        let live = self.heap.live();
        if live > 0 {
            debug!("gc: dropping collector with {live} live values");
        }
    }
}
