//! Fixed-capacity slot pool with bitmap occupancy.
//!
//! A [`SlotPool`] pre-allocates every element up front in one boxed slice and
//! tracks which slots are live with one bit per slot, packed into `u32` words.
//! Allocation scans the words in order and claims the lowest clear bit of the
//! first word that has one, so the cost is proportional to the number of
//! saturated words in front of it, and a freed slot is handed out again before
//! any higher free slot.
//!
//! Slots never move. The address of a live element is stable until it is
//! removed, at which point the slot is reset to `T::default()` so the next
//! occupant starts from a zeroed state.

use std::fmt;
use std::mem;

/// Number of slots tracked by one bitmap word.
const WORD_BITS: usize = 32;
const SHIFT: usize = 5;
const MASK: usize = WORD_BITS - 1;

/// Smallest capacity a pool is created with.
pub const MIN_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// SlotId
// ---------------------------------------------------------------------------

/// Stable index of a slot within a [`SlotPool`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    /// Construct a `SlotId` from a raw slot index.
    #[inline]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn from_parts(word: usize, bit: u32) -> Self {
        Self(((word << SHIFT) as u32) | bit)
    }

    #[inline]
    fn word(self) -> usize {
        self.index() >> SHIFT
    }

    #[inline]
    fn mask(self) -> u32 {
        1 << (self.index() & MASK)
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BitScan -- forward walk over set bits
// ---------------------------------------------------------------------------

/// Position of a forward scan over the occupancy bitmap.
#[derive(Debug, Clone, Copy, Default)]
struct BitScan {
    word: usize,
    bit: u32,
}

impl BitScan {
    /// Return the next set bit at or after the scan position and step past it.
    fn next_live(&mut self, bits: &[u32]) -> Option<SlotId> {
        while self.word < bits.len() {
            let remaining = bits[self.word].checked_shr(self.bit).unwrap_or(0);
            if remaining != 0 {
                let bit = self.bit + remaining.trailing_zeros();
                self.bit = bit + 1;
                return Some(SlotId::from_parts(self.word, bit));
            }
            self.word += 1;
            self.bit = 0;
        }
        None
    }
}

// ---------------------------------------------------------------------------
// SlotPool
// ---------------------------------------------------------------------------

/// A fixed-capacity pool of `T` with first-free-bit allocation.
///
/// The capacity is rounded up to a power of two no smaller than
/// [`MIN_CAPACITY`]. Sizing is a startup decision: a zero-sized `T` or a
/// capacity too large to index is a programming error and panics.
///
/// # Example
///
/// ```
/// use ember_core::slot::SlotPool;
///
/// let mut pool: SlotPool<u64> = SlotPool::new(5);
/// assert_eq!(pool.capacity(), 32);
///
/// let a = pool.insert(7).unwrap();
/// let b = pool.insert(9).unwrap();
/// pool.remove(a);
///
/// // The lowest free slot is reused first.
/// assert_eq!(pool.alloc_first_free(), Some(a));
/// assert_eq!(pool.get(b), Some(&9));
/// ```
pub struct SlotPool<T> {
    /// Element storage. Never reallocated after construction.
    members: Box<[T]>,
    /// One bit per slot; set means live.
    bits: Box<[u32]>,
    /// Number of live slots.
    live: usize,
}

impl<T: Default> SlotPool<T> {
    /// Create a pool holding at least `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or the rounded capacity cannot be indexed
    /// by a `u32`.
    pub fn new(capacity: usize) -> Self {
        let element_size = mem::size_of::<T>();
        assert!(element_size != 0, "slot pool element size must be non-zero");
        let capacity = capacity
            .max(MIN_CAPACITY)
            .checked_next_power_of_two()
            .unwrap_or_else(|| panic!("slot pool capacity {capacity} overflows"));
        assert!(
            u32::try_from(capacity - 1).is_ok(),
            "slot pool capacity {capacity} exceeds the addressable slot range"
        );

        let members: Box<[T]> = (0..capacity).map(|_| T::default()).collect();
        let bits = vec![0u32; capacity >> SHIFT].into_boxed_slice();
        tracing::debug!(capacity, element_size, "slot pool created");

        Self {
            members,
            bits,
            live: 0,
        }
    }

    /// Claim the lowest free slot and return its id, or `None` if the pool is
    /// full. The slot holds `T::default()`.
    pub fn alloc_first_free(&mut self) -> Option<SlotId> {
        for (word, bits) in self.bits.iter_mut().enumerate() {
            if *bits == u32::MAX {
                continue;
            }
            let bit = (!*bits).trailing_zeros();
            *bits |= 1 << bit;
            self.live += 1;
            return Some(SlotId::from_parts(word, bit));
        }
        tracing::trace!(capacity = self.capacity(), "slot pool full");
        None
    }

    /// Claim the lowest free slot and move `value` into it.
    pub fn insert(&mut self, value: T) -> Option<SlotId> {
        let id = self.alloc_first_free()?;
        self.members[id.index()] = value;
        Some(id)
    }

    /// Free a slot and reset its contents to `T::default()`.
    ///
    /// Returns `true` if the slot was live. Removing a free slot changes
    /// nothing and returns `false`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is outside the pool.
    pub fn remove(&mut self, id: SlotId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.release(id);
        true
    }

    fn release(&mut self, id: SlotId) {
        self.members[id.index()] = T::default();
        self.bits[id.word()] &= !id.mask();
        self.live = self
            .live
            .checked_sub(1)
            .unwrap_or_else(|| panic!("slot pool live count underflow releasing {id:?}"));
    }

    /// Start a removal-safe pass over the live slots.
    pub fn iterate(&mut self) -> SlotCursor<'_, T> {
        let budget = self.live;
        SlotCursor {
            pool: self,
            scan: BitScan::default(),
            budget,
            current: None,
        }
    }
}

impl<T> SlotPool<T> {
    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.members.len()
    }

    /// Number of live slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// `true` if no slot is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// `true` if every slot is live.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.live == self.capacity()
    }

    /// Whether `id` refers to a live slot.
    ///
    /// # Panics
    ///
    /// Panics if `id` is outside the pool.
    pub fn is_live(&self, id: SlotId) -> bool {
        assert!(
            id.index() < self.capacity(),
            "{id:?} out of range for slot pool of capacity {}",
            self.capacity()
        );
        self.bits[id.word()] & id.mask() != 0
    }

    /// Borrow a live slot.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        if id.index() >= self.capacity() || !self.is_live(id) {
            return None;
        }
        Some(&self.members[id.index()])
    }

    /// Mutably borrow a live slot.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if id.index() >= self.capacity() || !self.is_live(id) {
            return None;
        }
        Some(&mut self.members[id.index()])
    }

    /// Recover the slot id of an element from its address.
    ///
    /// Returns `None` if `member` does not point at an element of this pool.
    /// The slot is not required to be live.
    pub fn slot_of(&self, member: &T) -> Option<SlotId> {
        let base = self.members.as_ptr() as usize;
        let addr = member as *const T as usize;
        let offset = addr.checked_sub(base)?;
        let size = mem::size_of::<T>();
        if offset % size != 0 {
            return None;
        }
        let index = offset / size;
        (index < self.capacity()).then(|| SlotId(index as u32))
    }

    /// Iterate live slots in ascending slot order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            pool: self,
            scan: BitScan::default(),
            remaining: self.live,
        }
    }
}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("capacity", &self.capacity())
            .field("live", &self.live)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Iter
// ---------------------------------------------------------------------------

/// Read-only iterator over live slots, created by [`SlotPool::iter`].
pub struct Iter<'a, T> {
    pool: &'a SlotPool<T>,
    scan: BitScan,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.scan.next_live(&self.pool.bits)?;
        self.remaining -= 1;
        Some((id, &self.pool.members[id.index()]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

// ---------------------------------------------------------------------------
// SlotCursor
// ---------------------------------------------------------------------------

/// A forward, single-pass walk over live slots that allows removing the slot
/// it is standing on.
///
/// The pass visits at most as many slots as were live when it started, in
/// ascending slot order. It cannot be restarted.
///
/// ```
/// use ember_core::slot::SlotPool;
///
/// let mut pool: SlotPool<u32> = SlotPool::new(32);
/// for n in 0..6 {
///     pool.insert(n);
/// }
///
/// let mut cursor = pool.iterate();
/// while cursor.next().is_some() {
///     if cursor.current().is_some_and(|n| n % 2 == 0) {
///         cursor.remove_current();
///     }
/// }
///
/// let left: Vec<u32> = pool.iter().map(|(_, n)| *n).collect();
/// assert_eq!(left, vec![1, 3, 5]);
/// ```
pub struct SlotCursor<'a, T: Default> {
    pool: &'a mut SlotPool<T>,
    scan: BitScan,
    budget: usize,
    current: Option<SlotId>,
}

impl<T: Default> SlotCursor<'_, T> {
    /// Advance to the next live slot.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<SlotId> {
        self.current = None;
        if self.budget == 0 {
            return None;
        }
        let id = self.scan.next_live(&self.pool.bits)?;
        self.budget -= 1;
        self.current = Some(id);
        Some(id)
    }

    /// Id of the slot most recently returned by [`next`](Self::next), unless
    /// it has been removed through this cursor since.
    pub fn current_id(&self) -> Option<SlotId> {
        self.current
    }

    /// Borrow the current slot.
    pub fn current(&self) -> Option<&T> {
        self.current.and_then(|id| self.pool.get(id))
    }

    /// Mutably borrow the current slot.
    pub fn current_mut(&mut self) -> Option<&mut T> {
        let id = self.current?;
        self.pool.get_mut(id)
    }

    /// Remove the slot most recently returned by [`next`](Self::next).
    ///
    /// Returns `false` if that slot was already freed through
    /// [`pool_mut`](Self::pool_mut).
    ///
    /// # Panics
    ///
    /// Panics if called twice for the same `next`, or before the first one.
    pub fn remove_current(&mut self) -> bool {
        let id = self
            .current
            .take()
            .unwrap_or_else(|| panic!("remove_current called without a current slot"));
        self.pool.remove(id)
    }

    /// The pool being walked, for looking at other slots mid-pass.
    pub fn pool(&self) -> &SlotPool<T> {
        self.pool
    }

    /// The pool being walked, for touching other slots mid-pass.
    ///
    /// Slots allocated mid-pass above the cursor may be visited, within the
    /// pass's budget.
    pub fn pool_mut(&mut self) -> &mut SlotPool<T> {
        self.pool
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
