//! Lock-free single-producer single-consumer ring buffer.
//!
//! The ring is the only structure shared between the ingest thread and the
//! matcher thread. Indexing is a bitwise mask over a power-of-two slot
//! array; `head` (producer-owned) and `tail` (consumer-owned) live on
//! separate cache lines so neither side invalidates the other's line on
//! every operation.
//!
//! The producer's release store of `head` pairs with the consumer's acquire
//! load, transferring the slot write; the consumer's release store of `tail`
//! pairs with the producer's acquire load, transferring slot reuse. Nothing
//! here needs sequentially consistent ordering.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

struct Slot<T>(UnsafeCell<MaybeUninit<T>>);

// Slots are only ever accessed by the side that currently owns them per the
// head/tail protocol.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

struct Shared<T> {
    /// Next slot the producer will write. Stored pre-masked.
    head: CachePadded<AtomicU64>,
    /// Next slot the consumer will read. Stored pre-masked.
    tail: CachePadded<AtomicU64>,
    mask: u64,
    slots: Box<[Slot<T>]>,
}

/// A lock-free SPSC ring over `Copy` records.
///
/// `with_capacity` hands back split [`Producer`]/[`Consumer`] endpoints;
/// holding an endpoint is proof of exclusive access to that side, which is
/// what makes the relaxed self-side loads sound.
pub struct SpscRing<T>(std::marker::PhantomData<T>);

impl<T: Copy + Send> SpscRing<T> {
    /// Build a ring with `capacity` slots (`capacity - 1` usable, one slot
    /// reserved to distinguish full from empty).
    ///
    /// # Panics
    /// Panics unless `capacity` is a power of two >= 2.
    pub fn with_capacity(capacity: usize) -> (Producer<T>, Consumer<T>) {
        assert!(
            capacity >= 2 && capacity.is_power_of_two(),
            "ring capacity must be a power of two >= 2"
        );

        let slots = (0..capacity)
            .map(|_| Slot(UnsafeCell::new(MaybeUninit::uninit())))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let shared = Arc::new(Shared {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            mask: capacity as u64 - 1,
            slots,
        });

        (
            Producer {
                shared: Arc::clone(&shared),
            },
            Consumer { shared },
        )
    }
}

/// Write endpoint. Exactly one thread may hold it.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

/// Read endpoint. Exactly one thread may hold it.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Copy + Send> Producer<T> {
    /// Enqueue one record. Returns `false` when the ring is full; the
    /// producer chooses its own retry policy (the canonical one is a
    /// cooperative yield per failed push).
    #[inline]
    pub fn try_push(&mut self, value: T) -> bool {
        let shared = &*self.shared;
        let head = shared.head.load(Ordering::Relaxed);
        let next = (head + 1) & shared.mask;

        if next == shared.tail.load(Ordering::Acquire) {
            return false;
        }

        unsafe {
            (*shared.slots[head as usize].0.get()).write(value);
        }
        shared.head.store(next, Ordering::Release);
        true
    }

    /// Usable capacity (`slots - 1`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.mask as usize
    }
}

impl<T: Copy + Send> Consumer<T> {
    /// Dequeue one record, or `None` when the ring is empty.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let shared = &*self.shared;
        let tail = shared.tail.load(Ordering::Relaxed);

        if tail == shared.head.load(Ordering::Acquire) {
            return None;
        }

        let value = unsafe { (*shared.slots[tail as usize].0.get()).assume_init_read() };
        shared.tail.store((tail + 1) & shared.mask, Ordering::Release);
        Some(value)
    }

    /// Usable capacity (`slots - 1`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.mask as usize
    }
}
