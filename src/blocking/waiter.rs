// Per-consumer wake record for the hand-off queue.
//
// A `Waiter` is pinned on the stack of the thread blocked in `dequeue` and the
// waiter list only stores `WaiterPtr`s to it. Slot access and unlinking both
// happen under the queue lock. The owner unlinks a waiter that was never
// served before it goes away (see `Parked` in handoff_queue.rs).
use std::cell::UnsafeCell;
use std::marker::PhantomPinned;
use std::pin::Pin;
use std::ptr::NonNull;

use crate::sync::{Condvar, MutexGuard};

/// What a parked consumer is woken with.
pub(crate) enum Delivery<T> {
    Item(T),
    Closed,
}

pub(crate) struct Waiter<T> {
    slot: UnsafeCell<Option<Delivery<T>>>,
    wake: Condvar,
    _pin: PhantomPinned,
}

impl<T> Waiter<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: UnsafeCell::new(None),
            wake: Condvar::new(),
            _pin: PhantomPinned,
        }
    }

    /// Suspends until the slot is filled. `guard` must be the guard of the
    /// queue lock this waiter is linked under.
    pub(crate) fn park<S>(self: Pin<&Self>, guard: &mut MutexGuard<'_, S>) -> Delivery<T> {
        loop {
            // SAFETY: writers only touch the slot while holding the lock,
            // which `guard` proves we hold right now.
            if let Some(delivery) = unsafe { (*self.slot.get()).take() } {
                return delivery;
            }
            // Spurious wakeups fall through to the slot check again.
            self.wake.wait(guard);
        }
    }
}

// Raw waiter pointer, made `Send` so the waiter list can live inside the
// queue's Mutex.
pub(crate) struct WaiterPtr<T>(NonNull<Waiter<T>>);

unsafe impl<T: Send> Send for WaiterPtr<T> {}

impl<T> WaiterPtr<T> {
    pub(crate) fn new(waiter: Pin<&Waiter<T>>) -> Self {
        Self(NonNull::from(waiter.get_ref()))
    }

    pub(crate) fn points_to(&self, waiter: Pin<&Waiter<T>>) -> bool {
        self.0 == NonNull::from(waiter.get_ref())
    }

    /// Fills the slot with `item` and wakes the parked thread.
    ///
    /// # Safety
    /// The caller must hold the queue lock and must have unlinked this
    /// pointer from the waiter list in the same critical section.
    pub(crate) unsafe fn deliver(self, item: T) {
        self.fill(Delivery::Item(item));
    }

    /// Wakes the parked thread with `Delivery::Closed`.
    ///
    /// # Safety
    /// Same contract as [`WaiterPtr::deliver`].
    pub(crate) unsafe fn cancel(self) {
        self.fill(Delivery::Closed);
    }

    unsafe fn fill(self, delivery: Delivery<T>) {
        let waiter = self.0.as_ref();
        *waiter.slot.get() = Some(delivery);
        // Signalled under the lock: the waiter cannot return (and drop itself)
        // before we release it.
        waiter.wake.notify_one();
    }
}
