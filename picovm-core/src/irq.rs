//! Handing state to interrupt handlers
//!
//! Interrupt handlers take no arguments, so whatever they work on has to be
//! reachable from a static. [`Handoff`] is a write-once slot: the boot code
//! installs the handler's state before unmasking the interrupt, and from
//! then on only that handler touches it. No lock is ever taken in the
//! interrupt path.

#![allow(unsafe_code)]

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// Write-once slot owned by a single interrupt handler
pub struct Handoff<T> {
    state: AtomicU8,
    busy: AtomicBool,
    value: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: the value is written once by `install` (guarded by `state`) and
// afterwards only accessed through `with`, whose contract restricts access
// to one non-reentrant handler. `T: Send` because the value moves from the
// boot context into that handler.
unsafe impl<T: Send> Sync for Handoff<T> {}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Handoff<T> {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            busy: AtomicBool::new(false),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Store the handler state
    ///
    /// Must happen before the owning interrupt is unmasked. Returns the
    /// value back if the slot was already filled.
    pub fn install(&self, value: T) -> Result<(), T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }
        // SAFETY: the state transition above grants exclusive write access.
        unsafe { (*self.value.get()).write(value) };
        self.state.store(READY, Ordering::Release);
        Ok(())
    }

    /// Check whether state has been installed
    pub fn is_installed(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Run `f` on the installed state
    ///
    /// Returns `None` if nothing was installed yet (a spurious interrupt
    /// before boot finished) or if called re-entrantly.
    ///
    /// # Safety
    ///
    /// Only the one interrupt handler that owns this slot may call this.
    /// Calling it from two contexts that can preempt each other breaks the
    /// single-writer discipline of whatever `T` holds.
    pub unsafe fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if self.state.load(Ordering::Acquire) != READY {
            return None;
        }
        if self.busy.swap(true, Ordering::Acquire) {
            return None;
        }
        // SAFETY: READY means the value is initialized; `busy` and the
        // caller contract make this the only live reference.
        let result = f(unsafe { (*self.value.get()).assume_init_mut() });
        self.busy.store(false, Ordering::Release);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_before_install() {
        let slot: Handoff<u32> = Handoff::new();
        assert!(!slot.is_installed());
        assert_eq!(unsafe { slot.with(|v| *v) }, None);
    }

    #[test]
    fn test_install_once() {
        let slot = Handoff::new();
        assert_eq!(slot.install(5u32), Ok(()));
        assert_eq!(slot.install(6u32), Err(6));
        assert!(slot.is_installed());
    }

    #[test]
    fn test_state_persists_between_calls() {
        static COUNTER: Handoff<u32> = Handoff::new();
        COUNTER.install(0).unwrap();

        for _ in 0..3 {
            unsafe { COUNTER.with(|count| *count += 1) };
        }
        assert_eq!(unsafe { COUNTER.with(|count| *count) }, Some(3));
    }

    #[test]
    fn test_reentrant_call_is_refused() {
        let slot = Handoff::new();
        slot.install(1u8).unwrap();

        let inner = unsafe { slot.with(|_| slot.with(|v| *v)) };
        assert_eq!(inner, Some(None));
    }
}
