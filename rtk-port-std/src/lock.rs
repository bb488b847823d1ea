//! The kernel's critical section, realized as a real reentrant mutex.
//!
//! `rtk_core::port::Port::lock`/`unlock` only has to model "disable
//! interrupts, nesting permitted via save-and-restore" (§4.F).
//! On a single embedded core that's as cheap as flipping a status-register
//! bit, because there is only ever one instruction stream to exclude (the
//! tick ISR). Here there are genuinely many OS threads, one per task,
//! plus whatever drives `tick()`, so "disable interrupts" has to become
//! an actual mutex. `KLOCK` is a plain [`std::sync::Mutex`]; the nesting
//! behavior the trait promises is layered on top with a thread-local
//! depth counter, the standard way to build a reentrant lock out of a
//! non-reentrant one: only the outermost `lock()` call on a given thread
//! actually blocks on `KLOCK`, and only the outermost `unlock()` releases
//! it.
use std::cell::RefCell;
use std::sync::{Mutex, MutexGuard};

use rtk_core::port::LockState;

static KLOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static DEPTH: RefCell<u32> = const { RefCell::new(0) };
    static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Enter the critical section. Blocks if another thread holds it; returns
/// immediately (incrementing the nesting depth) if the calling thread
/// already does.
pub fn lock() -> LockState {
    let depth = DEPTH.with(|d| *d.borrow());
    if depth == 0 {
        let guard = KLOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        HELD.with(|h| *h.borrow_mut() = Some(guard));
    }
    DEPTH.with(|d| *d.borrow_mut() = depth + 1);
    LockState(depth as usize)
}

/// Restore the nesting depth `state` captured, releasing the real mutex
/// only once it has unwound back to zero.
///
/// # Safety
/// `state` must be the value a still-active, unconsumed `lock()` call on
/// this thread returned (forwarded from [`rtk_core::port::Port::unlock`]).
pub unsafe fn unlock(state: LockState) {
    let prev = state.0 as u32;
    DEPTH.with(|d| *d.borrow_mut() = prev);
    if prev == 0 {
        HELD.with(|h| {
            h.borrow_mut().take();
        });
    }
}
