//! The kernel lock: a critical section, proved exclusive at compile time.
//!
//! Every mutable field the scheduler touches (§5: "ready-queue links,
//! object `id`, and timer/task scheduling fields are mutated only under
//! the kernel lock") lives inside a [`KCell`] rather than a bare
//! [`core::cell::Cell`]. A [`KCell`] can only be read or written by
//! presenting a [`KToken`], and the only way to get one is [`lock`], which
//! calls down to [`Port::lock`]. This is the same `tokenlock`-based
//! construction `r3_kernel::klock::CpuLockCell`/`CpuLockGuard` uses: the
//! borrow checker, not a runtime flag, stops code from touching kernel
//! state with interrupts enabled.
//!
//! Internal kernel code that already holds the lock passes a
//! [`KTokenRefMut`] down through its call graph (`lock.borrow_mut()`)
//! instead of calling [`lock`] again. `Port::lock`/`unlock` nesting is for
//! the port's own interrupt save/restore needs (an ISR that also takes the
//! lock), not for the kernel re-entering itself; the single-token
//! invariant `tokenlock` enforces means exactly one [`KToken`] may ever be
//! live for a given kernel, so the rest of this crate threads the same
//! token or a reborrow of it rather than minting a second one anywhere,
//! including from inside a timer callback (see `crate::timer::firing_mut`).
use core::ops;

use rtk_core::port::{LockState, Port};

pub struct KLockTag<P>(core::marker::PhantomData<P>);

/// The token that "unlocks" a [`KCell`]. Only one instance can exist at a
/// time (enforced by `tokenlock`'s singleton-token machinery), so holding
/// one is proof the kernel lock is held.
pub type KToken<P> = tokenlock::UnsyncSingletonToken<KLockTag<P>>;
type KKeyhole<P> = tokenlock::SingletonTokenId<KLockTag<P>>;

/// A cell that can only be read or written by presenting a [`KToken`].
pub struct KCell<P, T: ?Sized>(tokenlock::UnsyncTokenLock<T, KKeyhole<P>>);

impl<P, T> KCell<P, T> {
    pub const fn new(value: T) -> Self {
        Self(tokenlock::UnsyncTokenLock::new(KKeyhole::<P>::INIT, value))
    }
}

impl<P, T> ops::Deref for KCell<P, T> {
    type Target = tokenlock::UnsyncTokenLock<T, KKeyhole<P>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<P, T: Copy> KCell<P, T> {
    /// Read the current value. Requires proof the kernel lock is held
    /// (either a [`KToken`] or a borrowed [`KTokenRefMut`]).
    #[inline]
    pub fn get<K: tokenlock::Token<KLockTag<P>>>(&self, token: &K) -> T {
        *self.0.read(token)
    }

    /// Overwrite the current value. Requires proof the kernel lock is held.
    #[inline]
    pub fn set<K: tokenlock::Token<KLockTag<P>>>(&self, token: &mut K, value: T) {
        *self.0.write(token) = value;
    }
}

impl<P, T> KCell<P, T> {
    /// Mutate the contents in place through a closure, for types that
    /// aren't cheap to copy in and out.
    #[inline]
    pub fn with_mut<K: tokenlock::Token<KLockTag<P>>, R>(
        &self,
        token: &mut K,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        f(self.0.write(token))
    }
}

/// RAII guard for the kernel lock, obtained via [`lock`]. Dropping it calls
/// [`Port::unlock`] with the state [`Port::lock`] returned, restoring
/// whatever the interrupt state was before.
pub struct KGuard<P: Port> {
    port_state: LockState,
    token: KToken<P>,
}

impl<P: Port> KGuard<P> {
    /// Borrow a [`KTokenRefMut`] out of this guard, to hand down to an
    /// inner function without consuming the guard.
    #[inline]
    pub fn borrow_mut(&mut self) -> KTokenRefMut<'_, P> {
        self.token.borrow_mut()
    }
}

impl<P: Port> Drop for KGuard<P> {
    fn drop(&mut self) {
        // Safety: `port_state` was produced by the matching `Port::lock()`
        // call in `lock()`, and this is the only place that consumes it.
        unsafe { P::unlock(self.port_state) }
    }
}

impl<P: Port> ops::Deref for KGuard<P> {
    type Target = KToken<P>;
    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl<P: Port> ops::DerefMut for KGuard<P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.token
    }
}

/// Borrowed form of [`KGuard`], threaded through the kernel's internal call
/// graph instead of re-locking at every level.
pub type KTokenRefMut<'a, P> = tokenlock::UnsyncSingletonTokenRefMut<'a, KLockTag<P>>;

/// Enter the kernel's critical section.
///
/// Only ever called once, at the outermost entry point of a kernel
/// operation (`yield_now`, `tsk_start`, `tmr_take`, ...); everything that
/// operation calls into takes a [`KTokenRefMut`] instead.
#[inline]
pub fn lock<P: Port>() -> KGuard<P> {
    let port_state = P::lock();
    KGuard {
        port_state,
        // Safety: `Port::lock` just excluded every other writer (the tick
        // ISR and any other task) from kernel state, so no other `KToken`
        // can be alive right now.
        token: unsafe { KToken::new_unchecked() },
    }
}
