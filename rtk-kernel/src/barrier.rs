//! The rendezvous barrier primitive (§3 "Barrier", §4.E).
//!
//! Grounded on `os_bar.c`'s `bar_wait`: the arriving task decrements
//! `count`; whichever arrival brings it to zero reloads `count` from
//! `limit` and bumps `signal`, releasing every in-flight waiter at once.
//! §4.E's "this design tolerates exactly `limit` arrivals per epoch with
//! no over-counting" holds because the reload and signal bump happen
//! under the same kernel-lock critical section the decrement did; no
//! waiter can observe the new epoch before the last arriver has finished
//! resetting `count`.

use rtk_core::init::Init;

use crate::cfg::Kernel;
use crate::klock::{self, KCell};

/// A reusable rendezvous barrier for exactly `limit` arrivals per epoch
/// (§3 "Barrier").
pub struct Barrier<P: rtk_core::port::Port> {
    limit: u32,
    count: KCell<P, u32>,
    signal: KCell<P, u32>,
}

impl<P: rtk_core::port::Port> Barrier<P> {
    /// `limit` must be nonzero: a barrier of limit 0 would never have a
    /// "last arriver" to release it.
    pub const fn new(limit: u32) -> Self {
        Self {
            limit,
            count: KCell::new(limit),
            signal: KCell::new(0),
        }
    }
}

/// Barriers have no single natural `Init::INIT` value since `limit` is
/// configured at construction (§3: "configured at construction,
/// immutable thereafter"); only `Barrier::new(limit)` constructs one.
/// A blanket `Init` impl would have to pick an arbitrary default `limit`,
/// which would silently mis-configure any `static_barrier!` that forgot
/// to pass one; omitted deliberately.
impl<P: rtk_core::port::Port> core::fmt::Debug for Barrier<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Barrier").field("limit", &self.limit).finish()
    }
}

impl<K: Kernel> Barrier<K> {
    /// `bar_wait` (§4.E). Returns once `limit` tasks (including this one)
    /// have called it since the last release.
    pub fn wait(&self) {
        let wait_for = {
            let mut guard = klock::lock::<K>();
            let mut tok = guard.borrow_mut();
            let remaining = self.count.get(&tok) - 1;
            self.count.set(&mut tok, remaining);
            if remaining == 0 {
                self.count.set(&mut tok, self.limit);
                let signal = self.signal.get(&tok);
                self.signal.set(&mut tok, signal.wrapping_add(1));
                None
            } else {
                Some(self.signal.get(&tok))
            }
        };

        let Some(snapshot) = wait_for else { return };
        loop {
            crate::task::yield_now::<K>();
            let guard = klock::lock::<K>();
            if self.signal.get(&*guard) != snapshot {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Exercised end-to-end in `rtk-port-std`'s integration tests
    //! (scenario 6, §8): a rendezvous needs several real tasks.
}
