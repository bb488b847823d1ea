//! Timer lifecycle operations (§4.D).
//!
//! The four `tmr_start*` variants funnel through [`arm`], matching the
//! source's single `tmr_startFrom` primitive (`os_tmr.h`) that every
//! convenience wrapper (`tmr_start`, `tmr_startFor`, `tmr_startPeriodic`,
//! `tmr_startUntil`) ultimately calls.
use rtk_core::consts::{Event, Id, Tick};

use crate::cfg::Kernel;
use crate::klock;
use crate::object::{Node, Timer};
use crate::sched::{self, rdy_insert};

/// Shared setter behind every `tmr_start*` variant: write `start`/`delay`/
/// `period`, optionally the callback, then insert as `Timer` if it isn't
/// already enqueued (re-arming an already-running timer just rewrites its
/// fields in place; it keeps its queue position).
fn arm<K: Kernel>(t: &'static Timer<K>, delay: Tick, period: Tick, callback: Option<Option<fn()>>) {
    let mut guard = klock::lock::<K>();
    let mut tok = guard.borrow_mut();
    let now = K::state().time(&tok);
    t.timer.start.set(&mut tok, now);
    t.timer.delay.set(&mut tok, delay);
    t.timer.period.set(&mut tok, period);
    if let Some(cb) = callback {
        t.timer.callback.set(&mut tok, cb);
    }
    if t.header.id.get(&tok) == Id::Stopped {
        let cur = K::state().current(&tok);
        rdy_insert(&mut tok, Node::Timer(t), Id::Timer, cur);
    }
}

/// One-shot for `delay` ticks (`tmr_startFor`).
pub fn start_for<K: Kernel>(t: &'static Timer<K>, delay: Tick) {
    arm::<K>(t, delay, 0, None);
}

/// Periodic every `period` ticks, first fire at `period` (`tmr_startPeriodic`).
pub fn start_periodic<K: Kernel>(t: &'static Timer<K>, period: Tick) {
    arm::<K>(t, period, period, None);
}

/// Delayed `delay` ticks, then periodic every `period` ticks (`tmr_start`).
pub fn start<K: Kernel>(t: &'static Timer<K>, delay: Tick, period: Tick) {
    arm::<K>(t, delay, period, None);
}

/// One-shot at the absolute deadline `time` (`tmr_startUntil`). `delay` is
/// computed from `Counter` at call time, same wrap-around arithmetic as
/// every other deadline in this kernel (scenario 3, §8).
pub fn start_until<K: Kernel>(t: &'static Timer<K>, time: Tick) {
    let guard = klock::lock::<K>();
    let now = K::state().time(&*guard);
    drop(guard);
    arm::<K>(t, time.wrapping_sub(now), 0, None);
}

/// As [`start`], but also installs a new callback (`tmr_startFrom`).
pub fn start_from<K: Kernel>(t: &'static Timer<K>, delay: Tick, period: Tick, callback: Option<fn()>) {
    arm::<K>(t, delay, period, Some(callback));
}

/// `tmr_take(t)` (§4.D): `true` iff `signal` has advanced since the last
/// call that returned `true` for this timer. The source's own `tmr_take`
/// wasn't retrieved with the rest of `os_tmr.c`; the open design
/// question leaves the watermark's storage unspecified ("stored alongside
/// the timer or recomputed"). This port stores it on [`Timer`] itself (see
/// DESIGN.md). At most one caller may poll a given timer, the same
/// assumption `tmr_wait`'s snapshot-and-spin makes.
pub fn take<K: Kernel>(t: &'static Timer<K>) -> Result<(), rtk_core::Error> {
    let mut guard = klock::lock::<K>();
    let mut tok = guard.borrow_mut();
    let signal = t.timer.signal.get(&tok);
    let last = t.taken.get(&tok);
    if signal != last {
        t.taken.set(&mut tok, signal);
        Ok(())
    } else {
        Err(rtk_core::Error)
    }
}

/// `tmr_wait(t)` (§4.D): spin-yields until `signal` advances from its
/// value at the moment of the call.
pub fn wait<K: Kernel>(t: &'static Timer<K>) {
    let snapshot = {
        let guard = klock::lock::<K>();
        t.timer.signal.get(&*guard)
    };
    loop {
        sched::yield_now::<K>();
        let guard = klock::lock::<K>();
        if t.timer.signal.get(&*guard) != snapshot {
            return;
        }
    }
}

/// The timer currently firing and the token `select_next` is already
/// holding while it does so, for use from inside a callback only (§4.D
/// "Callback environment"; design notes, "current as a process-wide
/// mutable"). Panics if called outside of one.
///
/// Reborrows the one token `select_next` put on its own stack rather than
/// minting a second one: `select_next` publishes that token's address for
/// exactly the span of the callback call, so this can only be reached from
/// inside it.
fn firing_mut<'a, K: Kernel>() -> (&'static Timer<K>, &'a mut klock::KTokenRefMut<'a, K>) {
    let ptr = K::state().firing_token();
    assert!(
        !ptr.is_null(),
        "timer::firing/flip/rearm/unarm called outside a timer callback"
    );
    // Safety: a non-null address here was set by `select_next` immediately
    // before it called the currently-running callback, and is cleared the
    // moment that callback returns, so this reborrow cannot outlive the
    // `select_next` frame that owns the token.
    let token = unsafe { &mut *ptr.cast::<klock::KTokenRefMut<'a, K>>() };
    let timer = K::state()
        .firing(&*token)
        .and_then(Node::as_timer)
        .expect("timer::firing/flip/rearm/unarm called outside a timer callback");
    (timer, token)
}

/// Change the firing timer's callback, effective from its *next* firing
/// (`tmr_flip` in the source: "use only in timer's callback procedure").
pub fn flip<K: Kernel>(callback: Option<fn()>) {
    let (timer, token) = firing_mut::<K>();
    timer.timer.callback.set(token, callback);
}

/// Rewrite the firing timer's next delay (design notes: a callback may
/// "unarm itself, by writing `delay := 0`", or rearm with a new value).
/// Takes effect immediately: `select_next` re-reads `delay` right after
/// the callback returns to decide whether to `rdy_remove` it.
pub fn rearm<K: Kernel>(delay: Tick) {
    let (timer, token) = firing_mut::<K>();
    timer.timer.delay.set(token, delay);
}

/// Rewrite the firing timer's period (so the *following* firing reflects
/// the new cadence; the firing currently in progress already consumed the
/// old `period` when `select_next` wrote it into `delay`).
pub fn set_period<K: Kernel>(period: Tick) {
    let (timer, token) = firing_mut::<K>();
    timer.timer.period.set(token, period);
}
