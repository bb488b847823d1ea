//! Task lifecycle operations (§4.C).
//!
//! Every operation here funnels through [`crate::klock::lock`] exactly
//! once at its outermost entry point, matching the source's
//! `port_sys_lock()`/`port_sys_unlock()` bracketing in `os_tsk.c`. The
//! one exception is `tsk_give`/`tsk_resume`, which the source leaves
//! unlocked (a single-word read-then-write it considered safe on a
//! non-reentrant core); this port takes the lock there too, since every
//! mutation of `id`/`event` must go through a [`crate::klock::KCell`]
//! regardless (§5).

use rtk_core::consts::{Event, Id, INFINITE};

use crate::cfg::Kernel;
use crate::klock;
use crate::object::{Node, Task};
use crate::sched::{self, rdy_insert, rdy_remove};

/// The task the scheduler has most recently selected (§3: "'the current
/// task' is whichever node the scheduler last selected"). Invariant 2 of
/// the next-runnable loop guarantees this is always a task, never a timer.
#[inline]
pub fn current<K: Kernel>() -> &'static Task<K> {
    let guard = klock::lock::<K>();
    K::state()
        .current(&*guard)
        .as_task()
        .expect("current scheduler selection is not a task")
}

/// `start(t)` (§4.C). A no-op unless `t.id == Stopped`; otherwise splices
/// it into the ready queue immediately before the caller (§5: a newly
/// started task "lands immediately before `cur`", so it runs after every
/// other `READY` task in the current rotation).
pub fn start<K: Kernel>(t: &'static Task<K>) {
    let mut guard = klock::lock::<K>();
    let mut tok = guard.borrow_mut();
    if t.header.id.get(&tok) == Id::Stopped {
        let cur = K::state().current(&tok);
        rdy_insert(&mut tok, Node::Task(t), Id::Ready, cur);
    }
}

/// `startFrom(t, fn)` (§4.C): as [`start`], but also installs a new entry
/// point, only when `t` was actually `Stopped` (`os_tsk.c`'s
/// `tsk_startFrom` writes `state` inside the same guard as the insert, not
/// unconditionally: restarting an already-running task must not reassign
/// the function it's mid-execution of).
pub fn start_from<K: Kernel>(t: &'static Task<K>, entry: fn()) {
    let mut guard = klock::lock::<K>();
    let mut tok = guard.borrow_mut();
    if t.header.id.get(&tok) == Id::Stopped {
        t.timer.callback.set(&mut tok, Some(entry));
        let cur = K::state().current(&tok);
        rdy_insert(&mut tok, Node::Task(t), Id::Ready, cur);
    }
}

/// `stop()` (§4.C). Caller-only: removes the running task from the ready
/// queue and abandons its stack. Never returns.
pub fn stop<K: Kernel>() -> ! {
    {
        let mut guard = klock::lock::<K>();
        let mut tok = guard.borrow_mut();
        let cur = K::state().current(&tok);
        rdy_remove(&mut tok, cur);
    }
    K::tsk_break()
}

/// `join(t)` (§4.C): spin-yields until `t` reaches `Stopped`.
pub fn join<K: Kernel>(t: &'static Task<K>) {
    loop {
        let guard = klock::lock::<K>();
        let stopped = t.header.id.get(&*guard) == Id::Stopped;
        drop(guard);
        if stopped {
            return;
        }
        sched::yield_now::<K>();
    }
}

/// `yield()` / `pass()` (§4.C).
#[inline]
pub fn yield_now<K: Kernel>() {
    sched::yield_now::<K>();
}

/// `flip(fn)` (§4.C). Caller-only: rewrites the running task's entry
/// point and breaks to it with a fresh stack. Never returns.
pub fn flip<K: Kernel>(entry: fn()) -> ! {
    {
        let mut guard = klock::lock::<K>();
        let mut tok = guard.borrow_mut();
        let cur = K::state()
            .current(&tok)
            .as_task()
            .expect("flip: current selection is not a task");
        cur.timer.callback.set(&mut tok, Some(entry));
    }
    K::tsk_break()
}

/// Shared tail of `sleepFor`/`sleepUntil`/`sleep`: arm the caller as
/// `Delayed` from `now` and yield, returning whatever `event` holds once
/// the scheduler brings it back (`E_SUCCESS` on natural timeout, or
/// whatever `resume` delivered).
fn sleep_raw<K: Kernel>(delay: Event) -> Event {
    {
        let mut guard = klock::lock::<K>();
        let mut tok = guard.borrow_mut();
        let cur = K::state()
            .current(&tok)
            .as_task()
            .expect("sleep: current selection is not a task");
        let now = K::state().time(&tok);
        cur.timer.start.set(&mut tok, now);
        cur.timer.delay.set(&mut tok, delay);
        cur.header.id.set(&mut tok, Id::Delayed);
    }
    sched::yield_now::<K>();
    let guard = klock::lock::<K>();
    let cur = K::state()
        .current(&*guard)
        .as_task()
        .expect("sleep: woke up as a non-task selection");
    cur.event.get(&*guard)
}

/// `sleepFor(d)` (§4.C).
pub fn sleep_for<K: Kernel>(delay: Event) -> Event {
    sleep_raw::<K>(delay)
}

/// `sleepUntil(abs)` (§4.C): `delay := abs - Counter`, captured at call
/// time, same wrap-around arithmetic as every other deadline in this
/// kernel.
pub fn sleep_until<K: Kernel>(deadline: Event) -> Event {
    let guard = klock::lock::<K>();
    let now = K::state().time(&*guard);
    drop(guard);
    sleep_raw::<K>(deadline.wrapping_sub(now))
}

/// `sleep()` (§4.C): `sleepFor(INFINITE)`; only [`resume`] can wake it.
pub fn sleep<K: Kernel>() -> Event {
    sleep_raw::<K>(INFINITE)
}

/// `wait(mask)` (§4.C). Caller-only: sets the wait mask, then spin-yields
/// until [`give`] has cleared every bit of it.
pub fn wait<K: Kernel>(mask: Event) {
    {
        let mut guard = klock::lock::<K>();
        let mut tok = guard.borrow_mut();
        let cur = K::state()
            .current(&tok)
            .as_task()
            .expect("wait: current selection is not a task");
        cur.event.set(&mut tok, mask);
    }
    loop {
        sched::yield_now::<K>();
        let guard = klock::lock::<K>();
        let cur = K::state()
            .current(&*guard)
            .as_task()
            .expect("wait: current selection is not a task");
        if cur.event.get(&*guard) == 0 {
            return;
        }
    }
}

/// `give(t, mask)` (§4.C): if `t` is `Ready`, clears `mask`'s bits from
/// its event word. The wakeup half of [`wait`].
pub fn give<K: Kernel>(t: &'static Task<K>, mask: Event) {
    let mut guard = klock::lock::<K>();
    let mut tok = guard.borrow_mut();
    if t.header.id.get(&tok) == Id::Ready {
        let event = t.event.get(&tok);
        t.event.set(&mut tok, event & !mask);
    }
}

/// `resume(t, ev)` (§4.C): wakes a `Delayed` task early, delivering `ev`
/// as its sleep return value. Order matters: write `event` before `id`,
/// so the scheduler never observes a freshly-`Ready` task with a stale
/// event word.
pub fn resume<K: Kernel>(t: &'static Task<K>, ev: Event) {
    let mut guard = klock::lock::<K>();
    let mut tok = guard.borrow_mut();
    if t.header.id.get(&tok) == Id::Delayed {
        t.event.set(&mut tok, ev);
        t.header.id.set(&mut tok, Id::Ready);
    }
}
