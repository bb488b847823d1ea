//! The ready queue and the next-runnable selection loop (§4.B).
//!
//! `rdy_insert`/`rdy_remove` are the only two functions anywhere in this
//! crate that splice the circular list; every lifecycle operation in
//! [`crate::task`] and [`crate::timer`] funnels through them. [`yield_now`]
//! is the only place the hot loop itself runs, and it is the one function
//! in this crate that calls down into [`rtk_core::port::Port::ctx_switch`].
use rtk_core::consts::{Id, E_SUCCESS};
use rtk_core::port::Port;
use rtk_core::time::has_elapsed;

use crate::cfg::Kernel;
use crate::klock::{KLockTag, KTokenRefMut};
use crate::object::{Node, Task};

/// Splice `obj` into the ready queue immediately before `nxt`, and set its
/// lifecycle tag to `id`. The sole insertion primitive (§4.B): the same
/// routine enqueues `READY` tasks and `TIMER` objects alike.
pub fn rdy_insert<P: Port, K: tokenlock::Token<KLockTag<P>>>(
    token: &mut K,
    obj: Node<P>,
    id: Id,
    nxt: Node<P>,
) {
    let prev = nxt
        .header()
        .prev
        .get(token)
        .expect("rdy_insert: nxt is not enqueued");
    obj.header().prev.set(token, Some(prev));
    obj.header().next.set(token, Some(nxt));
    prev.header().next.set(token, Some(obj));
    nxt.header().prev.set(token, Some(obj));
    obj.header().id.set(token, id);
}

/// Unlink `obj` from the ready queue and set its tag to `STOPPED`.
///
/// Deliberately does *not* clear `obj`'s own `prev`/`next`; they're left
/// stale, still pointing at `obj`'s former neighbors. Invariant 4 (§8)
/// says a stopped object's links are never *dereferenced*, but nothing
/// requires them to be zeroed, and one caller depends on that: `tsk_stop`
/// removes the running task from the queue and then breaks straight into
/// the scheduler, which starts its search at `System.cur.next`, reading
/// the very link this function would otherwise have just wiped out. The
/// stale `next` still names the correct successor to resume scanning from
/// (identical to what it was a moment before removal), so leaving it in
/// place is what makes self-removal-then-reschedule work at all.
pub fn rdy_remove<P: Port, K: tokenlock::Token<KLockTag<P>>>(token: &mut K, obj: Node<P>) {
    let prev = obj.header().prev.get(token);
    let next = obj.header().next.get(token);
    if let (Some(prev), Some(next)) = (prev, next) {
        prev.header().next.set(token, Some(next));
        next.header().prev.set(token, Some(prev));
    }
    obj.header().id.set(token, Id::Stopped);
}

/// The hot loop (§4.B "Next-runnable selection"). Walks the ready queue
/// starting from the current task's successor, firing any due timers in
/// place, until it finds a `READY` task (the main task, being self-linked
/// and always `READY`, guarantees this terminates within one traversal).
///
/// Returns the chosen task without updating `KernelState::cur`; callers
/// (`yield_now`, `tsk_break`) do that once they've also handled saving or
/// discarding the outgoing context.
///
/// Takes the concrete [`KTokenRefMut`] rather than a generic token type:
/// firing a timer needs to publish this exact token's address for
/// `timer::flip`/`rearm`/`set_period` to reborrow (see the `firing_token`
/// stash below), which only works for a type it can name.
pub fn select_next<K: Kernel>(token: &mut KTokenRefMut<'_, K>) -> &'static Task<K> {
    let state = K::state();
    let mut cur = state
        .current(token)
        .header()
        .next
        .get(token)
        .expect("ready queue: current task is not linked");

    loop {
        match cur.id(token) {
            Id::Stopped => {
                cur = cur
                    .header()
                    .next
                    .get(token)
                    .expect("ready queue corrupted: stopped node still linked");
            }
            Id::Ready => {
                return cur
                    .as_task()
                    .expect("ready queue corrupted: READY tag on a non-task node");
            }
            Id::Delayed | Id::Timer => {
                let fields = cur.timer();
                let now = state.time(token);
                let start = fields.start.get(token);
                let delay = fields.delay.get(token);

                if !has_elapsed(now, start, delay) {
                    cur = cur
                        .header()
                        .next
                        .get(token)
                        .expect("ready queue corrupted: counting-down node not linked");
                    continue;
                }

                if cur.id(token) == Id::Delayed {
                    let task = cur
                        .as_task()
                        .expect("ready queue corrupted: DELAYED tag on a non-task node");
                    cur.header().id.set(token, Id::Ready);
                    task.event.set(token, E_SUCCESS);
                    return task;
                }

                // TIMER: fire in place. Capture the successor before a
                // one-shot's `rdy_remove` clears this node's own links.
                let next = cur
                    .header()
                    .next
                    .get(token)
                    .expect("ready queue corrupted: timer not linked");

                let period = fields.period.get(token);
                fields.start.set(token, start.wrapping_add(delay));
                fields.delay.set(token, period);

                if let Some(callback) = fields.callback.get(token) {
                    state.set_firing(token, Some(cur));
                    // Publish this token's address so a callback reaching
                    // `timer::flip`/`rearm`/`set_period` can reborrow the
                    // one token already held here instead of minting a
                    // second one. Cleared the moment the callback returns,
                    // so the pointer never outlives this call.
                    let addr: *mut () = (token as *mut KTokenRefMut<'_, K>).cast();
                    state.set_firing_token(addr);
                    callback();
                    state.set_firing_token(core::ptr::null_mut());
                    state.set_firing(token, None);
                }

                if fields.delay.get(token) == 0 {
                    rdy_remove(token, cur);
                }

                let signal = fields.signal.get(token);
                fields.signal.set(token, signal.wrapping_add(1));

                cur = next;
            }
        }
    }
}

/// `yield()` / `pass()` (§4.C): hand control to the port's context switch,
/// which saves the caller's context, runs [`select_next`], and restores
/// whatever it chose. Returns once this task is selected to run again.
///
/// §9's "callback holding the kernel lock" open question asks for this to
/// be "explicit and enforced by assertion in debug builds": firing runs
/// with the lock held (`select_next`'s `state.set_firing`/`callback()`
/// pair above), and a callback that yields would try to re-enter the
/// scheduler while still holding it, which hangs on every port that makes
/// the lock a real mutex (`rtk_port_std::lock`) and corrupts `cur` on one
/// that doesn't.
#[inline]
pub fn yield_now<K: Kernel>() {
    #[cfg(debug_assertions)]
    {
        let guard = crate::klock::lock::<K>();
        debug_assert!(
            K::state().firing(&*guard).is_none(),
            "yield_now called from inside a timer callback: callbacks run \
             with the kernel lock held and must not yield"
        );
    }
    K::ctx_switch();
}

/// The half of the hot loop a [`Port`] implementation drives directly:
/// take the kernel lock, run [`select_next`], record the result as the
/// new `cur`, and hand the chosen task back so the port can perform the
/// actual register/stack switch. This is the only piece of §4.B exposed
/// outside of `rtk_kernel` proper; every concrete `Port::ctx_switch`/
/// `Port::tsk_break` is expected to call it exactly once per invocation
/// (§4.F: "invoke the scheduler's next-runnable search as their only way
/// of picking what runs next").
pub fn pick_next<K: Kernel>() -> &'static Task<K> {
    let mut guard = crate::klock::lock::<K>();
    let mut token = guard.borrow_mut();
    let chosen = select_next::<K>(&mut token);
    K::state().set_current(&mut token, Node::Task(chosen));
    chosen
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::object::{Stack, Task, Timer};
    use crate::testutil::test_kernel;
    use crate::{klock, task, timer};

    fn noop() {}

    test_kernel!(RoundRobin, main = noop);

    static STACK_A: Stack<64> = Stack::new();
    static STACK_B: Stack<64> = Stack::new();
    static STACK_C: Stack<64> = Stack::new();
    static TASK_A: Task<RoundRobin> = Task::new(&STACK_A, noop);
    static TASK_B: Task<RoundRobin> = Task::new(&STACK_B, noop);
    static TASK_C: Task<RoundRobin> = Task::new(&STACK_C, noop);

    /// Scenario 1 (§8), at the selection level: three tasks
    /// started in order land in the queue as `main, A, B, C` (§5: a
    /// newly-started task lands immediately before `cur`, which stays
    /// `main` throughout since nothing has been dispatched yet), and
    /// repeated next-runnable selection round-robins through all four in
    /// that order forever.
    #[test]
    fn round_robin_selection_order() {
        {
            let mut guard = klock::lock::<RoundRobin>();
            let mut tok = guard.borrow_mut();
            RoundRobin::state().boot(&mut tok);
        }

        task::start(&TASK_A);
        task::start(&TASK_B);
        task::start(&TASK_C);

        let main = RoundRobin::state().main_task();
        let label = |chosen: &'static Task<RoundRobin>| -> char {
            if core::ptr::eq(chosen, main) {
                'm'
            } else if core::ptr::eq(chosen, &TASK_A) {
                'A'
            } else if core::ptr::eq(chosen, &TASK_B) {
                'B'
            } else if core::ptr::eq(chosen, &TASK_C) {
                'C'
            } else {
                '?'
            }
        };

        let picks: std::vec::Vec<char> = (0..9).map(|_| label(pick_next::<RoundRobin>())).collect();

        assert_eq!(picks, ['A', 'B', 'C', 'm', 'A', 'B', 'C', 'm', 'A']);
    }

    /// §4.B's DELAYED branch: once a sleeping task's deadline has
    /// elapsed, selection flips it back to `READY` and delivers
    /// `E_SUCCESS`, matching the "Round-trip" law in §8.
    #[test]
    fn delayed_task_wakes_with_e_success() {
        test_kernel!(SleepWake, main = noop);
        static STACK: Stack<64> = Stack::new();
        static SLEEPER: Task<SleepWake> = Task::new(&STACK, noop);

        let mut guard = klock::lock::<SleepWake>();
        let mut tok = guard.borrow_mut();
        SleepWake::state().boot(&mut tok);

        let cur = SleepWake::state().current(&tok);
        rdy_insert(&mut tok, Node::Task(&SLEEPER), Id::Delayed, cur);
        SLEEPER.timer.start.set(&mut tok, 0);
        SLEEPER.timer.delay.set(&mut tok, 5);

        SleepWake::state().tick(&mut tok);
        let _ = select_next::<SleepWake>(&mut tok);
        assert_eq!(SLEEPER.header.id.get(&tok), rtk_core::consts::Id::Delayed);

        // Advance to exactly the deadline (5 ticks total).
        for _ in 0..4 {
            SleepWake::state().tick(&mut tok);
        }
        let _ = select_next::<SleepWake>(&mut tok);
        assert_eq!(SLEEPER.header.id.get(&tok), rtk_core::consts::Id::Ready);
        assert_eq!(SLEEPER.event.get(&tok), rtk_core::consts::E_SUCCESS);
    }

    /// Scenario 2 (§8): a periodic timer with period 10 fires
    /// exactly 10 times over 105 ticks (first fire at tick 10, tenth at
    /// tick 100; tick 105 hasn't reached the eleventh at 110). Ticks are
    /// driven one at a time with a scheduler visit after each, the same
    /// as a task yielding in a tight loop while the ISR fires in the
    /// background; this harness just does both steps explicitly instead
    /// of through a real `Port`.
    #[test]
    fn periodic_timer_fires_every_period() {
        static COUNT: AtomicU32 = AtomicU32::new(0);
        fn on_fire() {
            COUNT.fetch_add(1, Ordering::SeqCst);
        }

        test_kernel!(Periodic, main = noop);
        static TIMER: Timer<Periodic> = Timer::new(Some(on_fire));

        {
            let mut guard = klock::lock::<Periodic>();
            let mut tok = guard.borrow_mut();
            Periodic::state().boot(&mut tok);
        }

        timer::start_periodic(&TIMER, 10);

        for _ in 0..105 {
            let mut guard = klock::lock::<Periodic>();
            let mut tok = guard.borrow_mut();
            Periodic::state().tick(&mut tok);
            let _ = select_next::<Periodic>(&mut tok);
        }

        assert_eq!(COUNT.load(Ordering::SeqCst), 10);
    }

    /// Scenario 3 (§8): `Counter` set to `0xFFFFFFF0`, a one-shot
    /// timer armed via `startUntil(0x00000010)`, 32 ticks away, wrapping
    /// through `u32::MAX`. `take` reports success exactly once, the tick
    /// it actually fires on and never again.
    #[test]
    fn absolute_deadline_wraps_cleanly() {
        test_kernel!(AbsDeadline, main = noop);
        static TIMER: Timer<AbsDeadline> = Timer::new(None);

        {
            let mut guard = klock::lock::<AbsDeadline>();
            let mut tok = guard.borrow_mut();
            AbsDeadline::state().boot(&mut tok);
            AbsDeadline::state().set_time_for_test(&mut tok, 0xFFFF_FFF0);
        }

        timer::start_until(&TIMER, 0x0000_0010);

        for _ in 0..31 {
            let mut guard = klock::lock::<AbsDeadline>();
            let mut tok = guard.borrow_mut();
            AbsDeadline::state().tick(&mut tok);
            let _ = select_next::<AbsDeadline>(&mut tok);
        }
        assert!(timer::take(&TIMER).is_err(), "must not have fired before tick 32");

        {
            let mut guard = klock::lock::<AbsDeadline>();
            let mut tok = guard.borrow_mut();
            AbsDeadline::state().tick(&mut tok);
            let _ = select_next::<AbsDeadline>(&mut tok);
        }
        assert!(timer::take(&TIMER).is_ok(), "must have fired on tick 32");
        assert!(timer::take(&TIMER).is_err(), "one-shot must not fire twice");
    }

    /// §9's open question, resolved: a callback that tries to yield while
    /// firing trips the debug assertion before it ever reaches the port.
    #[test]
    #[should_panic(expected = "must not yield")]
    fn callback_yielding_trips_debug_assertion() {
        fn bad_callback() {
            yield_now::<Misbehaving>();
        }

        test_kernel!(Misbehaving, main = noop);
        static TIMER: Timer<Misbehaving> = Timer::new(Some(bad_callback));

        {
            let mut guard = klock::lock::<Misbehaving>();
            let mut tok = guard.borrow_mut();
            Misbehaving::state().boot(&mut tok);
        }

        timer::start_for(&TIMER, 1);
        let mut guard = klock::lock::<Misbehaving>();
        let mut tok = guard.borrow_mut();
        Misbehaving::state().tick(&mut tok);
        let _ = select_next::<Misbehaving>(&mut tok);
    }
}
