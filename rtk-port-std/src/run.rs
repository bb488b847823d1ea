//! Bootstrapping a kernel instance onto this port (§3 "System singleton"
//! boot, plus the tick ISR's stand-in: §1 classifies both as external
//! collaborators this workspace doesn't implement for real hardware, but
//! a hosted port needs *some* concrete driver).

use std::time::Duration;

use rtk_kernel::cfg::Kernel;

use crate::threading::{self, JoinHandle};

/// Link `K`'s main task to itself and mark it `READY` (`KernelState::
/// boot`, §3), then run it to completion on a freshly spawned OS thread,
/// dispatching every other task the scheduler selects along the way.
///
/// Returns a [`JoinHandle`] immediately; the spawned thread does not
/// itself return once the main task parks forever (the common outcome:
/// most end-to-end scenarios end by `stop`-ping every task they started,
/// and this port has no global shutdown protocol, matching the source's
/// "no general cancellation" stance, §5). Tests poll shared state with a
/// bounded wait instead of joining.
pub fn spawn_system<K: Kernel>() -> JoinHandle<()> {
    let main = K::state().main_task();
    threading::spawn("rtk-main", move || {
        crate::dispatch::bind_current_thread_to::<K>(main);
        {
            let mut guard = rtk_kernel::klock::lock::<K>();
            let mut tok = guard.borrow_mut();
            K::state().boot(&mut tok);
        }
        crate::dispatch::run_main::<K>(main);
    })
}

/// Advance `K`'s tick counter by one (the tick ISR's entire job, §4.A/
/// §4.B: "increments `cnt` only"). Safe to call from any thread,
/// including a dedicated tick-driving thread spawned by
/// [`spawn_tick_thread`] or directly from a test orchestrating ticks by
/// hand (§8 scenario 2/3 both advance time this way).
pub fn tick<K: Kernel>() {
    let mut guard = rtk_kernel::klock::lock::<K>();
    let mut tok = guard.borrow_mut();
    K::state().tick(&mut tok);
}

/// Spawn a background thread that calls [`tick`] once every `period`,
/// for applications that want wall-clock-driven ticking rather than
/// manually stepping time (as most of this port's own tests do, for
/// determinism). Detached: dropping the handle lets it keep running.
pub fn spawn_tick_thread<K: Kernel>(period: Duration) -> JoinHandle<()> {
    threading::spawn("rtk-tick", move || loop {
        std::thread::sleep(period);
        tick::<K>();
    })
}
