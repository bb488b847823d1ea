//! "Give clears wait" (§8): task W calls `flg_wait(0b011, all)`;
//! task G calls `flg_give(0b001)` then `flg_give(0b010)`; W's wait only
//! returns once both bits have actually been given, on separate real
//! scheduler visits, not just because the two bits happened to be given
//! in a single `give` call.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use rtk_kernel::event_flags::EventFlags;
use rtk_kernel::{instantiate_kernel, static_event_flags, static_task};
use rtk_port_std::use_std_port;

static WAITER_DONE: (Mutex<bool>, Condvar) = (Mutex::new(false), Condvar::new());

fn main_entry() {
    rtk_kernel::task::start(&WAITER);
    rtk_kernel::task::start(&GIVER);
    loop {
        rtk_kernel::task::yield_now::<FlagsDemo>();
    }
}

instantiate_kernel!(FlagsDemo, freq = 1000, main = main_entry);
use_std_port!(FlagsDemo);

static_event_flags!(static FLAGS: EventFlags<FlagsDemo>);
static_task!(static WAITER: Task<FlagsDemo> = waiter_body);
static_task!(static GIVER: Task<FlagsDemo> = giver_body);

fn waiter_body() {
    FLAGS.wait(0b011, true);

    let (lock, cvar) = &WAITER_DONE;
    *lock.lock().unwrap() = true;
    cvar.notify_all();
    rtk_kernel::task::stop::<FlagsDemo>();
}

fn giver_body() {
    // Give one bit, let the waiter observe a still-unsatisfied residual,
    // then give the other: the two-step delivery the single-`give`-call
    // version of this test (in `rtk_kernel::event_flags`) never exercises.
    FLAGS.give(0b001);
    rtk_kernel::task::yield_now::<FlagsDemo>();
    rtk_kernel::task::yield_now::<FlagsDemo>();

    FLAGS.give(0b010);
    rtk_kernel::task::stop::<FlagsDemo>();
}

#[test]
fn wait_all_unblocks_once_every_bit_has_been_given() {
    let _handle = rtk_port_std::spawn_system::<FlagsDemo>();

    let (lock, cvar) = &WAITER_DONE;
    let guard = lock.lock().unwrap();
    let (_guard, timed_out) = cvar
        .wait_timeout_while(guard, Duration::from_secs(5), |done| !*done)
        .unwrap();
    assert!(!timed_out.timed_out(), "waiter never observed both flags");
}
