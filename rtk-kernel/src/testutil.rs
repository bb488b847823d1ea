//! Deterministic, single-threaded test harness.
//!
//! Most of this crate's blocking operations (`join`, `wait`, `mtx_wait`,
//! `flg_wait`, `bar_wait`, `tmr_wait`, the spin branch of `bar_wait`) only
//! make sense with a real concurrent task to hand control to; that half
//! is exercised by `rtk_port_std`'s integration tests, which run on real
//! OS threads. Everything else (ready-queue ordering, timer arming and
//! firing, non-blocking mutex/event-flag operations, `give`/`resume`
//! bookkeeping) is pure logic over `KernelState` and can be driven
//! directly by calling `sched::select_next`/`sched::rdy_insert` and the
//! lifecycle functions that never yield, without a `Port` that can
//! actually switch stacks.
//!
//! `test_kernel!` wires up a marker type for exactly that: its
//! `lock`/`unlock` are real no-ops (this harness only ever has one logical
//! thread of control), and its `ctx_switch`/`tsk_break` panic: a guard
//! rail catching a test that accidentally takes a path this harness can't
//! support.
#![cfg(test)]

/// Declare a marker type `$marker` with a backing `KernelState` and main
/// task (via [`crate::instantiate_kernel!`]), plus a [`rtk_core::port::Port`]
/// impl suited to single-threaded, no-real-yield testing.
macro_rules! test_kernel {
    ($marker:ident, main = $entry:expr) => {
        $crate::instantiate_kernel!($marker, freq = 1, main = $entry);

        unsafe impl rtk_core::port::Port for $marker {
            type StackPointer = ();

            fn lock() -> rtk_core::port::LockState {
                rtk_core::port::LockState(0)
            }

            unsafe fn unlock(_state: rtk_core::port::LockState) {}

            fn ctx_switch() {
                unreachable!(
                    "test_kernel harness is single-threaded: drive sched::select_next directly instead of yielding"
                )
            }

            fn tsk_break() -> ! {
                unreachable!(
                    "test_kernel harness is single-threaded: drive sched::select_next directly instead of stopping/flipping"
                )
            }

            fn ctx_init(_stack_top: *mut u8, _entry: fn()) -> Self::StackPointer {}
        }
    };
}

pub(crate) use test_kernel;
