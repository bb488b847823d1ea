//! A thin OS-thread wrapper (grounded on `r3_port_std::threading_unix`'s
//! `park`/`spawn`/`current` trio), trimmed down because this port only
//! ever needs cooperative parking at explicit dispatch points: no
//! signals, no preemption, no interrupt simulation.

use std::thread;

pub use std::thread::{JoinHandle, Thread};

/// Stack size for the *host* OS thread backing each task. Independent of
/// `rtk_kernel::object::OS_STACK_SIZE`, which sizes the (unused, in this
/// port) `Stack<N>` buffer the task object itself carries; see
/// `dispatch::PortState::ctx_init`'s doc comment for why this port
/// doesn't bootstrap a context on that buffer.
pub const HOST_THREAD_STACK_SIZE: usize = 512 * 1024;

#[inline]
pub fn current() -> Thread {
    thread::current()
}

#[inline]
pub fn park() {
    thread::park();
}

/// Spawn a named OS thread backing one task. Panics if the OS refuses:
/// there is no meaningful recovery for a hosted test port that can't get
/// a thread.
pub fn spawn<F: FnOnce() + Send + 'static>(name: &'static str, f: F) -> JoinHandle<()> {
    thread::Builder::new()
        .name(name.to_owned())
        .stack_size(HOST_THREAD_STACK_SIZE)
        .spawn(f)
        .expect("rtk_port_std: failed to spawn a task thread")
}
