//! Cooperative dispatch realized with OS threads parked one at a time,
//! the same `std::thread::park`/`unpark` technique `r3_port_std::ums`
//! uses to back its (preemptive) simulation, simplified here because this
//! kernel only ever hands off control synchronously at an explicit
//! `ctx_switch`/`tsk_break` call, never from an asynchronous interrupt:
//! there is no "pending dispatch" to arm, just "pick the next task, wake
//! it, sleep".
//!
//! Ordering is the one thing this module has to get exactly right, the
//! same lesson `ums.rs` encodes in its own `yield_now`: always dispatch
//! the *next* thread before parking *this* one. `rtk_kernel::sched::
//! pick_next` takes and releases the kernel lock internally, so by the
//! time [`PortState::dispatch`] runs, no lock is held across the
//! park/unpark handoff: only the bookkeeping mutex in [`Registry`],
//! held just long enough to look up or spawn a thread handle.
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex as StdMutex;

use rtk_core::port::LockState;
use rtk_kernel::cfg::Kernel;
use rtk_kernel::object::Task;
use rtk_kernel::{klock, sched};

use crate::{lock, threading};

/// Opaque per-task context handle (`Port::StackPointer`). This port's
/// "context" is an OS thread, fully described by the registry entry
/// keyed on the task's address; there's nothing additional to carry
/// here, so this is a zero-sized placeholder, present only to satisfy
/// the trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSlot(());

/// Thrown across a `catch_unwind` boundary by [`PortState::tsk_break`] to
/// simulate "abandon this stack, never return" without real stack-pointer
/// manipulation (out of scope per §1 for a hosted port). Carries
/// whether a different task was actually dispatched, so the per-thread
/// trampoline in [`run_task`] knows whether it must park afterward or
/// whether (as when the scheduler re-selects the same, still-sole-ready
/// task) it's already the one meant to keep running.
struct TaskBreak {
    handed_off: bool,
}

thread_local! {
    /// The task this OS thread is currently backing, as a raw address;
    /// `0` for a thread that hasn't been assigned one yet. Set once, at
    /// spawn time, by [`PortState::dispatch`] or [`crate::run::spawn_system`].
    static CURRENT_TASK: Cell<usize> = const { Cell::new(0) };
}

/// Record that the calling OS thread backs `task`, before that thread
/// ever reaches [`PortState::dispatch`]'s own bookkeeping. Used once, by
/// [`crate::run::spawn_system`], to seed the main task's thread identity.
pub(crate) fn bind_current_thread_to<K: Kernel>(task: &'static Task<K>) {
    CURRENT_TASK.with(|c| c.set(task as *const Task<K> as usize));
}

/// The per-thread task-body trampoline (§4.C), exposed so
/// [`crate::run::spawn_system`] can run the main task on the thread it
/// just spawned instead of going through [`PortState::dispatch`] (the
/// main task's thread always exists already: it's whichever one called
/// `spawn_system`).
pub(crate) fn run_main<K: Kernel>(task: &'static Task<K>) -> ! {
    run_task::<K>(task)
}

struct Registry {
    threads: HashMap<usize, threading::Thread>,
}

/// All of this port's process-wide state: the task-to-thread registry.
/// The critical section itself ([`crate::lock`]) is separate global state,
/// not routed through this struct, since `Port::lock`/
/// `unlock` must work even before a task (and hence this registry) has
/// anything in it.
pub struct PortState {
    registry: StdMutex<Registry>,
}

impl PortState {
    pub const fn new() -> Self {
        Self {
            registry: StdMutex::new(Registry { threads: HashMap::new() }),
        }
    }

    #[inline]
    pub fn lock(&self) -> LockState {
        lock::lock()
    }

    /// # Safety
    /// See [`crate::lock::unlock`].
    #[inline]
    pub unsafe fn unlock(&self, state: LockState) {
        unsafe { lock::unlock(state) }
    }

    /// There is no register file or stack to prepare for a thread-backed
    /// task: the first time the scheduler actually dispatches to it,
    /// [`Self::dispatch`] spawns the OS thread lazily, and that thread's
    /// own call stack *is* the context. `entry`/`stack_top` are unused:
    /// the task's current entry point is read fresh out of its `TimerFields`
    /// on every iteration of [`run_task`] instead, the same place `flip`
    /// writes it.
    pub fn ctx_init<K: Kernel>(&self, _stack_top: *mut u8, _entry: fn()) -> ThreadSlot {
        ThreadSlot(())
    }

    pub fn ctx_switch<K: Kernel>(&self) {
        let chosen = sched::pick_next::<K>();
        if !self.dispatch::<K>(chosen) {
            threading::park();
        }
    }

    pub fn tsk_break<K: Kernel>(&self) -> ! {
        let chosen = sched::pick_next::<K>();
        let already_running = self.dispatch::<K>(chosen);
        panic::panic_any(TaskBreak { handed_off: !already_running })
    }

    /// Hand control to `chosen`, spawning its backing thread on first
    /// dispatch or unparking it otherwise. Returns `true` iff `chosen` is
    /// already the calling thread, i.e. the scheduler re-selected
    /// whoever is already running, so there is nothing to wake.
    fn dispatch<K: Kernel>(&self, chosen: &'static Task<K>) -> bool {
        let key = chosen as *const Task<K> as usize;
        if CURRENT_TASK.with(Cell::get) == key {
            return true;
        }

        let mut registry = self.registry.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(thread) = registry.threads.get(&key) {
            thread.unpark();
        } else {
            let handle = threading::spawn("rtk-task", move || {
                CURRENT_TASK.with(|c| c.set(key));
                run_task::<K>(chosen);
            });
            registry.threads.insert(key, handle.thread().clone());
        }
        false
    }
}

/// The body every task-backing OS thread runs (§4.C: "each task is
/// executed as if wrapped in an infinite loop"). A normal return from the
/// entry function is re-entry, handled by simply looping without parking,
/// exactly like the "wrap at context-bootstrap time" option:
/// a task that never yields keeps this thread running with no scheduler
/// visit at all (§4.B: "a task that never yields starves the
/// rest indefinitely"). A `TaskBreak` unwind (from `stop`/`flip`, via
/// `tsk_break`) means the scheduler has already picked whatever runs
/// next by the time it reaches here; this thread parks if that was
/// someone else, or simply loops again if `flip` re-entered this same
/// task.
fn run_task<K: Kernel>(task: &'static Task<K>) -> ! {
    loop {
        let entry = {
            let guard = klock::lock::<K>();
            task.entry(&*guard)
        };

        let Some(entry) = entry else {
            // Stopped with nothing to re-enter. This thread will never be
            // dispatched to again (it was `rdy_remove`d before breaking),
            // so park forever rather than spin.
            loop {
                threading::park();
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(entry)) {
            Ok(()) => continue,
            Err(payload) => match payload.downcast::<TaskBreak>() {
                Ok(brk) => {
                    if brk.handed_off {
                        threading::park();
                    }
                }
                Err(payload) => panic::resume_unwind(payload),
            },
        }
    }
}
