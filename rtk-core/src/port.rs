//! The port contract (§4.F, §6 "Port surface").
//!
//! Everything in this module is interface-only per §1: the
//! CPU-specific context save/restore, the stack bootstrap, and the tick
//! timer's ISR plumbing are named here but never implemented in this
//! workspace. `rtk_port_std` is the one concrete implementor, and it's a
//! hosted stand-in built on OS threads, not a real bare-metal port.

/// The previous interrupt-enable state, returned by [`Port::lock`] and fed
/// back to [`Port::unlock`]. Opaque to everything except the port: nesting
/// is "permitted via save-and-restore" (§4.F), which only works if callers
/// never inspect or fabricate a `LockState` themselves.
#[derive(Debug, Clone, Copy)]
pub struct LockState(pub usize);

/// A saved stack pointer, opaque outside of the port that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackPointer(pub usize);

/// The five operations that constitute the entire portability boundary
/// (§4.F, §6). A port is a single implementor of this trait, chosen once
/// per binary by `rtk_kernel::instantiate_kernel!`.
///
/// # Safety
///
/// Implementors must provide a *reversible* critical section: `lock`
/// disables interrupts (or otherwise excludes the tick ISR) and returns
/// enough state for `unlock` to restore exactly the prior state, including
/// when locks nest. `ctx_switch` and `tsk_break` must not return to their
/// caller with the kernel lock still held, and must invoke the scheduler's
/// next-runnable search (`rtk_kernel::sched`) as their only way of picking
/// what runs next.
pub unsafe trait Port: 'static + Sized {
    type StackPointer: Copy + Send;

    /// Disable interrupts (or otherwise enter the kernel's critical
    /// section) and return a token that restores the prior state.
    fn lock() -> LockState;

    /// Restore the interrupt state captured by a matching [`Port::lock`].
    ///
    /// # Safety
    /// `state` must be the value a preceding, still-active `lock()` call
    /// on this port returned, and must not have already been consumed by a
    /// prior `unlock`.
    unsafe fn unlock(state: LockState);

    /// Save the calling task's register file and stack pointer, run the
    /// scheduler's next-runnable search, and restore the chosen task's
    /// context. Returns once this task is chosen to run again.
    fn ctx_switch();

    /// Abandon the caller's stack and current register state outright,
    /// re-bootstrap the current task's context at its entry point, and run
    /// the scheduler's next-runnable search. Used by `flip`/`stop`, where
    /// there is nothing worth saving. Never returns.
    fn tsk_break() -> !;

    /// Prepare a fresh context for a task whose stack top is `stack_top`
    /// and whose first instruction is `entry`, such that a subsequent
    /// `ctx_switch` selecting this task resumes execution at `entry` with
    /// that stack.
    fn ctx_init(stack_top: *mut u8, entry: fn()) -> Self::StackPointer;
}
