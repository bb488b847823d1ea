//! The rtk cooperative scheduler core.
//!
//! This crate holds everything `rtk_core` deliberately leaves out: the
//! schedulable-object control blocks ([`object`]), the kernel lock
//! ([`klock`]), the ready queue and next-runnable search ([`sched`]), the
//! task ([`task`]) and timer ([`timer`]) lifecycle operations, the
//! synchronization primitives ([`mutex`], [`event_flags`], [`barrier`]),
//! and the per-binary wiring macro ([`cfg`]) that binds all of the above
//! to one concrete [`rtk_core::port::Port`] implementation.
//!
//! Mirrors `r3_kernel`'s role relative to `r3_core`: the portable crate
//! describes the contract, this crate is the one concrete scheduler that
//! satisfies it.
#![cfg_attr(not(test), no_std)]

#[doc(hidden)]
pub use rtk_core;

pub mod klock;
pub mod object;

#[macro_use]
mod macros;

pub mod barrier;
pub mod cfg;
pub mod event_flags;
pub mod mutex;
pub mod sched;
pub mod state;
pub mod task;
pub mod timer;

#[cfg(test)]
mod testutil;

pub use cfg::Kernel;
pub use object::{Node, ObjectHeader, Stack, Task, Timer, TimerFields, OS_STACK_SIZE};
pub use state::KernelState;
