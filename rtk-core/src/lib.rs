//! Portable surface of the `rtk` cooperative kernel.
//!
//! This crate carries everything that is meaningful both to the kernel
//! implementation (`rtk_kernel`) and to a concrete port: the status codes
//! and constants that form the kernel's ABI (see [`consts`]), the
//! tick/duration vocabulary (see [`time`]), the two-value error model (see
//! [`error`]), the const-initialization vocabulary (see [`init`]), and the
//! port contract itself (see [`port`]). It contains no scheduling logic and
//! no object model: the ready queue, the schedulable object headers, and
//! the synchronization primitives all live in `rtk_kernel`, the same way
//! `r3_core` carries only the portable trait contracts while `r3_kernel`
//! carries the actual control blocks.
#![cfg_attr(not(test), no_std)]

pub mod consts;
pub mod error;
pub mod init;
pub mod port;
pub mod time;

#[doc(hidden)]
pub use paste;

pub use consts::{Id, E_FAILURE, E_SUCCESS, IMMEDIATE, INFINITE};
pub use error::Error;
pub use init::Init;
pub use port::{LockState, Port, StackPointer};
pub use time::{Event, Tick};
