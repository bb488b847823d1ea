//! Per-binary kernel wiring (§3 "System singleton", §6 construction).
//!
//! Mirrors `r3_kernel`'s `KernelTraits`: a zero-sized marker type, local to
//! whatever crate instantiates the kernel, that names the one
//! [`KernelState`] a binary carries. [`crate::instantiate_kernel!`]
//! generates both the marker type and its [`Kernel`] impl; a port crate
//! separately implements [`rtk_core::port::Port`] on that same marker type
//! (see `rtk_port_std::use_std_port!`), so neither impl has to live in a
//! crate that doesn't own the marker type, the usual way a `KernelTraits`
//! + `PortThreading` pair gets stitched together in this family of kernels.
use rtk_core::port::Port;

use crate::state::KernelState;

/// Implemented by the marker type [`crate::instantiate_kernel!`] declares.
/// Lets the rest of `rtk_kernel` say "the running kernel" instead of
/// threading a `&'static KernelState<P>` through every call.
pub trait Kernel: Port {
    fn state() -> &'static KernelState<Self>;
}
