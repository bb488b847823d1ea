//! A hosted test port for `rtk` (§1: the CPU-specific context
//! switch, stack bootstrap, and tick ISR are interface-only in that
//! spec; this crate is the one concrete stand-in, built on real OS
//! threads instead of real registers).
//!
//! It is not a bare-metal port and was never meant to ship on a
//! microcontroller; it exists so `rtk_kernel`'s scheduler core has
//! something real to run under `cargo test`, the same role
//! `r3_port_std` plays for `r3_kernel`. Dispatch is realized by parking
//! and unparking whole OS threads one at a time ([`dispatch`]), the
//! technique `r3_port_std::ums` uses for its own (preemptive)
//! simulation; the kernel's critical section becomes a real, reentrant
//! mutex ([`lock`]) since unlike a single embedded core there are
//! genuinely many OS threads to exclude.
//!
//! Applications wire a marker type to this port with [`use_std_port!`]
//! and to a [`rtk_kernel::KernelState`] with
//! [`rtk_kernel::instantiate_kernel!`], then call [`spawn_system`] to
//! boot it.

mod dispatch;
mod lock;
mod run;
pub mod threading;

pub use dispatch::{PortState, ThreadSlot};
pub use run::{spawn_system, spawn_tick_thread, tick};

#[doc(hidden)]
pub use rtk_core;
#[doc(hidden)]
pub use rtk_kernel;

/// Implement [`rtk_core::port::Port`] for `$marker` using this crate's
/// thread-parking dispatch (§4.F). Mirrors `r3_port_std::use_port!`:
/// generates a private module holding the one [`PortState`] this marker
/// type delegates every port operation to.
///
/// ```ignore
/// rtk_kernel::instantiate_kernel!(MyKernel, freq = 1000, main = main_entry);
/// rtk_port_std::use_std_port!(MyKernel);
/// ```
#[macro_export]
macro_rules! use_std_port {
    ($marker:ident) => {
        #[doc(hidden)]
        mod rtk_port_std_impl {
            use super::$marker;

            static PORT_STATE: $crate::PortState = $crate::PortState::new();

            unsafe impl $crate::rtk_core::port::Port for $marker {
                type StackPointer = $crate::ThreadSlot;

                #[inline]
                fn lock() -> $crate::rtk_core::port::LockState {
                    PORT_STATE.lock()
                }

                #[inline]
                unsafe fn unlock(state: $crate::rtk_core::port::LockState) {
                    unsafe { PORT_STATE.unlock(state) }
                }

                #[inline]
                fn ctx_switch() {
                    PORT_STATE.ctx_switch::<$marker>()
                }

                #[inline]
                fn tsk_break() -> ! {
                    PORT_STATE.tsk_break::<$marker>()
                }

                #[inline]
                fn ctx_init(stack_top: *mut u8, entry: fn()) -> Self::StackPointer {
                    PORT_STATE.ctx_init::<$marker>(stack_top, entry)
                }
            }
        }
    };
}
