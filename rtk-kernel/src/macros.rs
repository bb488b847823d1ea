//! Static construction macros (§6 "Construction macros / builders").
//!
//! These are the user-facing sugar around [`crate::object::Task`] /
//! [`crate::object::Timer`]; the equivalent of `r3_core::kernel::cfg`'s
//! object builders, simplified because there is exactly one `System` per
//! binary (§3) rather than a const-generic, multi-instance configuration
//! surface. Both macros produce a `static` pair (the backing [`Stack`] plus
//! the object itself, for tasks) with a correctly zeroed header, matching
//! §6's requirement that static and local construction both yield
//! `id=STOPPED, prev=next=null, signal=0`.
//!
//! [`Stack`]: crate::object::Stack

/// Declare a static task with an initial entry point and, optionally, a
/// stack size (defaults to [`crate::object::OS_STACK_SIZE`]).
///
/// ```ignore
/// static_task!(static MY_TASK: Task<MyPort> = my_entry);
/// static_task!(static MY_TASK: Task<MyPort> = my_entry, stack = 2048);
/// ```
#[macro_export]
macro_rules! static_task {
    (static $name:ident: Task<$port:ty> = $entry:expr) => {
        $crate::static_task!(static $name: Task<$port> = $entry, stack = $crate::object::OS_STACK_SIZE);
    };
    (static $name:ident: Task<$port:ty> = $entry:expr, stack = $size:expr) => {
        $crate::rtk_core::paste::paste! {
            static [<$name _STACK>]: $crate::object::Stack<{ $size }> =
                $crate::object::Stack::new();
            static $name: $crate::object::Task<$port> =
                $crate::object::Task::new(&[<$name _STACK>], $entry);
        }
    };
}

/// Declare a static timer with an optional initial callback (`None` means
/// a pure delay object with no callback, per §3).
///
/// ```ignore
/// static_timer!(static MY_TIMER: Timer<MyPort> = Some(my_callback));
/// static_timer!(static MY_TIMER: Timer<MyPort> = None);
/// ```
#[macro_export]
macro_rules! static_timer {
    (static $name:ident: Timer<$port:ty> = $callback:expr) => {
        static $name: $crate::object::Timer<$port> = $crate::object::Timer::new($callback);
    };
}

/// Declare a static mutex (§3 "Mutex"), initially free.
///
/// ```ignore
/// static_mutex!(static MY_MUTEX: Mutex<MyPort>);
/// ```
#[macro_export]
macro_rules! static_mutex {
    (static $name:ident: Mutex<$port:ty>) => {
        static $name: $crate::mutex::Mutex<$port> = $crate::mutex::Mutex::new();
    };
}

/// Declare a static event-flag set (§3 "Event flag set"), initially clear.
///
/// ```ignore
/// static_event_flags!(static MY_FLAGS: EventFlags<MyPort>);
/// ```
#[macro_export]
macro_rules! static_event_flags {
    (static $name:ident: EventFlags<$port:ty>) => {
        static $name: $crate::event_flags::EventFlags<$port> = $crate::event_flags::EventFlags::new();
    };
}

/// Declare a static barrier (§3 "Barrier") with the given arrival `limit`.
///
/// ```ignore
/// static_barrier!(static MY_BARRIER: Barrier<MyPort> = 3);
/// ```
#[macro_export]
macro_rules! static_barrier {
    (static $name:ident: Barrier<$port:ty> = $limit:expr) => {
        static $name: $crate::barrier::Barrier<$port> = $crate::barrier::Barrier::new($limit);
    };
}

/// Wire a marker type to a [`crate::state::KernelState`] and its main
/// task (§3 "System singleton"). Owns exactly the per-binary wiring;
/// the matching [`rtk_core::port::Port`] impl for the same marker type
/// is supplied separately by a port crate (see
/// `rtk_port_std::use_std_port!`), since the two are independent axes
/// (one `Port` implementation can back many kernel configurations, and
/// this macro doesn't need to know which one a given binary picked).
///
/// `freq` becomes the marker's [`rtk_core::time::TickFrequency::HZ`], so
/// the `USEC!`/`MSEC!`/`SEC!`/`MIN!`/`HOUR!` macros can convert against it.
///
/// ```ignore
/// instantiate_kernel!(MyKernel, freq = 1000, main = main_entry);
/// instantiate_kernel!(MyKernel, freq = 1000, main = main_entry, stack = 4096);
/// ```
#[macro_export]
macro_rules! instantiate_kernel {
    ($marker:ident, freq = $freq:expr, main = $entry:expr) => {
        $crate::instantiate_kernel!(
            $marker,
            freq = $freq,
            main = $entry,
            stack = $crate::object::OS_STACK_SIZE
        );
    };
    ($marker:ident, freq = $freq:expr, main = $entry:expr, stack = $size:expr) => {
        $crate::rtk_core::paste::paste! {
            /// Per-binary kernel marker, generated by `instantiate_kernel!`.
            pub struct $marker;

            static [<$marker _MAIN_STACK>]: $crate::object::Stack<{ $size }> =
                $crate::object::Stack::new();
            static [<$marker _MAIN_TASK>]: $crate::object::Task<$marker> =
                $crate::object::Task::new(&[<$marker _MAIN_STACK>], $entry);
            static [<$marker _STATE>]: $crate::KernelState<$marker> =
                $crate::KernelState::new(&[<$marker _MAIN_TASK>]);

            impl $crate::Kernel for $marker {
                #[inline]
                fn state() -> &'static $crate::KernelState<Self> {
                    &[<$marker _STATE>]
                }
            }

            impl $crate::rtk_core::time::TickFrequency for $marker {
                const HZ: u32 = $freq;
            }
        }
    };
}

