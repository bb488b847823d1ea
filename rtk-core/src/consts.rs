//! ABI-level constants (§6 of the design: "values are part of the
//! contract"). Every one of these is load-bearing: user code is allowed to
//! compare against them directly, so they must never be renumbered.

use crate::init::Init;

/// A tick count or duration, in ticks. Arithmetic on `Tick` wraps modulo
/// 2^32, which is the only sound way to compare deadlines on a counter this
/// narrow (see [`crate::time`]).
pub type Tick = u32;

/// "Already due": a `delay` of zero is always elapsed.
pub const IMMEDIATE: Tick = 0;

/// "Never": a `delay` of `INFINITE` can never satisfy the elapsed test in
/// [`crate::object`]'s wrap-around arithmetic, by construction: incrementing
/// `elapsed` can never catch up to `Tick::MAX` ticks in a single pass of the
/// scheduler loop.
pub const INFINITE: Tick = Tick::MAX;

/// An "event" word: either a wait mask (while waiting) or a wakeup value
/// (once delivered). See [`crate::object::Task`].
pub type Event = u32;

/// Returned by a sleep/wait that completed without an explicit wakeup value.
pub const E_SUCCESS: Event = 0;

/// The sentinel failure value: all bits set.
pub const E_FAILURE: Event = Event::MAX;

/// Lifecycle tag shared by every schedulable object (§3: `Object.id`).
///
/// `STOPPED = 0`, `READY = 1`, `DELAYED = 2`, `TIMER = 3`; the numeric
/// values are part of the ABI, matching the source kernel's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Id {
    /// Not enqueued. `prev`/`next` must not be dereferenced in this state.
    Stopped = 0,
    /// Enqueued, eligible to run immediately.
    Ready = 1,
    /// Enqueued, a task sleeping until its timeout elapses.
    Delayed = 2,
    /// Enqueued, a timer counting down to its next firing.
    Timer = 3,
}

impl Init for Id {
    const INIT: Self = Id::Stopped;
}

impl Id {
    /// `true` for the two states the next-runnable loop treats as "still
    /// counting down" (§4.B: `DELAYED` and `TIMER`).
    #[inline]
    pub const fn is_counting_down(self) -> bool {
        matches!(self, Id::Delayed | Id::Timer)
    }
}
