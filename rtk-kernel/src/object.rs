//! The shared schedulable-object data model (§3).
//!
//! The source kernel gets away with "a task is a timer with extra fields
//! glued on" by relying on C structure layout: the scheduler's hot loop
//! reads `{id, prev, next, start, delay, period, state}` through a `Timer*`
//! regardless of whether the underlying object is actually a `Task`. Rust
//! has no structural subtyping, so this crate takes the option the design
//! notes call out explicitly: a tagged enum of `'static` references
//! ([`Node`]) plus an explicit header projection, rather than unsafe
//! pointer-cast trickery. Both arms carry the exact same [`ObjectHeader`]
//! and [`TimerFields`] substructures, so the scheduler loop in
//! `rtk_kernel` reads them uniformly through [`Node::header`] and
//! [`Node::timer`] without ever needing to know which concrete type it
//! holds except at the two or three points (`DELAYED -> READY`, timer
//! firing) where the behavior actually differs.
//!
//! Every mutable field here lives in a [`KCell`](crate::klock::KCell)
//! rather than a bare `Cell`. Nothing in this module can be read or
//! written without presenting proof the kernel lock is held (§5).
use core::fmt;
use core::marker::PhantomData;

use rtk_core::consts::{Event, Id, Tick};
use rtk_core::init::Init;
use rtk_core::port::Port;

use crate::klock::KCell;

/// The header every schedulable object carries (§3 "Common header").
///
/// `prev`/`next` are meaningless while `id == Stopped` (invariant 4 in
/// §8). Callers must not read them in that state, which is why
/// they are only ever read from inside `rtk_kernel`'s ready-queue module
/// under the kernel lock.
pub struct ObjectHeader<P: Port> {
    pub id: KCell<P, Id>,
    pub prev: KCell<P, Option<Node<P>>>,
    pub next: KCell<P, Option<Node<P>>>,
}

impl<P: Port> Init for ObjectHeader<P> {
    const INIT: Self = Self {
        id: KCell::new(Id::Stopped),
        prev: KCell::new(None),
        next: KCell::new(None),
    };
}

impl<P: Port> fmt::Debug for ObjectHeader<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeader").field("self", &(self as *const _)).finish()
    }
}

/// The fields a timer owns, and which a task carries as the prefix of its
/// own layout (§3 "Task extends Timer layout").
pub struct TimerFields<P> {
    /// Monotonic fire counter; observers snapshot it to detect a firing
    /// without racing (`tmr_take`/`tmr_wait`).
    pub signal: KCell<P, u32>,
    /// The callback invoked by the scheduler loop when this timer fires.
    /// `None` means "no callback" (a pure delay object).
    pub callback: KCell<P, Option<fn()>>,
    /// Tick value captured at (re)arm time.
    pub start: KCell<P, Tick>,
    /// Ticks until the next expiration, counted from `start`.
    pub delay: KCell<P, Tick>,
    /// Ticks between subsequent firings. `0` means one-shot.
    pub period: KCell<P, Tick>,
}

impl<P> Init for TimerFields<P> {
    const INIT: Self = Self {
        signal: KCell::new(0),
        callback: KCell::new(None),
        start: KCell::new(0),
        delay: KCell::new(0),
        period: KCell::new(0),
    };
}

impl<P> fmt::Debug for TimerFields<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerFields").field("self", &(self as *const _)).finish()
    }
}

/// A private stack region for a [`Task`]. Declared as its own `static` so
/// that it can be sized per-task (`static_task!` defaults to
/// [`OS_STACK_SIZE`] when the caller doesn't specify one) without making
/// `Task` itself generic over a size: `Task` only ever stores the
/// resulting top-of-stack pointer (§3: "immovable after construction").
#[repr(align(8))]
pub struct Stack<const N: usize>(core::cell::UnsafeCell<[u8; N]>);

// Safety: the buffer is only ever touched through the stack pointer handed
// to the port's context-switch machinery, under the kernel lock's
// single-writer discipline, exactly like every other kernel object here.
unsafe impl<const N: usize> Sync for Stack<N> {}

impl<const N: usize> Stack<N> {
    pub const fn new() -> Self {
        Self(core::cell::UnsafeCell::new([0; N]))
    }

    /// The address one past the last byte of the region: the initial
    /// stack pointer for a full-descending-stack port, computed without
    /// ever forming a live reference to the (not-yet-initialized) buffer.
    pub const fn top(&self) -> *mut u8 {
        (self.0.get() as *mut u8).wrapping_add(N)
    }
}

impl<const N: usize> Default for Stack<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The default stack size for `static_task!` when the caller doesn't
/// specify one (§6).
pub const OS_STACK_SIZE: usize = 1024;

/// A task (§3 "Task extends Timer layout").
pub struct Task<P: Port> {
    pub header: ObjectHeader<P>,
    pub timer: TimerFields<P>,
    /// Wait mask while waiting (`tsk_wait`); wakeup value once a sleep
    /// completes. Overloaded meaning is deliberate (§3, glossary "Event").
    pub event: KCell<P, Event>,
    /// Saved stack pointer, valid while the task is not the running task.
    pub sp: KCell<P, Option<P::StackPointer>>,
    /// Top of the task's private stack, fixed at construction.
    pub stack_top: *mut u8,
    _port: PhantomData<P>,
}

// Safety: `stack_top` is a plain address, never dereferenced outside of
// `rtk_kernel`'s port glue, which only runs with the kernel lock held.
unsafe impl<P: Port> Sync for Task<P> {}

impl<P: Port> Task<P> {
    /// Construct a task bound to `stack` with initial entry point `entry`.
    /// The header starts `Stopped`, matching §6's "static and local
    /// construction variants must both produce a correctly initialized
    /// header with `id=STOPPED`, `prev=next=null`, `signal=0`".
    pub const fn new<const N: usize>(stack: &'static Stack<N>, entry: fn()) -> Self {
        let timer = TimerFields {
            callback: KCell::new(Some(entry)),
            ..TimerFields::INIT
        };
        Self {
            header: ObjectHeader::INIT,
            timer,
            event: KCell::new(0),
            sp: KCell::new(None),
            stack_top: stack.top(),
            _port: PhantomData,
        }
    }

    /// The task's current entry point (`state`, in this kernel's naming). Both
    /// `startFrom` and `flip` rewrite this; task bodies may also read it to
    /// implement self-dispatch.
    #[inline]
    pub fn entry<K: tokenlock::Token<crate::klock::KLockTag<P>>>(&self, token: &K) -> Option<fn()> {
        self.timer.callback.get(token)
    }
}

impl<P: Port> fmt::Debug for Task<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("self", &(self as *const _)).finish()
    }
}

/// A timer (§3).
pub struct Timer<P: Port> {
    pub header: ObjectHeader<P>,
    pub timer: TimerFields<P>,
    /// Watermark for `timer::take`: the `signal` value last observed by a
    /// successful poll (see `crate::timer::take`'s doc comment for why
    /// this lives here rather than on the caller).
    pub(crate) taken: KCell<P, u32>,
}

unsafe impl<P: Port> Sync for Timer<P> {}

impl<P: Port> Timer<P> {
    pub const fn new(callback: Option<fn()>) -> Self {
        Self {
            header: ObjectHeader::INIT,
            timer: TimerFields {
                callback: KCell::new(callback),
                ..TimerFields::INIT
            },
            taken: KCell::new(0),
        }
    }
}

impl<P: Port> fmt::Debug for Timer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer").field("self", &(self as *const _)).finish()
    }
}

/// A reference to anything that can sit in the ready queue: a task or a
/// timer. This is the enum-of-`'static`-references encoding of the
/// "task-is-a-timer" layout trick described in the design notes: safe
/// Rust, no pointer casts, and the scheduler loop in `rtk_kernel` only
/// ever needs [`Node::header`] and [`Node::timer`] to drive the
/// next-runnable search (§4.B).
pub enum Node<P: Port> {
    Task(&'static Task<P>),
    Timer(&'static Timer<P>),
}

impl<P: Port> Clone for Node<P> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<P: Port> Copy for Node<P> {}

impl<P: Port> PartialEq for Node<P> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Task(a), Node::Task(b)) => core::ptr::eq(*a, *b),
            (Node::Timer(a), Node::Timer(b)) => core::ptr::eq(*a, *b),
            _ => false,
        }
    }
}
impl<P: Port> Eq for Node<P> {}

impl<P: Port> fmt::Debug for Node<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Task(t) => f.debug_tuple("Node::Task").field(&(*t as *const _)).finish(),
            Node::Timer(t) => f.debug_tuple("Node::Timer").field(&(*t as *const _)).finish(),
        }
    }
}

impl<P: Port> Node<P> {
    #[inline]
    pub fn header(self) -> &'static ObjectHeader<P> {
        match self {
            Node::Task(t) => &t.header,
            Node::Timer(t) => &t.header,
        }
    }

    #[inline]
    pub fn timer(self) -> &'static TimerFields<P> {
        match self {
            Node::Task(t) => &t.timer,
            Node::Timer(t) => &t.timer,
        }
    }

    #[inline]
    pub fn id<K: tokenlock::Token<crate::klock::KLockTag<P>>>(self, token: &K) -> Id {
        self.header().id.get(token)
    }

    #[inline]
    pub fn as_task(self) -> Option<&'static Task<P>> {
        match self {
            Node::Task(t) => Some(t),
            Node::Timer(_) => None,
        }
    }

    #[inline]
    pub fn as_timer(self) -> Option<&'static Timer<P>> {
        match self {
            Node::Timer(t) => Some(t),
            Node::Task(_) => None,
        }
    }
}

impl<P: Port> From<&'static Task<P>> for Node<P> {
    fn from(task: &'static Task<P>) -> Self {
        Node::Task(task)
    }
}

impl<P: Port> From<&'static Timer<P>> for Node<P> {
    fn from(timer: &'static Timer<P>) -> Self {
        Node::Timer(timer)
    }
}
