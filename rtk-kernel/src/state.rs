//! The system singleton (§3 "System singleton").
//!
//! One [`KernelState`] exists per binary, allocated as a `static` by
//! [`crate::instantiate_kernel!`] alongside the main task it anchors the
//! ready queue on. Everything it stores is behind a [`KCell`], so reading
//! or advancing it requires a [`KToken`](crate::klock::KToken), i.e. the
//! kernel lock.
use core::cell::Cell;

use rtk_core::consts::{Id, Tick};

use crate::klock::{KCell, KLockTag};
use crate::object::{Node, Task};
use rtk_core::port::Port;

pub struct KernelState<P: Port> {
    main_task: &'static Task<P>,
    cur: KCell<P, Node<P>>,
    cnt: KCell<P, Tick>,
    /// The timer currently being fired by `sched::select_next`, or `None`
    /// outside of a firing. Lets a timer callback (a bare `fn()`, per §6's
    /// callback ABI) discover "the timer being fired" without the scheduler
    /// having to pass it as a parameter (design notes, "current as a
    /// process-wide mutable" / callback `cur` aliasing).
    firing: KCell<P, Option<Node<P>>>,
    /// Address of the `KTokenRefMut` `select_next` is holding while a
    /// firing callback runs, or null outside of one. Not a `KCell`: the
    /// point of this field is to give `timer::flip`/`rearm`/`set_period`
    /// a way to reach that exact token without a second one, so gating it
    /// behind a token would be circular. `select_next` sets it immediately
    /// before calling the callback and clears it immediately after, so it
    /// never points past the call chain that set it.
    firing_token: Cell<*mut ()>,
}

// Safety: every `KCell` field only yields its contents to a caller holding
// the kernel lock (a `KToken`); the kernel's single-writer discipline (§5)
// is what actually protects concurrent access, exactly as for `Task`/
// `Timer` above. `firing_token` isn't a `KCell`, but it's written only by
// `select_next` for the span of a single callback call, on the same stack
// that holds the real token, and read only by code that call reaches; the
// same single-writer discipline covers it.
unsafe impl<P: Port> Sync for KernelState<P> {}

impl<P: Port> KernelState<P> {
    pub const fn new(main_task: &'static Task<P>) -> Self {
        Self {
            main_task,
            cur: KCell::new(Node::Task(main_task)),
            cnt: KCell::new(0),
            firing: KCell::new(None),
            firing_token: Cell::new(core::ptr::null_mut()),
        }
    }

    /// Link the main task to itself and mark it `READY` (§3: "The main
    /// task is permanently linked to itself at boot"). Must be called
    /// exactly once, before any other kernel operation, by whatever runs
    /// first on the boot stack.
    pub fn boot<K: tokenlock::Token<KLockTag<P>>>(&'static self, token: &mut K) {
        let node = Node::Task(self.main_task);
        self.main_task.header.prev.set(token, Some(node));
        self.main_task.header.next.set(token, Some(node));
        self.main_task.header.id.set(token, Id::Ready);
        self.cur.set(token, node);
    }

    pub fn main_task(&self) -> &'static Task<P> {
        self.main_task
    }

    /// `sys_time` (§4.A): read the tick counter under the kernel lock.
    #[inline]
    pub fn time<K: tokenlock::Token<KLockTag<P>>>(&self, token: &K) -> Tick {
        self.cnt.get(token)
    }

    /// The tick ISR entry (§4.B "Tick ISR"): increments `cnt` only. Does
    /// not walk the queue and does not wake tasks.
    #[inline]
    pub fn tick<K: tokenlock::Token<KLockTag<P>>>(&self, token: &mut K) {
        let cnt = self.cnt.get(token);
        self.cnt.set(token, cnt.wrapping_add(1));
    }

    /// Seed the tick counter directly, bypassing the one-at-a-time ISR
    /// path. Test-only: the wraparound scenario in §8 ("Set
    /// Counter to 0xFFFFFFF0") would otherwise need billions of real
    /// `tick()` calls to reach.
    #[cfg(test)]
    pub(crate) fn set_time_for_test<K: tokenlock::Token<KLockTag<P>>>(
        &self,
        token: &mut K,
        value: Tick,
    ) {
        self.cnt.set(token, value);
    }

    #[inline]
    pub fn current<K: tokenlock::Token<KLockTag<P>>>(&self, token: &K) -> Node<P> {
        self.cur.get(token)
    }

    #[inline]
    pub(crate) fn set_current<K: tokenlock::Token<KLockTag<P>>>(
        &self,
        token: &mut K,
        node: Node<P>,
    ) {
        self.cur.set(token, node);
    }

    /// The timer `sched::select_next` is in the middle of firing, if any.
    #[inline]
    pub fn firing<K: tokenlock::Token<KLockTag<P>>>(&self, token: &K) -> Option<Node<P>> {
        self.firing.get(token)
    }

    #[inline]
    pub(crate) fn set_firing<K: tokenlock::Token<KLockTag<P>>>(
        &self,
        token: &mut K,
        node: Option<Node<P>>,
    ) {
        self.firing.set(token, node);
    }

    /// Record the address of the token `select_next` is holding while it
    /// runs a firing callback. Null means no firing is in progress.
    #[inline]
    pub(crate) fn set_firing_token(&self, ptr: *mut ()) {
        self.firing_token.set(ptr);
    }

    /// The address [`Self::set_firing_token`] last recorded.
    #[inline]
    pub(crate) fn firing_token(&self) -> *mut () {
        self.firing_token.get()
    }
}
