//! The mutex primitive (§3 "Mutex", §4.E).
//!
//! Grounded on `os_mtx.c`: `mtx_take` sets `owner` to the caller if the
//! mutex is free, then reports success iff the caller ends up owning it.
//! The same comparison is what gives a re-`take` by the current owner its
//! non-recursive-but-idempotent behavior (§4.E: "a re-take by the owner
//! trivially succeeds without nesting count"). The source doesn't bracket
//! `mtx_take`/`mtx_give` in `port_sys_lock`/`unlock` the way `os_flg.c`
//! does, but every other mutable field in this crate lives behind the
//! kernel lock (§5), so this port takes it here too.

use rtk_core::error::{result_of, Error};
use rtk_core::init::Init;

use crate::cfg::Kernel;
use crate::klock::{self, KCell};
use crate::object::Node;

/// A non-recursive mutex with no wait queue (§3 "Mutex").
pub struct Mutex<P: rtk_core::port::Port> {
    owner: KCell<P, Option<Node<P>>>,
}

impl<P: rtk_core::port::Port> Init for Mutex<P> {
    const INIT: Self = Self { owner: KCell::new(None) };
}

impl<P: rtk_core::port::Port> Mutex<P> {
    pub const fn new() -> Self {
        Self { owner: KCell::new(None) }
    }
}

impl<K: Kernel> Mutex<K> {
    /// `mtx_take` (§4.E): claims the mutex for the caller if free, or
    /// confirms the caller already owns it. `Ok(())` iff the caller ends
    /// up the owner either way; `Err` leaves ownership untouched.
    pub fn take(&self) -> Result<(), Error> {
        let mut guard = klock::lock::<K>();
        let mut tok = guard.borrow_mut();
        let cur = K::state().current(&tok);
        if self.owner.get(&tok).is_none() {
            self.owner.set(&mut tok, Some(cur));
        }
        result_of(self.owner.get(&tok) == Some(cur))
    }

    /// `mtx_wait` (§4.E): spin-yields until [`take`](Self::take) succeeds.
    pub fn wait(&self) {
        while self.take().is_err() {
            crate::task::yield_now::<K>();
        }
    }

    /// `mtx_give` (§4.E): releases the mutex iff the caller is the current
    /// owner; `Err` without touching ownership otherwise.
    pub fn give(&self) -> Result<(), Error> {
        let mut guard = klock::lock::<K>();
        let mut tok = guard.borrow_mut();
        let cur = K::state().current(&tok);
        if self.owner.get(&tok) == Some(cur) {
            self.owner.set(&mut tok, None);
            Ok(())
        } else {
            Err(Error)
        }
    }
}

#[cfg(test)]
mod tests {
    //! The spin-wait half (`wait`) needs a real `Port` to hand control to
    //! another task, and is exercised end-to-end in `rtk-port-std`'s
    //! integration tests (scenario 5, §8). `take`/`give`'s
    //! ownership bookkeeping, though, is pure field mutation once "the
    //! current task" is whatever `KernelState::set_current` says it is;
    //! these tests fake a second task by flipping `cur` between two
    //! statics, the same trick `sched`'s tests use for scheduling order.
    use super::Mutex;
    use crate::klock;
    use crate::object::{Node, Stack, Task};
    use crate::testutil::test_kernel;

    fn noop() {}

    /// §4.E "Mutex exclusion": a second task's `take` fails while the
    /// first still owns it, and fails to change ownership in the process;
    /// after the true owner gives it up, the second task can take it.
    #[test]
    fn exclusive_ownership_blocks_other_task() {
        test_kernel!(MtxKernel, main = noop);
        static STACK_A: Stack<64> = Stack::new();
        static STACK_B: Stack<64> = Stack::new();
        static TASK_A: Task<MtxKernel> = Task::new(&STACK_A, noop);
        static TASK_B: Task<MtxKernel> = Task::new(&STACK_B, noop);
        static MTX: Mutex<MtxKernel> = Mutex::new();

        {
            let mut guard = klock::lock::<MtxKernel>();
            let mut tok = guard.borrow_mut();
            MtxKernel::state().boot(&mut tok);
            MtxKernel::state().set_current(&mut tok, Node::Task(&TASK_A));
        }
        assert!(MTX.take().is_ok());

        {
            let mut guard = klock::lock::<MtxKernel>();
            let mut tok = guard.borrow_mut();
            MtxKernel::state().set_current(&mut tok, Node::Task(&TASK_B));
        }
        assert!(MTX.take().is_err(), "mutex already owned by another task");
        assert!(MTX.give().is_err(), "give by a non-owner must not release it");

        {
            let mut guard = klock::lock::<MtxKernel>();
            let mut tok = guard.borrow_mut();
            MtxKernel::state().set_current(&mut tok, Node::Task(&TASK_A));
        }
        assert!(MTX.give().is_ok());

        {
            let mut guard = klock::lock::<MtxKernel>();
            let mut tok = guard.borrow_mut();
            MtxKernel::state().set_current(&mut tok, Node::Task(&TASK_B));
        }
        assert!(MTX.take().is_ok(), "free mutex must be takeable by anyone");
    }

    /// §4.E: "a re-take by the owner trivially succeeds without a nesting
    /// count", and conversely doesn't require a matching number of
    /// `give`s to actually release it.
    #[test]
    fn retake_by_owner_is_idempotent_not_recursive() {
        test_kernel!(MtxReentrant, main = noop);
        static STACK: Stack<64> = Stack::new();
        static OWNER: Task<MtxReentrant> = Task::new(&STACK, noop);
        static MTX: Mutex<MtxReentrant> = Mutex::new();

        {
            let mut guard = klock::lock::<MtxReentrant>();
            let mut tok = guard.borrow_mut();
            MtxReentrant::state().boot(&mut tok);
            MtxReentrant::state().set_current(&mut tok, Node::Task(&OWNER));
        }

        assert!(MTX.take().is_ok());
        assert!(MTX.take().is_ok(), "re-take by the current owner must succeed");
        assert!(MTX.give().is_ok(), "a single give releases it, no nesting count");
        assert!(MTX.give().is_err(), "already free: give has nothing to do");
    }
}
