//! Const-initializable types, so static object declarations never need a
//! runtime constructor.
//!
//! This mirrors `r3_core::utils::Init`: every type that appears in a
//! `static` kernel object (headers, cells, queues) implements `Init` so the
//! whole object can be written as `const INIT: Self = ...` and spliced into
//! a `static` by the `static_task!`/`static_timer!` family of macros.

/// A type with a well-known "zeroed" value usable in a `const` context.
pub trait Init {
    const INIT: Self;
}

impl<T: Init> Init for core::cell::Cell<T> {
    const INIT: Self = core::cell::Cell::new(T::INIT);
}

impl<T> Init for Option<T> {
    const INIT: Self = None;
}

impl Init for bool {
    const INIT: Self = false;
}

impl Init for u32 {
    const INIT: Self = 0;
}

impl Init for usize {
    const INIT: Self = 0;
}
