//! Two-value status (§7). Operations that can meaningfully fail return
//! [`Result<T, Error>`] rather than the raw `E_SUCCESS`/`E_FAILURE` words;
//! the words are still exposed (see [`crate::consts`]) for callers that
//! need the ABI-level value, e.g. when handing a result back across a
//! callback boundary that only understands `u32`.

use core::fmt;

use crate::consts::{E_FAILURE, Event};

/// The kernel's only error: "the operation did not take effect". There is
/// no richer error taxonomy because the source kernel has none: a
/// precondition violation is undefined behavior (debug-asserted), not a
/// recoverable error (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation failed")
    }
}

/// Convert the Boolean "did it succeed" into the kernel's `Result` shape.
#[inline]
pub fn result_of(success: bool) -> Result<(), Error> {
    if success {
        Ok(())
    } else {
        Err(Error)
    }
}

/// Project a `Result<(), Error>` down to the raw ABI word, for code that
/// talks to a callback or a foreign caller expecting `E_SUCCESS`/`E_FAILURE`
/// directly instead of a `Result`.
#[inline]
pub fn event_of(result: Result<(), Error>) -> Event {
    match result {
        Ok(()) => crate::consts::E_SUCCESS,
        Err(Error) => E_FAILURE,
    }
}
