use crate::runtime::value::Kind;
use miette::Diagnostic;
use std::cell::RefCell;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Precondition violations detected at the runtime boundary.
///
/// These are distinct from a user-level `panic`: they describe calls the code
/// generator should never have emitted, and are reported back to the caller
/// instead of terminating the process.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("`{operation}` expected {expected} but received {found}")]
    #[diagnostic(code(prime_rt::type_mismatch))]
    TypeMismatch {
        operation: &'static str,
        expected: Kind,
        found: Kind,
    },
    #[error("`{operation}` cannot divide by zero")]
    #[diagnostic(code(prime_rt::division_by_zero))]
    DivisionByZero { operation: &'static str },
    #[error("`{operation}` shift amount {amount} is outside 0..128")]
    #[diagnostic(code(prime_rt::shift_out_of_range))]
    ShiftOutOfRange {
        operation: &'static str,
        amount: i128,
    },
    #[error("`{operation}` received a null value pointer")]
    #[diagnostic(code(prime_rt::null_value))]
    NullValue { operation: &'static str },
    #[error("`{operation}` takes {expected} argument(s) but received {found}")]
    #[diagnostic(code(prime_rt::arity))]
    Arity {
        operation: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("`{operation}` range {start}..{end} is not a valid range")]
    #[diagnostic(
        code(prime_rt::invalid_range),
        help("the start must be non-negative and not greater than the end")
    )]
    InvalidRange {
        operation: &'static str,
        start: i128,
        end: i128,
    },
    #[error("a thunk returned no value")]
    #[diagnostic(
        code(prime_rt::thunk_returned_null),
        help("thunks must return a value created by the runtime")
    )]
    ThunkReturnedNull,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<RuntimeError>> = const { RefCell::new(None) };
}

/// Stores `error` as the pending error of the current thread.
pub fn set_last_error(error: RuntimeError) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(error));
}

/// Removes and returns the pending error of the current thread.
pub fn take_last_error() -> Option<RuntimeError> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

pub fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}
