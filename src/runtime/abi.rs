#![allow(unsafe_op_in_unsafe_fn)]

// C entry points called by generated code. Every value-producing function
// returns an owned pointer, or null after recording the failure in the
// thread's last-error slot.

use crate::runtime::builtins;
use crate::runtime::diagnostics;
use crate::runtime::error::{
    clear_last_error, set_last_error, take_last_error, RuntimeError, RuntimeResult,
};
use crate::runtime::handle::{self, Handle};
use crate::runtime::singletons;
use crate::runtime::value::{Buffer, ClosureFn, ReleaseFn, Thunk, ThunkFn, Value};
use crate::trace;
use std::ffi::{c_char, c_void, CStr};
use std::ptr;

fn boundary(operation: &'static str, body: impl FnOnce() -> RuntimeResult<Handle>) -> *mut Value {
    enter(operation);
    match body() {
        Ok(handle) => handle.into_raw(),
        Err(error) => {
            fail(operation, error);
            ptr::null_mut()
        }
    }
}

/// Starts a boundary call. A failure recorded by an earlier call is dropped,
/// so the slot only ever describes the most recent entry point.
fn enter(operation: &'static str) {
    clear_last_error();
    trace::call(operation);
}

fn fail(operation: &'static str, error: RuntimeError) {
    trace::failure(operation, &error);
    set_last_error(error);
}

unsafe fn borrow<'a>(value: *const Value, operation: &'static str) -> RuntimeResult<&'a Value> {
    value.as_ref().ok_or(RuntimeError::NullValue { operation })
}

unsafe fn c_bytes<'a>(text: *const c_char, operation: &'static str) -> RuntimeResult<&'a [u8]> {
    if text.is_null() {
        return Err(RuntimeError::NullValue { operation });
    }
    Ok(CStr::from_ptr(text).to_bytes())
}

#[unsafe(export_name = "prime_make_int")]
pub unsafe extern "C" fn prime_make_int(value: i128) -> *mut Value {
    boundary("make_int", || Ok(Handle::int(value)))
}

/// Copies a NUL-terminated string into a new `Text` value.
#[unsafe(export_name = "prime_make_text")]
pub unsafe extern "C" fn prime_make_text(text: *const c_char) -> *mut Value {
    boundary("make_text", || Ok(Handle::text(c_bytes(text, "make_text")?)))
}

#[unsafe(export_name = "prime_make_tag")]
pub unsafe extern "C" fn prime_make_tag(name: *const c_char) -> *mut Value {
    boundary("make_tag", || Ok(Handle::tag(c_bytes(name, "make_tag")?)))
}

/// # Safety
/// `code` must return null, a singleton address, or a value created by this
/// runtime that the caller has not freed.
#[unsafe(export_name = "prime_make_function")]
pub unsafe extern "C" fn prime_make_function(code: Option<ThunkFn>) -> *mut Value {
    boundary("make_function", || {
        let code = code.ok_or(RuntimeError::NullValue {
            operation: "make_function",
        })?;
        Ok(Handle::function(code))
    })
}

/// Wraps a code pointer together with its captured environment. `release`
/// runs once when the value is freed and may be null.
#[unsafe(export_name = "prime_make_closure")]
pub unsafe extern "C" fn prime_make_closure(
    call: Option<ClosureFn>,
    env: *mut c_void,
    release: Option<ReleaseFn>,
) -> *mut Value {
    boundary("make_closure", || {
        let call = call.ok_or(RuntimeError::NullValue {
            operation: "make_closure",
        })?;
        Ok(Handle::new(Value::Function(Thunk::from_raw_parts(
            call, env, release,
        ))))
    })
}

#[unsafe(export_name = "prime_bool_to_tag")]
pub unsafe extern "C" fn prime_bool_to_tag(value: bool) -> *mut Value {
    boundary("bool_to_tag", || Ok(Handle::from_bool(value)))
}

/// Returns `false` for anything that is not the `True` tag. Non-tags also
/// record an error.
#[unsafe(export_name = "prime_tag_to_bool")]
pub unsafe extern "C" fn prime_tag_to_bool(value: *const Value) -> bool {
    enter("tag_to_bool");
    match borrow(value, "tag_to_bool").and_then(singletons::tag_to_bool) {
        Ok(truth) => truth,
        Err(error) => {
            fail("tag_to_bool", error);
            false
        }
    }
}

#[unsafe(export_name = "prime_builtin_equals")]
pub unsafe extern "C" fn prime_builtin_equals(left: *const Value, right: *const Value) -> *mut Value {
    boundary("equals", || {
        Ok(builtins::equals(
            borrow(left, "equals")?,
            borrow(right, "equals")?,
        ))
    })
}

/// Forces exactly one of the two thunks and returns its result.
#[unsafe(export_name = "prime_builtin_ifelse")]
pub unsafe extern "C" fn prime_builtin_ifelse(
    condition: *const Value,
    then: *const Value,
    otherwise: *const Value,
) -> *mut Value {
    boundary("ifelse", || {
        builtins::if_else(
            borrow(condition, "ifelse")?,
            borrow(then, "ifelse")?,
            borrow(otherwise, "ifelse")?,
        )
    })
}

#[unsafe(export_name = "prime_builtin_function_run")]
pub unsafe extern "C" fn prime_builtin_function_run(function: *const Value) -> *mut Value {
    boundary("function_run", || {
        builtins::function_run(borrow(function, "function_run")?)
    })
}

macro_rules! unary_builtin {
    ($symbol:literal, $name:ident, $operation:literal, $builtin:path) => {
        #[unsafe(export_name = $symbol)]
        pub unsafe extern "C" fn $name(value: *const Value) -> *mut Value {
            boundary($operation, || $builtin(borrow(value, $operation)?))
        }
    };
}

macro_rules! binary_builtin {
    ($symbol:literal, $name:ident, $operation:literal, $builtin:path) => {
        #[unsafe(export_name = $symbol)]
        pub unsafe extern "C" fn $name(left: *const Value, right: *const Value) -> *mut Value {
            boundary($operation, || {
                $builtin(borrow(left, $operation)?, borrow(right, $operation)?)
            })
        }
    };
}

binary_builtin!("prime_builtin_int_add", prime_builtin_int_add, "int_add", builtins::int_add);
binary_builtin!(
    "prime_builtin_int_subtract",
    prime_builtin_int_subtract,
    "int_subtract",
    builtins::int_subtract
);
binary_builtin!(
    "prime_builtin_int_multiply",
    prime_builtin_int_multiply,
    "int_multiply",
    builtins::int_multiply
);
binary_builtin!(
    "prime_builtin_int_divide_truncating",
    prime_builtin_int_divide_truncating,
    "int_divide_truncating",
    builtins::int_divide_truncating
);
binary_builtin!(
    "prime_builtin_int_remainder",
    prime_builtin_int_remainder,
    "int_remainder",
    builtins::int_remainder
);
binary_builtin!(
    "prime_builtin_int_modulo",
    prime_builtin_int_modulo,
    "int_modulo",
    builtins::int_modulo
);
unary_builtin!(
    "prime_builtin_int_bit_length",
    prime_builtin_int_bit_length,
    "int_bit_length",
    builtins::int_bit_length
);
binary_builtin!(
    "prime_builtin_int_bitwise_and",
    prime_builtin_int_bitwise_and,
    "int_bitwise_and",
    builtins::int_bitwise_and
);
binary_builtin!(
    "prime_builtin_int_bitwise_or",
    prime_builtin_int_bitwise_or,
    "int_bitwise_or",
    builtins::int_bitwise_or
);
binary_builtin!(
    "prime_builtin_int_bitwise_xor",
    prime_builtin_int_bitwise_xor,
    "int_bitwise_xor",
    builtins::int_bitwise_xor
);
binary_builtin!(
    "prime_builtin_int_compare_to",
    prime_builtin_int_compare_to,
    "int_compare_to",
    builtins::int_compare_to
);
binary_builtin!(
    "prime_builtin_int_shift_left",
    prime_builtin_int_shift_left,
    "int_shift_left",
    builtins::int_shift_left
);
binary_builtin!(
    "prime_builtin_int_shift_right",
    prime_builtin_int_shift_right,
    "int_shift_right",
    builtins::int_shift_right
);
binary_builtin!(
    "prime_builtin_text_concatenate",
    prime_builtin_text_concatenate,
    "text_concatenate",
    builtins::text_concatenate
);
unary_builtin!(
    "prime_builtin_text_length",
    prime_builtin_text_length,
    "text_length",
    builtins::text_length
);
unary_builtin!(
    "prime_builtin_text_is_empty",
    prime_builtin_text_is_empty,
    "text_is_empty",
    builtins::text_is_empty
);
binary_builtin!(
    "prime_builtin_text_contains",
    prime_builtin_text_contains,
    "text_contains",
    builtins::text_contains
);
binary_builtin!(
    "prime_builtin_text_starts_with",
    prime_builtin_text_starts_with,
    "text_starts_with",
    builtins::text_starts_with
);
binary_builtin!(
    "prime_builtin_text_ends_with",
    prime_builtin_text_ends_with,
    "text_ends_with",
    builtins::text_ends_with
);
unary_builtin!(
    "prime_builtin_text_trim_start",
    prime_builtin_text_trim_start,
    "text_trim_start",
    builtins::text_trim_start
);
unary_builtin!(
    "prime_builtin_text_trim_end",
    prime_builtin_text_trim_end,
    "text_trim_end",
    builtins::text_trim_end
);

/// Copies the characters `start..end` of a text. `end` is clamped to the
/// length of the text.
#[unsafe(export_name = "prime_builtin_text_get_range")]
pub unsafe extern "C" fn prime_builtin_text_get_range(
    text: *const Value,
    start: *const Value,
    end: *const Value,
) -> *mut Value {
    boundary("text_get_range", || {
        builtins::text_get_range(
            borrow(text, "text_get_range")?,
            borrow(start, "text_get_range")?,
            borrow(end, "text_get_range")?,
        )
    })
}

/// Returns a fresh tag naming the kind of `value`.
#[unsafe(export_name = "prime_builtin_typeof")]
pub unsafe extern "C" fn prime_builtin_typeof(value: *const Value) -> *mut Value {
    boundary("typeof", || Ok(builtins::type_of(borrow(value, "typeof")?)))
}

#[unsafe(export_name = "prime_builtin_to_debug_text")]
pub unsafe extern "C" fn prime_builtin_to_debug_text(value: *const Value) -> *mut Value {
    boundary("to_debug_text", || {
        Ok(builtins::to_debug_text(borrow(value, "to_debug_text")?))
    })
}

#[unsafe(export_name = "prime_print_value")]
pub unsafe extern "C" fn prime_print_value(value: *const Value) {
    enter("print");
    match borrow(value, "print") {
        Ok(value) => diagnostics::print(value),
        Err(error) => fail("print", error),
    }
}

#[unsafe(export_name = "prime_panic")]
pub unsafe extern "C" fn prime_panic(reason: *const Value) -> ! {
    trace::call("panic");
    match reason.as_ref() {
        Some(reason) => diagnostics::panic(reason),
        None => diagnostics::panic(&Value::Text(Buffer::new(b"<null reason>"))),
    }
}

/// Releases a value and everything it owns. Null and singleton pointers are
/// accepted and ignored.
#[unsafe(export_name = "prime_free")]
pub unsafe extern "C" fn prime_free(value: *mut Value) {
    if let Some(handle) = Handle::from_raw(value) {
        trace::call("free");
        handle::free(handle);
    }
}

/// Takes the pending error of the calling thread as a `Text` value, or
/// returns null when nothing failed.
#[unsafe(export_name = "prime_last_error")]
pub unsafe extern "C" fn prime_last_error() -> *mut Value {
    match take_last_error() {
        Some(error) => Handle::text(error.to_string()).into_raw(),
        None => ptr::null_mut(),
    }
}

#[unsafe(export_name = "prime_clear_error")]
pub unsafe extern "C" fn prime_clear_error() {
    clear_last_error();
}

