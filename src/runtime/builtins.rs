//! Operations generated code cannot express directly.
//!
//! Arguments are borrowed; every result is a new handle (or a boolean
//! singleton). Wrong argument kinds are reported as
//! [`RuntimeError::TypeMismatch`] and never read through.

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::handle::Handle;
use crate::runtime::singletons::truthiness;
use crate::runtime::value::{Buffer, Value};
use std::cmp::Ordering;

/// Structural equality gated by kind.
///
/// Ints compare numerically, tags and texts by their bytes. Lists, structs and
/// functions are never equal to anything, themselves included.
pub fn equals(left: &Value, right: &Value) -> Handle {
    let equal = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Tag(a), Value::Tag(b)) => a.as_bytes() == b.as_bytes(),
        (Value::Text(a), Value::Text(b)) => a.as_bytes() == b.as_bytes(),
        _ => false,
    };
    Handle::from_bool(equal)
}

/// Forces exactly one of two thunks. Every argument is checked before either
/// branch runs.
pub fn if_else(condition: &Value, then: &Value, otherwise: &Value) -> RuntimeResult<Handle> {
    const OP: &str = "ifelse";
    let condition = truthiness(condition, OP)?;
    let then = then.as_thunk(OP)?;
    let otherwise = otherwise.as_thunk(OP)?;
    if condition {
        then.force()
    } else {
        otherwise.force()
    }
}

pub fn function_run(function: &Value) -> RuntimeResult<Handle> {
    function.as_thunk("function_run")?.force()
}

fn ints(left: &Value, right: &Value, operation: &'static str) -> RuntimeResult<(i128, i128)> {
    Ok((left.as_int(operation)?, right.as_int(operation)?))
}

pub fn int_add(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    let (a, b) = ints(left, right, "int_add")?;
    Ok(Handle::int(a.wrapping_add(b)))
}

pub fn int_subtract(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    let (a, b) = ints(left, right, "int_subtract")?;
    Ok(Handle::int(a.wrapping_sub(b)))
}

pub fn int_multiply(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    let (a, b) = ints(left, right, "int_multiply")?;
    Ok(Handle::int(a.wrapping_mul(b)))
}

pub fn int_divide_truncating(dividend: &Value, divisor: &Value) -> RuntimeResult<Handle> {
    const OP: &str = "int_divide_truncating";
    let (a, b) = ints(dividend, divisor, OP)?;
    if b == 0 {
        return Err(RuntimeError::DivisionByZero { operation: OP });
    }
    Ok(Handle::int(a.wrapping_div(b)))
}

/// Remainder of truncating division; takes the sign of the dividend.
pub fn int_remainder(dividend: &Value, divisor: &Value) -> RuntimeResult<Handle> {
    const OP: &str = "int_remainder";
    let (a, b) = ints(dividend, divisor, OP)?;
    if b == 0 {
        return Err(RuntimeError::DivisionByZero { operation: OP });
    }
    Ok(Handle::int(a.wrapping_rem(b)))
}

/// Floored modulo; a non-zero result takes the sign of the divisor.
pub fn int_modulo(dividend: &Value, divisor: &Value) -> RuntimeResult<Handle> {
    const OP: &str = "int_modulo";
    let (a, b) = ints(dividend, divisor, OP)?;
    if b == 0 {
        return Err(RuntimeError::DivisionByZero { operation: OP });
    }
    let remainder = a.wrapping_rem(b);
    let modulo = if remainder != 0 && (remainder < 0) != (b < 0) {
        remainder + b
    } else {
        remainder
    };
    Ok(Handle::int(modulo))
}

/// Number of bits needed for the magnitude of the value.
pub fn int_bit_length(value: &Value) -> RuntimeResult<Handle> {
    let value = value.as_int("int_bit_length")?;
    let bits = u128::BITS - value.unsigned_abs().leading_zeros();
    Ok(Handle::int(i128::from(bits)))
}

pub fn int_bitwise_and(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    let (a, b) = ints(left, right, "int_bitwise_and")?;
    Ok(Handle::int(a & b))
}

pub fn int_bitwise_or(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    let (a, b) = ints(left, right, "int_bitwise_or")?;
    Ok(Handle::int(a | b))
}

pub fn int_bitwise_xor(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    let (a, b) = ints(left, right, "int_bitwise_xor")?;
    Ok(Handle::int(a ^ b))
}

pub fn int_compare_to(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    let (a, b) = ints(left, right, "int_compare_to")?;
    let name = match a.cmp(&b) {
        Ordering::Less => "Less",
        Ordering::Equal => "Equal",
        Ordering::Greater => "Greater",
    };
    Ok(Handle::tag(name))
}

fn shift_amount(amount: &Value, operation: &'static str) -> RuntimeResult<u32> {
    let amount = amount.as_int(operation)?;
    u32::try_from(amount)
        .ok()
        .filter(|bits| *bits < i128::BITS)
        .ok_or(RuntimeError::ShiftOutOfRange { operation, amount })
}

pub fn int_shift_left(value: &Value, amount: &Value) -> RuntimeResult<Handle> {
    const OP: &str = "int_shift_left";
    let value = value.as_int(OP)?;
    let amount = shift_amount(amount, OP)?;
    Ok(Handle::int(value.wrapping_shl(amount)))
}

/// Arithmetic shift: the sign bit is kept.
pub fn int_shift_right(value: &Value, amount: &Value) -> RuntimeResult<Handle> {
    const OP: &str = "int_shift_right";
    let value = value.as_int(OP)?;
    let amount = shift_amount(amount, OP)?;
    Ok(Handle::int(value >> amount))
}

/// A fresh tag naming the kind of `value`.
pub fn type_of(value: &Value) -> Handle {
    Handle::tag(value.kind().name())
}

fn texts<'a>(
    left: &'a Value,
    right: &'a Value,
    operation: &'static str,
) -> RuntimeResult<(&'a Buffer, &'a Buffer)> {
    Ok((left.as_text(operation)?, right.as_text(operation)?))
}

pub fn text_concatenate(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    let (a, b) = texts(left, right, "text_concatenate")?;
    Ok(Handle::text([a.as_bytes(), b.as_bytes()].concat()))
}

/// Length in Unicode scalar values; invalid UTF-8 counts as replacement
/// characters.
pub fn text_length(text: &Value) -> RuntimeResult<Handle> {
    let text = text.as_text("text_length")?;
    let length = text.to_string_lossy().chars().count();
    Ok(Handle::int(length as i128))
}

pub fn text_is_empty(text: &Value) -> RuntimeResult<Handle> {
    let text = text.as_text("text_is_empty")?;
    Ok(Handle::from_bool(text.as_bytes().is_empty()))
}

pub fn text_contains(text: &Value, pattern: &Value) -> RuntimeResult<Handle> {
    let (text, pattern) = texts(text, pattern, "text_contains")?;
    let (haystack, needle) = (text.as_bytes(), pattern.as_bytes());
    let found = needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle);
    Ok(Handle::from_bool(found))
}

pub fn text_starts_with(text: &Value, prefix: &Value) -> RuntimeResult<Handle> {
    let (text, prefix) = texts(text, prefix, "text_starts_with")?;
    Ok(Handle::from_bool(text.as_bytes().starts_with(prefix.as_bytes())))
}

pub fn text_ends_with(text: &Value, suffix: &Value) -> RuntimeResult<Handle> {
    let (text, suffix) = texts(text, suffix, "text_ends_with")?;
    Ok(Handle::from_bool(text.as_bytes().ends_with(suffix.as_bytes())))
}

pub fn text_trim_start(text: &Value) -> RuntimeResult<Handle> {
    let text = text.as_text("text_trim_start")?;
    Ok(Handle::text(text.to_string_lossy().trim_start()))
}

pub fn text_trim_end(text: &Value) -> RuntimeResult<Handle> {
    let text = text.as_text("text_trim_end")?;
    Ok(Handle::text(text.to_string_lossy().trim_end()))
}

/// Characters `start..end`, counted like [`text_length`]. An `end` past the
/// last character is clamped.
pub fn text_get_range(text: &Value, start: &Value, end: &Value) -> RuntimeResult<Handle> {
    const OP: &str = "text_get_range";
    let text = text.as_text(OP)?;
    let (start, end) = (start.as_int(OP)?, end.as_int(OP)?);
    if start < 0 || end < start {
        return Err(RuntimeError::InvalidRange {
            operation: OP,
            start,
            end,
        });
    }
    let skip = usize::try_from(start).unwrap_or(usize::MAX);
    let take = usize::try_from(end - start).unwrap_or(usize::MAX);
    let range: String = text.to_string_lossy().chars().skip(skip).take(take).collect();
    Ok(Handle::text(range))
}

pub fn to_debug_text(value: &Value) -> Handle {
    Handle::text(value.debug_text())
}
