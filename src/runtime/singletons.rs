//! Process-wide constant values and the tag-based boolean convention.

use crate::runtime::error::RuntimeResult;
use crate::runtime::value::{Buffer, Value};
use std::ptr;

pub const TRUE_SYMBOL: &[u8] = b"True";
pub const FALSE_SYMBOL: &[u8] = b"False";
pub const ENVIRONMENT_SYMBOL: &[u8] = b"Environment";

// SAFETY (all three): statics are never dropped, so their buffers are never
// released.
#[unsafe(export_name = "prime_true")]
pub static TRUE: Value = Value::Tag(unsafe { Buffer::from_static(c"True") });

#[unsafe(export_name = "prime_false")]
pub static FALSE: Value = Value::Tag(unsafe { Buffer::from_static(c"False") });

#[unsafe(export_name = "prime_environment")]
pub static ENVIRONMENT: Value = Value::Tag(unsafe { Buffer::from_static(c"Environment") });

/// Returns the singleton stored at `raw`, if any.
pub fn singleton_at(raw: *const Value) -> Option<&'static Value> {
    [&TRUE, &FALSE, &ENVIRONMENT]
        .into_iter()
        .find(|singleton| ptr::eq(*singleton, raw))
}

pub fn bool_to_tag(value: bool) -> &'static Value {
    if value {
        &TRUE
    } else {
        &FALSE
    }
}

/// A tag is true iff its name is exactly `True`. Any other tag, including
/// malformed ones, is false; values of other kinds are rejected.
pub fn tag_to_bool(value: &Value) -> RuntimeResult<bool> {
    truthiness(value, "tag_to_bool")
}

pub(crate) fn truthiness(value: &Value, operation: &'static str) -> RuntimeResult<bool> {
    let tag = value.as_tag(operation)?;
    Ok(tag.as_bytes() == TRUE_SYMBOL)
}
