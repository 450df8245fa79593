//! Static description of every symbol the runtime exports. The C header and
//! the LLVM declarations are both generated from this table.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbiType {
    Void,
    /// Return type of functions that never return.
    Never,
    Bool,
    Int,
    /// A borrowed `const prime_value_t *`.
    ValueRef,
    /// A `prime_value_t *` whose ownership moves across the call.
    OwnedValue,
    /// A NUL-terminated `const char *`.
    CString,
    ThunkFn,
    ClosureFn,
    Env,
    ReleaseFn,
}

#[derive(Clone, Copy, Debug)]
pub struct EntryPoint {
    pub name: &'static str,
    pub params: &'static [(&'static str, AbiType)],
    pub returns: AbiType,
}

impl EntryPoint {
    const fn new(
        name: &'static str,
        params: &'static [(&'static str, AbiType)],
        returns: AbiType,
    ) -> Self {
        Self {
            name,
            params,
            returns,
        }
    }
}

pub const SINGLETONS: [&str; 3] = ["prime_true", "prime_false", "prime_environment"];

use AbiType::*;

const UNARY: &[(&str, AbiType)] = &[("value", ValueRef)];
const BINARY: &[(&str, AbiType)] = &[("left", ValueRef), ("right", ValueRef)];

pub const ENTRY_POINTS: &[EntryPoint] = &[
    EntryPoint::new("prime_make_int", &[("value", Int)], OwnedValue),
    EntryPoint::new("prime_make_text", &[("text", CString)], OwnedValue),
    EntryPoint::new("prime_make_tag", &[("name", CString)], OwnedValue),
    EntryPoint::new("prime_make_function", &[("code", ThunkFn)], OwnedValue),
    EntryPoint::new(
        "prime_make_closure",
        &[("call", ClosureFn), ("env", Env), ("release", ReleaseFn)],
        OwnedValue,
    ),
    EntryPoint::new("prime_bool_to_tag", &[("value", Bool)], OwnedValue),
    EntryPoint::new("prime_tag_to_bool", UNARY, Bool),
    EntryPoint::new("prime_builtin_equals", BINARY, OwnedValue),
    EntryPoint::new(
        "prime_builtin_ifelse",
        &[
            ("condition", ValueRef),
            ("then", ValueRef),
            ("otherwise", ValueRef),
        ],
        OwnedValue,
    ),
    EntryPoint::new("prime_builtin_function_run", UNARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_add", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_subtract", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_multiply", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_divide_truncating", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_remainder", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_modulo", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_bit_length", UNARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_bitwise_and", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_bitwise_or", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_bitwise_xor", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_compare_to", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_shift_left", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_int_shift_right", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_typeof", UNARY, OwnedValue),
    EntryPoint::new("prime_builtin_text_concatenate", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_text_length", UNARY, OwnedValue),
    EntryPoint::new("prime_builtin_text_is_empty", UNARY, OwnedValue),
    EntryPoint::new("prime_builtin_text_contains", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_text_starts_with", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_text_ends_with", BINARY, OwnedValue),
    EntryPoint::new("prime_builtin_text_trim_start", UNARY, OwnedValue),
    EntryPoint::new("prime_builtin_text_trim_end", UNARY, OwnedValue),
    EntryPoint::new(
        "prime_builtin_text_get_range",
        &[("text", ValueRef), ("start", ValueRef), ("end", ValueRef)],
        OwnedValue,
    ),
    EntryPoint::new("prime_builtin_to_debug_text", UNARY, OwnedValue),
    EntryPoint::new("prime_print_value", UNARY, Void),
    EntryPoint::new("prime_panic", &[("reason", ValueRef)], Never),
    EntryPoint::new("prime_free", &[("value", OwnedValue)], Void),
    EntryPoint::new("prime_last_error", &[], OwnedValue),
    EntryPoint::new("prime_clear_error", &[], Void),
];
