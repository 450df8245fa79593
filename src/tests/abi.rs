use crate::runtime::abi::*;
use crate::runtime::entry_points::{ENTRY_POINTS, SINGLETONS};
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Thunk;
use crate::runtime::singletons::{ENVIRONMENT, FALSE, TRUE};
use crate::runtime::value::{Kind, Value};
use std::ffi::{c_void, CStr};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

unsafe fn take(raw: *mut Value) -> Value {
    assert!(!raw.is_null(), "entry point returned null");
    *Box::from_raw(raw)
}

unsafe fn last_error_text() -> Option<String> {
    let raw = prime_last_error();
    if raw.is_null() {
        return None;
    }
    let text = (*raw).as_text("test").map(|t| t.to_string_lossy().into_owned());
    prime_free(raw);
    text.ok()
}

fn symbol_address(name: &str) -> Option<usize> {
    let address = match name {
        "prime_true" => &TRUE as *const Value as usize,
        "prime_false" => &FALSE as *const Value as usize,
        "prime_environment" => &ENVIRONMENT as *const Value as usize,
        "prime_make_int" => prime_make_int as *const () as usize,
        "prime_make_text" => prime_make_text as *const () as usize,
        "prime_make_tag" => prime_make_tag as *const () as usize,
        "prime_make_function" => prime_make_function as *const () as usize,
        "prime_make_closure" => prime_make_closure as *const () as usize,
        "prime_bool_to_tag" => prime_bool_to_tag as *const () as usize,
        "prime_tag_to_bool" => prime_tag_to_bool as *const () as usize,
        "prime_builtin_equals" => prime_builtin_equals as *const () as usize,
        "prime_builtin_ifelse" => prime_builtin_ifelse as *const () as usize,
        "prime_builtin_function_run" => prime_builtin_function_run as *const () as usize,
        "prime_builtin_int_add" => prime_builtin_int_add as *const () as usize,
        "prime_builtin_int_subtract" => prime_builtin_int_subtract as *const () as usize,
        "prime_builtin_int_multiply" => prime_builtin_int_multiply as *const () as usize,
        "prime_builtin_int_divide_truncating" => {
            prime_builtin_int_divide_truncating as *const () as usize
        }
        "prime_builtin_int_remainder" => prime_builtin_int_remainder as *const () as usize,
        "prime_builtin_int_modulo" => prime_builtin_int_modulo as *const () as usize,
        "prime_builtin_int_bit_length" => prime_builtin_int_bit_length as *const () as usize,
        "prime_builtin_int_bitwise_and" => prime_builtin_int_bitwise_and as *const () as usize,
        "prime_builtin_int_bitwise_or" => prime_builtin_int_bitwise_or as *const () as usize,
        "prime_builtin_int_bitwise_xor" => prime_builtin_int_bitwise_xor as *const () as usize,
        "prime_builtin_int_compare_to" => prime_builtin_int_compare_to as *const () as usize,
        "prime_builtin_int_shift_left" => prime_builtin_int_shift_left as *const () as usize,
        "prime_builtin_int_shift_right" => prime_builtin_int_shift_right as *const () as usize,
        "prime_builtin_typeof" => prime_builtin_typeof as *const () as usize,
        "prime_builtin_text_concatenate" => prime_builtin_text_concatenate as *const () as usize,
        "prime_builtin_text_length" => prime_builtin_text_length as *const () as usize,
        "prime_builtin_text_is_empty" => prime_builtin_text_is_empty as *const () as usize,
        "prime_builtin_text_contains" => prime_builtin_text_contains as *const () as usize,
        "prime_builtin_text_starts_with" => prime_builtin_text_starts_with as *const () as usize,
        "prime_builtin_text_ends_with" => prime_builtin_text_ends_with as *const () as usize,
        "prime_builtin_text_trim_start" => prime_builtin_text_trim_start as *const () as usize,
        "prime_builtin_text_trim_end" => prime_builtin_text_trim_end as *const () as usize,
        "prime_builtin_text_get_range" => prime_builtin_text_get_range as *const () as usize,
        "prime_builtin_to_debug_text" => prime_builtin_to_debug_text as *const () as usize,
        "prime_print_value" => prime_print_value as *const () as usize,
        "prime_panic" => prime_panic as *const () as usize,
        "prime_free" => prime_free as *const () as usize,
        "prime_last_error" => prime_last_error as *const () as usize,
        "prime_clear_error" => prime_clear_error as *const () as usize,
        _ => return None,
    };
    Some(address)
}

#[test]
fn every_declared_symbol_is_exported() {
    for entry in ENTRY_POINTS {
        assert!(symbol_address(entry.name).is_some(), "{}", entry.name);
    }
    for singleton in SINGLETONS {
        assert!(symbol_address(singleton).is_some(), "{singleton}");
    }
    assert_eq!(symbol_address("prime_true"), Some(&TRUE as *const Value as usize));
    assert!(symbol_address("printf").is_none());
}

#[test]
fn constructors_copy_their_input() {
    unsafe {
        let int = prime_make_int(-7);
        assert_eq!((*int).as_int("test"), Ok(-7));
        prime_free(int);

        let source = *b"hello\0";
        let text = prime_make_text(source.as_ptr().cast());
        assert_eq!((*text).kind(), Kind::Text);
        assert_eq!((*text).as_text("test").map(|t| t.as_bytes()), Ok(&b"hello"[..]));
        prime_free(text);

        let tag = prime_make_tag(c"Ok".as_ptr());
        assert_eq!((*tag).as_tag("test").map(|t| t.as_bytes()), Ok(&b"Ok"[..]));
        prime_free(tag);
    }
}

#[test]
fn null_string_is_reported() {
    unsafe {
        prime_clear_error();
        assert!(prime_make_text(ptr::null()).is_null());
        let message = last_error_text().expect("pending error");
        assert!(message.contains("make_text"), "{message}");
        assert!(last_error_text().is_none());
    }
}

#[test]
fn booleans_are_the_exported_singletons() {
    unsafe {
        assert!(ptr::eq(prime_bool_to_tag(true), &TRUE));
        assert!(ptr::eq(prime_bool_to_tag(false), &FALSE));
        assert!(prime_tag_to_bool(&TRUE));
        assert!(!prime_tag_to_bool(&FALSE));
    }
}

#[test]
fn tag_to_bool_rejects_non_tags() {
    unsafe {
        prime_clear_error();
        let int = prime_make_int(1);
        assert!(!prime_tag_to_bool(int));
        let message = last_error_text().expect("pending error");
        assert!(message.contains("tag_to_bool"), "{message}");
        prime_free(int);
    }
}

#[test]
fn equals_returns_singletons() {
    unsafe {
        let left = prime_make_int(3);
        let right = prime_make_int(3);
        let other = prime_make_int(4);
        assert!(ptr::eq(prime_builtin_equals(left, right), &TRUE));
        assert!(ptr::eq(prime_builtin_equals(left, other), &FALSE));
        for value in [left, right, other] {
            prime_free(value);
        }
    }
}

#[test]
fn int_add_through_the_boundary() {
    unsafe {
        let left = prime_make_int(40);
        let right = prime_make_int(2);
        let sum = take(prime_builtin_int_add(left, right));
        assert_eq!(sum.as_int("test"), Ok(42));
        prime_free(left);
        prime_free(right);
    }
}

#[test]
fn type_errors_return_null() {
    unsafe {
        prime_clear_error();
        let int = prime_make_int(1);
        let tag = prime_make_tag(c"Nope".as_ptr());
        assert!(prime_builtin_int_add(int, tag).is_null());
        let message = last_error_text().expect("pending error");
        assert_eq!(message, "`int_add` expected int but received tag");
        prime_free(int);
        prime_free(tag);
    }
}

static THEN_CALLS: AtomicUsize = AtomicUsize::new(0);
static ELSE_CALLS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn then_branch() -> *mut Value {
    THEN_CALLS.fetch_add(1, Ordering::SeqCst);
    prime_make_int(1)
}

unsafe extern "C" fn else_branch() -> *mut Value {
    ELSE_CALLS.fetch_add(1, Ordering::SeqCst);
    prime_make_int(2)
}

#[test]
fn ifelse_forces_only_the_selected_branch() {
    unsafe {
        let then = prime_make_function(Some(then_branch));
        let otherwise = prime_make_function(Some(else_branch));

        let result = take(prime_builtin_ifelse(&TRUE, then, otherwise));
        assert_eq!(result.as_int("test"), Ok(1));
        assert_eq!(THEN_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(ELSE_CALLS.load(Ordering::SeqCst), 0);

        let result = take(prime_builtin_ifelse(&FALSE, then, otherwise));
        assert_eq!(result.as_int("test"), Ok(2));
        assert_eq!(THEN_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(ELSE_CALLS.load(Ordering::SeqCst), 1);

        prime_free(then);
        prime_free(otherwise);
    }
}

static CLOSURE_RELEASES: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn read_env(env: *mut c_void) -> *mut Value {
    prime_make_int(*env.cast::<i128>())
}

unsafe extern "C" fn release_env(env: *mut c_void) {
    CLOSURE_RELEASES.fetch_add(1, Ordering::SeqCst);
    drop(Box::from_raw(env.cast::<i128>()));
}

#[test]
fn closures_release_their_environment_on_free() {
    unsafe {
        let env = Box::into_raw(Box::new(99_i128)).cast::<c_void>();
        let closure = prime_make_closure(Some(read_env), env, Some(release_env));
        let result = take(prime_builtin_function_run(closure));
        assert_eq!(result.as_int("test"), Ok(99));
        assert_eq!(CLOSURE_RELEASES.load(Ordering::SeqCst), 0);
        prime_free(closure);
        assert_eq!(CLOSURE_RELEASES.load(Ordering::SeqCst), 1);
    }
}

unsafe extern "C" fn failing_branch() -> *mut Value {
    let tag = prime_make_tag(c"NotAnInt".as_ptr());
    let result = prime_builtin_int_bit_length(tag);
    prime_free(tag);
    result
}

#[test]
fn nested_failure_propagates_out_of_ifelse() {
    unsafe {
        prime_clear_error();
        let then = prime_make_function(Some(failing_branch));
        let otherwise = prime_make_function(Some(else_branch));
        assert!(prime_builtin_ifelse(&TRUE, then, otherwise).is_null());
        let message = last_error_text().expect("pending error");
        assert!(message.contains("int_bit_length"), "{message}");
        prime_free(then);
        prime_free(otherwise);
    }
}

#[test]
fn typeof_names_the_kind() {
    unsafe {
        let text = prime_make_text(c"x".as_ptr());
        let kind = take(prime_builtin_typeof(text));
        assert_eq!(kind.as_tag("test").map(|t| t.as_bytes()), Ok(&b"text"[..]));
        let raw = prime_builtin_typeof(&TRUE);
        assert!(!ptr::eq(raw, &TRUE));
        assert_eq!(take(raw).as_tag("test").map(|t| t.as_bytes()), Ok(&b"tag"[..]));
        prime_free(text);
    }
}

#[test]
fn freeing_singletons_and_null_is_a_no_op() {
    unsafe {
        prime_free(&ENVIRONMENT as *const Value as *mut Value);
        prime_free(&TRUE as *const Value as *mut Value);
        prime_free(ptr::null_mut());
        let name = CStr::from_ptr(
            ENVIRONMENT
                .as_tag("test")
                .map(|t| t.as_ptr())
                .expect("environment is a tag"),
        );
        assert_eq!(name.to_bytes(), b"Environment");
    }
}

#[test]
fn print_of_null_records_an_error() {
    unsafe {
        prime_clear_error();
        prime_print_value(ptr::null());
        let message = last_error_text().expect("pending error");
        assert!(message.contains("print"), "{message}");
    }
}

unsafe extern "C" fn returns_null() -> *mut Value {
    ptr::null_mut()
}

#[test]
fn successful_calls_drop_an_earlier_failure() {
    unsafe {
        let int = prime_make_int(1);
        let tag = prime_make_tag(c"Two".as_ptr());
        assert!(prime_builtin_int_add(int, tag).is_null());

        let sum = take(prime_builtin_int_add(int, int));
        assert_eq!(sum.as_int("test"), Ok(2));
        assert!(last_error_text().is_none());

        assert!(prime_builtin_int_add(int, tag).is_null());
        let thunk = Thunk::from_fn(returns_null);
        assert_eq!(thunk.force().err(), Some(RuntimeError::ThunkReturnedNull));

        let function = prime_make_function(Some(returns_null));
        assert!(prime_builtin_function_run(function).is_null());
        let message = last_error_text().expect("pending error");
        assert_eq!(message, "a thunk returned no value");

        prime_free(function);
        prime_free(int);
        prime_free(tag);
    }
}

#[test]
fn text_ranges_through_the_boundary() {
    unsafe {
        let text = prime_make_text(c"  héllo ".as_ptr());
        let trimmed = take(prime_builtin_text_trim_start(text));
        assert_eq!(trimmed.as_text("test").map(|t| t.as_bytes()), Ok("héllo ".as_bytes()));

        let start = prime_make_int(3);
        let end = prime_make_int(5);
        let range = take(prime_builtin_text_get_range(text, start, end));
        assert_eq!(range.as_text("test").map(|t| t.as_bytes()), Ok("él".as_bytes()));

        prime_clear_error();
        assert!(prime_builtin_text_get_range(text, end, start).is_null());
        let message = last_error_text().expect("pending error");
        assert!(message.contains("5..3"), "{message}");

        for value in [text, start, end] {
            prime_free(value);
        }
    }
}
