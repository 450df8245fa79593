use crate::runtime::error::{
    clear_last_error, set_last_error, take_last_error, RuntimeError, RuntimeResult,
};
use crate::runtime::handle::Handle;
use crate::trace;
use std::borrow::Cow;
use std::ffi::{c_char, c_void, CStr, CString};
use std::fmt;
use std::ptr::{self, NonNull};

/// The closed set of value types. The discriminants are part of the ABI and
/// match the tag word at the start of every [`Value`].
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Int = 0,
    Text = 1,
    Tag = 2,
    List = 3,
    Struct = 4,
    Function = 5,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::Int,
        Kind::Text,
        Kind::Tag,
        Kind::List,
        Kind::Struct,
        Kind::Function,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kind::Int => "int",
            Kind::Text => "text",
            Kind::Tag => "tag",
            Kind::List => "list",
            Kind::Struct => "struct",
            Kind::Function => "function",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A runtime value as seen by generated code: a `u32` kind word followed by a
/// payload union.
///
/// `List` and `Struct` are reserved and carry no payload; nothing in the
/// runtime constructs them.
#[repr(C, u32)]
pub enum Value {
    Int(i128),
    Text(Buffer),
    Tag(Buffer),
    List,
    Struct,
    Function(Thunk),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Int(_) => Kind::Int,
            Value::Text(_) => Kind::Text,
            Value::Tag(_) => Kind::Tag,
            Value::List => Kind::List,
            Value::Struct => Kind::Struct,
            Value::Function(_) => Kind::Function,
        }
    }

    pub fn as_int(&self, operation: &'static str) -> RuntimeResult<i128> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(other.mismatch(operation, Kind::Int)),
        }
    }

    pub fn as_text(&self, operation: &'static str) -> RuntimeResult<&Buffer> {
        match self {
            Value::Text(text) => Ok(text),
            other => Err(other.mismatch(operation, Kind::Text)),
        }
    }

    pub fn as_tag(&self, operation: &'static str) -> RuntimeResult<&Buffer> {
        match self {
            Value::Tag(tag) => Ok(tag),
            other => Err(other.mismatch(operation, Kind::Tag)),
        }
    }

    pub fn as_thunk(&self, operation: &'static str) -> RuntimeResult<&Thunk> {
        match self {
            Value::Function(thunk) => Ok(thunk),
            other => Err(other.mismatch(operation, Kind::Function)),
        }
    }

    fn mismatch(&self, operation: &'static str, expected: Kind) -> RuntimeError {
        RuntimeError::TypeMismatch {
            operation,
            expected,
            found: self.kind(),
        }
    }

    /// Renders the value for debugging: text is quoted, everything else is
    /// shown the way `print` would show it.
    pub fn debug_text(&self) -> String {
        match self {
            Value::Int(value) => value.to_string(),
            Value::Text(text) => format!("{:?}", text.to_string_lossy()),
            Value::Tag(tag) => tag.to_string_lossy().into_owned(),
            Value::List | Value::Struct | Value::Function(_) => format!("<{}>", self.kind()),
        }
    }
}

/// The `print` rendering of a value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Text(text) => write!(f, "{}", text.to_string_lossy()),
            Value::Tag(tag) => write!(f, "{}", tag.to_string_lossy()),
            other => write!(f, "<unknown type {}>", other.kind()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value::{:?}({})", self.kind(), self.debug_text())
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        trace::release(self.kind());
    }
}

/// Owned, NUL-terminated byte buffer backing `Text` and `Tag` payloads.
#[repr(transparent)]
pub struct Buffer(NonNull<c_char>);

// The buffer is never mutated after construction and has a single owner.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    /// Copies `bytes` into a fresh allocation of `len + 1` bytes. Input stops
    /// at the first NUL, which is where readers of the buffer stop as well.
    pub fn new(bytes: &[u8]) -> Self {
        let content = match bytes.iter().position(|&byte| byte == 0) {
            Some(end) => &bytes[..end],
            None => bytes,
        };
        // SAFETY: `content` holds no NUL byte.
        let owned = unsafe { CString::from_vec_unchecked(content.to_vec()) };
        // SAFETY: `CString::into_raw` never returns null.
        Self(unsafe { NonNull::new_unchecked(owned.into_raw()) })
    }

    /// Wraps a string with static storage.
    ///
    /// # Safety
    /// The resulting buffer must never be dropped, so it may only back values
    /// with process lifetime.
    pub(crate) const unsafe fn from_static(name: &'static CStr) -> Self {
        Self(NonNull::new_unchecked(name.as_ptr().cast_mut()))
    }

    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: the pointer always refers to a live NUL-terminated string.
        unsafe { CStr::from_ptr(self.0.as_ptr()) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.as_c_str().to_bytes()
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.as_c_str().to_bytes_with_nul()
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.0.as_ptr()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        self.as_c_str().to_string_lossy()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // SAFETY: heap buffers come from `CString::into_raw` in `Buffer::new`;
        // static buffers live inside singletons, which are never dropped.
        drop(unsafe { CString::from_raw(self.0.as_ptr()) });
    }
}

/// A bare thunk as emitted by the code generator.
pub type ThunkFn = unsafe extern "C" fn() -> *mut Value;
/// A thunk that receives its captured environment.
pub type ClosureFn = unsafe extern "C" fn(env: *mut c_void) -> *mut Value;
/// Releases a captured environment once the owning value is freed.
pub type ReleaseFn = unsafe extern "C" fn(env: *mut c_void);

/// A zero-argument deferred computation.
///
/// Bare code pointers are stored in `env` and invoked through a trampoline, so
/// every thunk is called the same way regardless of how it was built.
#[repr(C)]
pub struct Thunk {
    call: ClosureFn,
    env: *mut c_void,
    release: Option<ReleaseFn>,
}

// Closure environments are required to be `Send + Sync`; bare thunks carry
// no state.
unsafe impl Send for Thunk {}
unsafe impl Sync for Thunk {}

impl Thunk {
    /// # Safety
    /// Every call of `code` must return null, the address of a singleton, or
    /// a pointer obtained from [`Handle::into_raw`] that nothing else owns.
    pub unsafe fn from_fn(code: ThunkFn) -> Self {
        Self {
            call: call_bare,
            env: code as *const () as *mut c_void,
            release: None,
        }
    }

    pub fn from_closure<F>(body: F) -> Self
    where
        F: Fn() -> RuntimeResult<Handle> + Send + Sync + 'static,
    {
        Self {
            call: call_closure::<F>,
            env: Box::into_raw(Box::new(body)).cast::<c_void>(),
            release: Some(release_closure::<F>),
        }
    }

    /// # Safety
    /// `call` must be safe to invoke with `env` for as long as the thunk lives,
    /// and `release`, if present, must accept `env` exactly once.
    pub unsafe fn from_raw_parts(
        call: ClosureFn,
        env: *mut c_void,
        release: Option<ReleaseFn>,
    ) -> Self {
        Self { call, env, release }
    }

    /// Runs the deferred computation once. A thunk that reports failure by
    /// returning null surfaces the error it recorded on the current thread.
    pub fn force(&self) -> RuntimeResult<Handle> {
        clear_last_error();
        // SAFETY: the constructors above guarantee `call` accepts `env`, and a
        // non-null result is a value produced by the runtime.
        let result = unsafe { Handle::from_raw((self.call)(self.env)) };
        result.ok_or_else(|| take_last_error().unwrap_or(RuntimeError::ThunkReturnedNull))
    }
}

impl Drop for Thunk {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            // SAFETY: `release` is paired with `env` and runs exactly once.
            unsafe { release(self.env) };
            self.env = ptr::null_mut();
        }
    }
}

unsafe extern "C" fn call_bare(env: *mut c_void) -> *mut Value {
    // SAFETY: `Thunk::from_fn` stored a `ThunkFn` in `env`.
    let code = unsafe { std::mem::transmute::<*mut c_void, ThunkFn>(env) };
    unsafe { code() }
}

unsafe extern "C" fn call_closure<F>(env: *mut c_void) -> *mut Value
where
    F: Fn() -> RuntimeResult<Handle>,
{
    // SAFETY: `env` was produced by `Box::into_raw` for an `F`.
    let body = unsafe { &*env.cast::<F>() };
    match body() {
        Ok(handle) => handle.into_raw(),
        Err(error) => {
            set_last_error(error);
            ptr::null_mut()
        }
    }
}

unsafe extern "C" fn release_closure<F>(env: *mut c_void) {
    // SAFETY: `env` was produced by `Box::into_raw` for an `F`.
    drop(unsafe { Box::from_raw(env.cast::<F>()) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn buffer_reserves_room_for_terminator() {
        let buffer = Buffer::new(b"hello");
        assert_eq!(buffer.as_bytes(), b"hello");
        assert_eq!(buffer.as_bytes_with_nul(), b"hello\0");
        assert_eq!(buffer.as_bytes_with_nul().len(), 6);
    }

    #[test]
    fn buffer_stops_at_embedded_nul() {
        let buffer = Buffer::new(b"ab\0cd");
        assert_eq!(buffer.as_bytes(), b"ab");
    }

    #[test]
    fn empty_buffer_is_just_a_terminator() {
        let buffer = Buffer::new(b"");
        assert_eq!(buffer.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn kind_word_leads_the_layout() {
        let values = [
            Value::Int(7),
            Value::Text(Buffer::new(b"t")),
            Value::Tag(Buffer::new(b"T")),
            Value::List,
            Value::Struct,
        ];
        for value in &values {
            // SAFETY: `Value` is `repr(C, u32)`, so the tag is the first word.
            let word = unsafe { *(value as *const Value as *const u32) };
            assert_eq!(word, value.kind() as u32);
        }
    }

    #[test]
    fn payload_union_fits_an_i128() {
        assert!(mem::size_of::<Value>() >= mem::size_of::<u32>() + mem::size_of::<i128>());
        assert_eq!(mem::align_of::<Value>(), mem::align_of::<i128>());
        assert_eq!(mem::size_of::<Buffer>(), mem::size_of::<*const c_char>());
    }

    #[test]
    fn kind_names_are_lowercase() {
        let names: Vec<_> = Kind::ALL.iter().map(|kind| kind.name()).collect();
        assert_eq!(
            names,
            ["int", "text", "tag", "list", "struct", "function"]
        );
    }

    #[test]
    fn accessors_reject_other_kinds() {
        let tag = Value::Tag(Buffer::new(b"x"));
        assert_eq!(
            tag.as_int("int_add"),
            Err(RuntimeError::TypeMismatch {
                operation: "int_add",
                expected: Kind::Int,
                found: Kind::Tag,
            })
        );
        assert!(tag.as_tag("tag").is_ok());
        assert!(Value::Int(1).as_thunk("ifelse").is_err());
    }

    #[test]
    fn display_marks_reserved_kinds() {
        assert_eq!(Value::Int(-12).to_string(), "-12");
        assert_eq!(Value::Text(Buffer::new(b"hi there")).to_string(), "hi there");
        assert_eq!(Value::List.to_string(), "<unknown type list>");
        assert_eq!(Value::Struct.to_string(), "<unknown type struct>");
    }

    #[test]
    fn debug_text_quotes_text_only() {
        assert_eq!(Value::Text(Buffer::new(b"a\"b")).debug_text(), "\"a\\\"b\"");
        assert_eq!(Value::Tag(Buffer::new(b"Ok")).debug_text(), "Ok");
        assert_eq!(Value::Struct.debug_text(), "<struct>");
    }

    #[test]
    fn closure_environment_is_released_once() {
        let captured = Arc::new(());
        let probe = Arc::clone(&captured);
        let thunk = Thunk::from_closure(move || {
            let _keep = &probe;
            Ok(Handle::int(1))
        });
        assert_eq!(Arc::strong_count(&captured), 2);
        assert_eq!(thunk.force().map(|value| value.as_int("test")), Ok(Ok(1)));
        drop(thunk);
        assert_eq!(Arc::strong_count(&captured), 1);
    }

    #[test]
    fn failing_closure_surfaces_its_error() {
        let thunk = Thunk::from_closure(|| Err(RuntimeError::DivisionByZero { operation: "x" }));
        assert_eq!(
            thunk.force().err(),
            Some(RuntimeError::DivisionByZero { operation: "x" })
        );
    }

    static BARE_CALLS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn bare_thunk() -> *mut Value {
        BARE_CALLS.fetch_add(1, Ordering::SeqCst);
        Handle::int(42).into_raw()
    }

    #[test]
    fn bare_thunk_goes_through_trampoline() {
        // SAFETY: `bare_thunk` returns a fresh value from `Handle::into_raw`.
        let thunk = unsafe { Thunk::from_fn(bare_thunk) };
        let before = BARE_CALLS.load(Ordering::SeqCst);
        let value = thunk.force().expect("thunk value");
        assert_eq!(value.as_int("test"), Ok(42));
        assert_eq!(BARE_CALLS.load(Ordering::SeqCst), before + 1);
    }

    unsafe extern "C" fn null_thunk() -> *mut Value {
        ptr::null_mut()
    }

    #[test]
    fn null_result_without_pending_error() {
        clear_last_error();
        // SAFETY: null is an allowed result.
        let thunk = unsafe { Thunk::from_fn(null_thunk) };
        assert_eq!(thunk.force().err(), Some(RuntimeError::ThunkReturnedNull));
    }

    #[test]
    fn null_result_ignores_an_earlier_failure() {
        set_last_error(RuntimeError::DivisionByZero {
            operation: "int_modulo",
        });
        // SAFETY: null is an allowed result.
        let thunk = unsafe { Thunk::from_fn(null_thunk) };
        assert_eq!(thunk.force().err(), Some(RuntimeError::ThunkReturnedNull));
    }

    unsafe extern "C" fn singleton_thunk() -> *mut Value {
        Handle::truth().into_raw()
    }

    #[test]
    fn bare_thunk_may_return_a_singleton() {
        // SAFETY: `singleton_thunk` returns the address of a singleton.
        let thunk = unsafe { Thunk::from_fn(singleton_thunk) };
        let value = thunk.force().expect("thunk value");
        assert!(value.is_singleton());
        assert!(value.is(&crate::runtime::singletons::TRUE));
    }
}
