use crate::runtime::error::RuntimeResult;
use crate::runtime::singletons::{self, ENVIRONMENT, FALSE, TRUE};
use crate::runtime::value::{Buffer, Thunk, ThunkFn, Value};
use crate::trace;
use std::fmt;
use std::ops::Deref;
use std::ptr;

/// Owner of one runtime value.
///
/// Heap values are released when the handle is dropped. Singletons live for
/// the whole process and dropping a handle to one does nothing.
pub enum Handle {
    Singleton(&'static Value),
    Heap(Box<Value>),
}

impl Handle {
    pub fn new(value: Value) -> Self {
        trace::alloc(value.kind());
        Handle::Heap(Box::new(value))
    }

    pub fn int(value: i128) -> Self {
        Self::new(Value::Int(value))
    }

    pub fn text(bytes: impl AsRef<[u8]>) -> Self {
        Self::new(Value::Text(Buffer::new(bytes.as_ref())))
    }

    pub fn tag(name: impl AsRef<[u8]>) -> Self {
        Self::new(Value::Tag(Buffer::new(name.as_ref())))
    }

    /// # Safety
    /// Same contract as [`Thunk::from_fn`]: `code` must return null, a
    /// singleton address, or a pointer from [`Handle::into_raw`].
    pub unsafe fn function(code: ThunkFn) -> Self {
        Self::new(Value::Function(unsafe { Thunk::from_fn(code) }))
    }

    pub fn closure<F>(body: F) -> Self
    where
        F: Fn() -> RuntimeResult<Handle> + Send + Sync + 'static,
    {
        Self::new(Value::Function(Thunk::from_closure(body)))
    }

    pub fn from_bool(value: bool) -> Self {
        Handle::Singleton(singletons::bool_to_tag(value))
    }

    pub fn truth() -> Self {
        Handle::Singleton(&TRUE)
    }

    pub fn falsity() -> Self {
        Handle::Singleton(&FALSE)
    }

    pub fn environment() -> Self {
        Handle::Singleton(&ENVIRONMENT)
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Handle::Singleton(_))
    }

    /// Identity comparison, used for the boolean singletons.
    pub fn is(&self, other: &Value) -> bool {
        ptr::eq(self.deref(), other)
    }

    /// Hands ownership to generated code.
    pub fn into_raw(self) -> *mut Value {
        match self {
            Handle::Singleton(value) => value as *const Value as *mut Value,
            Handle::Heap(value) => Box::into_raw(value),
        }
    }

    /// Takes ownership back from generated code. Singleton addresses are
    /// recognized and never turned into heap handles.
    ///
    /// # Safety
    /// `raw` must be null, a singleton address, or a pointer obtained from
    /// [`Handle::into_raw`] that has not been reclaimed yet.
    pub unsafe fn from_raw(raw: *mut Value) -> Option<Handle> {
        if raw.is_null() {
            return None;
        }
        if let Some(singleton) = singletons::singleton_at(raw) {
            return Some(Handle::Singleton(singleton));
        }
        Some(Handle::Heap(unsafe { Box::from_raw(raw) }))
    }
}

impl Deref for Handle {
    type Target = Value;

    fn deref(&self) -> &Value {
        match self {
            Handle::Singleton(value) => value,
            Handle::Heap(value) => value,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Singleton(value) => write!(f, "Singleton({value:?})"),
            Handle::Heap(value) => write!(f, "Heap({value:?})"),
        }
    }
}

/// Releases a value. Singletons are skipped; text and tag buffers and closure
/// environments are released together with the value that owns them.
pub fn free(handle: Handle) {
    drop(handle);
}
