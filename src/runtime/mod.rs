pub mod abi;
pub mod builtins;
pub mod diagnostics;
pub mod entry_points;
pub mod error;
pub mod handle;
pub mod singletons;
pub mod value;

pub use error::{RuntimeError, RuntimeResult};
pub use handle::Handle;
pub use value::{Kind, Value};
