#[cfg(feature = "llvm")]
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod header;
pub mod runtime;
pub mod trace;

#[cfg(test)]
mod tests;
