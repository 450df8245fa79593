//! Stderr tracing, gated by `PRIME_RT_TRACE`. Stdout belongs to the program.

use crate::config;
use crate::runtime::value::Kind;

const PREFIX: &str = "[prime-rt]";

pub fn call(operation: &str) {
    if config::current().traces_calls() {
        eprintln!("{PREFIX} call {operation}");
    }
}

pub fn failure(operation: &str, error: &dyn std::fmt::Display) {
    if config::current().traces_calls() {
        eprintln!("{PREFIX} {operation} failed: {error}");
    }
}

pub fn alloc(kind: Kind) {
    if config::current().traces_allocations() {
        eprintln!("{PREFIX} alloc {kind}");
    }
}

pub fn release(kind: Kind) {
    if config::current().traces_allocations() {
        eprintln!("{PREFIX} release {kind}");
    }
}
