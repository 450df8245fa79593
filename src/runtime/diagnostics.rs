use crate::config::{self, PanicExit, PANIC_EXIT_CODE};
use crate::runtime::value::Value;
use std::io::{self, Write};
use std::process;

pub const PANIC_PREAMBLE: &str = "The program panicked for the following reason: ";

/// Writes the `print` rendering of `value`. Unsupported kinds show up as
/// `<unknown type ...>` instead of being skipped.
pub fn render(out: &mut impl Write, value: &Value) -> io::Result<()> {
    match value {
        Value::Int(value) => write!(out, "{value}"),
        Value::Text(bytes) | Value::Tag(bytes) => out.write_all(bytes.as_bytes()),
        other => write!(out, "{other}"),
    }
}

pub fn print(value: &Value) {
    let mut stdout = io::stdout().lock();
    let _ = render(&mut stdout, value);
    let _ = stdout.flush();
}

/// Writes the panic report for `reason`.
pub fn render_panic(out: &mut impl Write, reason: &Value) -> io::Result<()> {
    writeln!(out, "{PANIC_PREAMBLE}")?;
    render(out, reason)?;
    writeln!(out)
}

/// Reports `reason` and terminates the process. There is no unwinding and no
/// way to resume.
pub fn panic(reason: &Value) -> ! {
    {
        let mut stdout = io::stdout().lock();
        let _ = render_panic(&mut stdout, reason);
        let _ = stdout.flush();
    }
    match config::current().panic_exit {
        PanicExit::Abort => process::abort(),
        PanicExit::Exit => process::exit(PANIC_EXIT_CODE),
    }
}
