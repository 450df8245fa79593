use prime_rt::diagnostics::{report_io_error, report_script_error};
use prime_rt::driver::run_source;
use prime_rt::header;
use std::env;
use std::fs;
use std::path::Path;
use std::process;

const USAGE: &str = "Usage: prime-rt [eval <expression> | run <file> | header [output.h] | ir [output.ll]]";

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let (command, rest) = match args.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => usage(),
    };

    match (command, rest) {
        ("eval", [expression]) => run_script("<eval>", expression),
        ("run", [filename]) => {
            let path = Path::new(filename);
            match fs::read_to_string(path) {
                Ok(source) => run_script(filename, &source),
                Err(err) => {
                    report_io_error(path, &err);
                    process::exit(1);
                }
            }
        }
        ("header", []) => print!("{}", header::render()),
        ("header", [output]) => write_output(Path::new(output), &header::render()),
        ("ir", output) if output.len() <= 1 => emit_ir(output.first().map(Path::new)),
        _ => usage(),
    }
}

fn run_script(name: &str, source: &str) {
    if let Err(err) = run_source(name, source) {
        report_script_error(err);
        process::exit(1);
    }
}

fn write_output(path: &Path, contents: &str) {
    if let Err(err) = fs::write(path, contents) {
        report_io_error(path, &err);
        process::exit(1);
    }
}

#[cfg(feature = "llvm")]
fn emit_ir(output: Option<&Path>) {
    let ir = prime_rt::codegen::declarations_ir();
    match output {
        Some(path) => write_output(path, &ir),
        None => print!("{ir}"),
    }
}

#[cfg(not(feature = "llvm"))]
fn emit_ir(_output: Option<&Path>) {
    eprintln!("The `ir` command requires building prime-rt with the `llvm` feature.");
    process::exit(1);
}

fn usage() -> ! {
    eprintln!("{USAGE}");
    process::exit(1);
}
