//! C header for code that links against the runtime.

use crate::runtime::entry_points::{AbiType, EntryPoint, ENTRY_POINTS, SINGLETONS};
use crate::runtime::value::Kind;
use std::fmt::Write;

const GUARD: &str = "PRIME_RT_H";

fn c_type(ty: AbiType) -> &'static str {
    match ty {
        AbiType::Void => "void",
        AbiType::Never => "_Noreturn void",
        AbiType::Bool => "bool",
        AbiType::Int => "__int128",
        AbiType::ValueRef => "const prime_value_t *",
        AbiType::OwnedValue => "prime_value_t *",
        AbiType::CString => "const char *",
        AbiType::ThunkFn => "prime_thunk_fn",
        AbiType::ClosureFn => "prime_closure_fn",
        AbiType::Env => "void *",
        AbiType::ReleaseFn => "prime_release_fn",
    }
}

fn declaration(entry: &EntryPoint) -> String {
    let params = if entry.params.is_empty() {
        "void".to_string()
    } else {
        entry
            .params
            .iter()
            .map(|(name, ty)| {
                let ty = c_type(*ty);
                if ty.ends_with('*') {
                    format!("{ty}{name}")
                } else {
                    format!("{ty} {name}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let returns = c_type(entry.returns);
    let separator = if returns.ends_with('*') { "" } else { " " };
    format!("{returns}{separator}{}({params});", entry.name)
}

pub fn render() -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_header(&mut out);
    out
}

fn write_header(out: &mut String) -> std::fmt::Result {
    writeln!(out, "/* Generated by prime-rt {}. */", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "#ifndef {GUARD}")?;
    writeln!(out, "#define {GUARD}")?;
    writeln!(out)?;
    writeln!(out, "#include <stdbool.h>")?;
    writeln!(out, "#include <stdint.h>")?;
    writeln!(out)?;
    writeln!(out, "#ifdef __cplusplus")?;
    writeln!(out, "extern \"C\" {{")?;
    writeln!(out, "#endif")?;
    writeln!(out)?;

    writeln!(out, "typedef enum prime_kind {{")?;
    for kind in Kind::ALL {
        writeln!(
            out,
            "    PRIME_KIND_{} = {},",
            kind.name().to_ascii_uppercase(),
            kind as u32
        )?;
    }
    writeln!(out, "}} prime_kind_t;")?;
    writeln!(out)?;

    writeln!(out, "typedef struct prime_value prime_value_t;")?;
    writeln!(out, "typedef prime_value_t *(*prime_thunk_fn)(void);")?;
    writeln!(out, "typedef prime_value_t *(*prime_closure_fn)(void *env);")?;
    writeln!(out, "typedef void (*prime_release_fn)(void *env);")?;
    writeln!(out)?;
    writeln!(out, "/* Invoke as call(env). release may be NULL. */")?;
    writeln!(out, "typedef struct prime_thunk {{")?;
    writeln!(out, "    prime_closure_fn call;")?;
    writeln!(out, "    void *env;")?;
    writeln!(out, "    prime_release_fn release;")?;
    writeln!(out, "}} prime_thunk_t;")?;
    writeln!(out)?;
    writeln!(out, "struct prime_value {{")?;
    writeln!(out, "    uint32_t kind;")?;
    writeln!(out, "    union {{")?;
    writeln!(out, "        __int128 int_value;")?;
    writeln!(out, "        const char *text;")?;
    writeln!(out, "        const char *tag;")?;
    writeln!(out, "        prime_thunk_t function;")?;
    writeln!(out, "    }} payload;")?;
    writeln!(out, "}};")?;
    writeln!(out)?;

    for singleton in SINGLETONS {
        writeln!(out, "extern const prime_value_t {singleton};")?;
    }
    writeln!(out)?;

    for entry in ENTRY_POINTS {
        writeln!(out, "{}", declaration(entry))?;
    }
    writeln!(out)?;

    writeln!(out, "#ifdef __cplusplus")?;
    writeln!(out, "}}")?;
    writeln!(out, "#endif")?;
    writeln!(out)?;
    writeln!(out, "#endif /* {GUARD} */")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_every_entry_point() {
        let header = render();
        for entry in ENTRY_POINTS {
            assert!(
                header.contains(&format!("{}(", entry.name)),
                "missing {}",
                entry.name
            );
        }
        for singleton in SINGLETONS {
            assert!(header.contains(&format!("extern const prime_value_t {singleton};")));
        }
    }

    #[test]
    fn pointer_declarations_are_formatted() {
        let header = render();
        assert!(header.contains("prime_value_t *prime_make_int(__int128 value);"));
        assert!(header.contains("bool prime_tag_to_bool(const prime_value_t *value);"));
        assert!(header.contains("_Noreturn void prime_panic(const prime_value_t *reason);"));
        assert!(header.contains("prime_value_t *prime_last_error(void);"));
        assert!(header.contains(
            "prime_value_t *prime_make_closure(prime_closure_fn call, void *env, prime_release_fn release);"
        ));
    }

    #[test]
    fn kind_enum_matches_discriminants() {
        let header = render();
        assert!(header.contains("PRIME_KIND_INT = 0,"));
        assert!(header.contains("PRIME_KIND_FUNCTION = 5,"));
    }

    #[test]
    fn guard_wraps_the_header() {
        let header = render();
        assert!(header.contains("#ifndef PRIME_RT_H"));
        assert!(header.trim_end().ends_with("#endif /* PRIME_RT_H */"));
    }
}
