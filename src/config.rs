use std::env;
use std::sync::OnceLock;

pub const TRACE_VAR: &str = "PRIME_RT_TRACE";
pub const PANIC_EXIT_VAR: &str = "PRIME_RT_PANIC_EXIT";

/// Exit status used when panics are configured to exit instead of abort.
pub const PANIC_EXIT_CODE: i32 = 101;

/// How much of the runtime's activity is logged to stderr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    #[default]
    Off,
    /// Every ABI entry point call.
    Calls,
    /// Calls plus every value allocation and release.
    Alloc,
}

impl TraceLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "off" | "false" => Some(TraceLevel::Off),
            "1" | "on" | "true" | "calls" => Some(TraceLevel::Calls),
            "alloc" | "all" => Some(TraceLevel::Alloc),
            _ => None,
        }
    }
}

/// How `panic` ends the process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanicExit {
    #[default]
    Abort,
    Exit,
}

impl PanicExit {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "abort" => Some(PanicExit::Abort),
            "exit" => Some(PanicExit::Exit),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub trace: TraceLevel,
    pub panic_exit: PanicExit,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolves settings through `lookup`. Unrecognized values fall back to
    /// the defaults and are reported on stderr.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let trace = lookup(TRACE_VAR)
            .map(|raw| {
                TraceLevel::parse(&raw).unwrap_or_else(|| {
                    eprintln!("[prime-rt] ignoring {TRACE_VAR}={raw:?}; expected off, calls or alloc");
                    TraceLevel::Off
                })
            })
            .unwrap_or_default();
        let panic_exit = lookup(PANIC_EXIT_VAR)
            .map(|raw| {
                PanicExit::parse(&raw).unwrap_or_else(|| {
                    eprintln!("[prime-rt] ignoring {PANIC_EXIT_VAR}={raw:?}; expected abort or exit");
                    PanicExit::Abort
                })
            })
            .unwrap_or_default();
        Self { trace, panic_exit }
    }

    pub fn traces_calls(&self) -> bool {
        self.trace >= TraceLevel::Calls
    }

    pub fn traces_allocations(&self) -> bool {
        self.trace >= TraceLevel::Alloc
    }
}

/// The configuration of this process, read from the environment on first use.
pub fn current() -> &'static RuntimeConfig {
    static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();
    CONFIG.get_or_init(RuntimeConfig::from_env)
}
