//! Configuration constants for subprocess transport

/// Dangerous environment variables that should not be passed to subprocess
///
/// These variables can affect how the subprocess loads and executes code.
pub const DANGEROUS_ENV_VARS: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "PATH",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "PERL5LIB",
    "RUBYLIB",
];

/// Environment variable carrying the bridge version to the agent
pub const VERSION_ENV_VAR: &str = "QUERY_BRIDGE_VERSION";

/// Environment variable carrying the session ID to the agent
pub const SESSION_ENV_VAR: &str = "QUERY_BRIDGE_SESSION";
