//! Engine of the gauge expression language.
//!
//! Source text flows through [`parser`], [`checker`], [`optimizer`] and
//! [`compiler`] into a [`vm::Program`], which [`vm`] runs against a host
//! environment. [`api`] wires the stages together.

pub mod api;
pub mod ast;
pub mod checker;
pub mod compiler;
pub mod diagnostics;
pub mod errors;
pub mod optimizer;
pub mod parser;
pub mod patcher;
pub mod types;
pub mod values;
pub mod vm;

pub use api::{Config, Expect, compile, eval, run};
pub use errors::{Error, HostError};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
