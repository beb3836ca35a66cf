//! Gauge - an embeddable expression language
//!
//! # Overview
//!
//! Gauge evaluates small, side-effect free expressions against data supplied
//! by a host application. Common use cases include:
//!
//! - Access rules and feature flags
//! - Alerting and filtering conditions
//! - Data transformations and mappings
//! - Business rules engines
//!
//! # Quick Start
//!
//! ```ignore
//! use gauge::{Config, Value, compile, run};
//!
//! let env = Value::map([("items", Value::from(vec![1, 2, 3]))]);
//!
//! // Compile once: parse, type check against the environment, optimize.
//! let program = compile("all(items, {# > 0})", Config::default().env(env.clone()).as_bool())?;
//!
//! // Run many times, concurrently if needed.
//! assert_eq!(run(&program, &env)?, Value::Bool(true));
//! ```
//!
//! # Host Functions
//!
//! Functions are ordinary environment values:
//!
//! ```ignore
//! use gauge::values::{Function, TypedFn};
//!
//! let env = Value::map([
//!     ("double", Value::from(Function::typed("double", TypedFn::IntToInt(|n| n * 2)))),
//! ]);
//! ```
//!
//! # Errors
//!
//! Every failure is an [`Error`]. Located errors render as
//! `message (line:column)` followed by a source snippet; [`render_error`]
//! produces a colored report for terminals instead.

pub use gauge_core::api::{Config, Expect, compile, eval, run};
pub use gauge_core::diagnostics::{FileError, Span};
pub use gauge_core::errors::{Error, HostError};
pub use gauge_core::types::{FuncType, Nature, StructType, Type};
pub use gauge_core::values::{Function, Object, Record, TypedFn, Value};
pub use gauge_core::vm::{Debugger, Limits, Program, Step};
pub use gauge_core::patcher::ValueGetter;
pub use gauge_core::{ast, patcher, types, values};

mod error_renderer;

pub use error_renderer::{render_error, render_error_to, render_error_to_string, render_error_to_string_no_color};
