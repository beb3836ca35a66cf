//! Error rendering using ariadne
//!
//! Located errors are drawn over the source with a labelled span; errors
//! without a location are written as a single line.

use crate::{Error, FileError};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use gauge::{Config, compile, render_error};
///
/// let source = "1 + true";
/// if let Err(e) = compile(source, Config::default()) {
///     render_error(&e, source);
/// }
/// ```
pub fn render_error(error: &Error, source: &str) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, source: &str, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

/// Render an error to a String (useful for web UIs, logs, etc.)
pub fn render_error_to_string(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compile(diagnostic) => {
            render_diagnostic(source, diagnostic, "compile error", writer, use_color)
        }
        Error::Runtime { error, cause } => {
            render_diagnostic(source, error, "runtime error", writer, use_color)?;
            if let Some(cause) = cause {
                writeln!(writer, "Caused by: {}", cause)?;
            }
            Ok(())
        }
        Error::ResourceExceeded(diagnostic) => {
            render_diagnostic(source, diagnostic, "resource limit exceeded", writer, use_color)
        }
        Error::Expect(msg) => writeln!(writer, "Unexpected result type: {}", msg),
        Error::Host(e) => writeln!(writer, "Host error: {}", e),
        Error::Config(msg) => writeln!(writer, "Configuration error: {}", msg),
    }
}

fn render_diagnostic(
    source: &str,
    diagnostic: &FileError,
    title: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let Some(span) = diagnostic.span else {
        return writeln!(writer, "{}: {}", title, diagnostic.message);
    };
    // ariadne counts characters, spans count bytes.
    let start = source.get(..span.start).map_or(0, |s| s.chars().count());
    let len = source
        .get(span.start..span.end)
        .map_or(0, |s| s.chars().count())
        .max(1);
    let range = start..start + len;

    let mut colors = ColorGenerator::new();
    colors.next(); // Skip the first color.

    Report::build(ReportKind::Error, ("<input>", range.clone()))
        .with_message(&diagnostic.message)
        .with_config(ariadne::Config::default().with_color(use_color))
        .with_label(
            Label::new(("<input>", range))
                .with_message(title)
                .with_color(colors.next()),
        )
        .finish()
        .write(("<input>", Source::from(source)), &mut *writer)
}
