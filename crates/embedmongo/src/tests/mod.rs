//! Test suites for the embedded server lifecycle.

#[cfg(unix)]
mod launcher;
mod support;
