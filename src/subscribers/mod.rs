//! # Diagnostics consumers.
//!
//! Receivers obtained from [`Registry::diagnostics`](crate::Registry::diagnostics)
//! see every [`Diagnostic`](crate::Diagnostic) published after they were created.
//! This module ships the built-in one, [`LogWriter`].

mod log;

pub use log::LogWriter;
