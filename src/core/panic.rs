//! # Panic containment for handler invocations.
//!
//! [`guard`] runs a closure under `catch_unwind` and converts a panic into a
//! [`PanicReport`] carrying the panic message, its location and a backtrace.
//!
//! The backtrace has to be taken **at the panic site** (after unwinding the
//! frames are gone), so a process-wide panic hook is installed once. It only
//! acts on threads currently inside [`guard`]; panics anywhere else go to the
//! previously installed hook unchanged.
//!
//! ```text
//! guard(f) ── CAPTURING=true ──► f() ── panic! ──► hook: record location + backtrace
//!                                   └── unwind ──► catch_unwind ──► PanicReport
//! ```

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

static HOOK: Once = Once::new();

thread_local! {
    /// Capture mode for the current thread: `None` outside a guard.
    static CAPTURING: Cell<Option<bool>> = const { Cell::new(None) };
    /// Site information recorded by the hook for the innermost guard.
    static SITE: RefCell<Option<(String, String)>> = const { RefCell::new(None) };
}

/// A contained panic.
#[derive(Debug, Clone)]
pub(crate) struct PanicReport {
    /// Panic payload rendered as text.
    pub message: String,
    /// `file:line:col` of the panic, when known.
    pub location: String,
    /// Rendered backtrace (never empty).
    pub backtrace: String,
}

/// Runs `f`, turning a panic into a [`PanicReport`].
///
/// `backtrace` selects a full backtrace; otherwise only the location is kept.
pub(crate) fn guard<R>(backtrace: bool, f: impl FnOnce() -> R) -> Result<R, PanicReport> {
    install_hook();

    let outer = CAPTURING.with(|c| c.replace(Some(backtrace)));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|c| c.set(outer));

    result.map_err(|payload| {
        let site = SITE.with(|s| s.borrow_mut().take());
        let (location, trace) = site.unwrap_or_else(|| {
            // Hook was replaced by someone else; fall back to the catch site.
            ("unknown".to_string(), Backtrace::force_capture().to_string())
        });
        let backtrace = if trace.is_empty() {
            format!("at {location}")
        } else {
            trace
        };
        PanicReport {
            message: payload_message(payload.as_ref()),
            location,
            backtrace,
        }
    })
}

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            match CAPTURING.with(Cell::get) {
                Some(full) => {
                    let location = info
                        .location()
                        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                        .unwrap_or_else(|| "unknown".to_string());
                    let trace = if full {
                        Backtrace::force_capture().to_string()
                    } else {
                        String::new()
                    };
                    SITE.with(|s| *s.borrow_mut() = Some((location, trace)));
                }
                None => previous(info),
            }
        }));
    });
}

pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_values() {
        assert_eq!(guard(true, || 7).unwrap(), 7);
    }

    #[test]
    fn captures_message_and_backtrace() {
        let report = guard(true, || -> u32 { panic!("kaboom {}", 42) }).unwrap_err();
        assert_eq!(report.message, "kaboom 42");
        assert!(report.location.contains("panic.rs"));
        assert!(!report.backtrace.is_empty());
    }

    #[test]
    fn location_only_without_backtrace() {
        let report = guard(false, || -> u8 { panic!("static") }).unwrap_err();
        assert_eq!(report.message, "static");
        assert!(report.backtrace.starts_with("at "));
    }

    #[test]
    fn nested_guards_restore_mode() {
        let outer = guard(true, || -> u8 {
            let inner = guard(false, || -> u8 { panic!("inner") });
            assert!(inner.is_err());
            panic!("outer")
        });
        let report = outer.unwrap_err();
        assert_eq!(report.message, "outer");
        assert!(!report.backtrace.starts_with("at "));
    }

    #[test]
    fn guard_is_reusable_after_panic() {
        assert!(guard(true, || -> u8 { panic!("first") }).is_err());
        assert_eq!(guard(true, || "ok").unwrap(), "ok");
    }
}
