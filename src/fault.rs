// src/fault.rs

//! Turning a contained panic into something a caller can read.
//!
//! The unwinding stack is gone by the time `catch_unwind` hands over the
//! payload, so location and backtrace are captured by a panic hook on the
//! panicking thread and picked up right after the boundary returns.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::panic;
use std::sync::Once;

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Chain a hook in front of the current one that remembers where the latest
/// panic on each thread happened. Installed at most once per process.
pub(crate) fn install_panic_capture() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let mut trace = match info.location() {
                Some(loc) => format!("at {loc}"),
                None => "at <unknown location>".to_string(),
            };
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                trace.push('\n');
                trace.push_str(&backtrace.to_string());
            }
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Message and trace of a panic that was just caught on this thread.
pub(crate) fn describe_panic(payload: &(dyn Any + Send)) -> (String, String) {
    let trace = LAST_PANIC
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(|| "at <unknown location>".to_string());
    (panic_message(payload), trace)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
