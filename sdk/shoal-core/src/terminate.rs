use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicBool, Ordering};

use log::error;

static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs a process-level panic hook that logs the panic together with a
/// captured backtrace and flushes the logger before the default hook runs.
/// Opt-in; nothing in the library depends on it being installed.
pub fn install_fatal_error_handler() {
    if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::force_capture();

        error!("Fatal error: {info}");
        error!("Backtrace:\n{backtrace}");

        log::logger().flush();

        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent() {
        install_fatal_error_handler();
        install_fatal_error_handler();
        assert!(HANDLER_INSTALLED.load(Ordering::SeqCst));
    }
}
