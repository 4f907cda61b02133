//! Panic hook for crash reporting

use backtrace::Backtrace;
use chrono::Local;
use std::any::Any;
use std::panic::PanicHookInfo;

/// Initialize the panic hook for crash reporting
pub fn init_panic_hook() {
    std::panic::set_hook(Box::new(panic_handler));
    tracing::debug!("Panic hook initialized");
}

fn payload_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<unknown>")
}

fn panic_handler(info: &PanicHookInfo) {
    let backtrace = Backtrace::new();
    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or("<unnamed>");
    let timestamp = Local::now().to_rfc3339();

    let report = format!(
        "=== CRITICAL PANIC ===\n\
         Timestamp: {}\n\
         Thread: {}\n\
         Location: {:?}\n\
         Payload: {}\n\n\
         Stack Trace:\n{:?}",
        timestamp,
        thread_name,
        info.location(),
        payload_message(info.payload()),
        backtrace
    );

    // stderr first, tracing may already be torn down
    eprintln!("{}", report);
    tracing::error!("{}", report);

    let dump_filename = format!("filer_crash_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));
    let dump_dir = super::log_dir();
    let dump_path = if dump_dir.is_dir() {
        dump_dir.join(&dump_filename)
    } else {
        std::env::temp_dir().join(&dump_filename)
    };

    match std::fs::write(&dump_path, &report) {
        Ok(()) => eprintln!("Crash dump written to {}", dump_path.display()),
        Err(e) => eprintln!("Failed to write crash dump: {}", e),
    }
}
