use core::fmt::{self, Write};

use spin::Once;

/// Byte sink behind the kernel console (a UART on real boards).
pub trait ConsoleSink: Send + Sync {
    fn write_str(&self, s: &str);
}

static CONSOLE: Once<&'static dyn ConsoleSink> = Once::new();

/// Install the console sink. Only the first registration takes effect.
pub fn set_console(sink: &'static dyn ConsoleSink) -> bool {
    let mut installed = false;
    CONSOLE.call_once(|| {
        installed = true;
        sink
    });
    installed
}

pub fn console_write(s: &str) {
    if let Some(sink) = CONSOLE.get() {
        sink.write_str(s);
    }
}

struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        console_write(s);
        Ok(())
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments<'_>) {
    let _ = ConsoleWriter.write_fmt(args);
}

// ============================================================================
// Print Macros
// ============================================================================

/// Print to console without newline
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        $crate::console::_print(format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kprintln {
    () => { $crate::kprint!("\n") };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;

    struct Capture(spin::Mutex<String>);

    impl ConsoleSink for Capture {
        fn write_str(&self, s: &str) {
            self.0.lock().push_str(s);
        }
    }

    static CAPTURE: Capture = Capture(spin::Mutex::new(String::new()));

    #[test]
    fn macros_reach_the_installed_sink() {
        set_console(&CAPTURE);
        assert!(!set_console(&CAPTURE));

        crate::kprint!("pid {}", 3);
        crate::kprintln!(" ready");

        assert!(CAPTURE.0.lock().contains("pid 3 ready\n"));
    }
}
