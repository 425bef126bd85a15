/// Log an unrecoverable kernel error and halt the CPU.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        log::error!(
            "FATAL on cpu {}: {}",
            <$crate::arch::Cpu as $crate::arch::Arch>::cpu_id(),
            format_args!($($arg)*)
        );
        <$crate::arch::Cpu as $crate::arch::Arch>::halt()
    }};
}
