/// Logs `message` at critical level and aborts the process.
///
/// Reserved for broken invariants where carrying on could lose data.
pub fn fatal(logger: &slog::Logger, message: &str) -> ! {
    slog::crit!(logger, "FATAL: {}", message);
    eprintln!("FATAL: {}", message);
    std::process::abort()
}
