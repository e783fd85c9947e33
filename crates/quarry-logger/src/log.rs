use crate::severity::LogSeverity;
use crate::systime::now;
use once_cell::sync::OnceCell;

static MIN_SEVERITY: OnceCell<LogSeverity> = OnceCell::new();

/// Sets the least severe level that still gets printed. Only the first call
/// takes effect; returns false if the level was already set.
pub fn set_min_severity(severity: LogSeverity) -> bool {
    MIN_SEVERITY.set(severity).is_ok()
}

pub fn enabled(severity: LogSeverity) -> bool {
    severity >= *MIN_SEVERITY.get().unwrap_or(&LogSeverity::Info)
}

pub fn log(msg: String, log_severity: LogSeverity) {
    if !enabled(log_severity) {
        return;
    }
    let line = format_line(&msg, log_severity, &now());
    if log_severity >= LogSeverity::Warning {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

fn format_line(msg: &str, log_severity: LogSeverity, time: &str) -> String {
    format!("[{}] {} {}", log_severity, time, msg)
}
