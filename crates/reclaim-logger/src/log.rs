use crate::severity::LogSeverity;
use crate::systime::now;

/// Prints one log line. Warnings and worse go to stderr so they survive a redirected stdout.
pub fn log(msg: String, log_severity: LogSeverity) {
    if log_severity.is_alarm() {
        eprintln!("[{}] {} {}", log_severity, now(), msg);
    } else {
        println!("[{}] {} {}", log_severity, now(), msg);
    }
}
