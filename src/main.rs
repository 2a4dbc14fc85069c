use reclaim::daemon;
use reclaim_logger::{log, LogSeverity::Fatal, LogSeverity::Info};
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("reclaim.json"));

    log(format!("Reclaim init, config {}", config_path.display()), Info);
    if let Err(err) = daemon::run(&config_path).await {
        log(format!("Reclaim failed: {}", err), Fatal);
        std::process::exit(1);
    }
}
