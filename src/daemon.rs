use crate::console::{execute, Command, Outcome};
use crate::host::DirectoryHost;
use futures::StreamExt;
use reclaim_common::Result;
use reclaim_engine::{Config, HookRegistry, Reclaimer};
use reclaim_flags::FlagStore;
use reclaim_logger::severity::LogSeverity::{Error, Info, Warning};
use reclaim_logger::{log, systime::current_millis};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::codec::{FramedRead, LinesCodec};

/// One game tick.
const TICK: Duration = Duration::from_millis(50);

/// Relative folders in the configuration are taken from the configuration file's directory.
fn anchored(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Loads the configuration file and returns it as written plus the copy the engine runs on.
fn load_config(path: &Path) -> Result<(Config, Config)> {
    let written = Config::load(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut running = written.clone();
    running.data_folder = anchored(base, &written.data_folder);
    running.world_container = anchored(base, &written.world_container);
    Ok((written, running))
}

/// Writes back reset gates the engine added, leaving everything else as the user wrote it.
fn persist_gates(path: &Path, mut written: Config, engine: &Config) {
    if written.reset == engine.reset && path.exists() {
        return;
    }
    written.reset = engine.reset.clone();
    if let Err(err) = written.save(path) {
        log(
            format!("Could not write {}: {}", path.display(), err),
            Warning,
        );
    }
}

/// Runs the reclaimer against the folders named in `config_path` until `stop` or Ctrl-C,
/// reading console commands from stdin.
pub async fn run(config_path: &Path) -> Result<()> {
    run_with_input(config_path, tokio::io::stdin()).await
}

pub async fn run_with_input<R>(config_path: &Path, input: R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let (written, config) = load_config(config_path)?;
    let host = DirectoryHost::new(&config.world_container);
    let store = FlagStore::load(&config.data_folder)?;
    log(
        format!(
            "Loaded {} flags from {}",
            store.len(),
            config.data_folder.display()
        ),
        Info,
    );

    let registry = HookRegistry::with_defaults();
    let mut reclaimer = Reclaimer::new(config, store, &registry, current_millis());
    persist_gates(config_path, written, reclaimer.config());

    let mut lines = FramedRead::new(input, LinesCodec::new());
    let mut input_open = true;
    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = ticker.tick() => reclaimer.tick(&host, current_millis()),
            line = lines.next(), if input_open => match line {
                Some(Ok(line)) if line.trim().is_empty() => {}
                Some(Ok(line)) => match line.parse::<Command>() {
                    Ok(command) => match execute(&mut reclaimer, &host, command, current_millis()) {
                        Outcome::Reply(reply) => log(reply, Info),
                        Outcome::Reload => reload(&mut reclaimer, config_path),
                        Outcome::Stop => break,
                    },
                    Err(err) => log(err, Warning),
                },
                Some(Err(err)) => log(format!("Console input failed: {}", err), Error),
                None => input_open = false,
            },
            _ = &mut interrupted => {
                log("Interrupted".to_owned(), Info);
                break;
            }
        }
    }

    let saved = reclaimer.shutdown()?;
    log(format!("Saved {} flag files, stopping", saved), Info);
    Ok(())
}

fn reload(reclaimer: &mut Reclaimer, config_path: &Path) {
    match load_config(config_path) {
        Ok((written, config)) => {
            reclaimer.reload(config, current_millis());
            persist_gates(config_path, written, reclaimer.config());
        }
        Err(err) => log(format!("Reload failed, keeping the old configuration: {}", err), Error),
    }
}
