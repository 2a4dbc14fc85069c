use reclaim_common::ChunkCoordinate;
use reclaim_engine::{Reclaimer, WorldHost};
use std::str::FromStr;

pub const HELP: &str = "Commands:
  status                              show pause state, hooks and cycles
  pause | resume                      stop or restart deletion
  check <world> <x> <z>               explain one chunk
  flag <world> <x> <z> [region]       keep a chunk (or its region) forever
  unflag <world> <x> <z> [region]     forget a chunk's (or its region's) flags
  reload                              re-read the configuration file
  stop                                save and exit";

/// One line typed on the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Pause,
    Resume,
    Check(ChunkCoordinate),
    Flag { chunk: ChunkCoordinate, region: bool },
    Unflag { chunk: ChunkCoordinate, region: bool },
    Reload,
    Stop,
    Help,
}

fn parse_chunk(args: &[&str]) -> Result<ChunkCoordinate, String> {
    let [world, x, z] = args else {
        return Err("expected <world> <x> <z>".to_owned());
    };
    let x = x.parse().map_err(|_| format!("{} is not a chunk coordinate", x))?;
    let z = z.parse().map_err(|_| format!("{} is not a chunk coordinate", z))?;
    Ok(ChunkCoordinate::new(world, x, z))
}

/// `<world> <x> <z> [region]`
fn parse_target(args: &[&str]) -> Result<(ChunkCoordinate, bool), String> {
    match args {
        [rest @ .., "region"] => Ok((parse_chunk(rest)?, true)),
        _ => Ok((parse_chunk(args)?, false)),
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((name, args)) = words.split_first() else {
            return Err("empty command".to_owned());
        };
        let command = match (name.to_ascii_lowercase().as_str(), args) {
            ("status", []) => Command::Status,
            ("pause", []) => Command::Pause,
            ("resume", []) => Command::Resume,
            ("reload", []) => Command::Reload,
            ("stop", []) => Command::Stop,
            ("help", _) => Command::Help,
            ("check", args) => Command::Check(parse_chunk(args)?),
            ("flag", args) => {
                let (chunk, region) = parse_target(args)?;
                Command::Flag { chunk, region }
            }
            ("unflag", args) => {
                let (chunk, region) = parse_target(args)?;
                Command::Unflag { chunk, region }
            }
            (other, _) => return Err(format!("unknown command {:?}, try help", other)),
        };
        Ok(command)
    }
}

/// What the console loop does after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Reload,
    Stop,
}

/// Runs every command that only needs the reclaimer; `reload` and `stop` are handed back.
pub fn execute(
    reclaimer: &mut Reclaimer,
    host: &dyn WorldHost,
    command: Command,
    now: i64,
) -> Outcome {
    let reply = match command {
        Command::Status => reclaimer.status(now).to_string(),
        Command::Pause => {
            reclaimer.pause();
            "Deletion paused".to_owned()
        }
        Command::Resume => {
            reclaimer.resume();
            "Deletion resumed".to_owned()
        }
        Command::Check(chunk) => reclaimer.inspect(host, &chunk, now).to_string(),
        Command::Flag {
            chunk,
            region: true,
        } => {
            reclaimer.flag_region(&chunk.world, chunk.region());
            format!("Flagged region {} of {} forever", chunk.region(), chunk.world)
        }
        Command::Flag { chunk, .. } => {
            reclaimer.flag_chunk(&chunk);
            format!("Flagged chunk {} forever", chunk)
        }
        Command::Unflag {
            chunk,
            region: true,
        } => {
            reclaimer.unflag_region(&chunk.world, chunk.region());
            format!("Unflagged region {} of {}", chunk.region(), chunk.world)
        }
        Command::Unflag { chunk, .. } => {
            reclaimer.unflag_chunk(&chunk);
            format!("Unflagged chunk {}", chunk)
        }
        Command::Help => HELP.to_owned(),
        Command::Reload => return Outcome::Reload,
        Command::Stop => return Outcome::Stop,
    };
    Outcome::Reply(reply)
}
