use crate::config::Config;
use crate::deletion::{CycleStats, CycleSummary, DeletionCycle, StepContext, StepOutcome};
use crate::flagging::FlaggingEngine;
use crate::hooks::{HookRegistry, ProtectionHook, ProtectionHooks};
use crate::host::WorldHost;
use crate::scheduler::{Scheduler, Task};
use crate::status::{resolve, VisitStatus};
use reclaim_common::{ChunkCoordinate, PlayerLocation, RegionCoordinate, Result};
use reclaim_flags::{ChunkFlag, FlagStore};
use reclaim_logger::severity::LogSeverity::{Error, Info, Warning};
use reclaim_logger::{debug, log, set_debug_level, DebugLevel};
use reclaim_region::{region_file_name, ChunkPresence, RegionFile};
use std::collections::BTreeMap;
use std::fmt;

/// Everything known about one chunk, for the `check` command.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkInspection {
    pub coordinate: ChunkCoordinate,
    pub status: VisitStatus,
    pub flag: Option<ChunkFlag>,
    pub presence: ChunkPresence,
    /// Answer of every active hook, by name.
    pub hooks: Vec<(String, bool)>,
}

impl fmt::Display for ChunkInspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chunk {} is {}", self.coordinate, self.status)?;
        match self.flag {
            Some(ChunkFlag::VisitedUntil(until)) => writeln!(f, "  flagged until {}", until)?,
            Some(ChunkFlag::Eternal) => writeln!(f, "  flagged forever")?,
            Some(ChunkFlag::Unreadable) => writeln!(f, "  flag record unreadable")?,
            None => writeln!(f, "  not flagged")?,
        }
        match &self.presence {
            ChunkPresence::Absent => writeln!(f, "  not generated")?,
            ChunkPresence::Present => writeln!(f, "  chunk data readable")?,
            ChunkPresence::Unreadable(reason) => writeln!(f, "  chunk data unreadable: {}", reason)?,
        }
        for (name, protected) in &self.hooks {
            writeln!(
                f,
                "  {}: {}",
                name,
                if *protected { "protected" } else { "not protected" }
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldState {
    /// Still inside its reset window; flags are being gathered.
    Gathering { until: i64 },
    Running {
        regions_done: usize,
        regions_total: usize,
        stats: CycleStats,
    },
    /// A cycle completed and the next may not start before `until`.
    Waiting { until: i64, last: CycleSummary },
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldStatus {
    pub world: String,
    pub state: WorldState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub now: i64,
    pub paused: bool,
    pub active_hooks: Vec<String>,
    pub pending_hooks: Vec<String>,
    pub hook_failures: Vec<String>,
    pub flagged_chunks: usize,
    pub worlds: Vec<WorldStatus>,
}

fn remaining(millis: i64) -> String {
    let minutes = millis.max(0) / 60_000;
    let (days, hours, minutes) = (minutes / 1_440, minutes / 60 % 24, minutes % 60);
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Deletion is {}, {} chunks flagged",
            if self.paused { "paused" } else { "running" },
            self.flagged_chunks
        )?;
        writeln!(f, "Hooks: [{}]", self.active_hooks.join(", "))?;
        if !self.pending_hooks.is_empty() {
            writeln!(f, "Waiting for hooks: [{}]", self.pending_hooks.join(", "))?;
        }
        if !self.hook_failures.is_empty() {
            writeln!(f, "Unusable hooks: [{}]", self.hook_failures.join(", "))?;
        }
        for world in &self.worlds {
            match &world.state {
                WorldState::Gathering { until } => writeln!(
                    f,
                    "{}: gathering flags, first cycle in {}",
                    world.world,
                    remaining(until - self.now)
                )?,
                WorldState::Running {
                    regions_done,
                    regions_total,
                    stats,
                } => writeln!(
                    f,
                    "{}: cycle at region {}/{}, {}",
                    world.world, regions_done, regions_total, stats
                )?,
                WorldState::Waiting { until, last } => writeln!(
                    f,
                    "{}: next cycle in {}, last one: {}",
                    world.world,
                    remaining(until - self.now),
                    last.stats
                )?,
                WorldState::Ready => writeln!(f, "{}: ready for a cycle", world.world)?,
            }
        }
        Ok(())
    }
}

fn build_scheduler(config: &Config) -> Scheduler {
    let mut scheduler = Scheduler::new();
    if config.worlds.is_empty() {
        return scheduler;
    }
    if config.flagging_enabled() {
        scheduler.every(Task::FlagSweep, config.flag_interval);
        scheduler.every(Task::Autosave, config.flag_autosave_interval);
    }
    scheduler.every(Task::DeletionStep, config.ticks_per_check());
    scheduler
}

/// Ties flagging, hooks and deletion cycles to the host's tick loop. All entry points run on
/// the tick thread and take the current epoch millisecond explicitly.
pub struct Reclaimer {
    config: Config,
    store: FlagStore,
    hooks: ProtectionHooks,
    hook_failures: Vec<String>,
    flagging: FlaggingEngine,
    scheduler: Scheduler,
    cycles: BTreeMap<String, DeletionCycle>,
    finished: BTreeMap<String, CycleSummary>,
    paused: bool,
}

impl Reclaimer {
    /// Activates the registry's hooks against `config`. Enabled worlds without a reset gate
    /// get one; read it back through [`Reclaimer::config`] to persist it.
    pub fn new(mut config: Config, store: FlagStore, registry: &HookRegistry, now: i64) -> Self {
        set_debug_level(config.verbosity());
        config.ensure_reset_gates(now);
        if config.worlds.is_empty() {
            log("No worlds are enabled. There's nothing to do!".to_owned(), Error);
        }

        let (hooks, hook_failures) = registry.activate(&config);
        let paused = !hook_failures.is_empty();
        Self {
            flagging: FlaggingEngine::from_config(&config),
            scheduler: build_scheduler(&config),
            config,
            store,
            hooks,
            hook_failures,
            cycles: BTreeMap::new(),
            finished: BTreeMap::new(),
            paused,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &FlagStore {
        &self.store
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn current_tick(&self) -> u64 {
        self.scheduler.current_tick()
    }

    pub fn active_cycles(&self) -> Vec<&str> {
        self.cycles.keys().map(String::as_str).collect()
    }

    pub fn cycle(&self, world: &str) -> Option<&DeletionCycle> {
        self.cycles.get(world)
    }

    pub fn last_summary(&self, world: &str) -> Option<&CycleSummary> {
        self.finished.get(world)
    }

    /// Runs whatever falls due on this tick.
    pub fn tick(&mut self, host: &dyn WorldHost, now: i64) {
        for task in self.scheduler.advance() {
            match task {
                Task::FlagSweep => self.sweep(host, now),
                Task::Autosave => self.autosave(),
                Task::DeletionStep => {
                    self.attempt_activation(host, now);
                    self.step_cycles(host, now);
                }
            }
        }
    }

    fn promote_hooks(&mut self) {
        let failures = self.hooks.promote_ready();
        if !failures.is_empty() {
            self.paused = true;
            self.hook_failures.extend(failures);
        }
    }

    fn sweep(&mut self, host: &dyn WorldHost, now: i64) {
        self.promote_hooks();
        let players = host.online_players();
        self.flagging.sweep(&mut self.store, &players, now);
    }

    fn autosave(&mut self) {
        if !self.store.is_dirty() {
            return;
        }
        match self.store.save() {
            Ok(written) => debug(DebugLevel::Low, || format!("Saved {} flag files", written)),
            Err(err) => log(format!("Could not save flags: {}", err), Error),
        }
    }

    /// Starts cycles for every enabled world whose gates have passed. Without concurrent
    /// cycles nothing starts while any cycle runs. Returns the worlds that started.
    pub fn attempt_activation(&mut self, host: &dyn WorldHost, now: i64) -> Vec<String> {
        let mut started = Vec::new();
        if self.paused {
            return started;
        }
        self.promote_hooks();
        if self.paused {
            return started;
        }

        // Worlds that never completed a cycle go first, then the least recently finished.
        let mut candidates: Vec<&String> = self.config.worlds.iter().collect();
        candidates.sort_by_key(|world| self.finished.get(*world).map(|last| last.finished_at));

        for world in candidates {
            if !self.config.allow_concurrent_cycles && !self.cycles.is_empty() {
                break;
            }
            if self.cycles.contains_key(world) {
                continue;
            }
            if self.config.reset_gate(world).map_or(false, |gate| gate > now) {
                continue;
            }
            if self
                .finished
                .get(world)
                .map_or(false, |summary| summary.next_run_not_before > now)
            {
                continue;
            }
            let Some(folder) = host.region_folder(world) else {
                debug(DebugLevel::Low, || format!("World {} is not available", world));
                continue;
            };
            match DeletionCycle::start(world, folder, now) {
                Ok(cycle) => {
                    self.cycles.insert(world.clone(), cycle);
                    started.push(world.clone());
                }
                Err(err) => log(
                    format!("Could not start a deletion cycle for {}: {}", world, err),
                    Warning,
                ),
            }
        }
        started
    }

    fn step_cycles(&mut self, host: &dyn WorldHost, now: i64) {
        if self.paused {
            return;
        }
        let mut done = Vec::new();
        for (world, cycle) in self.cycles.iter_mut() {
            let mut ctx = StepContext {
                store: &mut self.store,
                hooks: &self.hooks,
                host,
                now,
                quota: self.config.chunks_per_check(),
                inspect: self.config.inspect_chunk_data,
            };
            if cycle.step(&mut ctx) == StepOutcome::Finished {
                done.push(world.clone());
            }
        }

        for world in done {
            let Some(cycle) = self.cycles.remove(&world) else {
                continue;
            };
            let next = now.saturating_add(self.config.millis_between_cycles);
            let summary = cycle.summary(now, next);
            log(
                format!("Finished deletion cycle for {}: {}", world, summary.stats),
                Info,
            );
            self.finished.insert(world, summary);
            self.autosave();
        }
    }

    pub fn on_chunk_generated(&mut self, coordinate: &ChunkCoordinate, now: i64) {
        self.flagging
            .on_chunk_generated(&mut self.store, coordinate, now);
    }

    /// Flags around a player outside the regular sweep, e.g. on join or teleport.
    pub fn on_player_activity(&mut self, location: &PlayerLocation, now: i64) {
        self.flagging
            .flag_around(&mut self.store, &location.chunk(), now);
    }

    pub fn pause(&mut self) {
        self.paused = true;
        log("Deletion paused".to_owned(), Info);
    }

    /// Lifts the pause, including one caused by an unusable hook.
    pub fn resume(&mut self) {
        if !self.hook_failures.is_empty() {
            log(
                format!(
                    "Resuming despite unusable hooks: {}",
                    self.hook_failures.join(", ")
                ),
                Warning,
            );
            self.hook_failures.clear();
        }
        self.paused = false;
        log("Deletion resumed".to_owned(), Info);
    }

    pub fn inspect(
        &self,
        host: &dyn WorldHost,
        coordinate: &ChunkCoordinate,
        now: i64,
    ) -> ChunkInspection {
        let region = coordinate.region();
        let presence = match host.region_folder(&coordinate.world) {
            None => ChunkPresence::Absent,
            Some(folder) => match RegionFile::open(&folder.join(region_file_name(region)), region)
            {
                Ok(Some(mut file)) => file.probe(coordinate.local_index(), true),
                Ok(None) => ChunkPresence::Absent,
                Err(err) => ChunkPresence::Unreadable(err.to_string()),
            },
        };
        let hooks = self
            .hooks
            .verdicts(&coordinate.world, coordinate.x, coordinate.z);
        let protected = hooks.iter().any(|(_, protected)| *protected);
        let flag = self.store.get(coordinate);

        ChunkInspection {
            coordinate: coordinate.clone(),
            status: resolve(flag, &presence, protected, now),
            flag,
            presence,
            hooks,
        }
    }

    /// Marks a chunk as never stale.
    pub fn flag_chunk(&mut self, coordinate: &ChunkCoordinate) {
        self.store.set_eternal(coordinate);
    }

    pub fn unflag_chunk(&mut self, coordinate: &ChunkCoordinate) {
        self.store.unflag(coordinate);
    }

    pub fn flag_region(&mut self, world: &str, region: RegionCoordinate) {
        for chunk in region.chunks(world) {
            self.store.set_eternal(&chunk);
        }
    }

    /// Forgets every flag of a region, its damage marker included.
    pub fn unflag_region(&mut self, world: &str, region: RegionCoordinate) {
        self.store.clear_region(world, region);
    }

    pub fn add_hook(&mut self, hook: Box<dyn ProtectionHook>) -> Result<()> {
        self.hooks.add(hook)
    }

    pub fn remove_hook(&mut self, name: &str) -> bool {
        self.hooks.remove(name)
    }

    pub fn status(&self, now: i64) -> StatusReport {
        let worlds = self
            .config
            .worlds
            .iter()
            .map(|world| WorldStatus {
                world: world.clone(),
                state: self.world_state(world, now),
            })
            .collect();
        StatusReport {
            now,
            paused: self.paused,
            active_hooks: self.hooks.active_names(),
            pending_hooks: self.hooks.pending_names(),
            hook_failures: self.hook_failures.clone(),
            flagged_chunks: self.store.len(),
            worlds,
        }
    }

    fn world_state(&self, world: &str, now: i64) -> WorldState {
        if let Some(cycle) = self.cycles.get(world) {
            let (regions_done, regions_total) = cycle.progress();
            return WorldState::Running {
                regions_done,
                regions_total,
                stats: cycle.stats().clone(),
            };
        }
        if let Some(until) = self.config.reset_gate(world).filter(|gate| *gate > now) {
            return WorldState::Gathering { until };
        }
        match self.finished.get(world) {
            Some(last) if last.next_run_not_before > now => WorldState::Waiting {
                until: last.next_run_not_before,
                last: last.clone(),
            },
            _ => WorldState::Ready,
        }
    }

    /// Swaps in a new configuration. Cycles of worlds that stay enabled keep running; hooks
    /// stay as they were activated.
    pub fn reload(&mut self, mut config: Config, now: i64) {
        set_debug_level(config.verbosity());
        config.ensure_reset_gates(now);
        self.cycles.retain(|world, _| config.is_world_enabled(world));
        self.flagging = FlaggingEngine::from_config(&config);
        self.scheduler = build_scheduler(&config);
        if config.worlds.is_empty() {
            log("No worlds are enabled. There's nothing to do!".to_owned(), Error);
        }
        self.config = config;
        log("Configuration reloaded".to_owned(), Info);
    }

    /// Final save. Running cycles are abandoned; they start over on the next run.
    pub fn shutdown(&mut self) -> Result<usize> {
        if !self.cycles.is_empty() {
            log(
                format!("Abandoning deletion cycles for {:?}", self.active_cycles()),
                Info,
            );
        }
        self.cycles.clear();
        self.store.save()
    }
}
