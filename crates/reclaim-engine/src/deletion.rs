use crate::hooks::ProtectionHooks;
use crate::host::{RegionLiveness, WorldHost};
use crate::status::{resolve, RegionVerdict, VisitStatus};
use reclaim_common::{ChunkCoordinate, RegionCoordinate, Result, CHUNKS_PER_REGION};
use reclaim_flags::FlagStore;
use reclaim_logger::severity::LogSeverity::{Info, Warning};
use reclaim_logger::{debug, log, DebugLevel};
use reclaim_region::{list_regions, region_file_name, ChunkPresence, RegionFile};
use std::fmt;
use std::path::PathBuf;

/// Counters for one pass over a world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub regions_examined: usize,
    pub regions_deleted: usize,
    pub regions_kept: usize,
    /// Listed at the start of the cycle but gone by the time they were reached.
    pub regions_missing: usize,
    pub regions_failed: usize,
    pub chunks_evaluated: usize,
    pub chunks_absent: usize,
    pub chunks_protected: usize,
    pub chunks_visited: usize,
    pub chunks_unknown: usize,
    pub chunks_unvisited: usize,
}

impl CycleStats {
    fn record(&mut self, status: VisitStatus) {
        match status {
            VisitStatus::Protected => self.chunks_protected += 1,
            VisitStatus::Visited => self.chunks_visited += 1,
            VisitStatus::Unknown => self.chunks_unknown += 1,
            VisitStatus::Unvisited => self.chunks_unvisited += 1,
        }
    }
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} regions examined, {} deleted, {} kept, {} missing, {} failed ({} chunks evaluated)",
            self.regions_examined,
            self.regions_deleted,
            self.regions_kept,
            self.regions_missing,
            self.regions_failed,
            self.chunks_evaluated
        )
    }
}

/// What is left of a cycle once it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub world: String,
    pub started_at: i64,
    pub finished_at: i64,
    pub next_run_not_before: i64,
    pub stats: CycleStats,
}

/// Borrowed state a cycle needs for one step.
pub struct StepContext<'a> {
    pub store: &'a mut FlagStore,
    pub hooks: &'a ProtectionHooks,
    pub host: &'a dyn WorldHost,
    pub now: i64,
    /// Chunk evaluations allowed in this step.
    pub quota: usize,
    /// Decode chunk payloads instead of only checking their headers.
    pub inspect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Finished,
}

struct RegionScan {
    coordinate: RegionCoordinate,
    file: RegionFile,
    next_slot: usize,
    verdict: RegionVerdict,
}

/// One incremental pass over every region of a world.
pub struct DeletionCycle {
    world: String,
    folder: PathBuf,
    queue: Vec<RegionCoordinate>,
    position: usize,
    scan: Option<RegionScan>,
    stats: CycleStats,
    started_at: i64,
}

impl DeletionCycle {
    /// Snapshots the region list of `folder`. Regions created afterwards wait for the next cycle.
    pub fn start(world: &str, folder: PathBuf, now: i64) -> Result<Self> {
        let queue = list_regions(&folder)?;
        log(
            format!("Starting deletion cycle for {} ({} regions)", world, queue.len()),
            Info,
        );
        Ok(Self {
            world: world.to_owned(),
            folder,
            queue,
            position: 0,
            scan: None,
            stats: CycleStats::default(),
            started_at: now,
        })
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// Regions taken off the queue so far, and the queue length.
    pub fn progress(&self) -> (usize, usize) {
        (self.position, self.queue.len())
    }

    pub fn is_finished(&self) -> bool {
        self.scan.is_none() && self.position >= self.queue.len()
    }

    pub fn summary(&self, finished_at: i64, next_run_not_before: i64) -> CycleSummary {
        CycleSummary {
            world: self.world.clone(),
            started_at: self.started_at,
            finished_at,
            next_run_not_before,
            stats: self.stats.clone(),
        }
    }

    /// Evaluates up to `ctx.quota` chunk slots, resuming where the previous step stopped.
    /// A region is settled as soon as its verdict is known.
    pub fn step(&mut self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let mut budget = ctx.quota.max(1);
        while budget > 0 {
            if self.scan.is_none() {
                self.scan = self.open_next();
            }
            let Some(scan) = self.scan.as_mut() else {
                return StepOutcome::Finished;
            };

            let index = scan.next_slot;
            scan.next_slot += 1;
            budget -= 1;
            self.stats.chunks_evaluated += 1;

            match scan.file.probe(index, ctx.inspect) {
                ChunkPresence::Absent => self.stats.chunks_absent += 1,
                presence => {
                    let (x, z) = scan.coordinate.chunk_at(index);
                    if let ChunkPresence::Unreadable(reason) = &presence {
                        debug(DebugLevel::High, || {
                            format!("Chunk {} ({}, {}) unreadable: {}", self.world, x, z, reason)
                        });
                    }
                    let coordinate = ChunkCoordinate::new(&self.world, x, z);
                    let protected = ctx.hooks.any_protects(&self.world, x, z);
                    let status = resolve(ctx.store.get(&coordinate), &presence, protected, ctx.now);
                    debug(DebugLevel::Extreme, || format!("{} is {}", coordinate, status));
                    self.stats.record(status);
                    scan.verdict.absorb(status);
                }
            }

            if scan.verdict == RegionVerdict::Keep || scan.next_slot >= CHUNKS_PER_REGION {
                self.finish_region(ctx);
            }
        }

        if self.is_finished() {
            StepOutcome::Finished
        } else {
            StepOutcome::Continue
        }
    }

    fn open_next(&mut self) -> Option<RegionScan> {
        while let Some(&coordinate) = self.queue.get(self.position) {
            self.position += 1;
            let path = self.folder.join(region_file_name(coordinate));
            match RegionFile::open(&path, coordinate) {
                Ok(Some(file)) => {
                    return Some(RegionScan {
                        coordinate,
                        file,
                        next_slot: 0,
                        verdict: RegionVerdict::default(),
                    })
                }
                Ok(None) => {
                    self.stats.regions_missing += 1;
                    debug(DebugLevel::Medium, || {
                        format!("Region {} of {} vanished, skipping", coordinate, self.world)
                    });
                }
                Err(err) => {
                    self.stats.regions_examined += 1;
                    self.stats.regions_kept += 1;
                    log(
                        format!("Keeping unreadable region {} of {}: {}", coordinate, self.world, err),
                        Warning,
                    );
                }
            }
        }
        None
    }

    fn finish_region(&mut self, ctx: &mut StepContext<'_>) {
        let Some(RegionScan {
            coordinate,
            file,
            verdict,
            ..
        }) = self.scan.take()
        else {
            return;
        };
        let path = file.path().to_path_buf();
        drop(file);
        self.stats.regions_examined += 1;

        if verdict == RegionVerdict::Keep {
            self.stats.regions_kept += 1;
            debug(DebugLevel::Medium, || {
                format!("Keeping region {} of {}", coordinate, self.world)
            });
            return;
        }

        match ctx.host.region_liveness(&self.world, coordinate) {
            RegionLiveness::Unloaded => match std::fs::remove_file(&path) {
                Ok(()) => {
                    self.stats.regions_deleted += 1;
                    ctx.store.clear_region(&self.world, coordinate);
                    log(format!("Deleted region {} of {}", coordinate, self.world), Info);
                }
                Err(err) => {
                    self.stats.regions_failed += 1;
                    log(
                        format!(
                            "Could not delete region {} of {}: {}",
                            coordinate, self.world, err
                        ),
                        Warning,
                    );
                }
            },
            liveness => {
                self.stats.regions_kept += 1;
                debug(DebugLevel::Low, || {
                    format!(
                        "Region {} of {} is {:?} in the host, keeping it",
                        coordinate, self.world, liveness
                    )
                });
            }
        }
    }
}
