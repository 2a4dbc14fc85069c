/// Recurring work driven by the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    FlagSweep,
    Autosave,
    DeletionStep,
}

#[derive(Debug)]
struct Schedule {
    task: Task,
    interval: u64,
}

/// Counts ticks and says which tasks fall due. Every task first runs on tick 0.
#[derive(Debug, Default)]
pub struct Scheduler {
    tick: u64,
    schedules: Vec<Schedule>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task` every `interval` ticks, in registration order. A zero interval is
    /// treated as one.
    pub fn every(&mut self, task: Task, interval: u64) {
        self.schedules.push(Schedule {
            task,
            interval: interval.max(1),
        });
    }

    pub fn is_idle(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Tasks due on the current tick, then moves to the next one.
    pub fn advance(&mut self) -> Vec<Task> {
        let tick = self.tick;
        self.tick += 1;
        self.schedules
            .iter()
            .filter(|schedule| tick % schedule.interval == 0)
            .map(|schedule| schedule.task)
            .collect()
    }
}
