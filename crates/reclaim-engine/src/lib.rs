pub mod config;
pub mod deletion;
pub mod flagging;
pub mod hooks;
pub mod host;
pub mod reclaimer;
pub mod scheduler;
pub mod status;

pub use config::Config;
pub use deletion::{CycleStats, CycleSummary, DeletionCycle, StepContext, StepOutcome};
pub use flagging::FlaggingEngine;
pub use hooks::{HookRegistry, ProtectionHook, ProtectionHooks, SpawnProtectionHook};
pub use host::{RegionLiveness, WorldHost};
pub use reclaimer::{ChunkInspection, Reclaimer, StatusReport, WorldState, WorldStatus};
pub use scheduler::{Scheduler, Task};
pub use status::{resolve, RegionVerdict, VisitStatus};
