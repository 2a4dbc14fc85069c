use reclaim_flags::ChunkFlag;
use reclaim_region::ChunkPresence;
use std::fmt;

/// How a chunk stands with respect to deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitStatus {
    /// Some protection hook claims the chunk.
    Protected,
    /// Flagged eternal, or flagged with freshness still in the future.
    Visited,
    /// No usable record, and the chunk could not be confirmed readable.
    Unknown,
    /// Stale flag, or a readable chunk nobody ever flagged.
    Unvisited,
}

impl VisitStatus {
    /// Only unvisited chunks allow their region to go.
    pub fn blocks_deletion(&self) -> bool {
        !matches!(self, VisitStatus::Unvisited)
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VisitStatus::Protected => "PROTECTED",
            VisitStatus::Visited => "VISITED",
            VisitStatus::Unknown => "UNKNOWN",
            VisitStatus::Unvisited => "UNVISITED",
        };
        write!(f, "{}", name)
    }
}

/// Resolves one chunk. Protection wins over everything, then the eternal marker, then the
/// freshness timestamp. Only when no flag exists does the chunk data itself decide.
pub fn resolve(
    flag: Option<ChunkFlag>,
    presence: &ChunkPresence,
    protected: bool,
    now: i64,
) -> VisitStatus {
    if protected {
        return VisitStatus::Protected;
    }
    match flag {
        Some(ChunkFlag::Eternal) => VisitStatus::Visited,
        Some(ChunkFlag::VisitedUntil(until)) if until > now => VisitStatus::Visited,
        Some(ChunkFlag::VisitedUntil(_)) => VisitStatus::Unvisited,
        Some(ChunkFlag::Unreadable) => VisitStatus::Unknown,
        None => match presence {
            ChunkPresence::Present => VisitStatus::Unvisited,
            ChunkPresence::Absent | ChunkPresence::Unreadable(_) => VisitStatus::Unknown,
        },
    }
}

/// Outcome for a whole region. Starts at `Delete` and latches to `Keep` on the first chunk
/// that blocks deletion; a region with no blocking chunk is deleted, an empty one included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionVerdict {
    Keep,
    #[default]
    Delete,
}

impl RegionVerdict {
    pub fn absorb(&mut self, status: VisitStatus) {
        if status.blocks_deletion() {
            *self = RegionVerdict::Keep;
        }
    }

    pub fn fold<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = VisitStatus>,
    {
        let mut verdict = RegionVerdict::default();
        for status in statuses {
            verdict.absorb(status);
            if verdict == RegionVerdict::Keep {
                break;
            }
        }
        verdict
    }
}
