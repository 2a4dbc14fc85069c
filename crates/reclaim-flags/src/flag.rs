use serde_json::Value;

const ETERNAL: &str = "eternal";
const UNREADABLE: &str = "unreadable";

/// The stored state of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFlag {
    /// Fresh until this epoch-millisecond timestamp.
    VisitedUntil(i64),
    /// Never stale. Only an explicit unflag removes it.
    Eternal,
    /// The persisted record could not be read back.
    Unreadable,
}

impl ChunkFlag {
    /// Result of routine flagging with `visited_until` on top of `existing`: freshness only
    /// grows, eternal stays eternal, an unreadable record is replaced.
    pub fn merge(existing: Option<ChunkFlag>, visited_until: i64) -> ChunkFlag {
        match existing {
            Some(ChunkFlag::Eternal) => ChunkFlag::Eternal,
            Some(ChunkFlag::VisitedUntil(current)) => {
                ChunkFlag::VisitedUntil(current.max(visited_until))
            }
            Some(ChunkFlag::Unreadable) | None => ChunkFlag::VisitedUntil(visited_until),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ChunkFlag::VisitedUntil(until) => Value::from(*until),
            ChunkFlag::Eternal => Value::from(ETERNAL),
            ChunkFlag::Unreadable => Value::from(UNREADABLE),
        }
    }

    /// `None` when the value is neither a timestamp nor a known marker.
    pub fn from_json(value: &Value) -> Option<ChunkFlag> {
        match value {
            Value::Number(number) => number.as_i64().map(ChunkFlag::VisitedUntil),
            Value::String(marker) if marker == ETERNAL => Some(ChunkFlag::Eternal),
            Value::String(marker) if marker == UNREADABLE => Some(ChunkFlag::Unreadable),
            _ => None,
        }
    }
}
