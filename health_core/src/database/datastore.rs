//! Datastore capability consumed by the database probe

use crate::error::Result;

/// Record collections whose sizes are reported on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordCollection {
    Accounts,
    Sessions,
    Messages,
    Machines,
}

impl RecordCollection {
    pub fn table_name(&self) -> &'static str {
        match self {
            RecordCollection::Accounts => "accounts",
            RecordCollection::Sessions => "sessions",
            RecordCollection::Messages => "session_messages",
            RecordCollection::Machines => "machines",
        }
    }
}

impl std::fmt::Display for RecordCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordCollection::Accounts => write!(f, "accounts"),
            RecordCollection::Sessions => write!(f, "sessions"),
            RecordCollection::Messages => write!(f, "messages"),
            RecordCollection::Machines => write!(f, "machines"),
        }
    }
}

#[async_trait::async_trait]
pub trait Datastore: Send + Sync {
    /// Trivial round-trip used to measure connectivity.
    async fn ping(&self) -> Result<()>;

    async fn count(&self, collection: RecordCollection) -> Result<u64>;
}
