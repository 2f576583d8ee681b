mod effects;
mod engine;
mod intent;
mod snapshot;
mod worker;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{SessionError, WriteError};
pub use effects::{Effect, FailureReason, PersistenceFailure, WriteOutcome, WriteScope};
pub use engine::ReviewSession;
pub use intent::{NavigationDirection, SessionIntent};
pub use snapshot::SessionSnapshot;
pub use worker::{PersistenceWorker, WorkerConfig};
pub use workflow::{LoadPolicy, ReviewLoop, ReviewLoopService, SessionSettings};
