#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use lingo_core::Clock;
pub use sessions as session;

pub use error::{SessionError, WriteError};

pub use sessions::{
    Effect, FailureReason, LoadPolicy, NavigationDirection, PersistenceFailure, PersistenceWorker,
    ReviewLoop, ReviewLoopService, ReviewSession, SessionIntent, SessionSettings,
    SessionSnapshot, WorkerConfig, WriteOutcome, WriteScope,
};
