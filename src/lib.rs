//! GAUGEWATCH: factory gauge monitoring core
//!
//! Status-derivation and freshness-evaluation engine for periodic
//! instrument readings from factory equipment (machines → stations →
//! gauges).
//!
//! ## Architecture
//!
//! - **Classification Engine**: normalizes a gauge observation into
//!   ALERT / NORMAL / OTHER / UNKNOWN
//! - **Reading Ingestion**: validates, encodes, and persists operator
//!   readings; sole writer of the gauge current-state cache
//! - **Aggregation Engine**: OR-rollup of alerts and trailing-window
//!   freshness at station and machine level
//! - **Reset Scheduler**: daily wall-clock reset of machine operational
//!   status to "To Check"
//!
//! Persistence, blob storage, and the clock are trait collaborators with
//! in-memory reference implementations.

pub mod classify;
pub mod clock;
pub mod config;
pub mod ingest;
pub mod rollup;
pub mod scheduler;
pub mod storage;
pub mod types;

// Re-export engine configuration
pub use config::EngineConfig;

// Re-export commonly used types
pub use types::{
    Gauge, GaugeType, GaugeTypeRegistry, Id, Machine, MachineStatus, Observation,
    ObservedStatus, Reading, ReadingInput, Station,
};

// Re-export the engine surface
pub use classify::{classify, classify_current, GaugeStatus};
pub use ingest::{IngestError, ReadingRecorder};
pub use rollup::{
    machine_freshness, machine_freshness_with_window, machine_status, station_freshness,
    station_freshness_with_window, station_status, Freshness, RollupStatus,
};
pub use scheduler::{parse_time_of_day, ResetScheduler, ScheduleError, ScheduleState};

// Re-export storage collaborators
pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{
    BlobError, BlobStore, InMemoryBlobStore, InMemoryStore, Persistence, PersistenceError,
};
