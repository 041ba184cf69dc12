//! Timer scheduling and delivery execution for Minaret.
//!
//! The scheduler computes each group's occasions for its local day (five
//! prayer alerts plus one random minute inside each content window) and arms
//! one tokio timer per occasion. Fired timers run through the executor,
//! which claims the occasion in the delivery ledger before sending, so
//! duplicate timers and restart replays suppress themselves.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scheduler::{
//!     Executor, JobRegistry, LoggingTransport, Scheduler, SchedulerConfig, SystemClock,
//! };
//! use selection::{SelectionConfig, SelectionEngine};
//! use upstream::{AladhanClient, AladhanConfig, HadeethClient, HadeethConfig};
//!
//! # async fn example(db: database::Database) -> Result<(), scheduler::SchedulerError> {
//! let registry = Arc::new(JobRegistry::new());
//! let clock = Arc::new(SystemClock);
//!
//! let selection = SelectionEngine::new(
//!     db.pool().clone(),
//!     Arc::new(HadeethClient::new(HadeethConfig::default())),
//!     SelectionConfig::default(),
//! );
//! let executor = Arc::new(Executor::new(
//!     db.pool().clone(),
//!     selection,
//!     Arc::new(LoggingTransport),
//!     registry.clone(),
//!     clock.clone(),
//!     SchedulerConfig::default(),
//! ));
//! let scheduler = Scheduler::new(
//!     db.pool().clone(),
//!     Arc::new(AladhanClient::new(AladhanConfig::default())),
//!     executor,
//!     registry,
//!     clock,
//!     SchedulerConfig::default(),
//! );
//!
//! scheduler.rebuild().await?;
//! scheduler.run_daily().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod scheduler;
pub mod transport;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::SchedulerConfig;
pub use error::{Result, SchedulerError};
pub use executor::{ExecutionOutcome, Executor};
pub use jobs::{JobKey, JobRegistry, JobSpec, Occasion, Prayer};
pub use scheduler::{RebuildSummary, Scheduler};
pub use transport::{DeliveryPayload, LoggingTransport, NoOpTransport, Transport, TransportError};
