//! Pipeline entry points.
//!
//! - `FeedCycle`: one fetch → normalize → diff → persist pass
//! - `Scheduler`: runs a cycle immediately, then on a fixed interval
//! - `run_once`: fetch and overwrite an output file, no diffing

pub mod cycle;
pub mod diff;
pub mod oneshot;
pub mod scheduler;

pub use cycle::{CycleReport, CycleSettings, CycleStage, FeedCycle};
pub use diff::{DiffCalculator, calculate_diff, merge};
pub use oneshot::{resolve_output, run_once};
pub use scheduler::{Job, Scheduler, SchedulerHandle};
