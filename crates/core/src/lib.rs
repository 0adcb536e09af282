//! `HomeInventoryCore`: the composition root tying the job queue, ledger,
//! recommendation engine, and shopping store into the single stateful
//! object the transport layer drives.

mod core;
mod health;
mod requests;

pub use core::{HomeInventoryCore, JobResultOutcome};
pub use health::{PantryHealthScore, Subscores, compute_pantry_health};
pub use requests::{GenerateDailyRequest, GenerateWeeklyRequest, PantryHealthRequest};
