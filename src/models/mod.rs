//! Core data models for the leaderboard service.

mod entry;
mod handle;
mod ids;
mod season;

pub use entry::*;
pub use handle::*;
pub use ids::*;
pub use season::*;
