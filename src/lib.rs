//! Leader Routing Data Pipelines
//!
//! Offline batch jobs that prepare the two static datasets used to route
//! requests toward the Solana validator expected to produce the next blocks.
//!
//! # Pipelines
//!
//! 1. **Leader schedule** ([`schedule`]): fetches epoch info and the leader
//!    schedule, inverts it into slot-ordered `(slot_offset, identity)` pairs
//! 2. **Validator geolocation** ([`geo`]): fetches cluster nodes, geolocates their
//!    gossip IPs and classifies each validator into a routing [`region`]
//!
//! Both share the retrying JSON-RPC client in [`rpc`] and write their document
//! once, atomically, through [`output`].
//!
//! # Output Files
//!
//! - `schedule.json`: epoch metadata and slot -> validator entries
//! - `leader_geo.json`: validator pubkey -> region label
//!
//! # Example
//!
//! ```no_run
//! use leader_routing_data::config::PipelineConfig;
//! use leader_routing_data::schedule::SchedulePipeline;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::load()?;
//!     let summary = SchedulePipeline::new(&config)?.run().await?;
//!     println!("Wrote {} schedule entries", summary.entries);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod geo;
pub mod output;
pub mod region;
pub mod rpc;
pub mod schedule;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use region::Region;
pub use schedule::{ScheduleDocument, SlotAssignment, ValidatorIdentity};
