//! Leader schedule retrieval, inversion and serialization.
//!
//! The RPC node returns the schedule keyed by validator:
//! `{"<base58 identity>": [slot offsets...]}`. The routing layer needs the
//! opposite direction, so the map is inverted into `(slot_offset, identity)`
//! pairs sorted by slot offset and written next to the epoch metadata.
//!
//! ## Epoch start time
//! `start_time_ms` is estimated as `now - slot_index * 400ms`. It is not
//! reconciled against an on-chain block time and drifts with real slot times.

use crate::config::PipelineConfig;
use crate::output::{check_output_dir, write_json_atomic, OutputError};
use crate::rpc::{EpochInfo, LeaderSchedule, RpcError, SolanaRpcClient};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Fixed slot duration used for the start-time estimate.
pub const SLOT_DURATION_MS: u64 = 400;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("invalid base58: {0}")]
    Decode(#[from] bs58::decode::Error),

    #[error("decoded to {0} bytes, expected 32")]
    InvalidLength(usize),
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Leader schedule not available (null result)")]
    ScheduleUnavailable,

    #[error("Invalid epoch info: {0}")]
    InvalidEpochInfo(String),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// 32-byte validator identity public key.
///
/// Serializes as a JSON array of 32 integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatorIdentity([u8; 32]);

impl ValidatorIdentity {
    /// Decode a base58 identity, rejecting anything that is not exactly 32 bytes.
    pub fn parse(input: &str) -> Result<Self, IdentityError> {
        let decoded = bs58::decode(input.trim()).into_vec()?;
        let bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(decoded.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for ValidatorIdentity {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for ValidatorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

/// One slot of the epoch and the validator leading it.
///
/// Serialized as a two element array `[slot_offset, [32 bytes]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub slot_offset: u64,
    pub validator: ValidatorIdentity,
}

impl Serialize for SlotAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.slot_offset, &self.validator).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SlotAssignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (slot_offset, validator) = <(u64, ValidatorIdentity)>::deserialize(deserializer)?;
        Ok(Self {
            slot_offset,
            validator,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochMetadata {
    /// Estimated wall-clock time of `start_slot` (unix ms)
    pub start_time_ms: u64,
    pub slot_duration_ms: u64,
    pub start_slot: u64,
    pub end_slot: u64,
}

impl EpochMetadata {
    pub fn from_epoch_info(info: &EpochInfo, now_ms: u64) -> Result<Self, ScheduleError> {
        if info.slots_in_epoch == 0 {
            return Err(ScheduleError::InvalidEpochInfo(
                "slotsInEpoch is zero".to_string(),
            ));
        }
        let start_slot = info.absolute_slot.checked_sub(info.slot_index).ok_or_else(|| {
            ScheduleError::InvalidEpochInfo(format!(
                "slotIndex {} exceeds absoluteSlot {}",
                info.slot_index, info.absolute_slot
            ))
        })?;
        let end_slot = start_slot + info.slots_in_epoch - 1;

        let elapsed_ms = info.slot_index.saturating_mul(SLOT_DURATION_MS);

        Ok(Self {
            start_time_ms: now_ms.saturating_sub(elapsed_ms),
            slot_duration_ms: SLOT_DURATION_MS,
            start_slot,
            end_slot,
        })
    }

    pub fn slots_in_epoch(&self) -> u64 {
        self.end_slot - self.start_slot + 1
    }
}

/// Leader schedule for one epoch, as consumed by the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDocument {
    pub metadata: EpochMetadata,
    pub entries: Vec<SlotAssignment>,
}

impl ScheduleDocument {
    /// Leader of the slot at `slot_offset`, if scheduled.
    pub fn leader_at(&self, slot_offset: u64) -> Option<&ValidatorIdentity> {
        let idx = self
            .entries
            .partition_point(|e| e.slot_offset < slot_offset);
        self.entries
            .get(idx)
            .filter(|e| e.slot_offset == slot_offset)
            .map(|e| &e.validator)
    }
}

/// Result of inverting a leader schedule.
#[derive(Debug, Default)]
pub struct Inversion {
    pub entries: Vec<SlotAssignment>,
    /// Validators present in the source schedule
    pub validators: usize,
    /// Identities that failed to decode to 32 bytes
    pub dropped_validators: Vec<String>,
}

/// Invert `validator -> offsets` into slot-ordered assignments.
///
/// Validators whose identity does not decode to 32 bytes are dropped with a
/// warning. The sort is stable, so equal offsets keep schedule order.
pub fn invert_schedule(schedule: &LeaderSchedule) -> Inversion {
    let mut inversion = Inversion {
        validators: schedule.len(),
        ..Default::default()
    };

    for (pubkey, slot_offsets) in schedule {
        let validator = match ValidatorIdentity::parse(pubkey) {
            Ok(validator) => validator,
            Err(e) => {
                warn!("Skipping invalid pubkey {}: {}", pubkey, e);
                inversion.dropped_validators.push(pubkey.clone());
                continue;
            }
        };

        inversion
            .entries
            .extend(slot_offsets.iter().map(|&slot_offset| SlotAssignment {
                slot_offset,
                validator,
            }));
    }

    inversion.entries.sort_by_key(|e| e.slot_offset);
    inversion
}

/// Outcome of a schedule run
#[derive(Debug, Clone)]
pub struct ScheduleSummary {
    pub validators: usize,
    pub dropped_validators: usize,
    pub entries: usize,
    pub start_slot: u64,
    pub end_slot: u64,
    pub bytes_written: usize,
    pub output_path: PathBuf,
}

/// Fetch -> invert -> persist pipeline for the leader schedule.
pub struct SchedulePipeline {
    client: SolanaRpcClient,
    output_path: PathBuf,
}

impl SchedulePipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, ScheduleError> {
        let client = SolanaRpcClient::new(config.rpc_url.clone(), config.rpc.clone())?;
        Ok(Self::with_client(client, config.paths.schedule_output.clone()))
    }

    pub fn with_client(client: SolanaRpcClient, output_path: PathBuf) -> Self {
        Self {
            client,
            output_path,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Fetch and assemble the document without touching disk.
    pub async fn build_document(&self) -> Result<(ScheduleDocument, Inversion), ScheduleError> {
        info!("Fetching epoch info...");
        let epoch_info = self.client.get_epoch_info().await?;
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let metadata = EpochMetadata::from_epoch_info(&epoch_info, now_ms)?;

        info!(
            "Epoch {}: start_slot={}, end_slot={}, slots={}",
            epoch_info.epoch,
            metadata.start_slot,
            metadata.end_slot,
            metadata.slots_in_epoch()
        );

        info!("Fetching leader schedule...");
        let schedule = self
            .client
            .get_leader_schedule()
            .await?
            .ok_or(ScheduleError::ScheduleUnavailable)?;

        info!("Processing {} validators...", schedule.len());
        let mut inversion = invert_schedule(&schedule);
        let entries = std::mem::take(&mut inversion.entries);
        info!(
            "Total entries: {} ({} validators dropped)",
            entries.len(),
            inversion.dropped_validators.len()
        );

        Ok((ScheduleDocument { metadata, entries }, inversion))
    }

    /// Run the full pipeline. Nothing is written unless every fetch succeeded.
    pub async fn run(&self) -> Result<ScheduleSummary, ScheduleError> {
        check_output_dir(&self.output_path)?;

        let (document, inversion) = self.build_document().await?;
        let bytes_written = write_json_atomic(&document, &self.output_path)?;

        let dropped = inversion.dropped_validators.len();
        let summary = ScheduleSummary {
            validators: inversion.validators,
            dropped_validators: dropped,
            entries: document.entries.len(),
            start_slot: document.metadata.start_slot,
            end_slot: document.metadata.end_slot,
            bytes_written,
            output_path: self.output_path.clone(),
        };

        info!(
            "Wrote {:?} ({} entries, {} validators)",
            summary.output_path, summary.entries, summary.validators
        );
        Ok(summary)
    }
}
