use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, Uint128};

/// Slashes are listed for this long, in seconds.
pub const SLASH_DATA_RETENTION_SECS: u64 = 24 * 60 * 60;

#[cw_serde]
pub struct SlashData {
    pub height: u64,
    /// Block time, in seconds
    pub time: u64,
    pub fraction: Decimal,
    pub reason: String,
}

/// Bridging statistics of an orchestrator on one bridge instance.
#[cw_serde]
#[derive(Default)]
pub struct OrchestratorData {
    pub orchestrator: String,
    pub hyperion_id: u64,
    /// Batches this orchestrator requests must carry at least this much fee
    pub minimum_batch_fee: Uint128,
    pub batch_created: u64,
    pub batch_confirmed: u64,
    pub tx_out_complete: u64,
    pub fees_collected: Uint128,
    pub total_slash_count: u64,
    /// Sum of slashed fractions
    pub total_slash_amount: Decimal,
    pub slash_data: Vec<SlashData>,
}

impl OrchestratorData {
    pub fn new(orchestrator: &str, hyperion_id: u64) -> Self {
        Self {
            orchestrator: orchestrator.to_string(),
            hyperion_id,
            ..Default::default()
        }
    }

    pub fn record_slash(&mut self, slash: SlashData) {
        let cutoff = slash.time.saturating_sub(SLASH_DATA_RETENTION_SECS);
        self.slash_data.retain(|s| s.time >= cutoff);
        self.total_slash_count += 1;
        self.total_slash_amount = self.total_slash_amount.saturating_add(slash.fraction);
        self.slash_data.push(slash);
    }
}
