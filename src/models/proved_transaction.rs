use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::models::amount::SelectedAmount;
use crate::models::chain::Chain;
use crate::models::gas::GasPricing;
use crate::models::transaction_type::ProofType;

/// An unsigned EVM transaction request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub to: String,

    /// hex encoded call data, `0x` prefixed
    pub data: String,
    pub value: u128,

    /// set by the proof engine for its own signer model; must be removed
    /// before a local wallet signs
    pub from: Option<String>,
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    pub pricing: Option<GasPricing>,
    pub chain_id: u64,
}

impl RawTransaction {
    /// a transaction with only a destination and call data set
    pub fn call(chain: Chain, to: impl Into<String>, data: impl Into<String>, value: u128) -> Self {
        Self {
            to: to.into(),
            data: data.into(),
            value,
            from: None,
            nonce: None,
            gas_limit: None,
            pricing: None,
            chain_id: chain.chain_id(),
        }
    }

    pub fn has_call_data(&self) -> bool {
        let data = self.data.trim_start_matches("0x");
        !data.is_empty()
    }
}

/// What went into a proof, kept for display and resubmission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofMetadata {
    /// `None` for public transactions that are populated without a proof
    pub proof_type: Option<ProofType>,
    pub broadcaster_fee: Option<SelectedAmount>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A transaction ready for submission.
///
/// Expensive to produce; kept until an upstream edit invalidates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvedTransaction {
    pub raw_transaction: RawTransaction,
    pub nullifiers: Vec<String>,
    pub metadata: ProofMetadata,
}

/// Which path delivered a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum SubmitPath {
    #[strum(to_string = "self signed")]
    SelfSigned,
    #[strum(to_string = "broadcaster")]
    Broadcaster,
}

/// The result of a builder session that ended in a send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub tx_hash: String,
    pub chain: Chain,
    pub path: SubmitPath,
}

/// Receipt returned once a transaction is mined.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub success: bool,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::tests::shared::fixtures;

    #[test]
    fn proof_timestamp_is_stored_as_rfc_3339() {
        let mut proved = fixtures::proved_transaction();
        proved.metadata.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let json = serde_json::to_value(&proved).unwrap();
        assert_eq!("2024-03-01T12:30:00Z", json["metadata"]["created_at"]);

        let restored: ProvedTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(proved, restored);
    }
}
