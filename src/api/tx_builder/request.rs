use super::state::TxInputs;
use crate::api::collaborators::EngineRequest;
use crate::application::session::SessionContext;
use crate::models::amount::SelectedAmount;
use crate::models::encryption_key::EncryptionKey;
use crate::models::fee_strategy::FeeStrategy;
use crate::models::gas::EstimatedGasDetails;
use crate::models::transaction_type::ProofType;

/// The parts of an engine call that differ between estimation and proving.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RequestParts<'a> {
    pub proof_type: ProofType,
    pub inputs: &'a TxInputs,
    pub key: &'a EncryptionKey,
    pub fee: &'a FeeStrategy,
    pub memo: Option<&'a str>,
}

impl RequestParts<'_> {
    /// builds the engine request for `gas_details`; the broadcaster fee and
    /// batch price are only known once an estimate exists
    pub(crate) fn build(
        &self,
        ctx: &SessionContext,
        gas_details: EstimatedGasDetails,
        broadcaster_fee: Option<SelectedAmount>,
        overall_batch_min_gas_price: Option<u128>,
    ) -> EngineRequest {
        EngineRequest {
            proof_type: self.proof_type,
            chain: ctx.chain,
            wallet_id: ctx.wallet.wallet_id.clone(),
            encryption_key: self.key.clone(),
            recipients: self.inputs.recipients(),
            gas_details,
            broadcaster_fee,
            send_with_public_wallet: self.fee.signer().is_some(),
            overall_batch_min_gas_price,
            memo: self.memo.map(str::to_string),
            show_sender_address: ctx.settings.show_sender_address,
            swap: self.inputs.swap_quote().cloned(),
        }
    }
}
