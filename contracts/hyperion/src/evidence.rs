use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Env, Event, Storage};

use crate::error::ContractError;
use crate::slashing::{slash_and_jail, BAD_ETH_SIGNATURE};
use crate::state::config::chain_params;
use crate::state::orchestrator::validator_by_eth_address;
use crate::state::valset::{is_past_checkpoint, store_past_checkpoint};
use crate::types::eth::recover_signer;
use crate::types::{OutgoingTxBatch, Valset};

/// The artifact a validator is accused of having signed.
#[cw_serde]
pub enum EvidenceSubject {
    Valset(Valset),
    Batch(OutgoingTxBatch),
}

impl EvidenceSubject {
    /// Checkpoint of the subject as it would be signed for `hyperion_id`.
    pub fn checkpoint(&self, hyperion_id: u64) -> [u8; 32] {
        match self {
            EvidenceSubject::Valset(vs) => {
                let mut vs = vs.clone();
                vs.hyperion_id = hyperion_id;
                vs.checkpoint()
            }
            EvidenceSubject::Batch(batch) => {
                let mut batch = batch.clone();
                batch.hyperion_id = hyperion_id;
                batch.checkpoint()
            }
        }
    }
}

/// Slashes the validator whose key signed a checkpoint the bridge never
/// produced. Signatures over real valsets and batches are not evidence.
pub fn check_bad_signature_evidence(
    storage: &mut dyn Storage,
    env: &Env,
    hyperion_id: u64,
    subject: &EvidenceSubject,
    signature: &str,
) -> Result<Event, ContractError> {
    let params = chain_params(storage, hyperion_id)?;
    let checkpoint = subject.checkpoint(hyperion_id);
    if is_past_checkpoint(storage, hyperion_id, &checkpoint) {
        return Err(ContractError::invalid("Checkpoint exists, cannot slash"));
    }

    let sig = hex::decode(signature.trim_start_matches("0x"))?;
    let signer = recover_signer(&checkpoint, &sig)?;
    let validator = validator_by_eth_address(storage, hyperion_id, &signer)?
        .ok_or_else(|| ContractError::invalid(format!("no validator for signer {signer}")))?;

    let ev = slash_and_jail(
        storage,
        env,
        hyperion_id,
        &validator,
        params.slash_fraction_bad_eth_signature,
        BAD_ETH_SIGNATURE,
    )?;
    // the same evidence cannot slash twice
    store_past_checkpoint(storage, hyperion_id, &checkpoint, env.block.height)?;
    Ok(ev.add_attribute("checkpoint", hex::encode(checkpoint)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::staking::{self, sync_validators, tests::bonded};
    use crate::state::config::CHAIN_PARAMS;
    use crate::state::orchestrator::set_delegate_keys;
    use crate::state::valset::store_valset;
    use crate::types::eth::test_keys::{address, sign, signing_key};
    use crate::types::{BridgeValidator, CounterpartyChainParams, EthAddress};
    use assert_matches::assert_matches;
    use cosmwasm_std::testing::{mock_env, MockStorage};
    use cosmwasm_std::Uint256;

    fn valset(nonce: u64, signer: EthAddress) -> Valset {
        Valset {
            hyperion_id: 1,
            nonce,
            height: 10,
            members: vec![BridgeValidator {
                ethereum_address: signer,
                power: 100,
            }],
            reward_amount: Uint256::zero(),
            reward_token: EthAddress::ZERO,
        }
    }

    #[test]
    fn forged_checkpoint_slashes_signer() {
        let mut store = MockStorage::new();
        let env = mock_env();
        CHAIN_PARAMS
            .save(&mut store, 1, &CounterpartyChainParams::new_default(1, 1))
            .unwrap();
        let key = signing_key(7);
        let eth = address(&key);
        set_delegate_keys(&mut store, 1, "val", "orch", &eth).unwrap();
        sync_validators(&mut store, &env, vec![bonded("val", 10)]).unwrap();

        let real = valset(1, eth);
        store_valset(&mut store, &real).unwrap();
        let real_sig = hex::encode(sign(&key, &real.checkpoint()));
        assert_matches!(
            check_bad_signature_evidence(
                &mut store,
                &env,
                1,
                &EvidenceSubject::Valset(real),
                &real_sig
            ),
            Err(ContractError::Invalid(_))
        );

        let forged = EvidenceSubject::Valset(valset(99, eth));
        let sig = hex::encode(sign(&key, &forged.checkpoint(1)));
        let ev = check_bad_signature_evidence(&mut store, &env, 1, &forged, &sig).unwrap();
        assert_eq!(ev.ty, "hyperion_slash");
        assert!(staking::validator(&store, "val").unwrap().unwrap().jailed);

        assert_matches!(
            check_bad_signature_evidence(&mut store, &env, 1, &forged, &sig),
            Err(ContractError::Invalid(_))
        );
    }

    #[test]
    fn unknown_signer_is_rejected() {
        let mut store = MockStorage::new();
        CHAIN_PARAMS
            .save(&mut store, 1, &CounterpartyChainParams::new_default(1, 1))
            .unwrap();
        let key = signing_key(3);
        let forged = EvidenceSubject::Valset(valset(5, address(&key)));
        let sig = hex::encode(sign(&key, &forged.checkpoint(1)));
        assert_matches!(
            check_bad_signature_evidence(&mut store, &mock_env(), 1, &forged, &sig),
            Err(ContractError::Invalid(_))
        );
    }
}
