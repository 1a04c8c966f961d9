//! Per-block hooks driven by the host through `sudo`.

use cosmwasm_std::{DepsMut, Env, Event};
use cosmwasm_logging::{debug, error};

use crate::attestation::{prune_attestations, tally_attestations};
use crate::batch::cancel_timed_out_batches;
use crate::cache::with_cache;
use crate::error::ContractError;
use crate::pool::refund_timed_out_transfers;
use crate::slashing::{batch_slashing, valset_slashing};
use crate::state::config::{all_chain_params, chain_params};
use crate::types::CounterpartyChainParams;
use crate::valset::{create_valsets, prune_valsets};

pub fn begin_block(_deps: &mut DepsMut, env: &Env) -> Result<Vec<Event>, ContractError> {
    debug!("begin block {}", env.block.height);
    Ok(vec![])
}

/// Runs the block sequence for every chain that is not paused.
///
/// Each chain runs in its own cache context. A chain whose pass fails is
/// logged and rolled back without holding up the others, unless the failure
/// is a broken invariant.
pub fn end_block(deps: &mut DepsMut, env: &Env) -> Result<Vec<Event>, ContractError> {
    let mut events = vec![];
    for params in all_chain_params(deps.storage)? {
        let hyperion_id = params.hyperion_id;
        if params.paused {
            debug!("hyperion {hyperion_id} paused, skipping end block");
            continue;
        }
        match with_cache(deps, |cached| chain_end_block(cached, env, &params)) {
            Ok(chain_events) => events.extend(chain_events),
            Err(err) if err.is_fail_stop() => return Err(err),
            Err(err) => error!("hyperion {hyperion_id}: end block failed: {err}"),
        }
    }
    Ok(events)
}

fn chain_end_block(
    deps: &mut DepsMut,
    env: &Env,
    params: &CounterpartyChainParams,
) -> Result<Vec<Event>, ContractError> {
    let mut events = vec![];
    events.extend(valset_slashing(deps.storage, env, params)?);
    events.extend(batch_slashing(deps.storage, env, params)?);
    events.extend(tally_attestations(deps, env, params)?);

    // observations may have moved the counterparty height and rpc list
    let params = chain_params(deps.storage, params.hyperion_id)?;
    events.extend(cancel_timed_out_batches(deps.storage, &params)?);
    events.extend(refund_timed_out_transfers(deps.storage, env, &params)?);
    events.extend(create_valsets(deps, env, &params)?);
    prune_valsets(deps, env, &params)?;
    prune_attestations(deps, env, &params)?;
    Ok(events)
}
