mod suite;

use cosmwasm_std::{coin, Uint128};
use suite::{SuiteBuilder, FEE_DENOM, HYPERION_ID, TOKEN, TOKEN_DENOM};

use crate::msg::{PendingSendToChainResponse, QueryMsg};
use crate::types::{OrchestratorData, OutgoingTxBatch, Valset};

#[test]
fn deposit_mints_to_receiver() {
    let mut suite = SuiteBuilder::new().build();
    let user = suite.addr("user");

    suite.deposit(&user, 1_000).unwrap();
    assert_eq!(suite.balance(&user, TOKEN_DENOM), Uint128::zero());

    suite.end_block().unwrap();
    assert_eq!(suite.balance(&user, TOKEN_DENOM), Uint128::new(1_000));
    let nonce: u64 = suite.query(&QueryMsg::LastObservedEventNonce {
        hyperion_id: HYPERION_ID,
    });
    assert_eq!(nonce, 1);
}

#[test]
fn valset_is_requested_and_confirmed() {
    let mut suite = SuiteBuilder::new().build();
    suite.end_block().unwrap();

    let orchestrator = suite.orchestrator.to_string();
    let pending: Vec<Valset> = suite.query(&QueryMsg::LastPendingValsetRequestByAddr {
        hyperion_id: HYPERION_ID,
        orchestrator: orchestrator.clone(),
    });
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].members.len(), 1);

    suite.confirm_valset(&pending[0]).unwrap();
    let pending: Vec<Valset> = suite.query(&QueryMsg::LastPendingValsetRequestByAddr {
        hyperion_id: HYPERION_ID,
        orchestrator,
    });
    assert!(pending.is_empty());

    // a second confirm of the same valset is refused
    let valset: Option<Valset> = suite.query(&QueryMsg::ValsetRequest {
        hyperion_id: HYPERION_ID,
        nonce: 1,
    });
    suite.confirm_valset(&valset.unwrap()).unwrap_err();
}

#[test]
fn round_trip() {
    let mut suite = SuiteBuilder::new()
        .with_funds("user", vec![coin(50, FEE_DENOM)])
        .build();
    let user = suite.addr("user");
    let orchestrator = suite.orchestrator.clone();

    suite.deposit(&user, 1_000).unwrap();
    suite.end_block().unwrap();

    suite
        .execute(
            &user,
            &crate::msg::ExecuteMsg::SendToChain {
                dest_hyperion_id: HYPERION_ID,
                dest: "0x2222222222222222222222222222222222222222".to_string(),
                amount: coin(600, TOKEN_DENOM),
                bridge_fee: coin(10, FEE_DENOM),
            },
            &[coin(10, FEE_DENOM), coin(600, TOKEN_DENOM)],
        )
        .unwrap();
    assert_eq!(suite.balance(&user, TOKEN_DENOM), Uint128::new(400));
    assert_eq!(suite.balance(&suite.contract, TOKEN_DENOM), Uint128::zero());
    assert_eq!(suite.balance(&suite.contract, FEE_DENOM), Uint128::new(10));

    let pending: PendingSendToChainResponse = suite.query(&QueryMsg::PendingSendToChain {
        hyperion_id: HYPERION_ID,
        sender: user.to_string(),
    });
    assert_eq!(pending.unbatched_transfers.len(), 1);

    suite
        .execute(
            &orchestrator,
            &crate::msg::ExecuteMsg::RequestBatch {
                hyperion_id: HYPERION_ID,
                denom: TOKEN_DENOM.to_string(),
            },
            &[],
        )
        .unwrap();
    let batch: Option<OutgoingTxBatch> = suite.query(&QueryMsg::BatchRequestByNonce {
        hyperion_id: HYPERION_ID,
        token_contract: TOKEN.to_string(),
        nonce: 1,
    });
    let batch = batch.unwrap();
    assert_eq!(batch.transactions.len(), 1);
    assert_eq!(batch.total_fee(), Uint128::new(10));

    suite.withdraw(batch.batch_nonce).unwrap();
    suite.end_block().unwrap();

    assert_eq!(suite.balance(&orchestrator, FEE_DENOM), Uint128::new(10));
    assert_eq!(suite.balance(&suite.contract, FEE_DENOM), Uint128::zero());
    let batches: Vec<OutgoingTxBatch> = suite.query(&QueryMsg::OutgoingTxBatches {
        hyperion_id: HYPERION_ID,
        limit: None,
    });
    assert!(batches.is_empty());
    let data: OrchestratorData = suite.query(&QueryMsg::OrchestratorData {
        hyperion_id: HYPERION_ID,
        orchestrator: orchestrator.to_string(),
    });
    assert_eq!(data.tx_out_complete, 1);
    assert_eq!(data.batch_created, 1);
}

#[test]
fn cancel_refunds_sender() {
    let mut suite = SuiteBuilder::new()
        .with_funds("user", vec![coin(50, FEE_DENOM)])
        .build();
    let user = suite.addr("user");
    suite.deposit(&user, 100).unwrap();
    suite.end_block().unwrap();

    suite
        .execute(
            &user,
            &crate::msg::ExecuteMsg::SendToChain {
                dest_hyperion_id: HYPERION_ID,
                dest: "0x2222222222222222222222222222222222222222".to_string(),
                amount: coin(100, TOKEN_DENOM),
                bridge_fee: coin(5, FEE_DENOM),
            },
            &[coin(5, FEE_DENOM), coin(100, TOKEN_DENOM)],
        )
        .unwrap();
    suite
        .execute(
            &user,
            &crate::msg::ExecuteMsg::CancelSendToChain {
                hyperion_id: HYPERION_ID,
                transaction_id: 1,
            },
            &[],
        )
        .unwrap();
    assert_eq!(suite.balance(&user, TOKEN_DENOM), Uint128::new(100));
    assert_eq!(suite.balance(&user, FEE_DENOM), Uint128::new(50));
}

#[test]
fn paused_chain_rejects_sends() {
    let mut suite = SuiteBuilder::new()
        .with_funds("user", vec![coin(50, FEE_DENOM)])
        .build();
    let owner = suite.owner.clone();
    suite
        .execute(
            &owner,
            &crate::msg::ExecuteMsg::PauseChain {
                hyperion_id: HYPERION_ID,
            },
            &[],
        )
        .unwrap();
    let user = suite.addr("user");
    suite
        .execute(
            &user,
            &crate::msg::ExecuteMsg::SendToChain {
                dest_hyperion_id: HYPERION_ID,
                dest: "0x2222222222222222222222222222222222222222".to_string(),
                amount: coin(1, FEE_DENOM),
                bridge_fee: coin(1, FEE_DENOM),
            },
            &[coin(2, FEE_DENOM)],
        )
        .unwrap_err();
}
