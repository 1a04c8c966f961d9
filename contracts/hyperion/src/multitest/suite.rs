use anyhow::Result as AnyResult;
use cosmwasm_std::{Addr, Coin, Uint128, Uint256};
use cw_multi_test::{AppResponse, Contract, ContractWrapper, Executor};
use hyperion_bindings::HyperionMsg;
use hyperion_bindings_test::HyperionApp;
use k256::ecdsa::SigningKey;

use crate::host::staking::tests::bonded;
use crate::msg::{ExecuteMsg, InstantiateMsg, QueryMsg, SudoMsg};
use crate::types::eth::test_keys::{address, sign, signing_key};
use crate::types::{
    CounterpartyChainParams, DefaultToken, DepositClaim, EthAddress, Valset, WithdrawClaim,
};

pub const HYPERION_ID: u64 = 1;
pub const FEE_DENOM: &str = "ahelios";
pub const TOKEN: EthAddress = EthAddress::new([0x11; 20]);
pub const TOKEN_DENOM: &str = "hyperion/1/0x1111111111111111111111111111111111111111";

fn contract_hyperion() -> Box<dyn Contract<HyperionMsg>> {
    let contract = ContractWrapper::new(crate::execute, crate::instantiate, crate::query)
        .with_sudo(crate::sudo)
        .with_migrate(crate::migrate);
    Box::new(contract)
}

pub struct SuiteBuilder {
    funds: Vec<(String, Vec<Coin>)>,
    height: u64,
}

impl SuiteBuilder {
    pub fn new() -> Self {
        Self {
            funds: vec![],
            height: 100,
        }
    }

    /// Gives `coins` to the account derived from `name`.
    pub fn with_funds(mut self, name: &str, coins: Vec<Coin>) -> Self {
        self.funds.push((name.to_string(), coins));
        self
    }

    #[track_caller]
    pub fn build(self) -> Suite {
        let mut app = HyperionApp::new_at_height(self.height);
        let owner = app.api().addr_make("owner");
        let validator = app.api().addr_make("validator");
        let orchestrator = app.api().addr_make("orchestrator");

        let funds: Vec<(Addr, Vec<Coin>)> = self
            .funds
            .iter()
            .map(|(name, coins)| (app.api().addr_make(name), coins.clone()))
            .collect();
        app.init_modules(|router, _, storage| {
            for (addr, coins) in funds {
                router.bank.init_balance(storage, &addr, coins).unwrap();
            }
        });

        let code_id = app.store_code(contract_hyperion());
        let mut chain = CounterpartyChainParams::new_default(HYPERION_ID, 11155111);
        chain.bridge_counterparty_address = EthAddress::new([0xbb; 20]);
        chain.default_tokens = vec![DefaultToken {
            token_address: TOKEN,
            denom: TOKEN_DENOM.to_string(),
            is_cosmos_originated: false,
        }];
        let contract = app
            .instantiate_contract(
                code_id,
                owner.clone(),
                &InstantiateMsg {
                    admin: Some(owner.to_string()),
                    native_fee_denom: Some(FEE_DENOM.to_string()),
                    max_batch_size: None,
                    admins: vec![],
                    chains: vec![chain],
                },
                &[],
                "hyperion",
                Some(owner.to_string()),
            )
            .unwrap();

        app.wasm_sudo(
            contract.clone(),
            &SudoMsg::SyncValidators {
                validators: vec![bonded(validator.as_str(), 100)],
            },
        )
        .unwrap();

        let eth_key = signing_key(7);
        app.execute_contract(
            validator.clone(),
            contract.clone(),
            &ExecuteMsg::SetOrchestratorAddresses {
                hyperion_id: HYPERION_ID,
                orchestrator: orchestrator.to_string(),
                eth_address: address(&eth_key).to_string(),
                minimum_batch_fee: None,
            },
            &[],
        )
        .unwrap();

        Suite {
            app,
            contract,
            owner,
            orchestrator,
            eth_key,
            next_nonce: 1,
        }
    }
}

pub struct Suite {
    pub app: HyperionApp,
    pub contract: Addr,
    pub owner: Addr,
    pub orchestrator: Addr,
    eth_key: SigningKey,
    next_nonce: u64,
}

impl Suite {
    pub fn addr(&self, name: &str) -> Addr {
        self.app.api().addr_make(name)
    }

    pub fn balance(&self, addr: &Addr, denom: &str) -> Uint128 {
        self.app
            .wrap()
            .query_balance(addr, denom)
            .unwrap()
            .amount
    }

    pub fn query<T: serde::de::DeserializeOwned>(&self, msg: &QueryMsg) -> T {
        self.app
            .wrap()
            .query_wasm_smart(self.contract.clone(), msg)
            .unwrap()
    }

    pub fn execute(
        &mut self,
        sender: &Addr,
        msg: &ExecuteMsg,
        funds: &[Coin],
    ) -> AnyResult<AppResponse> {
        self.app
            .execute_contract(sender.clone(), self.contract.clone(), msg, funds)
    }

    /// Ends the current block and moves to the next one.
    pub fn end_block(&mut self) -> AnyResult<AppResponse> {
        let res = self
            .app
            .wasm_sudo(self.contract.clone(), &SudoMsg::EndBlock {})?;
        self.app.advance_blocks(1);
        Ok(res)
    }

    fn take_nonce(&mut self) -> u64 {
        let nonce = self.next_nonce;
        self.next_nonce += 1;
        nonce
    }

    pub fn deposit(&mut self, receiver: &Addr, amount: u128) -> AnyResult<AppResponse> {
        let event_nonce = self.take_nonce();
        let claim = DepositClaim {
            hyperion_id: HYPERION_ID,
            event_nonce,
            block_height: 1_000 + event_nonce,
            token_contract: TOKEN,
            amount: Uint256::from(amount),
            ethereum_sender: EthAddress::new([0x33; 20]).to_string(),
            cosmos_receiver: receiver.to_string(),
            orchestrator: self.orchestrator.to_string(),
            data: String::new(),
            tx_hash: format!("0x{event_nonce:064x}"),
            rpc_used: "https://rpc.sepolia.example".to_string(),
        };
        let orchestrator = self.orchestrator.clone();
        self.execute(&orchestrator, &ExecuteMsg::DepositClaim(claim), &[])
    }

    pub fn withdraw(&mut self, batch_nonce: u64) -> AnyResult<AppResponse> {
        let event_nonce = self.take_nonce();
        let claim = WithdrawClaim {
            hyperion_id: HYPERION_ID,
            event_nonce,
            block_height: 1_000 + event_nonce,
            batch_nonce,
            token_contract: TOKEN,
            orchestrator: self.orchestrator.to_string(),
            tx_hash: format!("0x{event_nonce:064x}"),
            rpc_used: String::new(),
        };
        let orchestrator = self.orchestrator.clone();
        self.execute(&orchestrator, &ExecuteMsg::WithdrawClaim(claim), &[])
    }

    /// Signs `valset` with the orchestrator's eth key.
    pub fn confirm_valset(&mut self, valset: &Valset) -> AnyResult<AppResponse> {
        let signature = sign(&self.eth_key, &valset.checkpoint());
        let orchestrator = self.orchestrator.clone();
        self.execute(
            &orchestrator,
            &ExecuteMsg::ValsetConfirm {
                hyperion_id: HYPERION_ID,
                nonce: valset.nonce,
                eth_address: address(&self.eth_key).to_string(),
                signature: hex::encode(signature),
            },
            &[],
        )
    }
}
