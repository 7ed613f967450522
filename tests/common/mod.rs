// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

//! In-process chain harness for the test suites: compiles the EthDonation
//! fixture with `solc`, runs it on revm, and exposes the result through the
//! crate's `EthereumQueries` trait.

use std::{
    fs::File,
    io::Write,
    path::Path,
    process::{Command, Stdio},
    sync::Mutex,
};

use alloy::rpc::types::eth::{Filter, Log};
use alloy_primitives::{Address, Bytes, Log as PrimitiveLog, TxKind, B256, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use ethdonation_client::{client::EthereumQueries, common::ChainClientError};
use revm::{
    context::result::{ExecutionResult, Output},
    database::{CacheDB, EmptyDB},
    state::AccountInfo,
    Context, ExecuteCommitEvm, ExecuteEvm, MainBuilder, MainContext,
};

pub const ETH_DONATION_SOL: &str = include_str!("../../contracts/EthDonation.sol");
pub const GAS_LIMIT: u64 = 500_000_000;

/// Funding deadline used by the fixtures; far above the harness block time.
pub const END_TIME: u64 = 1_700_000_000;

sol! {
    function createProject(string title, string description, uint256 endTime) external;
    function createExpense(uint256 projectId, uint256 allocation, string description) external;
    function donate(uint256 projectId) external payable;
    function approveExpense(uint256 projectId, uint256 expenseId) external;
}

fn write_compilation_json(path: &Path, file_name: &str) {
    let config_path = path.join("config.json");
    let mut source = File::create(config_path).unwrap();
    writeln!(
        source,
        r#"
{{
  "language": "Solidity",
  "sources": {{
    "{file_name}": {{
      "urls": ["./{file_name}"]
    }}
  }},
  "settings": {{
    "viaIR": true,
    "outputSelection": {{
      "*": {{
        "*": ["evm.bytecode"]
      }}
    }}
  }}
}}
"#
    )
    .unwrap();
}

/// Compiles a Solidity source with the `solc` binary and returns the
/// deployment bytecode of `contract_name`.
pub fn compile_contract(source_code: &str, file_name: &str, contract_name: &str) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path();

    let source_path = path.join(file_name);
    let mut source_file = File::create(&source_path).unwrap();
    writeln!(source_file, "{}", source_code).unwrap();

    write_compilation_json(path, file_name);

    let config_file = File::open(path.join("config.json")).unwrap();
    let output_file = File::create(path.join("result.json")).unwrap();

    let status = Command::new("solc")
        .current_dir(path)
        .arg("--standard-json")
        .stdin(Stdio::from(config_file))
        .stdout(Stdio::from(output_file))
        .status()
        .expect("solc must be installed");
    assert!(status.success(), "solc compilation failed");

    let contents = std::fs::read_to_string(path.join("result.json")).unwrap();
    let json_data: serde_json::Value = serde_json::from_str(&contents).unwrap();

    if let Some(errors) = json_data.get("errors") {
        for error in errors.as_array().unwrap() {
            let severity = error["severity"].as_str().unwrap_or("");
            if severity == "error" {
                panic!(
                    "solc compilation error: {}",
                    error["formattedMessage"].as_str().unwrap_or("unknown")
                );
            }
        }
    }

    let bytecode_hex = json_data["contracts"][file_name][contract_name]["evm"]["bytecode"]
        ["object"]
        .as_str()
        .expect("failed to extract bytecode from solc output");
    hex::decode(bytecode_hex).unwrap()
}

fn nonce(db: &CacheDB<EmptyDB>, address: Address) -> u64 {
    db.cache
        .accounts
        .get(&address)
        .map_or(0, |account| account.info.nonce)
}

/// Seeds an externally owned account with a balance in whole ether.
pub fn fund_account(db: &mut CacheDB<EmptyDB>, address: Address, ether: u64) {
    let balance = U256::from(ether) * U256::from(10u64).pow(U256::from(18));
    db.insert_account_info(
        address,
        AccountInfo {
            balance,
            ..Default::default()
        },
    );
}

/// Deploys a compiled contract and returns its address.
pub fn deploy_contract(db: &mut CacheDB<EmptyDB>, deployer: Address, bytecode: Vec<u8>) -> Address {
    let deployer_nonce = nonce(db, deployer);
    let result = Context::mainnet()
        .with_db(db)
        .modify_tx_chained(|tx| {
            tx.caller = deployer;
            tx.nonce = deployer_nonce;
            tx.kind = TxKind::Create;
            tx.data = Bytes::from(bytecode);
            tx.gas_limit = GAS_LIMIT;
            tx.value = U256::ZERO;
        })
        .build_mainnet()
        .replay_commit()
        .expect("deployment transaction failed");

    match result {
        ExecutionResult::Success { output, .. } => match output {
            Output::Create(_, Some(address)) => address,
            other => panic!("expected Create output with address, got: {:?}", other),
        },
        ExecutionResult::Revert { output, .. } => {
            panic!("deployment reverted: {}", hex::encode(&output));
        }
        ExecutionResult::Halt { reason, .. } => {
            panic!("deployment halted: {:?}", reason);
        }
    }
}

/// One deployed EthDonation contract on an in-process chain, with two funded
/// externally owned accounts.
pub struct DonationTest {
    pub db: CacheDB<EmptyDB>,
    pub contract: Address,
    pub main_account: Address,
    pub another_account: Address,
    pub block_number: u64,
    logs: Vec<Log>,
}

impl DonationTest {
    pub fn new() -> Self {
        let mut db = CacheDB::default();
        // Stay above the precompile address range: 0x01..=0x11 are taken on
        // post-Pectra mainnet (EIP-2537), and revm runs the Prague spec.
        let main_account = Address::with_last_byte(0x90);
        let another_account = Address::with_last_byte(0xA0);
        fund_account(&mut db, main_account, 10_000);
        fund_account(&mut db, another_account, 10_000);
        let bytecode = compile_contract(ETH_DONATION_SOL, "EthDonation.sol", "EthDonation");
        let contract = deploy_contract(&mut db, main_account, bytecode);
        Self {
            db,
            contract,
            main_account,
            another_account,
            block_number: 1,
            logs: Vec::new(),
        }
    }

    /// Executes a state-changing call, panicking on revert and returning the
    /// emitted logs.
    pub fn execute(&mut self, caller: Address, calldata: Vec<u8>, value: U256) -> Vec<PrimitiveLog> {
        match self.try_execute(caller, calldata, value) {
            Ok(logs) => logs,
            Err(message) => panic!("{}", message),
        }
    }

    /// Executes a state-changing call, returning the emitted logs or the
    /// revert/halt message.
    pub fn try_execute(
        &mut self,
        caller: Address,
        calldata: Vec<u8>,
        value: U256,
    ) -> Result<Vec<PrimitiveLog>, String> {
        let caller_nonce = nonce(&self.db, caller);
        let contract = self.contract;
        let result = Context::mainnet()
            .with_db(&mut self.db)
            .modify_tx_chained(|tx| {
                tx.caller = caller;
                tx.nonce = caller_nonce;
                tx.kind = TxKind::Call(contract);
                tx.data = Bytes::from(calldata);
                tx.gas_limit = GAS_LIMIT;
                tx.value = value;
            })
            .build_mainnet()
            .replay_commit()
            .expect("call transaction failed");

        match result {
            ExecutionResult::Success { logs, .. } => {
                self.block_number += 1;
                for (index, log) in logs.iter().enumerate() {
                    self.logs.push(Log {
                        inner: log.clone(),
                        block_hash: None,
                        block_number: Some(self.block_number),
                        block_timestamp: None,
                        transaction_hash: None,
                        transaction_index: None,
                        log_index: Some(index as u64),
                        removed: false,
                    });
                }
                Ok(logs)
            }
            ExecutionResult::Revert { output, .. } => {
                Err(format!("call reverted: {}", decode_revert(&output)))
            }
            ExecutionResult::Halt { reason, .. } => Err(format!("call halted: {:?}", reason)),
        }
    }

    /// Issues a read-only call without committing state.
    pub fn view(&mut self, caller: Address, calldata: Vec<u8>) -> Result<Bytes, String> {
        let caller_nonce = nonce(&self.db, caller);
        let contract = self.contract;
        let outcome = Context::mainnet()
            .with_db(&mut self.db)
            .modify_tx_chained(|tx| {
                tx.caller = caller;
                tx.nonce = caller_nonce;
                tx.kind = TxKind::Call(contract);
                tx.data = Bytes::from(calldata);
                tx.gas_limit = GAS_LIMIT;
                tx.value = U256::ZERO;
            })
            .build_mainnet()
            .replay()
            .expect("view transaction failed");

        match outcome.result {
            ExecutionResult::Success { output, .. } => match output {
                Output::Call(bytes) => Ok(bytes),
                other => Err(format!("expected Call output, got: {:?}", other)),
            },
            ExecutionResult::Revert { output, .. } => {
                Err(format!("call reverted: {}", decode_revert(&output)))
            }
            ExecutionResult::Halt { reason, .. } => Err(format!("call halted: {:?}", reason)),
        }
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.db
            .cache
            .accounts
            .get(&address)
            .map_or(U256::ZERO, |account| account.info.balance)
    }

    pub fn create_project(&mut self, founder: Address, title: &str, description: &str) {
        let calldata = createProjectCall {
            title: title.to_string(),
            description: description.to_string(),
            endTime: U256::from(END_TIME),
        }
        .abi_encode();
        self.execute(founder, calldata, U256::ZERO);
    }

    pub fn create_expense(
        &mut self,
        founder: Address,
        project_id: u64,
        allocation: U256,
        description: &str,
    ) {
        let calldata = createExpenseCall {
            projectId: U256::from(project_id),
            allocation,
            description: description.to_string(),
        }
        .abi_encode();
        self.execute(founder, calldata, U256::ZERO);
    }

    pub fn donate(
        &mut self,
        donator: Address,
        project_id: u64,
        value: U256,
    ) -> Vec<PrimitiveLog> {
        let calldata = donateCall {
            projectId: U256::from(project_id),
        }
        .abi_encode();
        self.execute(donator, calldata, value)
    }

    pub fn approve_expense(
        &mut self,
        approver: Address,
        project_id: u64,
        expense_id: u64,
    ) -> Vec<PrimitiveLog> {
        let calldata = approveExpenseCall {
            projectId: U256::from(project_id),
            expenseId: U256::from(expense_id),
        }
        .abi_encode();
        self.execute(approver, calldata, U256::ZERO)
    }

    fn matching_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainClientError> {
        // Match on the serialized form: the JSON wire encoding of a filter is
        // stable, its Rust accessors less so.
        let filter = serde_json::to_value(filter)?;
        let address = filter
            .get("address")
            .and_then(serde_json::Value::as_str)
            .map(|text| text.parse::<Address>())
            .transpose()?;
        let mut topics: Vec<Option<B256>> = Vec::new();
        if let Some(entries) = filter.get("topics").and_then(serde_json::Value::as_array) {
            for entry in entries {
                topics.push(
                    entry
                        .as_str()
                        .map(|text| text.parse::<B256>())
                        .transpose()?,
                );
            }
        }
        Ok(self
            .logs
            .iter()
            .filter(|log| {
                if address.is_some_and(|address| address != log.inner.address) {
                    return false;
                }
                let log_topics = log.inner.data.topics();
                topics.iter().enumerate().all(|(position, wanted)| {
                    wanted.is_none_or(|wanted| log_topics.get(position) == Some(&wanted))
                })
            })
            .cloned()
            .collect())
    }
}

/// Renders a revert payload, extracting the `Error(string)` reason if present.
fn decode_revert(output: &Bytes) -> String {
    // 0x08c379a0 is the selector of Error(string).
    if output.len() >= 68 && output[..4] == [0x08, 0xc3, 0x79, 0xa0] {
        if let Ok(reason) = std::str::from_utf8(&output[68..]) {
            return reason.trim_end_matches('\0').to_string();
        }
    }
    hex::encode(output)
}

/// An `EthereumQueries` implementation answering from the in-process chain,
/// so the client stack can be exercised without a node.
pub struct RevmEthereumClient {
    test: Mutex<DonationTest>,
    accounts: Vec<String>,
    deny_authorization: bool,
}

impl RevmEthereumClient {
    pub fn new(test: DonationTest) -> Self {
        let accounts = vec![
            format!("{:?}", test.main_account),
            format!("{:?}", test.another_account),
        ];
        Self {
            test: Mutex::new(test),
            accounts,
            deny_authorization: false,
        }
    }

    /// Makes `request_accounts` behave like a wallet whose user clicked
    /// "reject".
    pub fn denying_authorization(mut self) -> Self {
        self.deny_authorization = true;
        self
    }

    /// Runs `action` against the underlying chain, for test setup.
    pub fn with<R>(&self, action: impl FnOnce(&mut DonationTest) -> R) -> R {
        let mut test = self.test.lock().unwrap();
        action(&mut test)
    }
}

#[async_trait]
impl EthereumQueries for RevmEthereumClient {
    async fn get_accounts(&self) -> Result<Vec<String>, ChainClientError> {
        Ok(self.accounts.clone())
    }

    async fn request_accounts(&self) -> Result<Vec<String>, ChainClientError> {
        if self.deny_authorization {
            return Err(ChainClientError::AuthorizationDenied);
        }
        Ok(self.accounts.clone())
    }

    async fn get_block_number(&self) -> Result<u64, ChainClientError> {
        Ok(self.test.lock().unwrap().block_number)
    }

    async fn get_balance(
        &self,
        address: &str,
        _block_number: Option<u64>,
    ) -> Result<U256, ChainClientError> {
        let address = address.parse::<Address>()?;
        Ok(self.test.lock().unwrap().balance(address))
    }

    async fn call(
        &self,
        contract_address: &str,
        data: Bytes,
        from: &str,
    ) -> Result<Bytes, ChainClientError> {
        contract_address.parse::<Address>()?;
        let from = from.parse::<Address>()?;
        let mut test = self.test.lock().unwrap();
        test.view(from, data.to_vec())
            .map_err(ChainClientError::ChainUnavailable)
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainClientError> {
        self.test.lock().unwrap().matching_logs(filter)
    }
}
