// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed handle on one deployed EthDonation contract: the read-model adapter
//! over its storage getters and the listing aggregators built on top.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::eth::Filter;
use alloy_primitives::Bytes;
use alloy_sol_types::{sol, SolCall, SolEvent};
use tracing::debug;

use crate::{
    client::EthereumQueries,
    common::{ChainClientError, Donation, DonationEvent, Expense, ExpenseState, Project},
    config::DonationClientConfig,
    units::format_ether,
};

sol! {
    function owner() external view returns (address holder);
    function projectCount() external view returns (uint256 count);
    function projects(uint256 projectId) external view returns (
        address founder,
        string title,
        string description,
        uint256 endTime,
        uint256 amountFunded,
        uint256 amountAllocated,
        uint256 expenseCount
    );
    function getExpenseCount(uint256 projectId) external view returns (uint256 count);
    function getExpense(uint256 projectId, uint256 expenseId) external view returns (
        string description,
        uint256 allocation,
        uint256 amountApproved,
        uint256 state
    );
    function getDonation(uint256 projectId, address donator) external view returns (
        uint256 total,
        uint256 available
    );

    event LogProjectCreated(uint256 indexed projectId, address indexed founder);
    event LogExpenseCreated(uint256 indexed projectId, uint256 expenseId);
    event LogDonationMade(uint256 indexed projectId, address indexed donator, uint256 amount);
    event LogExpenseApproved(uint256 indexed projectId, uint256 expenseId, address approver, uint256 amount);
    event LogExpenseAllocated(uint256 indexed projectId, uint256 expenseId, address indexed founder, uint256 amount);
}

/// A handle on one deployed EthDonation contract.
///
/// Holds no state beyond the binding itself; every read re-queries the chain
/// through the wrapped client.
pub struct DonationContract<Q> {
    client: Q,
    contract_address: String,
    caller: String,
}

impl<Q: EthereumQueries> DonationContract<Q> {
    /// Binds `client` to the deployment described by `config`.
    ///
    /// Both addresses are validated up front so later reads cannot fail on
    /// them.
    pub fn new(client: Q, config: &DonationClientConfig) -> Result<Self, ChainClientError> {
        config.contract_address.parse::<Address>()?;
        let caller = match &config.caller {
            None => format!("{:?}", Address::ZERO),
            Some(caller) => {
                caller.parse::<Address>()?;
                caller.clone()
            }
        };
        Ok(Self {
            client,
            contract_address: config.contract_address.clone(),
            caller,
        })
    }

    pub fn client(&self) -> &Q {
        &self.client
    }

    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    /// Issues one read-only call and decodes its return values.
    async fn view<C: SolCall + Send>(&self, call: C) -> Result<C::Return, ChainClientError> {
        let data: Bytes = call.abi_encode().into();
        let answer = self
            .client
            .call(&self.contract_address, data, &self.caller)
            .await?;
        Ok(C::abi_decode_returns(&answer)?)
    }

    /// Returns the contract owner.
    pub async fn owner(&self) -> Result<String, ChainClientError> {
        let holder = self.view(ownerCall {}).await?;
        Ok(format!("{holder:?}"))
    }

    /// Returns the number of projects ever created.
    pub async fn project_count(&self) -> Result<u64, ChainClientError> {
        let count = self.view(projectCountCall {}).await?;
        u256_to_u64(count)
    }

    /// Reads one project by its 1-based index, failing fast when the index is
    /// out of range instead of passing through a zeroed record.
    pub async fn get_project(&self, index: u64) -> Result<Project, ChainClientError> {
        let count = self.project_count().await?;
        check_project_index(index, count)?;
        self.read_project(index).await
    }

    /// Lists every project in creation order.
    ///
    /// Project storage is 1-based and `projectCount` is the index of the last
    /// project, so the scan is `1..=count`, one sequential read per project.
    pub async fn get_projects(&self) -> Result<Vec<Project>, ChainClientError> {
        let count = self.project_count().await?;
        debug!(count, "listing projects");
        let mut projects = Vec::with_capacity(count as usize);
        for index in 1..=count {
            projects.push(self.read_project(index).await?);
        }
        Ok(projects)
    }

    async fn read_project(&self, index: u64) -> Result<Project, ChainClientError> {
        let record = self
            .view(projectsCall {
                projectId: U256::from(index),
            })
            .await?;
        let amount_left = record
            .amountFunded
            .checked_sub(record.amountAllocated)
            .ok_or(ChainClientError::NumericOverflow)?;
        Ok(Project {
            index,
            founder: format!("{:?}", record.founder),
            title: record.title,
            description: record.description,
            end_time: u256_to_u64(record.endTime)?,
            amount_funded: format_ether(record.amountFunded),
            amount_left: format_ether(amount_left),
            expense_count: u256_to_u64(record.expenseCount)?,
        })
    }

    /// Returns the number of expenses filed for a project.
    pub async fn expense_count(&self, project_id: u64) -> Result<u64, ChainClientError> {
        let count = self.project_count().await?;
        check_project_index(project_id, count)?;
        let count = self
            .view(getExpenseCountCall {
                projectId: U256::from(project_id),
            })
            .await?;
        u256_to_u64(count)
    }

    /// Lists the expenses of a project in creation order, one sequential read
    /// per expense.
    pub async fn get_project_expenses(
        &self,
        project_id: u64,
    ) -> Result<Vec<Expense>, ChainClientError> {
        let expense_count = self.expense_count(project_id).await?;
        debug!(project_id, expense_count, "listing expenses");
        let mut expenses = Vec::with_capacity(expense_count as usize);
        for index in 1..=expense_count {
            expenses.push(self.read_expense(project_id, index).await?);
        }
        Ok(expenses)
    }

    /// Reads one expense by its 1-based index within a project.
    pub async fn get_expense(
        &self,
        project_id: u64,
        index: u64,
    ) -> Result<Expense, ChainClientError> {
        let count = self.expense_count(project_id).await?;
        if index == 0 || index > count {
            return Err(ChainClientError::ExpenseNotFound {
                project_id,
                index,
                count,
            });
        }
        self.read_expense(project_id, index).await
    }

    async fn read_expense(&self, project_id: u64, index: u64) -> Result<Expense, ChainClientError> {
        let record = self
            .view(getExpenseCall {
                projectId: U256::from(project_id),
                expenseId: U256::from(index),
            })
            .await?;
        Ok(Expense {
            index,
            description: record.description,
            allocation: format_ether(record.allocation),
            approved_amount: format_ether(record.amountApproved),
            state: ExpenseState::from_code(u256_to_u64(record.state)?)?,
        })
    }

    /// Listing the donation book needs an enumeration the contract does not
    /// provide; it stores donations in a per-donator mapping. Callers can
    /// distinguish this from an empty list. See [`Self::donation_history`]
    /// for the event-log alternative.
    pub async fn get_project_donations(
        &self,
        _project_id: u64,
    ) -> Result<Vec<Donation>, ChainClientError> {
        Err(ChainClientError::NotImplemented("project donation listing"))
    }

    /// Reads the donation book entry of one donator for a project.
    pub async fn get_donation(
        &self,
        project_id: u64,
        donator: &str,
    ) -> Result<Donation, ChainClientError> {
        let count = self.project_count().await?;
        check_project_index(project_id, count)?;
        let donator = donator.parse::<Address>()?;
        let record = self
            .view(getDonationCall {
                projectId: U256::from(project_id),
                donator,
            })
            .await?;
        Ok(Donation {
            donator: format!("{donator:?}"),
            total: format_ether(record.total),
            available: format_ether(record.available),
        })
    }

    /// Replays the donation notifications of a project from the event log, in
    /// chain order.
    pub async fn donation_history(
        &self,
        project_id: u64,
    ) -> Result<Vec<DonationEvent>, ChainClientError> {
        let count = self.project_count().await?;
        check_project_index(project_id, count)?;
        let filter = Filter::new()
            .address(self.contract_address.parse::<Address>()?)
            .event_signature(LogDonationMade::SIGNATURE_HASH)
            .topic1(B256::from(U256::from(project_id)))
            .from_block(0u64);
        let logs = self.client.get_logs(&filter).await?;
        let mut history = Vec::with_capacity(logs.len());
        for log in logs {
            let event = LogDonationMade::decode_log(&log.inner)?;
            history.push(DonationEvent {
                donator: format!("{:?}", event.data.donator),
                amount: format_ether(event.data.amount),
                block_number: log.block_number.unwrap_or_default(),
            });
        }
        Ok(history)
    }
}

fn check_project_index(index: u64, count: u64) -> Result<(), ChainClientError> {
    if index == 0 || index > count {
        return Err(ChainClientError::ProjectNotFound { index, count });
    }
    Ok(())
}

fn u256_to_u64(value: U256) -> Result<u64, ChainClientError> {
    u64::try_from(value).map_err(|_| ChainClientError::NumericOverflow)
}
