// src/instructions/mod.rs
// Transaction flow shared by every vault operation

pub mod approve;
pub mod close;
pub mod create;
pub mod deposit;
pub mod withdraw;

pub use approve::Approve;
pub use close::DeleteVault;
pub use create::CreateVault;
pub use deposit::AddToVault;
pub use withdraw::Withdraw;

use std::fmt;

use alloy_primitives::{Bytes, B256, U256};
use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use serde::Serialize;

use crate::{
    abi,
    backend::VaultBackend,
    chain::{CallRequest, ChainResolver, PublicClient, Receipt, WalletSession},
    errors::{self, VaultError},
    state::ChainInfo,
};

/// Where an operation is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TxStage {
    Idle,
    Validating,
    Approving,
    Simulating,
    AwaitingSignature,
    Submitted,
    Confirmed,
    Failed,
}

impl TxStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStage::Confirmed | TxStage::Failed)
    }

    /// Legal moves; approval may be skipped, nothing else can be
    pub fn can_advance_to(&self, next: TxStage) -> bool {
        use TxStage::*;
        match (*self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Validating)
            | (Validating, Approving)
            | (Validating, Simulating)
            | (Approving, Simulating)
            | (Simulating, AwaitingSignature)
            | (AwaitingSignature, Submitted)
            | (Submitted, Confirmed) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Operation {
    CreateVault,
    AddToVault,
    Withdraw,
    DeleteVault,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::CreateVault => "create_vault",
            Operation::AddToVault => "add_to_vault",
            Operation::Withdraw => "withdraw",
            Operation::DeleteVault => "delete_vault",
        })
    }
}

/// State machine of a single operation, with the stages it went through
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxFlow {
    operation: Operation,
    stage: TxStage,
    history: Vec<TxStage>,
}

impl TxFlow {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            stage: TxStage::Idle,
            history: vec![TxStage::Idle],
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn stage(&self) -> TxStage {
        self.stage
    }

    pub fn history(&self) -> &[TxStage] {
        &self.history
    }

    pub fn advance(&mut self, next: TxStage) -> Result<()> {
        require!(self.stage.can_advance_to(next), VaultError::InvalidTransition);
        msg!("{}: {:?} -> {:?}", self.operation, self.stage, next);
        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    /// Moves to `Failed` unless already terminal and hands the error back
    pub fn fail(&mut self, err: Error) -> Error {
        if !self.stage.is_terminal() {
            msg!("{}: {:?} -> Failed: {}", self.operation, self.stage, errors::user_message(&err));
            self.stage = TxStage::Failed;
            self.history.push(TxStage::Failed);
        }
        err
    }
}

/// A confirmed operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: B256,
    pub receipt: Receipt,
    pub stages: Vec<TxStage>,
    pub explorer_url: Option<String>,
}

/// Everything an operation handler runs against
pub struct TxContext<'a> {
    pub resolver: &'a ChainResolver,
    pub backend: &'a dyn VaultBackend,
    pub flow: TxFlow,
    pub now: i64,
}

impl<'a> TxContext<'a> {
    pub fn new(
        resolver: &'a ChainResolver,
        backend: &'a dyn VaultBackend,
        operation: Operation,
        now: i64,
    ) -> Self {
        Self {
            resolver,
            backend,
            flow: TxFlow::new(operation),
            now,
        }
    }

    /// Connected account, its chain and the lock contract addresses there
    pub fn connect(&self) -> Result<(WalletSession<'a>, ChainInfo)> {
        let resolver: &'a ChainResolver = self.resolver;
        let session = resolver.wallet_client()?;
        let chain = self.backend.chain_data(session.chain.id)?;
        Ok((session, chain))
    }

    /// Records the result on the flow, failing it on error
    pub fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.flow.fail(e))
    }

    /// Simulates, signs, sends and confirms `call`
    pub fn submit(
        &mut self,
        session: &WalletSession<'_>,
        public: &dyn PublicClient,
        call: CallRequest,
    ) -> Result<TxOutcome> {
        self.flow.advance(TxStage::Simulating)?;
        public.call(&call).map_err(|e| abi::classify(&e))?;

        self.flow.advance(TxStage::AwaitingSignature)?;
        let hash = session
            .wallet
            .send_transaction(&call)
            .map_err(|e| abi::classify(&e))?;

        self.flow.advance(TxStage::Submitted)?;
        msg!("{}: submitted {}", self.flow.operation(), hash);
        let receipt = public
            .wait_for_receipt(hash)
            .map_err(|e| abi::classify(&e))?;
        require!(receipt.success, VaultError::TransactionReverted);

        self.flow.advance(TxStage::Confirmed)?;
        Ok(TxOutcome {
            hash,
            receipt,
            stages: self.flow.history().to_vec(),
            explorer_url: self.resolver.explorer_tx_url(hash).ok(),
        })
    }
}

/// Call to the lock contract from the session's account
pub fn lock_call(session: &WalletSession<'_>, chain: &ChainInfo, data: Vec<u8>, value: U256) -> CallRequest {
    CallRequest {
        from: session.address,
        to: chain.lock_asset_address,
        data: Bytes::from(data),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        let mut flow = TxFlow::new(Operation::Withdraw);
        for stage in [
            TxStage::Validating,
            TxStage::Simulating,
            TxStage::AwaitingSignature,
            TxStage::Submitted,
            TxStage::Confirmed,
        ] {
            flow.advance(stage).unwrap();
        }
        assert_eq!(flow.history().len(), 6);
        assert_eq!(flow.stage(), TxStage::Confirmed);
    }

    #[test]
    fn skipping_or_reversing_is_rejected() {
        let mut flow = TxFlow::new(Operation::CreateVault);
        let err = flow.advance(TxStage::Simulating).unwrap_err();
        assert!(errors::is(&err, VaultError::InvalidTransition));

        flow.advance(TxStage::Validating).unwrap();
        flow.advance(TxStage::Approving).unwrap();
        assert!(flow.advance(TxStage::Validating).is_err());
        assert!(flow.advance(TxStage::Submitted).is_err());
        assert_eq!(flow.stage(), TxStage::Approving);
    }

    #[test]
    fn terminal_stages_stay_put() {
        let mut flow = TxFlow::new(Operation::DeleteVault);
        flow.advance(TxStage::Validating).unwrap();
        flow.fail(error!(VaultError::NoWallet));
        assert_eq!(flow.stage(), TxStage::Failed);
        assert!(flow.advance(TxStage::Simulating).is_err());

        flow.fail(error!(VaultError::Unknown));
        assert_eq!(
            flow.history(),
            &[TxStage::Idle, TxStage::Validating, TxStage::Failed]
        );
        assert!(!TxStage::Confirmed.can_advance_to(TxStage::Failed));
    }
}
