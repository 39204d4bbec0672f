// src/instructions/close.rs
// Delete an emptied vault

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use anchor_lang::prelude::*;

use crate::{
    abi::ILockAsset,
    instructions::{lock_call, TxContext, TxOutcome, TxStage},
    state::Vault,
    validation::ensure_deletable,
};

/// Arguments of a delete operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteVault {
    pub vault: Vault,
    /// Skip the local gate and let the contract decide
    pub force: bool,
}

impl DeleteVault {
    pub fn close(&self, ctx: &mut TxContext<'_>) -> Result<TxOutcome> {
        ctx.flow.advance(TxStage::Validating)?;
        if self.force {
            msg!("delete_vault: local gate skipped for vault {}", self.vault.id);
        } else {
            ensure_deletable(&self.vault, ctx.now)?;
        }

        let (session, chain) = ctx.connect()?;
        let public = ctx.resolver.public_client()?;

        let data = ILockAsset::deleteVaultCall {
            vaultId: U256::from(self.vault.id),
        }
        .abi_encode();

        let call = lock_call(&session, &chain, data, U256::ZERO);
        ctx.submit(&session, public.as_ref(), call)
    }
}

pub fn handler(ctx: &mut TxContext<'_>, args: &DeleteVault) -> Result<TxOutcome> {
    let result = args.close(ctx);
    ctx.settle(result)
}
