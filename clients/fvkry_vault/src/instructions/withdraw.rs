// src/instructions/withdraw.rs
// Withdraw unlocked funds from a vault

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use anchor_lang::prelude::*;

use crate::{
    abi::ILockAsset,
    instructions::{lock_call, TxContext, TxOutcome, TxStage},
    state::{Vault, VaultKind},
    validation::validate_withdraw,
};

/// Arguments of a withdrawal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Withdraw {
    pub vault: Vault,
    pub amount: String, // Human units of the vault's asset
}

impl Withdraw {
    pub fn withdraw(&self, ctx: &mut TxContext<'_>) -> Result<TxOutcome> {
        ctx.flow.advance(TxStage::Validating)?;
        let amount = validate_withdraw(&self.vault, &self.amount, ctx.now)?;

        let (session, chain) = ctx.connect()?;
        let public = ctx.resolver.public_client()?;

        let data = ILockAsset::withdrawCall {
            vaultId: U256::from(self.vault.id),
            amount,
            pool: chain.pool_address,
            goal: self.vault.kind() == VaultKind::Goal,
        }
        .abi_encode();

        let call = lock_call(&session, &chain, data, U256::ZERO);
        ctx.submit(&session, public.as_ref(), call)
    }
}

pub fn handler(ctx: &mut TxContext<'_>, args: &Withdraw) -> Result<TxOutcome> {
    let result = args.withdraw(ctx);
    ctx.settle(result)
}
