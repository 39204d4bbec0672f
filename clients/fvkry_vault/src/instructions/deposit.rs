// src/instructions/deposit.rs
// Add funds to an existing vault

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use anchor_lang::prelude::*;

use crate::{
    abi::ILockAsset,
    instructions::{lock_call, Approve, TxContext, TxOutcome, TxStage},
    state::{Asset, Vault},
    validation::validate_add,
};

/// Arguments of an add-to-lock operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddToVault {
    pub vault: Vault,
    pub amount: String, // Human units of the vault's asset
}

impl AddToVault {
    pub fn deposit(&self, ctx: &mut TxContext<'_>) -> Result<TxOutcome> {
        ctx.flow.advance(TxStage::Validating)?;
        let amount = validate_add(&self.vault, &self.amount, ctx.now)?;

        let (session, chain) = ctx.connect()?;
        let public = ctx.resolver.public_client()?;

        let call = match self.vault.asset {
            Asset::Token(token) => {
                Approve {
                    token,
                    spender: chain.lock_asset_address,
                    amount,
                }
                .approve(ctx, &session, public.as_ref())?;
                let data = ILockAsset::depositTokenCall {
                    owner: self.vault.owner,
                    vaultId: U256::from(self.vault.id),
                    amount,
                    pool: chain.pool_address,
                    dataProvider: chain.data_provider_address,
                }
                .abi_encode();
                lock_call(&session, &chain, data, U256::ZERO)
            }
            Asset::Native => {
                let data = ILockAsset::addToLockedETHCall {
                    vaultId: U256::from(self.vault.id),
                }
                .abi_encode();
                lock_call(&session, &chain, data, amount)
            }
        };

        ctx.submit(&session, public.as_ref(), call)
    }
}

pub fn handler(ctx: &mut TxContext<'_>, args: &AddToVault) -> Result<TxOutcome> {
    let result = args.deposit(ctx);
    ctx.settle(result)
}
