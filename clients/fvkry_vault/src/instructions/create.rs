// src/instructions/create.rs
// Create a new fixed, goal or schedule vault

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use anchor_lang::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    abi::ILockAsset,
    backend::LockRecord,
    instructions::{lock_call, Approve, TxContext, TxOutcome, TxStage},
    state::{NATIVE_DECIMALS, NATIVE_SYMBOL},
    units::to_base_units,
    validation::{validate_form, AssetClass, LockForm, LockTerms, ValidatedLock},
};

/// Arguments of a create operation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVault {
    pub form: LockForm,
    pub slippage: u64, // Accepted slippage for the pool deposit, basis points
}

impl CreateVault {
    pub fn asset_class(&self) -> AssetClass {
        if self.form.symbol.trim().eq_ignore_ascii_case(NATIVE_SYMBOL) {
            AssetClass::Native
        } else {
            AssetClass::Token
        }
    }

    pub fn create(&self, ctx: &mut TxContext<'_>) -> Result<TxOutcome> {
        ctx.flow.advance(TxStage::Validating)?;
        let class = self.asset_class();
        // Local checks first; token precision is rechecked once decimals are known
        validate_form(&self.form, class, NATIVE_DECIMALS)?;

        let (session, chain) = ctx.connect()?;
        let (token, decimals) = match class {
            AssetClass::Native => (None, NATIVE_DECIMALS),
            AssetClass::Token => {
                let info = ctx.backend.token_data(self.form.symbol.trim(), session.chain.id)?;
                (Some(info.address), info.decimals)
            }
        };
        let lock = validate_form(&self.form, class, decimals)?;
        let terms = ContractTerms::from_lock(&lock, decimals)?;
        let amount = to_base_units(&lock.amount, decimals)?;
        let public = ctx.resolver.public_client()?;

        let call = match token {
            Some(token) => {
                Approve {
                    token,
                    spender: chain.lock_asset_address,
                    amount,
                }
                .approve(ctx, &session, public.as_ref())?;
                let data = ILockAsset::createTokenVaultCall {
                    token,
                    title: lock.title.clone(),
                    amount,
                    lockPeriod: U256::from(lock.lock_days),
                    vaultType: lock.terms.kind().as_str().to_string(),
                    slippage: U256::from(self.slippage),
                    unlockDuration: terms.every_days,
                    unlockAmount: terms.unlock_amount,
                    unlockGoal: terms.goal,
                    pool: chain.pool_address,
                    dataProvider: chain.data_provider_address,
                }
                .abi_encode();
                lock_call(&session, &chain, data, U256::ZERO)
            }
            None => {
                let data = ILockAsset::lockETHCall {
                    title: lock.title.clone(),
                    lockPeriod: U256::from(lock.lock_days),
                    vaultType: lock.terms.kind().as_str().to_string(),
                    unlockDuration: terms.every_days,
                    unlockAmount: terms.unlock_amount,
                    unlockGoal: terms.goal,
                }
                .abi_encode();
                lock_call(&session, &chain, data, amount)
            }
        };

        let outcome = ctx.submit(&session, public.as_ref(), call)?;

        let record = LockRecord {
            title: lock.title.clone(),
            amount: lock.amount.clone(),
            symbol: lock.symbol.clone(),
            duration: lock.lock_days.to_string(),
            duration_type: lock.duration_unit.as_str().to_string(),
            lock_type: lock.terms.kind().as_str().to_string(),
            asset_type: match class {
                AssetClass::Native => "native".to_string(),
                AssetClass::Token => "token".to_string(),
            },
            goal: match &lock.terms {
                LockTerms::Goal { goal_usd } => goal_usd.to_string(),
                _ => String::new(),
            },
            token: token.unwrap_or_default(),
            decimals,
            chain_id: session.chain.id.to_string(),
        };
        // The lock is already on chain; a failed write only delays the backend view
        if let Err(e) = ctx.backend.record_lock(session.address, &record) {
            msg!("create_vault: lock record not stored: {}", e);
        }
        Ok(outcome)
    }
}

/// Kind specific arguments as the contract expects them, zero when unused.
/// The unlock amount is in base units, the goal in whole dollars.
struct ContractTerms {
    every_days: U256,
    unlock_amount: U256,
    goal: U256,
}

impl ContractTerms {
    fn from_lock(lock: &ValidatedLock, decimals: u8) -> Result<Self> {
        Ok(match &lock.terms {
            LockTerms::Fixed => Self {
                every_days: U256::ZERO,
                unlock_amount: U256::ZERO,
                goal: U256::ZERO,
            },
            LockTerms::Goal { goal_usd } => Self {
                every_days: U256::ZERO,
                unlock_amount: U256::ZERO,
                goal: *goal_usd,
            },
            LockTerms::Schedule {
                every_days,
                unlock_amount,
            } => Self {
                every_days: U256::from(*every_days),
                unlock_amount: to_base_units(unlock_amount, decimals)?,
                goal: U256::ZERO,
            },
        })
    }
}

pub fn handler(ctx: &mut TxContext<'_>, args: &CreateVault) -> Result<TxOutcome> {
    let result = args.create(ctx);
    ctx.settle(result)
}
