// src/instructions/approve.rs
// ERC-20 allowance for the lock contract ahead of token operations

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use anchor_lang::prelude::*;

use crate::{
    abi::{self, IERC20},
    chain::{CallRequest, PublicClient, WalletSession},
    errors::{self, VaultError},
    instructions::{TxContext, TxStage},
};

/// Allowance request sent from the connected account
pub struct Approve {
    pub token: Address,
    pub spender: Address, // Lock contract
    pub amount: U256,     // Base units
}

impl Approve {
    /// Sends `approve` and waits for it to be mined.
    ///
    /// A wallet dismissal stays `UserRejected`; every other failure, including a reverted
    /// receipt, is `ApprovalFailed`.
    pub fn approve(
        &self,
        ctx: &mut TxContext<'_>,
        session: &WalletSession<'_>,
        public: &dyn PublicClient,
    ) -> Result<()> {
        ctx.flow.advance(TxStage::Approving)?;
        msg!("Approving {} of {} for {}", self.amount, self.token, self.spender);

        let data = IERC20::approveCall {
            spender: self.spender,
            amount: self.amount,
        }
        .abi_encode();
        let call = CallRequest {
            from: session.address,
            to: self.token,
            data: Bytes::from(data),
            value: U256::ZERO,
        };

        let hash = session
            .wallet
            .send_transaction(&call)
            .map_err(|e| approval_error(abi::classify(&e)))?;
        let receipt = public
            .wait_for_receipt(hash)
            .map_err(|e| approval_error(abi::classify(&e)))?;
        require!(receipt.success, VaultError::ApprovalFailed);
        Ok(())
    }
}

fn approval_error(err: anchor_lang::error::Error) -> anchor_lang::error::Error {
    if errors::is(&err, VaultError::UserRejected) {
        return err;
    }
    errors::with_message(
        VaultError::ApprovalFailed,
        format!("Token approval failed: {}", errors::user_message(&err)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_not_rewrapped() {
        let err = approval_error(error!(VaultError::UserRejected));
        assert!(errors::is(&err, VaultError::UserRejected));

        let err = approval_error(errors::network("timeout"));
        assert!(errors::is(&err, VaultError::ApprovalFailed));
        assert!(errors::user_message(&err).contains("timeout"));
    }
}
