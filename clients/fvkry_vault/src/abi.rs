// src/abi.rs
// Contract bindings and structured decoding of reverts and wallet errors

use alloy_sol_types::{sol, Panic, Revert, SolError, SolInterface};
use anchor_lang::error::Error;
use anchor_lang::prelude::error;

use crate::{
    chain::ProviderError,
    errors::{self, VaultError},
};

sol! {
    /// Lock contract surface used by the client
    interface ILockAsset {
        function createTokenVault(
            address token,
            string title,
            uint256 amount,
            uint256 lockPeriod,
            string vaultType,
            uint256 slippage,
            uint256 unlockDuration,
            uint256 unlockAmount,
            uint256 unlockGoal,
            address pool,
            address dataProvider
        ) external;
        function depositToken(
            address owner,
            uint256 vaultId,
            uint256 amount,
            address pool,
            address dataProvider
        ) external;
        function lockETH(
            string title,
            uint256 lockPeriod,
            string vaultType,
            uint256 unlockDuration,
            uint256 unlockAmount,
            uint256 unlockGoal
        ) external payable;
        function addToLockedETH(uint256 vaultId) external payable;
        function withdraw(uint256 vaultId, uint256 amount, address pool, bool goal) external;
        function deleteVault(uint256 vaultId) external;

        error CapacityExceeded();
        error NonPositiveAmount();
        error InvalidAssetId();
        error LockNotExpired();
        error InsufficientBalance();
        error TokenBlacklisted();
        error InvalidTokenAddress();
        error VaultNotFullyWithdrawn();
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);

        error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
        error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
    }
}

/// EIP-1193 user rejected request
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1474 execution reverted, revert data attached
pub const EXECUTION_REVERTED_CODE: i64 = 3;
/// Generic server error geth uses for txpool rejections
pub const SERVER_ERROR_CODE: i64 = -32000;
const INSUFFICIENT_FUNDS_PREFIX: &str = "insufficient funds";

/// `Error(string)` reasons the lock contract and tokens revert with
const KNOWN_REASONS: &[(&str, VaultError)] = &[
    ("Vault capacity exceeded", VaultError::CapacityExceeded),
    ("Amount must be greater than 0", VaultError::NonPositiveAmount),
    ("Invalid asset ID", VaultError::InvalidAssetId),
    ("Lock period not expired", VaultError::LockNotExpired),
    ("Insufficient balance", VaultError::InsufficientBalance),
    ("Token is blacklisted", VaultError::TokenBlacklisted),
    ("Invalid token address", VaultError::InvalidTokenAddress),
    ("Vault not fully withdrawn", VaultError::VaultNotFullyWithdrawn),
    ("ERC20: transfer amount exceeds balance", VaultError::InsufficientBalance),
    ("ERC20: insufficient allowance", VaultError::ApprovalFailed),
];

fn lock_error(err: &ILockAsset::ILockAssetErrors) -> VaultError {
    use ILockAsset::ILockAssetErrors as E;
    match err {
        E::CapacityExceeded(_) => VaultError::CapacityExceeded,
        E::NonPositiveAmount(_) => VaultError::NonPositiveAmount,
        E::InvalidAssetId(_) => VaultError::InvalidAssetId,
        E::LockNotExpired(_) => VaultError::LockNotExpired,
        E::InsufficientBalance(_) => VaultError::InsufficientBalance,
        E::TokenBlacklisted(_) => VaultError::TokenBlacklisted,
        E::InvalidTokenAddress(_) => VaultError::InvalidTokenAddress,
        E::VaultNotFullyWithdrawn(_) => VaultError::VaultNotFullyWithdrawn,
    }
}

fn token_error(err: &IERC20::IERC20Errors) -> VaultError {
    match err {
        IERC20::IERC20Errors::ERC20InsufficientBalance(_) => VaultError::InsufficientBalance,
        IERC20::IERC20Errors::ERC20InsufficientAllowance(_) => VaultError::ApprovalFailed,
    }
}

/// Maps raw revert data to a client error by selector, never by substring
pub fn decode_revert(data: &[u8]) -> Error {
    if let Ok(e) = ILockAsset::ILockAssetErrors::abi_decode(data, true) {
        return error!(lock_error(&e));
    }
    if let Ok(e) = IERC20::IERC20Errors::abi_decode(data, true) {
        return error!(token_error(&e));
    }
    if let Ok(revert) = Revert::abi_decode(data, true) {
        return match KNOWN_REASONS.iter().find(|(r, _)| *r == revert.reason) {
            Some(&(_, code)) => error!(code),
            None => errors::unknown(format!("execution reverted: {}", revert.reason)),
        };
    }
    if let Ok(panic) = Panic::abi_decode(data, true) {
        return errors::unknown(format!("contract panicked with code {}", panic.code));
    }
    if data.is_empty() {
        return errors::unknown("execution reverted without a reason");
    }
    errors::unknown(format!(
        "execution reverted: 0x{}",
        alloy_primitives::hex::encode(data)
    ))
}

/// Maps a wallet or RPC failure onto the client taxonomy
pub fn classify(err: &ProviderError) -> Error {
    match err {
        ProviderError::Transport(cause) => errors::network(cause),
        ProviderError::Rpc { code, message, data } => {
            if *code == USER_REJECTED_CODE {
                return error!(VaultError::UserRejected);
            }
            if let Some(data) = data {
                return decode_revert(data);
            }
            if *code == EXECUTION_REVERTED_CODE {
                return decode_revert(&[]);
            }
            if *code == SERVER_ERROR_CODE
                && message.to_ascii_lowercase().starts_with(INSUFFICIENT_FUNDS_PREFIX)
            {
                return error!(VaultError::InsufficientFunds);
            }
            errors::unknown(message.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};

    fn rpc(code: i64, message: &str, data: Option<Vec<u8>>) -> ProviderError {
        ProviderError::Rpc {
            code,
            message: message.to_string(),
            data: data.map(Bytes::from),
        }
    }

    #[test]
    fn custom_errors_decode_by_selector() {
        let data = ILockAsset::VaultNotFullyWithdrawn {}.abi_encode();
        assert!(errors::is(&decode_revert(&data), VaultError::VaultNotFullyWithdrawn));

        let data = ILockAsset::CapacityExceeded {}.abi_encode();
        assert!(errors::is(&decode_revert(&data), VaultError::CapacityExceeded));

        let data = IERC20::ERC20InsufficientBalance {
            sender: Address::ZERO,
            balance: U256::from(1),
            needed: U256::from(2),
        }
        .abi_encode();
        assert!(errors::is(&decode_revert(&data), VaultError::InsufficientBalance));
    }

    #[test]
    fn reason_strings_match_exactly() {
        let known = Revert {
            reason: "Lock period not expired".to_string(),
        }
        .abi_encode();
        assert!(errors::is(&decode_revert(&known), VaultError::LockNotExpired));

        // A reason merely containing a known phrase is not that error
        let near = Revert {
            reason: "Lock period not expired yet, try later".to_string(),
        }
        .abi_encode();
        let err = decode_revert(&near);
        assert!(errors::is(&err, VaultError::Unknown));
        assert!(errors::user_message(&err).contains("try later"));
    }

    #[test]
    fn unknown_selector_keeps_raw_data() {
        let err = decode_revert(&[0xde, 0xad, 0xbe, 0xef]);
        assert!(errors::is(&err, VaultError::Unknown));
        assert_eq!(errors::user_message(&err), "execution reverted: 0xdeadbeef");
    }

    #[test]
    fn wallet_errors_are_classified() {
        assert!(errors::is(
            &classify(&rpc(4001, "User denied transaction signature", None)),
            VaultError::UserRejected
        ));
        assert!(errors::is(
            &classify(&rpc(
                -32000,
                "insufficient funds for gas * price + value",
                None
            )),
            VaultError::InsufficientFunds
        ));
        let reverted = rpc(
            3,
            "execution reverted",
            Some(ILockAsset::InvalidAssetId {}.abi_encode()),
        );
        assert!(errors::is(&classify(&reverted), VaultError::InvalidAssetId));
        assert!(errors::is(
            &classify(&ProviderError::Transport("connection refused".into())),
            VaultError::Network
        ));
        let other = classify(&rpc(-32602, "invalid params", None));
        assert!(errors::is(&other, VaultError::Unknown));
        assert_eq!(errors::user_message(&other), "invalid params");
    }
}
