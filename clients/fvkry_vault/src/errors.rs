// src/errors.rs
// Error taxonomy for the vault client

use anchor_lang::error::{AnchorError, Error};
use anchor_lang::prelude::*;

/// Every failure the client can report, with the message shown to the user
#[error_code]
pub enum VaultError {
    // Input validation, never reaches the network
    #[msg("Amount must be a number")]
    InvalidAmount,
    #[msg("Amount must be greater than 0")]
    NonPositiveAmount,
    #[msg("Amount is below the minimum for this asset")]
    AmountBelowMinimum,
    #[msg("Amount has more decimal places than the asset supports")]
    ExcessPrecision,
    #[msg("Amount is too large")]
    AmountOverflow,
    #[msg("Lock period must be a whole number greater than 0")]
    InvalidLockPeriod,
    #[msg("Lock period exceeds the maximum for this duration unit")]
    LockPeriodTooLong,
    #[msg("Title is required")]
    EmptyTitle,
    #[msg("Title cannot exceed 5 words")]
    TitleTooLong,
    #[msg("Goal based locks need a goal greater than 0")]
    InvalidGoal,
    #[msg("Scheduled locks need an unlock amount and an unlock interval greater than 0")]
    InvalidUnlockSchedule,
    #[msg("Unlock schedule releases too little or more than the locked amount")]
    InfeasibleSchedule,
    #[msg("Vault has nothing left to withdraw")]
    NothingToWithdraw,
    #[msg("Amount exceeds the vault balance")]
    ExceedsVaultBalance,
    #[msg("Amount exceeds what the unlock schedule has released so far")]
    ExceedsUnlockedAmount,
    #[msg("Lock period has ended, funds can no longer be added")]
    LockExpired,
    #[msg("Vault record from the backend is inconsistent")]
    InvalidVaultRecord,
    #[msg("Unknown vault type")]
    UnknownVaultKind,
    #[msg("Unknown duration unit")]
    UnknownDurationUnit,

    // Chain and wallet
    #[msg("Connected network is not supported")]
    UnsupportedChain,
    #[msg("Please install or connect a web3 wallet")]
    NoWallet,
    #[msg("Token approval failed")]
    ApprovalFailed,

    // Contract reverts
    #[msg("Vault capacity exceeded")]
    CapacityExceeded,
    #[msg("Invalid asset id")]
    InvalidAssetId,
    #[msg("Lock period has not expired yet")]
    LockNotExpired,
    #[msg("Insufficient balance")]
    InsufficientBalance,
    #[msg("Token is blacklisted")]
    TokenBlacklisted,
    #[msg("Invalid token address")]
    InvalidTokenAddress,
    #[msg("Vault must be fully withdrawn before it can be deleted")]
    VaultNotFullyWithdrawn,

    // Signing and submission
    #[msg("Transaction was rejected in the wallet")]
    UserRejected,
    #[msg("Insufficient funds to cover the transaction and gas")]
    InsufficientFunds,
    #[msg("Transaction reverted on chain")]
    TransactionReverted,
    #[msg("Network request failed")]
    Network,

    // Client internals
    #[msg("Required configuration is missing")]
    MissingConfig,
    #[msg("Invalid transaction stage transition")]
    InvalidTransition,
    #[msg("Something went wrong")]
    Unknown,
}

/// Builds an error for `code` that carries a runtime message instead of the static one
pub fn with_message(code: VaultError, message: impl Into<String>) -> Error {
    Error::from(AnchorError {
        error_name: code.name(),
        error_code_number: code.into(),
        error_msg: message.into(),
        error_origin: None,
        compared_values: None,
    })
}

pub fn network(cause: impl std::fmt::Display) -> Error {
    with_message(VaultError::Network, format!("Network request failed: {cause}"))
}

pub fn unknown(message: impl Into<String>) -> Error {
    with_message(VaultError::Unknown, message)
}

/// Numeric code of a client error, `None` for raw program errors
pub fn code_of(err: &Error) -> Option<u32> {
    match err {
        Error::AnchorError(e) => Some(e.error_code_number),
        _ => None,
    }
}

pub fn is(err: &Error, code: VaultError) -> bool {
    code_of(err) == Some(code.into())
}

/// Text suitable for showing to the user
pub fn user_message(err: &Error) -> String {
    match err {
        Error::AnchorError(e) => e.error_msg.clone(),
        Error::ProgramError(e) => e.program_error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_message_keeps_code() {
        let err = unknown("execution reverted: 0xdeadbeef");
        assert!(is(&err, VaultError::Unknown));
        assert_eq!(user_message(&err), "execution reverted: 0xdeadbeef");
    }

    #[test]
    fn static_message_comes_from_msg() {
        let err = error!(VaultError::VaultNotFullyWithdrawn);
        assert!(is(&err, VaultError::VaultNotFullyWithdrawn));
        assert!(!is(&err, VaultError::LockNotExpired));
        assert_eq!(
            user_message(&err),
            "Vault must be fully withdrawn before it can be deleted"
        );
    }
}
