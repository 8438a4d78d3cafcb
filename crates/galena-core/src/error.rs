use thiserror::Error;

/// Why the pool refused a submitted transaction. Rejections are logged and
/// swallowed; submitters never see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TxRejection {
    #[error("missing sender, signature or negative amount")]
    Malformed,
    #[error("signature does not verify against the sender key")]
    InvalidSignature,
    #[error("sender balance does not cover the amount")]
    InsufficientBalance,
}

/// Classification of a chain invariant failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainFault {
    /// Stored hash no longer matches the block contents.
    #[error("tampered data")]
    TamperedData,
    /// Parent link or index does not line up with the previous block.
    #[error("out of sync")]
    OutOfSync,
    /// Hash misses the difficulty target or a reward row is misplaced.
    #[error("invalid proof of work")]
    InvalidPow,
}

/// First failure found by a chain walk. `height` is the position of the
/// offending block, which truncation removes along with everything after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{fault} at block {height}")]
pub struct Violation {
    pub fault: ChainFault,
    pub height: u64,
}

/// Key or signature material that cannot be decoded or does not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid key material")]
    InvalidKey,
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("signature verification failed")]
    VerificationFailed,
}
