//! Unguessable link tokens.

use tallyback_core::TokenKind;

use crate::ServiceError;

const TOKEN_BYTES: usize = 32;

/// Prefix that makes a leaked token's purpose recognizable in logs.
pub fn token_prefix(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Review => "tb_rv_",
        TokenKind::Clarification => "tb_cl_",
    }
}

/// Generate a random 32-byte hex token.
pub fn generate_token() -> Result<String, ServiceError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| ServiceError::Internal(format!("RNG failure: {e}")))?;
    Ok(hex::encode(bytes))
}

/// Generate a prefixed link token for `kind`.
pub fn generate_link_token(kind: TokenKind) -> Result<String, ServiceError> {
    Ok(format!("{}{}", token_prefix(kind), generate_token()?))
}
