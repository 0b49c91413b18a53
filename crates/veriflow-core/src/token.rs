//! Invitation token generation.
//!
//! This is the only place in the system where randomness quality matters
//! for security: an invitation token is an unguessable credential
//! permitting exactly one accept/decline resolution before expiry.

use rand::RngCore;

/// Bytes of entropy per token (128 bits).
const TOKEN_BYTES: usize = 16;

/// Generate a hex-encoded 128-bit invitation token from a cryptographically
/// secure source. Uniqueness is enforced by the store's unique index, not
/// by the generator; collision probability at this entropy is negligible.
pub fn generate_invitation_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_is_32_hex_chars() {
        let token = generate_invitation_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_invitation_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
