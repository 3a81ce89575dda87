//! Hashed shared-secret handling.
//!
//! The daemon never stores or receives the raw token. Clients send the SHA-256
//! hex digest of the secret and the server compares it against the configured
//! digest without short-circuiting on the first differing byte.

use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 hex digest of the shared secret, normalised to lowercase.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenHash(String);

impl TokenHash {
    /// Validates and normalises a hex digest.
    pub fn parse(text: &str) -> Result<Self, TokenHashError> {
        let trimmed = text.trim();
        if trimmed.len() != DIGEST_HEX_LEN {
            return Err(TokenHashError::Length {
                length: trimmed.len(),
            });
        }
        if !trimmed.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(TokenHashError::NotHex);
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Hashes a raw secret. Used by tooling and tests that need a matching digest.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let hex = digest.iter().fold(String::with_capacity(DIGEST_HEX_LEN), |mut acc, byte| {
            acc.push_str(&format!("{byte:02x}"));
            acc
        });
        Self(hex)
    }

    /// Returns the digest as lowercase hex.
    ///
    /// Callers must not log or echo the returned value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compares a client-presented digest in constant time.
    ///
    /// The presented value is compared case-insensitively; surrounding
    /// whitespace is ignored.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        let normalised = presented.trim().to_ascii_lowercase();
        constant_time_eq(self.0.as_bytes(), normalised.as_bytes())
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("TokenHash(<redacted>)")
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("<redacted>")
    }
}

/// Reasons a configured token hash is rejected.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TokenHashError {
    /// The digest does not have 64 characters.
    #[error("token hash must be 64 hex characters, got {length}")]
    Length {
        /// Observed length after trimming.
        length: usize,
    },
    /// The digest contains non-hex characters.
    #[error("token hash must contain only hex characters")]
    NotHex,
}

/// Byte-wise comparison whose running time depends only on the longer input.
fn constant_time_eq(expected: &[u8], presented: &[u8]) -> bool {
    let longest = expected.len().max(presented.len());
    let mut difference = u8::from(expected.len() != presented.len());
    for index in 0..longest {
        let left = expected.get(index).copied().unwrap_or(0);
        let right = presented.get(index).copied().unwrap_or(0);
        difference |= left ^ right;
    }
    difference == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SECRET_DIGEST: &str = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";

    #[test]
    fn hashes_secrets_as_lowercase_hex() {
        assert_eq!(TokenHash::from_secret("secret").expose(), SECRET_DIGEST);
    }

    #[test]
    fn parse_normalises_case() {
        let hash = TokenHash::parse(&SECRET_DIGEST.to_ascii_uppercase()).expect("valid digest");
        assert_eq!(hash.expose(), SECRET_DIGEST);
    }

    #[rstest]
    #[case("abc", TokenHashError::Length { length: 3 })]
    #[case(
        "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz",
        TokenHashError::NotHex
    )]
    fn parse_rejects_malformed_digests(#[case] text: &str, #[case] expected: TokenHashError) {
        assert_eq!(TokenHash::parse(text), Err(expected));
    }

    #[rstest]
    #[case(SECRET_DIGEST, true)]
    #[case(" 2BB80D537B1DA3E38BD30361AA855686BDE0EACD7162FEF6A25FE97BF527A25B ", true)]
    #[case("", false)]
    #[case("2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25", false)]
    #[case("2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25c", false)]
    fn matches_compares_digests(#[case] presented: &str, #[case] expected: bool) {
        let hash = TokenHash::from_secret("secret");
        assert_eq!(hash.matches(presented), expected);
    }

    #[test]
    fn debug_and_display_redact_the_digest() {
        let hash = TokenHash::from_secret("secret");
        assert!(!format!("{hash:?}").contains(SECRET_DIGEST));
        assert!(!format!("{hash}").contains(SECRET_DIGEST));
    }
}
