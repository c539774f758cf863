//! Session tokens. The token is the only thing the browser holds; the user
//! id it maps to stays on the server.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// 32 bytes = 256 bits of entropy
const TOKEN_BYTES: usize = 32;

/// Draw a fresh token from OS entropy, base64 URL-safe without padding
pub fn generate_secure_token() -> String {
    let mut buffer = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_cookie_safe_and_distinct() {
        let first = generate_secure_token();
        let second = generate_secure_token();
        assert_ne!(first, second);

        // unpadded base64 of 32 bytes
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
