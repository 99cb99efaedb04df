//! Opaque token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

/// Token entropy in bytes (256 bits).
const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random, URL-safe token.
///
/// 32 random bytes encode to 43 base64 characters. Used for session tokens
/// and CSRF tokens; the value is opaque and never logged.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
