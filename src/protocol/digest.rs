//! Handshake authenticators
//!
//! Both digests are MD5 over a concatenation of identity, shared secret and
//! a value the peer also knows. Numbers enter the hash as unpadded decimal
//! ASCII.

use md5::{Digest, Md5};

/// Authenticator length in bytes
pub const AUTHENTICATOR_LEN: usize = 16;

/// Raw 16-byte MD5 authenticator
pub type Authenticator = [u8; AUTHENTICATOR_LEN];

/// Zero bytes between the source address and the secret
const SOURCE_GAP: [u8; 9] = [0u8; 9];

/// `AuthenticatorSource = MD5(source_addr + 9 x 0x00 + secret + timestamp)`
#[must_use]
pub fn source_digest(source_addr: &[u8], secret: &[u8], timestamp: u32) -> Authenticator {
    let mut hasher = Md5::new();
    hasher.update(source_addr);
    hasher.update(SOURCE_GAP);
    hasher.update(secret);
    hasher.update(timestamp.to_string().as_bytes());
    hasher.finalize().into()
}

/// `AuthenticatorISMG = MD5(status + AuthenticatorSource + secret)`
///
/// The source digest enters as raw bytes, not hex.
#[must_use]
pub fn gateway_digest(status: u32, source_digest: &Authenticator, secret: &[u8]) -> Authenticator {
    let mut hasher = Md5::new();
    hasher.update(status.to_string().as_bytes());
    hasher.update(source_digest);
    hasher.update(secret);
    hasher.finalize().into()
}
