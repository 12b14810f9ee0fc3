use rand::{rngs::OsRng, RngCore};

const SHARE_TOKEN_BYTE_LENGTH: usize = 16;

/// Generates an opaque share token: 16 OS-random bytes rendered as 32 lowercase hex chars.
///
/// Uniqueness is statistical; callers rely on the store to reject the (negligible) duplicate.
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTE_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
