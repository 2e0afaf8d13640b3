//! Cursor codec
//!
//! Owns the opaque wire format of pagination cursors: the standard padded
//! base64 encoding of the UTF-8 text form of a sort key followed by a
//! truncated HMAC-SHA256 tag over that text. A cursor whose tag does not
//! verify is rejected, so an edited token never resumes from a different key.
//! Nothing in here knows about query semantics.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use super::key::CursorKey;
use crate::constants::pagination::{CURSOR_TAG_LEN, DEFAULT_CURSOR_SECRET, MAX_CURSOR_LEN};

type HmacSha256 = Hmac<Sha256>;

/// Reasons a cursor token can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("cursor is empty")]
    Empty,

    #[error("cursor exceeds max length: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("cursor is not valid base64")]
    Malformed,

    #[error("cursor failed its integrity check")]
    Tampered,

    #[error("cursor does not decode to UTF-8 text")]
    NotUtf8,

    #[error("cursor does not hold a valid {expected} key")]
    InvalidKey { expected: &'static str },
}

/// Signs and verifies cursor tokens
///
/// Cursors are only accepted by a codec keyed with the secret that issued
/// them. The default codec uses a built-in secret, which still catches edited
/// tokens but not forged ones; deployments set `pagination.cursor_secret`.
#[derive(Clone)]
pub struct CursorCodec {
    mac: HmacSha256,
}

impl CursorCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(secret).expect("HMAC takes keys of any length"),
        }
    }

    fn tag(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes()[..CURSOR_TAG_LEN].to_vec()
    }

    /// Encode a sort-key text value into an opaque cursor.
    pub fn encode(&self, value: &str) -> String {
        let mut token = value.as_bytes().to_vec();
        token.extend(self.tag(value.as_bytes()));
        STANDARD.encode(token)
    }

    /// Decode an opaque cursor back into the text value it was built from.
    pub fn decode(&self, cursor: &str) -> Result<String, CursorError> {
        if cursor.is_empty() {
            return Err(CursorError::Empty);
        }

        if cursor.len() > MAX_CURSOR_LEN {
            return Err(CursorError::TooLong {
                len: cursor.len(),
                max: MAX_CURSOR_LEN,
            });
        }

        let bytes = STANDARD
            .decode(cursor.as_bytes())
            .map_err(|_| CursorError::Malformed)?;

        if bytes.len() < CURSOR_TAG_LEN {
            return Err(CursorError::Tampered);
        }
        let (payload, tag) = bytes.split_at(bytes.len() - CURSOR_TAG_LEN);

        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_truncated_left(tag)
            .map_err(|_| CursorError::Tampered)?;

        String::from_utf8(payload.to_vec()).map_err(|_| CursorError::NotUtf8)
    }

    /// Encode a sort key into a cursor
    pub fn encode_key<K: CursorKey>(&self, key: &K) -> String {
        self.encode(&key.to_cursor_value())
    }

    /// Decode a cursor into a sort key of type `K`
    ///
    /// Fails with [`CursorError::InvalidKey`] when the cursor is well formed
    /// and signed but its payload is not a `K`.
    pub fn decode_key<K: CursorKey>(&self, cursor: &str) -> Result<K, CursorError> {
        let value = self.decode(cursor)?;

        K::parse_cursor_value(&value).ok_or(CursorError::InvalidKey { expected: K::KIND })
    }
}

impl Default for CursorCodec {
    fn default() -> Self {
        Self::new(DEFAULT_CURSOR_SECRET)
    }
}

impl fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::pagination::key::TimestampedKey;

    const BASE64_ALPHABET: &str =
        "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    fn timestamped_key() -> TimestampedKey {
        TimestampedKey::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            Uuid::from_u128(0x1234_5678_9abc_4def_8000_0000_0000_0042),
        )
    }

    #[test]
    fn encode_round_trips_the_text() {
        let codec = CursorCodec::default();

        let cursor = codec.encode("5");
        assert_eq!(codec.decode(&cursor).unwrap(), "5");
    }

    #[test]
    fn cursor_is_opaque_base64() {
        let cursor = CursorCodec::default().encode("5");

        assert!(STANDARD.decode(&cursor).is_ok());
        assert_ne!(cursor, STANDARD.encode("5"));
    }

    #[test]
    fn decode_rejects_empty_cursor() {
        assert_eq!(
            CursorCodec::default().decode("").unwrap_err(),
            CursorError::Empty
        );
    }

    #[test]
    fn decode_rejects_oversized_cursor() {
        let cursor = "A".repeat(MAX_CURSOR_LEN + 4);
        assert_eq!(
            CursorCodec::default().decode(&cursor).unwrap_err(),
            CursorError::TooLong {
                len: MAX_CURSOR_LEN + 4,
                max: MAX_CURSOR_LEN
            }
        );
    }

    #[test]
    fn decode_rejects_malformed_base64() {
        let codec = CursorCodec::default();

        assert_eq!(codec.decode("not base64!").unwrap_err(), CursorError::Malformed);
        // missing padding
        assert_eq!(codec.decode("NQ=").unwrap_err(), CursorError::Malformed);
    }

    #[test]
    fn unsigned_base64_is_rejected() {
        let codec = CursorCodec::default();

        assert_eq!(codec.decode("NQ==").unwrap_err(), CursorError::Tampered);
        assert_eq!(
            codec.decode(&STANDARD.encode("2024-03-01T12:30:00Z|not-signed-at-all")).unwrap_err(),
            CursorError::Tampered
        );
    }

    #[test]
    fn every_single_character_edit_is_rejected() {
        let codec = CursorCodec::default();
        let cursor = codec.encode_key(&timestamped_key());

        for (position, original) in cursor.char_indices().filter(|(_, c)| *c != '=') {
            for replacement in BASE64_ALPHABET.chars().filter(|c| *c != original) {
                let mut edited = cursor.clone();
                edited.replace_range(position..position + 1, &replacement.to_string());

                let result = codec.decode_key::<TimestampedKey>(&edited);
                assert!(
                    matches!(
                        result,
                        Err(CursorError::Tampered) | Err(CursorError::Malformed)
                    ),
                    "edit {original}->{replacement} at {position} was accepted: {result:?}"
                );
            }
        }
    }

    #[test]
    fn cursors_from_another_secret_are_rejected() {
        let issued = CursorCodec::new(b"one deployment").encode_key(&7_i64);

        assert_eq!(
            CursorCodec::new(b"another deployment")
                .decode_key::<i64>(&issued)
                .unwrap_err(),
            CursorError::Tampered
        );
    }

    #[test]
    fn decode_key_rejects_payload_of_the_wrong_type() {
        let codec = CursorCodec::default();
        let cursor = codec.encode("definitely-not-a-uuid");

        assert_eq!(
            codec.decode_key::<Uuid>(&cursor).unwrap_err(),
            CursorError::InvalidKey { expected: "uuid" }
        );
    }

    #[test]
    fn composite_key_round_trips_through_a_cursor() {
        let codec = CursorCodec::default();
        let key = timestamped_key();

        let cursor = codec.encode_key(&key);
        let decoded: TimestampedKey = codec.decode_key(&cursor).unwrap();

        assert_eq!(decoded, key);
        assert_eq!(codec.encode_key(&decoded), cursor);
    }

    #[test]
    fn non_utf8_payload_with_valid_tag_is_rejected() {
        let codec = CursorCodec::default();
        let payload = [0xff, 0xfe, 0xfd];
        let mut token = payload.to_vec();
        token.extend(codec.tag(&payload));

        assert_eq!(
            codec.decode(&STANDARD.encode(token)).unwrap_err(),
            CursorError::NotUtf8
        );
    }
}
