//! Splitting 65-byte ECDSA signatures into `(r, s, v)`.
//!
//! Layout of the 130 hex characters (after an optional `0x`):
//! `r` = `[0, 64)`, `s` = `[64, 128)`, `v` = `[128, 130)`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Hex length of a 65-byte signature.
pub const SIGNATURE_HEX_LEN: usize = 130;

const R_END: usize = 64;
const S_END: usize = 128;

/// The three canonical components of a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParts {
    /// 64 lowercase hex characters, no prefix.
    pub r: String,
    /// 64 lowercase hex characters, no prefix.
    pub s: String,
    pub v: u8,
}

impl SignatureParts {
    /// Decode a hex signature, with or without `0x` prefix.
    ///
    /// Fails unless the payload is exactly 130 hex characters.
    pub fn decode(signature: &str) -> Result<Self> {
        let hex_body = signature
            .strip_prefix("0x")
            .or_else(|| signature.strip_prefix("0X"))
            .unwrap_or(signature);

        if hex_body.len() != SIGNATURE_HEX_LEN {
            return Err(Error::MalformedSignature {
                message: format!(
                    "expected {} hex characters, got {}",
                    SIGNATURE_HEX_LEN,
                    hex_body.len()
                ),
            });
        }
        if !hex_body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::MalformedSignature {
                message: "signature contains non-hex characters".to_string(),
            });
        }

        let r = hex_body[..R_END].to_ascii_lowercase();
        let s = hex_body[R_END..S_END].to_ascii_lowercase();
        let v = u8::from_str_radix(&hex_body[S_END..], 16).map_err(|e| {
            Error::MalformedSignature {
                message: format!("invalid recovery byte: {}", e),
            }
        })?;

        Ok(Self { r, s, v })
    }

    /// Re-encode as a `0x`-prefixed 130-character hex string.
    pub fn encode(&self) -> String {
        format!("0x{}{}{:02x}", self.r, self.s, self.v)
    }

    /// `r` with `0x` prefix.
    pub fn r_hex(&self) -> String {
        format!("0x{}", self.r)
    }

    /// `s` with `0x` prefix.
    pub fn s_hex(&self) -> String {
        format!("0x{}", self.s)
    }

    /// Recovery id in the 27/28 form contracts expect.
    pub fn canonical_v(&self) -> u8 {
        if self.v < 27 {
            self.v + 27
        } else {
            self.v
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signature(v: u8) -> String {
        let r: String = (0..64).map(|i| char::from(b"0123456789abcdef"[i % 16])).collect();
        let s: String = (0..64)
            .map(|i| char::from(b"fedcba9876543210"[i % 16]))
            .collect();
        format!("0x{}{}{:02x}", r, s, v)
    }

    #[test]
    fn test_decode_positional_offsets() {
        let sig = sample_signature(0x1b);
        let parts = SignatureParts::decode(&sig).unwrap();
        assert_eq!(parts.r, &sig[2..66]);
        assert_eq!(parts.s, &sig[66..130]);
        assert_eq!(parts.v, 27);
    }

    #[test]
    fn test_decode_without_prefix() {
        let sig = sample_signature(0x1c);
        let parts = SignatureParts::decode(sig.trim_start_matches("0x")).unwrap();
        assert_eq!(parts.v, 28);
        assert_eq!(parts.r.len(), 64);
        assert_eq!(parts.s.len(), 64);
    }

    #[test]
    fn test_decode_encode_roundtrip_all_v() {
        for v in 0..=u8::MAX {
            let sig = sample_signature(v);
            let parts = SignatureParts::decode(&sig).unwrap();
            assert_eq!(parts.v, v);
            assert_eq!(parts.encode(), sig);
            assert_eq!(SignatureParts::decode(&parts.encode()).unwrap(), parts);
        }
    }

    #[test]
    fn test_every_wrong_length_fails() {
        for len in 0..=140usize {
            if len == SIGNATURE_HEX_LEN {
                continue;
            }
            let body = "a".repeat(len);
            let err = SignatureParts::decode(&format!("0x{}", body)).unwrap_err();
            assert!(
                matches!(err, Error::MalformedSignature { .. }),
                "length {} should fail",
                len
            );
            assert!(SignatureParts::decode(&body).is_err(), "length {}", len);
        }
    }

    #[test]
    fn test_one_char_short_or_long_fails() {
        let sig = sample_signature(27);
        assert!(SignatureParts::decode(&sig[..sig.len() - 1]).is_err());
        assert!(SignatureParts::decode(&format!("{}0", sig)).is_err());
    }

    #[test]
    fn test_non_hex_fails() {
        let mut sig = sample_signature(27);
        sig.replace_range(10..11, "g");
        assert!(matches!(
            SignatureParts::decode(&sig),
            Err(Error::MalformedSignature { .. })
        ));
    }

    #[test]
    fn test_uppercase_is_normalized() {
        let sig = sample_signature(27).to_uppercase().replacen("0X", "0x", 1);
        let parts = SignatureParts::decode(&sig).unwrap();
        assert_eq!(parts.encode(), sample_signature(27));
    }

    #[test]
    fn test_canonical_v() {
        let mut parts = SignatureParts::decode(&sample_signature(0)).unwrap();
        assert_eq!(parts.canonical_v(), 27);
        parts.v = 1;
        assert_eq!(parts.canonical_v(), 28);
        parts.v = 28;
        assert_eq!(parts.canonical_v(), 28);
    }
}
