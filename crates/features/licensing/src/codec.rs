//! # Envelope Codec (C2)
//!
//! Frames and parses the on-disk/on-wire license envelope: four length-prefixed
//! fields, `hash | signature | encrypted_payload | aes_key`, each preceded by its
//! length as a 4-byte little-endian `u32` (spec §6.1 pins this framing as the sole
//! authority over the envelope's byte layout — no other encoding of these four
//! fields is a valid envelope).

use crate::crypto::{self, AES_KEY_LEN, SHA256_LEN};
use crate::error::LicenseError;
#[cfg(feature = "issuance")]
use rsa::RsaPrivateKey;
use rsa::RsaPublicKey;

const FIELD_COUNT: usize = 4;

fn write_field(out: &mut Vec<u8>, field: &[u8]) {
    let len = u32::try_from(field.len()).expect("license envelope fields fit in u32");
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(field);
}

fn read_field<'a>(buf: &'a [u8], cursor: &mut usize) -> Result<&'a [u8], LicenseError> {
    let malformed = || LicenseError::InvalidLicenseFormat {
        message: "envelope ended before a length-prefixed field could be read".into(),
        context: Some("parsing license envelope".into()),
    };
    let len_bytes: [u8; 4] = buf.get(*cursor..*cursor + 4).ok_or_else(malformed)?.try_into().map_err(|_| malformed())?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    *cursor += 4;
    let field = buf.get(*cursor..*cursor + len).ok_or_else(malformed)?;
    *cursor += len;
    Ok(field)
}

/// Builds a tamper-evident envelope around `plain` (a serialized license payload),
/// signed under `private_key`.
///
/// Steps, per §6.1: generate a fresh AES key, encrypt the payload, hash the
/// ciphertext, sign the hash, frame the four fields.
///
/// # Errors
/// Returns [`LicenseError::Internal`] if key generation, encryption, or signing fail.
#[cfg(feature = "issuance")]
pub fn encode(plain: &[u8], private_key: &RsaPrivateKey) -> Result<Vec<u8>, LicenseError> {
    let key = crypto::generate_aes_key()?;
    let cipher = crypto::encrypt(plain, &key)?;
    let hash = crypto::sha256(&cipher);
    let sig = crypto::sign(&hash, private_key)?;

    let mut out = Vec::new();
    write_field(&mut out, &hash);
    write_field(&mut out, &sig);
    write_field(&mut out, &cipher);
    write_field(&mut out, &key);
    Ok(out)
}

/// Parses and verifies an envelope produced by [`encode`], returning the decrypted
/// payload bytes.
///
/// Verification order: recompute the ciphertext hash and compare against the stored
/// one, then verify the signature over the stored hash, then decrypt. Either
/// integrity check failing is reported uniformly as
/// [`LicenseError::InvalidLicenseSignature`] so callers can't distinguish "hash
/// mismatch" from "bad signature" and build an oracle out of it.
///
/// # Errors
/// Returns [`LicenseError::InvalidLicenseFormat`] if the envelope framing is
/// malformed, or [`LicenseError::InvalidLicenseSignature`] if either integrity check
/// fails.
pub fn decode(envelope: &[u8], public_key: &RsaPublicKey) -> Result<Vec<u8>, LicenseError> {
    let mut cursor = 0usize;
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    for _ in 0..FIELD_COUNT {
        fields.push(read_field(envelope, &mut cursor)?);
    }
    if cursor != envelope.len() {
        return Err(LicenseError::InvalidLicenseFormat {
            message: "trailing bytes after the fourth envelope field".into(),
            context: Some("parsing license envelope".into()),
        });
    }
    let [hash, sig, cipher, key] = [fields[0], fields[1], fields[2], fields[3]];

    if hash.len() != SHA256_LEN {
        return Err(LicenseError::InvalidLicenseFormat {
            message: "hash field is not 32 bytes".into(),
            context: Some("parsing license envelope".into()),
        });
    }
    if key.len() != AES_KEY_LEN {
        return Err(LicenseError::InvalidLicenseFormat {
            message: "aes_key field is not 32 bytes".into(),
            context: Some("parsing license envelope".into()),
        });
    }

    let recomputed_hash = crypto::sha256(cipher);
    if recomputed_hash.as_slice() != hash {
        tracing::warn!("license envelope failed its integrity check (hash mismatch)");
        return Err(LicenseError::InvalidLicenseSignature {
            message: "ciphertext hash does not match the envelope's stored hash".into(),
            context: Some("verifying license envelope".into()),
        });
    }
    if !crypto::verify(hash, sig, public_key) {
        tracing::warn!("license envelope failed its integrity check (signature verification)");
        return Err(LicenseError::InvalidLicenseSignature {
            message: "signature does not verify against the provided public key".into(),
            context: Some("verifying license envelope".into()),
        });
    }

    let key: [u8; AES_KEY_LEN] = key.try_into().expect("length checked above");
    crypto::decrypt(cipher, &key)
}

#[cfg(all(test, feature = "issuance"))]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    #[test]
    fn roundtrips() {
        let (private, public) = keypair();
        let plain = br#"{"licenseId":"..."}"#;
        let envelope = encode(plain, &private).unwrap();
        let decoded = decode(&envelope, &public).unwrap();
        assert_eq!(decoded, plain);
    }

    #[test]
    fn tampering_with_ciphertext_is_detected() {
        let (private, public) = keypair();
        let plain = b"license payload";
        let mut envelope = encode(plain, &private).unwrap();
        *envelope.last_mut().unwrap() ^= 0xFF;
        assert!(decode(&envelope, &public).is_err());
    }

    #[test]
    fn tampering_with_hash_is_detected() {
        let (private, public) = keypair();
        let mut envelope = encode(b"license payload", &private).unwrap();
        envelope[4] ^= 0xFF; // first byte of the hash field
        assert!(decode(&envelope, &public).is_err());
    }

    #[test]
    fn wrong_public_key_is_rejected() {
        let (private, _) = keypair();
        let (_, other_public) = keypair();
        let envelope = encode(b"license payload", &private).unwrap();
        assert!(decode(&envelope, &other_public).is_err());
    }

    #[test]
    fn truncated_envelope_is_a_format_error() {
        let (private, public) = keypair();
        let envelope = encode(b"license payload", &private).unwrap();
        let truncated = &envelope[..envelope.len() - 5];
        let err = decode(truncated, &public).unwrap_err();
        assert!(matches!(err, LicenseError::InvalidLicenseFormat { .. }));
    }
}
