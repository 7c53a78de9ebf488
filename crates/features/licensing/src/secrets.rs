//! # Secrets File Lifecycle (C1, §6.2)
//!
//! Vendor-side key management: generating an RSA keypair and persisting the private
//! key to disk under a passphrase.
//!
//! The secrets file is encrypted with AES-256-CBC using a deterministic all-zero IV
//! and `SHA-256(passphrase)` as the key. A zero IV is normally a CBC mistake — it
//! leaks equality between the first blocks of two messages encrypted under the same
//! key — but it's acceptable here because exactly one plaintext (the private key DER)
//! is ever encrypted under a given passphrase-derived key, so there is no second
//! ciphertext for it to leak a relationship with. Do not reuse this scheme where a key
//! may encrypt more than one message; use [`crate::crypto::encrypt`] for that.
//!
//! Gated behind the `issuance` feature: only vendor-side tooling generates or reads
//! private keys.

use crate::crypto::sha256;
use crate::error::LicenseError;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::Path;
use zeroize::Zeroizing;

/// RSA modulus size used for newly generated keypairs.
pub const RSA_KEY_BITS: usize = 2048;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Generates a fresh RSA-2048 keypair for license signing.
///
/// # Errors
/// Returns [`LicenseError::KeyManagement`] if key generation fails.
pub fn generate_keypair() -> Result<(RsaPrivateKey, RsaPublicKey), LicenseError> {
    let private_key =
        RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(|e| LicenseError::KeyManagement {
            message: e.to_string().into(),
            context: Some("generating RSA keypair".into()),
        })?;
    let public_key = RsaPublicKey::from(&private_key);
    tracing::info!(bits = RSA_KEY_BITS, "generated a new RSA keypair");
    Ok((private_key, public_key))
}

fn passphrase_key(passphrase: &str) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(sha256(passphrase.as_bytes()))
}

/// Encrypts `private_key` under `passphrase` and writes the result to `path`.
///
/// # Errors
/// Returns [`LicenseError::KeyManagement`] if DER encoding or the write fails.
pub fn save_secrets(
    path: &Path,
    private_key: &RsaPrivateKey,
    passphrase: &str,
) -> Result<(), LicenseError> {
    let der = Zeroizing::new(private_key.to_pkcs8_der().map_err(|e| LicenseError::KeyManagement {
        message: e.to_string().into(),
        context: Some("encoding private key to PKCS#8".into()),
    })?);

    let key = passphrase_key(passphrase);
    let encryptor = Aes256CbcEnc::new(key.as_ref().into(), &[0u8; 16].into());
    let cipher = encryptor.encrypt_padded_vec_mut::<Pkcs7>(der.as_bytes());

    std::fs::write(path, cipher).map_err(|e| LicenseError::KeyManagement {
        message: e.to_string().into(),
        context: Some(format!("writing secrets file {}", path.display()).into()),
    })
}

/// Reads and decrypts a private key previously written by [`save_secrets`].
///
/// # Errors
/// Returns [`LicenseError::KeyManagement`] if the file is missing, the passphrase is
/// wrong (padding check fails), or the decrypted bytes aren't a valid PKCS#8 key.
pub fn load_secrets(path: &Path, passphrase: &str) -> Result<RsaPrivateKey, LicenseError> {
    let cipher = std::fs::read(path).map_err(|e| LicenseError::KeyManagement {
        message: e.to_string().into(),
        context: Some(format!("reading secrets file {}", path.display()).into()),
    })?;

    let key = passphrase_key(passphrase);
    let decryptor = Aes256CbcDec::new(key.as_ref().into(), &[0u8; 16].into());
    let der = Zeroizing::new(decryptor.decrypt_padded_vec_mut::<Pkcs7>(&cipher).map_err(|e| {
        LicenseError::KeyManagement {
            message: format!("failed to decrypt secrets file (wrong passphrase?): {e}").into(),
            context: Some(format!("reading secrets file {}", path.display()).into()),
        }
    })?);

    RsaPrivateKey::from_pkcs8_der(&der).map_err(|e| LicenseError::KeyManagement {
        message: e.to_string().into(),
        context: Some("decoding private key from PKCS#8".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_roundtrips_through_a_secrets_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.bin");
        let (private_key, public_key) = generate_keypair().unwrap();

        save_secrets(&path, &private_key, "correct horse battery staple").unwrap();
        let loaded = load_secrets(&path, "correct horse battery staple").unwrap();

        assert_eq!(RsaPublicKey::from(&loaded), public_key);
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.bin");
        let (private_key, _) = generate_keypair().unwrap();

        save_secrets(&path, &private_key, "correct passphrase").unwrap();

        assert!(load_secrets(&path, "wrong passphrase").is_err());
    }
}
