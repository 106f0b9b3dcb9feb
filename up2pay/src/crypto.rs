//! Outbound HMAC digests and inbound RSA signature checks.
//!
//! The two directions use different primitives:
//!
//! - **Outbound** (merchant → gateway): HMAC-SHA512 keyed with the secret shared
//!   between merchant and gateway, hex-encoded in uppercase (`PBX_HMAC`).
//! - **Inbound** (gateway → merchant): RSA PKCS#1 v1.5 over SHA-1, produced
//!   with the gateway's private key and checked against its public key.
//!
//! Verification never errors: every decode or verify failure yields `false`.

use std::sync::Arc;

use base64::Engine as _;
use hmac::{Hmac, Mac};
use rsa::{
    RsaPublicKey,
    pkcs1::DecodeRsaPublicKey,
    pkcs1v15::{Signature, VerifyingKey},
    pkcs8::DecodePublicKey,
    signature::Verifier,
};
use sha1::Sha1;
use sha2::Sha512;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::error::{Result, Up2PayError};

type HmacSha512 = Hmac<Sha512>;

/// Hash algorithm name announced in `PBX_HASH`.
pub const HASH_ALGORITHM: &str = "SHA512";

/// Signature lengths (bytes) for 1024, 2048, 4096 and 8192-bit RSA keys.
pub const ACCEPTED_SIGNATURE_LENGTHS: [usize; 4] = [128, 256, 512, 1024];

/// Length of an uppercase hex HMAC-SHA512 digest.
pub const DIGEST_HEX_LEN: usize = 128;

/// Decodes a hex-encoded HMAC secret into raw key bytes.
///
/// # Errors
///
/// Returns [`Up2PayError::CryptoError`] if the secret is not valid hex.
pub fn decode_secret(secret_hex: &str) -> Result<Zeroizing<Vec<u8>>> {
    hex::decode(secret_hex.trim())
        .map(Zeroizing::new)
        .map_err(|e| Up2PayError::CryptoError(format!("HMAC secret is not valid hex: {e}")))
}

/// Computes the uppercase hex HMAC-SHA512 of `message` with raw key bytes.
///
/// # Errors
///
/// Returns [`Up2PayError::CryptoError`] if the MAC cannot be keyed.
pub fn compute_digest_with_key(message: &str, key: &[u8]) -> Result<String> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| Up2PayError::CryptoError(format!("invalid HMAC key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

/// Computes the `PBX_HMAC` digest of `message` with a hex-encoded secret.
///
/// # Errors
///
/// Returns [`Up2PayError::CryptoError`] if `secret_hex` is not valid hex.
///
/// # Examples
///
/// ```
/// use up2pay::crypto::compute_digest;
///
/// let digest = compute_digest("PBX_SITE=1999888", "0123456789abcdef")?;
/// assert_eq!(digest.len(), 128);
/// assert_eq!(digest, digest.to_uppercase());
/// # Ok::<(), up2pay::Up2PayError>(())
/// ```
#[instrument(skip(message, secret_hex), fields(message_len = message.len()))]
pub fn compute_digest(message: &str, secret_hex: &str) -> Result<String> {
    let key = decode_secret(secret_hex)?;
    compute_digest_with_key(message, &key)
}

/// RSA public key of the gateway, parsed once.
///
/// Accepts both SubjectPublicKeyInfo (`BEGIN PUBLIC KEY`) and PKCS#1
/// (`BEGIN RSA PUBLIC KEY`) PEM encodings.
#[derive(Debug, Clone)]
pub struct GatewayPublicKey {
    verifying_key: Arc<VerifyingKey<Sha1>>,
}

impl GatewayPublicKey {
    /// Parses a PEM-encoded RSA public key.
    ///
    /// # Errors
    ///
    /// Returns [`Up2PayError::CryptoError`] if the PEM is malformed or does not
    /// contain an RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let pem = pem.trim();
        let public_key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| Up2PayError::CryptoError(format!("failed to load RSA public key: {e}")))?;

        Ok(Self { verifying_key: Arc::new(VerifyingKey::new(public_key)) })
    }

    /// Checks a base64 SHA1withRSA signature over `message`.
    ///
    /// Returns `false` when the signature is not valid base64, when its decoded
    /// length is not one of [`ACCEPTED_SIGNATURE_LENGTHS`] (checked before any
    /// RSA work), or when verification fails.
    #[must_use]
    pub fn verify(&self, message: &str, signature_b64: &str) -> bool {
        let Ok(raw) = base64::engine::general_purpose::STANDARD.decode(signature_b64.trim())
        else {
            debug!("signature is not valid base64");
            return false;
        };

        if !ACCEPTED_SIGNATURE_LENGTHS.contains(&raw.len()) {
            debug!(len = raw.len(), "signature length does not match an RSA modulus size");
            return false;
        }

        let Ok(signature) = Signature::try_from(raw.as_slice()) else {
            return false;
        };

        match self.verifying_key.verify(message.as_bytes(), &signature) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "signature verification failed");
                false
            }
        }
    }
}

/// Verifies a base64 SHA1withRSA `signature_b64` over `message` with a PEM key.
///
/// Convenience wrapper over [`GatewayPublicKey`]; a key that fails to parse
/// yields `false`.
///
/// # Examples
///
/// ```
/// use up2pay::crypto::verify_signature;
///
/// // Neither the key nor the signature is usable: the answer is `false`, not an error.
/// assert!(!verify_signature("amount=900", "not base64!", "not a key"));
/// ```
#[must_use]
pub fn verify_signature(message: &str, signature_b64: &str, public_key_pem: &str) -> bool {
    match GatewayPublicKey::from_pem(public_key_pem) {
        Ok(key) => key.verify(message, signature_b64),
        Err(e) => {
            debug!(error = %e, "cannot verify signature");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use rsa::{
        RsaPrivateKey,
        pkcs1::EncodeRsaPublicKey,
        pkcs1v15::SigningKey,
        pkcs8::{EncodePublicKey, LineEnding},
        signature::{SignatureEncoding, Signer},
    };

    use super::*;
    use crate::config::DEFAULT_PUBLIC_KEY_PEM;

    const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
                               0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn generate_key_pair() -> (SigningKey<Sha1>, String) {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).expect("key generation");
        let pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("PEM encoding");
        (SigningKey::<Sha1>::new(private_key), pem)
    }

    fn sign(key: &SigningKey<Sha1>, message: &str) -> String {
        let signature = key.sign(message.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(signature.to_bytes())
    }

    #[test]
    fn test_digest_known_vector() {
        let message = "PBX_SITE=1753161&PBX_RANG=01&PBX_IDENTIFIANT=720212226&PBX_TOTAL=0000000001\
                       &PBX_DEVISE=978&PBX_CMD=test&PBX_PORTEUR=ronan@lesailesdumontblanc.cf\
                       &PBX_RETOUR=amount:M;paymentId:R;transactionId:T;authorizationId:A;\
                       cardType:P;cardNumber:N;cardExpiration:D;error:E;payboxRef:S;signature:K;\
                       &PBX_RUF1=POST&PBX_TIME=2022-12-13T14:37:08.447Z&PBX_HASH=SHA512\
                       &PBX_EFFECTUE=https://localhost:8788/up2pay/success\
                       &PBX_REFUSE=https://localhost:8788/up2pay/error\
                       &PBX_ANNULE=https://localhost:8788/up2pay/cancelled\
                       &PBX_ATTENTE=https://localhost:8788/up2pay/waiting\
                       &PBX_REPONDRE_A=https://localhost:8788/up2pay/process";

        let digest = compute_digest(message, TEST_SECRET).unwrap();

        assert_eq!(
            digest,
            "6E5105BB8585E4412C68F1E9E018F4227103CB64E9F1DBB22537CA17D300DC67\
             BA053D1DFFFA8942DCB05B3DD91258EEBB420EE5781BD75618705F24C4C94507"
        );
    }

    #[test]
    fn test_digest_is_deterministic_uppercase_hex() {
        let first = compute_digest("PBX_SITE=1999888&PBX_RANG=32", TEST_SECRET).unwrap();
        let second = compute_digest("PBX_SITE=1999888&PBX_RANG=32", TEST_SECRET).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), DIGEST_HEX_LEN);
        assert!(first.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_digest_depends_on_key_and_message() {
        let base = compute_digest("a=1", TEST_SECRET).unwrap();
        assert_ne!(base, compute_digest("a=2", TEST_SECRET).unwrap());
        assert_ne!(base, compute_digest("a=1", "00").unwrap());
    }

    #[test]
    fn test_digest_rejects_invalid_hex_secret() {
        let result = compute_digest("a=1", "not-hex");
        assert!(matches!(result, Err(Up2PayError::CryptoError(_))));
    }

    #[test]
    fn test_verify_generated_signature() {
        let (signing_key, pem) = generate_key_pair();
        let message = "amount=5000&paymentId=order-42&error=00000";
        let signature = sign(&signing_key, message);

        assert!(verify_signature(message, &signature, &pem));
        assert!(!verify_signature("amount=5001&paymentId=order-42&error=00000", &signature, &pem));
    }

    #[test]
    fn test_verify_rejects_single_corrupted_byte() {
        let (signing_key, pem) = generate_key_pair();
        let message = "amount=900&paymentId=abc";
        let mut raw = base64::engine::general_purpose::STANDARD
            .decode(sign(&signing_key, message))
            .unwrap();
        raw[17] ^= 0x01;
        let corrupted = base64::engine::general_purpose::STANDARD.encode(&raw);

        assert!(!verify_signature(message, &corrupted, &pem));
    }

    #[test]
    fn test_verify_accepts_pkcs1_pem() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let pem = private_key.to_public_key().to_pkcs1_pem(LineEnding::LF).unwrap();
        let signing_key = SigningKey::<Sha1>::new(private_key);

        let signature = sign(&signing_key, "hello");
        assert!(verify_signature("hello", &signature, &pem));
    }

    #[test]
    fn test_verify_rejects_unexpected_lengths() {
        let key = GatewayPublicKey::from_pem(DEFAULT_PUBLIC_KEY_PEM).unwrap();

        for len in [0_usize, 1, 64, 127, 129, 255, 300] {
            let signature = base64::engine::general_purpose::STANDARD.encode(vec![0xAB_u8; len]);
            assert!(!key.verify("amount=900", &signature), "length {len} must be rejected");
        }
    }

    #[test]
    fn test_verify_rejects_bad_inputs_without_panicking() {
        assert!(!verify_signature("m", "%%%", DEFAULT_PUBLIC_KEY_PEM));
        assert!(!verify_signature("m", "", DEFAULT_PUBLIC_KEY_PEM));
        assert!(!verify_signature("m", &"A".repeat(172), "-----BEGIN PUBLIC KEY-----\nxx\n"));
    }

    #[test]
    fn test_default_gateway_key_parses() {
        assert!(GatewayPublicKey::from_pem(DEFAULT_PUBLIC_KEY_PEM).is_ok());
        assert!(matches!(
            GatewayPublicKey::from_pem("garbage"),
            Err(Up2PayError::CryptoError(_))
        ));
    }
}
