use base64::{engine::general_purpose, Engine as _};
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;

use super::registry::TrustError;

/// Extracts signature bytes from a base64 text file, skipping `#` comment lines.
pub fn decode_signature(text: &str) -> Result<Vec<u8>, TrustError> {
    let cleaned: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(str::chars)
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();
    if cleaned.is_empty() {
        return Err(TrustError::SignatureEncoding);
    }
    general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|_| TrustError::SignatureEncoding)
}

/// Verifies the exact manifest bytes against an ECDSA P-256 / SHA-256 signature.
///
/// Accepts both raw `r || s` and DER-encoded signatures.
pub fn verify_manifest(
    manifest: &[u8],
    signature_text: &str,
    public_key_pem: &str,
) -> Result<(), TrustError> {
    let key = VerifyingKey::from_public_key_pem(public_key_pem.trim())
        .map_err(|error| TrustError::PublicKey(error.to_string()))?;
    let bytes = decode_signature(signature_text)?;
    let signature = Signature::from_slice(&bytes)
        .or_else(|_| Signature::from_der(&bytes))
        .map_err(|_| TrustError::SignatureEncoding)?;
    key.verify(manifest, &signature)
        .map_err(|_| TrustError::SignatureInvalid)
}
