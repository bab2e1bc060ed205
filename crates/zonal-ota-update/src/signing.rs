//! Opaque package signing capability
//!
//! The cryptographic backend is external. The core hands it a package's
//! content hash and carries back whatever signature bytes it produces.

use zonal_ota_errors::PackageError;

/// Signs package content hashes.
pub trait PackageSigner: Send + Sync {
    /// Identifier of the key or algorithm, recorded for operators.
    fn key_id(&self) -> &str;

    fn sign(&self, content_hash: &str) -> Result<Vec<u8>, PackageError>;
}

/// Verifies signatures produced by a matching [`PackageSigner`].
pub trait PackageVerifier: Send + Sync {
    fn verify(&self, content_hash: &str, signature: &[u8]) -> Result<bool, PackageError>;
}

/// Hex-encoded signature over `content_hash`.
pub fn sign_hex(signer: &dyn PackageSigner, content_hash: &str) -> Result<String, PackageError> {
    signer.sign(content_hash).map(hex::encode)
}

/// Decode a hex signature and check it with `verifier`.
pub fn verify_hex(
    verifier: &dyn PackageVerifier,
    content_hash: &str,
    signature_hex: &str,
) -> Result<bool, PackageError> {
    let raw = hex::decode(signature_hex)
        .map_err(|e| PackageError::storage(format!("Malformed signature encoding: {e}")))?;
    verifier.verify(content_hash, &raw)
}
