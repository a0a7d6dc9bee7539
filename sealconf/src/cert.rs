//! X.509 certificate handles and title derivation.
//!
//! A *title* is the identifier embedded in an envelope and matched by
//! resolvers: `CN=<subject>,NotAfter=<yyyy-MM-dd>`, with every `:` replaced
//! by `_`. Titles live inside a colon-delimited wire format, so the
//! separator character must not appear in them.

use crate::error::{SealError, SealResult};
use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;
use x509_parser::pem::Pem;
use x509_parser::prelude::*;

/// Replaces every `:` in a title with `_`.
///
/// Applied uniformly to generated titles and to identifiers used for
/// lookup. The codec never re-normalizes titles scanned out of an envelope.
pub fn normalize_title(title: &str) -> String {
    title.replace(':', "_")
}

/// Parsed X.509 certificate together with its RSA key material.
///
/// The public key is always present; the private key only when the source
/// carried one. Resolvers own and load handles; callers never mutate them.
pub struct CertificateHandle {
    subject: String,
    not_after: DateTime<Utc>,
    thumbprint: String,
    public_key: RsaPublicKey,
    private_key: Option<RsaPrivateKey>,
}

impl CertificateHandle {
    /// Parses a DER-encoded certificate. The resulting handle has no
    /// private key.
    pub fn from_der(der: &[u8]) -> SealResult<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| SealError::MalformedSource(format!("certificate parse failed: {e}")))?;

        let subject = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| cert.subject().to_string());

        let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or_else(|| {
                SealError::MalformedSource("certificate expiry out of range".to_string())
            })?;

        let public_key = RsaPublicKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| SealError::MalformedSource(format!("unsupported public key: {e}")))?;

        Ok(Self {
            subject,
            not_after,
            thumbprint: hex::encode(Sha256::digest(der)),
            public_key,
            private_key: None,
        })
    }

    /// Loads a certificate, and any private key stored alongside it, from a
    /// PEM file.
    ///
    /// The first `CERTIFICATE` block becomes the handle. `PRIVATE KEY`
    /// (PKCS#8), `RSA PRIVATE KEY` (PKCS#1) and `ENCRYPTED PRIVATE KEY`
    /// blocks are recognized; the passphrase is required only for the last.
    pub fn from_pem_file(path: &Path, passphrase: Option<&str>) -> SealResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_pem_bundle(&bytes, passphrase)
    }

    /// Same as [`from_pem_file`](Self::from_pem_file), from an in-memory
    /// buffer.
    pub fn from_pem_bundle(bytes: &[u8], passphrase: Option<&str>) -> SealResult<Self> {
        let mut certificate: Option<CertificateHandle> = None;
        let mut private_key: Option<RsaPrivateKey> = None;

        for pem in Pem::iter_from_buffer(bytes) {
            let pem =
                pem.map_err(|e| SealError::MalformedSource(format!("PEM parse failed: {e}")))?;
            match pem.label.as_str() {
                "CERTIFICATE" => {
                    if certificate.is_none() {
                        certificate = Some(Self::from_der(&pem.contents)?);
                    }
                }
                "PRIVATE KEY" => {
                    private_key = Some(RsaPrivateKey::from_pkcs8_der(&pem.contents).map_err(
                        |e| SealError::MalformedSource(format!("PKCS#8 key parse failed: {e}")),
                    )?);
                }
                "RSA PRIVATE KEY" => {
                    private_key = Some(RsaPrivateKey::from_pkcs1_der(&pem.contents).map_err(
                        |e| SealError::MalformedSource(format!("PKCS#1 key parse failed: {e}")),
                    )?);
                }
                "ENCRYPTED PRIVATE KEY" => {
                    let passphrase = passphrase.ok_or_else(|| {
                        SealError::MalformedSource(
                            "private key is passphrase-protected but no passphrase was given"
                                .to_string(),
                        )
                    })?;
                    let info = pkcs8::EncryptedPrivateKeyInfo::try_from(pem.contents.as_slice())
                        .map_err(|e| {
                            SealError::MalformedSource(format!(
                                "encrypted key parse failed: {e}"
                            ))
                        })?;
                    let document = info.decrypt(passphrase).map_err(|e| {
                        SealError::MalformedSource(format!("private key decryption failed: {e}"))
                    })?;
                    private_key =
                        Some(RsaPrivateKey::from_pkcs8_der(document.as_bytes()).map_err(|e| {
                            SealError::MalformedSource(format!("PKCS#8 key parse failed: {e}"))
                        })?);
                }
                other => debug!("skipping PEM block '{other}'"),
            }
        }

        let mut handle = certificate.ok_or_else(|| {
            SealError::MalformedSource("no certificate in PEM bundle".to_string())
        })?;
        handle.private_key = private_key;
        Ok(handle)
    }

    /// The identifier this certificate answers to inside an envelope.
    pub fn title(&self) -> String {
        normalize_title(&format!(
            "CN={},NotAfter={}",
            self.subject,
            self.not_after.format("%Y-%m-%d")
        ))
    }

    /// Simple subject name (CN, or the full RDN string when absent).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Expiry date, UTC.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// SHA-256 of the DER encoding, hex. Diagnostic only.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    /// Whether a private key was loaded with this certificate.
    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// RSA public key, always available.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// RSA private key, when one was loaded.
    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private_key.as_ref()
    }
}
