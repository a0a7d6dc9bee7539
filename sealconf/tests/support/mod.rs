//! Shared test helpers minting self-signed RSA certificates.

use rcgen::{date_time_ymd, CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_RSA_SHA256};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use sealconf::{CertificateHandle, CertificateResolver, SealError, SealResult};
use std::sync::Arc;

/// A freshly minted self-signed RSA certificate and its key encodings.
pub struct TestCertificate {
    pub cert_pem: String,
    pub key_pem: String,
    pub der: Vec<u8>,
    pub key: RsaPrivateKey,
}

impl TestCertificate {
    /// PEM bundle: certificate followed by its PKCS#8 private key.
    pub fn bundle_pem(&self) -> String {
        format!("{}{}", self.cert_pem, self.key_pem)
    }

    /// Handle with the private key attached.
    pub fn handle_with_key(&self) -> CertificateHandle {
        CertificateHandle::from_pem_bundle(self.bundle_pem().as_bytes(), None)
            .expect("bundle must load")
    }

    /// Handle carrying only the public half.
    pub fn public_only_handle(&self) -> CertificateHandle {
        CertificateHandle::from_der(&self.der).expect("certificate must parse")
    }

    /// The private key as a passphrase-protected PKCS#8 PEM block.
    pub fn encrypted_key_pem(&self, passphrase: &str) -> String {
        self.key
            .to_pkcs8_encrypted_pem(&mut rand::rngs::OsRng, passphrase, LineEnding::LF)
            .expect("PKCS#8 encryption must succeed")
            .to_string()
    }
}

/// Generates a 2048-bit RSA key and self-signs a certificate for `cn`
/// expiring on the given UTC date.
pub fn generate(cn: &str, year: i32, month: u8, day: u8) -> TestCertificate {
    let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).expect("RSA keygen must succeed");
    let key_pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .expect("PKCS#8 encoding must succeed")
        .to_string();
    let key_pair = KeyPair::from_pem_and_sign_algo(&key_pem, &PKCS_RSA_SHA256)
        .expect("rcgen must accept the key");

    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.not_after = date_time_ymd(year, month, day);
    let cert = params.self_signed(&key_pair).expect("self-signing must succeed");

    TestCertificate {
        cert_pem: cert.pem(),
        der: cert.der().to_vec(),
        key_pem,
        key,
    }
}

/// Resolver answering from a fixed set of in-memory certificates, matching
/// titles case-insensitively.
pub struct StaticResolver {
    certificates: Vec<Arc<CertificateHandle>>,
}

impl StaticResolver {
    pub fn new(certificates: Vec<CertificateHandle>) -> Self {
        Self {
            certificates: certificates.into_iter().map(Arc::new).collect(),
        }
    }
}

impl CertificateResolver for StaticResolver {
    fn resolve(&self, title: &str) -> SealResult<Arc<CertificateHandle>> {
        self.certificates
            .iter()
            .find(|c| c.title().to_lowercase() == title.to_lowercase())
            .cloned()
            .ok_or_else(|| SealError::CertificateNotFound(title.to_string()))
    }
}

/// Resolver that fails the test if it is consulted at all.
pub struct PanickingResolver;

impl CertificateResolver for PanickingResolver {
    fn resolve(&self, title: &str) -> SealResult<Arc<CertificateHandle>> {
        panic!("resolver must not be consulted for plain strings (asked for '{title}')");
    }
}
