//! Certificate resolution: mapping an envelope title to a certificate.
//!
//! Two variants of the same capability: a file-backed resolver scoped to a
//! single certificate, and a store-backed resolver searching an ordered set
//! of certificate directories.

use crate::cert::CertificateHandle;
use crate::error::{SealError, SealResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Environment variable naming the certificate store to search.
pub const CERT_STORE_ENV: &str = "SEALCONF_CERT_STORE";

/// Store searched when no scope overrides the name.
pub const DEFAULT_CERT_STORE: &str = "personal";

fn titles_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Maps an envelope title to a certificate handle.
pub trait CertificateResolver: Send + Sync {
    /// Returns the certificate whose title matches `title`
    /// (case-insensitive), or `CertificateNotFound`.
    fn resolve(&self, title: &str) -> SealResult<Arc<CertificateHandle>>;
}

/// Resolver scoped to exactly one certificate loaded from a PEM file.
///
/// Resolution succeeds only when the requested title matches the loaded
/// certificate's own title. The resolver never answers for another name,
/// even though the certificate is already in memory.
pub struct FileCertificateResolver {
    certificate: Arc<CertificateHandle>,
}

impl FileCertificateResolver {
    /// Loads the certificate (and any private key stored with it) eagerly.
    /// The passphrase is only needed for encrypted key blocks.
    pub fn open(path: impl AsRef<Path>, passphrase: Option<&str>) -> SealResult<Self> {
        let path = path.as_ref();
        let certificate = Arc::new(CertificateHandle::from_pem_file(path, passphrase)?);
        debug!(
            "loaded certificate '{}' from {}",
            certificate.title(),
            path.display()
        );
        Ok(Self { certificate })
    }

    /// The certificate this resolver is scoped to.
    pub fn certificate(&self) -> &Arc<CertificateHandle> {
        &self.certificate
    }
}

impl CertificateResolver for FileCertificateResolver {
    fn resolve(&self, title: &str) -> SealResult<Arc<CertificateHandle>> {
        let own = self.certificate.title();
        if !titles_match(&own, title) {
            return Err(SealError::CertificateNotFound(format!(
                "certificate title '{own}' does not match requested title '{title}'"
            )));
        }
        Ok(Arc::clone(&self.certificate))
    }
}

/// Resolver searching directory-backed certificate stores in scope order.
///
/// Each store root holds PEM files (certificate plus optional private key).
/// Roots are searched in order and the first case-insensitive title match
/// wins; roots that do not exist on this machine are skipped.
pub struct StoreCertificateResolver {
    roots: Vec<PathBuf>,
}

impl StoreCertificateResolver {
    /// Searches the machine store, then the user store, for the store name
    /// resolved by [`store_name`](Self::store_name).
    pub fn new() -> Self {
        let name = Self::store_name();
        Self {
            roots: Self::default_roots(&name),
        }
    }

    /// Searches an explicit list of store directories in order.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Resolves the store name, in scope order: process environment
    /// variable, machine override file, user override file, fixed default.
    pub fn store_name() -> String {
        if let Ok(name) = std::env::var(CERT_STORE_ENV) {
            if !name.is_empty() {
                return name;
            }
        }
        let overrides = [
            Some(PathBuf::from("/etc/sealconf/certstore")),
            dirs::config_dir().map(|d| d.join("sealconf/certstore")),
        ];
        for path in overrides.into_iter().flatten() {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                let name = contents.trim();
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
        DEFAULT_CERT_STORE.to_string()
    }

    fn default_roots(store: &str) -> Vec<PathBuf> {
        let mut roots = vec![PathBuf::from("/etc/sealconf/stores").join(store)];
        if let Some(data) = dirs::data_dir() {
            roots.push(data.join("sealconf/stores").join(store));
        }
        roots
    }
}

impl Default for StoreCertificateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateResolver for StoreCertificateResolver {
    fn resolve(&self, title: &str) -> SealResult<Arc<CertificateHandle>> {
        for root in &self.roots {
            if !root.is_dir() {
                // Scope not present on this machine.
                continue;
            }
            let mut files: Vec<PathBuf> = std::fs::read_dir(root)
                .map_err(|e| {
                    SealError::MalformedSource(format!(
                        "cannot open store {}: {e}",
                        root.display()
                    ))
                })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            files.sort();

            for path in files {
                let handle = match CertificateHandle::from_pem_file(&path, None) {
                    Ok(handle) => handle,
                    Err(e) => {
                        warn!("skipping {}: {e}", path.display());
                        continue;
                    }
                };
                if titles_match(&handle.title(), title) {
                    debug!("resolved '{title}' from {}", path.display());
                    return Ok(Arc::new(handle));
                }
            }
        }
        Err(SealError::CertificateNotFound(format!(
            "no certificate titled '{title}' in any configured store"
        )))
    }
}
