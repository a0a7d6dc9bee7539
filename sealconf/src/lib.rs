//! Transparently decrypted configuration.
//!
//! Configuration values can be stored encrypted at rest as envelopes of the
//! form `{Enc:<title>:<base64 ciphertext>}`, addressed to a named X.509
//! certificate. The overlay provider scans an upstream configuration source
//! for envelopes, decrypts them with the certificate's RSA private key
//! (OAEP with SHA-256), and serves a merged view in which decrypted values
//! shadow the originals while every other key falls through unchanged.
//! When the upstream source changes, the overlay rebuilds its snapshot and
//! notifies downstream observers.
//!
//! # Architecture
//!
//! - [`cert`]: certificate handles and title derivation
//! - [`resolver`]: title-to-certificate lookup, file- and store-backed
//! - [`envelope`]: the envelope wire format and RSA-OAEP codec
//! - [`source`]: the minimal upstream configuration surface
//! - [`overlay`]: the snapshot/reload state machine
//!
//! Key lifecycle, rotation policy and certificate issuance are out of
//! scope; already-provisioned certificates are consumed by name.

pub mod cert;
pub mod envelope;
pub mod error;
pub mod overlay;
pub mod resolver;
pub mod source;

pub use cert::{normalize_title, CertificateHandle};
pub use envelope::{EnvelopeCodec, ENVELOPE_PREFIX, ENVELOPE_SUFFIX};
pub use error::{SealError, SealResult};
pub use overlay::OverlayProvider;
pub use resolver::{
    CertificateResolver, FileCertificateResolver, StoreCertificateResolver, CERT_STORE_ENV,
    DEFAULT_CERT_STORE,
};
pub use source::{ChangeCallback, ConfigSource, MemorySource};
