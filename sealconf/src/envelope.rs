//! The envelope wire format and RSA-OAEP codec.
//!
//! An envelope is the substring `{Enc:<title>:<base64 ciphertext>}`. A
//! configuration value may interleave any number of envelopes with plain
//! text. Scanning is an explicit parser rather than a backtracking pattern:
//! prefix literal, title up to the first `:`, then ciphertext up to the
//! first `}`. Neither segment supports escaping; generated titles have
//! their colons normalized away instead.

use crate::cert::CertificateHandle;
use crate::error::{SealError, SealResult};
use crate::resolver::CertificateResolver;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;
use std::sync::Arc;

/// Literal opening an envelope.
pub const ENVELOPE_PREFIX: &str = "{Enc:";

/// Literal closing an envelope.
pub const ENVELOPE_SUFFIX: &str = "}";

/// Stateless encoder/decoder bound to a certificate resolver.
pub struct EnvelopeCodec {
    resolver: Arc<dyn CertificateResolver>,
}

impl EnvelopeCodec {
    pub fn new(resolver: Arc<dyn CertificateResolver>) -> Self {
        Self { resolver }
    }

    /// Encrypts `plaintext` to the certificate's public key and wraps the
    /// ciphertext in an envelope addressed to the certificate's title.
    ///
    /// OAEP is randomized: two calls with identical inputs produce
    /// different ciphertext. Callers must not assume repeatable output.
    pub fn encode(&self, plaintext: &str, certificate: &CertificateHandle) -> SealResult<String> {
        let ciphertext = certificate
            .public_key()
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
            .map_err(|e| SealError::Encryption(e.to_string()))?;
        Ok(format!(
            "{ENVELOPE_PREFIX}{}:{}{ENVELOPE_SUFFIX}",
            certificate.title(),
            BASE64.encode(ciphertext)
        ))
    }

    /// Replaces every envelope in `input` with its decrypted plaintext,
    /// preserving the surrounding text verbatim.
    ///
    /// A string with no envelopes comes back unchanged, so callers can
    /// compare input and output to detect that nothing was encrypted. Any
    /// failure while processing a match aborts the whole call; there is no
    /// partial substitution.
    pub fn decode_or_passthrough(&self, input: &str) -> SealResult<String> {
        // Shorter than the header, cannot contain an envelope. A string
        // equal to just the prefix is never treated as one.
        if input.len() <= ENVELOPE_PREFIX.len() {
            return Ok(input.to_string());
        }

        let mut output = String::with_capacity(input.len());
        let mut cursor = 0;
        while let Some(found) = input[cursor..].find(ENVELOPE_PREFIX) {
            let start = cursor + found;
            match parse_envelope(&input[start..]) {
                Some(envelope) => {
                    output.push_str(&input[cursor..start]);
                    output.push_str(&self.decrypt_match(envelope.title, envelope.ciphertext)?);
                    cursor = start + envelope.len;
                }
                None => {
                    // Incomplete candidate: emit the brace and rescan from
                    // the next character.
                    output.push_str(&input[cursor..=start]);
                    cursor = start + 1;
                }
            }
        }
        output.push_str(&input[cursor..]);
        Ok(output)
    }

    fn decrypt_match(&self, title: &str, ciphertext_b64: &str) -> SealResult<String> {
        let ciphertext = BASE64.decode(ciphertext_b64)?;
        let certificate = self.resolver.resolve(title)?;
        let Some(private_key) = certificate.private_key() else {
            return Err(SealError::NoPrivateKey {
                subject: certificate.subject().to_string(),
                thumbprint: certificate.thumbprint().to_string(),
            });
        };
        let plaintext = private_key
            .decrypt(Oaep::new::<Sha256>(), &ciphertext)
            .map_err(|e| SealError::Decryption(e.to_string()))?;
        Ok(String::from_utf8(plaintext)?)
    }
}

/// One scanned envelope: borrowed title and ciphertext segments plus the
/// total matched length including delimiters.
struct ScannedEnvelope<'a> {
    title: &'a str,
    ciphertext: &'a str,
    len: usize,
}

/// Matches an envelope at the start of `input`, which must begin with the
/// prefix literal. Returns `None` when the title or ciphertext segment
/// never terminates.
fn parse_envelope(input: &str) -> Option<ScannedEnvelope<'_>> {
    let rest = &input[ENVELOPE_PREFIX.len()..];
    let colon = rest.find(':')?;
    let body = &rest[colon + 1..];
    let end = body.find(ENVELOPE_SUFFIX)?;
    Some(ScannedEnvelope {
        title: &rest[..colon],
        ciphertext: &body[..end],
        len: ENVELOPE_PREFIX.len() + colon + 1 + end + ENVELOPE_SUFFIX.len(),
    })
}
