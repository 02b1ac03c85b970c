//! OCI HTTP Signature (version 1, `rsa-sha256`) request signing.

use super::ApiError;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("private key is neither PKCS#8 nor PKCS#1 PEM: {0}")]
    InvalidKey(String),
}

/// Signs outgoing requests with an API signing key.
pub struct RequestSigner {
    key_id: String,
    signing_key: SigningKey<Sha256>,
}

impl RequestSigner {
    /// `key_id` is `<tenancy ocid>/<user ocid>/<key fingerprint>`.
    pub fn new(key_id: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key: SigningKey::<Sha256>::new(private_key),
        }
    }

    /// Load an unencrypted PEM key in either `BEGIN PRIVATE KEY` or
    /// `BEGIN RSA PRIVATE KEY` form.
    pub fn from_pem(key_id: impl Into<String>, pem: &str) -> Result<Self, SignerError> {
        let private_key = match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(key) => key,
            Err(pkcs8_err) => RsaPrivateKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
                SignerError::InvalidKey(format!("pkcs8: {}; pkcs1: {}", pkcs8_err, pkcs1_err))
            })?,
        };
        Ok(Self::new(key_id, private_key))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Build the `Authorization` header value for a request.
    ///
    /// `headers` must hold lowercase names in the order they are signed.
    pub fn authorization(
        &self,
        method: &str,
        path_and_query: &str,
        headers: &[(&'static str, String)],
    ) -> Result<String, ApiError> {
        let signing_string = signing_string(method, path_and_query, headers);
        let signature = self
            .signing_key
            .try_sign(signing_string.as_bytes())
            .map_err(|e| ApiError::Signing(e.to_string()))?;

        let header_names = std::iter::once("(request-target)")
            .chain(headers.iter().map(|(name, _)| *name))
            .collect::<Vec<_>>()
            .join(" ");

        Ok(format!(
            "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            header_names,
            BASE64_STANDARD.encode(signature.to_bytes())
        ))
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// The newline-joined `name: value` lines that get signed.
pub fn signing_string(
    method: &str,
    path_and_query: &str,
    headers: &[(&'static str, String)],
) -> String {
    let mut lines = Vec::with_capacity(headers.len() + 1);
    lines.push(format!(
        "(request-target): {} {}",
        method.to_lowercase(),
        path_and_query
    ));
    for (name, value) in headers {
        lines.push(format!("{}: {}", name, value));
    }
    lines.join("\n")
}
