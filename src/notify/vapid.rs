//! VAPID authentication for Web Push (RFC 8292).
//!
//! Builds the per-endpoint `Authorization: vapid t=<jwt>, k=<key>`
//! header the push service uses to verify the application server.
//! Keys are P-256 ECDSA: the private key is the raw 32-byte scalar
//! and the public key the 65-byte uncompressed SEC1 point, both
//! base64url without padding (the format browsers expect for
//! `applicationServerKey`).

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL};
use chrono::Utc;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use url::Url;

/// Lifetime of the signed token. Push services reject anything over
/// 24 hours; RFC 8292 recommends staying well under it.
const TOKEN_EXPIRY_SECS: i64 = 12 * 60 * 60;

/// `TTL` header value: how long the push service holds a message for
/// an offline client before dropping it.
const MESSAGE_TTL_SECS: u32 = 86_400;

/// A VAPID keypair in the encoding shared with browsers.
#[derive(Debug, Serialize, Deserialize)]
pub struct VapidKeys {
    /// Raw 32-byte P-256 private key scalar (base64url).
    private_key_b64: String,
    /// Uncompressed public key point (base64url, 65 bytes decoded).
    public_key_b64: String,
}

impl VapidKeys {
    /// Generate a fresh VAPID keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        // SEC1 uncompressed public key (65 bytes: 0x04 || x || y)
        let public_bytes = verifying_key.to_encoded_point(false);

        Self {
            private_key_b64: BASE64URL.encode(signing_key.to_bytes().as_slice()),
            public_key_b64: BASE64URL.encode(public_bytes.as_bytes()),
        }
    }

    /// Reconstruct a keypair from its base64url encodings, validating
    /// both halves. Malformed key material is a configuration error
    /// and fails here rather than at delivery time.
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self> {
        let pub_bytes = BASE64URL
            .decode(public_key_b64)
            .context("Invalid base64url for VAPID public key")?;
        anyhow::ensure!(
            pub_bytes.len() == 65 && pub_bytes[0] == 0x04,
            "VAPID public key must be a 65-byte uncompressed P-256 point"
        );

        let priv_bytes = BASE64URL
            .decode(private_key_b64)
            .context("Invalid base64url for VAPID private key")?;
        anyhow::ensure!(
            priv_bytes.len() == 32,
            "VAPID private key must be a 32-byte P-256 scalar, got {} bytes",
            priv_bytes.len()
        );
        SigningKey::from_bytes(priv_bytes.as_slice().into())
            .context("VAPID private key is not a valid P-256 scalar")?;

        Ok(Self {
            private_key_b64: private_key_b64.to_string(),
            public_key_b64: public_key_b64.to_string(),
        })
    }

    /// Base64url-encoded public key, as sent to browsers for
    /// `applicationServerKey` and in the `k=` header parameter.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    /// Base64url-encoded raw private key scalar.
    pub fn private_key_base64url(&self) -> &str {
        &self.private_key_b64
    }
}

/// Header set for a single push service request.
#[derive(Debug)]
pub struct VapidHeaders {
    pub authorization: String,
    pub ttl: String,
    pub content_type: String,
}

/// Signs endpoint-scoped authorization tokens. Built once from
/// configuration and shared across deliveries; tokens themselves are
/// recomputed fresh for every attempt since the audience differs per
/// push service.
pub struct VapidSigner {
    signing_key: SigningKey,
    public_key_b64: String,
    subject: String,
}

impl VapidSigner {
    pub fn new(public_key_b64: &str, private_key_b64: &str, contact: &str) -> Result<Self> {
        let keys = VapidKeys::from_base64url(public_key_b64, private_key_b64)?;
        let priv_bytes = BASE64URL
            .decode(keys.private_key_base64url())
            .context("Invalid base64url for VAPID private key")?;
        let signing_key = SigningKey::from_bytes(priv_bytes.as_slice().into())
            .context("VAPID private key is not a valid P-256 scalar")?;

        // The sub claim must be a contact URI for the operator
        let subject = if contact.starts_with("mailto:") || contact.starts_with("https://") {
            contact.to_string()
        } else {
            format!("mailto:{contact}")
        };

        Ok(Self {
            signing_key,
            public_key_b64: keys.public_key_base64url().to_string(),
            subject,
        })
    }

    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    /// Sign a token scoped to the push service behind `endpoint`.
    ///
    /// The audience is the endpoint's origin only (scheme + host,
    /// path stripped): the token proves identity to the push service,
    /// not to one registration. Expiry is 12 hours from now at the
    /// moment of signing.
    pub fn sign_for(&self, endpoint: &str) -> Result<VapidHeaders> {
        let url = Url::parse(endpoint)
            .with_context(|| format!("Push endpoint is not an absolute URL: {endpoint}"))?;
        anyhow::ensure!(
            url.has_host(),
            "Push endpoint has no host: {endpoint}"
        );
        let audience = url.origin().ascii_serialization();

        let header = BASE64URL.encode(br#"{"alg":"ES256","typ":"JWT"}"#);
        let claims = serde_json::json!({
            "aud": audience,
            "exp": Utc::now().timestamp() + TOKEN_EXPIRY_SECS,
            "sub": self.subject,
        });
        let claims = BASE64URL.encode(serde_json::to_vec(&claims)?);

        // ES256 over the two joined segments, raw (r, s) signature
        let signing_input = format!("{header}.{claims}");
        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());
        let token = format!("{signing_input}.{}", BASE64URL.encode(signature.to_bytes()));

        Ok(VapidHeaders {
            authorization: format!("vapid t={token}, k={}", self.public_key_b64),
            ttl: MESSAGE_TTL_SECS.to_string(),
            content_type: "application/json".to_string(),
        })
    }
}
