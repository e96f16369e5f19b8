//! Web Push delivery with VAPID authentication.
//!
//! [`WebPushDelivery`] POSTs a JSON-encoded [`PushPayload`] to a browser push
//! subscription endpoint. Every request carries a VAPID JWT signed with
//! ES256, scoped (`aud`) to the origin of the endpoint and valid for 12
//! hours. The payload is sent as plain JSON; it is not content-encrypted.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use obra_core::push::{NotificationKind, PushPayload, PUSH_TTL_SECS};
use obra_db::models::push_subscription::PushSubscription;
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// HTTP request timeout for a single delivery.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifetime of a VAPID token.
const VAPID_TOKEN_TTL_SECS: i64 = 12 * 3600;

/// Default `sub` claim when `VAPID_SUBJECT` is not set.
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@example.com";

/// Length of a raw P-256 private scalar.
const PRIVATE_KEY_LEN: usize = 32;

/// Length of an uncompressed SEC1 P-256 public point (`0x04 || X || Y`).
const PUBLIC_KEY_LEN: usize = 65;

/// PKCS#8 `PrivateKeyInfo` header for a P-256 key, up to and including the
/// OCTET STRING tag of the private scalar.
const PKCS8_PRIVATE_PREFIX: [u8; 36] = [
    0x30, 0x81, 0x87, 0x02, 0x01, 0x00, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02,
    0x01, 0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x04, 0x6d, 0x30, 0x6b, 0x02,
    0x01, 0x01, 0x04, 0x20,
];

/// `[1] publicKey BIT STRING` header that precedes the public point.
const PKCS8_PUBLIC_PREFIX: [u8; 5] = [0xa1, 0x44, 0x03, 0x42, 0x00];

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for push delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The configured VAPID key pair is malformed.
    #[error("Invalid VAPID key: {0}")]
    InvalidKey(String),

    /// Signing the VAPID token failed.
    #[error("VAPID signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The subscription endpoint is not an absolute http(s) URL.
    #[error("Invalid push endpoint '{0}'")]
    InvalidEndpoint(String),
}

// ---------------------------------------------------------------------------
// VapidConfig
// ---------------------------------------------------------------------------

/// VAPID key pair and contact subject.
#[derive(Clone)]
pub struct VapidConfig {
    /// Uncompressed P-256 public key, base64url. Handed to browsers as the
    /// `applicationServerKey`.
    pub public_key: String,
    /// Raw 32-byte P-256 private scalar, base64url.
    pub private_key: String,
    /// Contact URI placed in the `sub` claim.
    pub subject: String,
}

impl VapidConfig {
    /// Load the key pair from environment variables.
    ///
    /// Returns `None` if either key is missing.
    ///
    /// | Variable            | Required | Default                    |
    /// |---------------------|----------|----------------------------|
    /// | `VAPID_PUBLIC_KEY`  | yes      | -                          |
    /// | `VAPID_PRIVATE_KEY` | yes      | -                          |
    /// | `VAPID_SUBJECT`     | no       | `mailto:admin@example.com` |
    pub fn from_env() -> Option<Self> {
        Some(Self {
            public_key: std::env::var("VAPID_PUBLIC_KEY").ok()?,
            private_key: std::env::var("VAPID_PRIVATE_KEY").ok()?,
            subject: std::env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| DEFAULT_VAPID_SUBJECT.to_string()),
        })
    }
}

impl fmt::Debug for VapidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidConfig")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("subject", &self.subject)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// VapidSigner
// ---------------------------------------------------------------------------

/// Claims of a VAPID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapidClaims {
    /// Origin of the push service (`scheme://host[:port]`).
    pub aud: String,
    /// Expiry as a Unix timestamp.
    pub exp: i64,
    /// Contact URI of the application server.
    pub sub: String,
}

/// Signs VAPID tokens with the configured key pair.
#[derive(Clone)]
pub struct VapidSigner {
    encoding_key: EncodingKey,
    public_key: String,
    subject: String,
}

impl VapidSigner {
    /// Build a signer, validating the key pair encoding up front.
    pub fn new(config: &VapidConfig) -> Result<Self, PushError> {
        let private = decode_key(&config.private_key, "private")?;
        if private.len() != PRIVATE_KEY_LEN {
            return Err(PushError::InvalidKey(format!(
                "private key must be {PRIVATE_KEY_LEN} bytes, got {}",
                private.len()
            )));
        }

        let public = decode_key(&config.public_key, "public")?;
        if public.len() != PUBLIC_KEY_LEN || public[0] != 0x04 {
            return Err(PushError::InvalidKey(
                "public key must be an uncompressed P-256 point".to_string(),
            ));
        }

        let mut der = Vec::with_capacity(
            PKCS8_PRIVATE_PREFIX.len() + PRIVATE_KEY_LEN + PKCS8_PUBLIC_PREFIX.len() + PUBLIC_KEY_LEN,
        );
        der.extend_from_slice(&PKCS8_PRIVATE_PREFIX);
        der.extend_from_slice(&private);
        der.extend_from_slice(&PKCS8_PUBLIC_PREFIX);
        der.extend_from_slice(&public);

        Ok(Self {
            encoding_key: EncodingKey::from_ec_der(&der),
            public_key: config.public_key.trim_end_matches('=').to_string(),
            subject: config.subject.clone(),
        })
    }

    /// The base64url public key, as sent in the `k=` parameter.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Sign a token for `endpoint`, expiring 12 hours from now.
    pub fn sign(&self, endpoint: &str) -> Result<String, PushError> {
        let claims = VapidClaims {
            aud: endpoint_origin(endpoint)?,
            exp: chrono::Utc::now().timestamp() + VAPID_TOKEN_TTL_SECS,
            sub: self.subject.clone(),
        };
        Ok(encode(&Header::new(Algorithm::ES256), &claims, &self.encoding_key)?)
    }

    /// The `Authorization` header value for a request to `endpoint`.
    pub fn authorization(&self, endpoint: &str) -> Result<String, PushError> {
        let token = self.sign(endpoint)?;
        Ok(format!("vapid t={token}, k={}", self.public_key))
    }
}

impl fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidSigner")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Decode a base64url key, tolerating trailing padding.
fn decode_key(value: &str, which: &str) -> Result<Vec<u8>, PushError> {
    URL_SAFE_NO_PAD
        .decode(value.trim().trim_end_matches('='))
        .map_err(|e| PushError::InvalidKey(format!("{which} key is not base64url: {e}")))
}

/// The `scheme://host[:port]` origin of a push endpoint.
pub fn endpoint_origin(endpoint: &str) -> Result<String, PushError> {
    let url = Url::parse(endpoint).map_err(|_| PushError::InvalidEndpoint(endpoint.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(PushError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(url.origin().ascii_serialization())
}

// ---------------------------------------------------------------------------
// Delivery outcome
// ---------------------------------------------------------------------------

/// How the push service answered a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Accepted for delivery.
    Sent,
    /// The subscription no longer exists and should be deleted.
    Gone,
    /// Any other status. The subscription is kept.
    Rejected(u16),
}

impl DeliveryOutcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 | 201 => DeliveryOutcome::Sent,
            404 | 410 => DeliveryOutcome::Gone,
            other => DeliveryOutcome::Rejected(other),
        }
    }
}

// ---------------------------------------------------------------------------
// PushSender
// ---------------------------------------------------------------------------

/// Sends one payload to one subscription, returning the HTTP status the push
/// service answered with.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
        kind: NotificationKind,
    ) -> Result<u16, PushError>;
}

// ---------------------------------------------------------------------------
// WebPushDelivery
// ---------------------------------------------------------------------------

/// Delivers notifications to browser push services.
pub struct WebPushDelivery {
    client: reqwest::Client,
    signer: VapidSigner,
}

impl WebPushDelivery {
    /// Create a delivery service with a pre-configured HTTP client.
    pub fn new(signer: VapidSigner) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, signer }
    }

    pub fn signer(&self) -> &VapidSigner {
        &self.signer
    }
}

#[async_trait]
impl PushSender for WebPushDelivery {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
        kind: NotificationKind,
    ) -> Result<u16, PushError> {
        let authorization = self.signer.authorization(&subscription.endpoint)?;

        let response = self
            .client
            .post(&subscription.endpoint)
            .header(AUTHORIZATION, authorization)
            .header("TTL", PUSH_TTL_SECS.to_string())
            .header("Urgency", kind.urgency())
            .json(payload)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
