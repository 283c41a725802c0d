// libs/notification-cell/src/services/webpush.rs
use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE},
    Client, StatusCode, Url,
};
use ring::{
    aead, agreement, hkdf,
    rand::{SecureRandom, SystemRandom},
    signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING},
};
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{PushError, PushSubscription};

const RECORD_SIZE: u32 = 4096;
const TAG_LEN: usize = 16;
const PUBLIC_KEY_LEN: usize = 65;
const AUTH_SECRET_LEN: usize = 16;
const SALT_LEN: usize = 16;
const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;
/// Largest plaintext that fits one record inside a 4096-byte push body.
pub const MAX_PAYLOAD_LEN: usize = RECORD_SIZE as usize - HEADER_LEN - TAG_LEN - 1;
const DEFAULT_TTL_SECS: u32 = 24 * 60 * 60;
const VAPID_EXPIRY_HOURS: i64 = 12;

/// Delivers an already-serialized message to one subscription.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError>;
}

// ==============================================================================
// KEY DERIVATION AND ENCRYPTION
// ==============================================================================

fn decode_key(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(raw.trim().trim_end_matches('='))
}

/// Output length for `hkdf::Prk::expand`.
struct OkmLen(usize);

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        self.0
    }
}

fn hkdf_expand(prk: &hkdf::Prk, info: &[&[u8]], out: &mut [u8]) -> Result<(), PushError> {
    prk.expand(info, OkmLen(out.len()))
        .and_then(|okm| okm.fill(out))
        .map_err(|_| PushError::Crypto("key derivation failed".to_string()))
}

struct ContentKeys {
    cek: [u8; 16],
    nonce: [u8; 12],
}

/// HKDF-SHA256 steps for aes128gcm push encryption: the ECDH secret is
/// mixed with the subscription's auth secret, then the salt yields the
/// content key and nonce.
fn derive_keys(
    shared_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<ContentKeys, PushError> {
    let prk_key = hkdf::Salt::new(hkdf::HKDF_SHA256, auth_secret).extract(shared_secret);
    let mut ikm = [0u8; 32];
    hkdf_expand(&prk_key, &[&b"WebPush: info\0"[..], ua_public, as_public], &mut ikm)?;

    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(&ikm);
    let mut keys = ContentKeys {
        cek: [0u8; 16],
        nonce: [0u8; 12],
    };
    hkdf_expand(&prk, &[&b"Content-Encoding: aes128gcm\0"[..]], &mut keys.cek)?;
    hkdf_expand(&prk, &[&b"Content-Encoding: nonce\0"[..]], &mut keys.nonce)?;
    Ok(keys)
}

fn seal_record(
    keys: &ContentKeys,
    salt: &[u8],
    as_public: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, PushError> {
    let unbound = aead::UnboundKey::new(&aead::AES_128_GCM, &keys.cek)
        .map_err(|_| PushError::Crypto("invalid content encryption key".to_string()))?;
    let key = aead::LessSafeKey::new(unbound);

    let mut record = Vec::with_capacity(plaintext.len() + 1 + TAG_LEN);
    record.extend_from_slice(plaintext);
    // last-record delimiter
    record.push(0x02);

    key.seal_in_place_append_tag(
        aead::Nonce::assume_unique_for_key(keys.nonce),
        aead::Aad::empty(),
        &mut record,
    )
    .map_err(|_| PushError::Crypto("encryption failed".to_string()))?;

    let mut body = Vec::with_capacity(HEADER_LEN + record.len());
    body.extend_from_slice(salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(as_public.len() as u8);
    body.extend_from_slice(as_public);
    body.extend_from_slice(&record);
    Ok(body)
}

/// Encrypts `plaintext` for one subscription as a single aes128gcm record,
/// using a fresh ephemeral key and salt per message.
pub fn encrypt_payload(
    subscription: &PushSubscription,
    plaintext: &[u8],
    rng: &SystemRandom,
) -> Result<Vec<u8>, PushError> {
    if plaintext.len() > MAX_PAYLOAD_LEN {
        return Err(PushError::PayloadTooLarge(plaintext.len()));
    }

    let ua_public = decode_key(&subscription.keys.p256dh)
        .map_err(|_| PushError::InvalidSubscription("p256dh no es base64 válido".to_string()))?;
    if ua_public.len() != PUBLIC_KEY_LEN {
        return Err(PushError::InvalidSubscription(format!(
            "p256dh debe tener {} bytes",
            PUBLIC_KEY_LEN
        )));
    }
    let auth_secret = decode_key(&subscription.keys.auth)
        .map_err(|_| PushError::InvalidSubscription("auth no es base64 válido".to_string()))?;
    if auth_secret.len() != AUTH_SECRET_LEN {
        return Err(PushError::InvalidSubscription(format!(
            "auth debe tener {} bytes",
            AUTH_SECRET_LEN
        )));
    }

    let as_private = agreement::EphemeralPrivateKey::generate(&agreement::ECDH_P256, rng)
        .map_err(|_| PushError::Crypto("could not generate ephemeral key".to_string()))?;
    let as_public = as_private
        .compute_public_key()
        .map_err(|_| PushError::Crypto("could not compute ephemeral public key".to_string()))?;

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| PushError::Crypto("could not generate salt".to_string()))?;

    let peer = agreement::UnparsedPublicKey::new(&agreement::ECDH_P256, &ua_public);
    let shared_secret = agreement::agree_ephemeral(as_private, &peer, |secret| secret.to_vec())
        .map_err(|_| PushError::InvalidSubscription("p256dh no es una clave P-256 válida".to_string()))?;

    let keys = derive_keys(&shared_secret, &auth_secret, &ua_public, as_public.as_ref(), &salt)?;
    seal_record(&keys, &salt, as_public.as_ref(), plaintext)
}

// ==============================================================================
// VAPID
// ==============================================================================

/// Signs ES256 VAPID tokens identifying this application server.
pub struct VapidSigner {
    key_pair: EcdsaKeyPair,
    public_key: String,
    subject: String,
    rng: SystemRandom,
}

impl fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidSigner")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl VapidSigner {
    /// Accepts the raw 32-byte private scalar with its 65-byte public point,
    /// or a PKCS#8 document in place of the scalar.
    pub fn from_base64(public_key: &str, private_key: &str, subject: &str) -> Result<Self, PushError> {
        let public = decode_key(public_key)
            .map_err(|_| PushError::InvalidKey("la clave pública no es base64 válido".to_string()))?;
        let private = decode_key(private_key)
            .map_err(|_| PushError::InvalidKey("la clave privada no es base64 válido".to_string()))?;

        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_private_key_and_public_key(
            &ECDSA_P256_SHA256_FIXED_SIGNING,
            &private,
            &public,
            &rng,
        )
        .or_else(|_| EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &private, &rng))
        .map_err(|e| PushError::InvalidKey(e.to_string()))?;

        Ok(Self::with_key_pair(key_pair, subject, rng))
    }

    pub fn from_pkcs8(pkcs8: &[u8], subject: &str) -> Result<Self, PushError> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
            .map_err(|e| PushError::InvalidKey(e.to_string()))?;
        Ok(Self::with_key_pair(key_pair, subject, rng))
    }

    fn with_key_pair(key_pair: EcdsaKeyPair, subject: &str, rng: SystemRandom) -> Self {
        let public_key = URL_SAFE_NO_PAD.encode(key_pair.public_key().as_ref());
        Self {
            key_pair,
            public_key,
            subject: subject.to_string(),
            rng,
        }
    }

    /// URL-safe base64 public key, the browser's `applicationServerKey`.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// `Authorization` header value for a request to `endpoint`.
    pub fn authorization(&self, endpoint: &str) -> Result<String, PushError> {
        let url = Url::parse(endpoint).map_err(|e| PushError::InvalidSubscription(e.to_string()))?;
        let audience = url.origin().ascii_serialization();
        let expires = Utc::now() + Duration::hours(VAPID_EXPIRY_HOURS);

        let header = URL_SAFE_NO_PAD.encode(json!({ "typ": "JWT", "alg": "ES256" }).to_string());
        let claims = URL_SAFE_NO_PAD.encode(
            json!({
                "aud": audience,
                "exp": expires.timestamp(),
                "sub": self.subject,
            })
            .to_string(),
        );

        let signing_input = format!("{}.{}", header, claims);
        let signature = self
            .key_pair
            .sign(&self.rng, signing_input.as_bytes())
            .map_err(|_| PushError::Crypto("could not sign VAPID token".to_string()))?;

        Ok(format!(
            "vapid t={}.{}, k={}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.as_ref()),
            self.public_key
        ))
    }
}

// ==============================================================================
// SENDERS
// ==============================================================================

#[derive(Clone)]
pub struct WebPushSender {
    client: Client,
    vapid: Arc<VapidSigner>,
    ttl_secs: u32,
    rng: SystemRandom,
}

impl WebPushSender {
    pub fn new(vapid: VapidSigner, timeout: StdDuration) -> Result<Self, PushError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            vapid: Arc::new(vapid),
            ttl_secs: DEFAULT_TTL_SECS,
            rng: SystemRandom::new(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PushError> {
        if !config.is_push_configured() {
            return Err(PushError::NotConfigured);
        }
        let vapid = VapidSigner::from_base64(
            &config.vapid_public_key,
            &config.vapid_private_key,
            &config.vapid_subject,
        )?;
        Self::new(vapid, config.request_timeout())
    }

    pub fn with_ttl(mut self, ttl_secs: u32) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn public_key(&self) -> &str {
        self.vapid.public_key()
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError> {
        let body = encrypt_payload(subscription, payload, &self.rng)?;
        let authorization = self.vapid.authorization(&subscription.endpoint)?;

        let response = self
            .client
            .post(&subscription.endpoint)
            .header(AUTHORIZATION, authorization)
            .header("TTL", self.ttl_secs.to_string())
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Push accepted with status {}", status.as_u16());
            return Ok(());
        }

        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(PushError::SubscriptionGone(status.as_u16())),
            _ => {
                let message = response.text().await.unwrap_or_default();
                warn!("Push service rejected message: {} {}", status.as_u16(), message);
                Err(PushError::Delivery {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// Stand-in used when VAPID keys are missing; every send fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredSender;

#[async_trait]
impl PushSender for UnconfiguredSender {
    async fn send(&self, _subscription: &PushSubscription, _payload: &[u8]) -> Result<(), PushError> {
        Err(PushError::NotConfigured)
    }
}
