//! Onboarding token broker.
//!
//! Two small cryptographic duties, both local and stateless:
//!
//! 1. **Provider signature verification** — the payment provider signs
//!    `"{subscription_id}.{payment_id}"` with a shared secret
//!    (HMAC-SHA256, hex). Verification failures are uniform: the caller
//!    learns only `invalid_signature`, never which part mismatched.
//! 2. **Capability token mint/decode** — a short-lived JWT binding the
//!    verified (subscription, payment, plan) triple. Possession of an
//!    unexpired token is the sole authority to register an organization;
//!    single-use is enforced downstream by the UNIQUE subscription_id.

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use vendra_core::{CoreError, CoreResult, PlanTier};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Provider Signature
// =============================================================================

/// Computes the provider signature for a subscription/payment pair.
///
/// Exposed so tests (and provider simulators) can produce valid signatures.
pub fn sign_provider_payload(subscription_id: &str, payment_id: &str, secret: &str) -> String {
    let payload = format!("{subscription_id}.{payment_id}");

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a payment-provider signature.
///
/// Any failure (wrong length, non-hex, mismatch) collapses into the same
/// [`CoreError::InvalidSignature`].
pub fn verify_provider_signature(
    subscription_id: &str,
    payment_id: &str,
    secret: &str,
    signature: &str,
) -> CoreResult<()> {
    let expected = sign_provider_payload(subscription_id, payment_id, secret);
    let provided = signature.trim().to_lowercase();

    if constant_time_compare(expected.as_bytes(), provided.as_bytes()) {
        Ok(())
    } else {
        Err(CoreError::InvalidSignature)
    }
}

/// Byte comparison that does not short-circuit on the first mismatch.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// =============================================================================
// Capability Token
// =============================================================================

/// Claims carried by an onboarding token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingClaims {
    /// Subject (subscription_id)
    pub sub: String,

    /// Provider payment that proved the subscription
    pub payment_id: String,

    /// Plan tier purchased
    pub plan: PlanTier,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// Mints and decodes onboarding tokens.
pub struct TokenBroker {
    secret: String,
    lifetime_secs: i64,
}

impl TokenBroker {
    /// Creates a new token broker.
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        TokenBroker {
            secret,
            lifetime_secs,
        }
    }

    /// Mints an onboarding token for a verified subscription.
    pub fn mint(
        &self,
        subscription_id: &str,
        payment_id: &str,
        plan: PlanTier,
    ) -> CoreResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = OnboardingClaims {
            sub: subscription_id.to_string(),
            payment_id: payment_id.to_string(),
            plan,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| CoreError::InvalidToken)
    }

    /// Validates and decodes an onboarding token.
    ///
    /// Expiry is checked here; malformed, tampered, and expired tokens all
    /// collapse into [`CoreError::InvalidToken`].
    pub fn decode(&self, token: &str) -> CoreResult<OnboardingClaims> {
        let token_data: TokenData<OnboardingClaims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| CoreError::InvalidToken)?;

        Ok(token_data.claims)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
