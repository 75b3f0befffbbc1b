//! Request signing.
//!
//! [`Sauthc1Signer`] implements the `SAuthc1` digest scheme: a canonical form of
//! the request is hashed with SHA-256 and signed with an HMAC-SHA-256 key
//! derived from the API key secret, the request date and a random nonce.
//!
//! The signed request carries three headers:
//!
//! - `Host`
//! - `X-Stormpath-Date` in `yyyyMMdd'T'HHmmss'Z'` form
//! - `Authorization: SAuthc1 sauthc1Id=..., sauthc1SignedHeaders=..., sauthc1Signature=...`

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::config::ApiKeyCredentials;
use crate::http::errors::TransportError;
use crate::http::request::Request;

type HmacSha256 = Hmac<Sha256>;

/// Header holding the signing timestamp.
pub const DATE_HEADER: &str = "X-Stormpath-Date";

const ALGORITHM: &str = "HMAC-SHA-256";
const AUTHENTICATION_SCHEME: &str = "SAuthc1";
const ID_TERMINATOR: &str = "sauthc1_request";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const DATE_FORMAT: &str = "%Y%m%d";

/// Adds authentication to an outgoing request.
///
/// Implementations are called once per attempt, including retries and
/// redirects, so every attempt carries a fresh signature.
pub trait RequestSigner: Send + Sync {
    /// Signs `request` in place.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Signing`] if the signature cannot be computed.
    fn sign(&self, request: &mut Request) -> Result<(), TransportError>;
}

/// The default `SAuthc1` signer.
#[derive(Clone, Debug)]
pub struct Sauthc1Signer {
    credentials: ApiKeyCredentials,
}

impl Sauthc1Signer {
    /// Creates a signer for `credentials`.
    #[must_use]
    pub const fn new(credentials: ApiKeyCredentials) -> Self {
        Self { credentials }
    }

    /// Signs `request` as of `now` with an explicit `nonce`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Signing`] if the HMAC key cannot be created.
    pub fn sign_at(
        &self,
        request: &mut Request,
        now: DateTime<Utc>,
        nonce: &str,
    ) -> Result<(), TransportError> {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let date_stamp = now.format(DATE_FORMAT).to_string();

        request.headers.remove("Authorization");
        let host = request.uri.authority().to_string();
        request.headers.set("Host", host);
        request.headers.set(DATE_HEADER, timestamp.as_str());

        let (canonical_headers, signed_headers) = canonical_headers(request);
        let payload_hash = hex::encode(Sha256::digest(
            request.body.as_deref().unwrap_or_default().as_bytes(),
        ));

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method,
            canonical_path(request.uri.path()),
            request.uri.query(),
            canonical_headers,
            signed_headers,
            payload_hash
        );
        tracing::trace!(canonical_request = %canonical_request, "SAuthc1 canonical request");

        let id = format!(
            "{}/{date_stamp}/{nonce}/{ID_TERMINATOR}",
            self.credentials.id().as_ref()
        );

        let string_to_sign = format!(
            "{ALGORITHM}\n{timestamp}\n{id}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let secret = format!("{AUTHENTICATION_SCHEME}{}", self.credentials.secret().as_ref());
        let date_key = hmac(secret.as_bytes(), date_stamp.as_bytes())?;
        let nonce_key = hmac(&date_key, nonce.as_bytes())?;
        let signing_key = hmac(&nonce_key, ID_TERMINATOR.as_bytes())?;
        let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes())?);

        request.headers.set(
            "Authorization",
            format!(
                "{AUTHENTICATION_SCHEME} sauthc1Id={id}, sauthc1SignedHeaders={signed_headers}, sauthc1Signature={signature}"
            ),
        );
        Ok(())
    }
}

impl RequestSigner for Sauthc1Signer {
    fn sign(&self, request: &mut Request) -> Result<(), TransportError> {
        self.sign_at(request, Utc::now(), &random_nonce())
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| TransportError::Signing {
        reason: e.to_string(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn canonical_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Returns the canonical header block and the `;`-joined signed header names.
fn canonical_headers(request: &Request) -> (String, String) {
    let mut block = String::new();
    let mut names = Vec::new();
    for (name, values) in request.headers.iter() {
        if name == "authorization" {
            continue;
        }
        block.push_str(name);
        block.push(':');
        block.push_str(&values.join(","));
        block.push('\n');
        names.push(name);
    }
    (block, names.join(";"))
}

/// A random version-4 style UUID string.
fn random_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

// Internal hex encoding since we don't want to add another dependency
mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut result = String::with_capacity(bytes.len() * 2);
        for &byte in bytes {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::HttpMethod;
    use crate::http::uri::CanonicalUri;
    use chrono::TimeZone;

    fn signer() -> Sauthc1Signer {
        Sauthc1Signer::new(ApiKeyCredentials::new("MyId", "Shush!").unwrap())
    }

    fn request() -> Request {
        Request::new(
            HttpMethod::Get,
            CanonicalUri::parse("https://api.example.com/v1/accounts?limit=25"),
        )
        .with_header("Accept", "application/json")
    }

    #[test]
    fn test_sign_sets_host_date_and_authorization() {
        let mut request = request();
        let now = Utc.with_ymd_and_hms(2013, 7, 1, 0, 0, 0).unwrap();
        signer().sign_at(&mut request, now, "a43a9d25-ab06-421e-8605-33fd1e760825").unwrap();

        assert_eq!(request.headers.get("host"), Some("api.example.com"));
        assert_eq!(request.headers.get(DATE_HEADER), Some("20130701T000000Z"));

        let authorization = request.headers.get("Authorization").unwrap();
        assert!(authorization.starts_with(
            "SAuthc1 sauthc1Id=MyId/20130701/a43a9d25-ab06-421e-8605-33fd1e760825/sauthc1_request, "
        ));
        assert!(authorization.contains("sauthc1SignedHeaders=accept;host;x-stormpath-date, "));

        let signature = authorization.rsplit("sauthc1Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_is_deterministic_for_fixed_inputs() {
        let now = Utc.with_ymd_and_hms(2013, 7, 1, 0, 0, 0).unwrap();
        let mut first = request();
        let mut second = request();
        signer().sign_at(&mut first, now, "nonce").unwrap();
        signer().sign_at(&mut second, now, "nonce").unwrap();
        assert_eq!(
            first.headers.get("Authorization"),
            second.headers.get("Authorization")
        );
    }

    #[test]
    fn test_signature_changes_with_body() {
        let now = Utc.with_ymd_and_hms(2013, 7, 1, 0, 0, 0).unwrap();
        let mut empty = request();
        let mut with_body = request().with_body(r#"{"givenName":"Jean"}"#);
        signer().sign_at(&mut empty, now, "nonce").unwrap();
        signer().sign_at(&mut with_body, now, "nonce").unwrap();
        assert_ne!(
            empty.headers.get("Authorization"),
            with_body.headers.get("Authorization")
        );
    }

    #[test]
    fn test_resigning_replaces_previous_authorization() {
        let mut request = request();
        signer().sign(&mut request).unwrap();
        signer().sign(&mut request).unwrap();
        assert_eq!(request.headers.get_all("Authorization").len(), 1);
        assert!(!request
            .headers
            .get("Authorization")
            .unwrap()
            .contains("sauthc1SignedHeaders=accept;authorization"));
    }

    #[test]
    fn test_random_nonce_is_uuid_shaped() {
        let nonce = random_nonce();
        assert_eq!(nonce.len(), 36);
        assert_eq!(nonce.matches('-').count(), 4);
        assert_ne!(random_nonce(), nonce);
    }
}
