//! API key secret encryption.
//!
//! API key secrets never travel or sit in the cache in clear text. The
//! [`ApiKeyQueryFilter`] asks the server to encrypt secrets with a key derived
//! from the client's own API key secret and a fresh salt, and records the
//! parameters it used next to the returned data. The
//! [`DecryptApiKeySecretFilter`], sitting outside the cache filters, turns the
//! secret back into clear text on its way to the caller.
//!
//! The default [`AesSecretDecryptor`] derives the key with PBKDF2-HMAC-SHA1
//! and decrypts AES/CBC with PKCS#7 padding. The encrypted secret is base64,
//! and its first `key_size / 8` bytes are the IV.

use std::fmt;
use std::sync::Arc;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::*;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use rand::RngCore;
use serde_json::Value;
use sha1::Sha1;

use crate::config::ApiKeySecret;
use crate::ds::errors::DataStoreError;
use crate::ds::filter::{
    Filter, FilterChain, ResourceAction, ResourceDataRequest, ResourceDataResult,
};
use crate::ds::resource::{PropertyMap, ResourceTag, ITEMS};
use crate::http::QueryString;

/// Query parameter asking the server to encrypt secrets.
pub const ENCRYPT_SECRET: &str = "encryptSecret";
/// Query parameter carrying the key size in bits.
pub const ENCRYPTION_KEY_SIZE: &str = "encryptionKeySize";
/// Query parameter carrying the key derivation iteration count.
pub const ENCRYPTION_KEY_ITERATIONS: &str = "encryptionKeyIterations";
/// Query parameter carrying the base64 key derivation salt.
pub const ENCRYPTION_KEY_SALT: &str = "encryptionKeySalt";
/// Property recording the encryption parameters next to the secret.
pub const API_KEY_META_DATA: &str = "apiKeyMetaData";

/// Key size requested when the caller names none.
pub const DEFAULT_ENCRYPTION_KEY_SIZE: u32 = 128;
/// Iteration count requested when the caller names none.
pub const DEFAULT_ENCRYPTION_ITERATIONS: u32 = 1024;

const SECRET: &str = "secret";
const SALT_LENGTH: usize = 16;
const BITS_PER_BYTE: u32 = 8;

const LENIENT_PADDING: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_PADDING);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_PADDING);

/// The parameters a secret was encrypted with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptionParams {
    /// Base64 salt.
    pub salt: String,
    /// Key size in bits.
    pub key_size: u32,
    /// Key derivation iteration count.
    pub iterations: u32,
}

impl EncryptionParams {
    /// Reads the parameters from `query`, filling in defaults and a fresh salt.
    #[must_use]
    pub fn from_query(query: &QueryString) -> Self {
        let number = |name: &str, default: u32| {
            query
                .get(name)
                .and_then(|value| value.parse().ok())
                .unwrap_or(default)
        };
        Self {
            salt: query
                .get(ENCRYPTION_KEY_SALT)
                .map_or_else(random_salt, str::to_string),
            key_size: number(ENCRYPTION_KEY_SIZE, DEFAULT_ENCRYPTION_KEY_SIZE),
            iterations: number(ENCRYPTION_KEY_ITERATIONS, DEFAULT_ENCRYPTION_ITERATIONS),
        }
    }

    /// Writes the parameters into `query`.
    pub fn apply_to(&self, query: &mut QueryString) {
        if !query.contains_key(ENCRYPT_SECRET) {
            query.put(ENCRYPT_SECRET, "true");
        }
        query.put(ENCRYPTION_KEY_SIZE, self.key_size.to_string());
        query.put(ENCRYPTION_KEY_ITERATIONS, self.iterations.to_string());
        query.put(ENCRYPTION_KEY_SALT, self.salt.clone());
    }

    /// Returns the metadata map stored next to an encrypted secret.
    #[must_use]
    pub fn to_metadata(&self) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert(ENCRYPTION_KEY_SALT.to_string(), Value::from(self.salt.clone()));
        map.insert(ENCRYPTION_KEY_SIZE.to_string(), Value::from(self.key_size));
        map.insert(ENCRYPTION_KEY_ITERATIONS.to_string(), Value::from(self.iterations));
        map
    }

    /// Reads the parameters back from a metadata map.
    #[must_use]
    pub fn from_metadata(metadata: &PropertyMap) -> Option<Self> {
        let number = |name: &str| {
            metadata
                .get(name)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
        };
        Some(Self {
            salt: metadata.get(ENCRYPTION_KEY_SALT)?.as_str()?.to_string(),
            key_size: number(ENCRYPTION_KEY_SIZE)?,
            iterations: number(ENCRYPTION_KEY_ITERATIONS)?,
        })
    }
}

fn random_salt() -> String {
    let mut bytes = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Decrypts API key secrets the server returned encrypted.
pub trait SecretDecryptor: Send + Sync {
    /// Decrypts `encrypted` using a key derived from `client_secret`.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::SecretDecryption`] when the secret cannot be
    /// decrypted with the given parameters.
    fn decrypt(
        &self,
        encrypted: &str,
        client_secret: &ApiKeySecret,
        params: &EncryptionParams,
    ) -> Result<String, DataStoreError>;
}

/// The default [`SecretDecryptor`]: PBKDF2-HMAC-SHA1 key derivation and
/// AES/CBC/PKCS#7 decryption.
///
/// Key sizes of 128, 192 and 256 bits are accepted. The IV is the first
/// `key_size / 8` bytes of the decoded secret, so only 128-bit keys yield an
/// IV of one AES block; the server encrypts with the 128-bit default.
///
/// # Example
///
/// ```rust
/// use idm_sdk::ds::filters::{AesSecretDecryptor, EncryptionParams, SecretDecryptor};
/// use idm_sdk::ApiKeySecret;
///
/// let params = EncryptionParams {
///     salt: "c2FsdA".to_string(),
///     key_size: 128,
///     iterations: 1024,
/// };
/// let secret = ApiKeySecret::new("client-secret").unwrap();
/// assert!(AesSecretDecryptor.decrypt("not base64!", &secret, &params).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct AesSecretDecryptor;

impl AesSecretDecryptor {
    /// Derives the AES key for `client_secret` with PBKDF2-HMAC-SHA1.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::SecretDecryption`] for an empty or non-base64
    /// salt, a zero iteration count or an unsupported key size.
    pub fn derive_key(
        client_secret: &ApiKeySecret,
        params: &EncryptionParams,
    ) -> Result<Vec<u8>, DataStoreError> {
        let key_length = match params.key_size {
            128 | 192 | 256 => (params.key_size / BITS_PER_BYTE) as usize,
            other => return Err(decryption_error(format!("unsupported key size {other}"))),
        };
        if params.iterations == 0 {
            return Err(decryption_error("iteration count must be greater than zero"));
        }
        let salt = decode_base64(ENCRYPTION_KEY_SALT, &params.salt)?;
        if salt.is_empty() {
            return Err(decryption_error("salt cannot be empty"));
        }

        let mut key = vec![0u8; key_length];
        pbkdf2::pbkdf2_hmac::<Sha1>(
            client_secret.as_ref().as_bytes(),
            &salt,
            params.iterations,
            &mut key,
        );
        Ok(key)
    }
}

impl SecretDecryptor for AesSecretDecryptor {
    fn decrypt(
        &self,
        encrypted: &str,
        client_secret: &ApiKeySecret,
        params: &EncryptionParams,
    ) -> Result<String, DataStoreError> {
        let key = Self::derive_key(client_secret, params)?;
        let payload = decode_base64(SECRET, encrypted)?;
        if payload.len() <= key.len() {
            return Err(decryption_error("encrypted secret is shorter than its IV"));
        }
        let (iv, ciphertext) = payload.split_at(key.len());

        let clear = match key.len() {
            16 => decrypt_cbc::<cbc::Decryptor<aes::Aes128>>(&key, iv, ciphertext),
            24 => decrypt_cbc::<cbc::Decryptor<aes::Aes192>>(&key, iv, ciphertext),
            _ => decrypt_cbc::<cbc::Decryptor<aes::Aes256>>(&key, iv, ciphertext),
        }?;
        String::from_utf8(clear).map_err(|e| decryption_error(e.to_string()))
    }
}

fn decrypt_cbc<D>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DataStoreError>
where
    D: KeyIvInit + BlockDecryptMut,
{
    D::new_from_slices(key, iv)
        .map_err(|e| decryption_error(format!("invalid key or IV: {e}")))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| decryption_error("wrong key or corrupt secret"))
}

/// Decodes standard or URL-safe base64, padded or not.
fn decode_base64(what: &str, value: &str) -> Result<Vec<u8>, DataStoreError> {
    STANDARD_LENIENT
        .decode(value)
        .or_else(|_| URL_SAFE_LENIENT.decode(value))
        .map_err(|e| decryption_error(format!("{what} is not base64: {e}")))
}

fn decryption_error(reason: impl Into<String>) -> DataStoreError {
    DataStoreError::SecretDecryption {
        reason: reason.into(),
    }
}

/// Requests encrypted secrets for API key reads and writes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApiKeyQueryFilter;

impl ApiKeyQueryFilter {
    /// Creates the filter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Filter for ApiKeyQueryFilter {
    fn filter(
        &self,
        mut request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, DataStoreError> {
        if request.action == ResourceAction::Delete
            || request.resource_type.tag() != ResourceTag::ApiKey
        {
            return chain.filter(request);
        }

        let params = EncryptionParams::from_query(request.uri.query());
        params.apply_to(request.uri.query_mut());

        let mut result = chain.filter(request)?;

        if result.resource_type.tag() == ResourceTag::ApiKey {
            let metadata = Value::Object(params.to_metadata());
            if let Some(Value::Array(items)) = result.data.get_mut(ITEMS) {
                for item in items.iter_mut().filter_map(Value::as_object_mut) {
                    item.insert(API_KEY_META_DATA.to_string(), metadata.clone());
                }
            } else if !result.data.is_empty() {
                result
                    .data
                    .insert(API_KEY_META_DATA.to_string(), metadata);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "api-key-query"
    }
}

/// Replaces encrypted API key secrets by their clear text.
pub struct DecryptApiKeySecretFilter {
    client_secret: ApiKeySecret,
    decryptor: Arc<dyn SecretDecryptor>,
}

impl DecryptApiKeySecretFilter {
    /// Creates the filter for the client's own API key secret.
    #[must_use]
    pub fn new(client_secret: ApiKeySecret, decryptor: Arc<dyn SecretDecryptor>) -> Self {
        Self {
            client_secret,
            decryptor,
        }
    }

    fn decrypt_in_place(&self, map: &mut PropertyMap) -> Result<(), DataStoreError> {
        let Some(Value::Object(metadata)) = map.shift_remove(API_KEY_META_DATA) else {
            return Ok(());
        };
        let params = EncryptionParams::from_metadata(&metadata).ok_or_else(|| {
            DataStoreError::SecretDecryption {
                reason: format!("incomplete {API_KEY_META_DATA}"),
            }
        })?;

        if let Some(encrypted) = map.get(SECRET).and_then(Value::as_str) {
            let secret = self
                .decryptor
                .decrypt(encrypted, &self.client_secret, &params)?;
            map.insert(SECRET.to_string(), Value::from(secret));
        }
        Ok(())
    }
}

impl fmt::Debug for DecryptApiKeySecretFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptApiKeySecretFilter")
            .field("client_secret", &self.client_secret)
            .finish_non_exhaustive()
    }
}

impl Filter for DecryptApiKeySecretFilter {
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, DataStoreError> {
        let mut result = chain.filter(request)?;

        if result.resource_type.tag() != ResourceTag::ApiKey {
            return Ok(result);
        }

        match result.data.get_mut(ITEMS) {
            Some(Value::Array(items)) => {
                for item in items.iter_mut().filter_map(Value::as_object_mut) {
                    self.decrypt_in_place(item)?;
                }
            }
            _ => self.decrypt_in_place(&mut result.data)?,
        }

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "decrypt-api-key-secret"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::filter::{FilterPipeline, Handler};
    use crate::ds::resource::ResourceType;
    use crate::http::CanonicalUri;
    use parking_lot::Mutex;
    use serde_json::json;

    static KEY: ResourceType = ResourceType::instance("ApiKey").tagged(ResourceTag::ApiKey);
    static KEY_LIST: ResourceType =
        ResourceType::collection("ApiKeyList", &KEY).tagged(ResourceTag::ApiKey);
    static OTHER: ResourceType = ResourceType::instance("Other");

    /// Reverses the secret and prefixes the salt, so tests can tell it ran.
    struct Reversing;

    impl SecretDecryptor for Reversing {
        fn decrypt(
            &self,
            encrypted: &str,
            client_secret: &ApiKeySecret,
            params: &EncryptionParams,
        ) -> Result<String, DataStoreError> {
            assert_eq!(client_secret.as_ref(), "client-secret");
            Ok(format!("{}:{}", params.salt, encrypted.chars().rev().collect::<String>()))
        }
    }

    struct Recording {
        body: Value,
        seen: Mutex<Option<CanonicalUri>>,
    }

    impl Handler for Recording {
        fn handle(
            &self,
            request: ResourceDataRequest,
        ) -> Result<ResourceDataResult, DataStoreError> {
            *self.seen.lock() = Some(request.uri.clone());
            Ok(ResourceDataResult::new(
                request.action,
                request.uri,
                request.return_type,
                self.body.as_object().cloned().unwrap_or_default(),
            ))
        }
    }

    fn pipeline(handler: Arc<Recording>) -> FilterPipeline {
        let secret = ApiKeySecret::new("client-secret").unwrap();
        FilterPipeline::new(handler)
            .with_filter(Arc::new(DecryptApiKeySecretFilter::new(secret, Arc::new(Reversing))))
            .with_filter(Arc::new(ApiKeyQueryFilter::new()))
    }

    fn recording(body: Value) -> Arc<Recording> {
        Arc::new(Recording {
            body,
            seen: Mutex::new(None),
        })
    }

    #[test]
    fn test_query_parameters_are_added_with_defaults() {
        let handler = recording(json!({"href": "k/1", "secret": "cba"}));
        let request = ResourceDataRequest::new(
            ResourceAction::Read,
            CanonicalUri::parse("k/1"),
            &KEY,
        );
        pipeline(handler.clone()).run(request).unwrap();

        let seen = handler.seen.lock().clone().unwrap();
        assert_eq!(seen.query().get(ENCRYPT_SECRET), Some("true"));
        assert_eq!(seen.query().get(ENCRYPTION_KEY_SIZE), Some("128"));
        assert_eq!(seen.query().get(ENCRYPTION_KEY_ITERATIONS), Some("1024"));
        assert!(seen.query().get(ENCRYPTION_KEY_SALT).is_some());
    }

    #[test]
    fn test_secret_round_trip_with_caller_salt() {
        let handler = recording(json!({"href": "k/1", "id": "K", "secret": "cba"}));
        let request = ResourceDataRequest::new(
            ResourceAction::Read,
            CanonicalUri::parse("k/1?encryptionKeySalt=NaCl"),
            &KEY,
        );
        let result = pipeline(handler).run(request).unwrap();

        assert_eq!(result.data["secret"], "NaCl:abc");
        assert!(!result.data.contains_key(API_KEY_META_DATA));
    }

    #[test]
    fn test_collection_items_are_decrypted() {
        let handler = recording(json!({
            "href": "a/apiKeys",
            "items": [{"href": "k/1", "secret": "1x"}, {"href": "k/2", "secret": "2y"}],
        }));
        let request = ResourceDataRequest::new(
            ResourceAction::Read,
            CanonicalUri::parse("a/apiKeys?encryptionKeySalt=S"),
            &KEY_LIST,
        );
        let result = pipeline(handler).run(request).unwrap();

        assert_eq!(result.data["items"][0]["secret"], "S:x1");
        assert_eq!(result.data["items"][1]["secret"], "S:y2");
    }

    #[test]
    fn test_other_types_and_deletes_are_untouched() {
        let handler = recording(json!({"href": "o/1", "secret": "plain"}));
        let request =
            ResourceDataRequest::new(ResourceAction::Read, CanonicalUri::parse("o/1"), &OTHER);
        let result = pipeline(handler.clone()).run(request).unwrap();
        assert_eq!(result.data["secret"], "plain");
        assert!(!handler.seen.lock().clone().unwrap().has_query());

        let handler = recording(json!({}));
        let request =
            ResourceDataRequest::new(ResourceAction::Delete, CanonicalUri::parse("k/1"), &KEY);
        pipeline(handler.clone()).run(request).unwrap();
        assert!(!handler.seen.lock().clone().unwrap().has_query());
    }

    fn unhex(hex: &str) -> Vec<u8> {
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect()
    }

    fn encrypt(key: &[u8], iv: &[u8], clear: &[u8]) -> Vec<u8> {
        use cbc::cipher::BlockEncryptMut;
        let ciphertext = cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(clear);
        [iv, ciphertext.as_slice()].concat()
    }

    #[test]
    fn test_key_derivation_matches_pbkdf2_hmac_sha1_vectors() {
        // RFC 6070, "password" / "salt", truncated to a 128-bit key.
        let secret = ApiKeySecret::new("password").unwrap();
        let mut params = EncryptionParams {
            salt: "c2FsdA==".to_string(),
            key_size: 128,
            iterations: 1,
        };
        assert_eq!(
            AesSecretDecryptor::derive_key(&secret, &params).unwrap(),
            unhex("0c60c80f961f0e71f3a9b524af601206")
        );

        params.iterations = 2;
        params.salt = "c2FsdA".to_string();
        assert_eq!(
            AesSecretDecryptor::derive_key(&secret, &params).unwrap(),
            unhex("ea6c014dc72d6f8ccd1ed92ace1d41f0")
        );
    }

    #[test]
    fn test_cbc_matches_nist_vector() {
        // SP 800-38A F.2.1, first block.
        let key = unhex("2b7e151628aed2a6abf7158809cf4f3c");
        let iv = unhex("000102030405060708090a0b0c0d0e0f");
        let clear = unhex("6bc1bee22e409f96e93d7e117393172a");

        let payload = encrypt(&key, &iv, &clear);
        assert_eq!(&payload[16..32], unhex("7649abac8119b246cee98e9b12e9197d").as_slice());
        let decrypted = decrypt_cbc::<cbc::Decryptor<aes::Aes128>>(&key, &iv, &payload[16..]);
        assert_eq!(decrypted.unwrap(), clear);
    }

    #[test]
    fn test_aes_decryptor_recovers_secret_encrypted_by_the_server() {
        let client_secret = ApiKeySecret::new("client-secret").unwrap();
        let params = EncryptionParams {
            salt: BASE64_URL_SAFE_NO_PAD.encode(b"0123456789abcdef"),
            key_size: 128,
            iterations: 1024,
        };
        let key = AesSecretDecryptor::derive_key(&client_secret, &params).unwrap();
        let iv = unhex("f0e1d2c3b4a5968778695a4b3c2d1e0f");
        let encrypted = BASE64_STANDARD.encode(encrypt(&key, &iv, b"plain api key secret"));

        let clear = AesSecretDecryptor
            .decrypt(&encrypted, &client_secret, &params)
            .unwrap();
        assert_eq!(clear, "plain api key secret");

        let other = ApiKeySecret::new("someone-else").unwrap();
        let wrong = AesSecretDecryptor.decrypt(&encrypted, &other, &params);
        assert!(wrong.map_or(true, |s| s != clear));
    }

    #[test]
    fn test_aes_decryptor_rejects_bad_parameters() {
        let secret = ApiKeySecret::new("client-secret").unwrap();
        let params = |key_size, iterations, salt: &str| EncryptionParams {
            salt: salt.to_string(),
            key_size,
            iterations,
        };
        let payload = BASE64_STANDARD.encode([7u8; 32]);

        for bad in [params(100, 1024, "c2FsdA"), params(128, 0, "c2FsdA"), params(128, 1024, "")] {
            let error = AesSecretDecryptor.decrypt(&payload, &secret, &bad).unwrap_err();
            assert!(matches!(error, DataStoreError::SecretDecryption { .. }));
        }
        let short = BASE64_STANDARD.encode([7u8; 16]);
        assert!(AesSecretDecryptor
            .decrypt(&short, &secret, &params(128, 1024, "c2FsdA"))
            .is_err());
    }

    #[test]
    fn test_metadata_round_trip() {
        let params = EncryptionParams {
            salt: "s".to_string(),
            key_size: 256,
            iterations: 10,
        };
        assert_eq!(EncryptionParams::from_metadata(&params.to_metadata()), Some(params));
    }
}
