use base64::{engine::general_purpose, Engine as _};
use ethers::types::transaction::eip712::TypedData;
use ethers::utils::to_checksum;
use hmac::{Hmac, Mac};
use log::info;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::client::ClobHttp;
use crate::domain::{ApiKeyCreds, ApiKeyRaw};
use crate::execution::errors::EngineError;
use crate::wallet::signer::{signature_to_hex, TypedDataSigner};

pub mod store;

use self::store::CredentialStore;

type HmacSha256 = Hmac<Sha256>;

/// Fixed attestation literal signed in the L1 challenge.
pub const MSG_TO_SIGN: &str = "This message attests that I control the given wallet";
pub const AUTH_DOMAIN_NAME: &str = "ClobAuthDomain";

// ==================================================
// HEADER SETS
// ==================================================

/// Wallet-signature-derived headers, used once to issue credentials.
#[derive(Debug, Clone)]
pub struct L1Headers {
    pub address: String,
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
}

/// HMAC-derived headers, computed per request from the stored secret.
#[derive(Debug, Clone)]
pub struct L2Headers {
    pub address: String,
    pub signature: String,
    pub timestamp: String,
    pub api_key: String,
    pub passphrase: String,
}

#[derive(Debug, Clone)]
pub struct L2HeaderArgs {
    pub method: String,
    pub request_path: String,
    pub body: Option<String>,
}

fn header_map(pairs: &[(&'static str, &str)]) -> Result<HeaderMap, EngineError> {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value)
                .map_err(|e| EngineError::Validation(format!("bad header value: {}", e)))?,
        );
    }
    Ok(map)
}

impl L1Headers {
    pub fn to_header_map(&self) -> Result<HeaderMap, EngineError> {
        header_map(&[
            ("poly_address", &self.address),
            ("poly_signature", &self.signature),
            ("poly_timestamp", &self.timestamp),
            ("poly_nonce", &self.nonce),
        ])
    }
}

impl L2Headers {
    pub fn to_header_map(&self) -> Result<HeaderMap, EngineError> {
        header_map(&[
            ("poly_address", &self.address),
            ("poly_signature", &self.signature),
            ("poly_timestamp", &self.timestamp),
            ("poly_api_key", &self.api_key),
            ("poly_passphrase", &self.passphrase),
        ])
    }
}

// ==================================================
// HMAC SIGNATURE (L2)
// ==================================================

/// Canonical CLOB HMAC: message = timestamp + method + path + body?, keyed
/// by the base64-decoded secret, digest base64 with '+' → '-' and '/' → '_'
/// (padding kept). Identical inputs always yield the identical signature.
pub fn build_hmac_signature(
    secret: &str,
    timestamp: u64,
    method: &str,
    request_path: &str,
    body: Option<&str>,
) -> Result<String, EngineError> {
    let mut message = format!("{}{}{}", timestamp, method, request_path);
    if let Some(body) = body {
        message.push_str(body);
    }

    let secret_bytes = general_purpose::URL_SAFE
        .decode(secret)
        .map_err(|e| EngineError::Validation(format!("API secret is not valid base64: {}", e)))?;

    let mut mac =
        HmacSha256::new_from_slice(&secret_bytes).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let digest = mac.finalize().into_bytes();

    let sig = general_purpose::STANDARD.encode(digest);
    Ok(sig.replace('+', "-").replace('/', "_"))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

// ==================================================
// AUTH MANAGER
// ==================================================

/// Per-account credential state, as visible through the store. The
/// L1-authenticating phase is transient inside create/derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    NoCredentials,
    CredentialsStored,
}

/// Issues exchange credentials from a one-time wallet-signed challenge and
/// computes per-request HMAC headers from the persisted secret.
pub struct AuthManager {
    http: ClobHttp,
    signer: Arc<dyn TypedDataSigner>,
    store: Arc<dyn CredentialStore>,
    chain_id: u64,
}

impl AuthManager {
    pub fn new(
        http: ClobHttp,
        signer: Arc<dyn TypedDataSigner>,
        store: Arc<dyn CredentialStore>,
        chain_id: u64,
    ) -> Self {
        Self {
            http,
            signer,
            store,
            chain_id,
        }
    }

    pub fn address(&self) -> String {
        to_checksum(&self.signer.address(), None)
    }

    pub fn state(&self) -> Result<AuthState, EngineError> {
        Ok(match self.credentials()? {
            Some(_) => AuthState::CredentialsStored,
            None => AuthState::NoCredentials,
        })
    }

    pub fn credentials(&self) -> Result<Option<ApiKeyCreds>, EngineError> {
        Ok(self.store.load()?.get(&self.address()).cloned())
    }

    // ==================================================
    // L1 — WALLET-SIGNED CHALLENGE
    // ==================================================

    pub async fn get_l1_headers(&self) -> Result<L1Headers, EngineError> {
        let address = self.address();
        let timestamp = unix_seconds().to_string();

        let typed_data = clob_auth_typed_data(self.chain_id, &address, &timestamp)?;
        let signature = self.signer.sign_typed_data(&typed_data).await?;

        Ok(L1Headers {
            address,
            signature: signature_to_hex(&signature),
            timestamp,
            nonce: "0".to_string(),
        })
    }

    /// POST the L1 challenge to mint credentials. A 400 means this wallet
    /// already has a key; fall back to deriving it instead of surfacing the
    /// conflict.
    pub async fn create_api_key(&self) -> Result<ApiKeyCreds, EngineError> {
        let headers = self.get_l1_headers().await?.to_header_map()?;
        let resp = self.http.post_create_api_key(headers).await?;

        if resp.status().as_u16() == 400 {
            info!("🔑 API key already exists — deriving instead");
            return self.derive_api_key().await;
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = resp.json::<ApiKeyRaw>().await?;
        self.store_creds(raw)
    }

    pub async fn derive_api_key(&self) -> Result<ApiKeyCreds, EngineError> {
        let headers = self.get_l1_headers().await?.to_header_map()?;
        let resp = self.http.get_derive_api_key(headers).await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = resp.json::<ApiKeyRaw>().await?;
        self.store_creds(raw)
    }

    /// Whole-map read-modify-write: merges this address into whatever is
    /// already stored for others. Not safe under concurrent callers.
    fn store_creds(&self, raw: ApiKeyRaw) -> Result<ApiKeyCreds, EngineError> {
        let creds = ApiKeyCreds {
            key: raw.api_key,
            secret: raw.secret,
            passphrase: raw.passphrase,
        };
        let mut map = self.store.load()?;
        map.insert(self.address(), creds.clone());
        self.store.save(&map)?;
        info!("🔑 API credentials stored for {}", self.address());
        Ok(creds)
    }

    // ==================================================
    // L2 — PER-REQUEST HMAC
    // ==================================================

    pub fn create_l2_headers(
        &self,
        args: &L2HeaderArgs,
        timestamp: Option<u64>,
    ) -> Result<L2Headers, EngineError> {
        let address = self.address();
        let creds = self
            .credentials()?
            .ok_or(EngineError::MissingCredentials {
                address: address.clone(),
            })?;

        let ts = timestamp.unwrap_or_else(unix_seconds);
        let signature = build_hmac_signature(
            &creds.secret,
            ts,
            &args.method,
            &args.request_path,
            args.body.as_deref(),
        )?;

        Ok(L2Headers {
            address,
            signature,
            timestamp: ts.to_string(),
            api_key: creds.key,
            passphrase: creds.passphrase,
        })
    }
}

/// EIP-712 challenge payload for credential issuance.
fn clob_auth_typed_data(
    chain_id: u64,
    address: &str,
    timestamp: &str,
) -> Result<TypedData, EngineError> {
    serde_json::from_value(json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" }
            ],
            "ClobAuth": [
                { "name": "address", "type": "address" },
                { "name": "timestamp", "type": "string" },
                { "name": "nonce", "type": "uint256" },
                { "name": "message", "type": "string" }
            ]
        },
        "primaryType": "ClobAuth",
        "domain": {
            "name": AUTH_DOMAIN_NAME,
            "version": "1",
            "chainId": chain_id
        },
        "message": {
            "address": address,
            "timestamp": timestamp,
            "nonce": 0,
            "message": MSG_TO_SIGN
        }
    }))
    .map_err(|e| EngineError::Signing(format!("bad auth typed data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use crate::wallet::signer::WalletSigner;
    use super::store::MemoryCredentialStore;

    // url-safe base64 of b"weather-or-not-this-is-a-secret!"
    const SECRET: &str = "d2VhdGhlci1vci1ub3QtdGhpcy1pcy1hLXNlY3JldCE=";

    #[test]
    fn hmac_matches_known_vector() {
        let sig = build_hmac_signature(
            SECRET,
            1700000000,
            "POST",
            "/order",
            Some(r#"{"hash":"0x123"}"#),
        )
        .unwrap();
        assert_eq!(sig, "Wgmee5mDlVB6VJlx2zgeD94WDNB7vkBdo2LypS4qNbM=");
    }

    #[test]
    fn hmac_without_body_matches_known_vector() {
        let sig = build_hmac_signature(SECRET, 1700000000, "GET", "/positions", None).unwrap();
        assert_eq!(sig, "v9yGBqF8NWNydBGnwnbWV7vNMDcKjexl_NfLtt0Z4iA=");
    }

    #[test]
    fn hmac_is_deterministic_and_url_safe() {
        let a = build_hmac_signature(SECRET, 1234, "POST", "/order", Some("{}")).unwrap();
        let b = build_hmac_signature(SECRET, 1234, "POST", "/order", Some("{}")).unwrap();
        assert_eq!(a, b);
        assert!(!a.contains('+'));
        assert!(!a.contains('/'));

        // a missing body and an empty body hash identically
        let c = build_hmac_signature(SECRET, 1234, "POST", "/order", Some("")).unwrap();
        let d = build_hmac_signature(SECRET, 1234, "POST", "/order", None).unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn hmac_rejects_garbage_secret() {
        assert!(build_hmac_signature("not base64 !!", 1, "GET", "/", None).is_err());
    }

    fn test_auth() -> AuthManager {
        let signer = WalletSigner::new(
            "0000000000000000000000000000000000000000000000000000000000000001",
            137,
        )
        .unwrap();
        AuthManager::new(
            ClobHttp::new(Endpoints::production()),
            Arc::new(signer),
            Arc::new(MemoryCredentialStore::new()),
            137,
        )
    }

    #[tokio::test]
    async fn l1_headers_carry_the_four_fields() {
        let auth = test_auth();
        let headers = auth.get_l1_headers().await.unwrap();
        assert_eq!(headers.address, auth.address());
        assert_eq!(headers.nonce, "0");
        assert!(headers.signature.starts_with("0x"));
        assert_eq!(headers.signature.len(), 2 + 65 * 2);
        assert!(headers.timestamp.parse::<u64>().is_ok());

        let map = headers.to_header_map().unwrap();
        for name in ["poly_address", "poly_signature", "poly_timestamp", "poly_nonce"] {
            assert!(map.contains_key(name), "missing header {}", name);
        }
    }

    #[tokio::test]
    async fn l1_signature_is_stable_for_fixed_challenge() {
        // same wallet, same typed data => same signature
        let auth = test_auth();
        let typed = clob_auth_typed_data(137, &auth.address(), "1700000000").unwrap();
        let a = auth.signer.sign_typed_data(&typed).await.unwrap();
        let b = auth.signer.sign_typed_data(&typed).await.unwrap();
        assert_eq!(signature_to_hex(&a), signature_to_hex(&b));
    }

    #[test]
    fn l2_headers_require_stored_credentials() {
        let auth = test_auth();
        let args = L2HeaderArgs {
            method: "GET".to_string(),
            request_path: "/order".to_string(),
            body: None,
        };
        match auth.create_l2_headers(&args, Some(1)) {
            Err(EngineError::MissingCredentials { .. }) => {}
            other => panic!("expected MissingCredentials, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn l2_headers_carry_the_five_fields() {
        let auth = test_auth();
        let mut map = auth.store.load().unwrap();
        map.insert(
            auth.address(),
            ApiKeyCreds {
                key: "key".to_string(),
                secret: SECRET.to_string(),
                passphrase: "pass".to_string(),
            },
        );
        auth.store.save(&map).unwrap();
        assert_eq!(auth.state().unwrap(), AuthState::CredentialsStored);

        let args = L2HeaderArgs {
            method: "POST".to_string(),
            request_path: "/order".to_string(),
            body: Some(r#"{"hash":"0x123"}"#.to_string()),
        };
        let headers = auth.create_l2_headers(&args, Some(1700000000)).unwrap();
        assert_eq!(headers.signature, "Wgmee5mDlVB6VJlx2zgeD94WDNB7vkBdo2LypS4qNbM=");
        assert_eq!(headers.api_key, "key");
        assert_eq!(headers.passphrase, "pass");
        assert_eq!(headers.timestamp, "1700000000");

        let map = headers.to_header_map().unwrap();
        for name in [
            "poly_address",
            "poly_signature",
            "poly_timestamp",
            "poly_api_key",
            "poly_passphrase",
        ] {
            assert!(map.contains_key(name), "missing header {}", name);
        }
    }
}
