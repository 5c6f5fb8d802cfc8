//! NIP-46 remote signer ("bunker") transport.
//!
//! Grounded on the `nostr_sdk::Client` relay-pool usage shown in
//! `other_examples/701617f6_v0l-zap-stream-core__crates-core-nostr-src-n94.rs.rs`
//! (construct a client from a keypair, add relays, publish/subscribe
//! through the pool) combined with NIP-46's request/response shape:
//! an ephemeral local keypair encrypts a JSON-RPC-like payload to the
//! bunker's pubkey, publishes it as a kind 24133 event tagged back to
//! itself, and waits for the matching response on the same kind.

use std::time::Duration;

use async_trait::async_trait;
use nostr::nips::nip44;
use nostr::{Event, EventBuilder, Filter, Keys, Kind, PublicKey, Tag, Timestamp};
use nostr_sdk::{Client, RelayPoolNotification};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::uri::BunkerUri;
use nsyte_types::NsyteError;

/// Kind used for NIP-46 request/response events.
const NOSTR_CONNECT_KIND: u16 = 24133;

/// How long to wait for the bunker to answer a single request before
/// treating it as a transient network failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ConnectRequest<'a> {
    id: String,
    method: &'a str,
    params: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    id: String,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// A live session with a NIP-46 remote signer, reached over a relay
/// pool rather than held in-process.
pub struct BunkerSigner {
    local_keys: Keys,
    remote_signer_pubkey: PublicKey,
    client: Client,
}

impl BunkerSigner {
    /// Connect to the bunker named by a parsed `bunker://` uri,
    /// performing the initial NIP-46 `connect` handshake when the uri
    /// carries a one-time secret.
    pub async fn connect(uri: BunkerUri) -> Result<Self, NsyteError> {
        let local_keys = Keys::generate();
        let client = Client::new(local_keys.clone());

        for relay in &uri.relays {
            client
                .add_relay(relay.as_str())
                .await
                .map_err(|e| NsyteError::NetworkTerminal(format!("invalid relay {relay}: {e}")))?;
        }
        client.connect().await;

        let signer = Self { local_keys, remote_signer_pubkey: uri.remote_signer_pubkey, client };

        if let Some(secret) = uri.secret {
            let mut params = vec![uri.remote_signer_pubkey.to_hex()];
            if !secret.is_empty() {
                params.push(secret);
            }
            signer.request("connect", params).await?;
        }

        Ok(signer)
    }

    async fn request(&self, method: &str, params: Vec<String>) -> Result<String, NsyteError> {
        let id = rand::thread_rng().r#gen::<u64>().to_string();
        let payload = ConnectRequest { id: id.clone(), method, params };
        let plaintext = serde_json::to_string(&payload)
            .map_err(|e| NsyteError::Auth(format!("failed to encode bunker request: {e}")))?;

        let ciphertext = nip44::encrypt(
            self.local_keys.secret_key(),
            &self.remote_signer_pubkey,
            &plaintext,
            nip44::Version::V2,
        )
        .map_err(|e| NsyteError::Auth(format!("failed to encrypt bunker request: {e}")))?;

        let builder = EventBuilder::new(Kind::Custom(NOSTR_CONNECT_KIND), ciphertext)
            .tag(Tag::public_key(self.remote_signer_pubkey));

        self.client
            .send_event_builder(builder)
            .await
            .map_err(|e| NsyteError::NetworkTransient(format!("failed to publish bunker request: {e}")))?;

        let filter = Filter::new()
            .kind(Kind::Custom(NOSTR_CONNECT_KIND))
            .author(self.remote_signer_pubkey)
            .pubkey(self.local_keys.public_key())
            .since(Timestamp::now());

        self.client
            .subscribe(filter, None)
            .await
            .map_err(|e| NsyteError::NetworkTransient(format!("failed to subscribe for bunker response: {e}")))?;

        let mut notifications = self.client.notifications();
        let deadline = tokio::time::Instant::now() + REQUEST_TIMEOUT;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(NsyteError::NetworkTransient(format!(
                    "timed out waiting for bunker response to {method}"
                )));
            }

            let notification = tokio::time::timeout(remaining, notifications.recv())
                .await
                .map_err(|_| NsyteError::NetworkTransient(format!("timed out waiting for bunker response to {method}")))?
                .map_err(|e| NsyteError::NetworkTransient(format!("bunker notification channel closed: {e}")))?;

            let RelayPoolNotification::Event { event, .. } = notification else {
                continue;
            };
            if event.kind != Kind::Custom(NOSTR_CONNECT_KIND) || event.pubkey != self.remote_signer_pubkey {
                continue;
            }

            let decrypted = match nip44::decrypt(self.local_keys.secret_key(), &self.remote_signer_pubkey, &event.content) {
                Ok(plaintext) => plaintext,
                Err(_) => continue,
            };
            let response: ConnectResponse = match serde_json::from_str(&decrypted) {
                Ok(response) => response,
                Err(_) => continue,
            };
            if response.id != id {
                continue;
            }

            if let Some(error) = response.error {
                return Err(NsyteError::Auth(format!("bunker rejected {method}: {error}")));
            }
            return response
                .result
                .ok_or_else(|| NsyteError::Auth(format!("bunker response to {method} had neither result nor error")));
        }
    }
}

#[async_trait]
impl crate::Signer for BunkerSigner {
    async fn sign(&self, builder: EventBuilder) -> Result<Event, NsyteError> {
        let unsigned = builder.build(self.remote_signer_pubkey);
        let unsigned_json = serde_json::to_string(&unsigned)
            .map_err(|e| NsyteError::Auth(format!("failed to encode unsigned event: {e}")))?;

        let signed_json = self.request("sign_event", vec![unsigned_json]).await?;
        let value: Value = serde_json::from_str(&signed_json)
            .map_err(|e| NsyteError::Auth(format!("bunker returned malformed signed event: {e}")))?;
        serde_json::from_value(value)
            .map_err(|e| NsyteError::Auth(format!("bunker returned malformed signed event: {e}")))
    }

    fn public_key(&self) -> PublicKey {
        self.remote_signer_pubkey
    }
}
