//! Local secp256k1 key signer.

use async_trait::async_trait;
use nostr::{Event, EventBuilder, Keys, PublicKey};
use nsyte_types::NsyteError;

use crate::Signer;

/// Signs with an in-process `nostr::Keys` keypair. Signing is CPU-bound
/// and synchronous under the hood; the `async fn` exists purely so
/// callers can treat every [`Signer`] implementation uniformly.
pub struct LocalKeySigner {
    keys: Keys,
}

impl LocalKeySigner {
    pub fn new(keys: Keys) -> Self {
        Self { keys }
    }

    /// Parse a hex or bech32 (`nsec1...`) secret key.
    pub fn from_secret_key_str(secret_key: &str) -> Result<Self, NsyteError> {
        let keys = Keys::parse(secret_key)
            .map_err(|e| NsyteError::Auth(format!("invalid secret key: {e}")))?;
        Ok(Self { keys })
    }

    pub fn generate() -> Self {
        Self { keys: Keys::generate() }
    }
}

#[async_trait]
impl Signer for LocalKeySigner {
    async fn sign(&self, builder: EventBuilder) -> Result<Event, NsyteError> {
        builder
            .sign_with_keys(&self.keys)
            .map_err(|e| NsyteError::Auth(format!("local signing failed: {e}")))
    }

    fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr::{Kind, Tag};

    #[tokio::test]
    async fn signs_and_reports_matching_public_key() {
        let signer = LocalKeySigner::generate();
        let builder = EventBuilder::new(Kind::Custom(34128), "test content")
            .tag(Tag::identifier("/index.html"));

        let event = signer.sign(builder).await.expect("sign");
        assert_eq!(event.pubkey, signer.public_key());
        assert_eq!(event.kind, Kind::Custom(34128));
    }

    #[test]
    fn rejects_garbage_secret_key() {
        let err = LocalKeySigner::from_secret_key_str("not-a-key").unwrap_err();
        assert!(matches!(err, NsyteError::Auth(_)));
    }
}
