//! Signer abstraction (spec §4 / §9 "Open Questions"): local secp256k1
//! keys, a NIP-46 remote bunker, or a stored bunker connection string
//! ("nbunksec"), all behind one async [`Signer`] trait.
//!
//! Per spec §1, signing and encryption primitives are treated as an
//! opaque external collaborator — nsyte never re-implements Schnorr
//! signatures or AEAD ciphers itself, it calls into the `nostr` crate
//! for both. What this crate owns is *which* key material answers a
//! signing request and how that key material is resolved, using a
//! layered resolution pattern (env var, then config file, then
//! credentials file) applied to "find a way to sign".

mod bunker;
mod local;
mod uri;

pub use bunker::BunkerSigner;
pub use local::LocalKeySigner;
pub use uri::{BunkerUri, ParseBunkerUriError};

use async_trait::async_trait;
use nostr::{Event, EventBuilder, PublicKey};
use nsyte_types::NsyteError;

/// Anything that can turn an unsigned event template into a signed
/// [`Event`] and reports the public key it signs as.
///
/// Implementations must not block the async runtime: local-key signing
/// is CPU-only and returns immediately, but bunker signing round-trips
/// over a relay and must use async I/O throughout.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, builder: EventBuilder) -> Result<Event, NsyteError>;

    fn public_key(&self) -> PublicKey;
}

/// A signer that wraps a stored "nbunksec" connection string rather
/// than holding a live bunker session from process start. The string is
/// parsed once, at which point the resolved signer is indistinguishable
/// from one constructed directly from a [`BunkerUri`]; the raw secret is
/// zeroized immediately after parsing (spec 4.H: "credentials are
/// cleared from memory promptly after use").
pub struct NbunksecSigner {
    inner: BunkerSigner,
}

impl NbunksecSigner {
    /// Parse a stored `bunker://...` connection string and establish the
    /// remote signer session it describes.
    pub async fn connect(nbunksec: &str) -> Result<Self, NsyteError> {
        let secret = zeroize::Zeroizing::new(nbunksec.to_string());
        let uri = BunkerUri::parse(&secret).map_err(|e| NsyteError::Auth(e.to_string()))?;
        drop(secret);
        let inner = BunkerSigner::connect(uri).await?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl Signer for NbunksecSigner {
    async fn sign(&self, builder: EventBuilder) -> Result<Event, NsyteError> {
        self.inner.sign(builder).await
    }

    fn public_key(&self) -> PublicKey {
        self.inner.public_key()
    }
}
