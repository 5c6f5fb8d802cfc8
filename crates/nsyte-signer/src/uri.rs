//! Parsing for NIP-46 `bunker://` connection strings.

use nostr::PublicKey;

/// A parsed `bunker://<remote-signer-pubkey>?relay=<url>&relay=<url>&secret=<token>`
/// connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BunkerUri {
    pub remote_signer_pubkey: PublicKey,
    pub relays: Vec<String>,
    pub secret: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseBunkerUriError {
    #[error("bunker uri must start with bunker://")]
    MissingScheme,
    #[error("bunker uri is missing the remote signer pubkey")]
    MissingPubkey,
    #[error("bunker uri has an invalid remote signer pubkey: {0}")]
    InvalidPubkey(String),
    #[error("bunker uri must specify at least one relay= query parameter")]
    MissingRelay,
}

const SCHEME: &str = "bunker://";

impl BunkerUri {
    pub fn parse(raw: &str) -> Result<Self, ParseBunkerUriError> {
        let rest = raw.strip_prefix(SCHEME).ok_or(ParseBunkerUriError::MissingScheme)?;

        let (authority, query) = match rest.split_once('?') {
            Some((a, q)) => (a, q),
            None => (rest, ""),
        };

        if authority.is_empty() {
            return Err(ParseBunkerUriError::MissingPubkey);
        }
        let remote_signer_pubkey = PublicKey::parse(authority)
            .map_err(|_| ParseBunkerUriError::InvalidPubkey(authority.to_string()))?;

        let mut relays = Vec::new();
        let mut secret = None;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let decoded = percent_decode(value);
            match key {
                "relay" => relays.push(decoded),
                "secret" => secret = Some(decoded),
                _ => {}
            }
        }

        if relays.is_empty() {
            return Err(ParseBunkerUriError::MissingRelay);
        }

        Ok(Self { remote_signer_pubkey, relays, secret })
    }
}

/// Minimal percent-decoding sufficient for relay URLs and opaque secret
/// tokens (no `+` handling, since these aren't form-encoded fields).
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&value[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PUBKEY: &str = "npub180cvv07tjdrrgpa0j7j7tmnyl2yr6yr7l8j4s3evf6u64th6gkwsyjh6w6";

    #[test]
    fn rejects_missing_scheme() {
        let err = BunkerUri::parse("nostrconnect://abc").unwrap_err();
        assert_eq!(err, ParseBunkerUriError::MissingScheme);
    }

    #[test]
    fn rejects_missing_relay() {
        let raw = format!("bunker://{SAMPLE_PUBKEY}");
        let err = BunkerUri::parse(&raw).unwrap_err();
        assert_eq!(err, ParseBunkerUriError::MissingRelay);
    }

    #[test]
    fn parses_relays_and_secret() {
        let raw = format!(
            "bunker://{SAMPLE_PUBKEY}?relay=wss%3A%2F%2Fr1.example&relay=wss://r2.example&secret=token123"
        );
        let parsed = BunkerUri::parse(&raw).expect("parse");
        assert_eq!(parsed.relays, vec!["wss://r1.example", "wss://r2.example"]);
        assert_eq!(parsed.secret.as_deref(), Some("token123"));
    }

    #[test]
    fn rejects_invalid_pubkey() {
        let raw = "bunker://not-a-pubkey?relay=wss://r1.example";
        let err = BunkerUri::parse(raw).unwrap_err();
        assert!(matches!(err, ParseBunkerUriError::InvalidPubkey(_)));
    }
}
