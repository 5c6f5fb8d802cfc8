//! Blossom-style (BUD-02) signed upload authorization — the concrete
//! resolution of spec 4.E's "a signed authorization header", recorded
//! as a design decision in `DESIGN.md`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use nostr::{EventBuilder, JsonUtil, Kind, Tag, TagKind, Timestamp};

use nsyte_signer::Signer;
use nsyte_types::NsyteError;

/// Blossom auth events use kind 24242 (ephemeral) with a `t` tag naming
/// the verb (`upload`, `get`, `delete`) and an `x` tag naming the blob
/// digest the authorization covers.
const BLOSSOM_AUTH_KIND: u16 = 24242;

/// Build and sign a Blossom authorization for `digest` tagged with verb
/// `t`, valid for `ttl_secs` from now, then base64-encode it for the
/// `Authorization: Nostr <...>` header. Shared by [`build_upload_auth`]
/// and [`build_delete_auth`] (spec 4.E and 4.H both need "a signed
/// authorization header", differing only in the `t` tag's verb).
async fn build_auth(t: &str, digest: &str, ttl_secs: i64, signer: &dyn Signer) -> Result<String, NsyteError> {
    let expiration = Timestamp::now().as_u64() as i64 + ttl_secs;

    let builder = EventBuilder::new(Kind::Custom(BLOSSOM_AUTH_KIND), format!("nsyte {t} authorization"))
        .tag(Tag::custom(TagKind::Custom("t".into()), vec![t.to_string()]))
        .tag(Tag::custom(TagKind::Custom("x".into()), vec![digest.to_string()]))
        .tag(Tag::custom(TagKind::Custom("expiration".into()), vec![expiration.to_string()]));

    let event = signer.sign(builder).await?;
    Ok(format!("Nostr {}", BASE64.encode(event.as_json())))
}

/// Build and sign a Blossom upload authorization for `digest`, valid for
/// `ttl_secs` from now, then base64-encode it for the
/// `Authorization: Nostr <...>` header.
pub async fn build_upload_auth(
    digest: &str,
    ttl_secs: i64,
    signer: &dyn Signer,
) -> Result<String, NsyteError> {
    build_auth("upload", digest, ttl_secs, signer).await
}

/// Build and sign a Blossom delete authorization for `digest` (spec
/// 4.H: "delete each blob with a signed delete-authorization request
/// per server").
pub async fn build_delete_auth(
    digest: &str,
    ttl_secs: i64,
    signer: &dyn Signer,
) -> Result<String, NsyteError> {
    build_auth("delete", digest, ttl_secs, signer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsyte_signer::LocalKeySigner;

    #[tokio::test]
    async fn header_is_base64_nostr_prefixed() {
        let signer = LocalKeySigner::generate();
        let header = build_upload_auth("deadbeef", 60, &signer).await.expect("build auth");
        assert!(header.starts_with("Nostr "));

        let encoded = header.strip_prefix("Nostr ").unwrap();
        let decoded = BASE64.decode(encoded).expect("decode");
        let json = String::from_utf8(decoded).expect("utf8");
        assert!(json.contains("deadbeef"));
        assert!(json.contains("\"upload\""));
    }

    #[tokio::test]
    async fn delete_auth_tags_the_delete_verb() {
        let signer = LocalKeySigner::generate();
        let header = build_delete_auth("deadbeef", 60, &signer).await.expect("build auth");

        let encoded = header.strip_prefix("Nostr ").expect("nostr prefix");
        let decoded = BASE64.decode(encoded).expect("decode");
        let json = String::from_utf8(decoded).expect("utf8");
        assert!(json.contains("\"delete\""));
        assert!(!json.contains("\"upload\""));
    }
}
