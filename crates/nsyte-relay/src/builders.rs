//! The five signed event shapes nsyte publishes — spec §3/4.F.

use nostr::{EventBuilder, Kind, Tag, TagKind};

use nsyte_types::{CLIENT_TAG_VALUE, DELETE_KIND, NSITE_KIND, PROFILE_KIND, RELAY_LIST_KIND, SERVER_LIST_KIND};

fn client_tag() -> Tag {
    Tag::custom(TagKind::Custom("client".into()), vec![CLIENT_TAG_VALUE.to_string()])
}

/// Manifest event (kind [`NSITE_KIND`]): `d=<path>`, `x=<digest>`.
pub fn manifest_event_builder(path: &str, digest: &str) -> EventBuilder {
    EventBuilder::new(Kind::Custom(NSITE_KIND), "")
        .tag(Tag::identifier(path))
        .tag(Tag::custom(TagKind::Custom("x".into()), vec![digest.to_string()]))
        .tag(client_tag())
}

/// Delete event (kind [`DELETE_KIND`], NIP-09): one `e` tag per
/// tombstoned manifest event id, short human-readable note as content.
pub fn delete_event_builder(tombstoned_event_ids: &[String], note: &str) -> EventBuilder {
    let mut builder = EventBuilder::new(Kind::Custom(DELETE_KIND), note).tag(client_tag());
    for id in tombstoned_event_ids {
        builder = builder.tag(Tag::custom(TagKind::Custom("e".into()), vec![id.clone()]));
    }
    builder
}

/// Profile event (kind [`PROFILE_KIND`]): raw JSON profile payload.
pub fn profile_event_builder(content_json: &str) -> EventBuilder {
    EventBuilder::new(Kind::Custom(PROFILE_KIND), content_json).tag(client_tag())
}

/// Relay-list event (kind [`RELAY_LIST_KIND`], NIP-65): one `r` tag per
/// relay, carrying read/write markers.
pub fn relay_list_event_builder(relays: &[(String, bool, bool)]) -> EventBuilder {
    let mut builder = EventBuilder::new(Kind::Custom(RELAY_LIST_KIND), "").tag(client_tag());
    for (url, read, write) in relays {
        let mut values = vec![url.clone()];
        match (read, write) {
            (true, true) => {}
            (true, false) => values.push("read".to_string()),
            (false, true) => values.push("write".to_string()),
            (false, false) => {}
        }
        builder = builder.tag(Tag::custom(TagKind::Custom("r".into()), values));
    }
    builder
}

/// Server-list event (kind [`SERVER_LIST_KIND`]): one `server` tag per
/// configured blob server.
pub fn server_list_event_builder(servers: &[String]) -> EventBuilder {
    let mut builder = EventBuilder::new(Kind::Custom(SERVER_LIST_KIND), "").tag(client_tag());
    for server in servers {
        builder = builder.tag(Tag::custom(TagKind::Custom("server".into()), vec![server.clone()]));
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr::{Keys, JsonUtil};

    #[test]
    fn manifest_builder_carries_d_and_x_tags() {
        let keys = Keys::generate();
        let event = manifest_event_builder("/index.html", "deadbeef")
            .sign_with_keys(&keys)
            .expect("sign");
        assert_eq!(event.kind, Kind::Custom(NSITE_KIND));
        assert!(event.content.is_empty());
        let json = event.as_json();
        assert!(json.contains("\"/index.html\""));
        assert!(json.contains("deadbeef"));
        assert!(json.contains("nsyte"));
    }

    #[test]
    fn delete_builder_tags_every_event_id() {
        let keys = Keys::generate();
        let ids = vec!["id1".to_string(), "id2".to_string()];
        let event = delete_event_builder(&ids, "removed 2 files")
            .sign_with_keys(&keys)
            .expect("sign");
        assert_eq!(event.kind, Kind::Custom(DELETE_KIND));
        assert_eq!(event.content, "removed 2 files");
        let e_tags: Vec<_> = event.tags.iter().filter(|t| t.kind().as_str() == "e").collect();
        assert_eq!(e_tags.len(), 2);
    }

    #[test]
    fn relay_list_builder_encodes_read_write_markers() {
        let keys = Keys::generate();
        let relays = vec![
            ("wss://r1".to_string(), true, true),
            ("wss://r2".to_string(), true, false),
        ];
        let event = relay_list_event_builder(&relays).sign_with_keys(&keys).expect("sign");
        assert_eq!(event.kind, Kind::Custom(RELAY_LIST_KIND));
        let json = event.as_json();
        assert!(json.contains("wss://r1"));
        assert!(json.contains("wss://r2"));
        assert!(json.contains("read"));
    }

    #[test]
    fn server_list_builder_one_tag_per_server() {
        let keys = Keys::generate();
        let servers = vec!["https://s1".to_string(), "https://s2".to_string()];
        let event = server_list_event_builder(&servers).sign_with_keys(&keys).expect("sign");
        let server_tags: Vec<_> = event.tags.iter().filter(|t| t.kind().as_str() == "server").collect();
        assert_eq!(server_tags.len(), 2);
    }
}
