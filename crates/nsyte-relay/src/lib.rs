//! Remote Manifest Fetcher (spec 4.C) and Event Publisher (spec 4.F).
//!
//! Built on `nostr_sdk::Client` with a request/response/error-mapping
//! shape (one HTTP client, one narrow set of methods, status codes
//! mapped to a closed error taxonomy) scaled from a single endpoint up
//! to a relay pool: the same "map transport outcomes onto a closed error
//! set" discipline, applied to relay round trips instead of HTTP calls.

mod builders;
mod fetch;
mod publish;

pub use builders::{
    delete_event_builder, manifest_event_builder, profile_event_builder, relay_list_event_builder,
    server_list_event_builder,
};
pub use fetch::{fetch_manifest, query_event_presence, FetchTimeouts};
pub use publish::{publish_event, PublishTimeouts};
