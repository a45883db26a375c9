//! Shared helpers for resolver integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use fedview_core::fixtures::{emoji_tag, image_attachment, note, person, StaticFetcher};
use fedview_core::{ActorObject, Image, Linked, PostObject};
use fedview_resolver::{HostProbe, ProbeFailure, ProbeOutcome, Resolver, ResolverConfig};

/// A probe with fixed answers that records every call.
pub struct ScriptedProbe {
    discovery: ProbeOutcome,
    reachability: ProbeOutcome,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(discovery: ProbeOutcome, reachability: ProbeOutcome) -> Arc<Self> {
        Arc::new(Self {
            discovery,
            reachability,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Both probes succeed.
    pub fn healthy() -> Arc<Self> {
        Self::new(Ok(()), Ok(()))
    }

    /// Discovery succeeds; the host refuses plain connections.
    pub fn refusing() -> Arc<Self> {
        Self::new(Ok(()), Err(ProbeFailure::ConnectionRefused))
    }

    /// Discovery fails.
    pub fn silent() -> Arc<Self> {
        Self::new(Err(ProbeFailure::Timeout), Err(ProbeFailure::Timeout))
    }

    /// Calls as `"discovery:host"` / `"reachability:host"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostProbe for ScriptedProbe {
    async fn discovery(&self, host: &str) -> ProbeOutcome {
        self.calls.lock().unwrap().push(format!("discovery:{host}"));
        self.discovery.clone()
    }

    async fn reachability(&self, host: &str) -> ProbeOutcome {
        self.calls.lock().unwrap().push(format!("reachability:{host}"));
        self.reachability.clone()
    }
}

pub const HOST: &str = "m.example";
pub const ALICE: &str = "https://m.example/users/alice";
pub const ALICE_HANDLE: &str = "@alice@m.example";

pub fn status_url(n: u32) -> String {
    format!("{ALICE}/statuses/{n}")
}

/// Alice, with an avatar and a custom emoji in her name.
pub fn alice() -> ActorObject {
    let mut actor = person(ALICE, "alice");
    actor.name = Some("Alice :wave:".to_string());
    actor.icon = Some(Linked::Embedded(Image::new(
        "https://m.example/media/alice.png",
    )));
    actor.tags = vec![emoji_tag(":wave:", "https://m.example/emoji/wave.png")];
    actor
}

/// A post by Alice with an emoji and an image.
pub fn alice_post(n: u32) -> PostObject {
    let mut post = note(&status_url(n), &format!("<p>post {n} :blobcat:</p>"));
    post.attributed_to = Some(ALICE.to_string());
    post.tags = vec![emoji_tag(":blobcat:", "https://m.example/emoji/blobcat.png")];
    post.attachments = vec![image_attachment(
        "https://m.example/media/1.png",
        Some("a cat"),
    )];
    post
}

/// A fetcher serving Alice under her id and handle.
pub fn fetcher_with_alice() -> StaticFetcher {
    StaticFetcher::new().with_actor(alice(), Some(ALICE_HANDLE))
}

pub fn config() -> ResolverConfig {
    ResolverConfig::default()
        .with_fetch_timeout(Duration::from_millis(300))
        .with_probe_timeout(Duration::from_millis(300))
}

pub fn resolver(fetcher: StaticFetcher, probe: Arc<ScriptedProbe>) -> Resolver {
    Resolver::new(Arc::new(fetcher), probe, config()).unwrap()
}
