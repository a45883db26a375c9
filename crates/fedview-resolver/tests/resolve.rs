//! Single-object resolution and failure classification.

mod common;

use std::sync::Arc;

use fedview_core::fixtures::{note, person, StaticFetcher};
use fedview_core::{
    replace_custom_emojis, FederationObject, FetchError, NormalizedIdentifier,
    DEFAULT_EMOJI_CLASS,
};
use fedview_resolver::{
    BlockingHeuristic, ErrorKind, Resolution, Resolver, UnreachableReason,
};

use common::*;

#[tokio::test]
async fn test_resolve_post_with_author() {
    let fetcher = fetcher_with_alice().with_post(alice_post(1));
    let probe = ScriptedProbe::healthy();
    let resolver = resolver(fetcher, probe.clone());

    let resolved = resolver
        .resolve_post(&NormalizedIdentifier::post_url(status_url(1)))
        .await
        .unwrap();

    assert_eq!(resolved.post.id, status_url(1));
    assert_eq!(resolved.post.emojis.len(), 1);
    assert_eq!(resolved.post.emojis[0].shortcode, ":blobcat:");
    assert_eq!(resolved.post.images().count(), 1);
    assert_eq!(
        resolved.post.attachments[0].alt_text.as_deref(),
        Some("a cat")
    );

    assert_eq!(resolved.author.id, ALICE);
    assert_eq!(resolved.author.display_name, "Alice :wave:");
    assert_eq!(
        resolved.author.avatar_url.as_deref(),
        Some("https://m.example/media/alice.png")
    );
    assert_eq!(resolved.author.emojis.len(), 1);
    assert_eq!(resolved.author.handle(), ALICE_HANDLE);

    let html = replace_custom_emojis(
        &resolved.post.content_html,
        &resolved.post.emojis,
        DEFAULT_EMOJI_CLASS,
    );
    assert!(html.contains("<img"));
    assert!(!html.contains(":blobcat:</p>"));

    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_missing_author_is_not_found() {
    let fetcher = StaticFetcher::new().with_post(alice_post(1));
    let probe = ScriptedProbe::healthy();
    let resolver = resolver(fetcher.clone(), probe.clone());

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url(status_url(1)))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.hostname, HOST);
    assert!(fetcher.lookups().contains(&ALICE.to_string()));
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_underivable_author_is_not_found() {
    let fetcher = StaticFetcher::new().with_post(note("https://m.example/notes/abc", "hi"));
    let resolver = resolver(fetcher.clone(), ScriptedProbe::healthy());

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url("https://m.example/notes/abc"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(fetcher.lookups().len(), 1);
}

#[tokio::test]
async fn test_non_post_is_not_found() {
    let resolver = resolver(fetcher_with_alice(), ScriptedProbe::healthy());

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url(ALICE))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url(status_url(99)))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_status_errors_are_classified_without_probes() {
    let gone = status_url(1);
    let private = status_url(2);
    let fetcher = StaticFetcher::new()
        .with_failure(gone.clone(), FetchError::status(410, gone.clone()))
        .with_failure(private.clone(), FetchError::status(403, private.clone()));
    let probe = ScriptedProbe::silent();
    let resolver = resolver(fetcher, probe.clone());

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url(gone))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url(private))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_not_found_text_needs_no_probe() {
    let probe = ScriptedProbe::silent();
    let resolver = resolver(StaticFetcher::new(), probe.clone());

    let err = resolver
        .classifier()
        .classify_message("Request failed with status code 404", "gone.example")
        .await;

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.hostname, "gone.example");
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_refused_connection_with_silent_discovery_is_blocked() {
    let probe = ScriptedProbe::silent();
    let resolver = resolver(StaticFetcher::new(), probe.clone());

    let err = resolver
        .classifier()
        .classify_message("fetch failed: ECONNREFUSED", "down.example")
        .await;

    assert_eq!(err.kind, ErrorKind::FederationBlocked);
    assert_eq!(probe.calls(), vec!["discovery:down.example".to_string()]);
}

#[tokio::test]
async fn test_port_number_is_not_a_status_code() {
    let probe = ScriptedProbe::refusing();
    let resolver = resolver(StaticFetcher::new(), probe.clone());

    let err = resolver
        .classifier()
        .classify_message(
            "fetch failed: connect ECONNREFUSED 127.0.0.1:4100",
            "down.example",
        )
        .await;

    assert_eq!(
        err.kind,
        ErrorKind::NetworkUnreachable(UnreachableReason::ConnectionRefused)
    );
    assert_eq!(probe.calls().len(), 2);
}

#[tokio::test]
async fn test_refused_connection_with_reachable_discovery_is_unreachable() {
    let probe = ScriptedProbe::refusing();
    let resolver = resolver(StaticFetcher::new(), probe.clone());

    let err = resolver
        .classifier()
        .classify_message("fetch failed: ECONNREFUSED", "down.example")
        .await;

    assert_eq!(
        err.kind,
        ErrorKind::NetworkUnreachable(UnreachableReason::ConnectionRefused)
    );
    assert_eq!(
        probe.calls(),
        vec![
            "discovery:down.example".to_string(),
            "reachability:down.example".to_string()
        ]
    );
    assert_ne!(
        err.user_message(),
        fedview_resolver::ClassifiedError::new(ErrorKind::FederationBlocked, "down.example", "")
            .user_message()
    );
}

#[tokio::test]
async fn test_reachable_probe_falls_back_to_error_text() {
    let probe = ScriptedProbe::healthy();
    let resolver = resolver(StaticFetcher::new(), probe);

    let err = resolver
        .classifier()
        .classify_message("fetch failed: getaddrinfo ENOTFOUND gone.example", "gone.example")
        .await;
    assert_eq!(err.kind, ErrorKind::NetworkUnreachable(UnreachableReason::Dns));

    let err = resolver
        .classifier()
        .classify_message("fetch failed: socket hang up", "flaky.example")
        .await;
    assert_eq!(
        err.kind,
        ErrorKind::NetworkUnreachable(UnreachableReason::Generic)
    );
}

#[tokio::test]
async fn test_known_blocking_host_skips_probes() {
    let probe = ScriptedProbe::healthy();
    let config = config().with_heuristic(BlockingHeuristic::with_blocked_hosts(["blocked.example"]));
    let resolver = Resolver::new(Arc::new(StaticFetcher::new()), probe.clone(), config).unwrap();

    let err = resolver
        .classifier()
        .classify(
            &FetchError::ConnectionRefused {
                host: "social.blocked.example".to_string(),
            },
            "social.blocked.example",
        )
        .await;

    assert_eq!(err.kind, ErrorKind::FederationBlocked);
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_discovery_failure_policy_can_be_relaxed() {
    let probe = ScriptedProbe::new(
        Err(fedview_resolver::ProbeFailure::ConnectionRefused),
        Ok(()),
    );
    let heuristic = BlockingHeuristic {
        discovery_failure_implies_blocked: false,
        ..BlockingHeuristic::default()
    };
    let resolver = Resolver::new(
        Arc::new(StaticFetcher::new()),
        probe.clone(),
        config().with_heuristic(heuristic),
    )
    .unwrap();

    let err = resolver
        .classifier()
        .classify_message("fetch failed: ECONNREFUSED", "down.example")
        .await;
    assert_eq!(
        err.kind,
        ErrorKind::NetworkUnreachable(UnreachableReason::ConnectionRefused)
    );
    assert_eq!(probe.calls().len(), 1);
}

#[tokio::test]
async fn test_network_failure_on_post_fetch_is_probed() {
    let target = "https://down.example/users/bob/statuses/1";
    let fetcher = StaticFetcher::new().with_failure(
        target,
        FetchError::ConnectionRefused {
            host: "down.example".to_string(),
        },
    );
    let probe = ScriptedProbe::silent();
    let resolver = resolver(fetcher, probe.clone());

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url(target))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::FederationBlocked);
    assert_eq!(err.hostname, "down.example");
    assert_eq!(probe.calls(), vec!["discovery:down.example".to_string()]);
}

#[tokio::test]
async fn test_author_failure_is_blamed_on_author_host() {
    let viewed = "https://a.example/@bob@b.example/1";
    let canonical = "https://b.example/users/bob/statuses/1";
    let fetcher = StaticFetcher::new()
        .with_object(viewed, FederationObject::Post(note(canonical, "<p>hi</p>")))
        .with_failure(
            "https://b.example/users/bob",
            FetchError::ConnectionRefused {
                host: "b.example".to_string(),
            },
        );
    let probe = ScriptedProbe::silent();
    let resolver = resolver(fetcher, probe.clone());

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url(viewed))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::FederationBlocked);
    assert_eq!(err.hostname, "b.example");
    assert_eq!(probe.calls(), vec!["discovery:b.example".to_string()]);
}

#[tokio::test]
async fn test_hung_fetch_times_out() {
    let target = status_url(7);
    let fetcher = StaticFetcher::new().with_hang(target.clone());
    let probe = ScriptedProbe::healthy();
    let resolver = resolver(fetcher, probe.clone());

    let err = resolver
        .resolve_post(&NormalizedIdentifier::post_url(target))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_resolve_profile_with_totals() {
    let actor = alice();
    let followers = actor.followers.clone().unwrap();
    let following = actor.following.clone().unwrap();
    let outbox = actor.outbox.clone().unwrap();
    let fetcher = fetcher_with_alice()
        .with_total(followers, 42)
        .with_total(outbox, 7)
        .with_failure(following.clone(), FetchError::status(403, following));
    let resolver = resolver(fetcher, ScriptedProbe::healthy());

    let profile = resolver
        .resolve_profile(&NormalizedIdentifier::handle("alice", HOST))
        .await
        .unwrap();

    assert_eq!(profile.preferred_username, "alice");
    assert_eq!(profile.followers_count, Some(42));
    assert_eq!(profile.following_count, None);
    assert_eq!(profile.outbox_count, Some(7));
}

#[tokio::test]
async fn test_resolve_profile_rejects_non_actor() {
    let fetcher = StaticFetcher::new().with_post(alice_post(1));
    let resolver = resolver(fetcher, ScriptedProbe::healthy());

    let err = resolver
        .resolve_profile(&NormalizedIdentifier::post_url(status_url(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_resolve_one_dispatches_on_kind() {
    let fetcher = fetcher_with_alice().with_post(alice_post(3));
    let resolver = resolver(fetcher, ScriptedProbe::healthy());

    let post = resolver
        .resolve_one(&resolver.normalize(&format!("https://elk.zone/{HOST}/users/alice/statuses/3")))
        .await
        .unwrap();
    assert!(matches!(post, Resolution::Post(ref p) if p.post.id == status_url(3)));

    let profile = resolver
        .resolve_one(&resolver.normalize("alice@m.example"))
        .await
        .unwrap();
    assert!(matches!(profile, Resolution::Profile(ref a) if a.id == ALICE));
}

#[tokio::test]
async fn test_broken_avatar_is_tolerated() {
    let mut actor = person(ALICE, "alice");
    actor.icon = Some(fedview_core::Linked::Link(
        "https://m.example/media/missing.png".to_string(),
    ));
    let fetcher = StaticFetcher::new()
        .with_actor(actor, None)
        .with_post(alice_post(1));
    let resolver = resolver(fetcher, ScriptedProbe::healthy());

    let resolved = resolver
        .resolve_post(&NormalizedIdentifier::post_url(status_url(1)))
        .await
        .unwrap();
    assert_eq!(resolved.author.avatar_url, None);
}
