//! Behavioural tests for user provisioning over the in-memory store.
//!
//! These scenarios pin the repository contract without a database: identity
//! assignment, `userName` uniqueness, collection reconciliation through
//! replace and patch, cascading delete and query translation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use scim_backend::domain::ports::{UserProvisioning, UserStoreError};
use scim_backend::domain::{
    CORE_USER_SCHEMA, ComparisonOperator, Email, ErrorCode, Filter, InstantMessaging, Patch,
    PatchOp, PatchOperation, PatchRequest, ProvisioningError, QueryParameters, User,
    UserProvisioningService,
};
use scim_backend::test_support::{FixedClock, InMemoryUserStore};
use serde_json::json;

struct World {
    store: Arc<InMemoryUserStore>,
    clock: Arc<FixedClock>,
    service: UserProvisioningService<InMemoryUserStore>,
}

#[fixture]
fn world() -> World {
    let store = Arc::new(InMemoryUserStore::default());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp"),
    ));
    let service = UserProvisioningService::new(store.clone(), clock.clone());
    World {
        store,
        clock,
        service,
    }
}

fn user_with_emails(user_name: &str, emails: &[(&str, &str)]) -> User {
    User {
        emails: emails
            .iter()
            .map(|(item_type, value)| Email::tagged(*item_type, *value))
            .collect(),
        ..User::new(user_name)
    }
}

fn id_of(user: &User) -> String {
    user.id
        .as_ref()
        .map(|id| id.as_str().to_owned())
        .expect("stored user has an id")
}

#[rstest]
#[tokio::test]
async fn created_identifiers_are_fresh_and_distinct(world: World) {
    let mut seen = HashSet::new();
    for name in ["alice", "bob", "carol"] {
        let created = world
            .service
            .create(User::new(name))
            .await
            .expect("create succeeds");
        let id = id_of(&created);
        assert!(!id.trim().is_empty());
        assert!(seen.insert(id));
    }
    assert_eq!(world.store.len(), 3);
}

#[rstest]
#[case(Vec::new())]
#[case(vec![("work", "other@example.com")])]
#[tokio::test]
async fn duplicate_alice_conflicts_regardless_of_collections(
    world: World,
    #[case] emails: Vec<(&'static str, &'static str)>,
) {
    world
        .service
        .create(user_with_emails("alice", &[("home", "alice@example.com")]))
        .await
        .expect("first alice");

    let err = world
        .service
        .create(user_with_emails("alice", &emails))
        .await
        .expect_err("second alice");

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(world.store.len(), 1);
}

#[rstest]
#[tokio::test]
async fn replace_then_retrieve_returns_the_replacement_collections(world: World) {
    let created = world
        .service
        .create(user_with_emails(
            "alice",
            &[("work", "a@work.example"), ("home", "a@home.example")],
        ))
        .await
        .expect("create");
    let work_key = created
        .emails
        .iter()
        .find(|email| email.item_type.as_deref() == Some("work"))
        .and_then(|email| email.key);
    world.clock.advance_seconds(30);

    let mut resource = created.clone();
    resource.emails = vec![
        Email::tagged("work", "a@new-work.example"),
        Email::tagged("other", "a@other.example"),
    ];
    resource.ims = vec![InstantMessaging::tagged("xmpp", "alice@chat.example")];
    world.service.replace(resource).await.expect("replace");
    let fetched = world
        .service
        .retrieve(&id_of(&created))
        .await
        .expect("retrieve");

    assert_eq!(fetched.id, created.id);
    let emails: Vec<_> = fetched
        .emails
        .iter()
        .map(|email| (email.item_type.as_deref(), email.value.as_deref()))
        .collect();
    assert_eq!(
        emails,
        vec![
            (Some("other"), Some("a@other.example")),
            (Some("work"), Some("a@new-work.example")),
        ]
    );
    assert_eq!(fetched.emails[1].key, work_key);
    assert_eq!(fetched.ims.len(), 1);
    let meta = fetched.meta.expect("meta");
    assert_eq!(meta.created, created.meta.expect("created meta").created);
    assert!(meta.last_modified > meta.created);
}

#[rstest]
#[tokio::test]
async fn replacing_an_unknown_user_is_not_found(world: World) {
    let mut ghost = User::new("ghost");
    ghost.id = Some(scim_backend::domain::UserId::generate());

    let err = world.service.replace(ghost).await.expect_err("unknown id");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn patch_without_request_is_invalid(world: World) {
    let created = world
        .service
        .create(User::new("alice"))
        .await
        .expect("create");
    let patch = Patch {
        resource_identifier: Some(id_of(&created)),
        request: None,
    };

    let err = world.service.update(&patch).await.expect_err("null request");

    assert_eq!(err.code(), ErrorCode::InvalidPatch);
}

#[rstest]
#[tokio::test]
async fn patch_edits_scalars_and_collections_in_one_step(world: World) {
    let created = world
        .service
        .create(user_with_emails("alice", &[("work", "a@work.example")]))
        .await
        .expect("create");
    let patch = Patch::new(
        id_of(&created),
        PatchRequest::new(vec![
            PatchOperation::new(PatchOp::Replace, Some("displayName"), Some(json!("Alice"))),
            PatchOperation::new(
                PatchOp::Add,
                Some("emails[type eq \"home\"].value"),
                Some(json!("a@home.example")),
            ),
            PatchOperation::new(PatchOp::Remove, Some("emails[type eq \"work\"]"), None),
        ]),
    );

    world.service.update(&patch).await.expect("patch applies");
    let fetched = world
        .service
        .retrieve(&id_of(&created))
        .await
        .expect("retrieve");

    assert_eq!(fetched.display_name.as_deref(), Some("Alice"));
    assert_eq!(fetched.emails.len(), 1);
    assert_eq!(fetched.emails[0].item_type.as_deref(), Some("home"));
    assert!(fetched.emails[0].key.is_some());
}

#[rstest]
#[tokio::test]
async fn patching_onto_a_taken_user_name_conflicts(world: World) {
    world
        .service
        .create(User::new("alice"))
        .await
        .expect("alice");
    let bob = world.service.create(User::new("bob")).await.expect("bob");
    let patch = Patch::new(
        id_of(&bob),
        PatchRequest::new(vec![PatchOperation::new(
            PatchOp::Replace,
            Some("userName"),
            Some(json!("alice")),
        )]),
    );

    let err = world.service.update(&patch).await.expect_err("taken name");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn delete_removes_the_user_and_its_collections(world: World) {
    let created = world
        .service
        .create(user_with_emails("alice", &[("work", "a@work.example")]))
        .await
        .expect("create");

    world
        .service
        .delete(&id_of(&created))
        .await
        .expect("delete");
    let err = world
        .service
        .retrieve(&id_of(&created))
        .await
        .expect_err("gone");

    assert!(matches!(err, ProvisioningError::NotFound { .. }));
    assert!(world.store.is_empty());
}

#[rstest]
#[tokio::test]
async fn query_on_empty_store_returns_nothing(world: World) {
    let users = world
        .service
        .query(&QueryParameters::all(CORE_USER_SCHEMA))
        .await
        .expect("query");

    assert!(users.is_empty());
}

#[rstest]
#[tokio::test]
async fn user_name_equality_returns_exact_matches(world: World) {
    for name in ["alice", "alicia", "bob"] {
        world
            .service
            .create(User::new(name))
            .await
            .expect("create");
    }

    let users = world
        .service
        .query(&QueryParameters::filtered(
            CORE_USER_SCHEMA,
            Filter::equals("USERNAME", "alice"),
        ))
        .await
        .expect("query");

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_name, "alice");
}

#[rstest]
#[case(ComparisonOperator::Contains, ErrorCode::UnsupportedOperator)]
#[case(ComparisonOperator::Equals, ErrorCode::UnsupportedFilterAttribute)]
#[tokio::test]
async fn unsupported_filters_are_reported(
    world: World,
    #[case] operator: ComparisonOperator,
    #[case] expected: ErrorCode,
) {
    let filter = Filter {
        attribute_path: Some(if operator == ComparisonOperator::Equals {
            "title".to_owned()
        } else {
            "userName".to_owned()
        }),
        operator,
        comparison_value: Some("x".to_owned()),
    };

    let err = world
        .service
        .query(&QueryParameters::filtered(CORE_USER_SCHEMA, filter))
        .await
        .expect_err("unsupported filter");

    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn store_outages_surface_as_service_unavailable(world: World) {
    world
        .store
        .fail_with(Some(UserStoreError::connection("connection refused")));

    let err = world
        .service
        .create(User::new("alice"))
        .await
        .expect_err("store down");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}
