//! Loader behavior against a real SQLite store.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use ug_platform::group::entity::GroupInsert;
use ug_platform::membership::entity::MembershipInsert;
use ug_platform::shared::authorization_service::AuthenticatedPolicy;
use ug_platform::store::entity::Entity;
use ug_platform::store::schema::init_schema;
use ug_platform::store::{connect_in_memory, EntityStore, SqlValue, WhereFilter};
use ug_platform::user::entity::{User, UserInsert, UserUpdate};
use ug_platform::{
    AppState, Caller, LoaderRegistry, LoaderSettings, RequestContext, Result, Stores,
    UpdateOutcome,
};

/// Wraps a store and journals the key batches it is asked for
struct CountingStore<E: Entity> {
    inner: Arc<dyn EntityStore<E>>,
    batches: Mutex<Vec<Vec<Uuid>>>,
    fetch_calls: AtomicU32,
}

impl<E: Entity> CountingStore<E> {
    fn wrap(inner: Arc<dyn EntityStore<E>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            batches: Mutex::new(Vec::new()),
            fetch_calls: AtomicU32::new(0),
        })
    }

    fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for CountingStore<E> {
    async fn fetch_by_ids(&self, ids: &[Uuid]) -> Result<Vec<E>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().push(ids.to_vec());
        self.inner.fetch_by_ids(ids).await
    }

    async fn filter_by(&self, field: &str, value: SqlValue) -> Result<Vec<E>> {
        self.inner.filter_by(field, value).await
    }

    async fn page(&self, skip: i64, limit: i64, filter: Option<&WhereFilter>) -> Result<Vec<E>> {
        self.inner.page(skip, limit, filter).await
    }

    async fn insert(&self, id: Uuid, now: DateTime<Utc>, input: &E::Insert) -> Result<E> {
        self.inner.insert(id, now, input).await
    }

    async fn update(&self, now: DateTime<Utc>, input: &E::Update) -> Result<UpdateOutcome<E>> {
        self.inner.update(now, input).await
    }
}

struct Fixture {
    stores: Stores,
    users: Arc<CountingStore<User>>,
}

async fn fixture() -> Fixture {
    let pool = connect_in_memory().await.unwrap();
    init_schema(&pool).await.unwrap();

    let mut stores = Stores::sqlite(pool);
    let users = CountingStore::wrap(stores.users.clone());
    stores.users = users.clone();
    Fixture { stores, users }
}

fn user_input(name: &str) -> UserInsert {
    UserInsert {
        id: None,
        name: Some(name.to_string()),
        surname: Some("Tester".to_string()),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        valid: Some(true),
        createdby: None,
    }
}

/// Insert users through a throwaway registry so the loaders under test start cold.
async fn seed_users(stores: &Stores, names: &[&str]) -> Vec<Uuid> {
    let seeding = LoaderRegistry::new(stores.clone(), LoaderSettings::default());
    let mut ids = Vec::new();
    for name in names {
        ids.push(seeding.users().insert(user_input(name)).await.unwrap().id);
    }
    ids
}

#[tokio::test]
async fn test_concurrent_loads_share_one_batch() {
    let fx = fixture().await;
    let ids = seed_users(&fx.stores, &["Ann", "Bob", "Cid"]).await;

    let loaders = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());
    let (a, b, c) = tokio::join!(
        loaders.users().load(ids[0]),
        loaders.users().load(ids[1]),
        loaders.users().load(ids[2]),
    );

    assert_eq!(a.unwrap().unwrap().name.as_deref(), Some("Ann"));
    assert_eq!(b.unwrap().unwrap().name.as_deref(), Some("Bob"));
    assert_eq!(c.unwrap().unwrap().name.as_deref(), Some("Cid"));
    assert_eq!(fx.users.batch_sizes(), vec![3]);
}

#[tokio::test]
async fn test_duplicate_keys_fetched_once() {
    let fx = fixture().await;
    let ids = seed_users(&fx.stores, &["Ann"]).await;

    let loaders = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());
    let results = loaders.users().load_many(&[ids[0], ids[0], ids[0]]).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.as_ref().map(|u| u.id) == Some(ids[0])));
    assert_eq!(fx.users.batch_sizes(), vec![1]);

    // Second round is served from the cache
    loaders.users().load(ids[0]).await.unwrap();
    assert_eq!(fx.users.fetch_calls(), 1);
}

#[tokio::test]
async fn test_results_follow_key_order() {
    let fx = fixture().await;
    let ids = seed_users(&fx.stores, &["Ann", "Bob", "Cid"]).await;
    let missing = Uuid::new_v4();

    let loaders = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());
    let results = loaders
        .users()
        .load_many(&[ids[2], missing, ids[0]])
        .await
        .unwrap();

    let names: Vec<Option<String>> = results
        .iter()
        .map(|r| r.as_ref().and_then(|u| u.name.clone()))
        .collect();
    assert_eq!(names, vec![Some("Cid".to_string()), None, Some("Ann".to_string())]);
}

#[tokio::test]
async fn test_max_batch_size_splits_batches() {
    let fx = fixture().await;
    let ids = seed_users(&fx.stores, &["A1", "A2", "A3", "A4", "A5"]).await;

    let loaders = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::new(2, 0));
    let results = loaders.users().load_many(&ids).await.unwrap();

    assert!(results.iter().all(Option::is_some));
    assert_eq!(fx.users.batch_sizes(), vec![2, 2, 1]);
}

#[tokio::test]
async fn test_registries_do_not_share_caches() {
    let fx = fixture().await;
    let ids = seed_users(&fx.stores, &["Ann"]).await;

    let first = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());
    let second = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());

    first.users().load(ids[0]).await.unwrap();
    assert!(first.users().is_cached(ids[0]));
    assert!(!second.users().is_cached(ids[0]));

    second.users().load(ids[0]).await.unwrap();
    assert_eq!(fx.users.fetch_calls(), 2);
}

#[tokio::test]
async fn test_registry_materializes_lazily() {
    let fx = fixture().await;
    let loaders = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());
    assert!(loaders.materialized().is_empty());

    loaders.users().load(Uuid::new_v4()).await.unwrap();
    assert_eq!(loaders.materialized(), vec![User::KIND]);
}

#[tokio::test]
async fn test_update_with_stale_token_conflicts() {
    let fx = fixture().await;
    let ids = seed_users(&fx.stores, &["Ann"]).await;

    let loaders = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());
    let user = loaders.users().load(ids[0]).await.unwrap().unwrap();

    let rename = |lastchange, name: &str| UserUpdate {
        id: user.id,
        lastchange,
        name: Some(name.to_string()),
        surname: None,
        email: None,
        valid: None,
        changedby: None,
    };

    let updated = loaders
        .users()
        .update(rename(user.lastchange, "Anna"))
        .await
        .unwrap()
        .into_record()
        .unwrap();
    assert_eq!(updated.name.as_deref(), Some("Anna"));
    assert_eq!(updated.surname.as_deref(), Some("Tester"));
    assert!(updated.lastchange > user.lastchange);

    // Replaying the token the first update consumed must not apply
    let replay = loaders
        .users()
        .update(rename(user.lastchange, "Annie"))
        .await
        .unwrap();
    assert!(matches!(replay, UpdateOutcome::Conflict));

    let cached = loaders.users().load(ids[0]).await.unwrap().unwrap();
    assert_eq!(cached.name.as_deref(), Some("Anna"));
    assert_eq!(cached.lastchange, updated.lastchange);

    // A fresh request sees what the store holds
    let fresh = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());
    let stored = fresh.users().load(ids[0]).await.unwrap().unwrap();
    assert_eq!(stored.name.as_deref(), Some("Anna"));
    assert_eq!(stored.lastchange, updated.lastchange);
}

#[tokio::test]
async fn test_update_of_missing_record() {
    let fx = fixture().await;
    let loaders = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());

    let outcome = loaders
        .users()
        .update(UserUpdate {
            id: Uuid::new_v4(),
            lastchange: Utc::now(),
            name: Some("Ghost".to_string()),
            surname: None,
            email: None,
            valid: None,
            changedby: None,
        })
        .await
        .unwrap();
    assert!(matches!(outcome, UpdateOutcome::NotFound));
}

#[tokio::test]
async fn test_group_members_resolve_in_one_batch() {
    let fx = fixture().await;
    let ids = seed_users(&fx.stores, &["Ann", "Bob", "Cid"]).await;
    let actor = ids[0];

    let state = AppState::new(
        fx.stores.clone(),
        LoaderSettings::default(),
        Arc::new(AuthenticatedPolicy),
    );
    let setup = RequestContext::from_state(&state, Some(Caller::new(actor)));

    let group = setup
        .loaders()
        .groups()
        .insert(GroupInsert {
            id: None,
            name: Some("Faculty".to_string()),
            name_en: None,
            email: None,
            abbreviation: None,
            grouptype_id: None,
            mastergroup_id: None,
            valid: Some(true),
            createdby: Some(actor),
        })
        .await
        .unwrap();

    for user_id in &ids {
        setup
            .loaders()
            .memberships()
            .insert(MembershipInsert {
                id: None,
                user_id: *user_id,
                group_id: group.id,
                valid: Some(true),
                startdate: None,
                enddate: None,
                createdby: Some(actor),
            })
            .await
            .unwrap();
    }

    let ctx = RequestContext::from_state(&state, Some(Caller::new(actor)));
    let group = ctx.loaders().groups().load(group.id).await.unwrap().unwrap();
    let calls_before = fx.users.fetch_calls();

    let members = group.members(&ctx).await.unwrap();

    let mut names: Vec<String> = members.iter().filter_map(|u| u.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["Ann", "Bob", "Cid"]);
    assert_eq!(fx.users.fetch_calls() - calls_before, 1);
    assert_eq!(fx.users.batch_sizes().last(), Some(&3));
}

#[tokio::test]
async fn test_page_bounds() {
    let fx = fixture().await;
    seed_users(&fx.stores, &["Ann", "Bob", "Cid"]).await;
    let loaders = LoaderRegistry::new(fx.stores.clone(), LoaderSettings::default());

    assert_eq!(loaders.users().page(0, 10, None).await.unwrap().len(), 3);
    assert!(loaders.users().page(5, 10, None).await.unwrap().is_empty());

    let filter = WhereFilter::eq::<User>("name", "Bob").unwrap();
    let rows = loaders.users().page(0, 10, Some(&filter)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name.as_deref(), Some("Bob"));

    assert!(loaders.users().page(-1, 10, None).await.is_err());
    assert!(loaders.users().page(0, 0, None).await.is_err());
}
