use futures::join;
use lingocore::{
    ac::{
        IdentityWatch,
        UserId,
    },
    favorite::traits::FavoriteBackend,
    filter::Filter,
    store::KeyedStore,
};
use lingoctrl::{
    coordinator::{
        FetchCoordinator,
        LoadOutcome,
        Visibility,
    },
    cursor::PageCursor,
    error::{
        Error,
        Notice,
    },
    favorite::FavoriteCache,
    platform::Builder,
};
use serde_json::json;
use std::{
    sync::Arc,
    time::Duration,
};
use test_lingo::{
    fixtures::{
        entries,
        teacher,
        teachers,
    },
    sqlite::create_sqlite_store,
    store::MemoryStore,
};

fn coordinator(store: &MemoryStore, page_size: usize) -> anyhow::Result<FetchCoordinator> {
    Ok(FetchCoordinator::new(
        Arc::new(store.clone()),
        PageCursor::new("teachers", page_size)?,
    ))
}

#[async_std::test]
async fn load_more_until_exhausted() -> anyhow::Result<()> {
    let store = MemoryStore::with_teachers("teachers", &teachers(10, 25.0));
    let coordinator = coordinator(&store, 4)?;

    assert_eq!(coordinator.load_more().await?, LoadOutcome::Loaded(4));
    assert_eq!(coordinator.len(), 4);
    assert_eq!(coordinator.load_more().await?, LoadOutcome::Loaded(4));
    assert_eq!(coordinator.len(), 8);
    assert!(coordinator.has_more());
    assert_eq!(coordinator.load_more().await?, LoadOutcome::Loaded(2));
    assert_eq!(coordinator.len(), 10);
    assert!(!coordinator.has_more());

    assert_eq!(coordinator.load_more().await?, LoadOutcome::Exhausted);
    assert_eq!(coordinator.len(), 10);
    assert_eq!(store.range_calls(), 3);
    Ok(())
}

#[async_std::test]
async fn refill_skips_filtered_out_page() -> anyhow::Result<()> {
    let mut all = teachers(4, 30.0);
    all.extend((4..10).map(|n| teacher(&format!("t{n:02}"), 15.0, &["English"], &[])));
    let store = MemoryStore::with_teachers("teachers", &all);
    let coordinator = coordinator(&store, 4)?;

    coordinator.start().await?;
    assert_eq!(coordinator.len(), 4);
    assert_eq!(coordinator.visible().len(), 4);

    // every teacher on the first page costs more than 20
    let visibility = coordinator.ensure_visible(Filter::new().max_price(20.0)).await?;
    assert_eq!(visibility, Visibility::Visible(4));
    assert_eq!(coordinator.len(), 8);
    assert_eq!(store.range_calls(), 2);
    let ids = coordinator.visible()
        .into_iter()
        .map(|t| t.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, ["t04", "t05", "t06", "t07"]);
    Ok(())
}

#[async_std::test]
async fn refill_terminates_on_no_matches() -> anyhow::Result<()> {
    let store = MemoryStore::with_teachers("teachers", &teachers(9, 30.0));
    let coordinator = coordinator(&store, 2)?;
    let visibility = coordinator.ensure_visible(Filter::new().language("German")).await?;
    assert_eq!(visibility, Visibility::NoMatches);
    assert_eq!(coordinator.len(), 9);
    assert!(!coordinator.has_more());
    // 4 full pages and a short one
    assert_eq!(store.range_calls(), 5);

    assert_eq!(
        coordinator.ensure_visible(Filter::new().language("German")).await?,
        Visibility::NoMatches,
    );
    assert_eq!(store.range_calls(), 5);
    Ok(())
}

#[async_std::test]
async fn reentrant_calls_while_fetching() -> anyhow::Result<()> {
    let store = MemoryStore::with_teachers("teachers", &teachers(6, 10.0));
    let gate = store.gate_ranges();
    let coordinator = coordinator(&store, 4)?;

    let (first, second, more) = join!(
        coordinator.start(),
        async {
            assert!(coordinator.is_fetching());
            assert!(coordinator.view().fetching);
            coordinator.ensure_visible(Filter::new()).await
        },
        async {
            let outcome = coordinator.load_more().await;
            gate.release(1);
            outcome
        },
    );
    assert_eq!(first?, Visibility::Visible(4));
    assert_eq!(second?, Visibility::InFlight);
    assert_eq!(more?, LoadOutcome::InFlight);
    assert_eq!(store.range_calls(), 1);
    assert!(!coordinator.is_fetching());
    assert_eq!(coordinator.last_seen_key().as_deref(), Some("t03"));
    Ok(())
}

#[async_std::test]
async fn failed_fetch_keeps_merged_records() -> anyhow::Result<()> {
    let store = MemoryStore::with_teachers("teachers", &teachers(10, 30.0));
    let coordinator = coordinator(&store, 4)?;
    coordinator.load_more().await?;

    store.fail_ranges(1);
    let err = coordinator.ensure_visible(Filter::new().max_price(1.0)).await
        .expect_err("the second page fails");
    assert!(matches!(err, Error::FetchFailed(_)));
    assert!(matches!(err.notice(), Some(Notice::Dismissable(_))));
    assert_eq!(coordinator.len(), 4);
    assert!(!coordinator.is_fetching());
    assert_eq!(coordinator.last_seen_key().as_deref(), Some("t03"));

    // a retry carries on from where the cursor was left
    assert_eq!(
        coordinator.ensure_visible(Filter::new().max_price(1.0)).await?,
        Visibility::NoMatches,
    );
    assert_eq!(coordinator.len(), 10);
    Ok(())
}

#[async_std::test]
async fn duplicate_ids_across_pages() -> anyhow::Result<()> {
    let store = MemoryStore::with_teachers("teachers", &teachers(4, 10.0));
    let coordinator = coordinator(&store, 4)?;
    coordinator.load_more().await?;

    // a concurrent writer replaced t03 and added t04; the cursor moves on
    // strictly after t03 so t03 is never refetched or overwritten.
    store.insert_teachers("teachers", &[
        teacher("t03", 99.0, &[], &[]),
        teacher("t04", 12.0, &[], &[]),
    ]);
    assert_eq!(coordinator.load_more().await?, LoadOutcome::Loaded(1));
    let view = coordinator.view();
    assert_eq!(view.total, 5);
    assert_eq!(view.teachers[3].price_per_hour, 10.0);
    Ok(())
}

#[async_std::test]
async fn failed_write_reconciles_from_store() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let u1 = UserId::from("u1");
    let favorites = FavoriteCache::new(Arc::new(store.clone()));
    favorites.load(Some(&u1)).await?;

    store.fail_writes(1);
    let gate = store.gate_writes();
    let (result, _) = join!(
        favorites.toggle(Some(&u1), "t5"),
        async {
            // optimistic state is visible before the write completes
            assert!(favorites.is_favorite(&u1, "t5"));
            gate.release(1);
        },
    );
    assert!(matches!(result, Err(Error::ToggleWriteFailed(_))));
    assert!(!favorites.is_favorite(&u1, "t5"));

    favorites.load(Some(&u1)).await?;
    assert!(!favorites.is_favorite(&u1, "t5"));
    Ok(())
}

#[async_std::test]
async fn reconciliation_picks_up_concurrent_changes() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let u1 = UserId::from("u1");
    let favorites = FavoriteCache::new(Arc::new(store.clone()));
    favorites.load(Some(&u1)).await?;

    // another session added t7 in the meantime; the failed toggle of t5
    // must leave the cache equal to what the store holds.
    store.add_favorite(&u1, "t7").await?;
    store.fail_writes(1);
    assert!(favorites.toggle(Some(&u1), "t5").await.is_err());
    assert_eq!(favorites.favorites(&u1), ["t7"]);
    assert_eq!(store.favorites(&u1).await?, ["t7"]);
    Ok(())
}

#[async_std::test]
async fn toggle_matches_store_after_success() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let u1 = UserId::from("u1");
    let favorites = FavoriteCache::new(Arc::new(store.clone()));
    favorites.load(Some(&u1)).await?;

    for id in ["t1", "t2", "t1", "t3"] {
        let favorite = favorites.toggle(Some(&u1), id).await?;
        assert_eq!(favorite, favorites.is_favorite(&u1, id));
    }
    let local = favorites.favorites(&u1);
    favorites.load(Some(&u1)).await?;
    assert_eq!(local, favorites.favorites(&u1));
    assert_eq!(local, ["t2", "t3"]);
    Ok(())
}

#[async_std::test]
async fn toggle_without_identity() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.insert("users/u1/favorites/t1", json!(true));
    let u1 = UserId::from("u1");
    let favorites = FavoriteCache::new(Arc::new(store.clone()));
    favorites.load(Some(&u1)).await?;

    let err = favorites.toggle(None, "t2").await
        .expect_err("no identity");
    assert!(matches!(err, Error::NotAuthenticated));
    assert!(matches!(err.notice(), Some(Notice::Prompt(_))));
    assert_eq!(favorites.favorites(&u1), ["t1"]);
    assert_eq!(favorites.active(), Some(u1));
    assert_eq!(store.write_calls(), 0);
    Ok(())
}

#[async_std::test]
async fn stale_load_is_discarded() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.insert("users/u1/favorites/t1", json!(true));
    let u1 = UserId::from("u1");
    let u2 = UserId::from("u2");
    let favorites = FavoriteCache::new(Arc::new(store.clone()));

    let gate = store.gate_writes();
    store.fail_writes(1);
    let (result, _) = join!(
        favorites.toggle(Some(&u1), "t9"),
        async {
            // the identity changes while the write is outstanding
            favorites.set_identity(Some(&u2));
            gate.release(1);
        },
    );
    assert!(result.is_err());
    assert!(!favorites.is_loaded(&u1));
    assert!(!favorites.is_favorite(&u1, "t9"));
    assert_eq!(favorites.active(), Some(u2));
    Ok(())
}

#[async_std::test]
async fn platform_follows_identity() -> anyhow::Result<()> {
    let store = MemoryStore::with_teachers("teachers", &teachers(3, 10.0));
    store.insert("users/u1/favorites/t01", json!(true));
    let identity = IdentityWatch::new();
    let platform = Builder::new()
        .store(store.clone())
        .identity(identity.clone())
        .build()?;
    assert_eq!(identity.subscriber_count(), 1);

    assert_eq!(platform.start().await?, Visibility::Visible(3));
    assert!(platform.listing().iter().all(|(_, favorite)| !favorite));
    assert!(matches!(
        platform.toggle_favorite("t00").await,
        Err(Error::NotAuthenticated)
    ));

    identity.set(Some("u1".into()));
    platform.refresh_favorites().await?;
    let marked = platform.listing()
        .into_iter()
        .filter(|(_, favorite)| *favorite)
        .map(|(t, _)| t.id)
        .collect::<Vec<_>>();
    assert_eq!(marked, ["t01"]);

    assert!(platform.toggle_favorite("t02").await?);
    assert!(platform.is_favorite("t02"));

    // signing out clears the cached favorites synchronously
    identity.set(None);
    assert!(!platform.is_favorite("t01"));
    assert!(!platform.favorites().is_loaded(&UserId::from("u1")));

    drop(platform);
    assert_eq!(identity.subscriber_count(), 0);
    Ok(())
}

/// Wait for work running in the background to satisfy `ready`.
async fn eventually(ready: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if ready() {
            return true;
        }
        async_std::task::sleep(Duration::from_millis(5)).await;
    }
    ready()
}

#[async_std::test]
async fn sign_in_loads_favorites() -> anyhow::Result<()> {
    let store = MemoryStore::with_teachers("teachers", &teachers(3, 10.0));
    store.insert("users/u1/favorites/t01", json!(true));
    let identity = IdentityWatch::new();
    let platform = Builder::new()
        .store(store.clone())
        .identity(identity.clone())
        .build()?;
    platform.start().await?;

    identity.set(Some("u1".into()));
    assert!(eventually(|| platform.favorites().is_loaded(&UserId::from("u1"))).await);
    let marked = platform.listing()
        .into_iter()
        .filter(|(_, favorite)| *favorite)
        .map(|(t, _)| t.id)
        .collect::<Vec<_>>();
    assert_eq!(marked, ["t01"]);

    // already a favorite, so toggling removes it
    assert!(!platform.toggle_favorite("t01").await?);
    assert!(!store.contains("users/u1/favorites/t01"));
    Ok(())
}

#[async_std::test]
async fn toggle_loads_unloaded_set_first() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.insert("users/u1/favorites/t01", json!(true));
    let u1 = UserId::from("u1");
    let favorites = FavoriteCache::new(Arc::new(store.clone()));

    assert!(!favorites.is_loaded(&u1));
    assert!(!favorites.toggle(Some(&u1), "t01").await?);
    assert!(!store.contains("users/u1/favorites/t01"));
    assert!(favorites.favorites(&u1).is_empty());
    assert_eq!(store.get_calls(), 1);

    // a failed read leaves nothing applied and nothing written
    let u2 = UserId::from("u2");
    store.fail_gets(1);
    assert!(favorites.toggle(Some(&u2), "t02").await.is_err());
    assert!(!favorites.is_favorite(&u2, "t02"));
    assert_eq!(store.write_calls(), 1);
    Ok(())
}

#[async_std::test]
async fn load_during_toggle_is_discarded() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let u1 = UserId::from("u1");
    let favorites = FavoriteCache::new(Arc::new(store.clone()));
    favorites.load(Some(&u1)).await?;

    let gate = store.gate_writes();
    let (toggled, loaded) = join!(
        favorites.toggle(Some(&u1), "t3"),
        async {
            // reads the store before the write lands
            let loaded = favorites.reload(&u1).await;
            gate.release(1);
            loaded
        },
    );
    assert!(toggled?);
    loaded?;
    assert_eq!(favorites.favorites(&u1), ["t3"]);
    Ok(())
}

#[async_std::test]
async fn sqlite_end_to_end() -> anyhow::Result<()> {
    let (_dir, backend) = create_sqlite_store().await?;
    for (key, value) in entries(&teachers(10, 30.0)) {
        backend.write(&format!("teachers/{key}"), value).await?;
    }
    backend.write("teachers/t10", serde_json::to_value(
        &teacher("t10", 18.0, &["French"], &["B2 Upper-Intermediate"]).profile
    )?).await?;

    let platform = Builder::new()
        .store(backend)
        .build()?;
    platform.switch_identity(Some("u1".into())).await?;
    platform.start().await?;
    let visibility = platform.set_filter(
        Filter::new()
            .language("French")
            .max_price(20.0)
    ).await?;
    assert_eq!(visibility, Visibility::Visible(1));
    let view = platform.view();
    assert_eq!(view.teachers[0].id, "t10");
    assert_eq!(view.total, 11);
    assert!(!view.has_more);

    assert!(platform.toggle_favorite("t10").await?);
    platform.refresh_favorites().await?;
    assert!(platform.is_favorite("t10"));
    assert_eq!(platform.store().favorites(&UserId::from("u1")).await?, ["t10"]);
    Ok(())
}
