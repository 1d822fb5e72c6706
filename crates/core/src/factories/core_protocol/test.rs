use super::*;
use crate::factories::{stasher_chain, CoreStashConfig, MemStorage};
use modproxy_test_utils::{enable_tracing, iter_check, upstream::*};
use std::time::Duration;

const MODULE: &str = "github.com/a/b";

struct TestCase {
    storage: Arc<MemStorage>,
    upstream: Arc<TestUpstream>,
    protocol: CoreProtocol,
}

fn setup(download_mode: DownloadMode) -> TestCase {
    enable_tracing();

    let storage = Arc::new(MemStorage::default());
    let upstream = TestUpstream::new();
    upstream.add_version(MODULE, "v1.0.0");
    upstream.add_version(MODULE, "v1.1.0");

    let stasher = stasher_chain(
        CoreStashConfig::default(),
        storage.clone(),
        upstream.clone(),
    );
    let protocol = CoreProtocol::new(
        storage.clone(),
        stasher,
        upstream.clone(),
        download_mode,
    );

    TestCase {
        storage,
        upstream,
        protocol,
    }
}

async fn save(storage: &MemStorage, module: &str, version: &str) {
    storage
        .save(
            module,
            version,
            go_mod_for(module),
            zip_from_bytes(zip_for(module, version)),
            info_for(version),
        )
        .await
        .unwrap();
}

fn versions(list: &[&str]) -> Vec<String> {
    list.iter().map(|v| v.to_string()).collect()
}

#[test]
fn union_keeps_first_seen_order() {
    let a = versions(&["v1.0.0", "v1.0.1"]);
    let b = versions(&["v1.0.0", "v1.0.2"]);

    assert_eq!(versions(&["v1.0.0", "v1.0.1", "v1.0.2"]), union(a.clone(), b));
    assert_eq!(a, union(a.clone(), a.clone()));
    assert_eq!(a, union(a.clone(), Vec::new()));
    assert!(union(Vec::new(), Vec::new()).is_empty());
}

#[tokio::test]
async fn list_merges_storage_and_upstream() {
    let tc = setup(DownloadMode::Sync);
    save(&tc.storage, MODULE, "v1.0.0").await;
    save(&tc.storage, MODULE, "v1.0.1").await;

    let upstream = TestUpstream::new();
    upstream.add_version(MODULE, "v1.0.0");
    upstream.add_version(MODULE, "v1.0.2");

    let list = list_merge(&*tc.storage, &*upstream, MODULE).await.unwrap();
    assert_eq!(versions(&["v1.0.0", "v1.0.1", "v1.0.2"]), list);
}

#[tokio::test]
async fn list_falls_back_to_upstream_when_storage_has_nothing() {
    let tc = setup(DownloadMode::Sync);

    let list = tc.protocol.list(MODULE).await.unwrap();
    assert_eq!(versions(&["v1.0.0", "v1.1.0"]), list);
    assert_eq!(1, tc.upstream.list_count());
}

#[tokio::test]
async fn list_falls_back_to_storage_when_repo_not_found() {
    let tc = setup(DownloadMode::Sync);
    save(&tc.storage, "github.com/gone/repo", "v1.0.0").await;

    let list = tc.protocol.list("github.com/gone/repo").await.unwrap();
    assert_eq!(versions(&["v1.0.0"]), list);
}

#[tokio::test]
async fn list_not_found_anywhere() {
    let tc = setup(DownloadMode::Sync);

    let err = tc.protocol.list("github.com/no/where").await.unwrap_err();
    assert_eq!(ErrorKind::NotFound, err.kind);
}

#[tokio::test]
async fn list_propagates_unexpected_upstream_errors() {
    let tc = setup(DownloadMode::Sync);
    save(&tc.storage, MODULE, "v1.0.0").await;

    tc.upstream.set_list_error(Some(ErrorKind::Unexpected));
    let err = tc.protocol.list(MODULE).await.unwrap_err();
    assert_eq!(ErrorKind::Unexpected, err.kind);

    tc.upstream.set_list_error(Some(ErrorKind::RateLimited));
    let err = tc.protocol.list(MODULE).await.unwrap_err();
    assert_eq!(ErrorKind::RateLimited, err.kind);
}

#[tokio::test]
async fn list_propagates_unexpected_storage_errors() {
    let mut storage = MockStorage::new();
    storage.expect_list().returning(|_| {
        Box::pin(async move { Err(ProxyError::other("disk on fire")) })
    });

    let mut lister = MockVersionLister::new();
    lister.expect_list().times(1).returning(|_| {
        Box::pin(async move { Ok((None, vec!["v1.0.0".to_string()])) })
    });

    let err = list_merge(&storage, &lister, MODULE).await.unwrap_err();
    assert_eq!(ErrorKind::Unexpected, err.kind);
    assert!(err.to_string().contains("disk on fire"));
}

#[tokio::test]
async fn info_reads_through_on_miss() {
    let tc = setup(DownloadMode::Sync);

    let info = tc.protocol.info(MODULE, "v1.0.0").await.unwrap();
    assert_eq!(info_for("v1.0.0"), info);
    assert_eq!(1, tc.upstream.fetch_count());

    // a second read is a cache hit
    let info = tc.protocol.info(MODULE, "v1.0.0").await.unwrap();
    assert_eq!(info_for("v1.0.0"), info);
    assert_eq!(1, tc.upstream.fetch_count());
}

#[tokio::test]
async fn go_mod_and_zip_read_through_on_miss() {
    let tc = setup(DownloadMode::Sync);

    let go_mod = tc.protocol.go_mod(MODULE, "v1.1.0").await.unwrap();
    assert_eq!(go_mod_for(MODULE), go_mod);

    let zip = tc.protocol.zip(MODULE, "v1.1.0").await.unwrap();
    let zip = collect_zip(zip).await.unwrap();
    assert_eq!(zip_for(MODULE, "v1.1.0"), zip);

    assert_eq!(1, tc.upstream.fetch_count());
}

#[tokio::test]
async fn read_through_follows_the_resolved_version() {
    let tc = setup(DownloadMode::Sync);
    tc.upstream.add_alias(MODULE, "master", "v1.1.0");

    let info = tc.protocol.info(MODULE, "master").await.unwrap();
    assert_eq!(info_for("v1.1.0"), info);
    assert!(tc.storage.exists(MODULE, "v1.1.0").await.unwrap());
}

#[tokio::test]
async fn unknown_version_is_not_found() {
    let tc = setup(DownloadMode::Sync);

    let err = tc.protocol.info(MODULE, "v9.9.9").await.unwrap_err();
    assert_eq!(ErrorKind::NotFound, err.kind);
    assert!(err.to_string().contains("info: github.com/a/b@v9.9.9"));
    assert_eq!(1, tc.upstream.fetch_count());
}

#[tokio::test]
async fn unexpected_read_errors_do_not_stash() {
    let mut storage = MockStorage::new();
    storage.expect_go_mod().times(1).returning(|_, _| {
        Box::pin(async move { Err(ProxyError::other("disk on fire")) })
    });

    let mut stasher = MockStasher::new();
    stasher.expect_stash().never();

    let protocol = CoreProtocol::new(
        Arc::new(storage),
        Arc::new(stasher),
        TestUpstream::new(),
        DownloadMode::Sync,
    );

    let err = protocol.go_mod(MODULE, "v1.0.0").await.unwrap_err();
    assert_eq!(ErrorKind::Unexpected, err.kind);
}

#[tokio::test]
async fn failed_stash_keeps_its_kind() {
    let tc = setup(DownloadMode::Sync);
    tc.upstream.set_fetch_error(Some(ErrorKind::GatewayTimeout));

    let err = match tc.protocol.zip(MODULE, "v1.0.0").await {
        Ok(_) => panic!("zip should fail"),
        Err(err) => err,
    };
    assert_eq!(ErrorKind::GatewayTimeout, err.kind);
}

#[tokio::test]
async fn download_mode_none_never_fetches() {
    let tc = setup(DownloadMode::None);

    let err = tc.protocol.info(MODULE, "v1.0.0").await.unwrap_err();
    assert_eq!(ErrorKind::NotFound, err.kind);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(0, tc.upstream.fetch_count());
    assert!(!tc.storage.exists(MODULE, "v1.0.0").await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn download_mode_async_fetches_in_background() {
    let tc = setup(DownloadMode::Async);

    let err = tc.protocol.info(MODULE, "v1.0.0").await.unwrap_err();
    assert_eq!(ErrorKind::NotFound, err.kind);

    iter_check!({
        if tc.storage.exists(MODULE, "v1.0.0").await.unwrap() {
            break;
        }
    });

    let info = tc.protocol.info(MODULE, "v1.0.0").await.unwrap();
    assert_eq!(info_for("v1.0.0"), info);
    assert_eq!(1, tc.upstream.fetch_count());
}

#[tokio::test]
async fn latest_comes_from_upstream() {
    let tc = setup(DownloadMode::Sync);
    save(&tc.storage, MODULE, "v2.0.0").await;

    let latest = tc.protocol.latest(MODULE).await.unwrap();
    assert_eq!("v1.1.0", latest.version);
    assert_eq!(TEST_TIME, latest.time);

    let err = tc.protocol.latest("github.com/no/where").await.unwrap_err();
    assert_eq!(ErrorKind::NotFound, err.kind);
}

#[tokio::test]
async fn latest_without_revision_is_not_found() {
    let mut lister = MockVersionLister::new();
    lister
        .expect_list()
        .returning(|_| Box::pin(async move { Ok((None, Vec::new())) }));

    let protocol = CoreProtocol::new(
        Arc::new(MemStorage::default()),
        Arc::new(MockStasher::new()),
        Arc::new(lister),
        DownloadMode::Sync,
    );

    let err = protocol.latest(MODULE).await.unwrap_err();
    assert_eq!(ErrorKind::NotFound, err.kind);
}

#[tokio::test(flavor = "multi_thread")]
async fn built_proxy_collapses_concurrent_misses() {
    let upstream = TestUpstream::new();
    upstream.add_version(MODULE, "v1.0.0");
    upstream.set_fetch_delay(Duration::from_millis(50));

    let builder = Builder {
        upstream: upstream.factory(),
        ..crate::default_builder()
    }
    .with_default_config()
    .unwrap();
    let proxy = builder.build().await.unwrap();

    let mut all = Vec::new();
    for _ in 0..10 {
        let protocol = proxy.protocol.clone();
        all.push(tokio::task::spawn(async move {
            protocol.info(MODULE, "v1.0.0").await
        }));
    }
    for t in all {
        assert_eq!(info_for("v1.0.0"), t.await.unwrap().unwrap());
    }

    assert_eq!(1, upstream.fetch_count());
    assert!(proxy.storage.exists(MODULE, "v1.0.0").await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn pooled_protocol_bounds_calls() {
    let upstream = TestUpstream::new();
    for i in 0..6 {
        upstream.add_version(MODULE, &format!("v1.0.{i}"));
    }
    upstream.set_fetch_delay(Duration::from_millis(30));

    let storage = Arc::new(MemStorage::default());
    let inner: DynProtocol = Arc::new(CoreProtocol::new(
        storage.clone(),
        stasher_chain(
            CoreStashConfig {
                pool_size: 0,
                ..Default::default()
            },
            storage,
            upstream.clone(),
        ),
        upstream.clone(),
        DownloadMode::Sync,
    ));
    let protocol = Arc::new(PooledProtocol::new(
        inner,
        Arc::new(WorkerPool::new(2, 16)),
    ));

    let mut all = Vec::new();
    for i in 0..6 {
        let protocol = protocol.clone();
        all.push(tokio::task::spawn(async move {
            protocol.go_mod(MODULE, &format!("v1.0.{i}")).await
        }));
    }
    for t in all {
        t.await.unwrap().unwrap();
    }

    assert_eq!(6, upstream.fetch_count());
    assert!(upstream.fetch_peak() <= 2);
}
