use modproxy_api::{builder::Builder, collect_zip, ErrorKind, Proxy};
use modproxy_core::{
    default_builder,
    factories::core_protocol::config::{CoreProtocolModConfig, DownloadMode},
};
use modproxy_test_utils::{enable_tracing, iter_check, upstream::*};
use std::{sync::Arc, time::Duration};

const MODULE: &str = "github.com/a/b";

async fn build(up: &Arc<TestUpstream>, download_mode: DownloadMode) -> Proxy {
    let mut builder = Builder {
        upstream: up.factory(),
        ..default_builder()
    }
    .with_default_config()
    .unwrap();

    let mut protocol: CoreProtocolModConfig =
        builder.config.get_module_config().unwrap();
    protocol.core_protocol.download_mode = download_mode;
    builder.config.update_module_config(&protocol).unwrap();

    builder.build().await.unwrap()
}

fn upstream() -> Arc<TestUpstream> {
    let up = TestUpstream::new();
    up.add_version(MODULE, "v1.0.0");
    up.add_version(MODULE, "v1.1.0");
    up.add_alias(MODULE, "main", "v1.1.0");
    up
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_requests_share_one_fetch() {
    enable_tracing();

    let up = upstream();
    up.set_fetch_delay(Duration::from_millis(50));
    let proxy = build(&up, DownloadMode::Sync).await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let protocol = proxy.protocol.clone();
        tasks.push(tokio::task::spawn(async move {
            match i % 3 {
                0 => protocol.info(MODULE, "main").await.map(|_| ()),
                1 => protocol.go_mod(MODULE, "v1.1.0").await.map(|_| ()),
                _ => {
                    let zip = protocol.zip(MODULE, "v1.1.0").await?;
                    collect_zip(zip).await.unwrap();
                    Ok(())
                }
            }
        }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // "main" and "v1.1.0" are separate stash keys
    assert!(up.fetch_count() <= 2);
    assert!(proxy.storage.exists(MODULE, "v1.1.0").await.unwrap());
    assert!(!proxy.storage.exists(MODULE, "main").await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_fetch_is_retried_by_the_next_request() {
    enable_tracing();

    let up = upstream();
    up.set_fetch_error(Some(ErrorKind::RateLimited));
    let proxy = build(&up, DownloadMode::Sync).await;

    let err = proxy.protocol.info(MODULE, "v1.0.0").await.unwrap_err();
    assert_eq!(ErrorKind::RateLimited, err.kind);
    assert_eq!(1, up.fetch_count());

    up.set_fetch_error(None);
    proxy.protocol.info(MODULE, "v1.0.0").await.unwrap();
    assert_eq!(2, up.fetch_count());

    // served from storage from now on
    proxy.protocol.info(MODULE, "v1.0.0").await.unwrap();
    assert_eq!(2, up.fetch_count());
}

#[tokio::test(flavor = "multi_thread")]
async fn async_download_mode_fills_storage() {
    enable_tracing();

    let up = upstream();
    let proxy = build(&up, DownloadMode::Async).await;

    let err = proxy.protocol.go_mod(MODULE, "v1.0.0").await.unwrap_err();
    assert_eq!(ErrorKind::NotFound, err.kind);

    iter_check!({
        if proxy.protocol.go_mod(MODULE, "v1.0.0").await.is_ok() {
            break;
        }
    });

    let go_mod = proxy.protocol.go_mod(MODULE, "v1.0.0").await.unwrap();
    assert_eq!(go_mod_for(MODULE), go_mod);
    assert_eq!(1, up.fetch_count());
}

#[tokio::test(flavor = "multi_thread")]
async fn list_merges_storage_and_upstream() {
    enable_tracing();

    let up = upstream();
    let proxy = build(&up, DownloadMode::Sync).await;

    proxy.protocol.go_mod(MODULE, "v1.0.0").await.unwrap();

    let list = proxy.protocol.list(MODULE).await.unwrap();
    assert_eq!(vec!["v1.0.0", "v1.1.0"], list);

    // a module upstream no longer knows is still listed from storage
    up.set_list_error(Some(ErrorKind::NotFound));
    assert_eq!(vec!["v1.0.0"], proxy.protocol.list(MODULE).await.unwrap());

    up.set_list_error(Some(ErrorKind::GatewayTimeout));
    let err = proxy.protocol.list(MODULE).await.unwrap_err();
    assert_eq!(ErrorKind::GatewayTimeout, err.kind);
}
