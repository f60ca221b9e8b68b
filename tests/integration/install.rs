use crate::{NEW_SHA, OLD_SHA, installed_branch_plugin};
use github_push::core::{ErrorKind, SyncError, TrackedItem};
use github_push::github::{Release, SourceError};
use github_push::registry::Registry;
use github_push::test_utils::{TestPipeline, plugin_archive, theme_archive};
use github_push::updater::UpdateCheck;
use std::sync::Arc;

#[tokio::test]
async fn test_branch_update_moves_cursor_to_head_commit() {
    let (env, id) = installed_branch_plugin().await;

    let check = env.pipeline.check_for_update(id).await.unwrap();
    match &check {
        UpdateCheck::Available { current, latest } => {
            assert_eq!(current.as_deref(), Some(OLD_SHA));
            assert_eq!(latest.identifier, NEW_SHA);
            assert_eq!(latest.display, "9f8e7d6");
        }
        other => panic!("expected an available update, got {other:?}"),
    }

    let outcome = env.pipeline.update(id).await.unwrap();
    assert!(outcome.replaced);
    assert_eq!(outcome.version, NEW_SHA);
    assert!(outcome.checksum.starts_with("sha256:"));

    let item = env.registry.get(id).await.unwrap();
    assert_eq!(item.last_known_version.as_deref(), Some(NEW_SHA));
    assert_eq!(env.pipeline.installed_version(&item).as_deref(), Some("2.0.0"));
    assert!(item.install_path.join("includes/core.php").exists());
    assert_eq!(env.backup_count(), 0, "backup is discarded after a committed swap");

    let again = env.pipeline.check_for_update(id).await.unwrap();
    assert!(matches!(again, UpdateCheck::UpToDate { ref identifier } if identifier == NEW_SHA));
}

#[tokio::test]
async fn test_fresh_release_install() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(true).await;
    env.source.push_release(Release::new("v1.0.0"));
    env.source.push_release(Release::new("v1.1.0"));
    env.source.serve(
        "fake://acme/widget/release/v1.1.0",
        plugin_archive("acme-widget-1a2b3c4", "widget", "1.1.0"),
    );

    let outcome = env.pipeline.install(item.id, None).await.unwrap();
    assert!(!outcome.replaced);
    assert_eq!(outcome.version, "v1.1.0");
    assert_eq!(outcome.item.last_known_version.as_deref(), Some("v1.1.0"));
    assert!(outcome.item.last_checked.is_some());
    assert!(env.plugins_dir().join("widget/widget.php").exists());
    assert!(!env.plugins_dir().join("acme-widget-1a2b3c4").exists());
}

#[tokio::test]
async fn test_theme_install() {
    let env = TestPipeline::new().await;
    let item = env.add_theme().await;
    env.source.push_release(Release::new("v2.0.0"));
    env.source.serve("fake://acme/flat/release/v2.0.0", theme_archive("acme-flat-5e6f7a8", "2.0.0"));

    env.pipeline.install(item.id, None).await.unwrap();

    let installed = env.pipeline.installed(item.id).await.unwrap().expect("theme installed");
    assert_eq!(installed.name, "Flat");
    assert_eq!(installed.version.as_deref(), Some("2.0.0"));
    assert_eq!(installed.manifest, env.themes_dir().join("flat/style.css"));
}

#[tokio::test]
async fn test_update_requires_installed_artifact() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(false).await;

    let err = env.pipeline.update(item.id).await.unwrap_err();
    assert!(matches!(err, SyncError::NotInstalled { id, .. } if id == item.id));
    assert_eq!(env.source.downloads(), 0);
}

#[tokio::test]
async fn test_download_failure_changes_nothing() {
    let (env, id) = installed_branch_plugin().await;
    env.source.fail_download(SourceError::Api {
        status: 502,
        message: "Bad Gateway".to_string(),
    });

    let err = env.pipeline.update(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    let item = env.registry.get(id).await.unwrap();
    assert_eq!(item.last_known_version.as_deref(), Some(OLD_SHA));
    assert_eq!(env.pipeline.installed_version(&item).as_deref(), Some("1.0.0"));
    assert_eq!(env.backup_count(), 0);
}

#[tokio::test]
async fn test_empty_repository_has_no_version() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(false).await;

    let err = env.pipeline.install(item.id, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(!item.install_path.exists());
}

#[tokio::test]
async fn test_gate_refuses_before_any_work() {
    let env = TestPipeline::with(|builder| {
        builder.gate(Arc::new(|item: &TrackedItem| item.repo.name != "widget"))
    })
    .await;
    let item = env.add_plugin(false).await;

    let err = env.pipeline.install(item.id, None).await.unwrap_err();
    assert!(matches!(err, SyncError::NotEntitled { .. }));
    assert_eq!(env.source.downloads(), 0);
    assert!(env.pipeline.check_for_update(item.id).await.is_err());
}

#[tokio::test]
async fn test_unknown_item() {
    let env = TestPipeline::new().await;
    assert!(matches!(
        env.pipeline.install(42, None).await,
        Err(SyncError::ItemNotFound { id: 42 })
    ));
}
