use crate::{NEW_SHA, installed_branch_plugin};
use github_push::core::SyncError;
use github_push::github::Release;
use github_push::registry::Registry;
use github_push::test_utils::{TestPipeline, plugin_archive};

#[tokio::test]
async fn test_rollback_to_commit_downloads_that_commit() {
    let (env, id) = installed_branch_plugin().await;
    env.source.serve("fake://acme/widget/1a2b3c4", plugin_archive("acme-widget-1a2b3c4", "widget", "0.9.0"));

    let outcome = env.pipeline.rollback(id, "1a2b3c4").await.unwrap();
    assert_eq!(outcome.version, "1a2b3c4");

    let item = env.registry.get(id).await.unwrap();
    assert_eq!(item.last_known_version.as_deref(), Some("1a2b3c4"));
    assert_eq!(env.pipeline.installed_version(&item).as_deref(), Some("0.9.0"));

    // The stored cursor is the short SHA; the branch head is reported as newer.
    assert!(env.pipeline.has_update(id).await.unwrap());
    env.pipeline.update(id).await.unwrap();
    let item = env.registry.get(id).await.unwrap();
    assert_eq!(item.last_known_version.as_deref(), Some(NEW_SHA));
}

#[tokio::test]
async fn test_rollback_to_published_tag_uses_release_archive() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(true).await;
    env.source.push_release(Release::new("v1.0.0"));
    env.source.push_release(Release::new("v2.0.0"));
    env.source.serve("fake://acme/widget/release/v1.0.0", plugin_archive("acme-widget-aaaaaaa", "widget", "1.0.0"));
    env.source.serve("fake://acme/widget/release/v2.0.0", plugin_archive("acme-widget-bbbbbbb", "widget", "2.0.0"));

    env.pipeline.install(item.id, None).await.unwrap();
    let outcome = env.pipeline.rollback(item.id, "v1.0.0").await.unwrap();
    assert!(outcome.replaced);
    assert_eq!(outcome.version, "v1.0.0");
    assert_eq!(env.pipeline.installed_version(&outcome.item).as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn test_rollback_to_unlisted_tag_uses_generic_archive() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(true).await;
    env.source.serve("fake://acme/widget/legacy-1", plugin_archive("acme-widget-ccccccc", "widget", "0.1.0"));

    let outcome = env.pipeline.rollback(item.id, "legacy-1").await.unwrap();
    assert_eq!(outcome.version, "legacy-1");
    assert_eq!(outcome.display, "legacy-1");
}

#[tokio::test]
async fn test_rollback_requires_a_version() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(true).await;
    assert!(matches!(
        env.pipeline.rollback(item.id, "  ").await,
        Err(SyncError::Other { .. })
    ));
    assert_eq!(env.source.downloads(), 0);
}
