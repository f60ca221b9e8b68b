use crate::{NEW_SHA, OLD_SHA, installed_branch_plugin};
use github_push::github::{Commit, Release, SourceError};
use github_push::registry::Registry;
use github_push::test_utils::TestPipeline;
use github_push::updater::UpdateCheck;
use std::time::Duration;

#[tokio::test]
async fn test_repeated_checks_agree_and_refresh_last_checked() {
    let (env, id) = installed_branch_plugin().await;

    let first = env.pipeline.check_for_update(id).await.unwrap();
    let after_first = env.registry.get(id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = env.pipeline.check_for_update(id).await.unwrap();
    let after_second = env.registry.get(id).await.unwrap();

    assert_eq!(first, second);
    assert!(first.is_available());
    assert!(after_second.last_checked > after_first.last_checked);
    assert_eq!(after_second.last_known_version.as_deref(), Some(OLD_SHA));
    assert_eq!(env.source.downloads(), 0, "checks never download");
    assert!(env.pipeline.has_update(id).await.unwrap());
}

#[tokio::test]
async fn test_failed_check_is_reported_not_swallowed() {
    let (env, id) = installed_branch_plugin().await;
    env.source.fail_metadata(SourceError::Api {
        status: 403,
        message: "API rate limit exceeded".to_string(),
    });

    let check = env.pipeline.check_for_update(id).await.unwrap();
    assert!(check.is_failed());
    assert!(check.to_string().starts_with("check failed"));
    assert!(env.registry.get(id).await.unwrap().last_checked.is_some());
    assert!(!env.pipeline.has_update(id).await.unwrap());
}

#[tokio::test]
async fn test_never_installed_item_has_update() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(true).await;
    env.source.push_release(Release::new("v1.0.0"));

    match env.pipeline.check_for_update(item.id).await.unwrap() {
        UpdateCheck::Available { current, latest } => {
            assert_eq!(current, None);
            assert_eq!(latest.identifier, "v1.0.0");
        }
        other => panic!("expected an available update, got {other:?}"),
    }
}

#[tokio::test]
async fn test_release_versions_newest_first() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(true).await;
    for tag in ["v1.0.0", "v1.1.0", "v2.0.0"] {
        let mut release = Release::new(tag);
        release.body = Some(format!("Notes for {tag}"));
        env.source.push_release(release);
    }

    let versions = env.pipeline.available_versions(item.id, Some(2)).await.unwrap();
    let tags: Vec<&str> = versions.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(tags, vec!["v2.0.0", "v1.1.0"]);
    assert_eq!(versions[0].name, "v2.0.0", "unnamed releases fall back to the tag");
    assert_eq!(versions[0].description, "Notes for v2.0.0");

    assert_eq!(env.pipeline.release_notes(item.id).await.unwrap(), "Notes for v2.0.0");
}

#[tokio::test]
async fn test_branch_versions_use_short_shas() {
    let (env, id) = installed_branch_plugin().await;
    env.source.push_commit(Commit::new("0123456789abcdef0123456789abcdef01234567", "Add settings page\n\nDetails"));

    let versions = env.pipeline.available_versions(id, None).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version, "0123456");
    assert_eq!(versions[0].name, "Add settings page");
    assert_eq!(versions[1].version, &NEW_SHA[..7]);

    assert_eq!(
        env.pipeline.release_notes(id).await.unwrap(),
        "Add settings page\n\nDetails"
    );
}
