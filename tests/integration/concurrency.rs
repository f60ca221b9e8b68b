use crate::{NEW_SHA, installed_branch_plugin};
use github_push::core::{ErrorKind, SyncError};
use github_push::registry::Registry;

#[tokio::test]
async fn test_second_run_on_busy_item_fails_fast() {
    let (env, id) = installed_branch_plugin().await;

    let guard = env.pipeline.locks().acquire(id).await.unwrap();
    let err = env.pipeline.update(id).await.unwrap_err();
    assert!(matches!(err, SyncError::ItemBusy { .. }));
    assert_eq!(err.kind(), ErrorKind::Busy);
    assert_eq!(env.source.downloads(), 0);

    drop(guard);
    env.pipeline.update(id).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_updates_do_not_interleave() {
    let (env, id) = installed_branch_plugin().await;
    let (p1, p2) = (env.pipeline.clone(), env.pipeline.clone());
    let (a, b) = tokio::join!(
        tokio::spawn(async move { p1.update(id).await }),
        tokio::spawn(async move { p2.update(id).await })
    );
    let results = [a.unwrap(), b.unwrap()];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert!(succeeded >= 1);
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, SyncError::ItemBusy { .. }), "unexpected error: {e}");
        }
    }

    let item = env.registry.get(id).await.unwrap();
    assert_eq!(item.last_known_version.as_deref(), Some(NEW_SHA));
    assert_eq!(env.pipeline.installed_version(&item).as_deref(), Some("2.0.0"));
    assert!(!env.pipeline.locks().is_locked(id));
}
