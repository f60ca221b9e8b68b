use github_push::core::{ErrorKind, SyncError};
use github_push::github::Commit;
use github_push::registry::Registry;
use github_push::test_utils::{FailingFs, FsOp, TestPipeline, ZipBuilder, plugin_archive};
use github_push::updater::{Filesystem, NativeFs};
use std::sync::Arc;

const HEAD: &str = "9f8e7d6c5b4a39281706f5e4d3c2b1a098765432";

/// Branch-mode plugin at 1.0.0 on a pipeline whose filesystem can be told to fail.
async fn failing_env() -> (TestPipeline, Arc<FailingFs<NativeFs>>, u64) {
    let fs = Arc::new(FailingFs::new(NativeFs, Vec::<FsOp>::new()));
    let env = TestPipeline::with_fs(fs.clone() as Arc<dyn Filesystem>).await;
    let item = env.add_plugin(false).await;
    env.install_plugin_files(&item.install_path, "1.0.0");
    std::fs::write(item.install_path.join("settings.json"), "{\"keep\":true}").unwrap();

    env.source.push_commit(Commit::new(HEAD, "Release 2.0.0"));
    env.source.serve("fake://acme/widget/main", plugin_archive("acme-widget-9f8e7d6", "widget", "2.0.0"));
    (env, fs, item.id)
}

#[tokio::test]
async fn test_move_and_copy_failure_restores_previous_files() {
    let (env, fs, id) = failing_env().await;
    fs.set_failing([FsOp::Rename, FsOp::CopyDir]);

    let err = env.pipeline.update(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
    assert!(matches!(err, SyncError::MoveOrCopyFailed { .. }));

    let item = env.registry.get(id).await.unwrap();
    assert_eq!(env.pipeline.installed_version(&item).as_deref(), Some("1.0.0"));
    assert_eq!(
        std::fs::read_to_string(item.install_path.join("settings.json")).unwrap(),
        "{\"keep\":true}"
    );
    assert!(!item.install_path.join("includes").exists());
    assert_eq!(item.last_known_version, None, "cursor stays where it was");
    assert_eq!(env.backup_count(), 0, "backup is discarded after a successful restore");
}

#[tokio::test]
async fn test_verification_failure_restores_previous_files() {
    let (env, _fs, id) = failing_env().await;
    env.source.serve(
        "fake://acme/widget/main",
        ZipBuilder::new().file("acme-widget-9f8e7d6/readme.txt", "no plugin here").build(),
    );

    let err = env.pipeline.update(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VerificationFailed);

    let item = env.registry.get(id).await.unwrap();
    assert_eq!(env.pipeline.installed_version(&item).as_deref(), Some("1.0.0"));
    assert!(!item.install_path.join("readme.txt").exists());
}

#[tokio::test]
async fn test_failed_restore_is_unrecoverable_and_keeps_backup() {
    let (env, fs, id) = failing_env().await;
    fs.set_failing([FsOp::CreateDirAll]);

    let err = env.pipeline.update(id).await.unwrap_err();
    assert!(err.is_unrecoverable());
    let SyncError::Unrecoverable { original, backup, .. } = &err else {
        panic!("expected unrecoverable error, got {err:?}");
    };
    assert!(matches!(**original, SyncError::TargetDir { .. }));
    assert!(backup.exists(), "backup must survive for manual recovery");
    assert_eq!(env.backup_count(), 1);

    let item = env.registry.get(id).await.unwrap();
    assert_eq!(item.last_known_version, None);
}

#[tokio::test]
async fn test_fresh_install_failure_has_nothing_to_restore() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(false).await;
    env.source.push_commit(Commit::new(HEAD, "Broken build"));
    env.source.serve(
        "fake://acme/widget/main",
        ZipBuilder::new().file("acme-widget-9f8e7d6/readme.txt", "no plugin here").build(),
    );

    let err = env.pipeline.install(item.id, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VerificationFailed);
    assert_eq!(env.backup_count(), 0);
    assert_eq!(env.registry.get(item.id).await.unwrap().last_known_version, None);
}
