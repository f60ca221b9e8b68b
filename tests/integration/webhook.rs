use crate::{NEW_SHA, installed_branch_plugin};
use github_push::github::Release;
use github_push::registry::Registry;
use github_push::test_utils::{TestPipeline, plugin_archive};
use github_push::webhook::{SignatureError, WebhookEvent, WebhookHandler, parse_payload, sign};
use serde_json::json;

fn push_body(branch: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "ref": format!("refs/heads/{branch}"),
        "repository": { "name": "widget", "owner": { "login": "acme" } }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_tampered_delivery_is_rejected() {
    let (env, _id) = installed_branch_plugin().await;
    let handler = WebhookHandler::new(env.pipeline.clone(), Some("s3cret".to_string()));

    let body = push_body("main");
    let signature = sign("s3cret", &body);
    assert!(handler.verify(Some(signature.as_str()), &body).is_ok());

    let mut tampered = body.clone();
    tampered.extend_from_slice(b" ");
    assert_eq!(handler.verify(Some(signature.as_str()), &tampered), Err(SignatureError::Mismatch));
    assert_eq!(handler.verify(None, &body), Err(SignatureError::Missing));
    assert_eq!(
        handler.verify(Some(sign("other", &body).as_str()), &body),
        Err(SignatureError::Mismatch)
    );
}

#[tokio::test]
async fn test_empty_secret_accepts_unsigned_delivery() {
    let (env, _id) = installed_branch_plugin().await;
    let handler = WebhookHandler::new(env.pipeline.clone(), Some(String::new()));
    assert!(handler.verify(None, &push_body("main")).is_ok());
}

#[tokio::test]
async fn test_without_secret_tampered_body_is_accepted() {
    let (env, _id) = installed_branch_plugin().await;
    let handler = WebhookHandler::new(env.pipeline.clone(), None);

    let body = push_body("main");
    let signature = sign("s3cret", &body);
    let mut tampered = body.clone();
    tampered.extend_from_slice(b" ");
    assert!(handler.verify(Some(signature.as_str()), &tampered).is_ok());
}

#[tokio::test]
async fn test_push_updates_matching_branch_only() {
    let (env, id) = installed_branch_plugin().await;
    let handler = WebhookHandler::new(env.pipeline.clone(), None);

    let other = parse_payload(Some("application/json"), &push_body("develop")).unwrap();
    let event = WebhookEvent::from_payload("push", &other).unwrap();
    let report = handler.dispatch(&event).await.unwrap();
    assert!(report.updated.is_empty());
    assert_eq!(report.skipped, vec![id]);

    let main = parse_payload(None, &push_body("main")).unwrap();
    let event = WebhookEvent::from_payload("push", &main).unwrap();
    let report = handler.dispatch(&event).await.unwrap();
    assert_eq!(report.updated, vec![id]);
    assert_eq!(
        env.registry.get(id).await.unwrap().last_known_version.as_deref(),
        Some(NEW_SHA)
    );
}

#[tokio::test]
async fn test_published_release_updates_release_items() {
    let env = TestPipeline::new().await;
    let item = env.add_plugin(true).await;
    env.install_plugin_files(&item.install_path, "1.0.0");
    env.source.push_release(Release::new("v2.0.0"));
    env.source.serve("fake://acme/widget/release/v2.0.0", plugin_archive("acme-widget-abcdef0", "widget", "2.0.0"));
    let handler = WebhookHandler::new(env.pipeline.clone(), None);

    let form = format!(
        "payload={}",
        url::form_urlencoded::byte_serialize(
            json!({
                "action": "published",
                "release": { "tag_name": "v2.0.0" },
                "repository": { "name": "widget", "owner": { "login": "acme" } }
            })
            .to_string()
            .as_bytes()
        )
        .collect::<String>()
    );
    let payload = parse_payload(Some("application/x-www-form-urlencoded"), form.as_bytes()).unwrap();
    let event = WebhookEvent::from_payload("release", &payload).unwrap();

    let report = handler.dispatch(&event).await.unwrap();
    assert_eq!(report.updated, vec![item.id]);
    let stored = env.registry.get(item.id).await.unwrap();
    assert_eq!(env.pipeline.installed_version(&stored).as_deref(), Some("2.0.0"));
}
