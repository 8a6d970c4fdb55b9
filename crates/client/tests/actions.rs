mod support;

use async_trait::async_trait;
use objsync_client::hooks::{ConfirmationHook, ConfirmationRequest, RetryHook};
use objsync_client::{ExecuteOptions, NotificationType, Service, ServiceHooks};
use objsync_wire_protocol::{RetryActionDto, RpcMethod};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use support::{FakeBackend, definition, people_query, person, query_result, signed_in};

fn crm_backend() -> Arc<FakeBackend> {
    let mut approve = definition("Approve", "");
    approve["options"] = json!(["Now", "Tomorrow"]);
    FakeBackend::new(
        vec![approve, definition("Merge", "=1"), definition("Delete", ">0")],
        Box::new(|method, body| match method {
            RpcMethod::GetPersistentObject => {
                let mut person = person();
                person["actions"] = json!(["Edit", "Save", "Approve"]);
                json!({ "result": person })
            }
            RpcMethod::GetQuery => json!({ "query": people_query(&["Merge", "Delete"]) }),
            RpcMethod::ExecuteQuery => json!({ "result": query_result("p", 0, 10, 3) }),
            RpcMethod::ExecuteAction if body["action"] == "Approve" => json!({
                "result": {
                    "fullTypeName": "Service.Notification",
                    "notification": format!("Approved {}", body["parameters"]["MenuLabel"].as_str().unwrap_or("now")),
                    "notificationType": "OK",
                }
            }),
            RpcMethod::ExecuteAction => json!({}),
            _ => json!({}),
        }),
    )
}

#[tokio::test]
async fn test_query_action_follows_selection_rule() {
    let backend = crm_backend();
    let service = signed_in(&backend).await;
    let query = service.get_query("People", None).await.unwrap();
    query.search().await.unwrap();
    let merge = query.action("Merge").unwrap().clone();
    let delete = query.action("Delete").unwrap().clone();
    let (first, second) = (query.item(0).unwrap(), query.item(1).unwrap());

    assert!(!merge.can_execute());
    assert!(!delete.can_execute());

    query.select_item(&first);
    assert!(merge.can_execute());
    assert!(delete.can_execute());

    query.select_item(&second);
    assert!(!merge.can_execute());
    assert!(delete.can_execute());

    assert!(merge.execute(ExecuteOptions::default()).await.unwrap().is_none());
    assert!(backend.calls(RpcMethod::ExecuteAction).is_empty());

    query.deselect_item(&second);
    merge.execute(ExecuteOptions::default()).await.unwrap();
    let sent = backend.calls(RpcMethod::ExecuteAction);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action"], "Merge");
    assert_eq!(sent[0]["selectedItems"][0]["id"], "p0");
    assert_eq!(sent[0]["query"]["id"], "People");
}

#[tokio::test]
async fn test_select_all_counts_every_row() {
    let backend = crm_backend();
    let service = signed_in(&backend).await;
    let query = service.get_query("People", None).await.unwrap();
    query.search().await.unwrap();
    let merge = query.action("Merge").unwrap().clone();

    query.toggle_select_all();
    assert_eq!(merge.selection_count(), 3);
    assert!(!merge.can_execute());

    query.deselect_item(&query.item(0).unwrap());
    query.deselect_item(&query.item(1).unwrap());
    assert_eq!(merge.selection_count(), 1);
    assert!(merge.can_execute());
}

#[tokio::test]
async fn test_notification_result_lands_on_the_object() {
    let backend = crm_backend();
    let service = signed_in(&backend).await;
    let person = service
        .get_persistent_object(None, "Person", Some("42"), false)
        .await
        .unwrap();
    let approve = person.action("Approve").unwrap();

    let opened = approve
        .execute(ExecuteOptions {
            menu_option: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(opened.is_none());
    let notification = person.notification().unwrap();
    assert_eq!(notification.message, "Approved Tomorrow");
    assert_eq!(notification.kind, NotificationType::Ok);
    let sent = backend.calls(RpcMethod::ExecuteAction);
    assert_eq!(sent[0]["parameters"]["MenuOption"], "1");
    assert_eq!(sent[0]["parent"]["objectId"], "42");
}

struct Decline {
    asked: Mutex<Vec<String>>,
}

#[async_trait]
impl ConfirmationHook for Decline {
    async fn confirm(&self, request: ConfirmationRequest) -> bool {
        self.asked.lock().unwrap().push(request.message);
        false
    }
}

#[tokio::test]
async fn test_declined_confirmation_sends_nothing() {
    let mut approve = definition("Approve", "");
    approve["confirmation"] = json!("Approve this person?");
    let backend = FakeBackend::new(
        vec![approve],
        Box::new(|method, _| match method {
            RpcMethod::GetPersistentObject => {
                let mut person = person();
                person["actions"] = json!(["Approve"]);
                json!({ "result": person })
            }
            _ => json!({}),
        }),
    );
    let decline = Arc::new(Decline {
        asked: Mutex::new(Vec::new()),
    });
    let mut builder = Service::builder();
    builder.transport(backend.clone());
    builder.hooks(ServiceHooks {
        confirmation: decline.clone(),
        ..Default::default()
    });
    let service = builder.build().unwrap();
    service.sign_in_with_credentials("admin", "secret").await.unwrap();

    let person = service
        .get_persistent_object(None, "Person", Some("42"), false)
        .await
        .unwrap();
    let result = person
        .action("Approve")
        .unwrap()
        .execute(ExecuteOptions::default())
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(*decline.asked.lock().unwrap(), vec!["Approve this person?".to_string()]);
    assert!(backend.calls(RpcMethod::ExecuteAction).is_empty());
}

struct PickSecond;

#[async_trait]
impl RetryHook for PickSecond {
    async fn choose_retry_option(&self, retry: RetryActionDto) -> Option<usize> {
        (retry.options.len() > 1).then_some(1)
    }
}

#[tokio::test]
async fn test_retry_question_is_answered_and_resent() {
    let backend = FakeBackend::new(
        vec![definition("Archive", "")],
        Box::new(|method, body| match method {
            RpcMethod::GetPersistentObject => {
                let mut person = person();
                person["actions"] = json!(["Archive"]);
                json!({ "result": person })
            }
            RpcMethod::ExecuteAction if body["parameters"]["RetryActionOption"].is_null() => json!({
                "retry": { "title": "Archive", "message": "Also archive orders?", "options": ["No", "Yes"] }
            }),
            RpcMethod::ExecuteAction => json!({
                "result": {
                    "fullTypeName": "Service.Notification",
                    "notification": "Archived",
                }
            }),
            _ => json!({}),
        }),
    );
    let mut builder = Service::builder();
    builder.transport(backend.clone());
    builder.hooks(ServiceHooks {
        retry: Arc::new(PickSecond),
        ..Default::default()
    });
    let service = builder.build().unwrap();
    service.sign_in_with_credentials("admin", "secret").await.unwrap();

    let person = service
        .get_persistent_object(None, "Person", Some("42"), false)
        .await
        .unwrap();
    person
        .action("Archive")
        .unwrap()
        .execute(ExecuteOptions::default())
        .await
        .unwrap();

    let sent = backend.calls(RpcMethod::ExecuteAction);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1]["parameters"]["RetryActionOption"], "Yes");
    assert_eq!(person.notification().unwrap().message, "Archived");
}
