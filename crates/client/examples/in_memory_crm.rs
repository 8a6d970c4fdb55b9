//! Drives the client against an in-memory backend: sign in, edit a person with
//! a server-calculated full name, save it and page through a query.
//!
//! ```sh
//! RUST_LOG=objsync_client=debug cargo run --example in_memory_crm
//! ```

use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use objsync_client::{Service, Transport, TransportError};
use objsync_wire_protocol::RpcMethod;
use objsync_wire_protocol::well_known::ACTION_REFRESH;
use serde_json::{Value as Json, json};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PEOPLE: u64 = 23;

/// Keeps one person record and answers every endpoint the demo needs
struct InMemoryCrm {
    person: Mutex<Json>,
}

impl InMemoryCrm {
    fn new() -> Self {
        let attribute = |id: &str, name: &str, value: &str| {
            json!({ "id": id, "name": name, "type": "String", "label": name, "value": value, "visibility": "Always" })
        };
        let mut first_name = attribute("1", "FirstName", "Ada");
        first_name["triggersRefresh"] = json!(true);
        let mut full_name = attribute("3", "FullName", "Ada Lovelace");
        full_name["isReadOnly"] = json!(true);

        Self {
            person: Mutex::new(json!({
                "id": "Person",
                "type": "Person",
                "fullTypeName": "Crm.Person",
                "label": "Person",
                "objectId": "1",
                "attributes": [first_name, attribute("2", "LastName", "Lovelace"), full_name],
                "actions": ["Edit", "Save", "CancelEdit"],
            })),
        }
    }

    fn recalculate(parent: &Json) -> Json {
        let mut result = parent.clone();
        let first = parent["attributes"][0]["value"].as_str().unwrap_or_default();
        let last = parent["attributes"][1]["value"].as_str().unwrap_or_default();
        result["attributes"][2]["value"] = json!(format!("{first} {last}"));
        result
    }

    fn page(skip: u64, top: u64) -> Json {
        let items: Vec<Json> = (skip..(skip + top).min(PEOPLE))
            .map(|index| {
                json!({
                    "id": index.to_string(),
                    "values": [{ "key": "Name", "value": format!("Person {index}") }],
                })
            })
            .collect();
        json!({ "items": items, "totalItems": PEOPLE })
    }
}

#[async_trait]
impl Transport for InMemoryCrm {
    async fn post(&self, method: RpcMethod, body: Json) -> Result<Json, TransportError> {
        let response = match method {
            RpcMethod::GetApplication => {
                let actions: Vec<Json> =
                    ["Edit", "CancelEdit", "Save", "EndEdit", "CancelSave", "RefreshQuery"]
                        .iter()
                        .map(|name| json!({ "name": name, "displayName": name }))
                        .collect();
                json!({
                    "authToken": "demo",
                    "application": { "userName": "demo", "label": "CRM", "actions": actions },
                })
            }
            RpcMethod::GetPersistentObject => {
                let person = self.person.lock().map_err(|e| TransportError::Other(e.to_string()))?;
                json!({ "result": *person })
            }
            RpcMethod::GetQuery => json!({
                "query": {
                    "id": "People",
                    "name": "People",
                    "label": "People",
                    "pageSize": 10,
                    "columns": [{ "id": "c1", "name": "Name", "label": "Name", "type": "String" }],
                }
            }),
            RpcMethod::ExecuteQuery => {
                let skip = body["query"]["skip"].as_u64().unwrap_or(0);
                let top = body["query"]["top"].as_u64().unwrap_or(10);
                json!({ "result": Self::page(skip, top) })
            }
            RpcMethod::ExecuteAction if body["action"] == ACTION_REFRESH => {
                json!({ "result": Self::recalculate(&body["parent"]) })
            }
            RpcMethod::ExecuteAction => {
                let saved = Self::recalculate(&body["parent"]);
                *self.person.lock().map_err(|e| TransportError::Other(e.to_string()))? =
                    saved.clone();
                json!({ "result": saved })
            }
        };
        Ok(response)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut builder = Service::builder();
    builder.transport(Arc::new(InMemoryCrm::new()));
    let service = builder.build()?;
    service.sign_in_with_credentials("demo", "demo").await?;

    let person = service
        .get_persistent_object(None, "Person", Some("1"), false)
        .await?;
    person.begin_edit();
    let first_name = person
        .attribute("FirstName")
        .context("person has no FirstName")?;
    first_name.set_value("Augusta", true).await?;

    let full_name = person
        .attribute("FullName")
        .context("person has no FullName")?;
    info!(full_name = %full_name.display_value(), dirty = person.is_dirty(), "After refresh");

    let saved = person.save().await?;
    info!(saved, editing = person.is_editing(), "Saved person");

    let people = service.get_query("People", None).await?;
    let names: Vec<String> = people
        .stream()
        .map_ok(|item| item.display_value("Name"))
        .try_collect()
        .await?;
    info!(count = names.len(), total = ?people.total_items(), "Loaded every person");
    Ok(())
}
