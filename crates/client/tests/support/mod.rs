//! An in-process backend for the integration tests. Requests can be held at
//! the transport until the test releases them, which makes the interleavings
//! of concurrent round trips deterministic.

#![allow(dead_code)]

use async_trait::async_trait;
use objsync_client::{Service, Transport, TransportError};
use objsync_wire_protocol::RpcMethod;
use serde_json::{Value as Json, json};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub type Responder = Box<dyn Fn(RpcMethod, &Json) -> Json + Send + Sync>;
type Matcher = Box<dyn Fn(RpcMethod, &Json) -> bool + Send + Sync>;

struct Gate {
    matches: Matcher,
    arrived: oneshot::Sender<Json>,
    release: oneshot::Receiver<()>,
}

/// A request stopped at the transport
pub struct HeldRequest {
    arrived: oneshot::Receiver<Json>,
    release: oneshot::Sender<()>,
}

impl HeldRequest {
    /// Wait until the request reaches the transport and return its body
    pub async fn arrived(&mut self) -> Json {
        (&mut self.arrived).await.expect("gate dropped before the request arrived")
    }

    /// Let the request continue to the responder
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

pub struct FakeBackend {
    definitions: Vec<Json>,
    responder: Responder,
    gates: Mutex<Vec<Gate>>,
    calls: Mutex<Vec<(RpcMethod, Json)>>,
}

impl FakeBackend {
    /// `definitions` are added to the application next to the built-in actions
    pub fn new(definitions: Vec<Json>, responder: Responder) -> Arc<Self> {
        Arc::new(Self {
            definitions,
            responder,
            gates: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Hold the next request matching `matches` until the returned handle is
    /// released
    pub fn hold<F>(&self, matches: F) -> HeldRequest
    where
        F: Fn(RpcMethod, &Json) -> bool + Send + Sync + 'static,
    {
        let (arrived_tx, arrived_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.gates.lock().unwrap().push(Gate {
            matches: Box::new(matches),
            arrived: arrived_tx,
            release: release_rx,
        });
        HeldRequest {
            arrived: arrived_rx,
            release: release_tx,
        }
    }

    /// Bodies of the requests sent to `method` so far
    pub fn calls(&self, method: RpcMethod) -> Vec<Json> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn application(&self) -> Json {
        let builtin = ["Edit", "CancelEdit", "Save", "EndEdit", "CancelSave", "RefreshQuery"]
            .into_iter()
            .map(|name| definition(name, ""));
        let actions: Vec<Json> = builtin.chain(self.definitions.iter().cloned()).collect();
        json!({
            "userName": "admin",
            "friendlyUserName": "Administrator",
            "label": "Crm",
            "actions": actions,
        })
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn post(&self, method: RpcMethod, body: Json) -> Result<Json, TransportError> {
        self.calls.lock().unwrap().push((method, body.clone()));
        if method == RpcMethod::GetApplication {
            return Ok(json!({ "authToken": "token", "application": self.application() }));
        }

        let gate = {
            let mut gates = self.gates.lock().unwrap();
            let position = gates.iter().position(|gate| (gate.matches)(method, &body));
            position.map(|position| gates.remove(position))
        };
        if let Some(gate) = gate {
            let _ = gate.arrived.send(body.clone());
            let _ = gate.release.await;
        }
        Ok((self.responder)(method, &body))
    }
}

pub async fn signed_in(backend: &Arc<FakeBackend>) -> Service {
    let mut builder = Service::builder();
    builder.transport(backend.clone());
    let service = builder.build().unwrap();
    service.sign_in_with_credentials("admin", "secret").await.unwrap();
    service
}

pub fn definition(name: &str, selection_rule: &str) -> Json {
    json!({ "name": name, "displayName": name, "selectionRule": selection_rule })
}

pub fn attribute(id: &str, name: &str, value: &str) -> Json {
    json!({
        "id": id,
        "name": name,
        "type": "String",
        "label": name,
        "value": value,
        "visibility": "Always",
    })
}

/// Person 42 with FirstName (refreshing), LastName and a calculated FullName
pub fn person() -> Json {
    let mut first_name = attribute("1", "FirstName", "Ada");
    first_name["triggersRefresh"] = json!(true);
    let mut full_name = attribute("3", "FullName", "Ada Lovelace");
    full_name["isReadOnly"] = json!(true);
    json!({
        "id": "Person",
        "type": "Person",
        "fullTypeName": "Crm.Person",
        "label": "Person",
        "objectId": "42",
        "attributes": [first_name, attribute("2", "LastName", "Lovelace"), full_name],
        "actions": ["Edit", "Save", "CancelEdit"],
    })
}

/// What the server does on refresh: recalculate FullName from the sent names
pub fn recalculated(parent: &Json) -> Json {
    let mut result = parent.clone();
    let first = parent["attributes"][0]["value"].as_str().unwrap_or_default();
    let last = parent["attributes"][1]["value"].as_str().unwrap_or_default();
    result["attributes"][2]["value"] = json!(format!("{first} {last}"));
    result
}

/// `count` rows starting at `skip`, ids `{prefix}{index}`
pub fn rows(prefix: &str, skip: u64, count: u64) -> Vec<Json> {
    (skip..skip + count)
        .map(|index| {
            json!({
                "id": format!("{prefix}{index}"),
                "values": [{ "key": "Name", "value": format!("Row {index}") }],
            })
        })
        .collect()
}

pub fn query_result(prefix: &str, skip: u64, count: u64, total: u64) -> Json {
    json!({
        "items": rows(prefix, skip, count.min(total.saturating_sub(skip))),
        "totalItems": total,
        "pageSize": 10,
    })
}

/// The `People` query definition, without rows
pub fn people_query(actions: &[&str]) -> Json {
    json!({
        "id": "People",
        "name": "People",
        "label": "People",
        "pageSize": 10,
        "canRead": true,
        "columns": [{ "id": "c1", "name": "Name", "label": "Name", "type": "String" }],
        "actions": actions,
    })
}
