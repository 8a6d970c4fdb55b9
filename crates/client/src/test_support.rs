//! Fixtures shared by the unit tests

use objsync_wire_protocol::{
    ActionDefinitionDto, ApplicationDto, AttributeDto, PersistentObjectDto, RpcMethod,
};
use serde_json::json;
use std::sync::Arc;

use crate::hooks::ServiceHooks;
use crate::service::Service;
use crate::transport::MockTransport;

pub(crate) fn definition(name: &str) -> ActionDefinitionDto {
    ActionDefinitionDto {
        name: name.to_string(),
        display_name: name.to_string(),
        ..Default::default()
    }
}

fn builtin_definitions() -> Vec<ActionDefinitionDto> {
    ["Edit", "CancelEdit", "Save", "EndEdit", "CancelSave", "RefreshQuery"]
        .into_iter()
        .map(definition)
        .collect()
}

pub(crate) fn application(definitions: Vec<ActionDefinitionDto>) -> ApplicationDto {
    ApplicationDto {
        user_name: "admin".to_string(),
        friendly_user_name: "Administrator".to_string(),
        label: "Test".to_string(),
        actions: builtin_definitions().into_iter().chain(definitions).collect(),
        default_page_size: None,
    }
}

pub(crate) fn application_json() -> serde_json::Value {
    serde_json::to_value(application(Vec::new())).unwrap()
}

async fn sign_in(
    mut transport: MockTransport,
    hooks: ServiceHooks,
    definitions: Vec<ActionDefinitionDto>,
) -> Service {
    let application = serde_json::to_value(application(definitions)).unwrap();
    transport
        .expect_post()
        .withf(|method, _| *method == RpcMethod::GetApplication)
        .times(1)
        .returning(move |_, _| Ok(json!({ "authToken": "token", "application": application })));

    let mut builder = Service::builder();
    builder.transport(Arc::new(transport));
    builder.hooks(hooks);
    let service = builder.build().unwrap();
    service.sign_in_with_credentials("admin", "secret").await.unwrap();
    service
}

/// A signed in service whose application knows the built-in actions
pub(crate) async fn signed_in_service(transport: MockTransport) -> Service {
    sign_in(transport, ServiceHooks::default(), Vec::new()).await
}

/// Like [`signed_in_service`], with extra action definitions
pub(crate) async fn signed_in_service_with(
    transport: MockTransport,
    definitions: Vec<ActionDefinitionDto>,
) -> Service {
    sign_in(transport, ServiceHooks::default(), definitions).await
}

pub(crate) async fn signed_in_service_with_hooks(
    transport: MockTransport,
    hooks: ServiceHooks,
) -> Service {
    sign_in(transport, hooks, Vec::new()).await
}

pub(crate) fn attribute_dto(id: &str, name: &str, value: Option<&str>) -> AttributeDto {
    AttributeDto {
        id: id.to_string(),
        name: name.to_string(),
        type_name: "String".to_string(),
        label: name.to_string(),
        value: value.map(str::to_string),
        visibility: "Always".to_string(),
        ..Default::default()
    }
}

/// FirstName (triggers a refresh), LastName and a read-only FullName
pub(crate) fn person_dto() -> PersistentObjectDto {
    let mut first_name = attribute_dto("1", "FirstName", Some("Ada"));
    first_name.triggers_refresh = true;
    let last_name = attribute_dto("2", "LastName", Some("Lovelace"));
    let mut full_name = attribute_dto("3", "FullName", Some("Ada Lovelace"));
    full_name.is_read_only = true;

    PersistentObjectDto {
        id: "Person".to_string(),
        type_name: "Person".to_string(),
        full_type_name: "Crm.Person".to_string(),
        label: "Person".to_string(),
        object_id: Some("42".to_string()),
        attributes: vec![first_name, last_name, full_name],
        ..Default::default()
    }
}
