//! Names with a fixed meaning on the wire.

/// `fullTypeName` of an action result that only carries a notification.
pub const NOTIFICATION_TYPE: &str = "Service.Notification";
/// `objectId` of a notification result that must be shown as a dialog.
pub const NOTIFICATION_DIALOG: &str = "Dialog";
/// `fullTypeName` of an action result describing a downloadable stream.
pub const REGISTERED_STREAM_TYPE: &str = "Service.RegisteredStream";
/// `fullTypeName` of an action result asking the client to pick references.
pub const ADD_REFERENCE_TYPE: &str = "Service.AddReference";

pub const ACTION_SAVE: &str = "PersistentObject.Save";
pub const ACTION_REFRESH: &str = "PersistentObject.Refresh";
pub const ACTION_CHANGE_REFERENCE: &str = "PersistentObjectAttribute.ChangeReference";
pub const ACTION_ADD_REFERENCE: &str = "Query.AddReference";

pub const PARAM_REFRESHED_ATTRIBUTE_ID: &str = "RefreshedPersistentObjectAttributeId";
pub const PARAM_ATTRIBUTE_ID: &str = "PersistentObjectAttributeId";
pub const PARAM_RETRY_OPTION: &str = "RetryActionOption";
pub const PARAM_MENU_OPTION: &str = "MenuOption";
pub const PARAM_MENU_LABEL: &str = "MenuLabel";
/// Name of the action whose result asked for references to be added.
pub const PARAM_ADD_ACTION: &str = "AddAction";
