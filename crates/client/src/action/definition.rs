use objsync_wire_protocol::ActionDefinitionDto;
use tracing::warn;

use super::selection_rule::SelectionRule;

/// Static metadata of an action, shared by every owner exposing it
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    pub name: String,
    pub display_name: String,
    pub is_pinned: bool,
    /// Message the user has to confirm before the action runs
    pub confirmation: Option<String>,
    /// Menu entries; the chosen index is sent as a parameter
    pub options: Vec<String>,
    pub selection_rule: SelectionRule,
    pub refresh_query_on_completed: bool,
    pub keep_selection_on_refresh: bool,
    pub offset: i32,
    pub group_action: Option<String>,
}

impl From<ActionDefinitionDto> for ActionDefinition {
    fn from(dto: ActionDefinitionDto) -> Self {
        let selection_rule = dto.selection_rule.parse().unwrap_or_else(|error| {
            warn!(action = %dto.name, %error, "Treating selection rule as always true");
            SelectionRule::always()
        });
        Self {
            display_name: if dto.display_name.is_empty() {
                dto.name.clone()
            } else {
                dto.display_name
            },
            name: dto.name,
            is_pinned: dto.is_pinned,
            confirmation: dto.confirmation.filter(|message| !message.is_empty()),
            options: dto.options,
            selection_rule,
            refresh_query_on_completed: dto.refresh_query_on_completed,
            keep_selection_on_refresh: dto.keep_selection_on_refresh,
            offset: dto.offset,
            group_action: dto.group_action.filter(|group| !group.is_empty()),
        }
    }
}
