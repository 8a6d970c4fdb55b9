use std::sync::Arc;

use super::Action;

/// Actions sharing a `group_action`, shown together as one menu
#[derive(Debug, Clone)]
pub struct ActionGroup {
    name: String,
    actions: Vec<Arc<Action>>,
}

impl ActionGroup {
    /// Groups in order of their lowest action offset; ungrouped actions are left out
    pub fn build(actions: &[Arc<Action>]) -> Vec<ActionGroup> {
        let mut ordered: Vec<&Arc<Action>> = actions.iter().collect();
        ordered.sort_by_key(|action| action.definition().offset);

        let mut groups: Vec<ActionGroup> = Vec::new();
        for action in ordered {
            let Some(name) = &action.definition().group_action else {
                continue;
            };
            match groups.iter_mut().find(|group| &group.name == name) {
                Some(group) => group.actions.push(action.clone()),
                None => groups.push(ActionGroup {
                    name: name.clone(),
                    actions: vec![action.clone()],
                }),
            }
        }
        groups
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    pub fn is_visible(&self) -> bool {
        self.actions.iter().any(|action| action.is_visible())
    }

    pub fn can_execute(&self) -> bool {
        self.actions.iter().any(|action| action.can_execute())
    }
}
