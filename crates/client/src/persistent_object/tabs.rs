use objsync_wire_protocol::TabDto;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::attribute::PersistentObjectAttribute;
use crate::query::Query;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tab {
    Attributes(AttributeTab),
    Query(QueryTab),
}

impl Tab {
    pub fn label(&self) -> &str {
        match self {
            Tab::Attributes(tab) => &tab.label,
            Tab::Query(tab) => &tab.label,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            Tab::Attributes(tab) => tab.is_visible,
            Tab::Query(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTab {
    pub key: String,
    pub label: String,
    pub column_count: Option<u32>,
    pub groups: Vec<AttributeGroup>,
    /// At least one group is visible
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeGroup {
    pub key: String,
    /// Attribute names in offset order
    pub attributes: Vec<String>,
    pub is_visible: bool,
}

/// A detail query shown as its own tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTab {
    pub name: String,
    pub label: String,
}

/// Lay out attributes by tab and group, ordered by the lowest attribute offset
pub(crate) fn build_tabs(
    definitions: &BTreeMap<String, TabDto>,
    attributes: &[Arc<PersistentObjectAttribute>],
    queries: &[Arc<Query>],
) -> Vec<Tab> {
    let mut ordered: Vec<&Arc<PersistentObjectAttribute>> = attributes.iter().collect();
    ordered.sort_by_key(|attribute| attribute.offset());

    let mut tabs: Vec<AttributeTab> = Vec::new();
    for attribute in ordered {
        let tab_key = attribute.tab().unwrap_or_default();
        let group_key = attribute.group().unwrap_or_default();

        let tab = match tabs.iter().position(|tab| tab.key == tab_key) {
            Some(index) => &mut tabs[index],
            None => {
                let definition = definitions.get(&tab_key);
                tabs.push(AttributeTab {
                    label: definition
                        .map(|d| d.label.clone())
                        .filter(|label| !label.is_empty())
                        .unwrap_or_else(|| tab_key.clone()),
                    column_count: definition.and_then(|d| d.column_count),
                    key: tab_key,
                    groups: Vec::new(),
                    is_visible: false,
                });
                let last = tabs.len() - 1;
                &mut tabs[last]
            }
        };

        let group = match tab.groups.iter().position(|group| group.key == group_key) {
            Some(index) => &mut tab.groups[index],
            None => {
                tab.groups.push(AttributeGroup {
                    key: group_key,
                    attributes: Vec::new(),
                    is_visible: false,
                });
                let last = tab.groups.len() - 1;
                &mut tab.groups[last]
            }
        };
        group.attributes.push(attribute.name().to_string());
    }

    let mut tabs: Vec<Tab> = tabs.into_iter().map(Tab::Attributes).collect();
    update_visibility(&mut tabs, attributes);
    tabs.extend(queries.iter().map(|query| {
        Tab::Query(QueryTab {
            name: query.name().to_string(),
            label: query.label(),
        })
    }));
    tabs
}

/// Recompute group and tab visibility from the attributes
pub(crate) fn update_visibility(tabs: &mut [Tab], attributes: &[Arc<PersistentObjectAttribute>]) {
    let visible = |name: &str| {
        attributes
            .iter()
            .any(|attribute| attribute.name() == name && attribute.is_visible())
    };
    for tab in tabs.iter_mut() {
        let Tab::Attributes(tab) = tab else {
            continue;
        };
        for group in &mut tab.groups {
            group.is_visible = group.attributes.iter().any(|name| visible(name));
        }
        tab.is_visible = tab.groups.iter().any(|group| group.is_visible);
    }
}
