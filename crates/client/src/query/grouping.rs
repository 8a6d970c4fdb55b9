use objsync_wire_protocol::GroupingInfoDto;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::QueryResultItem;

/// A run of consecutive rows sharing the grouped column's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryGroup {
    pub name: String,
    pub count: u64,
    /// Index of the group's first row
    pub start: u64,
    /// One past the group's last row
    pub end: u64,
    pub is_collapsed: bool,
}

/// A line of a grouped listing
#[derive(Debug, Clone)]
pub enum QueryRow {
    Group(QueryGroup),
    Item {
        index: usize,
        item: Arc<QueryResultItem>,
    },
}

/// Lay the groups out back to back, keeping the collapsed state of groups
/// that were already known by name
pub(super) fn build_groups(info: &GroupingInfoDto, previous: &[QueryGroup]) -> Vec<QueryGroup> {
    let mut start = 0;
    info.groups
        .iter()
        .map(|group| {
            let is_collapsed = previous
                .iter()
                .any(|known| known.name == group.name && known.is_collapsed);
            let built = QueryGroup {
                name: group.name.clone(),
                count: group.count,
                start,
                end: start.saturating_add(group.count),
                is_collapsed,
            };
            start = built.end;
            built
        })
        .collect()
}

/// Interleave group headers with the loaded rows. Rows of collapsed groups and
/// rows not loaded yet are left out.
pub(super) fn build_rows(
    groups: &[QueryGroup],
    items: &BTreeMap<usize, Arc<QueryResultItem>>,
) -> Vec<QueryRow> {
    let item_row = |(index, item): (&usize, &Arc<QueryResultItem>)| QueryRow::Item {
        index: *index,
        item: item.clone(),
    };
    if groups.is_empty() {
        return items.iter().map(item_row).collect();
    }

    let mut rows = Vec::with_capacity(groups.len() + items.len());
    for group in groups {
        rows.push(QueryRow::Group(group.clone()));
        if group.is_collapsed {
            continue;
        }
        rows.extend(
            items
                .range(group.start as usize..group.end as usize)
                .map(item_row),
        );
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use objsync_wire_protocol::{QueryResultGroupDto, QueryResultItemDto};
    use std::sync::Weak;

    fn info() -> GroupingInfoDto {
        GroupingInfoDto {
            group_by: "Country".to_string(),
            groups: vec![
                QueryResultGroupDto {
                    name: "BE".to_string(),
                    count: 2,
                },
                QueryResultGroupDto {
                    name: "NL".to_string(),
                    count: 1,
                },
            ],
        }
    }

    fn items(count: usize) -> BTreeMap<usize, Arc<QueryResultItem>> {
        (0..count)
            .map(|index| {
                let dto = QueryResultItemDto {
                    id: index.to_string(),
                    ..Default::default()
                };
                (index, QueryResultItem::new(dto, Weak::new()))
            })
            .collect()
    }

    fn shape(rows: &[QueryRow]) -> Vec<String> {
        rows.iter()
            .map(|row| match row {
                QueryRow::Group(group) => format!("#{}", group.name),
                QueryRow::Item { index, .. } => index.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_groups_are_laid_out_back_to_back() {
        let groups = build_groups(&info(), &[]);
        assert_eq!((groups[0].start, groups[0].end), (0, 2));
        assert_eq!((groups[1].start, groups[1].end), (2, 3));
    }

    #[test]
    fn test_rows_skip_collapsed_groups() {
        let mut groups = build_groups(&info(), &[]);
        assert_eq!(shape(&build_rows(&groups, &items(3))), ["#BE", "0", "1", "#NL", "2"]);

        groups[0].is_collapsed = true;
        assert_eq!(shape(&build_rows(&groups, &items(3))), ["#BE", "#NL", "2"]);

        let rebuilt = build_groups(&info(), &groups);
        assert!(rebuilt[0].is_collapsed);
        assert!(!rebuilt[1].is_collapsed);
    }

    #[test]
    fn test_oversized_group_counts_saturate() {
        let mut info = info();
        info.groups[0].count = u64::MAX;
        let groups = build_groups(&info, &[]);
        assert_eq!(groups[0].end, u64::MAX);
        assert_eq!((groups[1].start, groups[1].end), (u64::MAX, u64::MAX));
        assert_eq!(shape(&build_rows(&groups, &items(3))), ["#BE", "0", "1", "2", "#NL"]);
    }

    #[test]
    fn test_rows_without_grouping() {
        assert_eq!(shape(&build_rows(&[], &items(2))), ["0", "1"]);
    }
}
