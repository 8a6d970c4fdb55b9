use objsync_wire_protocol::QueryColumnDto;
use std::fmt;

use crate::data_type::DataType;
use crate::type_hints::TypeHints;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryColumn {
    pub id: String,
    pub name: String,
    pub label: String,
    pub type_name: String,
    pub data_type: DataType,
    pub offset: i32,
    pub is_hidden: bool,
    pub can_sort: bool,
    pub type_hints: TypeHints,
}

impl From<QueryColumnDto> for QueryColumn {
    fn from(dto: QueryColumnDto) -> Self {
        Self {
            data_type: DataType::from_type_name(&dto.type_name),
            type_hints: TypeHints::from_map(&dto.type_hints),
            id: dto.id,
            name: dto.name,
            label: dto.label,
            type_name: dto.type_name,
            offset: dto.offset,
            is_hidden: dto.is_hidden,
            can_sort: dto.can_sort,
        }
    }
}

impl QueryColumn {
    pub(crate) fn to_dto(&self) -> QueryColumnDto {
        QueryColumnDto {
            id: self.id.clone(),
            name: self.name.clone(),
            label: self.label.clone(),
            type_name: self.type_name.clone(),
            offset: self.offset,
            is_hidden: self.is_hidden,
            can_sort: self.can_sort,
            type_hints: self.type_hints.to_map(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One entry of a query's sort order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOption {
    pub column: String,
    pub direction: SortDirection,
}

impl SortOption {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Parse the wire form `Name ASC; Other DESC`. A missing direction is ascending.
    pub fn parse_list(raw: &str) -> Vec<SortOption> {
        raw.split(';')
            .filter_map(|part| {
                let mut words = part.split_whitespace();
                let column = words.next()?;
                let direction = match words.next() {
                    Some(word) if word.eq_ignore_ascii_case("DESC") => SortDirection::Descending,
                    _ => SortDirection::Ascending,
                };
                Some(SortOption::new(column, direction))
            })
            .collect()
    }

    pub fn format_list(options: &[SortOption]) -> String {
        options
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort_options() {
        let options = SortOption::parse_list("Name ASC; Created desc;  ;City");
        assert_eq!(
            options,
            vec![
                SortOption::new("Name", SortDirection::Ascending),
                SortOption::new("Created", SortDirection::Descending),
                SortOption::new("City", SortDirection::Ascending),
            ]
        );
        assert_eq!(
            SortOption::format_list(&options),
            "Name ASC; Created DESC; City ASC"
        );
    }

    #[test]
    fn test_empty_sort_options() {
        assert!(SortOption::parse_list("").is_empty());
        assert_eq!(SortOption::format_list(&[]), "");
    }

    #[test]
    fn test_column_from_dto() {
        let column = QueryColumn::from(QueryColumnDto {
            name: "BirthDate".to_string(),
            type_name: "NullableDate".to_string(),
            ..Default::default()
        });
        assert!(column.data_type.nullable);
        assert_eq!(column.data_type.kind, crate::DataKind::Date);
        assert_eq!(column.to_dto().type_name, "NullableDate");
    }
}
