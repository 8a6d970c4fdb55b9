use std::collections::BTreeMap;
use std::fmt;

/// Well known rendering hints; unknown keys are kept as [`TypeHint::Custom`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeHint {
    CharacterCasing,
    DisplayFormat,
    DisplayValueFormat,
    InputType,
    MaxLength,
    TrueKey,
    FalseKey,
    Custom(String),
}

impl TypeHint {
    pub fn key(&self) -> &str {
        match self {
            TypeHint::CharacterCasing => "CharacterCasing",
            TypeHint::DisplayFormat => "DisplayFormat",
            TypeHint::DisplayValueFormat => "DisplayValueFormat",
            TypeHint::InputType => "InputType",
            TypeHint::MaxLength => "MaxLength",
            TypeHint::TrueKey => "TrueKey",
            TypeHint::FalseKey => "FalseKey",
            TypeHint::Custom(key) => key,
        }
    }
}

impl From<&str> for TypeHint {
    fn from(key: &str) -> Self {
        match key.to_ascii_lowercase().as_str() {
            "charactercasing" => TypeHint::CharacterCasing,
            "displayformat" => TypeHint::DisplayFormat,
            "displayvalueformat" => TypeHint::DisplayValueFormat,
            "inputtype" => TypeHint::InputType,
            "maxlength" => TypeHint::MaxLength,
            "truekey" => TypeHint::TrueKey,
            "falsekey" => TypeHint::FalseKey,
            _ => TypeHint::Custom(key.to_string()),
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CharacterCasing {
    #[default]
    Normal,
    Upper,
    Lower,
}

impl CharacterCasing {
    pub fn apply(&self, input: &str) -> String {
        match self {
            CharacterCasing::Normal => input.to_string(),
            CharacterCasing::Upper => input.to_uppercase(),
            CharacterCasing::Lower => input.to_lowercase(),
        }
    }
}

/// Case-insensitive hint map, keeping the original spelling of each key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHints {
    entries: BTreeMap<String, (String, String)>,
}

impl TypeHints {
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let mut hints = Self::default();
        for (key, value) in map {
            hints.insert(key, value);
        }
        hints
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(key.to_ascii_lowercase(), (key.to_string(), value.into()));
    }

    pub fn get(&self, hint: &TypeHint) -> Option<&str> {
        self.get_str(hint.key())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layer `other` on top of these hints, its values win on conflicts
    pub fn merged_with(&self, other: &TypeHints) -> TypeHints {
        let mut merged = self.clone();
        for (lower, entry) in &other.entries {
            merged.entries.insert(lower.clone(), entry.clone());
        }
        merged
    }

    pub fn character_casing(&self) -> CharacterCasing {
        match self.get(&TypeHint::CharacterCasing) {
            Some(casing) if casing.eq_ignore_ascii_case("upper") => CharacterCasing::Upper,
            Some(casing) if casing.eq_ignore_ascii_case("lower") => CharacterCasing::Lower,
            _ => CharacterCasing::Normal,
        }
    }

    pub fn max_length(&self) -> Option<usize> {
        self.get(&TypeHint::MaxLength)?.trim().parse().ok()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(pairs: &[(&str, &str)]) -> TypeHints {
        let mut hints = TypeHints::default();
        for (key, value) in pairs {
            hints.insert(key, *value);
        }
        hints
    }

    #[test]
    fn test_lookup_ignores_case() {
        let hints = hints(&[("charactercasing", "Upper"), ("MAXLENGTH", "12")]);

        assert_eq!(hints.character_casing(), CharacterCasing::Upper);
        assert_eq!(hints.max_length(), Some(12));
        assert_eq!(hints.get(&TypeHint::DisplayFormat), None);
        assert_eq!(TypeHint::from("TrueKey"), TypeHint::TrueKey);
        assert_eq!(
            TypeHint::from("Currency"),
            TypeHint::Custom("Currency".to_string())
        );
    }

    #[test]
    fn test_merge_prefers_other() {
        let column = hints(&[("DisplayFormat", "{0:N2}"), ("InputType", "number")]);
        let value = hints(&[("displayformat", "{0:C}")]);

        let merged = column.merged_with(&value);
        assert_eq!(merged.get(&TypeHint::DisplayFormat), Some("{0:C}"));
        assert_eq!(merged.get(&TypeHint::InputType), Some("number"));
        assert_eq!(merged.to_map().len(), 2);
    }
}
