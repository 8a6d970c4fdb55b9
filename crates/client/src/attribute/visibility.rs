use std::fmt;

/// Set of visibility flags as sent by the server, e.g. `Read, New`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Visibility(u8);

impl Visibility {
    pub const ALWAYS: Visibility = Visibility(1);
    pub const READ: Visibility = Visibility(1 << 1);
    pub const NEW: Visibility = Visibility(1 << 2);
    pub const QUERY: Visibility = Visibility(1 << 3);
    pub const NEVER: Visibility = Visibility(1 << 4);

    const NAMES: [(Visibility, &'static str); 5] = [
        (Visibility::ALWAYS, "Always"),
        (Visibility::READ, "Read"),
        (Visibility::NEW, "New"),
        (Visibility::QUERY, "Query"),
        (Visibility::NEVER, "Never"),
    ];

    /// Unknown flags are ignored; an empty string means `Always`
    pub fn parse(flags: &str) -> Self {
        let mut visibility = Visibility(0);
        for flag in flags.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            if let Some((value, _)) = Self::NAMES
                .iter()
                .find(|(_, name)| name.eq_ignore_ascii_case(flag))
            {
                visibility = visibility | *value;
            }
        }
        if visibility.0 == 0 {
            Visibility::ALWAYS
        } else {
            visibility
        }
    }

    pub fn contains(&self, other: Visibility) -> bool {
        self.0 & other.0 == other.0
    }

    /// Visible on an object form in its current new/existing state
    pub fn is_visible_on_object(&self, is_new: bool) -> bool {
        if self.contains(Visibility::NEVER) {
            return false;
        }
        self.contains(Visibility::ALWAYS)
            || if is_new {
                self.contains(Visibility::NEW)
            } else {
                self.contains(Visibility::READ)
            }
    }
}

impl std::ops::BitOr for Visibility {
    type Output = Visibility;

    fn bitor(self, rhs: Self) -> Self::Output {
        Visibility(self.0 | rhs.0)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(value, _)| self.contains(*value))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(", "))
    }
}
