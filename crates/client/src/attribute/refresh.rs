/// Where an attribute stands relative to the server round trips of its object.
///
/// ```text
///            local edit                  refresh sent
///   Idle ────────────────▶ Editing ─────────────────────▶ InFlight { backup }
///     ▲                                                     │        │
///     │ commit                          response, unchanged │        │ response, edited
///     │                                  or server wins     ▼        ▼
///     └──────────────────────────────────────────── Accepted   LocallyOverridden
/// ```
///
/// A refresh is queued behind every earlier round trip, so the backup is the
/// value at the moment the request leaves, never the value when it was queued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RefreshState {
    #[default]
    Idle,
    Editing,
    InFlight {
        backup: Option<String>,
    },
    /// The last response replaced the local value
    Accepted,
    /// The last response was ignored because the user edited meanwhile
    LocallyOverridden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    Accept,
    KeepLocal,
}

impl RefreshState {
    pub fn on_local_edit(&mut self) {
        // an in-flight backup stays so the response can detect the edit
        if !matches!(self, RefreshState::InFlight { .. }) {
            *self = RefreshState::Editing;
        }
    }

    pub fn on_refresh_sent(&mut self, current: Option<&str>) {
        *self = RefreshState::InFlight {
            backup: current.map(str::to_string),
        };
    }

    /// The request failed or was dropped before a response could be applied
    pub fn on_refresh_aborted(&mut self) {
        if matches!(self, RefreshState::InFlight { .. }) {
            *self = RefreshState::Editing;
        }
    }

    /// Decide whether a server value replaces `current`
    pub fn resolve(
        &mut self,
        current: Option<&str>,
        result_wins: bool,
        read_only: bool,
    ) -> RefreshDecision {
        let untouched = match self {
            RefreshState::InFlight { backup } => backup.as_deref() == current,
            _ => true,
        };
        if result_wins || read_only || untouched {
            *self = RefreshState::Accepted;
            RefreshDecision::Accept
        } else {
            *self = RefreshState::LocallyOverridden;
            RefreshDecision::KeepLocal
        }
    }

    pub fn on_commit(&mut self) {
        *self = RefreshState::Idle;
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, RefreshState::InFlight { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_during_flight_keeps_local_value() {
        let mut state = RefreshState::default();
        state.on_local_edit();
        state.on_refresh_sent(Some("B"));

        // user types while the request is on the wire
        state.on_local_edit();
        assert!(state.is_in_flight());

        assert_eq!(state.resolve(Some("D"), false, false), RefreshDecision::KeepLocal);
        assert_eq!(state, RefreshState::LocallyOverridden);
    }

    #[test]
    fn test_untouched_value_takes_server_value() {
        let mut state = RefreshState::default();
        state.on_refresh_sent(Some("A"));
        assert_eq!(state.resolve(Some("A"), false, false), RefreshDecision::Accept);
        assert_eq!(state, RefreshState::Accepted);
    }

    #[test]
    fn test_server_wins_or_read_only_overrides_edit() {
        let mut state = RefreshState::default();
        state.on_refresh_sent(Some("A"));
        assert_eq!(state.resolve(Some("edited"), true, false), RefreshDecision::Accept);

        state.on_refresh_sent(Some("A"));
        assert_eq!(state.resolve(Some("edited"), false, true), RefreshDecision::Accept);
    }

    #[test]
    fn test_abort_returns_to_editing() {
        let mut state = RefreshState::Idle;
        state.on_refresh_sent(None);
        state.on_refresh_aborted();
        assert_eq!(state, RefreshState::Editing);

        state.on_commit();
        assert_eq!(state, RefreshState::Idle);
    }
}
