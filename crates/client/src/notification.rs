use std::time::Duration;

pub use objsync_wire_protocol::NotificationType;

/// A message the server (or a converted failure) attached to an object or query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationType,
    /// How long a toast may stay visible, `None` keeps it until replaced
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn new(message: impl Into<String>, kind: NotificationType) -> Self {
        Self {
            message: message.into(),
            kind,
            duration: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Error)
    }

    /// Build from the wire triple; an empty message means "no notification"
    pub fn from_wire(
        message: Option<&str>,
        kind: NotificationType,
        duration_ms: Option<u32>,
    ) -> Option<Self> {
        let message = message.filter(|m| !m.is_empty())?;
        Some(Self {
            message: message.to_string(),
            kind,
            duration: duration_ms.map(|ms| Duration::from_millis(u64::from(ms))),
        })
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationType::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_is_no_notification() {
        assert_eq!(
            Notification::from_wire(Some(""), NotificationType::Error, None),
            None
        );
        assert_eq!(Notification::from_wire(None, NotificationType::Ok, None), None);

        let toast = Notification::from_wire(Some("Saved"), NotificationType::Ok, Some(1500))
            .unwrap();
        assert_eq!(toast.duration, Some(Duration::from_millis(1500)));
        assert!(!toast.is_error());
    }
}
