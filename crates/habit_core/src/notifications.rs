use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::habit::HabitId;

/// Host answer to a notification permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet, or the host has no notification support.
    Unavailable,
}

impl Permission {
    pub fn is_granted(self) -> bool {
        matches!(self, Permission::Granted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRequest {
    pub habit_id: HabitId,
    pub title: String,
    pub body: String,
    pub scheduled_for: NaiveDateTime,
}

/// Platform-specific notification adapters implement this trait. Delivery
/// failures are swallowed by the adapter; callers never see them.
pub trait NotificationSink: Send + Sync {
    fn permission(&self) -> Permission;
    fn request_permission(&self) -> Permission;
    fn notify(&self, notification: NotificationRequest);
}

/// Stand-in for hosts without notification support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn permission(&self) -> Permission {
        Permission::Unavailable
    }

    fn request_permission(&self) -> Permission {
        Permission::Unavailable
    }

    fn notify(&self, _notification: NotificationRequest) {}
}
