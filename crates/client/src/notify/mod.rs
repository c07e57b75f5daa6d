//! User-facing notifications
//!
//! Classified errors that reach the top of a call chain surface as
//! toast-style notifications whose tone and auto-dismiss duration are
//! derived from severity: Low informs for 3 s, Medium warns for 5 s, High
//! shows an error for 8 s, and Critical stays until dismissed.
//!
//! The [`Notifier`] trait is the seam to the host UI; [`TracingNotifier`]
//! is the headless default and [`MemoryNotifier`] records toasts for tests.

use std::fmt::Debug;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info, warn};

use holdfast_common::{AppError, ErrorSeverity};

/// Presentation tone of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Error,
    Warning,
    Info,
    Success,
}

/// How long a toast stays on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissAfter {
    /// Auto-dismiss after the given duration
    After(Duration),
    /// Persistent until the user dismisses it
    Manual,
}

/// Severity → auto-dismiss mapping
pub fn dismiss_after(severity: ErrorSeverity) -> DismissAfter {
    match severity {
        ErrorSeverity::Low => DismissAfter::After(Duration::from_secs(3)),
        ErrorSeverity::Medium => DismissAfter::After(Duration::from_secs(5)),
        ErrorSeverity::High => DismissAfter::After(Duration::from_secs(8)),
        ErrorSeverity::Critical => DismissAfter::Manual,
    }
}

/// Severity → tone mapping
pub fn toast_kind(severity: ErrorSeverity) -> ToastKind {
    match severity {
        ErrorSeverity::Critical | ErrorSeverity::High => ToastKind::Error,
        ErrorSeverity::Medium => ToastKind::Warning,
        ErrorSeverity::Low => ToastKind::Info,
    }
}

/// One user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub dismiss: DismissAfter,
}

impl Toast {
    /// Build the toast for a classified error, using its user-facing
    /// message
    pub fn for_error(error: &AppError) -> Self {
        Self {
            kind: toast_kind(error.severity),
            message: error.user_message.clone(),
            dismiss: dismiss_after(error.severity),
        }
    }
}

/// Seam to the host UI's notification surface
pub trait Notifier: Send + Sync + Debug {
    fn show(&self, toast: Toast);

    fn show_error(&self, error: &AppError) {
        self.show(Toast::for_error(error));
    }

    fn show_success(&self, message: &str) {
        self.show(Toast {
            kind: ToastKind::Success,
            message: message.to_string(),
            dismiss: DismissAfter::After(Duration::from_secs(3)),
        });
    }

    fn show_warning(&self, message: &str) {
        self.show(Toast {
            kind: ToastKind::Warning,
            message: message.to_string(),
            dismiss: DismissAfter::After(Duration::from_secs(5)),
        });
    }

    fn show_info(&self, message: &str) {
        self.show(Toast {
            kind: ToastKind::Info,
            message: message.to_string(),
            dismiss: DismissAfter::After(Duration::from_secs(5)),
        });
    }
}

/// Headless notifier emitting tracing events
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Error => error!(target: "holdfast::toast", "{}", toast.message),
            ToastKind::Warning => warn!(target: "holdfast::toast", "{}", toast.message),
            ToastKind::Info | ToastKind::Success => {
                info!(target: "holdfast::toast", "{}", toast.message)
            }
        }
    }
}

/// Test notifier recording every toast
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.toasts.lock().iter().map(|t| t.message.clone()).collect()
    }

    pub fn clear(&self) {
        self.toasts.lock().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn show(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates the severity → duration table from the interface contract.
    ///
    /// Assertions:
    /// - Low 3 s, Medium 5 s, High 8 s, Critical persistent.
    #[test]
    fn test_dismiss_durations() {
        assert_eq!(
            dismiss_after(ErrorSeverity::Low),
            DismissAfter::After(Duration::from_secs(3))
        );
        assert_eq!(
            dismiss_after(ErrorSeverity::Medium),
            DismissAfter::After(Duration::from_secs(5))
        );
        assert_eq!(
            dismiss_after(ErrorSeverity::High),
            DismissAfter::After(Duration::from_secs(8))
        );
        assert_eq!(dismiss_after(ErrorSeverity::Critical), DismissAfter::Manual);
    }

    /// Validates the severity → tone table.
    #[test]
    fn test_toast_kinds() {
        assert_eq!(toast_kind(ErrorSeverity::Critical), ToastKind::Error);
        assert_eq!(toast_kind(ErrorSeverity::High), ToastKind::Error);
        assert_eq!(toast_kind(ErrorSeverity::Medium), ToastKind::Warning);
        assert_eq!(toast_kind(ErrorSeverity::Low), ToastKind::Info);
    }

    /// Validates `show_error` presents the user-facing message, not the
    /// technical one.
    #[test]
    fn test_show_error_uses_user_message() {
        let notifier = MemoryNotifier::new();
        let err = AppError::auth("JWT signature mismatch at kid=3");
        notifier.show_error(&err);

        let toasts = notifier.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Error);
        assert_eq!(toasts[0].message, err.user_message);
        assert!(!toasts[0].message.contains("kid=3"));
    }

    /// Validates the default helper durations.
    #[test]
    fn test_helper_defaults() {
        let notifier = MemoryNotifier::new();
        notifier.show_success("saved");
        notifier.show_warning("degraded");
        notifier.show_info("fyi");

        let toasts = notifier.toasts();
        assert_eq!(toasts[0].dismiss, DismissAfter::After(Duration::from_secs(3)));
        assert_eq!(toasts[0].kind, ToastKind::Success);
        assert_eq!(toasts[1].dismiss, DismissAfter::After(Duration::from_secs(5)));
        assert_eq!(toasts[2].kind, ToastKind::Info);
    }
}
