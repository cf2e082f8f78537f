//! Load failure classification and user-facing messages

use std::time::{Duration, Instant};

pub const GENERIC_ENGINE_MESSAGE: &str = "Something went wrong in the PDF editor. Please try again.";
pub const OUT_OF_MEMORY_MESSAGE: &str =
    "This PDF is too large for available browser memory. Try closing other tabs or using a smaller file.";
pub const PASSWORD_MESSAGE: &str =
    "This PDF is password protected. Please unlock it first, then re-open in the editor.";
pub const CORRUPTED_MESSAGE: &str =
    "This PDF appears damaged or unsupported. Please repair the file or try another document.";
pub const NETWORK_MESSAGE: &str = "Network error while loading editor resources. Please try again.";
pub const FONT_WORKER_MESSAGE: &str = "Font processing failed while saving. Please try again.";
pub const EDITOR_LOAD_FAILED_MESSAGE: &str =
    "The editor failed to load. Please refresh and try again.";
pub const LOAD_TIMEOUT_MESSAGE: &str = "This PDF is taking too long to load. Please try again.";
pub const EXTERNAL_CONTENT_MESSAGE: &str =
    "External content in this PDF was blocked for security. The editor should still work.";
pub const NAVIGATION_BLOCKED_MESSAGE: &str =
    "A link in this PDF tried to open a new page. We blocked it to keep you in the editor.";

/// Default window within which an identical error notification is dropped.
pub const DEFAULT_ERROR_DEDUPE_WINDOW: Duration = Duration::from_millis(1500);

/// How a failure affects the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Shown as a warning; the session continues.
    Informational,
    /// The session is aborted and reported as failed.
    SessionFatal,
    /// The session is aborted and reported as cancelled.
    UserInitiated,
}

/// Normalized engine error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineFault {
    Unspecified,
    OutOfMemory,
    PasswordProtected,
    Corrupted,
    Network,
    FontWorker,
    /// Unrecognized text, trimmed.
    Other(String),
}

impl EngineFault {
    pub fn message(&self) -> &str {
        match self {
            Self::Unspecified => GENERIC_ENGINE_MESSAGE,
            Self::OutOfMemory => OUT_OF_MEMORY_MESSAGE,
            Self::PasswordProtected => PASSWORD_MESSAGE,
            Self::Corrupted => CORRUPTED_MESSAGE,
            Self::Network => NETWORK_MESSAGE,
            Self::FontWorker => FONT_WORKER_MESSAGE,
            Self::Other(text) => text,
        }
    }
}

/// Why a load attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    PasswordProtected,
    Engine(EngineFault),
    FrameLoadTimeout,
    EngineReadyTimeout,
    LoadTimeout,
    /// The engine cancelled a load the host did not cancel.
    UnexpectedCancellation,
    /// Error reported by the hosting environment.
    Host(String),
    ManualCancel,
}

impl LoadFailure {
    pub fn message(&self) -> String {
        match self {
            Self::PasswordProtected => PASSWORD_MESSAGE.to_string(),
            Self::Engine(fault) => fault.message().to_string(),
            Self::FrameLoadTimeout | Self::EngineReadyTimeout => {
                EDITOR_LOAD_FAILED_MESSAGE.to_string()
            }
            Self::LoadTimeout => LOAD_TIMEOUT_MESSAGE.to_string(),
            Self::UnexpectedCancellation => GENERIC_ENGINE_MESSAGE.to_string(),
            Self::Host(text) => text.clone(),
            Self::ManualCancel => String::new(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ManualCancel => Severity::UserInitiated,
            _ => Severity::SessionFatal,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::FrameLoadTimeout | Self::EngineReadyTimeout | Self::LoadTimeout
        )
    }
}

/// Map raw engine error text onto a fault. Matching is case-insensitive and
/// ordered: the first matching family wins.
pub fn classify_engine_error(raw: Option<&str>) -> EngineFault {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return EngineFault::Unspecified;
    }
    let lower = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["out of memory", "allocation failed"]) {
        EngineFault::OutOfMemory
    } else if has(&["password", "encrypted"]) {
        EngineFault::PasswordProtected
    } else if has(&["invalid pdf", "formaterror", "xref", "corrupt"]) {
        EngineFault::Corrupted
    } else if has(&[
        "failed to fetch",
        "networkerror",
        "network request failed",
        "fallback font request timeout",
    ]) {
        EngineFault::Network
    } else if has(&["font worker", "font subset worker"]) {
        EngineFault::FontWorker
    } else {
        EngineFault::Other(text.to_string())
    }
}

/// Warning for blocked external content, naming up to three origins.
pub fn external_content_message<S: AsRef<str>>(origins: &[S]) -> String {
    let label = origins
        .iter()
        .map(|o| o.as_ref().trim())
        .filter(|o| !o.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join(", ");
    if label.is_empty() {
        EXTERNAL_CONTENT_MESSAGE.to_string()
    } else {
        format!("{EXTERNAL_CONTENT_MESSAGE} ({label})")
    }
}

/// True when host-reported error text is the navigation-blocked notice.
pub fn is_navigation_blocked(text: &str) -> bool {
    text.trim() == NAVIGATION_BLOCKED_MESSAGE
}

/// Severity of an error reported by the hosting environment. A blocked
/// navigation is only a warning once the frame is up.
pub fn classify_host_error(text: &str, frame_loaded: bool) -> Severity {
    if frame_loaded && is_navigation_blocked(text) {
        Severity::Informational
    } else {
        Severity::SessionFatal
    }
}

/// Suppresses repeats of the same error text inside a time window.
#[derive(Debug, Clone)]
pub struct ErrorNotifier {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl ErrorNotifier {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns the trimmed text when it should be shown.
    pub fn admit(&mut self, text: &str, now: Instant) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some((previous, at)) = &self.last {
            if previous == text && now.saturating_duration_since(*at) < self.window {
                return None;
            }
        }
        self.last = Some((text.to_string(), now));
        Some(text.to_string())
    }
}

impl Default for ErrorNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_DEDUPE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_engine_error_uses_generic_message() {
        assert_eq!(classify_engine_error(None), EngineFault::Unspecified);
        assert_eq!(classify_engine_error(Some("   ")).message(), GENERIC_ENGINE_MESSAGE);
    }

    #[test]
    fn known_phrases_are_normalized() {
        let cases = [
            ("RangeError: Array buffer allocation failed", EngineFault::OutOfMemory),
            ("PasswordException: No password given", EngineFault::PasswordProtected),
            ("file is Encrypted", EngineFault::PasswordProtected),
            ("FormatError: bad XRef entry", EngineFault::Corrupted),
            ("Invalid PDF structure", EngineFault::Corrupted),
            ("TypeError: Failed to fetch", EngineFault::Network),
            ("Fallback font request timeout", EngineFault::Network),
            ("font subset worker crashed", EngineFault::FontWorker),
        ];
        for (raw, expected) in cases {
            assert_eq!(classify_engine_error(Some(raw)), expected, "{raw}");
        }
    }

    #[test]
    fn unknown_text_passes_through_trimmed() {
        assert_eq!(
            classify_engine_error(Some("  widget exploded \n")),
            EngineFault::Other("widget exploded".into())
        );
    }

    #[test]
    fn timeouts_have_distinct_messages() {
        assert_eq!(LoadFailure::FrameLoadTimeout.message(), EDITOR_LOAD_FAILED_MESSAGE);
        assert_eq!(LoadFailure::EngineReadyTimeout.message(), EDITOR_LOAD_FAILED_MESSAGE);
        assert_eq!(LoadFailure::LoadTimeout.message(), LOAD_TIMEOUT_MESSAGE);
        assert!(LoadFailure::LoadTimeout.is_timeout());
        assert_eq!(LoadFailure::ManualCancel.severity(), Severity::UserInitiated);
        assert_eq!(LoadFailure::UnexpectedCancellation.severity(), Severity::SessionFatal);
    }

    #[test]
    fn external_content_lists_first_three_origins() {
        assert_eq!(external_content_message::<&str>(&[]), EXTERNAL_CONTENT_MESSAGE);
        let msg = external_content_message(&["a.com", " ", "b.com", "c.com", "d.com"]);
        assert!(msg.ends_with("(a.com, b.com, c.com)"));
    }

    #[test]
    fn navigation_block_is_informational_only_with_frame() {
        assert_eq!(
            classify_host_error(NAVIGATION_BLOCKED_MESSAGE, true),
            Severity::Informational
        );
        assert_eq!(
            classify_host_error(NAVIGATION_BLOCKED_MESSAGE, false),
            Severity::SessionFatal
        );
        assert_eq!(classify_host_error("script error", true), Severity::SessionFatal);
    }

    #[test]
    fn duplicate_errors_are_suppressed_inside_window() {
        let mut notifier = ErrorNotifier::default();
        let t0 = Instant::now();
        assert!(notifier.admit("boom", t0).is_some());
        assert!(notifier.admit(" boom ", t0 + Duration::from_millis(1000)).is_none());
        assert!(notifier.admit("other", t0 + Duration::from_millis(1100)).is_some());
        assert!(notifier.admit("other", t0 + Duration::from_millis(2700)).is_some());
        assert!(notifier.admit("", t0).is_none());
    }
}
