//! OpenGL debug message classification
//!
//! Driver debug messages are sorted into source, type and severity. Routine
//! notifications are dropped (or logged when asked for), a short list of
//! known-noisy message ids is ignored, and anything else is treated as a
//! driver-level misuse that stops the process.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a debug message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSource {
    /// The GL API
    Api,
    /// The window system
    WindowSystem,
    /// The shader compiler
    ShaderCompiler,
    /// A third-party tool or layer
    ThirdParty,
    /// The application itself
    Application,
    /// Some other source
    Other,
    /// A value this crate does not know about
    Unknown,
}

impl DebugSource {
    /// Classify a raw `GL_DEBUG_SOURCE_*` value
    pub fn from_gl(value: u32) -> Self {
        match value {
            glow::DEBUG_SOURCE_API => Self::Api,
            glow::DEBUG_SOURCE_WINDOW_SYSTEM => Self::WindowSystem,
            glow::DEBUG_SOURCE_SHADER_COMPILER => Self::ShaderCompiler,
            glow::DEBUG_SOURCE_THIRD_PARTY => Self::ThirdParty,
            glow::DEBUG_SOURCE_APPLICATION => Self::Application,
            glow::DEBUG_SOURCE_OTHER => Self::Other,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DebugSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Api => "API",
            Self::WindowSystem => "Window System",
            Self::ShaderCompiler => "Shader Compiler",
            Self::ThirdParty => "Third Party",
            Self::Application => "Application",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        })
    }
}

/// What kind of problem a debug message reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugType {
    /// An API error
    Error,
    /// Use of deprecated functionality
    DeprecatedBehaviour,
    /// Undefined behaviour
    UndefinedBehaviour,
    /// Non-portable usage
    Portability,
    /// Performance warning
    Performance,
    /// Debug group marker
    Marker,
    /// Some other type
    Other,
    /// A value this crate does not know about
    Unknown,
}

impl DebugType {
    /// Classify a raw `GL_DEBUG_TYPE_*` value
    pub fn from_gl(value: u32) -> Self {
        match value {
            glow::DEBUG_TYPE_ERROR => Self::Error,
            glow::DEBUG_TYPE_DEPRECATED_BEHAVIOR => Self::DeprecatedBehaviour,
            glow::DEBUG_TYPE_UNDEFINED_BEHAVIOR => Self::UndefinedBehaviour,
            glow::DEBUG_TYPE_PORTABILITY => Self::Portability,
            glow::DEBUG_TYPE_PERFORMANCE => Self::Performance,
            glow::DEBUG_TYPE_MARKER => Self::Marker,
            glow::DEBUG_TYPE_OTHER => Self::Other,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DebugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "Error",
            Self::DeprecatedBehaviour => "Deprecated Behaviour",
            Self::UndefinedBehaviour => "Undefined Behaviour",
            Self::Portability => "Portability",
            Self::Performance => "Performance",
            Self::Marker => "Marker",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        })
    }
}

/// How serious a debug message is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// High severity
    High,
    /// Medium severity
    Medium,
    /// Low severity
    Low,
    /// Informational
    Notification,
    /// A value this crate does not know about
    Unknown,
}

impl DebugSeverity {
    /// Classify a raw `GL_DEBUG_SEVERITY_*` value
    pub fn from_gl(value: u32) -> Self {
        match value {
            glow::DEBUG_SEVERITY_HIGH => Self::High,
            glow::DEBUG_SEVERITY_MEDIUM => Self::Medium,
            glow::DEBUG_SEVERITY_LOW => Self::Low,
            glow::DEBUG_SEVERITY_NOTIFICATION => Self::Notification,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DebugSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Notification => "Notification",
            Self::Unknown => "Unknown",
        })
    }
}

/// A classified driver debug message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugMessage {
    /// Origin
    pub source: DebugSource,
    /// Kind
    pub kind: DebugType,
    /// Driver-specific message id
    pub id: u32,
    /// Severity
    pub severity: DebugSeverity,
    /// Message text
    pub text: String,
}

impl DebugMessage {
    /// Classify the raw values passed to a GL debug callback
    pub fn new(source: u32, kind: u32, id: u32, severity: u32, text: &str) -> Self {
        Self {
            source: DebugSource::from_gl(source),
            kind: DebugType::from_gl(kind),
            id,
            severity: DebugSeverity::from_gl(severity),
            text: text.to_string(),
        }
    }
}

impl fmt::Display for DebugMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OpenGL Error ({} severity, id: {}): from {}, {}: {}",
            self.severity, self.id, self.source, self.kind, self.text
        )
    }
}

/// What to do with a debug message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugVerdict {
    /// Drop silently
    Ignore,
    /// Log at info level
    Log,
    /// Log at error level and stop the process
    Fatal,
}

/// Filter applied to driver debug messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugMessagePolicy {
    /// Message ids that are always ignored
    pub ignored_ids: Vec<u32>,
    /// Log notification-severity messages instead of dropping them
    pub show_notifications: bool,
}

impl Default for DebugMessagePolicy {
    fn default() -> Self {
        Self {
            // 131185: NVIDIA "buffer object will use VIDEO memory" info message
            ignored_ids: vec![131_185],
            show_notifications: false,
        }
    }
}

impl DebugMessagePolicy {
    /// Decide what to do with a message
    pub fn verdict(&self, message: &DebugMessage) -> DebugVerdict {
        if message.severity == DebugSeverity::Notification {
            return if self.show_notifications {
                DebugVerdict::Log
            } else {
                DebugVerdict::Ignore
            };
        }
        if self.ignored_ids.contains(&message.id) {
            return DebugVerdict::Ignore;
        }
        DebugVerdict::Fatal
    }

    /// Apply the verdict: drop, log, or log and panic
    pub fn handle(&self, message: &DebugMessage) {
        match self.verdict(message) {
            DebugVerdict::Ignore => {}
            DebugVerdict::Log => log::info!("{message}"),
            DebugVerdict::Fatal => {
                log::error!("{message}");
                panic!("{message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: u32, severity: u32) -> DebugMessage {
        DebugMessage::new(
            glow::DEBUG_SOURCE_API,
            glow::DEBUG_TYPE_ERROR,
            id,
            severity,
            "GL_INVALID_OPERATION",
        )
    }

    #[test]
    fn test_classification() {
        let msg = DebugMessage::new(
            glow::DEBUG_SOURCE_SHADER_COMPILER,
            glow::DEBUG_TYPE_PERFORMANCE,
            7,
            glow::DEBUG_SEVERITY_MEDIUM,
            "slow",
        );
        assert_eq!(msg.source, DebugSource::ShaderCompiler);
        assert_eq!(msg.kind, DebugType::Performance);
        assert_eq!(msg.severity, DebugSeverity::Medium);
        assert_eq!(
            msg.to_string(),
            "OpenGL Error (Medium severity, id: 7): from Shader Compiler, Performance: slow"
        );
    }

    #[test]
    fn test_unknown_values() {
        let msg = DebugMessage::new(0, 0, 0, 0, "");
        assert_eq!(msg.source, DebugSource::Unknown);
        assert_eq!(msg.kind, DebugType::Unknown);
        assert_eq!(msg.severity, DebugSeverity::Unknown);
    }

    #[test]
    fn test_notifications_suppressed_by_default() {
        let policy = DebugMessagePolicy::default();
        let msg = message(1, glow::DEBUG_SEVERITY_NOTIFICATION);
        assert_eq!(policy.verdict(&msg), DebugVerdict::Ignore);

        let verbose = DebugMessagePolicy {
            show_notifications: true,
            ..DebugMessagePolicy::default()
        };
        assert_eq!(verbose.verdict(&msg), DebugVerdict::Log);
    }

    #[test]
    fn test_ignored_ids() {
        let policy = DebugMessagePolicy::default();
        assert_eq!(
            policy.verdict(&message(131_185, glow::DEBUG_SEVERITY_LOW)),
            DebugVerdict::Ignore
        );
    }

    #[test]
    fn test_everything_else_is_fatal() {
        let policy = DebugMessagePolicy::default();
        assert_eq!(
            policy.verdict(&message(1282, glow::DEBUG_SEVERITY_HIGH)),
            DebugVerdict::Fatal
        );
        assert_eq!(
            policy.verdict(&message(1282, glow::DEBUG_SEVERITY_LOW)),
            DebugVerdict::Fatal
        );
    }

    #[test]
    #[should_panic(expected = "OpenGL Error (High severity")]
    fn test_fatal_message_panics() {
        DebugMessagePolicy::default().handle(&message(1282, glow::DEBUG_SEVERITY_HIGH));
    }
}
