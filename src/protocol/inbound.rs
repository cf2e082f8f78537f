//! Engine → host messages
//!
//! Arbitrary payloads are decoded into a closed set of variants. Anything
//! that does not match a known shape decodes to `None` and is dropped.
//! Optional fields with the wrong type are dropped individually; only the
//! fields a variant cannot do without reject the whole message.

use crate::session::{CorrelationId, LoadToken};
use bytes::Bytes;
use serde_json::{Map, Value};

/// An inbound payload as delivered by the channel.
///
/// Binary artifacts (e.g. a downloaded document) may arrive out of band as
/// `attachment` or inline as a JSON byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEnvelope {
    pub body: Value,
    pub attachment: Option<Bytes>,
}

impl InboundEnvelope {
    pub fn json(body: Value) -> Self {
        Self {
            body,
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, bytes: impl Into<Bytes>) -> Self {
        self.attachment = Some(bytes.into());
        self
    }
}

impl From<Value> for InboundEnvelope {
    fn from(body: Value) -> Self {
        Self::json(body)
    }
}

/// What a message claims about its load token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenClaim {
    /// No `loadToken` field; accepted regardless of the active session.
    #[default]
    Absent,
    /// A token the ledger could have issued.
    Issued(LoadToken),
    /// A finite number that can never be an issued token. Always stale.
    Unrecognized,
}

impl TokenClaim {
    fn from_field(value: Option<&Value>) -> Self {
        match value {
            Some(v) if v.as_f64().is_some_and(f64::is_finite) => match LoadToken::from_wire(v) {
                Some(token) => Self::Issued(token),
                None => Self::Unrecognized,
            },
            _ => Self::Absent,
        }
    }
}

/// Session addressing carried by session-scoped messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionTag {
    pub token: TokenClaim,
    /// Engine-side correlation id (`loadId`), used when the token is absent.
    pub load_id: Option<CorrelationId>,
}

impl SessionTag {
    pub fn token(token: LoadToken) -> Self {
        Self {
            token: TokenClaim::Issued(token),
            load_id: None,
        }
    }

    pub fn untagged() -> Self {
        Self::default()
    }

    fn from_record(record: &Map<String, Value>) -> Self {
        Self {
            token: TokenClaim::from_field(record.get("loadToken")),
            load_id: record.get("loadId").and_then(CorrelationId::from_wire),
        }
    }
}

/// The closed set of engine messages.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// `pdf-editor-ready`
    Ready,
    /// `pdf-loaded`
    Loaded {
        tag: SessionTag,
        page_count: Option<u32>,
    },
    /// `pdf-render-complete`
    RenderComplete { tag: SessionTag },
    /// `pdf-progress`
    Progress {
        tag: SessionTag,
        loaded: f64,
        total: Option<f64>,
    },
    /// `pdf-password-error`
    PasswordError { tag: SessionTag },
    /// `pdf-error`
    Error {
        tag: SessionTag,
        message: Option<String>,
    },
    /// `pdf-external-embed-blocked`
    ExternalContentBlocked {
        tag: SessionTag,
        count: Option<f64>,
        origins: Vec<String>,
    },
    /// `pdf-load-cancelled`
    LoadCancelled { tag: SessionTag },
    /// `open-tool`
    OpenTool { tool: Option<String> },
    /// `pdf-download`
    Download { blob: Bytes },
    /// `pdf-save-progress`
    SaveProgress { phase: Option<String> },
    /// `pdf-dirty-state`
    DirtyState { dirty: bool },
    /// `health-check-ack`
    HealthAck,
}

impl EngineMessage {
    /// Decode an inbound payload. Unknown or malformed payloads yield `None`.
    pub fn decode(envelope: &InboundEnvelope) -> Option<Self> {
        let record = envelope.body.as_object()?;
        let kind = record.get("type")?.as_str()?;
        let tag = SessionTag::from_record(record);

        let message = match kind {
            "pdf-editor-ready" => Self::Ready,
            "pdf-loaded" => Self::Loaded {
                tag,
                page_count: record.get("pageCount").and_then(page_count),
            },
            "pdf-render-complete" => Self::RenderComplete { tag },
            "pdf-progress" => Self::Progress {
                tag,
                loaded: finite(record.get("loaded"))?,
                total: finite(record.get("total")),
            },
            "pdf-password-error" => Self::PasswordError { tag },
            "pdf-error" => Self::Error {
                tag,
                message: string(record.get("message")),
            },
            "pdf-external-embed-blocked" => Self::ExternalContentBlocked {
                tag,
                count: finite(record.get("count")),
                origins: record
                    .get("origins")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            "pdf-load-cancelled" => Self::LoadCancelled { tag },
            "open-tool" => Self::OpenTool {
                tool: string(record.get("tool")),
            },
            "pdf-download" => Self::Download {
                blob: envelope
                    .attachment
                    .clone()
                    .or_else(|| record.get("blob").and_then(byte_array))?,
            },
            "pdf-save-progress" => Self::SaveProgress {
                phase: string(record.get("phase")),
            },
            "pdf-dirty-state" => Self::DirtyState {
                dirty: record.get("isDirty").and_then(Value::as_bool).unwrap_or(false),
            },
            "health-check-ack" => Self::HealthAck,
            _ => return None,
        };
        Some(message)
    }

    /// The wire `type` of this message.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Ready => "pdf-editor-ready",
            Self::Loaded { .. } => "pdf-loaded",
            Self::RenderComplete { .. } => "pdf-render-complete",
            Self::Progress { .. } => "pdf-progress",
            Self::PasswordError { .. } => "pdf-password-error",
            Self::Error { .. } => "pdf-error",
            Self::ExternalContentBlocked { .. } => "pdf-external-embed-blocked",
            Self::LoadCancelled { .. } => "pdf-load-cancelled",
            Self::OpenTool { .. } => "open-tool",
            Self::Download { .. } => "pdf-download",
            Self::SaveProgress { .. } => "pdf-save-progress",
            Self::DirtyState { .. } => "pdf-dirty-state",
            Self::HealthAck => "health-check-ack",
        }
    }

    /// Session addressing, for session-scoped variants.
    pub fn session_tag(&self) -> Option<&SessionTag> {
        match self {
            Self::Loaded { tag, .. }
            | Self::RenderComplete { tag }
            | Self::Progress { tag, .. }
            | Self::PasswordError { tag }
            | Self::Error { tag, .. }
            | Self::ExternalContentBlocked { tag, .. }
            | Self::LoadCancelled { tag } => Some(tag),
            Self::Ready
            | Self::OpenTool { .. }
            | Self::Download { .. }
            | Self::SaveProgress { .. }
            | Self::DirtyState { .. }
            | Self::HealthAck => None,
        }
    }
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn page_count(value: &Value) -> Option<u32> {
    let n = value.as_f64()?;
    (n.is_finite() && n >= 0.0).then(|| n.min(u32::MAX as f64) as u32)
}

fn byte_array(value: &Value) -> Option<Bytes> {
    let items = value.as_array()?;
    let mut bytes = Vec::with_capacity(items.len());
    for item in items {
        let b = item.as_u64().filter(|b| *b <= u8::MAX as u64)?;
        bytes.push(b as u8);
    }
    Some(Bytes::from(bytes))
}
