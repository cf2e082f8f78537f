//! Host → engine messages
//!
//! Typed intents are encoded into a JSON body plus an optional transferable
//! attachment. Inline document bytes never go through JSON: they move into
//! the attachment so transports that support ownership transfer can hand
//! them over without a copy.

use crate::session::{CorrelationId, LoadToken};
use crate::transfer::{FileDescriptor, ReferenceHandle};
use bytes::Bytes;
use serde_json::{json, Map, Value};

/// How the document reaches the engine for one load.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferPayload {
    /// The full byte buffer, ownership transferred.
    Bytes(Bytes),
    /// A locator the engine dereferences itself.
    Reference(ReferenceHandle),
    /// Only the raw file handle. Used when bytes could not be materialized.
    File,
}

impl TransferPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "inline-bytes",
            Self::Reference(_) => "reference",
            Self::File => "file",
        }
    }
}

/// A typed host intent.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// `load-pdf`
    Load {
        token: LoadToken,
        load_id: CorrelationId,
        file: FileDescriptor,
        payload: TransferPayload,
    },
    /// `cancel-load`
    Cancel { token: LoadToken },
    /// `ping`
    Ping,
    /// `health-check`
    HealthCheck,
    /// `set-tool`
    SetTool { tool: String },
    /// `set-file-name`
    SetFileName { name: String },
    /// `download`
    Download,
}

impl HostCommand {
    /// The wire `type` of this command.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load-pdf",
            Self::Cancel { .. } => "cancel-load",
            Self::Ping => "ping",
            Self::HealthCheck => "health-check",
            Self::SetTool { .. } => "set-tool",
            Self::SetFileName { .. } => "set-file-name",
            Self::Download => "download",
        }
    }

    /// Token this command is scoped to, if any.
    pub fn token(&self) -> Option<LoadToken> {
        match self {
            Self::Load { token, .. } | Self::Cancel { token } => Some(*token),
            _ => None,
        }
    }

    pub fn encode(self) -> EncodedMessage {
        let kind = self.message_type();
        match self {
            Self::Load {
                token,
                load_id,
                file,
                payload,
            } => {
                let mut body = Map::new();
                body.insert("type".into(), json!(kind));
                body.insert("loadToken".into(), json!(token.value()));
                body.insert("loadId".into(), json!(load_id.value()));
                body.insert("fileName".into(), json!(file.name));
                body.insert("blob".into(), json!(file));
                let transfer = match payload {
                    TransferPayload::Bytes(bytes) => Some(bytes),
                    TransferPayload::Reference(handle) => {
                        body.insert("url".into(), json!(handle.as_str()));
                        None
                    }
                    TransferPayload::File => None,
                };
                EncodedMessage {
                    body: Value::Object(body),
                    transfer,
                }
            }
            Self::Cancel { token } => EncodedMessage::plain(json!({
                "type": kind,
                "loadToken": token.value(),
            })),
            Self::SetTool { tool } => EncodedMessage::plain(json!({ "type": kind, "tool": tool })),
            Self::SetFileName { name } => {
                EncodedMessage::plain(json!({ "type": kind, "fileName": name }))
            }
            Self::Ping | Self::HealthCheck | Self::Download => {
                EncodedMessage::plain(json!({ "type": kind }))
            }
        }
    }
}

/// A wire payload ready for posting.
///
/// `transfer` carries the `data` field of a `load-pdf` message when the
/// document travels inline.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMessage {
    pub body: Value,
    pub transfer: Option<Bytes>,
}

impl EncodedMessage {
    fn plain(body: Value) -> Self {
        Self {
            body,
            transfer: None,
        }
    }

    pub fn message_type(&self) -> Option<&str> {
        self.body.get("type").and_then(Value::as_str)
    }

    pub fn load_token(&self) -> Option<LoadToken> {
        self.body.get("loadToken").and_then(LoadToken::from_wire)
    }

    /// Fold the attachment back into the body as a `data` byte array, for
    /// transports that can only carry JSON.
    pub fn into_inline(self) -> Value {
        let Self { mut body, transfer } = self;
        if let (Some(bytes), Some(map)) = (transfer, body.as_object_mut()) {
            map.insert(
                "data".into(),
                Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            );
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::DocumentFile;

    fn load(payload: TransferPayload) -> HostCommand {
        HostCommand::Load {
            token: LoadToken::new(3),
            load_id: CorrelationId::new(9),
            file: DocumentFile::from_bytes("a.pdf", vec![1u8, 2]).descriptor(),
            payload,
        }
    }

    #[test]
    fn inline_bytes_move_into_attachment() {
        let encoded = load(TransferPayload::Bytes(Bytes::from_static(&[1, 2]))).encode();
        assert_eq!(encoded.message_type(), Some("load-pdf"));
        assert_eq!(encoded.load_token(), Some(LoadToken::new(3)));
        assert_eq!(encoded.body["loadId"], 9);
        assert_eq!(encoded.body["fileName"], "a.pdf");
        assert_eq!(encoded.body["blob"]["name"], "a.pdf");
        assert!(encoded.body.get("data").is_none());
        assert!(encoded.body.get("url").is_none());
        assert_eq!(encoded.transfer.as_deref(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn reference_goes_in_url_field() {
        let handle = ReferenceHandle::new("blob:pdf-bridge/x");
        let encoded = load(TransferPayload::Reference(handle)).encode();
        assert_eq!(encoded.body["url"], "blob:pdf-bridge/x");
        assert!(encoded.transfer.is_none());
    }

    #[test]
    fn file_fallback_carries_only_the_handle() {
        let encoded = load(TransferPayload::File).encode();
        assert!(encoded.body.get("url").is_none());
        assert!(encoded.transfer.is_none());
        assert_eq!(encoded.body["blob"]["size"], 2);
    }

    #[test]
    fn into_inline_restores_data_array() {
        let body = load(TransferPayload::Bytes(Bytes::from_static(&[7, 8]))).encode().into_inline();
        assert_eq!(body["data"], json!([7, 8]));
    }

    #[test]
    fn session_free_commands_have_no_token() {
        for cmd in [
            HostCommand::Ping,
            HostCommand::HealthCheck,
            HostCommand::Download,
            HostCommand::SetTool { tool: "text".into() },
            HostCommand::SetFileName { name: "a.pdf".into() },
        ] {
            assert!(cmd.token().is_none());
            let encoded = cmd.encode();
            assert!(encoded.body.get("loadToken").is_none());
        }
    }

    #[test]
    fn cancel_names_the_cancelled_token() {
        let encoded = HostCommand::Cancel { token: LoadToken::new(4) }.encode();
        assert_eq!(encoded.body, json!({ "type": "cancel-load", "loadToken": 4 }));
    }
}
