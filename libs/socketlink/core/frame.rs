//! JSON frames exchanged over the transport
//!
//! Outbound:
//! ```text
//! {"id":3,"method":"get","url":"/hello","headers":{"x-a":"1"},"data":{...}}
//! ```
//! Inbound response (statusCode optional, defaults to 200):
//! ```text
//! {"id":3,"body":"ok!","statusCode":200,"headers":{...}}
//! ```
//! Inbound server event:
//! ```text
//! {"event":"chat","data":{...}}
//! ```

use crate::core::response::Jwr;
use crate::traits::{HeaderSet, Result, SocketLinkError, WsMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
            Method::Head => "head",
            Method::Options => "options",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SocketLinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "patch" => Ok(Method::Patch),
            "delete" => Ok(Method::Delete),
            "head" => Ok(Method::Head),
            "options" => Ok(Method::Options),
            "" => Err(SocketLinkError::InvalidRequest("method is required".into())),
            other => Err(SocketLinkError::InvalidRequest(format!(
                "unsupported method '{}'",
                other
            ))),
        }
    }
}

/// One outbound request, tagged with its correlation id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestFrame {
    pub id: u64,
    pub method: Method,
    pub url: String,
    pub headers: HeaderSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RequestFrame {
    pub fn encode(&self) -> Result<WsMessage> {
        Ok(WsMessage::Text(serde_json::to_string(self)?))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseFrame {
    id: u64,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    headers: HeaderSet,
}

#[derive(Deserialize)]
struct EventFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Response to the request with this correlation id
    Response { id: u64, body: Value, jwr: Jwr },
    /// Server-pushed event, not tied to any request
    Event { name: String, data: Value },
}

impl InboundFrame {
    /// Decode a text frame; binary frames are not part of the protocol
    pub fn decode(message: &WsMessage) -> Result<Self> {
        let text = message.as_text().ok_or_else(|| {
            SocketLinkError::Protocol("binary frames are not supported".into())
        })?;

        let value: Value = serde_json::from_str(text)?;

        if value.get("id").is_some() {
            let frame: ResponseFrame = serde_json::from_value(value)?;
            Ok(InboundFrame::Response {
                id: frame.id,
                body: frame.body,
                jwr: Jwr::new(frame.status_code, frame.headers),
            })
        } else if value.get("event").is_some() {
            let frame: EventFrame = serde_json::from_value(value)?;
            Ok(InboundFrame::Event {
                name: frame.event,
                data: frame.data,
            })
        } else {
            Err(SocketLinkError::Protocol(
                "frame carries neither an id nor an event".into(),
            ))
        }
    }
}
