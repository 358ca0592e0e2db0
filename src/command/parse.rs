//! Frame payload → [`Request`].
//!
//! Two shapes arrive on the wire:
//!
//! - the bare text `STOP` (no JSON, no token)
//! - a JSON object `{"token": "...", "command": "...", "info": {...}}`
//!
//! `info` is an open string-keyed map. The mobile client double-encodes it
//! for `SET` (`"info": "{\"frequency\":500}"`), so a string holding a JSON
//! object is unwrapped to the same map.

use serde_json::{Map, Value};

use crate::error::CommandError;

pub type Info = Map<String, Value>;

/// Fast-path payload that skips JSON parsing and token checks.
pub const STOP_LITERAL: &str = "STOP";

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Bare `STOP` frame.
    Stop,
    Command(Command),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Token the peer claims; empty when absent.
    pub token: String,
    pub name: String,
    pub info: Info,
}

pub fn parse_frame(payload: &str) -> Result<Request, CommandError> {
    let payload = payload.trim();
    if payload == STOP_LITERAL {
        return Ok(Request::Stop);
    }

    let Ok(Value::Object(mut obj)) = serde_json::from_str::<Value>(payload) else {
        return Err(CommandError::MalformedJson);
    };

    let Some(Value::String(name)) = obj.remove("command") else {
        return Err(CommandError::MissingCommand);
    };
    let token = match obj.remove("token") {
        Some(Value::String(t)) => t,
        _ => String::new(),
    };
    let info = normalize_info(obj.remove("info"))?;

    Ok(Request::Command(Command { token, name, info }))
}

fn normalize_info(info: Option<Value>) -> Result<Info, CommandError> {
    match info {
        None | Some(Value::Null) => Ok(Info::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Info::new()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(CommandError::InvalidInfo),
        },
        Some(_) => Err(CommandError::InvalidInfo),
    }
}
