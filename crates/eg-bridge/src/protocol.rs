//! Line-delimited JSON bridge protocol
//!
//! Every request is one JSON object on one line, answered by exactly one
//! response line:
//!
//! ```text
//! -> {"cmd":"reset"}
//! <- {"obs":"<base64>","reward":0.0,"done":false,"info":{}}
//! -> {"cmd":"step","buttons":["A","UP"]}
//! <- {"obs":"<base64>","reward":0.0,"done":false,"info":{}}
//! -> {"cmd":"read_memory","addr":33702412}
//! <- {"value":3}
//! ```
//!
//! Missing `reward`, `done` and `info` default to `0.0`, `false` and `{}`.

use eg_core::observation::{self, ObsPayload, ObservationError};
use eg_core::{Button, Buttons, Observation};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Request sent to the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Reset,
    Step { buttons: Vec<Button> },
    ReadMemory { addr: u32 },
    WriteMemory { addr: u32, value: u8 },
}

impl Command {
    /// Step command pressing every button in `mask`
    pub fn step(mask: Buttons) -> Self {
        Command::Step {
            buttons: mask.pressed(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Reset => "reset",
            Command::Step { .. } => "step",
            Command::ReadMemory { .. } => "read_memory",
            Command::WriteMemory { .. } => "write_memory",
        }
    }
}

/// Reply from the bridge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Screen payload, absent while the bridge has nothing to show
    #[serde(
        default,
        deserialize_with = "deserialize_obs",
        serialize_with = "serialize_obs"
    )]
    pub obs: Option<ObsPayload>,

    /// Bridge-side reward, advisory only
    #[serde(default)]
    pub reward: f64,

    /// Bridge-side episode end flag, advisory only
    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub info: Map<String, Value>,

    /// Byte value, only present in replies to `read_memory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
}

impl Response {
    /// Reply carrying a screen
    pub fn with_obs(obs: ObsPayload) -> Self {
        Self {
            obs: Some(obs),
            ..Self::default()
        }
    }

    /// Reply to a memory read
    pub fn with_value(value: u8) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// Decoded screen, blank if absent or malformed
    pub fn observation(&self) -> Observation {
        observation::decode(self.obs.as_ref())
    }
}

fn obs_from_json(value: Value) -> Result<Option<ObsPayload>, ObservationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(ObsPayload::Base64(text))),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| ObservationError::Unsupported(format!("pixel value {item}")))
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(|bytes| Some(ObsPayload::Raw(bytes))),
        other => Err(ObservationError::Unsupported(format!(
            "expected string, array or null, got {other}"
        ))),
    }
}

// A bad `obs` field must not fail the whole response: it degrades to "no observation".
fn deserialize_obs<'de, D>(deserializer: D) -> Result<Option<ObsPayload>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(obs_from_json(value).unwrap_or_else(|err| {
        tracing::warn!("malformed observation: {err}");
        None
    }))
}

fn serialize_obs<S>(obs: &Option<ObsPayload>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match obs {
        None => serializer.serialize_none(),
        Some(ObsPayload::Base64(text)) => serializer.serialize_str(text),
        Some(ObsPayload::Raw(bytes)) => serializer.serialize_str(&observation::encode_base64(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eg_core::OBS_LEN;

    #[test]
    fn test_command_wire_format() {
        assert_eq!(
            serde_json::to_string(&Command::Reset).unwrap(),
            r#"{"cmd":"reset"}"#
        );
        assert_eq!(
            serde_json::to_string(&Command::step(Buttons::A | Buttons::UP)).unwrap(),
            r#"{"cmd":"step","buttons":["A","UP"]}"#
        );
        assert_eq!(
            serde_json::to_string(&Command::step(Buttons::empty())).unwrap(),
            r#"{"cmd":"step","buttons":[]}"#
        );
        assert_eq!(
            serde_json::to_string(&Command::ReadMemory { addr: 0x0202_420C }).unwrap(),
            r#"{"cmd":"read_memory","addr":33702412}"#
        );
    }

    #[test]
    fn test_command_parse() {
        let cmd: Command =
            serde_json::from_str(r#"{"cmd":"step","buttons":["START","B"]}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Step {
                buttons: vec![Button::Start, Button::B]
            }
        );
        assert!(serde_json::from_str::<Command>(r#"{"cmd":"step","buttons":["Z"]}"#).is_err());
    }

    #[test]
    fn test_response_defaults() {
        let resp: Response = serde_json::from_str(r#"{"obs":null}"#).unwrap();
        assert_eq!(resp, Response::default());

        let resp: Response = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.reward, 0.0);
        assert!(!resp.done);
        assert!(resp.info.is_empty());
        assert!(resp.obs.is_none());
    }

    #[test]
    fn test_response_fields() {
        let resp: Response = serde_json::from_str(
            r#"{"obs":"AAEC","reward":1.5,"done":true,"info":{"map":4}}"#,
        )
        .unwrap();
        assert_eq!(resp.obs, Some(ObsPayload::Base64("AAEC".into())));
        assert_eq!(resp.reward, 1.5);
        assert!(resp.done);
        assert_eq!(resp.info["map"], 4);
    }

    #[test]
    fn test_malformed_obs_degrades() {
        let resp: Response = serde_json::from_str(r#"{"obs":{"png":true},"reward":2}"#).unwrap();
        assert!(resp.obs.is_none());
        assert_eq!(resp.reward, 2.0);

        let resp: Response = serde_json::from_str(r#"{"obs":[1,2,300]}"#).unwrap();
        assert!(resp.obs.is_none());

        let resp: Response = serde_json::from_str(r#"{"obs":[1,2,3]}"#).unwrap();
        assert_eq!(resp.obs, Some(ObsPayload::Raw(vec![1, 2, 3])));
        assert!(resp.observation().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_truncated_response_is_an_error() {
        assert!(serde_json::from_str::<Response>(r#"{"obs":null,"rew"#).is_err());
    }

    #[test]
    fn test_raw_screen_goes_out_as_base64() {
        let resp = Response::with_obs(ObsPayload::Raw(vec![9; OBS_LEN]));
        let line = serde_json::to_string(&resp).unwrap();
        assert!(!line.contains("value"));

        let back: Response = serde_json::from_str(&line).unwrap();
        assert!(matches!(back.obs, Some(ObsPayload::Base64(_))));
        assert!(back.observation().iter().all(|&p| p == 9));
    }

    #[test]
    fn test_memory_reply() {
        let line = serde_json::to_string(&Response::with_value(3)).unwrap();
        let back: Response = serde_json::from_str(&line).unwrap();
        assert_eq!(back.value, Some(3));

        let bare: Response = serde_json::from_str(r#"{"value":255}"#).unwrap();
        assert_eq!(bare.value, Some(255));
    }
}
