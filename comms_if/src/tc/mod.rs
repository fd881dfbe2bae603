//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications 
//! interface. TCs arrive as JSON objects of the form
//! `{"type": "<TYPE>", "payload": <json>}`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod goal;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize, de::DeserializeOwned};
use log::trace;
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the robot from outside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tc
{
    /// The type of the telecommand
    pub tc_type: TcType,

    /// The payload associated with this TC
    pub payload: TcPayload
}

/// Payload of a force-stop TC.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct ForceStopCmd {
    /// `true` latches the stop, `false` releases it.
    pub stop: bool
}

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static TYPE_HAS_NO_PAYLOAD: [TcType; 2] = [
    TcType::None,
    TcType::Cancel
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Telecommand types. 
///
/// The type is used to identify the purpose of the telecommand, and should be
/// used by the telecommand processor to determine where to send the command.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub enum TcType {
    None,

    /// Submit a new navigation goal
    Goal,

    /// Preempt the current goal
    Cancel,

    /// Latch or release the force-stop flag
    ForceStop,

    /// Replace the motion controller configuration
    Reconfigure,
}

/// Telecommand payload.
///
/// The payload allows the data contained in the TC to be serialised in may 
/// ways. The payload only indicates which serialisation format the data is in.
/// It is up to the user to properly deserialise the data contained within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TcPayload {
    None,
    Json(String)
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0:?} is expected to have a payload but it doesn't")]
    MissingPayload(TcType),

    #[error("TC of type {0:?} has an invalid payload: {1}")]
    InvalidPayload(TcType, serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let val: Value = serde_json::from_str(json_str)
            .map_err(TcParseError::InvalidJson)?;

        // Get the type of the TC
        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => return Err(TcParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };
        let tc_type = match TcType::from_str(type_str) {
            Some(t) => t,
            None => return Err(TcParseError::InvalidType(
                format!("{} is not a recognised TC type", type_str)
            ))
        };
        
        // Get the payload. If it's null and the type does not have a payload 
        // then an error is returned
        let payload = if val["payload"].is_null() {
            if !TYPE_HAS_NO_PAYLOAD.contains(&tc_type) {
                return Err(TcParseError::MissingPayload(tc_type))
            }
            TcPayload::None
        }
        else {
            TcPayload::Json(val["payload"].to_string())
        };

        trace!("Parsed {:?} TC", tc_type);

        Ok(Tc {
            tc_type,
            payload
        })
    }

    /// Build a TC carrying the JSON serialisation of `data`.
    pub fn with_payload<T: Serialize>(
        tc_type: TcType, 
        data: &T
    ) -> Result<Self, TcParseError> {
        Ok(Tc {
            tc_type,
            payload: TcPayload::Json(
                serde_json::to_string(data)
                    .map_err(|e| TcParseError::InvalidPayload(tc_type, e))?
            )
        })
    }

    /// Deserialise the payload of this TC.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, TcParseError> {
        match self.payload {
            TcPayload::Json(ref s) => serde_json::from_str(s)
                .map_err(|e| TcParseError::InvalidPayload(self.tc_type, e)),
            TcPayload::None => Err(TcParseError::MissingPayload(self.tc_type))
        }
    }
}

impl TcType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(TcType::None),
            "GOAL" => Some(TcType::Goal),
            "CANCEL" => Some(TcType::Cancel),
            "STOP" => Some(TcType::ForceStop),
            "RECONFIG" => Some(TcType::Reconfigure),
            _ => None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use super::goal::GoalCmd;

    #[test]
    fn test_parse_goal_tc() {
        let tc = Tc::from_json(
            r#"{"type": "GOAL", "payload": {"frame_id": "/map", "position_m": [1.0, -2.0]}}"#
        ).unwrap();
        assert_eq!(tc.tc_type, TcType::Goal);

        let goal: GoalCmd = tc.parse_payload().unwrap();
        assert_eq!(goal.frame_id, "/map");
        assert_eq!(goal.position_m, [1.0, -2.0]);
        assert_eq!(goal.orientation_q, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_parse_stop_and_cancel() {
        let tc = Tc::from_json(r#"{"type": "STOP", "payload": {"stop": true}}"#).unwrap();
        let cmd: ForceStopCmd = tc.parse_payload().unwrap();
        assert!(cmd.stop);

        let tc = Tc::from_json(r#"{"type": "CANCEL"}"#).unwrap();
        assert_eq!(tc.tc_type, TcType::Cancel);
        assert!(matches!(tc.payload, TcPayload::None));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Tc::from_json("{"), 
            Err(TcParseError::InvalidJson(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "WARP"}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "GOAL"}"#),
            Err(TcParseError::MissingPayload(TcType::Goal))
        ));

        let tc = Tc::from_json(r#"{"type": "STOP", "payload": {"halt": 1}}"#).unwrap();
        assert!(matches!(
            tc.parse_payload::<ForceStopCmd>(),
            Err(TcParseError::InvalidPayload(TcType::ForceStop, _))
        ));
    }
}
