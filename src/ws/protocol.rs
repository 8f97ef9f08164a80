//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Movement intent; absent directions count as released
    Input {
        #[serde(default)]
        up: bool,
        #[serde(default)]
        down: bool,
        #[serde(default)]
        left: bool,
        #[serde(default)]
        right: bool,
        /// Client timestamp, server time is used when absent
        #[serde(default)]
        stamp: Option<f64>,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: f64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once, right after the connection is accepted
    Welcome {
        id: u64,
        map: MapSize,
        t: u64,
    },

    /// Authoritative world state, sent every tick
    Snapshot {
        t: u64,
        players: Vec<PlayerSnapshot>,
        coins: Vec<CoinSnapshot>,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub w: u32,
    pub h: u32,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub score: u32,
}

/// Coin state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_fields_default_to_released() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"input","left":true}"#).unwrap();
        assert_eq!(
            msg,
            ClientMsg::Input {
                up: false,
                down: false,
                left: true,
                right: false,
                stamp: None,
            }
        );
    }

    #[test]
    fn input_keeps_client_stamp() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"input","up":true,"stamp":1712.5}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Input { up: true, stamp: Some(s), .. } if s == 1712.5));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport","x":1}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>(r#"{"up":true}"#).is_err());
        assert!(serde_json::from_str::<ClientMsg>("not json").is_err());
    }

    #[test]
    fn welcome_wire_shape() {
        let msg = ServerMsg::Welcome {
            id: 7,
            map: MapSize { w: 800, h: 600 },
            t: 1000,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "welcome", "id": 7, "map": {"w": 800, "h": 600}, "t": 1000})
        );
    }

    #[test]
    fn snapshot_wire_shape() {
        let msg = ServerMsg::Snapshot {
            t: 5,
            players: vec![PlayerSnapshot {
                id: 1,
                x: 10.0,
                y: 20.0,
                score: 3,
            }],
            coins: vec![CoinSnapshot {
                id: 2,
                x: 30.0,
                y: 40.0,
            }],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["players"][0]["score"], 3);
        assert_eq!(value["coins"][0]["id"], 2);
        assert_eq!(value["coins"][0]["x"], 30.0);
    }
}
