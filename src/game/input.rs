//! Input applier: turns dequeued client payloads into player intent

use tracing::{debug, trace};

use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::queue::InboundMsg;
use super::world::{InputIntent, PlayerId, WorldState};

/// What applying one inbound payload produced
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Player intent was overwritten
    Intent(PlayerId),
    /// A message must be sent back to this player only
    Reply(PlayerId, ServerMsg),
    /// Malformed or misaddressed, dropped without telling anyone
    Dropped,
}

/// Decode a payload and apply it to its player. Never fails: anything that
/// cannot be applied is dropped.
pub fn apply_inbound(world: &mut WorldState, msg: InboundMsg, now_ms: u64) -> Applied {
    let client_msg = match serde_json::from_str::<ClientMsg>(&msg.raw) {
        Ok(client_msg) => client_msg,
        Err(e) => {
            debug!(player_id = msg.player_id, error = %e, "Dropping malformed payload");
            return Applied::Dropped;
        }
    };

    let Some(player) = world.players.get_mut(&msg.player_id) else {
        trace!(player_id = msg.player_id, "Dropping message for departed player");
        return Applied::Dropped;
    };

    match client_msg {
        ClientMsg::Input {
            up,
            down,
            left,
            right,
            stamp,
        } => {
            player.input = InputIntent {
                up,
                down,
                left,
                right,
                stamp: stamp.unwrap_or(now_ms as f64),
            };
            trace!(player_id = player.id, stamp = player.input.stamp, "Intent updated");
            Applied::Intent(player.id)
        }
        ClientMsg::Ping { t } => Applied::Reply(player.id, ServerMsg::Pong { t }),
    }
}
