use ::std::net::SocketAddr;
use ::wire::{GameUpdatePacket, PacketType};

/// What the proxy currently knows about the proxied player.
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub name: String,
    pub world_name: String,
    pub net_id: i32,
    pub pos: (f32, f32),
    /// The last character-state record the server sent for this player.
    pub character: GameUpdatePacket,
}

impl Default for Avatar {
    fn default() -> Self {
        Self {
            name: String::new(),
            world_name: String::new(),
            net_id: 0,
            pos: (0.0, 0.0),
            character: GameUpdatePacket::new(PacketType::SetCharacterState),
        }
    }
}

/// Session state handed to a single handler invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub session_id: u64,
    pub downstream: Option<SocketAddr>,
    pub upstream: Option<SocketAddr>,
    pub avatar: Avatar,
}
