//! One proxied client: its two connections and what we know about its avatar.
use crate::relay::{Relay, Route, Side};
use crate::stream::{Reader, Writer};
use ::command::{Avatar, Registry, Snapshot};
use ::core::fmt;
use ::std::io;
use ::std::net::SocketAddr;
use ::std::sync::{Mutex, MutexGuard, PoisonError};
use ::std::sync::Arc;
use ::tokio::io::{AsyncRead, AsyncWrite};
use ::tokio::net::TcpStream;
use ::tokio::sync::mpsc;
use ::wire::text::TextFields;
use ::wire::{GameUpdatePacket, PacketType};

#[derive(Debug)]
pub enum SessionError {
    Connect(io::Error),
    Io(io::Error),
}
impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Connect(e) => write!(f, "failed to reach the server: {}", e),
            SessionError::Io(e) => write!(f, "{}", e),
        }
    }
}
impl ::std::error::Error for SessionError {}

/// Shared between the two relay directions of a session.
#[derive(Debug)]
pub struct Session {
    id: u64,
    downstream: Option<SocketAddr>,
    upstream: Option<SocketAddr>,
    avatar: Mutex<Avatar>,
}

impl Session {
    pub fn new(id: u64, downstream: Option<SocketAddr>, upstream: Option<SocketAddr>) -> Self {
        Self { id, downstream, upstream, avatar: Mutex::new(Avatar::default()) }
    }

    fn avatar(&self) -> MutexGuard<'_, Avatar> {
        // poisoning is ignored, the avatar is plain data
        self.avatar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state, for a single handler invocation.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            session_id: self.id,
            downstream: self.downstream,
            upstream: self.upstream,
            avatar: self.avatar().clone(),
        }
    }

    /// Pick up the player's name from login data and the world from join requests.
    pub fn observe_client_text(&self, fields: &TextFields<'_>) {
        if let Some(name) = fields.get("tankIDName").or_else(|| fields.get("requestedName")) {
            if !name.is_empty() {
                ::tracing::debug!(name, "avatar name");
                self.avatar().name = name.to_owned();
            }
        }
        if fields.action() == Some("join_request") {
            if let Some(world) = fields.get("name") {
                ::tracing::debug!(world, "joining world");
                self.avatar().world_name = world.to_owned();
            }
        }
    }

    pub fn set_character(&self, packet: GameUpdatePacket) {
        ::tracing::debug!("character state replaced locally");
        self.avatar().character = packet;
    }

    pub fn observe_client_packet(&self, packet: &GameUpdatePacket) {
        if let Ok(movement) = packet.movement() {
            let mut avatar = self.avatar();
            avatar.net_id = movement.net_id();
            avatar.pos = (movement.pos_x(), movement.pos_y());
        }
    }

    pub fn observe_server_packet(&self, packet: &GameUpdatePacket) {
        if packet.packet_type() == Some(PacketType::SetCharacterState) {
            ::tracing::debug!("character state updated");
            self.avatar().character = *packet;
        }
    }
}

async fn read_loop<R: AsyncRead + Unpin>(
    side: Side,
    mut reader: Reader<R>,
    mut relay: Relay<'_>,
    to_client: mpsc::UnboundedSender<Vec<u8>>,
    to_server: mpsc::UnboundedSender<Vec<u8>>,
) -> Result<(), SessionError> {
    loop {
        let buf = match reader.read().await.map_err(SessionError::Io)? {
            Some(buf) => buf,
            None => {
                ::tracing::info!("{}: connection ended", side.name());
                return Ok(())
            },
        };
        for route in relay.process(buf) {
            let sent = match route {
                Route::Downstream(msg) => to_client.send(msg),
                Route::Upstream(msg) => to_server.send(msg),
            };
            if sent.is_err() {
                // the writer is gone, so the session is over
                return Ok(())
            }
        }
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(side: Side, mut writer: Writer<W>, mut queue: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(msg) = queue.recv().await {
        if let Err(e) = writer.write(&msg).await {
            ::tracing::warn!("{}: write failure: {:?}", side.name(), e);
            break
        }
    }
}

/// Relay between `client` and a fresh connection to `upstream` until either side stops.
#[::tracing::instrument(skip(client, registry, max_len))]
pub async fn start_session(
    id: u64,
    client: TcpStream,
    upstream: SocketAddr,
    registry: &'static Registry,
    max_len: usize,
) -> Result<(), SessionError> {
    let server = TcpStream::connect(upstream).await.map_err(SessionError::Connect)?;
    let session = Arc::new(Session::new(id, client.peer_addr().ok(), Some(upstream)));
    let (client_rx, client_tx) = client.into_split();
    let (server_rx, server_tx) = server.into_split();
    let (to_client, client_queue) = mpsc::unbounded_channel();
    let (to_server, server_queue) = mpsc::unbounded_channel();
    ::tokio::spawn(write_loop(Side::Client, Writer::new(client_tx), client_queue));
    ::tokio::spawn(write_loop(Side::Server, Writer::new(server_tx), server_queue));

    let mut from_client = ::tokio::spawn(read_loop(
        Side::Client,
        Reader::new(client_rx, max_len),
        Relay::client(session.clone(), registry),
        to_client.clone(),
        to_server.clone(),
    ));
    let mut from_server = ::tokio::spawn(read_loop(
        Side::Server,
        Reader::new(server_rx, max_len),
        Relay::server(session),
        to_client,
        to_server,
    ));
    let ended = ::tokio::select! {
        ended = &mut from_client => { from_server.abort(); ended },
        ended = &mut from_server => { from_client.abort(); ended },
    };
    match ended {
        Ok(result) => result,
        Err(e) => {
            ::tracing::error!("relay task failed: {}", e);
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::wire::PacketFlags;

    #[test]
    fn login_and_join_update_the_avatar() {
        let session = Session::new(1, None, None);
        session.observe_client_text(&TextFields::parse("requestedName|Guest\nprotocol|1\n"));
        session.observe_client_text(&TextFields::parse("tankIDName|someone\nrequestedName|Guest\n"));
        session.observe_client_text(&TextFields::parse("action|join_request\nname|START\ninvitedWorld|0"));
        let avatar = session.snapshot().avatar;
        assert_eq!(avatar.name, "someone");
        assert_eq!(avatar.world_name, "START");
    }

    #[test]
    fn state_packets_move_the_avatar() {
        let session = Session::new(1, None, None);
        let mut packet = GameUpdatePacket::new(PacketType::State);
        {
            let mut movement = packet.movement_mut().unwrap();
            movement.set_net_id(12);
            movement.set_pos_x(64.5);
            movement.set_pos_y(-8.0);
        }
        session.observe_client_packet(&packet);
        let avatar = session.snapshot().avatar;
        assert_eq!(avatar.net_id, 12);
        assert_eq!(avatar.pos, (64.5, -8.0));

        // other packet types leave it alone
        session.observe_client_packet(&GameUpdatePacket::new(PacketType::PingReply));
        assert_eq!(session.snapshot().avatar.net_id, 12);
    }

    #[test]
    fn character_state_is_kept_verbatim() {
        let session = Session::new(1, None, None);
        let mut packet = GameUpdatePacket::new(PacketType::SetCharacterState);
        packet.set_flags(PacketFlags::ROTATE_LEFT);
        packet.character_state_mut().unwrap().set_punch_id(9);
        session.observe_server_packet(&packet);
        assert_eq!(session.snapshot().avatar.character, packet);

        session.observe_server_packet(&GameUpdatePacket::new(PacketType::Npc));
        assert_eq!(session.snapshot().avatar.character, packet);
    }

    #[test]
    fn set_character_replaces_the_record() {
        let session = Session::new(1, None, None);
        let mut packet = GameUpdatePacket::new(PacketType::SetCharacterState);
        packet.character_state_mut().unwrap().set_punch_id(42);
        session.set_character(packet);
        assert_eq!(session.snapshot().avatar.character.character_state().unwrap().punch_id(), 42);
    }
}
