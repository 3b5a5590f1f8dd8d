//! What happens to a single message on its way through the proxy.
use crate::session::Session;
use ::command::{Dispatcher, Effect, Effects, Registry};
use ::std::sync::Arc;
use ::wire::text::TextFields;
use ::wire::{MessageCategory, PacketType, WireMessage};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}
impl Side {
    pub fn name(&self) -> &'static str {
        match self {
            Side::Server => "server",
            Side::Client => "client",
        }
    }
}

/// Where an outgoing message is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// To the game client.
    Downstream(Vec<u8>),
    /// To the game server.
    Upstream(Vec<u8>),
}

fn log_line(text: &str) -> Vec<u8> {
    ::wire::encode_text(MessageCategory::GameMessage, &format!("action|log\nmsg|{}", text))
}

/// Processes the messages arriving from one side of a session, one at a time.
pub struct Relay<'r> {
    side: Side,
    session: Arc<Session>,
    /// Only messages from the client are checked for commands.
    dispatcher: Option<Dispatcher<'r>>,
}

impl<'r> Relay<'r> {
    pub fn client(session: Arc<Session>, registry: &'r Registry) -> Self {
        Self { side: Side::Client, session, dispatcher: Some(Dispatcher::new(registry)) }
    }

    pub fn server(session: Arc<Session>) -> Self {
        Self { side: Side::Server, session, dispatcher: None }
    }

    fn forward(&self, buf: Vec<u8>) -> Route {
        match self.side {
            Side::Client => Route::Upstream(buf),
            Side::Server => Route::Downstream(buf),
        }
    }

    /// Classify `buf` and decide what gets sent where in its place.
    /// Malformed messages produce nothing.
    pub fn process(&mut self, buf: Vec<u8>) -> Vec<Route> {
        let msg = match ::wire::try_classify(&buf) {
            Ok(msg) => msg,
            Err(e) => {
                ::tracing::warn!("{}: dropping message: {}", self.side.name(), e);
                return Vec::new()
            },
        };
        ::tracing::debug!(
            "{}: {} ({} byte payload)",
            self.side.name(), msg.label(), msg.payload.len(),
        );
        if msg.category == MessageCategory::GamePacket {
            return self.process_game_packet(msg).into_iter().collect()
        }
        if msg.category.is_text() && self.side == Side::Client {
            if let Some(routes) = self.intercept(msg) {
                return routes
            }
        }
        vec![self.forward(buf)]
    }

    /// `Some` when a command line swallowed the message.
    fn intercept(&mut self, msg: WireMessage<'_>) -> Option<Vec<Route>> {
        let text = msg.text();
        let fields = TextFields::parse(&text);
        self.session.observe_client_text(&fields);
        let line = fields.chat_input()?;
        let dispatcher = self.dispatcher.as_mut()?;
        let snapshot = self.session.snapshot();
        let mut effects = Effects::new();
        if !dispatcher.try_handle(line, &snapshot, &mut effects) {
            return None
        }
        Some(effects.drain().filter_map(|effect| self.apply(effect)).collect())
    }

    /// Carry out one handler effect. State changes are applied to the session
    /// right away, so they land before anything queued after them is sent.
    fn apply(&self, effect: Effect) -> Option<Route> {
        let route = match effect {
            Effect::Echo(line) => Route::Downstream(log_line(&format!("`6{}``", line))),
            Effect::Notice(text) => Route::Downstream(log_line(&text)),
            Effect::Dialog(markup) => Route::Downstream(::wire::encode_text(MessageCategory::GenericText, &markup)),
            Effect::SetCharacter(packet) => {
                self.session.set_character(packet);
                return None
            },
            Effect::UpstreamText(text) => {
                // injected directives count as the client's own, e.g. a join_request
                self.session.observe_client_text(&TextFields::parse(&text));
                Route::Upstream(::wire::encode_text(MessageCategory::GameMessage, &text))
            },
            Effect::UpstreamPacket { message, .. } => Route::Upstream(message),
        };
        Some(route)
    }

    fn process_game_packet(&mut self, msg: WireMessage<'_>) -> Option<Route> {
        let (packet, extension) = match msg.game_packet() {
            Ok(decoded) => decoded,
            Err(e) => {
                ::tracing::warn!("{}: dropping game packet: {}", self.side.name(), e);
                return None
            },
        };
        ::tracing::debug!(
            "{}: {:?} packet{}",
            self.side.name(),
            PacketType::saturating_from_raw(packet.raw_packet_type()),
            if extension.is_some() { " (extended)" } else { "" },
        );
        match self.side {
            Side::Client => self.session.observe_client_packet(&packet),
            Side::Server => self.session.observe_server_packet(&packet),
        }
        match ::wire::encode_game_packet(&packet, extension.unwrap_or(&[])) {
            Ok(buf) => Some(self.forward(buf)),
            Err(e) => {
                ::tracing::error!("{}: failed to re-encode game packet: {}", self.side.name(), e);
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::wire::{encode_game_packet, encode_text, GameUpdatePacket, PacketFlags, HEADER_LEN, RECORD_LEN};

    fn chat(line: &str) -> Vec<u8> {
        encode_text(MessageCategory::GenericText, &format!("action|input\n|text|{}", line))
    }

    fn downstream_text(route: &Route) -> String {
        match route {
            Route::Downstream(buf) => ::wire::classify(buf).text().into_owned(),
            other => panic!("expected a downstream message, got {:?}", other),
        }
    }

    fn upstream_text(route: &Route) -> String {
        match route {
            Route::Upstream(buf) => ::wire::classify(buf).text().into_owned(),
            other => panic!("expected an upstream message, got {:?}", other),
        }
    }

    fn client_relay(registry: &Registry) -> (Arc<Session>, Relay<'_>) {
        let session = Arc::new(Session::new(1, None, None));
        (session.clone(), Relay::client(session, registry))
    }

    #[test]
    fn plain_chat_is_relayed_unchanged() {
        let registry = Registry::with_builtins().unwrap();
        let (_, mut relay) = client_relay(&registry);
        let buf = chat("hello world");
        assert_eq!(relay.process(buf.clone()), [Route::Upstream(buf)]);
    }

    #[test]
    fn warp_becomes_local_notices_and_server_directives() {
        let registry = Registry::with_builtins().unwrap();
        let (_, mut relay) = client_relay(&registry);
        let routes = relay.process(chat("!warp myworld"));
        assert_eq!(routes.len(), 4);
        assert_eq!(downstream_text(&routes[0]), "action|log\nmsg|`6!warp myworld``");
        assert_eq!(upstream_text(&routes[1]), "action|quit_to_exit");
        assert_eq!(downstream_text(&routes[2]), "action|log\nmsg|Warping to myworld...");
        assert_eq!(upstream_text(&routes[3]), "action|join_request\nname|myworld\ninvitedWorld|0");
        match &routes[1] {
            Route::Upstream(buf) => assert_eq!(buf[0], MessageCategory::GameMessage.raw()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn dialogs_go_to_the_client_as_generic_text() {
        let registry = Registry::with_builtins().unwrap();
        let (_, mut relay) = client_relay(&registry);
        let routes = relay.process(chat("!clientinfo"));
        assert_eq!(routes.len(), 2);
        match &routes[1] {
            Route::Downstream(buf) => {
                let msg = ::wire::classify(buf);
                assert_eq!(msg.category, MessageCategory::GenericText);
                assert!(msg.text().starts_with("set_default_color|`o"));
            },
            other => panic!("expected a dialog, got {:?}", other),
        }
    }

    #[test]
    fn server_character_state_feeds_pid() {
        let registry = Registry::with_builtins().unwrap();
        let (session, mut from_client) = client_relay(&registry);
        let mut from_server = Relay::server(session);

        let mut state = GameUpdatePacket::new(PacketType::SetCharacterState);
        state.character_state_mut().unwrap().set_punch_range(128);
        let buf = encode_game_packet(&state, &[]).unwrap();
        assert_eq!(from_server.process(buf.clone()), [Route::Downstream(buf)]);

        let routes = from_client.process(chat("!pid 200"));
        assert_eq!(routes.len(), 3);
        let mut expected = state;
        expected.character_state_mut().unwrap().set_punch_id(200);
        assert_eq!(routes[1], Route::Upstream(encode_game_packet(&expected, &[]).unwrap()));
        assert!(downstream_text(&routes[2]).contains("200"));
    }

    #[test]
    fn pid_updates_the_avatar_for_later_commands() {
        let registry = Registry::with_builtins().unwrap();
        let (session, mut from_client) = client_relay(&registry);
        let mut from_server = Relay::server(session.clone());

        let mut state = GameUpdatePacket::new(PacketType::SetCharacterState);
        state.character_state_mut().unwrap().set_punch_id(3);
        from_server.process(encode_game_packet(&state, &[]).unwrap());

        assert_eq!(from_client.process(chat("!pid 200")).len(), 3);
        assert_eq!(session.snapshot().avatar.character.character_state().unwrap().punch_id(), 200);

        let routes = from_client.process(chat("!clientinfo"));
        assert!(downstream_text(&routes[1]).contains("punch_id: `w200``"));

        // the next rewrite starts from the updated record
        let routes = from_client.process(chat("!pid 7"));
        let mut expected = state;
        expected.character_state_mut().unwrap().set_punch_id(7);
        assert_eq!(routes[1], Route::Upstream(encode_game_packet(&expected, &[]).unwrap()));
    }

    #[test]
    fn warp_moves_the_avatar_to_the_new_world() {
        let registry = Registry::with_builtins().unwrap();
        let (session, mut relay) = client_relay(&registry);
        session.observe_client_text(&TextFields::parse("action|join_request\nname|START\ninvitedWorld|0"));
        relay.process(chat("!warp myworld"));
        assert_eq!(session.snapshot().avatar.world_name, "myworld");

        let routes = relay.process(chat("!clientinfo"));
        assert!(downstream_text(&routes[1]).contains("world: `2myworld``"));

        // a refused warp leaves it alone
        relay.process(chat("!warp exit"));
        assert_eq!(session.snapshot().avatar.world_name, "myworld");
    }

    #[test]
    fn short_messages_are_dropped() {
        let registry = Registry::with_builtins().unwrap();
        let (session, mut relay) = client_relay(&registry);
        assert!(relay.process(vec![1, 0, 0]).is_empty());
        assert!(Relay::server(session).process(Vec::new()).is_empty());
    }

    #[test]
    fn malformed_game_packets_are_dropped() {
        let registry = Registry::with_builtins().unwrap();
        let (_, mut relay) = client_relay(&registry);

        let mut buf = encode_game_packet(&GameUpdatePacket::new(PacketType::State), &[]).unwrap();
        buf.truncate(HEADER_LEN + RECORD_LEN - 1);
        assert!(relay.process(buf).is_empty());

        let mut packet = GameUpdatePacket::new(PacketType::CallFunction);
        packet.set_flags(PacketFlags::EXTENDED);
        packet.set_data_size(8);
        let mut buf = encode_game_packet(&packet, &[7; 8]).unwrap();
        buf.pop();
        assert!(relay.process(buf).is_empty());
    }

    #[test]
    fn game_packets_are_reencoded_without_padding() {
        let registry = Registry::with_builtins().unwrap();
        let (session, mut relay) = client_relay(&registry);
        let mut packet = GameUpdatePacket::new(PacketType::State);
        packet.movement_mut().unwrap().set_pos_x(3.0);
        let clean = encode_game_packet(&packet, &[]).unwrap();
        let mut padded = clean.clone();
        padded.extend_from_slice(&[0; 3]);
        assert_eq!(relay.process(padded), [Route::Upstream(clean)]);
        assert_eq!(session.snapshot().avatar.pos, (3.0, 0.0));
    }

    #[test]
    fn unknown_categories_pass_through() {
        let registry = Registry::with_builtins().unwrap();
        let (_, mut relay) = client_relay(&registry);
        let buf = vec![42, 0, 0, 0, b'!', b'h', 0];
        assert_eq!(relay.process(buf.clone()), [Route::Upstream(buf)]);
    }

    #[test]
    fn server_text_is_never_intercepted() {
        let session = Arc::new(Session::new(1, None, None));
        let mut relay = Relay::server(session);
        let buf = chat("!help");
        assert_eq!(relay.process(buf.clone()), [Route::Downstream(buf)]);
    }
}
