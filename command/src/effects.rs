use crate::dialog::Dialog;
use ::wire::{EncodeError, GameUpdatePacket};

/// One thing a handler wants done, applied by the relay in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The operator's own command line, shown back to them.
    Echo(String),
    /// A log line for the local player only.
    Notice(String),
    /// Rendered dialog markup for the local player only.
    Dialog(String),
    /// A game message for the server.
    UpstreamText(String),
    /// Replaces the session's copy of the avatar's character state.
    SetCharacter(GameUpdatePacket),
    /// A game-update record for the server, with its encoded message.
    UpstreamPacket { packet: GameUpdatePacket, message: Vec<u8> },
}

/// Ordered effects produced while handling one line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    list: Vec<Effect>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo(&mut self, line: &str) {
        self.list.push(Effect::Echo(line.to_owned()));
    }
    pub fn send_local_notice(&mut self, text: impl Into<String>) {
        self.list.push(Effect::Notice(text.into()));
    }
    pub fn send_local_dialog(&mut self, dialog: &Dialog) {
        self.list.push(Effect::Dialog(dialog.render()));
    }
    /// Overwrite the avatar's character state, so later commands see it.
    pub fn set_character(&mut self, packet: GameUpdatePacket) {
        self.list.push(Effect::SetCharacter(packet));
    }
    pub fn send_upstream_text(&mut self, text: impl Into<String>) {
        self.list.push(Effect::UpstreamText(text.into()));
    }
    /// Queue a record for the server. Rejects an extension that disagrees
    /// with the record's flags or `data_size`.
    pub fn send_upstream_binary(&mut self, packet: GameUpdatePacket, extension: &[u8]) -> Result<(), EncodeError> {
        let message = ::wire::encode_game_packet(&packet, extension)?;
        self.list.push(Effect::UpstreamPacket { packet, message });
        Ok(())
    }

    pub fn as_slice(&self) -> &[Effect] {
        &self.list
    }
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
    pub fn len(&self) -> usize {
        self.list.len()
    }
    pub fn drain(&mut self) -> impl Iterator<Item = Effect> + '_ {
        self.list.drain(..)
    }
}
