//! The fixed 60-byte game-update record carried by game-packet messages.
//!
//! The record is stored as raw little-endian bytes. Slots are positionally fixed,
//! but what a slot *means* depends on the packet type in byte 0, so the semantic
//! names live on typed views that refuse to open for the wrong packet type.
//!
//! ```text
//! off  size  generic name
//!   0     1  type
//!   1     1  object_type
//!   2     1  count_1
//!   3     1  count_2
//!   4     4  net_id             (i32)
//!   8     4  item               (i32)
//!  12     4  flags              (u32)
//!  16     4  float_var          (f32)
//!  20     4  int_data           (i32)
//!  24     4  vec_x              (f32)
//!  28     4  vec_y              (f32)
//!  32     4  vec2_x             (f32)
//!  36     4  vec2_y             (f32)
//!  40     4  particle_rotation  (f32)
//!  44     4  int_x              (u32)
//!  48     4  int_y              (u32)
//!  52     4  data_size          (u32)
//!  56     4  data               (u32)
//! ```
use ::core::borrow::{Borrow, BorrowMut};
use ::core::fmt;

/// Size of the fixed region of a [`GameUpdatePacket`].
pub const RECORD_LEN: usize = 60;

const TYPE: usize = 0;
const OBJECT_TYPE: usize = 1;
const COUNT_1: usize = 2;
const COUNT_2: usize = 3;
const NET_ID: usize = 4;
const ITEM: usize = 8;
const FLAGS: usize = 12;
const FLOAT_VAR: usize = 16;
const INT_DATA: usize = 20;
const VEC_X: usize = 24;
const VEC_Y: usize = 28;
const VEC2_X: usize = 32;
const VEC2_Y: usize = 36;
const PARTICLE_ROTATION: usize = 40;
const INT_X: usize = 44;
const INT_Y: usize = 48;
const DATA_SIZE: usize = 52;
const DATA: usize = 56;

::bitflags::bitflags! {
    /// Independent modifiers carried in the record's flags slot.
    pub struct PacketFlags: u32 {
        /// A `data_size`-byte extension follows the fixed record.
        const EXTENDED = 1 << 3;
        const ROTATE_LEFT = 1 << 4;
        const ROTATE_RIGHT = 1 << 5;
        const LAVA_HIT = 1 << 6;
        const JUMP = 1 << 7;
    }
}

/// The discriminant in byte 0 of a game-update record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    State = 0,
    CallFunction = 1,
    UpdateStatus = 2,
    TileChangeRequest = 3,
    SendMapData = 4,
    SendTileUpdateData = 5,
    SendTileUpdateDataMultiple = 6,
    TileActivateRequest = 7,
    TileApplyDamage = 8,
    SendInventoryState = 9,
    ItemActivateRequest = 10,
    ItemActivateObjectRequest = 11,
    SendTileTreeState = 12,
    ModifyItemInventory = 13,
    ItemChangeObject = 14,
    SendLock = 15,
    SendItemDatabaseData = 16,
    SendParticleEffect = 17,
    SetIconState = 18,
    ItemEffect = 19,
    SetCharacterState = 20,
    PingReply = 21,
    PingRequest = 22,
    GotPunched = 23,
    AppCheckResponse = 24,
    AppIntegrityFail = 25,
    Disconnect = 26,
    BattleJoin = 27,
    BattleEvent = 28,
    UseDoor = 29,
    SendParental = 30,
    GoneFishin = 31,
    Steam = 32,
    PetBattle = 33,
    Npc = 34,
    Special = 35,
    SendParticleEffectV2 = 36,
    ActiveArrowToItem = 37,
    SelectTileIndex = 38,
    SendPlayerTributeData = 39,
    PveUnk1 = 40,
    PveUnk2 = 41,
    PveUnk3 = 42,
    PveUnk4 = 43,
    PveUnk5 = 44,
    SetExtraMods = 45,
    OnStepOnTileMod = 46,
}

impl PacketType {
    /// Every known packet type, indexed by its discriminant.
    pub const ALL: [PacketType; 47] = {
        use PacketType::*;
        [
            State, CallFunction, UpdateStatus, TileChangeRequest, SendMapData,
            SendTileUpdateData, SendTileUpdateDataMultiple, TileActivateRequest,
            TileApplyDamage, SendInventoryState, ItemActivateRequest,
            ItemActivateObjectRequest, SendTileTreeState, ModifyItemInventory,
            ItemChangeObject, SendLock, SendItemDatabaseData, SendParticleEffect,
            SetIconState, ItemEffect, SetCharacterState, PingReply, PingRequest,
            GotPunched, AppCheckResponse, AppIntegrityFail, Disconnect, BattleJoin,
            BattleEvent, UseDoor, SendParental, GoneFishin, Steam, PetBattle, Npc,
            Special, SendParticleEffectV2, ActiveArrowToItem, SelectTileIndex,
            SendPlayerTributeData, PveUnk1, PveUnk2, PveUnk3, PveUnk4, PveUnk5,
            SetExtraMods, OnStepOnTileMod,
        ]
    };

    /// `None` for anything past the last known discriminant.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    /// Out-of-range values saturate to the last known type.
    /// Only meant for log output; never branch on the result.
    pub fn saturating_from_raw(raw: u8) -> Self {
        Self::ALL[(raw as usize).min(Self::ALL.len() - 1)]
    }
}

/// Fixed-width values that can live in a record slot.
trait Slot: Sized {
    const WIDTH: usize;
    fn read(bytes: &[u8]) -> Self;
    fn write(self, bytes: &mut [u8]);
}

impl Slot for u8 {
    const WIDTH: usize = 1;
    fn read(bytes: &[u8]) -> Self { bytes[0] }
    fn write(self, bytes: &mut [u8]) { bytes[0] = self }
}

macro_rules! le_slot {
    ($($ty:ty),*) => {$(
        impl Slot for $ty {
            const WIDTH: usize = 4;
            fn read(bytes: &[u8]) -> Self {
                let mut buf = [0; 4];
                buf.copy_from_slice(&bytes[..4]);
                <$ty>::from_le_bytes(buf)
            }
            fn write(self, bytes: &mut [u8]) {
                bytes[..4].copy_from_slice(&self.to_le_bytes())
            }
        }
    )*};
}
le_slot!(u32, i32, f32);

/// One game action or event, as a fixed byte buffer.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct GameUpdatePacket {
    bytes: [u8; RECORD_LEN],
}

impl Default for GameUpdatePacket {
    fn default() -> Self {
        Self { bytes: [0; RECORD_LEN] }
    }
}

impl GameUpdatePacket {
    /// A zeroed record of the given type.
    pub fn new(packet_type: PacketType) -> Self {
        let mut packet = Self::default();
        packet.set_packet_type(packet_type);
        packet
    }
    pub fn from_bytes(bytes: [u8; RECORD_LEN]) -> Self {
        Self { bytes }
    }
    pub fn as_bytes(&self) -> &[u8; RECORD_LEN] {
        &self.bytes
    }

    fn get<S: Slot>(&self, offset: usize) -> S {
        S::read(&self.bytes[offset..offset + S::WIDTH])
    }
    fn put<S: Slot>(&mut self, offset: usize, value: S) {
        value.write(&mut self.bytes[offset..offset + S::WIDTH])
    }

    pub fn raw_packet_type(&self) -> u8 {
        self.bytes[TYPE]
    }
    /// `None` when byte 0 holds a value past the known packet types.
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_raw(self.raw_packet_type())
    }
    pub fn set_packet_type(&mut self, packet_type: PacketType) {
        self.bytes[TYPE] = packet_type as u8;
    }

    /// The known flags. Unknown bits stay in [`raw_flags`](Self::raw_flags).
    pub fn flags(&self) -> PacketFlags {
        PacketFlags::from_bits_truncate(self.raw_flags())
    }
    pub fn raw_flags(&self) -> u32 {
        self.get(FLAGS)
    }
    pub fn set_raw_flags(&mut self, flags: u32) {
        self.put(FLAGS, flags)
    }
    /// Replace the known flag bits, leaving unknown bits untouched.
    pub fn set_flags(&mut self, flags: PacketFlags) {
        let unknown = self.raw_flags() & !PacketFlags::all().bits();
        self.set_raw_flags(unknown | flags.bits());
    }
    pub fn is_extended(&self) -> bool {
        self.flags().contains(PacketFlags::EXTENDED)
    }
}

macro_rules! raw_slots {
    ($($get:ident, $set:ident: $ty:ty = $offset:expr;)*) => {
        /// Positional slots under their generic names.
        /// These read whatever is stored, regardless of packet type.
        impl GameUpdatePacket {
            $(
                pub fn $get(&self) -> $ty { self.get($offset) }
                pub fn $set(&mut self, value: $ty) { self.put($offset, value) }
            )*
        }
    };
}

raw_slots! {
    object_type, set_object_type: u8 = OBJECT_TYPE;
    count_1, set_count_1: u8 = COUNT_1;
    count_2, set_count_2: u8 = COUNT_2;
    net_id, set_net_id: i32 = NET_ID;
    item, set_item: i32 = ITEM;
    float_var, set_float_var: f32 = FLOAT_VAR;
    int_data, set_int_data: i32 = INT_DATA;
    vec_x, set_vec_x: f32 = VEC_X;
    vec_y, set_vec_y: f32 = VEC_Y;
    vec2_x, set_vec2_x: f32 = VEC2_X;
    vec2_y, set_vec2_y: f32 = VEC2_Y;
    particle_rotation, set_particle_rotation: f32 = PARTICLE_ROTATION;
    int_x, set_int_x: u32 = INT_X;
    int_y, set_int_y: u32 = INT_Y;
    data_size, set_data_size: u32 = DATA_SIZE;
    data, set_data: u32 = DATA;
}

impl fmt::Debug for GameUpdatePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameUpdatePacket")
            .field("type", &PacketType::saturating_from_raw(self.raw_packet_type()))
            .field("raw_type", &self.raw_packet_type())
            .field("object_type", &self.object_type())
            .field("count_1", &self.count_1())
            .field("count_2", &self.count_2())
            .field("net_id", &self.net_id())
            .field("item", &self.item())
            .field("flags", &self.flags())
            .field("float_var", &self.float_var())
            .field("int_data", &self.int_data())
            .field("vec", &(self.vec_x(), self.vec_y()))
            .field("vec2", &(self.vec2_x(), self.vec2_y()))
            .field("particle_rotation", &self.particle_rotation())
            .field("int", &(self.int_x(), self.int_y()))
            .field("data_size", &self.data_size())
            .field("data", &self.data())
            .finish()
    }
}

/// Failure to decode a game-update record from a message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than [`RECORD_LEN`] bytes were available.
    TooShortForFixedRecord { got: usize },
    /// `EXTENDED` was set but the payload cannot hold `data_size` more bytes.
    ExtensionTooShort { need: u64, got: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TooShortForFixedRecord { got } => {
                write!(f, "game packet too short: need {} bytes, got {}", RECORD_LEN, got)
            },
            DecodeError::ExtensionTooShort { need, got } => {
                write!(f, "game packet too short for its extension: need {} bytes, got {}", need, got)
            },
        }
    }
}

impl ::std::error::Error for DecodeError {}

/// A caller passed an extension that disagrees with the record's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    ExtensionWithoutFlag { len: usize },
    ExtensionSizeMismatch { declared: u32, actual: usize },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::ExtensionWithoutFlag { len } => {
                write!(f, "{}-byte extension given but EXTENDED is not set", len)
            },
            EncodeError::ExtensionSizeMismatch { declared, actual } => {
                write!(f, "data_size is {} but the extension is {} bytes", declared, actual)
            },
        }
    }
}

impl ::std::error::Error for EncodeError {}

/// Decode a record and, when `EXTENDED` is set, exactly `data_size` bytes of extension.
///
/// Bytes past the record (or past the extension) are ignored.
pub fn decode(payload: &[u8]) -> Result<(GameUpdatePacket, Option<&[u8]>), DecodeError> {
    let fixed = match payload.get(..RECORD_LEN) {
        Some(fixed) => fixed,
        None => return Err(DecodeError::TooShortForFixedRecord { got: payload.len() }),
    };
    let mut bytes = [0; RECORD_LEN];
    bytes.copy_from_slice(fixed);
    let packet = GameUpdatePacket::from_bytes(bytes);
    if !packet.is_extended() {
        return Ok((packet, None))
    }
    let need = RECORD_LEN as u64 + u64::from(packet.data_size());
    if (payload.len() as u64) < need {
        return Err(DecodeError::ExtensionTooShort { need, got: payload.len() })
    }
    // `need` fits in `usize` since it is no larger than `payload.len()`.
    Ok((packet, Some(&payload[RECORD_LEN..need as usize])))
}

/// Append the record, then `extension` when `EXTENDED` is set.
pub fn encode_into(packet: &GameUpdatePacket, extension: &[u8], out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if packet.is_extended() {
        if packet.data_size() as usize != extension.len() {
            return Err(EncodeError::ExtensionSizeMismatch {
                declared: packet.data_size(),
                actual: extension.len(),
            })
        }
    } else if !extension.is_empty() {
        return Err(EncodeError::ExtensionWithoutFlag { len: extension.len() })
    }
    out.reserve(RECORD_LEN + extension.len());
    out.extend_from_slice(packet.as_bytes());
    out.extend_from_slice(extension);
    Ok(())
}

pub fn encode(packet: &GameUpdatePacket, extension: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    encode_into(packet, extension, &mut out)?;
    Ok(out)
}

/// A typed view was opened on a record of the wrong packet type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewError {
    pub view: &'static str,
    pub raw_type: u8,
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match PacketType::from_raw(self.raw_type) {
            Some(t) => write!(f, "{} view does not apply to {:?} packets", self.view, t),
            None => write!(f, "{} view does not apply to unknown packet type {}", self.view, self.raw_type),
        }
    }
}

impl ::std::error::Error for ViewError {}

macro_rules! view {
    (
        $(#[$meta:meta])*
        $view:ident for [$($kind:ident),+] {
            $($get:ident, $set:ident: $ty:ty = $offset:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $view<P>(P);

        impl<P: Borrow<GameUpdatePacket>> $view<P> {
            pub const VALID_FOR: &'static [PacketType] = &[$(PacketType::$kind),+];

            pub fn new(packet: P) -> Result<Self, ViewError> {
                let raw_type = Borrow::<GameUpdatePacket>::borrow(&packet).raw_packet_type();
                match PacketType::from_raw(raw_type) {
                    Some(t) if Self::VALID_FOR.contains(&t) => Ok(Self(packet)),
                    _ => Err(ViewError { view: stringify!($view), raw_type }),
                }
            }
            pub fn packet(&self) -> &GameUpdatePacket {
                Borrow::<GameUpdatePacket>::borrow(&self.0)
            }
            $(pub fn $get(&self) -> $ty { self.packet().get($offset) })*
        }

        impl<P: BorrowMut<GameUpdatePacket>> $view<P> {
            $(pub fn $set(&mut self, value: $ty) {
                BorrowMut::<GameUpdatePacket>::borrow_mut(&mut self.0).put($offset, value)
            })*
        }
    };
}

view! {
    /// The avatar's movement and punch characteristics, sent by the server.
    CharacterState for [SetCharacterState] {
        punch_id, set_punch_id: u8 = OBJECT_TYPE;
        build_range, set_build_range: u8 = COUNT_1;
        punch_range, set_punch_range: u8 = COUNT_2;
        net_id, set_net_id: i32 = NET_ID;
        pupil_color, set_pupil_color: i32 = ITEM;
        water_speed, set_water_speed: f32 = FLOAT_VAR;
        effect_flags, set_effect_flags: i32 = INT_DATA;
        acceleration, set_acceleration: f32 = VEC_X;
        punch_strength, set_punch_strength: f32 = VEC_Y;
        speed, set_speed: f32 = VEC2_X;
        gravity, set_gravity: f32 = VEC2_Y;
        eye_shade_color, set_eye_shade_color: u32 = INT_X;
        eye_color, set_eye_color: u32 = INT_Y;
    }
}

view! {
    /// A player's position update.
    Movement for [State] {
        jump_count, set_jump_count: u8 = COUNT_1;
        animation_type, set_animation_type: u8 = COUNT_2;
        net_id, set_net_id: i32 = NET_ID;
        pos_x, set_pos_x: f32 = VEC_X;
        pos_y, set_pos_y: f32 = VEC_Y;
        velocity_x, set_velocity_x: f32 = VEC2_X;
        velocity_y, set_velocity_y: f32 = VEC2_Y;
        tile_x, set_tile_x: u32 = INT_X;
        tile_y, set_tile_y: u32 = INT_Y;
    }
}

view! {
    Npc for [Npc] {
        npc_type, set_npc_type: u8 = OBJECT_TYPE;
        npc_id, set_npc_id: u8 = COUNT_1;
        npc_action, set_npc_action: u8 = COUNT_2;
        pos_x, set_pos_x: f32 = VEC_X;
        pos_y, set_pos_y: f32 = VEC_Y;
        dest_x, set_dest_x: f32 = VEC2_X;
        dest_y, set_dest_y: f32 = VEC2_Y;
        npc_variable, set_npc_variable: f32 = PARTICLE_ROTATION;
        npc_speed, set_npc_speed: u32 = INT_Y;
    }
}

view! {
    Particle for [SendParticleEffect, SendParticleEffectV2] {
        particle_id, set_particle_id: u8 = COUNT_2;
        emitter_id, set_emitter_id: i32 = NET_ID;
        pos_x, set_pos_x: f32 = VEC_X;
        pos_y, set_pos_y: f32 = VEC_Y;
        particle_variable, set_particle_variable: f32 = VEC2_X;
        particle_alt_id, set_particle_alt_id: f32 = VEC2_Y;
        rotation, set_rotation: f32 = PARTICLE_ROTATION;
        size_alt, set_size_alt: u32 = INT_Y;
    }
}

view! {
    Ping for [PingRequest, PingReply] {
        hash, set_hash: i32 = ITEM;
        elapsed_ms, set_elapsed_ms: i32 = INT_DATA;
    }
}

view! {
    /// A punch or place at a tile.
    TileChange for [TileChangeRequest] {
        net_id, set_net_id: i32 = NET_ID;
        item_id, set_item_id: i32 = ITEM;
        pos_x, set_pos_x: f32 = VEC_X;
        pos_y, set_pos_y: f32 = VEC_Y;
        tile_x, set_tile_x: u32 = INT_X;
        tile_y, set_tile_y: u32 = INT_Y;
    }
}

impl GameUpdatePacket {
    pub fn character_state(&self) -> Result<CharacterState<&Self>, ViewError> {
        CharacterState::new(self)
    }
    pub fn character_state_mut(&mut self) -> Result<CharacterState<&mut Self>, ViewError> {
        CharacterState::new(self)
    }
    pub fn movement(&self) -> Result<Movement<&Self>, ViewError> {
        Movement::new(self)
    }
    pub fn movement_mut(&mut self) -> Result<Movement<&mut Self>, ViewError> {
        Movement::new(self)
    }
    pub fn npc(&self) -> Result<Npc<&Self>, ViewError> {
        Npc::new(self)
    }
    pub fn npc_mut(&mut self) -> Result<Npc<&mut Self>, ViewError> {
        Npc::new(self)
    }
    pub fn particle(&self) -> Result<Particle<&Self>, ViewError> {
        Particle::new(self)
    }
    pub fn particle_mut(&mut self) -> Result<Particle<&mut Self>, ViewError> {
        Particle::new(self)
    }
    pub fn ping(&self) -> Result<Ping<&Self>, ViewError> {
        Ping::new(self)
    }
    pub fn ping_mut(&mut self) -> Result<Ping<&mut Self>, ViewError> {
        Ping::new(self)
    }
    pub fn tile_change(&self) -> Result<TileChange<&Self>, ViewError> {
        TileChange::new(self)
    }
    pub fn tile_change_mut(&mut self) -> Result<TileChange<&mut Self>, ViewError> {
        TileChange::new(self)
    }
}
