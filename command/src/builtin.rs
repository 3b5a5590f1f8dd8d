//! The commands every proxy session starts with.
use crate::dialog::{Align, Dialog, Size};
use crate::registry::{Context, RegistrationConflict, Registry};
use ::wire::PacketFlags;

/// The server refuses world names longer than this.
const MAX_WORLD_NAME: usize = 23;

/// Item id of the icon on the client info banner.
const BANNER_ICON: u32 = 5956;

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistrationConflict> {
    registry.register("help", "Displays this help message", help)?;
    registry.register("warp", "Warps you to a world", warp)?;
    registry.register("clientinfo", "Display Client's Information", client_info)?;
    registry.register("pid", "Change your Punch Id", punch_id)?;
    Ok(())
}

fn help(cx: &mut Context<'_>, args: &[&str]) {
    if let Some(name) = args.first() {
        let text = match cx.registry.get(name) {
            Some(command) => command.description().to_owned(),
            None => crate::UNKNOWN_COMMAND.to_owned(),
        };
        cx.effects.send_local_notice(text);
        return
    }
    let names: Vec<String> = cx.registry.iter().map(|c| format!("{}{}", crate::PREFIX, c.name())).collect();
    cx.effects.send_local_notice(format!(">> Commands: {}", names.join(" ")));
}

fn warp(cx: &mut Context<'_>, args: &[&str]) {
    let world = match args.first() {
        Some(world) => *world,
        None => {
            cx.effects.send_local_notice("`4Usage: `$!warp <world name>");
            return
        },
    };
    // World names are case-insensitive on the server.
    if world.eq_ignore_ascii_case("exit") {
        cx.effects.send_local_notice("`4You cannot warp to the exit world.");
        return
    }
    if world.len() > MAX_WORLD_NAME {
        cx.effects.send_local_notice("`4World name too long, try again.");
        return
    }
    cx.effects.send_upstream_text("action|quit_to_exit");
    cx.effects.send_local_notice(format!("Warping to {}...", world));
    cx.effects.send_upstream_text(format!("action|join_request\nname|{}\ninvitedWorld|0", world));
}

fn client_info(cx: &mut Context<'_>, _args: &[&str]) {
    let snapshot = cx.snapshot;
    let avatar = &snapshot.avatar;
    let peer = |addr: Option<::std::net::SocketAddr>| match addr {
        Some(addr) => addr.to_string(),
        None => "-".to_owned(),
    };
    let mut dialog = Dialog::new()
        .default_color('o')
        .label_with_icon(format!("`wgtproxy {}``", env!("CARGO_PKG_VERSION")), BANNER_ICON, Align::Left, Size::Big)
        .spacer(Size::Small)
        .textbox(format!("Current Time: {}", ::chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")))
        .textbox(format!("Name: {}", avatar.name))
        .smalltext(format!(
            " > world: `2{}``, net_id: `2{}``, position: `2({}, {})``",
            avatar.world_name, avatar.net_id, avatar.pos.0, avatar.pos.1,
        ))
        .textbox(format!("session: `w{}``", snapshot.session_id))
        .textbox(format!("downstream: `w{}``", peer(snapshot.downstream)))
        .textbox(format!("upstream: `w{}``", peer(snapshot.upstream)))
        .spacer(Size::Small)
        .textbox("> AvatarData (client):");
    dialog = match avatar.character.character_state() {
        Ok(state) => dialog
            .smalltext(format!(
                "punch_id: `w{}``, ranges -> `w{}``:`w{}``",
                state.punch_id(), state.punch_range(), state.build_range(),
            ))
            .smalltext(format!(
                "flags: `w{}``, effect_flags: `w{}``",
                avatar.character.raw_flags(), state.effect_flags(),
            ))
            .smalltext(format!("acceleration: `w{}``", state.acceleration()))
            .smalltext(format!("speed: `w{}``, water_speed: `w{}``", state.speed(), state.water_speed()))
            .smalltext(format!("punch_strength: `w{}``, gravity: `w{}``", state.punch_strength(), state.gravity()))
            .smalltext(format!("pupil_color: {}", state.pupil_color()))
            .smalltext(format!("eye_shade_color: {}", state.eye_shade_color()))
            .smalltext(format!("eye_color: {}", state.eye_color())),
        Err(e) => dialog.smalltext(format!("`4{}``", e)),
    };
    cx.effects.send_local_dialog(&dialog.end_dialog("", "Cancel", ""));
}

/// Anything that is not a decimal `u8` becomes this.
const PUNCH_ID_FALLBACK: u8 = 0;

fn parse_punch_id(arg: &str) -> u8 {
    arg.parse().unwrap_or_else(|_| {
        ::tracing::debug!(arg, "punch id is not a u8, using {}", PUNCH_ID_FALLBACK);
        PUNCH_ID_FALLBACK
    })
}

fn punch_id(cx: &mut Context<'_>, args: &[&str]) {
    let punch_id = match args.first() {
        Some(arg) => parse_punch_id(arg),
        None => {
            cx.effects.send_local_notice("`4Usage: `$!pid <pid(decimal)>");
            return
        },
    };
    let mut packet = cx.snapshot.avatar.character;
    match packet.character_state_mut() {
        Ok(mut state) => state.set_punch_id(punch_id),
        Err(e) => {
            ::tracing::error!("avatar record is not a character state: {}", e);
            cx.effects.send_local_notice(format!("`4Cannot change punch id: {}", e));
            return
        },
    }
    let mut flags = packet.flags();
    flags.remove(PacketFlags::EXTENDED);
    packet.set_flags(flags);
    packet.set_data_size(0);
    cx.effects.set_character(packet);
    if let Err(e) = cx.effects.send_upstream_binary(packet, &[]) {
        ::tracing::error!("failed to queue punch id change: {}", e);
        return
    }
    cx.effects.send_local_notice(format!("you've changed your punch_id to: `2{}``", punch_id));
}
