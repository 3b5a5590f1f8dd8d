use crate::effects::Effects;
use crate::registry::{Context, Registry};
use crate::snapshot::Snapshot;
use ::bumpalo::Bump;

mod bump {
    pub use ::bumpalo::collections::Vec;
}

/// Lines starting with this are commands.
pub const PREFIX: char = '!';

/// Split on ASCII space. Runs of spaces, and leading or trailing spaces,
/// never produce empty tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ').filter(|token| !token.is_empty())
}

// One dispatcher serves one direction of one session, so the arena is never shared.
/// Runs prefixed chat lines against a registry, reusing token storage between lines.
#[derive(Debug)]
pub struct Dispatcher<'r> {
    registry: &'r Registry,
    arena: Bump,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry, arena: Bump::new() }
    }

    /// Returns whether `text` was intercepted. Anything starting with [`PREFIX`]
    /// is intercepted, even when it names no command.
    pub fn try_handle(&mut self, text: &str, snapshot: &Snapshot, effects: &mut Effects) -> bool {
        if !text.starts_with(PREFIX) {
            return false
        }
        self.arena.reset();
        let mut tokens = bump::Vec::new_in(&self.arena);
        tokens.extend(tokenize(text));
        // The first token keeps the prefix, since `text` cannot start with a space.
        let (first, args) = match tokens.split_first() {
            Some(split) => split,
            None => return false,
        };
        let name = first[PREFIX.len_utf8()..].to_lowercase();
        match self.registry.get(&name) {
            Some(command) => {
                ::tracing::info!(command = command.name(), args = args.len(), "running command");
                effects.echo(text);
                let mut cx = Context { registry: self.registry, snapshot, effects };
                (command.handler())(&mut cx, args);
            },
            None => {
                ::tracing::info!(command = %name, "unknown command");
                effects.send_local_notice(crate::UNKNOWN_COMMAND);
            },
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effect;

    fn collect(text: &str) -> Vec<&str> {
        tokenize(text).collect()
    }

    #[test]
    fn tokenize_drops_empty_tokens() {
        assert_eq!(collect("!warp  start"), ["!warp", "start"]);
        assert_eq!(collect("  !pid 5 "), ["!pid", "5"]);
        assert!(collect("").is_empty());
        assert!(collect("   ").is_empty());
        // Only ASCII space separates.
        assert_eq!(collect("a\tb"), ["a\tb"]);
    }

    #[test]
    fn unprefixed_lines_pass_through() {
        let registry = Registry::with_builtins().unwrap();
        let mut dispatcher = Dispatcher::new(&registry);
        let mut effects = Effects::new();
        let snapshot = Snapshot::default();
        assert!(!dispatcher.try_handle("", &snapshot, &mut effects));
        assert!(!dispatcher.try_handle("hello world", &snapshot, &mut effects));
        assert!(!dispatcher.try_handle(" !help", &snapshot, &mut effects));
        assert!(effects.is_empty());
    }

    #[test]
    fn unknown_command_is_still_swallowed() {
        let registry = Registry::with_builtins().unwrap();
        let mut dispatcher = Dispatcher::new(&registry);
        let mut effects = Effects::new();
        assert!(dispatcher.try_handle("!nope a b", &Snapshot::default(), &mut effects));
        assert_eq!(effects.as_slice(), [Effect::Notice(crate::UNKNOWN_COMMAND.to_owned())]);
    }

    #[test]
    fn bare_prefix_is_unknown() {
        let registry = Registry::with_builtins().unwrap();
        let mut dispatcher = Dispatcher::new(&registry);
        let mut effects = Effects::new();
        assert!(dispatcher.try_handle("! help", &Snapshot::default(), &mut effects));
        assert_eq!(effects.as_slice(), [Effect::Notice(crate::UNKNOWN_COMMAND.to_owned())]);
    }

    #[test]
    fn matched_command_echoes_then_runs() {
        fn record(cx: &mut Context<'_>, args: &[&str]) {
            cx.effects.send_local_notice(args.join(","));
        }
        let mut registry = Registry::new();
        registry.register("args", "", record).unwrap();
        let mut dispatcher = Dispatcher::new(&registry);
        let mut effects = Effects::new();
        assert!(dispatcher.try_handle("!ARGS  one two ", &Snapshot::default(), &mut effects));
        assert_eq!(
            effects.as_slice(),
            [Effect::Echo("!ARGS  one two ".to_owned()), Effect::Notice("one,two".to_owned())],
        );

        // The arena is reused for the next line.
        let mut effects = Effects::new();
        assert!(dispatcher.try_handle("!args", &Snapshot::default(), &mut effects));
        assert_eq!(effects.as_slice()[1], Effect::Notice(String::new()));
    }
}
