use crate::effects::Effects;
use crate::snapshot::Snapshot;
use ::core::fmt;

/// What a handler gets to work with for one invocation.
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub snapshot: &'a Snapshot,
    pub effects: &'a mut Effects,
}

/// Receives the arguments after the command name.
pub type Handler = fn(&mut Context<'_>, &[&str]);

#[derive(Debug)]
pub struct Command {
    name: String,
    description: String,
    handler: Handler,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn handler(&self) -> Handler {
        self.handler
    }
}

/// A second registration under a name already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConflict {
    pub name: String,
}

impl fmt::Display for RegistrationConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command `{}` is already registered", self.name)
    }
}

impl ::std::error::Error for RegistrationConflict {}

/// Commands in registration order. Only grows, and only before it is shared.
#[derive(Debug, Default)]
pub struct Registry {
    commands: Vec<Command>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `help`, `warp`, `clientinfo` and `pid`.
    pub fn with_builtins() -> Result<Self, RegistrationConflict> {
        let mut registry = Self::new();
        crate::builtin::register(&mut registry)?;
        Ok(registry)
    }

    /// Names are stored lower-cased.
    pub fn register(&mut self, name: &str, description: &str, handler: Handler) -> Result<(), RegistrationConflict> {
        let name = name.to_lowercase();
        if self.commands.iter().any(|c| c.name == name) {
            return Err(RegistrationConflict { name })
        }
        self.commands.push(Command { name, description: description.to_owned(), handler });
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&Command> {
        let name = name.to_lowercase();
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Context<'_>, _: &[&str]) {}

    #[test]
    fn names_are_lowercased_and_unique() {
        let mut registry = Registry::new();
        registry.register("Ping", "pong", noop).unwrap();
        assert_eq!(registry.iter().map(Command::name).collect::<Vec<_>>(), ["ping"]);
        assert_eq!(
            registry.register("PING", "again", noop),
            Err(RegistrationConflict { name: "ping".to_owned() }),
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("pInG").map(Command::description), Some("pong"));
    }

    #[test]
    fn builtins_in_registration_order() {
        let registry = Registry::with_builtins().unwrap();
        let names: Vec<_> = registry.iter().map(Command::name).collect();
        assert_eq!(names, ["help", "warp", "clientinfo", "pid"]);
    }
}
