//! Command registry
//!
//! Source of truth for which commands exist and which literal patterns they
//! own, independent of how matching itself works. The engine keeps this
//! table and the resolver's pattern table consistent.

use std::collections::HashMap;

use tracing::debug;

use crate::context::{EditorContext, Mode};

/// The capability surface every registered command implements
///
/// This fixed shape is the only thing the dispatcher depends on; the
/// concrete motion or editing algorithm lives entirely behind `execute`.
pub trait Command {
    /// Unique name, used as the registry key
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn description(&self) -> &str {
        ""
    }

    /// Literal keystroke patterns this command owns
    fn patterns(&self) -> Vec<String>;

    /// Modes in which this command may execute
    fn modes(&self) -> Vec<Mode>;

    /// One-time setup against the live context
    fn initialize(&mut self, _ctx: &mut EditorContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Teardown; must not fail
    fn destroy(&mut self) {}

    /// Perform the command against the execution facade
    fn execute(&mut self, ctx: &mut EditorContext) -> anyhow::Result<()>;

    /// Whether the command is willing to run right now
    fn can_execute(&self, _ctx: &EditorContext) -> bool {
        self.is_enabled()
    }

    /// Whether this command considers a pattern well-formed
    fn validate_pattern(&self, pattern: &str) -> bool {
        !pattern.is_empty()
    }

    /// Hook fired synchronously after insertion into the registry
    fn on_register(&mut self) {}

    /// Hook fired synchronously before removal from the registry
    fn on_unregister(&mut self) {}

    fn enable(&mut self);

    fn disable(&mut self);

    fn is_enabled(&self) -> bool;
}

/// A single validation failure for a command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("command name is empty")]
    EmptyName,
    #[error("command declares no patterns")]
    NoPatterns,
    #[error("command declares no modes")]
    NoModes,
}

/// Result of validating a command's declared shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Registered commands, keyed by name, with a pattern ownership index
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
    /// pattern -> owning command name
    pattern_index: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a command's declared shape
    ///
    /// Advisory only: `register` does not enforce this, so hosts wanting
    /// strictness must call it themselves before registering.
    pub fn validate(command: &dyn Command) -> Validation {
        let mut errors = Vec::new();
        if command.name().is_empty() {
            errors.push(ValidationError::EmptyName);
        }
        if command.patterns().is_empty() {
            errors.push(ValidationError::NoPatterns);
        }
        if command.modes().is_empty() {
            errors.push(ValidationError::NoModes);
        }
        Validation {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Insert a command, replacing any existing command of the same name
    ///
    /// Fires `on_unregister` on the replaced command and `on_register` on
    /// the new one, after insertion.
    pub fn register(&mut self, command: Box<dyn Command>) {
        let name = command.name().to_string();
        if let Some(mut old) = self.commands.remove(&name) {
            old.on_unregister();
            self.remove_owned_patterns(&name);
        }

        for pattern in command.patterns() {
            self.pattern_index.insert(pattern, name.clone());
        }
        debug!(command = %name, "registered command");
        self.commands.insert(name.clone(), command);
        if let Some(cmd) = self.commands.get_mut(&name) {
            cmd.on_register();
        }
    }

    /// Remove a command by name; idempotent
    pub fn unregister(&mut self, name: &str) -> bool {
        match self.commands.get_mut(name) {
            Some(command) => {
                command.on_unregister();
                self.commands.remove(name);
                self.remove_owned_patterns(name);
                debug!(command = %name, "unregistered command");
                true
            }
            None => false,
        }
    }

    /// Remove whichever command owns the given pattern
    pub fn unregister_by_pattern(&mut self, pattern: &str) -> bool {
        match self.pattern_index.get(pattern).cloned() {
            Some(name) => self.unregister(&name),
            None => false,
        }
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn has_pattern(&self, pattern: &str) -> bool {
        self.pattern_index.contains_key(pattern)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut dyn Command> {
        match self.commands.get_mut(name) {
            Some(command) => Some(command.as_mut()),
            None => None,
        }
    }

    pub fn get_by_pattern(&self, pattern: &str) -> Option<&dyn Command> {
        let name = self.pattern_index.get(pattern)?;
        self.get(name)
    }

    pub fn commands(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.values().map(|command| command.as_ref())
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    /// Owned copy of the names, for callers that mutate while iterating
    pub fn command_names_owned(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    pub fn all_patterns(&self) -> Vec<&str> {
        self.pattern_index.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every command, firing teardown hooks
    pub fn clear(&mut self) {
        for (_, command) in self.commands.iter_mut() {
            command.on_unregister();
            command.destroy();
        }
        self.commands.clear();
        self.pattern_index.clear();
    }

    /// Is a pattern free to claim, optionally ignoring one command's claim?
    pub fn is_pattern_available(&self, pattern: &str, excluding: Option<&str>) -> bool {
        match self.pattern_index.get(pattern) {
            Some(owner) => excluding == Some(owner.as_str()),
            None => true,
        }
    }

    fn remove_owned_patterns(&mut self, name: &str) {
        self.pattern_index.retain(|_, owner| owner != name);
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("patterns", &self.pattern_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counters shared with a test command so hook firings stay observable
    /// after the command is boxed into the registry
    #[derive(Clone, Default)]
    struct HookProbe {
        registered: Rc<Cell<u32>>,
        unregistered: Rc<Cell<u32>>,
    }

    struct TestCommand {
        name: String,
        patterns: Vec<String>,
        modes: Vec<Mode>,
        enabled: bool,
        probe: HookProbe,
    }

    impl TestCommand {
        fn new(name: &str, patterns: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                patterns: patterns.iter().map(|p| p.to_string()).collect(),
                modes: vec![Mode::Normal],
                enabled: true,
                probe: HookProbe::default(),
            }
        }

        fn with_probe(mut self, probe: HookProbe) -> Self {
            self.probe = probe;
            self
        }
    }

    impl Command for TestCommand {
        fn name(&self) -> &str {
            &self.name
        }

        fn patterns(&self) -> Vec<String> {
            self.patterns.clone()
        }

        fn modes(&self) -> Vec<Mode> {
            self.modes.clone()
        }

        fn execute(&mut self, _ctx: &mut EditorContext) -> anyhow::Result<()> {
            Ok(())
        }

        fn on_register(&mut self) {
            self.probe.registered.set(self.probe.registered.get() + 1);
        }

        fn on_unregister(&mut self) {
            self.probe.unregistered.set(self.probe.unregistered.get() + 1);
        }

        fn enable(&mut self) {
            self.enabled = true;
        }

        fn disable(&mut self) {
            self.enabled = false;
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("delete_line", &["dd"])));

        assert!(registry.has_command("delete_line"));
        assert!(registry.has_pattern("dd"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_by_pattern("dd").unwrap().name(), "delete_line");
    }

    #[test]
    fn test_lifecycle_hooks_fire_in_order() {
        let probe = HookProbe::default();
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(
            TestCommand::new("x", &["x"]).with_probe(probe.clone()),
        ));
        assert_eq!(probe.registered.get(), 1);
        assert_eq!(probe.unregistered.get(), 0);

        registry.unregister("x");
        assert_eq!(probe.unregistered.get(), 1);
    }

    #[test]
    fn test_replaced_command_gets_unregister_hook() {
        let old_probe = HookProbe::default();
        let new_probe = HookProbe::default();
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(
            TestCommand::new("goto", &["gg"]).with_probe(old_probe.clone()),
        ));
        registry.register(Box::new(
            TestCommand::new("goto", &["G"]).with_probe(new_probe.clone()),
        ));
        assert_eq!(old_probe.unregistered.get(), 1);
        assert_eq!(new_probe.registered.get(), 1);
    }

    #[test]
    fn test_get_mut_mutates_in_place() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("left", &["h"])));

        let command: &mut dyn Command = registry.get_mut("left").unwrap();
        command.disable();
        assert!(!registry.get("left").unwrap().is_enabled());
        assert!(registry.get_mut("missing").is_none());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("x", &["x"])));
        assert!(registry.unregister("x"));
        assert!(!registry.unregister("x"));
        assert!(!registry.has_pattern("x"));
    }

    #[test]
    fn test_unregister_by_pattern_removes_owner() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("find", &["fa", "fb"])));
        assert!(registry.unregister_by_pattern("fa"));
        // The whole command goes, along with its other patterns
        assert!(!registry.has_command("find"));
        assert!(!registry.has_pattern("fb"));
    }

    #[test]
    fn test_reregister_replaces_and_reindexes() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("goto", &["gg"])));
        registry.register(Box::new(TestCommand::new("goto", &["G"])));

        assert_eq!(registry.len(), 1);
        assert!(!registry.has_pattern("gg"));
        assert!(registry.has_pattern("G"));
    }

    #[test]
    fn test_pattern_availability() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("left", &["h"])));

        assert!(!registry.is_pattern_available("h", None));
        assert!(registry.is_pattern_available("h", Some("left")));
        assert!(!registry.is_pattern_available("h", Some("other")));
        assert!(registry.is_pattern_available("l", None));
    }

    #[test]
    fn test_validate_flags_empty_shape() {
        let command = TestCommand {
            name: String::new(),
            patterns: vec![],
            modes: vec![],
            enabled: true,
            probe: HookProbe::default(),
        };
        let validation = CommandRegistry::validate(&command);
        assert!(!validation.valid);
        assert_eq!(
            validation.errors,
            vec![
                ValidationError::EmptyName,
                ValidationError::NoPatterns,
                ValidationError::NoModes,
            ]
        );
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let command = TestCommand::new("ok", &["x"]);
        let validation = CommandRegistry::validate(&command);
        assert!(validation.valid);
        assert!(validation.errors.is_empty());
    }

    #[test]
    fn test_registration_does_not_enforce_validity() {
        let mut registry = CommandRegistry::new();
        let invalid = TestCommand {
            name: "orphan".to_string(),
            patterns: vec![],
            modes: vec![],
            enabled: true,
            probe: HookProbe::default(),
        };
        registry.register(Box::new(invalid));
        assert!(registry.has_command("orphan"));
    }

    #[test]
    fn test_clear() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(TestCommand::new("a", &["a"])));
        registry.register(Box::new(TestCommand::new("b", &["b"])));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.all_patterns().is_empty());
    }
}
