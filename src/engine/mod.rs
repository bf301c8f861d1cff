//! Engine orchestration
//!
//! The public entry point: owns the registry, resolver, coalescer, and the
//! execution facade, wires them together, and runs the lifecycle state
//! machine. Keystrokes come in either as native crossterm events or as
//! already-normalized token strings.

use std::time::Instant;

use crossterm::event::KeyEvent;
use tracing::{debug, warn};

use crate::coalescer::InputCoalescer;
use crate::config::EngineConfig;
use crate::context::EditorContext;
use crate::event::{normalize_key_event, KeystrokeEvent};
use crate::registry::{Command, CommandRegistry};
use crate::resolver::{Outcome, SequenceResolver};

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Created,
    Initialized,
    Running,
    Stopped,
    Destroyed,
}

/// Point-in-time dispatch counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Commands currently registered
    pub commands: usize,
    /// Keystroke sequences dispatched to a command
    pub keystrokes: u64,
    /// Invalid sequences seen (including staleness resets)
    pub errors: u64,
}

/// What a single keystroke did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Engine not running (or the native event carried no token)
    Ignored,
    /// Sequence still accumulating
    Pending,
    /// Dead-end sequence; pending state was reset
    Invalid,
    /// The named command executed
    Executed(String),
    /// A command matched but was mode-ineligible or declined to run
    Rejected(String),
}

/// Top-level keystroke dispatch engine
///
/// Each engine owns its tables outright, so independent instances coexist
/// freely (one per buffer, one per test).
#[derive(Debug)]
pub struct Engine {
    state: LifecycleState,
    config: EngineConfig,
    registry: CommandRegistry,
    resolver: SequenceResolver,
    coalescer: InputCoalescer,
    /// Released on destroy; present in every other state
    context: Option<EditorContext>,
    keystrokes: u64,
    errors: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let config = config.clamped();
        let mut resolver = SequenceResolver::new();
        resolver.set_staleness_window(config.staleness_ms);
        Self {
            state: LifecycleState::Created,
            coalescer: InputCoalescer::new(config.debounce_ms),
            config,
            registry: CommandRegistry::new(),
            resolver,
            context: None,
            keystrokes: 0,
            errors: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create the execution facade and initialize registered commands
    ///
    /// Idempotent; a no-op in every state but Created.
    pub fn initialize(&mut self) {
        if self.state != LifecycleState::Created {
            return;
        }
        debug!("initializing engine");
        self.context = Some(EditorContext::new());
        self.initialize_commands();
        self.state = LifecycleState::Initialized;
    }

    /// Begin processing keystrokes; initializes first if needed
    pub fn start(&mut self) {
        match self.state {
            LifecycleState::Created => {
                self.initialize();
                self.state = LifecycleState::Running;
            }
            LifecycleState::Initialized | LifecycleState::Stopped => {
                self.state = LifecycleState::Running;
            }
            LifecycleState::Running | LifecycleState::Destroyed => {}
        }
        if self.state == LifecycleState::Running {
            self.coalescer.start();
            debug!("engine running");
        }
    }

    /// Suspend dispatch; pending coalescer timers survive
    pub fn stop(&mut self) {
        if self.state == LifecycleState::Running {
            self.state = LifecycleState::Stopped;
            self.coalescer.stop();
            debug!("engine stopped");
        }
    }

    /// Tear down from any state: release the facade, clear both tables,
    /// destroy the coalescer. Idempotent.
    pub fn destroy(&mut self) {
        if self.state == LifecycleState::Destroyed {
            return;
        }
        debug!("destroying engine");
        self.registry.clear();
        self.resolver.reset();
        self.resolver.unregister_all();
        self.coalescer.destroy();
        self.context = None;
        self.state = LifecycleState::Destroyed;
    }

    /// Register a command and index its patterns for matching
    ///
    /// Pattern conflicts resolve last-writer-wins; pre-check with
    /// `registry().is_pattern_available` to detect them. Commands added
    /// after initialization are initialized on the spot.
    pub fn register_command(&mut self, command: Box<dyn Command>) {
        if self.state == LifecycleState::Destroyed {
            return;
        }
        let name = command.name().to_string();
        let patterns = command.patterns();

        // A replaced command's old patterns must leave the resolver too
        if self.registry.has_command(&name) {
            self.resolver.unregister_command(&name);
        }
        self.registry.register(command);
        for pattern in &patterns {
            self.resolver.register_pattern(pattern, &name);
        }

        if self.state != LifecycleState::Created {
            if let (Some(cmd), Some(ctx)) = (self.registry.get_mut(&name), self.context.as_mut()) {
                if let Err(e) = cmd.initialize(ctx) {
                    warn!(command = %name, "command initialization failed: {}", e);
                    self.errors += 1;
                }
            }
        }
    }

    /// Remove a command and its patterns from both tables; idempotent
    pub fn unregister_command(&mut self, name: &str) -> bool {
        let removed = self.registry.unregister(name);
        if removed {
            self.resolver.unregister_command(name);
        }
        removed
    }

    /// Remove whichever command owns the given pattern
    pub fn unregister_pattern(&mut self, pattern: &str) -> bool {
        match self.registry.get_by_pattern(pattern) {
            Some(command) => {
                let name = command.name().to_string();
                self.unregister_command(&name)
            }
            None => false,
        }
    }

    /// Normalize a native key event and dispatch it
    pub fn handle_key_event(&mut self, key: KeyEvent) -> anyhow::Result<Dispatch> {
        match normalize_key_event(key) {
            Some(event) => self.dispatch(event),
            None => Ok(Dispatch::Ignored),
        }
    }

    /// Dispatch an already-normalized token
    pub fn handle_keystroke(&mut self, token: &str) -> anyhow::Result<Dispatch> {
        self.dispatch(KeystrokeEvent::new(token))
    }

    /// Dispatch with the event's own timestamp as the clock (replay, tests)
    pub fn dispatch(&mut self, event: KeystrokeEvent) -> anyhow::Result<Dispatch> {
        if !self.is_running() {
            return Ok(Dispatch::Ignored);
        }
        let now = event.timestamp;
        let token = event.token.clone();
        self.coalescer.push(event);

        match self.resolver.feed(&token, now) {
            Outcome::Waiting => Ok(Dispatch::Pending),
            Outcome::Invalid => {
                self.errors += 1;
                debug!(token = %token, "invalid sequence");
                Ok(Dispatch::Invalid)
            }
            Outcome::Matched {
                command,
                pattern,
                count,
            } => self.dispatch_matched(&command, &pattern, count),
        }
    }

    fn dispatch_matched(
        &mut self,
        name: &str,
        pattern: &str,
        count: usize,
    ) -> anyhow::Result<Dispatch> {
        let Some(ctx) = self.context.as_mut() else {
            return Ok(Dispatch::Ignored);
        };
        let Some(cmd) = self.registry.get_mut(name) else {
            // Resolver and registry drifted apart; treat as a dead end
            warn!(command = %name, "matched pattern has no registered command");
            self.errors += 1;
            return Ok(Dispatch::Invalid);
        };

        ctx.set_count(count);
        ctx.set_current_pattern(pattern);

        let mode = ctx.mode();
        if !cmd.modes().contains(&mode) || !cmd.can_execute(ctx) {
            // Inert by design, not an error
            debug!(command = %name, mode = mode.as_str(), "dispatch rejected");
            return Ok(Dispatch::Rejected(name.to_string()));
        }

        debug!(command = %name, pattern = %pattern, count, "executing command");
        // Command faults propagate to the caller; nothing here catches them
        cmd.execute(ctx)?;
        self.keystrokes += 1;
        Ok(Dispatch::Executed(name.to_string()))
    }

    /// Drive time-based behavior: the coalescer's settle deadline and the
    /// resolver's staleness guard
    pub fn tick(&mut self, now: Instant) {
        if self.state == LifecycleState::Destroyed {
            return;
        }
        self.coalescer.tick(now);
        if self.resolver.expire_stale(now) {
            self.errors += 1;
        }
    }

    /// Point-in-time copy of the dispatch counters
    pub fn stats(&self) -> Stats {
        Stats {
            commands: self.registry.len(),
            keystrokes: self.keystrokes,
            errors: self.errors,
        }
    }

    pub fn context(&self) -> Option<&EditorContext> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut EditorContext> {
        self.context.as_mut()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    pub fn resolver(&self) -> &SequenceResolver {
        &self.resolver
    }

    pub fn coalescer_mut(&mut self) -> &mut InputCoalescer {
        &mut self.coalescer
    }

    fn initialize_commands(&mut self) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        for name in self.registry.command_names_owned() {
            if let Some(cmd) = self.registry.get_mut(&name) {
                if let Err(e) = cmd.initialize(ctx) {
                    warn!(command = %name, "command initialization failed: {}", e);
                    self.errors += 1;
                }
            }
        }
    }
}
