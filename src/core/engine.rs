//! Core Engine struct and the headless simulation loop

use crate::core::Time;
use crate::core::debug::DebugInfo;
use crate::ecs::World;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name shown in logs
    pub title: String,
    /// Simulation ticks per simulated second
    pub tick_rate: u32,
    /// Stop after this many ticks (0 for unlimited)
    pub max_ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("Engine"),
            tick_rate: 50,
            max_ticks: 0,
        }
    }
}

impl EngineConfig {
    /// Create a new config with a title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set ticks per simulated second
    pub fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Set the tick limit
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Game trait that users implement
pub trait Game: 'static {
    /// Called once before the first tick
    fn init(&mut self, engine: &mut EngineContext);

    /// Called every tick for game logic updates
    fn update(&mut self, engine: &mut EngineContext);

    /// Called when the game is shutting down
    fn shutdown(&mut self, _engine: &mut EngineContext) {}
}

/// Context passed to game callbacks
pub struct EngineContext {
    /// Time tracking
    pub time: Time,
    /// ECS world
    pub world: World,
    /// Debug information and stats
    pub debug: DebugInfo,
    /// Should the engine quit
    should_quit: bool,
}

impl EngineContext {
    fn new(tick_rate: u32) -> Self {
        Self {
            time: Time::new(tick_rate),
            world: World::new(),
            debug: DebugInfo::new(),
            should_quit: false,
        }
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Check if engine should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

/// Main engine struct
pub struct Engine<G: Game> {
    config: EngineConfig,
    game: G,
    context: EngineContext,
    initialized: bool,
}

impl<G: Game> Engine<G> {
    /// Create a new engine with the given game
    pub fn new(config: EngineConfig, game: G) -> Self {
        let context = EngineContext::new(config.tick_rate);
        Self {
            config,
            game,
            context,
            initialized: false,
        }
    }

    /// Run the engine until the game quits or the tick limit is hit
    pub fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::init();
        log::info!("Starting engine: {}", self.config.title);

        while self.step() {}

        self.game.shutdown(&mut self.context);
        log::info!(
            "Engine stopped after {} ticks ({:.2}s simulated)",
            self.context.time.tick_count(),
            self.context.time.elapsed_seconds()
        );
        Ok(())
    }

    /// Run a single tick. Returns false once the engine should stop.
    pub fn step(&mut self) -> bool {
        if !self.initialized {
            self.game.init(&mut self.context);
            self.initialized = true;
            log::info!("Engine initialized successfully");
        }

        if self.finished() {
            return false;
        }

        self.context.time.advance();
        self.game.update(&mut self.context);

        !self.finished()
    }

    fn finished(&self) -> bool {
        let limit = self.config.max_ticks;
        self.context.should_quit() || (limit > 0 && self.context.time.tick_count() >= limit)
    }

    /// The game being run
    pub fn game(&self) -> &G {
        &self.game
    }

    /// The engine context
    pub fn context(&self) -> &EngineContext {
        &self.context
    }
}
