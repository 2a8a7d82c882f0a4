//! Finite state machine for agent behavior
//!
//! States own their data and decide their own transitions. The machine
//! drives the enter/update/exit lifecycle over a caller-owned context.

use std::fmt;

/// A state in the finite state machine.
///
/// Lifecycle: `enter()` once on activation, `update()` every tick while
/// active, `exit()` once when replaced.
pub trait State<Ctx>: fmt::Debug {
    /// State name for debugging and logging
    fn name(&self) -> &'static str;

    /// Called when entering this state
    fn enter(&mut self, _ctx: &mut Ctx) {}

    /// Called each tick while in this state
    fn update(&mut self, ctx: &mut Ctx) -> Transition<Ctx>;

    /// Called when exiting this state
    fn exit(&mut self, _ctx: &mut Ctx) {}
}

/// Decision returned from [`State::update`]
pub enum Transition<Ctx> {
    /// Stay in the current state
    None,
    /// Replace the current state
    To(Box<dyn State<Ctx>>),
}

impl<Ctx> Transition<Ctx> {
    /// Create a transition to a new state
    pub fn to<S: State<Ctx> + 'static>(state: S) -> Self {
        Transition::To(Box::new(state))
    }
}

impl<Ctx> fmt::Debug for Transition<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::None => write!(f, "Transition::None"),
            Transition::To(state) => write!(f, "Transition::To({})", state.name()),
        }
    }
}

/// Owns the active state and runs its lifecycle
pub struct StateMachine<Ctx> {
    current: Box<dyn State<Ctx>>,
    /// Whether enter() has run on the current state
    entered: bool,
}

impl<Ctx> StateMachine<Ctx> {
    /// Create a machine; the initial state is entered on the first update
    pub fn new<S: State<Ctx> + 'static>(initial: S) -> Self {
        Self {
            current: Box::new(initial),
            entered: false,
        }
    }

    /// Run one tick of the current state, applying any transition it returns
    pub fn update(&mut self, ctx: &mut Ctx) {
        if !self.entered {
            self.current.enter(ctx);
            self.entered = true;
        }

        if let Transition::To(next) = self.current.update(ctx) {
            self.swap(ctx, next);
        }
    }

    /// Switch to `state` immediately, outside the normal update flow
    pub fn transition<S: State<Ctx> + 'static>(&mut self, ctx: &mut Ctx, state: S) {
        self.swap(ctx, Box::new(state));
    }

    fn swap(&mut self, ctx: &mut Ctx, mut next: Box<dyn State<Ctx>>) {
        if self.entered {
            self.current.exit(ctx);
        }
        log::debug!("State {} -> {}", self.current.name(), next.name());

        next.enter(ctx);
        self.current = next;
        self.entered = true;
    }

    /// Name of the current state
    #[must_use]
    pub fn current_state_name(&self) -> &'static str {
        self.current.name()
    }

    /// Check if the machine is in the state with the given name
    #[must_use]
    pub fn is_in_state(&self, name: &str) -> bool {
        self.current.name() == name
    }
}

impl<Ctx> fmt::Debug for StateMachine<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current.name())
            .field("entered", &self.entered)
            .finish()
    }
}
