//! The drain loop.

use cascade_common::EngineConfig;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::action::Action;
use crate::error::{DispatchError, DispatchResult};
use crate::resolver::{HandlerTable, Resolution, ResolverChain};
use crate::stack::ActionStack;
use crate::traits::State;

/// What resolvers get to touch while they run: the pending stack and the state.
///
/// The engine owns exactly one of these. Resolvers receive it by `&mut` so
/// they can schedule follow-up actions and replace state mid-drain.
#[derive(Debug)]
pub struct Dispatcher<S> {
    stack: ActionStack,
    state: S,
}

impl<S: State> Dispatcher<S> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            stack: ActionStack::new(),
            state,
        }
    }

    /// Schedule an action to run next (before anything already queued).
    pub fn push(&mut self, action: Action) {
        trace!(action_type = %action.action_type, "push");
        self.stack.push(action);
    }

    /// Schedule an action to run after everything already queued.
    pub fn unshift(&mut self, action: Action) {
        trace!(action_type = %action.action_type, "unshift");
        self.stack.unshift(action);
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Replace the state unconditionally.
    pub fn set_state(&mut self, state: S) {
        self.state = state;
    }

    /// Number of actions waiting to be processed.
    pub fn pending(&self) -> usize {
        self.stack.len()
    }
}

/// Synchronous action dispatch engine.
///
/// Owns a resolver chain, a pending-action stack and one state value.
/// `handle` drains the stack; resolvers may keep refilling it.
pub struct Engine<S = Value> {
    resolvers: ResolverChain<S>,
    dispatcher: Dispatcher<S>,
    config: EngineConfig,
}

impl Engine<Value> {
    /// An engine over JSON state, starting from `{}`.
    pub fn new() -> Self {
        Self::with_state(Value::empty())
    }
}

impl Default for Engine<Value> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> Engine<S> {
    pub fn with_state(state: S) -> Self {
        Self {
            resolvers: ResolverChain::new(),
            dispatcher: Dispatcher::new(state),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &S {
        self.dispatcher.state()
    }

    /// Replace the state unconditionally.
    pub fn set_state(&mut self, state: S) {
        self.dispatcher.set_state(state);
    }

    pub fn into_state(self) -> S {
        self.dispatcher.state
    }

    pub fn register_generic<F>(&mut self, callback: F)
    where
        F: FnMut(&S, &Action, &mut Dispatcher<S>) -> Resolution<S> + 'static,
    {
        self.resolvers.register_generic(callback);
    }

    pub fn register_type_filtered<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: FnMut(&S, &Value, &mut Dispatcher<S>) -> Resolution<S> + 'static,
    {
        self.resolvers.register_type_filtered(name, callback);
    }

    pub fn register_method_dispatch(&mut self, table: HandlerTable<S>) {
        self.resolvers.register_method_dispatch(table);
    }

    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }

    pub fn push(&mut self, action: Action) {
        self.dispatcher.push(action);
    }

    pub fn unshift(&mut self, action: Action) {
        self.dispatcher.unshift(action);
    }

    /// Read-only view of the pending actions.
    pub fn stack(&self) -> &ActionStack {
        &self.dispatcher.stack
    }

    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    /// Apply the resolver chain to one action. Anything the resolvers
    /// schedule stays on the stack.
    pub fn call(&mut self, action: &Action) -> DispatchResult<()> {
        trace!(action_type = %action.action_type, "Applying resolver chain");
        self.resolvers.apply(action, &mut self.dispatcher)
    }

    /// Push `action` (if any), then pop and `call` until the stack is empty.
    ///
    /// Errors abort the drain; whatever is still pending stays on the stack.
    pub fn handle(&mut self, action: Option<Action>) -> DispatchResult<()> {
        if let Some(action) = action {
            self.push(action);
        }

        if self.dispatcher.stack.is_empty() {
            return Ok(());
        }

        debug!(pending = self.pending(), "Draining action stack");
        let mut processed = 0usize;

        while !self.dispatcher.stack.is_empty() {
            if let Some(limit) = self.config.max_drain() {
                if processed >= limit {
                    let pending = self.pending();
                    warn!(limit, pending, "Drain limit reached, aborting");
                    return Err(DispatchError::DrainLimitExceeded { limit, pending });
                }
            }

            let Some(action) = self.dispatcher.stack.pop() else {
                break;
            };
            self.call(&action)?;
            processed += 1;
        }

        debug!(processed, "Action stack drained");
        Ok(())
    }
}

impl<S> std::fmt::Debug for Engine<S>
where
    S: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("resolvers", &self.resolvers)
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish()
    }
}
