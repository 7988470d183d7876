//! Resolver kinds and the registration-ordered chain that applies them.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::action::Action;
use crate::engine::Dispatcher;
use crate::error::{DispatchError, DispatchResult};
use crate::naming::method_name;
use crate::traits::State;

/// What a resolver returns: `Some(state)` to propose a replacement, `None`
/// to leave state alone.
pub type Resolution<S> = anyhow::Result<Option<S>>;

/// Callback that sees every action.
pub type GenericFn<S> = Box<dyn FnMut(&S, &Action, &mut Dispatcher<S>) -> Resolution<S>>;

/// Callback that sees only the payload of the actions routed to it.
pub type PayloadFn<S> = Box<dyn FnMut(&S, &Value, &mut Dispatcher<S>) -> Resolution<S>>;

/// One participant in the chain.
pub enum Resolver<S> {
    /// Invoked for every action.
    Generic(GenericFn<S>),
    /// Invoked only when `action.action_type == name`.
    TypeFiltered { name: String, callback: PayloadFn<S> },
    /// Invoked through the table entry named after the action type.
    MethodDispatch(HandlerTable<S>),
}

impl<S: State> Resolver<S> {
    fn invoke(
        &mut self,
        state: &S,
        action: &Action,
        dispatcher: &mut Dispatcher<S>,
    ) -> DispatchResult<Option<S>> {
        match self {
            Resolver::Generic(callback) => Ok(callback(state, action, dispatcher)?),
            Resolver::TypeFiltered { name, callback } => {
                if action.action_type != *name {
                    return Ok(None);
                }
                let payload = action.payload_or_default();
                Ok(callback(state, &*payload, dispatcher)?)
            }
            Resolver::MethodDispatch(table) => {
                let method = method_name(&action.action_type);
                let Some(callback) = table.methods.get_mut(&method) else {
                    return Err(DispatchError::MissingMethod {
                        handler: table.name.clone(),
                        method,
                        action_type: action.action_type.clone(),
                    });
                };
                let payload = action.payload_or_default();
                Ok(callback(state, &*payload, dispatcher)?)
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Resolver::Generic(_) => "generic",
            Resolver::TypeFiltered { .. } => "type_filtered",
            Resolver::MethodDispatch(_) => "method_dispatch",
        }
    }
}

impl<S> fmt::Debug for Resolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Generic(_) => f.write_str("Generic"),
            Resolver::TypeFiltered { name, .. } => {
                f.debug_struct("TypeFiltered").field("name", name).finish()
            }
            Resolver::MethodDispatch(table) => f.debug_tuple("MethodDispatch").field(table).finish(),
        }
    }
}

/// A named mapping from handler method names to callbacks.
///
/// Entries are keyed by method name (`fetchResources`). [`HandlerTable::action`]
/// accepts the action type instead and derives the key once, up front.
pub struct HandlerTable<S> {
    name: String,
    methods: HashMap<String, PayloadFn<S>>,
}

impl<S> HandlerTable<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    /// Add an entry under a method name.
    pub fn method<F>(mut self, method: impl Into<String>, callback: F) -> Self
    where
        F: FnMut(&S, &Value, &mut Dispatcher<S>) -> Resolution<S> + 'static,
    {
        self.methods.insert(method.into(), Box::new(callback));
        self
    }

    /// Add an entry for an action type, keyed by its derived method name.
    pub fn action<F>(self, action_type: &str, callback: F) -> Self
    where
        F: FnMut(&S, &Value, &mut Dispatcher<S>) -> Resolution<S> + 'static,
    {
        self.method(method_name(action_type), callback)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether an action of this type would find a method.
    pub fn handles(&self, action_type: &str) -> bool {
        self.methods.contains_key(&method_name(action_type))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<S> fmt::Debug for HandlerTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("HandlerTable")
            .field("name", &self.name)
            .field("methods", &methods)
            .finish()
    }
}

/// Resolvers in registration order. Never resorted, never de-duplicated.
pub struct ResolverChain<S> {
    resolvers: Vec<Resolver<S>>,
}

impl<S> Default for ResolverChain<S> {
    fn default() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }
}

impl<S: State> ResolverChain<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resolver: Resolver<S>) {
        self.resolvers.push(resolver);
    }

    pub fn register_generic<F>(&mut self, callback: F)
    where
        F: FnMut(&S, &Action, &mut Dispatcher<S>) -> Resolution<S> + 'static,
    {
        self.register(Resolver::Generic(Box::new(callback)));
    }

    pub fn register_type_filtered<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: FnMut(&S, &Value, &mut Dispatcher<S>) -> Resolution<S> + 'static,
    {
        self.register(Resolver::TypeFiltered {
            name: name.into(),
            callback: Box::new(callback),
        });
    }

    pub fn register_method_dispatch(&mut self, table: HandlerTable<S>) {
        self.register(Resolver::MethodDispatch(table));
    }

    /// Run every resolver against `action`, in order.
    ///
    /// Each resolver is handed the state as it stands when its turn comes, so
    /// a replacement made by an earlier resolver is visible to later ones.
    pub fn apply(&mut self, action: &Action, dispatcher: &mut Dispatcher<S>) -> DispatchResult<()> {
        for (position, resolver) in self.resolvers.iter_mut().enumerate() {
            let current = dispatcher.state().clone();

            let Some(next) = resolver.invoke(&current, action, dispatcher)? else {
                continue;
            };

            if next.is_truthy() && next != current {
                trace!(
                    action_type = %action.action_type,
                    resolver = position,
                    kind = resolver.kind(),
                    "Replacing state"
                );
                dispatcher.set_state(next);
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl<S> fmt::Debug for ResolverChain<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.resolvers).finish()
    }
}
