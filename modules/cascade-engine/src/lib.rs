//! Action dispatch engine.
//!
//! Provides a synchronous drain loop: pop → apply resolver chain → repeat
//! until the stack is empty. Resolvers may schedule more actions while they
//! run, either next in line (`push`) or after everything already queued
//! (`unshift`).
//!
//! Consumers define their domain by registering resolvers: generic callbacks
//! that see every action, callbacks filtered by action type, and handler
//! tables that route each action to a method named after its type.

pub mod action;
pub mod engine;
pub mod error;
pub mod naming;
pub mod resolver;
pub mod stack;
pub mod traits;

pub use action::Action;
pub use engine::{Dispatcher, Engine};
pub use error::{DispatchError, DispatchResult};
pub use naming::method_name;
pub use resolver::{HandlerTable, Resolution, Resolver, ResolverChain};
pub use stack::ActionStack;
pub use traits::State;
