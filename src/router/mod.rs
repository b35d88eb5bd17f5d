//! Namespace routing.
//!
//! The router maps each served namespace to the handler set that receives its
//! connections and events. Registering the same `Arc` under several
//! namespaces shares one handler set between them.

pub mod handler;
pub mod namespace;

use std::collections::HashMap;
use std::sync::Arc;

pub use handler::{GatewayHandlers, HandlerSet, SocketHandle};
pub use namespace::Namespace;

/// A resolved namespace and its handlers.
#[derive(Clone)]
pub struct Route {
    pub namespace: Namespace,
    pub handlers: Arc<dyn HandlerSet>,
}

#[derive(Default, Clone)]
pub struct NamespaceRouter {
    routes: HashMap<Namespace, Arc<dyn HandlerSet>>,
}

impl NamespaceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One router serving every namespace in `namespaces` with `handlers`.
    pub fn shared<I, S>(namespaces: I, handlers: Arc<dyn HandlerSet>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut router = Self::new();
        for namespace in namespaces {
            router.register(namespace.as_ref(), handlers.clone());
        }
        router
    }

    /// Registers `handlers` for `namespace`, replacing any previous set.
    /// Returns the normalized namespace.
    pub fn register(&mut self, namespace: &str, handlers: Arc<dyn HandlerSet>) -> Namespace {
        let namespace = Namespace::parse(namespace);
        self.routes.insert(namespace.clone(), handlers);
        namespace
    }

    pub fn resolve(&self, path: &str) -> Option<Route> {
        let namespace = Namespace::parse(path);
        self.routes.get(&namespace).map(|handlers| Route {
            namespace,
            handlers: handlers.clone(),
        })
    }

    /// Served namespaces in sorted order.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut namespaces: Vec<_> = self.routes.keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for NamespaceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceRouter")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
