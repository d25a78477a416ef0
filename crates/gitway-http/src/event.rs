//! Request lifecycle hooks.
//!
//! Each [`Event`] holds at most one hook; registering again replaces the
//! previous one. Hooks run synchronously on the request's task and may
//! rewrite the [`RequestContext`]. A hook returning `Err` aborts the request
//! and the error is rendered like any handler error, for every event.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{RequestContext, Result};

/// Lifecycle points a hook can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Before an `upload-pack` RPC runs.
    BeforeUploadPack,
    /// Before a `receive-pack` RPC runs.
    BeforeReceivePack,
    /// After routing succeeded, before the repository existence check.
    AfterMatchRouting,
}

impl Event {
    /// Registration key, e.g. `before-upload-pack`.
    pub fn key(&self) -> &'static str {
        match self {
            Event::BeforeUploadPack => "before-upload-pack",
            Event::BeforeReceivePack => "before-receive-pack",
            Event::AfterMatchRouting => "after-match-routing",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A lifecycle hook.
pub type Hook = Arc<dyn Fn(&mut RequestContext) -> Result<()> + Send + Sync>;

/// Registry of hooks, one per event.
#[derive(Clone, Default)]
pub struct Events {
    listeners: HashMap<Event, Hook>,
}

impl Events {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` for `event`, replacing any earlier hook.
    pub fn on<F>(&mut self, event: Event, hook: F)
    where
        F: Fn(&mut RequestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.listeners.insert(event, Arc::new(hook));
    }

    /// Returns true if a hook is registered for `event`.
    pub fn is_registered(&self, event: Event) -> bool {
        self.listeners.contains_key(&event)
    }

    /// Runs the hook for `event`, if any.
    pub fn emit(&self, event: Event, ctx: &mut RequestContext) -> Result<()> {
        match self.listeners.get(&event) {
            Some(hook) => {
                tracing::trace!(event = %event, repo = %ctx.repo_path(), "running hook");
                hook(ctx)
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.listeners.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use axum::{body::Body, extract::Request};

    fn ctx() -> RequestContext {
        let request = Request::builder().uri("/r.git/HEAD").body(Body::empty()).unwrap();
        RequestContext::new(request, "/r.git", "HEAD")
    }

    #[test]
    fn test_emit_without_listener_is_ok() {
        let events = Events::new();
        let mut ctx = ctx();
        assert!(events.emit(Event::AfterMatchRouting, &mut ctx).is_ok());
    }

    #[test]
    fn test_hook_mutates_context() {
        let mut events = Events::new();
        events.on(Event::BeforeUploadPack, |ctx| {
            ctx.set_env(vec!["REMOTE_USER=bob".into()]);
            Ok(())
        });
        let mut ctx = ctx();
        events.emit(Event::BeforeUploadPack, &mut ctx).unwrap();
        assert_eq!(ctx.env().unwrap(), ["REMOTE_USER=bob".to_string()]);
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut events = Events::new();
        events.on(Event::AfterMatchRouting, |ctx| {
            ctx.set_repo_path("/first.git");
            Ok(())
        });
        events.on(Event::AfterMatchRouting, |ctx| {
            ctx.set_repo_path("/second.git");
            Ok(())
        });
        let mut ctx = ctx();
        events.emit(Event::AfterMatchRouting, &mut ctx).unwrap();
        assert_eq!(ctx.repo_path(), "/second.git");
    }

    #[test]
    fn test_only_matching_event_fires() {
        let mut events = Events::new();
        events.on(Event::BeforeReceivePack, |_| {
            Err(Error::AccessDenied("push".into()))
        });
        let mut ctx = ctx();
        assert!(events.emit(Event::BeforeUploadPack, &mut ctx).is_ok());
        assert!(matches!(
            events.emit(Event::BeforeReceivePack, &mut ctx),
            Err(Error::AccessDenied(_))
        ));
        assert!(events.is_registered(Event::BeforeReceivePack));
        assert!(!events.is_registered(Event::BeforeUploadPack));
    }

    #[test]
    fn test_keys() {
        assert_eq!(Event::BeforeUploadPack.key(), "before-upload-pack");
        assert_eq!(Event::BeforeReceivePack.to_string(), "before-receive-pack");
        assert_eq!(Event::AfterMatchRouting.key(), "after-match-routing");
    }
}
