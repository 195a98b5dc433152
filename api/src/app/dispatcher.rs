//! Request dispatcher
//!
//! Maps each request type to exactly one handler. The registry is assembled
//! once at startup through [`DispatcherBuilder`] and is immutable afterwards.
//! Every `send` runs the registered behaviors around the handler, outermost
//! first, and gives the handler a fresh [`Session`] for the caller's tenant.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::session::Session;
use crate::domain::ports::DocumentStore;
use crate::domain::tenant::{TenantContext, TenantId};
use crate::error::{AppError, RegistryError};

/// Whether a request mutates state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Command,
    Query,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Command => write!(f, "command"),
            RequestKind::Query => write!(f, "query"),
        }
    }
}

/// A message that can be sent through the dispatcher.
///
/// Requests never carry a tenant; it comes from the context passed to
/// [`Dispatcher::send`].
pub trait Request: Send + Sync + 'static {
    type Response: Send + 'static;

    const KIND: RequestKind;

    /// Name used in logs and registry errors
    fn name() -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// Business logic for one request type
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: &R, session: &mut Session) -> Result<R::Response, AppError>;
}

/// Response as seen by behaviors, before it is downcast for the caller
pub type ErasedResponse = Box<dyn Any + Send>;

type ErasedRequest = dyn Any + Send + Sync;

trait ErasedHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        request: &'a ErasedRequest,
        session: &'a mut Session,
    ) -> BoxFuture<'a, Result<ErasedResponse, AppError>>;
}

struct HandlerSlot<R, H> {
    handler: H,
    _request: PhantomData<fn() -> R>,
}

impl<R: Request, H: Handler<R>> ErasedHandler for HandlerSlot<R, H> {
    fn handle<'a>(
        &'a self,
        request: &'a ErasedRequest,
        session: &'a mut Session,
    ) -> BoxFuture<'a, Result<ErasedResponse, AppError>> {
        Box::pin(async move {
            let request = request.downcast_ref::<R>().ok_or_else(|| {
                AppError::Internal(format!("Handler for {} received another request", R::name()))
            })?;
            let response = self.handler.handle(request, session).await?;
            Ok(Box::new(response) as ErasedResponse)
        })
    }
}

/// What a behavior knows about the request it wraps
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub name: Cow<'static, str>,
    pub kind: RequestKind,
    pub tenant_id: TenantId,
}

/// Cross-cutting step wrapped around every handler invocation
#[async_trait]
pub trait Behavior: Send + Sync + 'static {
    async fn handle(&self, info: &RequestInfo, next: Next<'_>)
        -> Result<ErasedResponse, AppError>;
}

/// The rest of the pipeline: remaining behaviors, then the handler
pub struct Next<'a> {
    behaviors: &'a [Arc<dyn Behavior>],
    info: &'a RequestInfo,
    handler: &'a dyn ErasedHandler,
    request: &'a ErasedRequest,
    session: &'a mut Session,
}

impl<'a> Next<'a> {
    pub fn run(self) -> BoxFuture<'a, Result<ErasedResponse, AppError>> {
        Box::pin(async move {
            let behaviors = self.behaviors;
            match behaviors.split_first() {
                Some((behavior, rest)) => {
                    let info = self.info;
                    let next = Next {
                        behaviors: rest,
                        ..self
                    };
                    behavior.handle(info, next).await
                }
                None => self.handler.handle(self.request, self.session).await,
            }
        })
    }
}

/// Startup-time registry builder
pub struct DispatcherBuilder {
    store: Arc<dyn DocumentStore>,
    handlers: HashMap<TypeId, Box<dyn ErasedHandler>>,
    required: Vec<(TypeId, Cow<'static, str>)>,
    behaviors: Vec<Arc<dyn Behavior>>,
}

impl DispatcherBuilder {
    /// Register the handler for `R`. A second handler for the same request
    /// type is rejected.
    pub fn register<R, H>(mut self, handler: H) -> Result<Self, RegistryError>
    where
        R: Request,
        H: Handler<R>,
    {
        let type_id = TypeId::of::<R>();
        if self.handlers.contains_key(&type_id) {
            return Err(RegistryError::DuplicateHandler(R::name().into_owned()));
        }

        self.handlers.insert(
            type_id,
            Box::new(HandlerSlot {
                handler,
                _request: PhantomData::<fn() -> R>,
            }),
        );
        Ok(self)
    }

    /// Add a behavior. Behaviors run in the order they are added.
    pub fn behavior(mut self, behavior: impl Behavior) -> Self {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    /// Declare that callers will send `R`; `build` fails if nothing handles it
    pub fn require<R: Request>(mut self) -> Self {
        self.required.push((TypeId::of::<R>(), R::name()));
        self
    }

    pub fn build(self) -> Result<Dispatcher, RegistryError> {
        if let Some((_, name)) = self
            .required
            .iter()
            .find(|(type_id, _)| !self.handlers.contains_key(type_id))
        {
            return Err(RegistryError::MissingHandler(name.to_string()));
        }

        tracing::debug!(
            handlers = self.handlers.len(),
            behaviors = self.behaviors.len(),
            "Dispatcher built"
        );

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                store: self.store,
                handlers: self.handlers,
                behaviors: self.behaviors,
            }),
        })
    }
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    handlers: HashMap<TypeId, Box<dyn ErasedHandler>>,
    behaviors: Vec<Arc<dyn Behavior>>,
}

/// Immutable, cheaply cloneable request dispatcher
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn builder(store: Arc<dyn DocumentStore>) -> DispatcherBuilder {
        DispatcherBuilder {
            store,
            handlers: HashMap::new(),
            required: Vec::new(),
            behaviors: Vec::new(),
        }
    }

    pub fn handles<R: Request>(&self) -> bool {
        self.inner.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Run `request` for `tenant` through the behaviors and its handler
    pub async fn send<R: Request>(
        &self,
        tenant: &TenantContext,
        request: R,
    ) -> Result<R::Response, AppError> {
        let handler = self
            .inner
            .handlers
            .get(&TypeId::of::<R>())
            .ok_or_else(|| {
                AppError::Internal(RegistryError::MissingHandler(R::name().into_owned()).to_string())
            })?;

        let info = RequestInfo {
            name: R::name(),
            kind: R::KIND,
            tenant_id: tenant.tenant_id(),
        };
        let mut session = Session::new(self.inner.store.clone(), tenant.clone());

        let result = Next {
            behaviors: &self.inner.behaviors,
            info: &info,
            handler: handler.as_ref(),
            request: &request,
            session: &mut session,
        }
        .run()
        .await;

        let discarded = session.discard_changes();
        if discarded > 0 {
            tracing::warn!(
                request = %info.name,
                tenant = %info.tenant_id,
                discarded,
                "Discarding unsaved changes"
            );
        }

        let response = result?;
        response.downcast::<R::Response>().map(|r| *r).map_err(|_| {
            AppError::Internal(format!("Unexpected response type for {}", info.name))
        })
    }
}
