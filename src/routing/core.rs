use crate::annotation::SchemaAnnotation;
use crate::dispatcher::{handle_http, translate_error, HandlerResponse, PipelineConfig};
use crate::error::{AllowedErrors, DispatchError, HttpError, LogicError};
use crate::introspect::{resolve_cached, ResolvedSignature};
use crate::logic::{ArgVec, LogicRef, Params};
use crate::request::RequestContext;
use crate::runtime_config::Settings;
use crate::validator::{AnnotationValidator, ResourceSchema, SchemaValidator, ValidationMode};
use anyhow::Context;
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of verbs stored inline on a handler.
pub const MAX_INLINE_METHODS: usize = 5;

/// Declared-methods list of a handler.
pub type MethodVec = SmallVec<[Method; MAX_INLINE_METHODS]>;

/// One HTTP verb bound to a logic function.
#[derive(Clone)]
pub struct HttpMethod {
    method: Method,
    logic: LogicRef,
    allowed: AllowedErrors,
    title: Option<String>,
    response_schema: Option<Value>,
}

impl HttpMethod {
    pub fn new(method: Method, logic: LogicRef) -> Self {
        Self {
            method,
            logic,
            allowed: AllowedErrors::default(),
            title: None,
            response_schema: None,
        }
    }

    /// Let errors of type `E` propagate instead of becoming a 500.
    #[must_use]
    pub fn allow<E>(mut self) -> Self
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.allowed = self.allowed.allow::<E>();
        self
    }

    #[must_use]
    pub fn allowed_exceptions(mut self, allowed: AllowedErrors) -> Self {
        self.allowed = allowed;
        self
    }

    /// Documentation title; defaults per verb when not set.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Response schema fragment, used when the route has a resource schema.
    #[must_use]
    pub fn response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn logic(&self) -> &LogicRef {
        &self.logic
    }

    #[must_use]
    pub fn allowed(&self) -> &AllowedErrors {
        &self.allowed
    }

    /// Parameter set and signature of the bound logic function (memoized).
    #[must_use]
    pub fn params(&self) -> Arc<ResolvedSignature> {
        resolve_cached(&self.logic)
    }
}

impl fmt::Debug for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMethod")
            .field("method", &self.method)
            .field("logic", &self.logic.name())
            .field("allowed", &self.allowed)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

pub fn get(logic: LogicRef) -> HttpMethod {
    HttpMethod::new(Method::GET, logic)
}

pub fn post(logic: LogicRef) -> HttpMethod {
    HttpMethod::new(Method::POST, logic)
}

pub fn put(logic: LogicRef) -> HttpMethod {
    HttpMethod::new(Method::PUT, logic)
}

pub fn patch(logic: LogicRef) -> HttpMethod {
    HttpMethod::new(Method::PATCH, logic)
}

pub fn delete(logic: LogicRef) -> HttpMethod {
    HttpMethod::new(Method::DELETE, logic)
}

/// Behaviour shared by every handler built on a base.
pub trait HandlerBase: fmt::Debug + Send + Sync + 'static {
    /// Name of the base, for logs.
    fn name(&self) -> &str {
        "Resource"
    }

    /// Verbs the handler declares before any binding is attached.
    fn initial_methods(&self) -> Vec<Method> {
        Vec::new()
    }

    /// Runs before the pipeline; an error is mapped like any pipeline error.
    ///
    /// # Errors
    ///
    /// Any [`LogicError`], e.g. `Unauthorized` for a missing credential.
    fn before(&self, _req: &RequestContext) -> Result<(), LogicError> {
        Ok(())
    }
}

/// Default base: no hooks, no pre-declared verbs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resource;

impl HandlerBase for Resource {}

/// A path and the verbs bound on it.
#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    methods: Vec<HttpMethod>,
    heading: Option<String>,
    base: Arc<dyn HandlerBase>,
    handler_name: Option<String>,
    schema: Option<Arc<ResourceSchema>>,
}

impl Route {
    pub fn new(path: impl Into<String>, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        Self {
            path: path.into(),
            methods: methods.into_iter().collect(),
            heading: None,
            base: Arc::new(Resource),
            handler_name: None,
            schema: None,
        }
    }

    /// Documentation group of the route.
    #[must_use]
    pub fn heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    #[must_use]
    pub fn base_handler(mut self, base: impl HandlerBase) -> Self {
        self.base = Arc::new(base);
        self
    }

    /// Name of the synthesized handler; defaults to the first logic function's.
    #[must_use]
    pub fn handler_name(mut self, name: impl Into<String>) -> Self {
        self.handler_name = Some(name.into());
        self
    }

    /// Validate every binding of this route against a resource schema.
    #[must_use]
    pub fn schema(mut self, schema: Arc<ResourceSchema>) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }
}

/// A verb callable of a handler: the logic function plus its pipeline config.
pub struct HandlerMethod {
    method: Method,
    logic: LogicRef,
    config: PipelineConfig,
    annotation: SchemaAnnotation,
}

impl HandlerMethod {
    /// Run the pipeline for this binding.
    ///
    /// # Errors
    ///
    /// See [`handle_http`].
    pub fn call(
        &self,
        req: &RequestContext,
        args: ArgVec,
        kwargs: Params,
    ) -> Result<HandlerResponse, DispatchError> {
        handle_http(req, args, kwargs, self.logic.as_ref(), &self.config)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn logic(&self) -> &LogicRef {
        &self.logic
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn params(&self) -> &ResolvedSignature {
        &self.config.params
    }

    #[must_use]
    pub fn annotation(&self) -> &SchemaAnnotation {
        &self.annotation
    }
}

impl fmt::Debug for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("method", &self.method)
            .field("logic", &self.logic.name())
            .field("params", &self.config.params.params)
            .finish_non_exhaustive()
    }
}

/// Synthesized handler for one route.
#[derive(Debug)]
pub struct Handler {
    name: String,
    heading: Option<String>,
    base: Arc<dyn HandlerBase>,
    methods: MethodVec,
    callables: Vec<HandlerMethod>,
}

impl Handler {
    fn new(name: String, heading: Option<String>, base: Arc<dyn HandlerBase>) -> Self {
        let methods = base.initial_methods().into_iter().collect();
        Self {
            name,
            heading,
            base,
            methods,
            callables: Vec::new(),
        }
    }

    fn attach(&mut self, callable: HandlerMethod) {
        let method = callable.method.clone();
        match self.callables.iter_mut().find(|c| c.method == method) {
            Some(existing) => {
                warn!(
                    handler = %self.name,
                    method = %method,
                    "Verb declared twice on route, keeping the last binding"
                );
                *existing = callable;
            }
            None => self.callables.push(callable),
        }
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }

    #[must_use]
    pub fn base(&self) -> &dyn HandlerBase {
        self.base.as_ref()
    }

    /// Declared verbs, in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Callable bound to `method`.
    #[must_use]
    pub fn method(&self, method: &Method) -> Option<&HandlerMethod> {
        self.callables.iter().find(|c| &c.method == method)
    }

    #[must_use]
    pub fn has_method(&self, method: &Method) -> bool {
        self.method(method).is_some()
    }

    #[must_use]
    pub fn annotation(&self, method: &Method) -> Option<&SchemaAnnotation> {
        self.method(method).map(HandlerMethod::annotation)
    }

    /// Annotations of every bound verb, in attachment order.
    pub fn annotations(&self) -> impl Iterator<Item = &SchemaAnnotation> + '_ {
        self.callables.iter().map(HandlerMethod::annotation)
    }

    /// Dispatch a request to the callable for its verb.
    ///
    /// # Errors
    ///
    /// A 405 [`HttpError`] when no callable is bound to the request verb, the
    /// mapped error of the base's `before` hook, or the pipeline's error.
    pub fn call(
        &self,
        req: &RequestContext,
        args: ArgVec,
        kwargs: Params,
    ) -> Result<HandlerResponse, DispatchError> {
        let Some(callable) = self.method(&req.method) else {
            debug!(handler = %self.name, method = %req.method, "Verb not bound on handler");
            return Err(HttpError::new(405, format!("Method {} not allowed", req.method)).into());
        };
        if let Err(err) = self.base.before(req) {
            let config = callable.config();
            return Err(translate_error(
                err,
                req,
                &self.name,
                &config.settings,
                &config.allowed_exceptions,
            ));
        }
        callable.call(req, args, kwargs)
    }
}

fn build_method(
    binding: &HttpMethod,
    route: &Route,
    handler_name: &str,
    settings: &Settings,
) -> anyhow::Result<HandlerMethod> {
    let resolved = binding.params();
    let validator: ValidationMode = match &route.schema {
        Some(schema) => {
            let key = format!("{}:{}:{}", schema.name(), handler_name, binding.method);
            SchemaValidator::new(
                Arc::clone(schema),
                key,
                &resolved,
                binding.response_schema.as_ref(),
            )?
            .into()
        }
        None => AnnotationValidator::new(Arc::clone(&resolved)).into(),
    };
    let annotation = SchemaAnnotation::new(
        binding.logic.name(),
        &binding.method,
        binding.title.clone(),
        route.heading.clone(),
        &resolved,
        &validator,
    );
    let config = PipelineConfig::new(resolved, validator, *settings)
        .allowed_exceptions(binding.allowed.clone());
    Ok(HandlerMethod {
        method: binding.method.clone(),
        logic: Arc::clone(&binding.logic),
        config,
        annotation,
    })
}

/// Build one handler per route, in route order.
///
/// # Errors
///
/// Returns an error if a resource schema of a route does not compile.
pub fn create_routes(
    routes: &[Route],
    settings: &Settings,
) -> anyhow::Result<Vec<(String, Handler)>> {
    let mut created = Vec::with_capacity(routes.len());
    for route in routes {
        let Some(first) = route.methods.first() else {
            warn!(path = %route.path, "Route declares no methods, skipping");
            continue;
        };
        let handler_name = route
            .handler_name
            .clone()
            .unwrap_or_else(|| first.logic.name().to_string());

        let mut handler: Option<Handler> = None;
        for binding in &route.methods {
            let callable = build_method(binding, route, &handler_name, settings)
                .with_context(|| format!("route {} {}", binding.method, route.path))?;
            match handler.as_mut() {
                Some(h) => {
                    h.attach(callable);
                    debug!(
                        handler = %handler_name,
                        method = %binding.method,
                        "Method attached to handler"
                    );
                }
                None => {
                    let mut h =
                        Handler::new(handler_name.clone(), route.heading.clone(), Arc::clone(&route.base));
                    h.attach(callable);
                    debug!(
                        handler = %handler_name,
                        base = %route.base.name(),
                        method = %binding.method,
                        path = %route.path,
                        "Handler created"
                    );
                    handler = Some(h);
                }
            }
        }
        if let Some(h) = handler {
            created.push((route.path.clone(), h));
        }
    }
    info!(
        routes = created.len(),
        debug = settings.debug,
        "Routes created"
    );
    Ok(created)
}
