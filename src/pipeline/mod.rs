// Request pipeline: an ordered list of typed stages built once per endpoint
// at startup. Stages run strictly in declared order - authentication, field
// extraction, guards - and the first failure aborts the run; the handler
// only fires when every stage passed.
//
// Guards declare which context names they read. The builder checks those
// dependencies while the stage list is assembled, so a guard placed before
// the stage that resolves its data is a startup panic, not a latent bug.

pub mod context;

pub use context::{RequestContext, Source};

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::api::envelope::HandlerResult;
use crate::api::error::ApiError;
use crate::auth;
use crate::models::user::UserRole;
use crate::validation::{errors, Validate};

/// Endpoint logic invoked after all stages pass. Business-rule failures use
/// the same error channel as the stages.
pub type Handler = fn(&RequestContext) -> HandlerResult;

/// A named admission predicate over resolved request state, with the
/// context names it depends on.
#[derive(Clone, Copy)]
pub struct Guard {
    name: &'static str,
    requires: &'static [&'static str],
    message: &'static str,
    check: fn(&RequestContext) -> bool,
}

impl Guard {
    pub const fn new(
        name: &'static str,
        requires: &'static [&'static str],
        check: fn(&RequestContext) -> bool,
        message: &'static str,
    ) -> Self {
        Self {
            name,
            requires,
            message,
            check,
        }
    }

    pub fn admit(&self, ctx: &RequestContext) -> bool {
        (self.check)(ctx)
    }
}

enum Stage {
    Auth(Option<UserRole>),
    Extract(Source, Vec<Arc<dyn Validate>>),
    Guard(Guard),
}

/// Raw request material handed to a pipeline run: the bearer credential (if
/// any), decoded query parameters, and the JSON body.
#[derive(Debug, Default)]
pub struct RawRequest {
    pub token: Option<String>,
    pub query: Map<String, Value>,
    pub body: Value,
}

impl RawRequest {
    fn source_map(&self, source: Source) -> Result<Map<String, Value>, ApiError> {
        match source {
            Source::Query => Ok(self.query.clone()),
            Source::Body => match &self.body {
                Value::Object(map) => Ok(map.clone()),
                Value::Null => Ok(Map::new()),
                _ => Err(errors::INVALID_BODY.raise()),
            },
        }
    }
}

pub struct Pipeline {
    name: &'static str,
    stages: Vec<Stage>,
    handler: Handler,
}

impl Pipeline {
    pub fn named(name: &'static str) -> PipelineBuilder {
        PipelineBuilder {
            name,
            stages: Vec::new(),
            provides: HashSet::new(),
        }
    }

    pub fn run(&self, request: &RawRequest) -> HandlerResult {
        let mut ctx = RequestContext::new();
        for stage in &self.stages {
            match stage {
                Stage::Auth(role) => {
                    let user = auth::authenticate(request.token.as_deref(), *role)?;
                    ctx.set_principal(user);
                }
                Stage::Extract(source, rules) => {
                    let raw = request.source_map(*source)?;
                    for rule in rules {
                        let value = rule.apply(raw.get(rule.source()).cloned())?;
                        ctx.insert(*source, rule.target(), value);
                    }
                }
                Stage::Guard(guard) => {
                    if !guard.admit(&ctx) {
                        tracing::debug!("pipeline {}: guard {} rejected request", self.name, guard.name);
                        return Err(ApiError::forbidden(guard.message));
                    }
                }
            }
        }
        (self.handler)(&ctx)
    }
}

pub struct PipelineBuilder {
    name: &'static str,
    stages: Vec<Stage>,
    provides: HashSet<String>,
}

impl PipelineBuilder {
    /// Admit any authenticated user.
    pub fn require_user(self) -> Self {
        self.auth_stage(None)
    }

    /// Admit only authenticated users of the given role.
    pub fn require_role(self, role: UserRole) -> Self {
        self.auth_stage(Some(role))
    }

    fn auth_stage(mut self, role: Option<UserRole>) -> Self {
        self.stages.push(Stage::Auth(role));
        self.provides.insert("user".to_string());
        self
    }

    pub fn query(self, rules: Vec<Arc<dyn Validate>>) -> Self {
        self.extract_stage(Source::Query, rules)
    }

    pub fn body(self, rules: Vec<Arc<dyn Validate>>) -> Self {
        self.extract_stage(Source::Body, rules)
    }

    fn extract_stage(mut self, source: Source, rules: Vec<Arc<dyn Validate>>) -> Self {
        for rule in &rules {
            self.provides.insert(rule.target().to_string());
        }
        self.stages.push(Stage::Extract(source, rules));
        self
    }

    /// Append a guard. Panics at construction when the guard reads a
    /// context name no earlier stage provides; misordered pipelines must
    /// not come up at all.
    pub fn guard(mut self, guard: Guard) -> Self {
        for need in guard.requires {
            if !self.provides.contains(*need) {
                panic!(
                    "pipeline `{}`: guard `{}` reads `{}` before any stage provides it",
                    self.name, guard.name, need
                );
            }
        }
        self.stages.push(Stage::Guard(guard));
        self
    }

    pub fn handle(self, handler: Handler) -> Pipeline {
        Pipeline {
            name: self.name,
            stages: self.stages,
            handler,
        }
    }
}

/// Wrap a registry validator for use in a stage declaration.
pub fn rule<V: Validate + Clone + 'static>(validator: &V) -> Arc<dyn Validate> {
    Arc::new(validator.clone())
}
