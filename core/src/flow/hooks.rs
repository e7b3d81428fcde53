// agro_flow/src/flow/hooks.rs

//! Handler registration for the three phases of a step.

use crate::context::FlowContext;
use crate::control::StepControl;
use crate::error::FlowError;
use crate::flow::definition::{Flow, Handler};
use std::collections::HashMap;
use std::future::Future;

impl<T, E> Flow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Registers a handler that runs before the step's `on` handlers.
  pub fn before<F, UserErr>(&mut self, step_name: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StepControl, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push_handler(&mut self.before, step_name, wrap(handler_fn));
  }

  /// Registers a main handler for the step.
  pub fn on<F, UserErr>(&mut self, step_name: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StepControl, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push_handler(&mut self.on, step_name, wrap(handler_fn));
  }

  /// Registers a handler that runs after the step's `on` handlers.
  pub fn after<F, UserErr>(&mut self, step_name: &str, handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StepControl, UserErr>> + Send + 'static,
    UserErr: Into<E> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    push_handler(&mut self.after, step_name, wrap(handler_fn));
  }
}

fn wrap<T, E, F, UserErr>(handler_fn: impl Fn(FlowContext<T>) -> F + Send + Sync + 'static) -> Handler<T, E>
where
  T: Send + Sync + 'static,
  E: Send + 'static,
  F: Future<Output = Result<StepControl, UserErr>> + Send + 'static,
  UserErr: Into<E> + Send + Sync + 'static,
{
  Box::new(move |ctx| {
    let user_fut = handler_fn(ctx);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}

fn push_handler<T: Send + Sync + 'static, E>(phase: &mut HashMap<String, Vec<Handler<T, E>>>, step_name: &str, handler: Handler<T, E>) {
  phase.entry(step_name.to_string()).or_default().push(handler);
}
