// agro_flow/src/flow/definition.rs

//! `Flow<T, E>` and its structural operations.

use crate::context::FlowContext;
use crate::control::StepControl;
use crate::error::FlowError;
use crate::step::{SkipCondition, StepDef};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A step handler: takes a handle to the shared context, resolves to a
/// [`StepControl`] or the flow's error type.
pub type Handler<T, E> =
  Box<dyn Fn(FlowContext<T>) -> Pin<Box<dyn Future<Output = Result<StepControl, E>> + Send>> + Send + Sync>;

/// An ordered list of named steps over context data `T`.
///
/// `E` is the error type handlers return. It must absorb [`FlowError`] so the
/// engine can report its own failures (e.g. a required step with no handler)
/// through the same channel.
pub struct Flow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, E>>>,
}

impl<T, E> Flow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(name, optional, skip_if)` triples.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<T>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  /// Panics on an unknown step. Wiring a handler to a misspelled step is a
  /// programming error and should fail at start-up, not at request time.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.has_step(step_name) {
      panic!("flow setup error: step '{}' is not defined", step_name);
    }
  }

  /// Inserts a new step right after `existing_step`.
  pub fn insert_step_after(
    &mut self,
    existing_step: &str,
    new_step: &str,
    optional: bool,
    skip_if: Option<SkipCondition<T>>,
  ) -> Result<(), FlowError> {
    let idx = self
      .steps
      .iter()
      .position(|s| s.name == existing_step)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: existing_step.to_string(),
      })?;
    if self.has_step(new_step) {
      return Err(FlowError::Internal(format!("step '{}' already exists", new_step)));
    }
    self.steps.insert(
      idx + 1,
      StepDef {
        name: new_step.to_string(),
        optional,
        skip_if,
      },
    );
    Ok(())
  }

  /// Removes a step and its handlers. Removing an unknown step is a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    self.steps.retain(|s| s.name != step_name);
    self.before.remove(step_name);
    self.on.remove(step_name);
    self.after.remove(step_name);
  }
}
