// agro_flow/src/registry.rs

//! `FlowRegistry<E>`: one flow per context type, run by handing over a context.

use crate::context::FlowContext;
use crate::control::FlowOutcome;
use crate::error::FlowError;
use crate::flow::execution::short_type_name;
use crate::flow::Flow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

/// Type-erased runner stored in the registry.
#[async_trait]
trait ErasedFlow<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr>;
}

struct FlowRunner<T, FlowErr, AppErr>
where
  T: Send + Sync + 'static,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: Flow<T, FlowErr>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<T, FlowErr, AppErr> ErasedFlow<AppErr> for FlowRunner<T, FlowErr, AppErr>
where
  T: Send + Sync + 'static,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<FlowErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr> {
    let ctx = match ctx.downcast::<FlowContext<T>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<FlowContext<T>>().to_string();
        event!(Level::ERROR, %expected_type, "Context handed to the wrong flow runner.");
        return Err(AppErr::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.flow.run(ctx).await.map_err(AppErr::from)
  }
}

/// Registry of flows keyed by their context type.
///
/// `AppErr` is what [`FlowRegistry::run`] returns; it must absorb both the
/// engine's [`FlowError`] and each registered flow's own error type.
pub struct FlowRegistry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedFlow<AppErr>>>>,
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow` for context type `T`, replacing any earlier flow for `T`.
  pub fn register<T, FlowErr>(&self, flow: Flow<T, FlowErr>)
  where
    T: Send + Sync + 'static,
    FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<FlowErr>,
  {
    event!(Level::DEBUG, context_type = %short_type_name::<T>(), steps = ?flow.step_names(), "Registering flow.");
    let runner = FlowRunner::<T, FlowErr, AppErr> {
      flow,
      _app_err: PhantomData,
    };
    self.flows.write().insert(TypeId::of::<T>(), Arc::new(runner));
  }

  pub fn is_registered<T: Send + Sync + 'static>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<T>())
  }

  /// Runs the flow registered for `T`. The caller keeps its own clone of
  /// `ctx` to read results afterwards.
  pub async fn run<T>(&self, ctx: FlowContext<T>) -> Result<FlowOutcome, AppErr>
  where
    T: Send + Sync + 'static,
  {
    let runner = self.flows.read().get(&TypeId::of::<T>()).cloned();
    let Some(runner) = runner else {
      let context_type = std::any::type_name::<T>().to_string();
      event!(Level::ERROR, %context_type, "No flow registered.");
      return Err(AppErr::from(FlowError::NotRegistered { context_type }));
    };
    runner.run_erased(Box::new(ctx)).await
  }
}
