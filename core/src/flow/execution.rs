// agro_flow/src/flow/execution.rs

//! `Flow::run`.

use crate::context::FlowContext;
use crate::control::{FlowOutcome, StepControl};
use crate::error::FlowError;
use crate::flow::definition::{Flow, Handler};
use tracing::{event, info_span, Instrument, Level};

impl<T, E> Flow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx`.
  ///
  /// Per step: `skip_if` is evaluated first; a step without any handler is
  /// skipped when optional and fails with [`FlowError::HandlerMissing`]
  /// otherwise; then `before`, `on` and `after` handlers run in registration
  /// order. The first `Stop` ends the run with [`FlowOutcome::Stopped`], the
  /// first error ends it with that error.
  pub async fn run(&self, ctx: FlowContext<T>) -> Result<FlowOutcome, E> {
    let flow_span = info_span!(
      "flow_run",
      context_type = %short_type_name::<T>(),
      num_steps = self.steps.len(),
    );

    async move {
      event!(Level::DEBUG, "Flow run starting.");

      for (step_idx, step) in self.steps.iter().enumerate() {
        let step_name = step.name.as_str();

        if let Some(skip_if) = &step.skip_if {
          if skip_if(ctx.clone()) {
            event!(Level::DEBUG, step_name, "Step skipped by condition.");
            continue;
          }
        }

        let phases: [(&str, Option<&Vec<Handler<T, E>>>); 3] = [
          ("before", self.before.get(step_name)),
          ("on", self.on.get(step_name)),
          ("after", self.after.get(step_name)),
        ];

        if phases.iter().all(|(_, handlers)| handlers.map_or(true, |h| h.is_empty())) {
          if step.optional {
            event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
            continue;
          }
          event!(Level::ERROR, step_name, "Required step has no handlers.");
          return Err(E::from(FlowError::HandlerMissing {
            step_name: step.name.clone(),
          }));
        }

        let step_span = info_span!("flow_step", step_name, step_index = step_idx, optional = step.optional);

        for (phase, handlers) in phases {
          let Some(handlers) = handlers else { continue };
          for handler in handlers {
            match handler(ctx.clone()).instrument(step_span.clone()).await {
              Ok(StepControl::Continue) => {}
              Ok(StepControl::Stop) => {
                event!(Level::INFO, step_name, phase, "Flow stopped by handler.");
                return Ok(FlowOutcome::Stopped);
              }
              Err(e) => {
                event!(Level::WARN, step_name, phase, error = %e, "Handler failed.");
                return Err(e);
              }
            }
          }
        }
      }

      event!(Level::DEBUG, "Flow run completed.");
      Ok(FlowOutcome::Completed)
    }
    .instrument(flow_span)
    .await
  }
}

pub(crate) fn short_type_name<T>() -> &'static str {
  let full = std::any::type_name::<T>();
  full.rsplit("::").next().unwrap_or(full)
}
