// tests/registry_tests.rs
mod common;

use agro_flow::{Flow, FlowContext, FlowError, FlowOutcome, FlowRegistry, StepControl};
use common::*;

#[derive(Clone, Debug, Default)]
struct AlphaCtx {
  val: String,
}

#[derive(Clone, Debug, Default)]
struct BetaCtx {
  num: i32,
}

#[tokio::test]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut alpha = Flow::<AlphaCtx, TestError>::new(&[("alpha", false, None)]);
  alpha.on("alpha", |ctx: FlowContext<AlphaCtx>| {
    Box::pin(async move {
      ctx.write().val = "alpha_processed".to_string();
      Ok::<_, FlowError>(StepControl::Continue)
    })
  });
  registry.register(alpha);

  let mut beta = Flow::<BetaCtx, TestError>::new(&[("beta", false, None)]);
  beta.on("beta", |ctx: FlowContext<BetaCtx>| {
    Box::pin(async move {
      ctx.write().num = 100;
      Ok::<_, FlowError>(StepControl::Continue)
    })
  });
  registry.register(beta);

  assert!(registry.is_registered::<AlphaCtx>());

  let alpha_ctx = FlowContext::new(AlphaCtx::default());
  assert_eq!(registry.run(alpha_ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(alpha_ctx.read().val, "alpha_processed");

  let beta_ctx = FlowContext::new(BetaCtx::default());
  assert_eq!(registry.run(beta_ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(beta_ctx.read().num, 100);
}

#[tokio::test]
async fn unknown_context_type_is_reported() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  #[derive(Debug, Default)]
  struct Unregistered;

  match registry.run(FlowContext::new(Unregistered)).await {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("NotRegistered"));
      assert!(s.contains("Unregistered"));
    }
    other => panic!("expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn handler_errors_pass_through_the_registry() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  let mut flow = Flow::<AlphaCtx, TestError>::new(&[("fail", false, None)]);
  flow.on("fail", |_ctx: FlowContext<AlphaCtx>| {
    Box::pin(async move { Err::<StepControl, _>(TestError::Handler("nope".to_string())) })
  });
  registry.register(flow);

  let err = registry.run(FlowContext::new(AlphaCtx::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("nope".to_string()));
}
