// tests/context_tests.rs
mod common;

use agro_flow::{Flow, FlowContext, FlowError, StepControl};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn writes_are_visible_to_later_steps() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(&[("set", false, None), ("read", false, None)]);

  flow.on("set", |ctx: FlowContext<TestContext>| {
    Box::pin(async move {
      ctx.update(|c| {
        c.counter = 10;
        c.message = "set".to_string();
      });
      Ok::<_, FlowError>(StepControl::Continue)
    })
  });
  flow.on("read", |ctx: FlowContext<TestContext>| {
    Box::pin(async move {
      let seen = ctx.with(|c| c.counter);
      // Lock released before the await.
      tokio::task::yield_now().await;
      ctx.write().counter = seen + 5;
      Ok::<_, FlowError>(StepControl::Continue)
    })
  });

  let ctx = FlowContext::new(TestContext::default());
  flow.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().counter, 15);
  assert_eq!(ctx.read().message, "set");
}

#[test]
fn clones_share_the_same_data() {
  let original = FlowContext::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned = original.clone();
  cloned.write().counter = 2;
  assert_eq!(original.read().counter, 2);
}

#[test]
fn try_write_fails_while_read_guard_is_held() {
  let ctx = FlowContext::new(TestContext::default());
  let guard = ctx.read();
  assert!(ctx.try_write().is_none());
  assert!(ctx.try_read().is_some());
  drop(guard);
  assert!(ctx.try_write().is_some());
}

#[test]
fn try_read_fails_while_write_guard_is_held() {
  let ctx = FlowContext::new(TestContext::default());
  let guard = ctx.write();
  assert!(ctx.try_read().is_none());
  assert!(ctx.try_write().is_none());
  drop(guard);
  let bumped = ctx.update(|c| {
    c.counter += 3;
    c.counter
  });
  assert_eq!(bumped, 3);
  assert_eq!(ctx.with(|c| c.counter), 3);
}
