// agro_market/src/flows/paypal_capture_flow.rs

//! Captures an approved PayPal session and settles the local payment.
//!
//! A payment that is already `Completed` stops the flow before the provider
//! is contacted, so repeated captures are harmless. Anything other than
//! `Pending PayPal` is refused, also without a provider call.

use crate::errors::AppError;
use crate::flows::common_steps;
use crate::flows::contexts::PayPalCaptureCtxData;
use crate::models::{OrderStatus, PaymentStatus};
use crate::services::notification_service;
use agro_flow::{Flow, FlowContext, FlowRegistry, StepControl};
use tracing::{info, warn};

pub fn register_paypal_capture_flow(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<PayPalCaptureCtxData, AppError>::new(&[
    ("begin_capture_transaction", false, None),
    ("locate_payment", false, None),
    ("short_circuit_completed", false, None),
    ("ensure_pending_paypal", false, None),
    ("capture_with_provider", false, None),
    ("apply_capture_outcome", false, None),
    ("commit_capture_transaction", false, None),
    ("notify_payment", true, None),
  ]);

  flow.on("begin_capture_transaction", common_steps::begin_transaction::<PayPalCaptureCtxData>);

  flow.on("locate_payment", |ctx_data: FlowContext<PayPalCaptureCtxData>| {
    Box::pin(async move {
      let (paypal_order_id, order_id, buyer_id) = {
        let guard = ctx_data.read();
        (guard.paypal_order_id.clone(), guard.order_id, guard.buyer_id)
      };

      let mut tx = ctx_data.read().tx.take()?;
      let payment = tx
        .payment_for_capture(&paypal_order_id, order_id, buyer_id)
        .await?
        .ok_or_else(|| {
          warn!(%paypal_order_id, %order_id, %buyer_id, "No payment matches the capture request.");
          AppError::NotFound("Payment record not found or does not match your account.".to_string())
        })?;
      ctx_data.read().tx.put(tx);

      ctx_data.write().payment = Some(payment);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("short_circuit_completed", |ctx_data: FlowContext<PayPalCaptureCtxData>| {
    Box::pin(async move {
      let completed = ctx_data
        .read()
        .payment
        .as_ref()
        .is_some_and(|p| p.status == PaymentStatus::Completed);
      if !completed {
        return Ok::<_, AppError>(StepControl::Continue);
      }

      // Nothing was written; release the transaction before stopping.
      let tx = ctx_data.read().tx.take()?;
      tx.commit().await?;
      info!(order_id = %ctx_data.read().order_id, "Payment already completed, skipping provider capture.");
      ctx_data.write().already_completed = true;
      Ok(StepControl::Stop)
    })
  });

  flow.on("ensure_pending_paypal", |ctx_data: FlowContext<PayPalCaptureCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let payment = guard
        .payment
        .as_ref()
        .ok_or_else(|| AppError::Internal("Payment not loaded.".to_string()))?;
      if payment.status != PaymentStatus::PendingPayPal {
        warn!(payment_id = %payment.id, status = %payment.status, "Capture requested for a payment not opened with PayPal.");
        return Err(AppError::StateConflict(format!(
          "Cannot capture payment with status '{}'.",
          payment.status
        )));
      }
      Ok(StepControl::Continue)
    })
  });

  flow.on("capture_with_provider", |ctx_data: FlowContext<PayPalCaptureCtxData>| {
    Box::pin(async move {
      let (gateway, paypal_order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.gateway.clone(), guard.paypal_order_id.clone())
      };

      let outcome = gateway.capture_order(&paypal_order_id).await;
      if let Err(e) = &outcome {
        warn!(%paypal_order_id, error = %e, "Provider capture failed.");
      }
      ctx_data.write().outcome = Some(outcome);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("apply_capture_outcome", |ctx_data: FlowContext<PayPalCaptureCtxData>| {
    Box::pin(async move {
      let (payment, outcome, paypal_order_id) = {
        let mut guard = ctx_data.write();
        (guard.payment.clone(), guard.outcome.take(), guard.paypal_order_id.clone())
      };
      let (Some(mut payment), Some(outcome)) = (payment, outcome) else {
        return Err(AppError::Internal("Capture outcome step reached without a payment or outcome.".to_string()));
      };

      let mut tx = ctx_data.read().tx.take()?;
      let failure = match outcome {
        Ok(capture) if capture.is_completed() => {
          let settled_id = capture.capture_id.unwrap_or_else(|| paypal_order_id.clone());
          payment.transition(PaymentStatus::Completed);
          payment.transaction_id = Some(settled_id.clone());
          payment.paypal_payment_id = Some(settled_id);

          if let Some(order) = tx.order_by_id(payment.order_id).await? {
            if order.status.can_transition_to(OrderStatus::Processing) {
              tx.update_order_status(order.id, OrderStatus::Processing).await?;
            }
          }
          None
        }
        Ok(capture) => {
          payment.transition(PaymentStatus::Failed);
          Some(AppError::ProviderDeclined { status: capture.status })
        }
        Err(e) => {
          payment.transition(PaymentStatus::Failed);
          Some(AppError::from(e))
        }
      };
      tx.update_payment(&payment).await?;
      ctx_data.read().tx.put(tx);

      info!(payment_id = %payment.id, status = %payment.status, "Capture outcome applied.");
      let mut guard = ctx_data.write();
      guard.payment = Some(payment);
      guard.failure = failure;
      Ok(StepControl::Continue)
    })
  });

  flow.on("commit_capture_transaction", |ctx_data: FlowContext<PayPalCaptureCtxData>| {
    Box::pin(async move {
      common_steps::commit_transaction(ctx_data.clone()).await?;
      let failure = ctx_data.write().failure.take();
      match failure {
        Some(e) => Err(e),
        None => Ok(StepControl::Continue),
      }
    })
  });

  flow.on("notify_payment", |ctx_data: FlowContext<PayPalCaptureCtxData>| {
    Box::pin(async move {
      let (store, buyer_id, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.buyer_id, guard.order_id)
      };
      let sent = notification_service::notify(
        store.as_ref(),
        buyer_id,
        format!("Payment for order {} completed.", order_id),
      )
      .await;
      ctx_data.write().buyer_notified = sent;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  registry.register(flow);
  info!("PayPal capture flow registered.");
}
