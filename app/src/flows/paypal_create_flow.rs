// agro_market/src/flows/paypal_create_flow.rs

//! Opens a PayPal checkout session for an order's payment.
//!
//! The status write (`Pending PayPal` on success, `Failed` on a provider
//! error) commits before any provider error is returned to the caller.

use crate::errors::AppError;
use crate::flows::common_steps;
use crate::flows::contexts::PayPalCreateCtxData;
use crate::gateway::CheckoutRequest;
use crate::models::{payment::PAYPAL_METHOD, PaymentStatus};
use agro_flow::{Flow, FlowContext, FlowRegistry, StepControl};
use tracing::{info, warn};

pub fn register_paypal_create_flow(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<PayPalCreateCtxData, AppError>::new(&[
    ("begin_payment_transaction", false, None),
    ("load_order_payment", false, None),
    ("ensure_payment_openable", false, None),
    ("request_provider_session", false, None),
    ("persist_payment_state", false, None),
    ("commit_payment_transaction", false, None),
  ]);

  flow.on("begin_payment_transaction", common_steps::begin_transaction::<PayPalCreateCtxData>);

  flow.on("load_order_payment", |ctx_data: FlowContext<PayPalCreateCtxData>| {
    Box::pin(async move {
      let (order_id, buyer_id) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.buyer_id)
      };

      let mut tx = ctx_data.read().tx.take()?;
      let order = tx
        .order_by_id(order_id)
        .await?
        .filter(|o| o.buyer_id == buyer_id)
        .ok_or_else(|| AppError::NotFound("Order not found.".to_string()))?;
      let payment = tx
        .payment_by_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment record not found for this order.".to_string()))?;
      ctx_data.read().tx.put(tx);

      let mut guard = ctx_data.write();
      guard.order = Some(order);
      guard.payment = Some(payment);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("ensure_payment_openable", |ctx_data: FlowContext<PayPalCreateCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let payment = guard
        .payment
        .as_ref()
        .ok_or_else(|| AppError::Internal("Payment not loaded.".to_string()))?;
      if !payment.status.is_openable() {
        warn!(payment_id = %payment.id, status = %payment.status, "PayPal session requested for a payment that is not open.");
        return Err(AppError::StateConflict(format!(
          "Cannot create PayPal order for payment with status '{}'.",
          payment.status
        )));
      }
      Ok(StepControl::Continue)
    })
  });

  flow.on("request_provider_session", |ctx_data: FlowContext<PayPalCreateCtxData>| {
    Box::pin(async move {
      let (gateway, request) = {
        let guard = ctx_data.read();
        let (Some(order), Some(payment)) = (guard.order.as_ref(), guard.payment.as_ref()) else {
          return Err(AppError::Internal("Order or payment not loaded.".to_string()));
        };
        let request = CheckoutRequest {
          amount: format!("{:.2}", order.total_price.round_dp(2)),
          currency: guard.app_state.config.paypal.currency.clone(),
          description: format!("AgroMarket Order #{}", order.id),
          custom_id: order.id.to_string(),
          invoice_id: format!("INV-{}-{}", order.id, payment.id),
        };
        (guard.app_state.gateway.clone(), request)
      };

      match gateway.create_order(&request).await {
        Ok(session_id) => {
          info!(invoice_id = %request.invoice_id, paypal_order_id = %session_id, "Provider session opened.");
          ctx_data.write().session_id = Some(session_id);
        }
        Err(e) => {
          warn!(invoice_id = %request.invoice_id, error = %e, "Provider session request failed.");
          ctx_data.write().provider_error = Some(e);
        }
      }
      Ok(StepControl::Continue)
    })
  });

  flow.on("persist_payment_state", |ctx_data: FlowContext<PayPalCreateCtxData>| {
    Box::pin(async move {
      let (payment, session_id) = {
        let guard = ctx_data.read();
        (guard.payment.clone(), guard.session_id.clone())
      };
      let Some(mut payment) = payment else {
        return Err(AppError::Internal("Payment not loaded.".to_string()));
      };

      match session_id {
        Some(session_id) => {
          payment.transition(PaymentStatus::PendingPayPal);
          payment.paypal_order_id = Some(session_id);
          payment.payment_method = PAYPAL_METHOD.to_string();
        }
        None => {
          payment.transition(PaymentStatus::Failed);
        }
      }

      let mut tx = ctx_data.read().tx.take()?;
      tx.update_payment(&payment).await?;
      ctx_data.read().tx.put(tx);

      info!(payment_id = %payment.id, status = %payment.status, "Payment state persisted.");
      ctx_data.write().payment = Some(payment);
      Ok(StepControl::Continue)
    })
  });

  flow.on("commit_payment_transaction", |ctx_data: FlowContext<PayPalCreateCtxData>| {
    Box::pin(async move {
      common_steps::commit_transaction(ctx_data.clone()).await?;
      let provider_error = ctx_data.write().provider_error.take();
      match provider_error {
        Some(e) => Err(AppError::from(e)),
        None => Ok(StepControl::Continue),
      }
    })
  });

  registry.register(flow);
  info!("PayPal create-order flow registered.");
}
