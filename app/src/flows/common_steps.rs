// agro_market/src/flows/common_steps.rs

//! Steps and helpers shared by several flows.

use crate::errors::{AppError, Result as AppResult};
use crate::flows::contexts::{OrderLineInput, PricedLine, Transactional};
use crate::store::StoreTx;
use agro_flow::{FlowContext, StepControl};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{event, warn, Level};
use uuid::Uuid;

pub async fn begin_transaction<T: Transactional>(ctx_data: FlowContext<T>) -> AppResult<StepControl> {
  let store = ctx_data.read().store();
  let tx = store.begin().await?;
  ctx_data.read().tx_slot().put(tx);
  event!(Level::DEBUG, "Transaction opened.");
  Ok(StepControl::Continue)
}

pub async fn commit_transaction<T: Transactional>(ctx_data: FlowContext<T>) -> AppResult<StepControl> {
  let tx = ctx_data.read().tx_slot().take()?;
  tx.commit().await?;
  event!(Level::DEBUG, "Transaction committed.");
  Ok(StepControl::Continue)
}

/// Resolves each line's product, captures its current price and checks that
/// the summed quantity per product is in stock. Reads only.
pub async fn price_lines(tx: &mut dyn StoreTx, lines: &[OrderLineInput]) -> AppResult<Vec<PricedLine>> {
  // Summed in i64 so repeated large lines cannot overflow.
  let mut requested: HashMap<Uuid, i64> = HashMap::new();
  for line in lines {
    *requested.entry(line.product_id).or_default() += i64::from(line.quantity);
  }

  let mut priced = Vec::with_capacity(lines.len());
  for line in lines {
    let product = tx
      .product_by_id(line.product_id)
      .await?
      .ok_or_else(|| AppError::Validation(format!("Invalid product id \"{}\".", line.product_id)))?;

    let wanted = requested.get(&product.id).copied().unwrap_or(i64::from(line.quantity));
    if wanted > i64::from(product.quantity) {
      warn!(product_id = %product.id, wanted, available = product.quantity, "Insufficient stock.");
      return Err(AppError::InsufficientStock {
        product: product.name,
        available: product.quantity,
      });
    }

    priced.push(PricedLine {
      product_id: product.id,
      product_name: product.name,
      quantity: line.quantity,
      unit_price: product.price,
    });
  }
  Ok(priced)
}

pub fn total_of(lines: &[PricedLine]) -> Decimal {
  lines.iter().map(PricedLine::line_total).sum()
}

/// Takes the stock for every line through the store's conditional decrement.
/// A refused decrement means stock moved since it was priced; the current
/// availability is re-read for the error.
pub async fn reserve_stock(tx: &mut dyn StoreTx, lines: &[PricedLine]) -> AppResult<()> {
  for line in lines {
    if tx.decrement_stock(line.product_id, line.quantity).await? {
      continue;
    }
    let available = tx
      .product_by_id(line.product_id)
      .await?
      .map(|p| p.quantity)
      .unwrap_or(0);
    warn!(product_id = %line.product_id, requested = line.quantity, available, "Conditional stock decrement refused.");
    return Err(AppError::InsufficientStock {
      product: line.product_name.clone(),
      available,
    });
  }
  Ok(())
}
