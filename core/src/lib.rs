// agro_flow/src/lib.rs

//! `agro_flow`: a small async step-workflow engine.
//!
//! A [`Flow`] is an ordered list of named steps. Each step carries `before`,
//! `on` and `after` handlers that receive a shared [`FlowContext`] and answer
//! with a [`StepControl`]. A [`FlowRegistry`] keeps one flow per context type so
//! callers only hand over the context they want processed.
//!
//! The marketplace uses flows for every process that writes several records
//! at once (order creation, PayPal create/capture, sign-up). Steps are kept
//! small and named so tracing output reads like the business process.

pub mod context;
pub mod control;
pub mod error;
pub mod flow;
pub mod registry;
pub mod step;

pub use crate::context::FlowContext;
pub use crate::control::{FlowOutcome, StepControl};
pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::{Flow, Handler};
pub use crate::registry::FlowRegistry;
pub use crate::step::{SkipCondition, StepDef};
