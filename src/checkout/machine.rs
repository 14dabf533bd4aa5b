//! Checkout as an explicit state machine.
//!
//! ```text
//! Idle -> ValidatingAddress -> CreatingOrder -> CreatingPaymentSession
//!      -> AwaitingGatewayUi -> VerifyingPayment -> Done
//! ```
//!
//! Cash-on-delivery orders go straight from `CreatingOrder` to `Done`, once
//! the server's total matches the one shown or has been acknowledged.
//! Once an order exists it is remembered together with the inputs that
//! produced it; resubmitting the same inputs resumes from the step that
//! failed, while any change to them discards the order and its session.
//! Dropping a `submit` future mid-flight is a cancellation: the remembered
//! order stays unpaid and the next submit resumes from the last finished
//! step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Order, OrderItem, PaymentMethod};

use super::{
    address::FieldErrors,
    client::{ClientError, StorefrontApi},
    context::{CheckoutContext, ClientStorage},
    form::CheckoutForm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    ValidatingAddress,
    CreatingOrder,
    CreatingPaymentSession,
    AwaitingGatewayUi,
    VerifyingPayment,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostedOutcome {
    Completed,
    Failed(String),
}

/// The gateway's hosted payment page. Suspends until the shopper finishes or
/// abandons it.
#[async_trait]
pub trait HostedCheckout: Send + Sync {
    async fn present(&self, payment_session_id: &str, order_id: Uuid) -> HostedOutcome;
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Please sign in to place an order.")]
    NotSignedIn,

    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("{0}")]
    InvalidAddress(FieldErrors),

    #[error("{0}")]
    InvalidItems(&'static str),

    #[error("Order total must be greater than zero.")]
    NonPositiveTotal,

    #[error("Order total changed from {expected} to {actual}. Please review and confirm.")]
    TotalMismatch { expected: Decimal, actual: Decimal },

    #[error("{0}")]
    PaymentFailed(String),

    #[error("Payment not completed. Please try again.")]
    PaymentNotCompleted { status: Option<String> },

    #[error(transparent)]
    Api(#[from] ClientError),
}

impl CheckoutError {
    /// Whether submitting again, unchanged, can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::PaymentFailed(_)
                | CheckoutError::PaymentNotCompleted { .. }
                | CheckoutError::Api(ClientError::Network(_))
        )
    }
}

/// What the confirmation page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub total: Decimal,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub is_paid: bool,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            total: order.total_price,
            items: order.order_items.clone(),
            payment_method: order.payment_method,
            created_at: order.created_at,
            is_paid: order.is_paid,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingOrder {
    order: Order,
    inputs: Value,
    shown_total: Decimal,
    session_id: Option<String>,
    total_confirmed: bool,
    resume: CheckoutState,
}

pub struct CheckoutOrchestrator<A, H> {
    api: A,
    hosted: H,
    state: CheckoutState,
    pending: Option<PendingOrder>,
}

impl<A: StorefrontApi, H: HostedCheckout> CheckoutOrchestrator<A, H> {
    pub fn new(api: A, hosted: H) -> Self {
        Self {
            api,
            hosted,
            state: CheckoutState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn pending_order_id(&self) -> Option<Uuid> {
        self.pending.as_ref().map(|p| p.order.id)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Accept the server's total after a [`CheckoutError::TotalMismatch`].
    pub fn acknowledge_total(&mut self) -> bool {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.total_confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Stop where we are. The remembered order, if any, is kept unpaid so an
    /// identical resubmit reuses it.
    pub fn cancel(&mut self) {
        if let Some(pending) = &self.pending {
            tracing::info!(order_id = %pending.order.id, "checkout cancelled");
        }
        self.state = CheckoutState::Idle;
    }

    /// Forget the remembered order entirely.
    pub fn reset(&mut self) {
        self.pending = None;
        self.state = CheckoutState::Idle;
    }

    pub async fn submit<S: ClientStorage>(
        &mut self,
        ctx: &mut CheckoutContext<S>,
        form: &CheckoutForm,
    ) -> Result<OrderSummary, CheckoutError> {
        self.state = CheckoutState::ValidatingAddress;
        let (token, inputs, preview_total) = match Self::validate(ctx, form) {
            Ok(ready) => ready,
            Err(err) => {
                self.state = CheckoutState::Idle;
                return Err(err);
            }
        };

        let stale = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.inputs != inputs);
        if stale {
            tracing::debug!("checkout inputs changed, discarding pending order");
            self.pending = None;
        }
        self.state = self
            .pending
            .as_ref()
            .map_or(CheckoutState::CreatingOrder, |p| p.resume);

        loop {
            let step = match self.state {
                CheckoutState::CreatingOrder => {
                    self.create_order(&token, form, ctx, inputs.clone(), preview_total)
                        .await
                }
                CheckoutState::CreatingPaymentSession => self.create_session(&token, form).await,
                CheckoutState::AwaitingGatewayUi => self.await_gateway().await,
                CheckoutState::VerifyingPayment => self.verify(&token).await,
                CheckoutState::Done => match self.check_total() {
                    Ok(()) => return self.finish(ctx).await,
                    Err(err) => Err(err),
                },
                CheckoutState::Idle | CheckoutState::ValidatingAddress => {
                    Ok(CheckoutState::CreatingOrder)
                }
            };

            match step {
                Ok(next) => self.advance(next),
                Err(err) => {
                    // A COD order waiting on total confirmation has nothing in flight.
                    self.state = match self.pending.as_ref().map(|p| p.resume) {
                        Some(CheckoutState::Done) | None => CheckoutState::Idle,
                        Some(resume) => resume,
                    };
                    return Err(err);
                }
            }
        }
    }

    fn validate<S: ClientStorage>(
        ctx: &CheckoutContext<S>,
        form: &CheckoutForm,
    ) -> Result<(String, Value, Decimal), CheckoutError> {
        let token = ctx
            .token()
            .map(str::to_string)
            .ok_or(CheckoutError::NotSignedIn)?;
        if ctx.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        form.address
            .validate()
            .map_err(CheckoutError::InvalidAddress)?;
        if let Some(problem) = ctx.cart.item_problem() {
            return Err(CheckoutError::InvalidItems(problem));
        }

        let totals = form.preview(&ctx.cart);
        if !totals.is_chargeable() {
            return Err(CheckoutError::NonPositiveTotal);
        }

        // Every input that reaches the order, without the displayed total.
        let mut request = form.order_request(&ctx.cart, totals.total_price);
        request.expected_total = None;
        let inputs = serde_json::to_value(&request)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok((token, inputs, totals.total_price))
    }

    fn advance(&mut self, next: CheckoutState) {
        tracing::debug!(from = ?self.state, to = ?next, "checkout transition");
        self.state = next;
        if let Some(pending) = self.pending.as_mut()
            && next != CheckoutState::Done
        {
            pending.resume = next;
        }
    }

    async fn create_order<S: ClientStorage>(
        &mut self,
        token: &str,
        form: &CheckoutForm,
        ctx: &CheckoutContext<S>,
        inputs: Value,
        preview_total: Decimal,
    ) -> Result<CheckoutState, CheckoutError> {
        let request = form.order_request(&ctx.cart, preview_total);
        let order = self.api.create_order(token, &request).await?;
        tracing::info!(order_id = %order.id, total = %order.total_price, "order created");

        let total_confirmed = order.total_price == preview_total;
        let cod = order.payment_method == PaymentMethod::Cod;
        let next = if cod {
            CheckoutState::Done
        } else {
            CheckoutState::CreatingPaymentSession
        };
        self.pending = Some(PendingOrder {
            order,
            inputs,
            shown_total: preview_total,
            session_id: None,
            total_confirmed,
            resume: next,
        });
        Ok(next)
    }

    async fn create_session(
        &mut self,
        token: &str,
        form: &CheckoutForm,
    ) -> Result<CheckoutState, CheckoutError> {
        self.check_total()?;
        let order_id = self.pending_mut()?.order.id;

        let session = self
            .api
            .create_payment_session(token, &form.session_request(order_id))
            .await?;
        self.pending_mut()?.session_id = Some(session.payment_session_id);
        Ok(CheckoutState::AwaitingGatewayUi)
    }

    async fn await_gateway(&mut self) -> Result<CheckoutState, CheckoutError> {
        let pending = self.pending_mut()?;
        let order_id = pending.order.id;
        let Some(session_id) = pending.session_id.clone() else {
            return Ok(CheckoutState::CreatingPaymentSession);
        };

        match self.hosted.present(&session_id, order_id).await {
            HostedOutcome::Completed => Ok(CheckoutState::VerifyingPayment),
            HostedOutcome::Failed(message) => {
                tracing::warn!(order_id = %order_id, %message, "hosted payment failed");
                let pending = self.pending_mut()?;
                pending.session_id = None;
                pending.resume = CheckoutState::CreatingPaymentSession;
                let message = if message.trim().is_empty() {
                    "Payment failed.".to_string()
                } else {
                    message
                };
                Err(CheckoutError::PaymentFailed(message))
            }
        }
    }

    async fn verify(&mut self, token: &str) -> Result<CheckoutState, CheckoutError> {
        let order_id = self.pending_mut()?.order.id;
        match self.api.verify_payment(token, order_id).await {
            Ok(order) if order.is_paid => {
                self.pending_mut()?.order = order;
                Ok(CheckoutState::Done)
            }
            Ok(_) => {
                self.pending_mut()?.resume = CheckoutState::AwaitingGatewayUi;
                Err(CheckoutError::PaymentNotCompleted { status: None })
            }
            Err(err) if err.is_payment_not_completed() => {
                self.pending_mut()?.resume = CheckoutState::AwaitingGatewayUi;
                Err(CheckoutError::PaymentNotCompleted {
                    status: err.gateway_status(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn finish<S: ClientStorage>(
        &mut self,
        ctx: &mut CheckoutContext<S>,
    ) -> Result<OrderSummary, CheckoutError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| ClientError::Decode("no order to finish".into()))?;
        let summary = OrderSummary::from(&pending.order);

        ctx.cart.clear();
        ctx.last_order_id = Some(summary.order_id);
        if let Err(err) = ctx.persist().await {
            tracing::warn!(error = %err, "failed to persist cleared cart");
        }

        self.state = CheckoutState::Done;
        tracing::info!(order_id = %summary.order_id, paid = summary.is_paid, "checkout finished");
        Ok(summary)
    }

    /// Nothing is charged or finalized at a total the shopper has not seen.
    fn check_total(&self) -> Result<(), CheckoutError> {
        match &self.pending {
            Some(pending) if !pending.total_confirmed => Err(CheckoutError::TotalMismatch {
                expected: pending.shown_total,
                actual: pending.order.total_price,
            }),
            _ => Ok(()),
        }
    }

    fn pending_mut(&mut self) -> Result<&mut PendingOrder, CheckoutError> {
        self.pending
            .as_mut()
            .ok_or_else(|| ClientError::Decode("no pending order".into()).into())
    }
}
