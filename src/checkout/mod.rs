//! Client side of checkout: the cart, the address form, a typed client for
//! the storefront API and the orchestrator that sequences order creation,
//! gateway payment and verification.

pub mod address;
pub mod cart;
pub mod client;
pub mod context;
pub mod form;
pub mod machine;

pub use address::{AddressField, AddressForm, FieldErrors};
pub use cart::{Cart, CartItem};
pub use client::{ClientError, HttpStorefrontClient, StorefrontApi};
pub use context::{CheckoutContext, ClientStorage, FileStorage, MemoryStorage, Session, StorageError};
pub use form::{CheckoutForm, PromoOutcome};
pub use machine::{
    CheckoutError, CheckoutOrchestrator, CheckoutState, HostedCheckout, HostedOutcome,
    OrderSummary,
};
