pub mod cashfree;
pub mod gateway;

pub use cashfree::CashfreeGateway;
pub use gateway::{
    CustomerDetails, GatewayError, GatewaySession, PAID_STATUS, PaymentGateway, RemoteOrder,
    SessionRequest,
};
