use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        orders::{CreateOrderRequest, OrderItemInput, OrderList},
        payments::{
            MockPaymentRequest, PaymentSessionRequest, PaymentSessionResponse, VerifyPaymentRequest,
        },
    },
    models::{Order, OrderItem, PaymentMethod, PaymentResult, ShippingAddress, User},
    pricing::{DeliveryOption, Promo},
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, params, payments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        orders::create_order,
        orders::list_my_orders,
        orders::list_all_orders,
        orders::get_order,
        orders::mark_delivered,
        payments::mock_pay,
        payments::create_session,
        payments::verify
    ),
    components(
        schemas(
            User,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            Order,
            OrderItem,
            OrderItemInput,
            ShippingAddress,
            PaymentMethod,
            PaymentResult,
            DeliveryOption,
            Promo,
            CreateOrderRequest,
            OrderList,
            MockPaymentRequest,
            PaymentSessionRequest,
            PaymentSessionResponse,
            VerifyPaymentRequest,
            health::HealthData,
            params::SortOrder,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<PaymentSessionResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Payments", description = "Mock and Cashfree payment endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
