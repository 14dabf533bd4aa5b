use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderItemInput, OrderList},
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, PaymentMethod, ShippingAddress},
    pricing::{self, DeliveryOption, PricedLine, Promo, Totals},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.order_items.is_empty() {
        return Err(AppError::Validation("No order items".into()));
    }
    validate_shipping_address(&payload.shipping_address)?;

    let items = snapshot_items(&payload.order_items)?;
    let promo = payload.promo_code.as_deref().and_then(Promo::parse);
    let lines: Vec<PricedLine> = items
        .iter()
        .map(|item| PricedLine::new(item.price, item.qty))
        .collect();
    let totals = pricing::compute_totals(
        &lines,
        payload.delivery_option,
        payload.protection,
        promo.map(Promo::code),
    );

    if !totals.is_chargeable() {
        return Err(AppError::Validation("Invalid order total".into()));
    }

    if let Some(expected) = payload.expected_total
        && expected != totals.total_price
    {
        tracing::warn!(
            user_id = %user.user_id,
            expected = %expected,
            computed = %totals.total_price,
            "client total differs from server total"
        );
    }

    let minor = MinorTotals::from_totals(&totals)?;
    let now = Utc::now();
    let order_items = serde_json::to_value(&items).map_err(anyhow::Error::from)?;
    let shipping_address =
        serde_json::to_value(&payload.shipping_address).map_err(anyhow::Error::from)?;
    let delivery_notes = payload
        .delivery_notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        order_items: Set(order_items),
        shipping_address: Set(shipping_address),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        promo_code: Set(promo.map(|p| p.code().to_string())),
        delivery_option: Set(payload.delivery_option.as_str().to_string()),
        delivery_notes: Set(delivery_notes),
        items_price: Set(minor.items_price),
        shipping_price: Set(minor.shipping_price),
        protection_price: Set(minor.protection_price),
        discount_price: Set(minor.discount_price),
        total_price: Set(minor.total_price),
        is_paid: Set(false),
        paid_at: Set(None),
        payment_result: Set(None),
        is_delivered: Set(false),
        delivered_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total = %totals.total_price,
        payment_method = payload.payment_method.as_str(),
        "order created"
    );

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_price": totals.total_price }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    list_orders_matching(state, condition, query, "Ok").await
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    list_orders_matching(state, Condition::all(), query, "Orders").await
}

async fn list_orders_matching(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
    message: &str,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    if let Some(paid) = query.paid {
        condition = condition.add(OrderCol::IsPaid.eq(paid));
    }
    if let Some(delivered) = query.delivered {
        condition = condition.add(OrderCol::IsDelivered.eq(delivered));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        message,
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Owner or admin only.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = find_order(state, id).await?;
    if order.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden("Not authorized".into()));
    }

    Ok(ApiResponse::success(
        "OK",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

/// Marking an already-delivered order again leaves `delivered_at` untouched.
pub async fn mark_delivered(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    find_order(state, id).await?;

    let now = Utc::now();
    let result = Orders::update_many()
        .set(OrderActive {
            is_delivered: Set(true),
            delivered_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        })
        .filter(OrderCol::Id.eq(id))
        .filter(OrderCol::IsDelivered.eq(false))
        .exec(&state.orm)
        .await?;

    if result.rows_affected > 0 {
        tracing::info!(order_id = %id, admin_id = %user.user_id, "order delivered");
        audit::record(
            &state.orm,
            Some(user.user_id),
            "order_delivered",
            "orders",
            serde_json::json!({ "order_id": id }),
        )
        .await;
    }

    let order = find_order(state, id).await?;
    Ok(ApiResponse::success(
        "Order delivered",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub(crate) async fn find_order(state: &AppState, id: Uuid) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    match order {
        Some(o) => Ok(o),
        None => Err(AppError::NotFound("Order not found".into())),
    }
}

fn snapshot_items(inputs: &[OrderItemInput]) -> AppResult<Vec<OrderItem>> {
    inputs
        .iter()
        .map(|input| {
            let product = input.product.trim();
            if product.is_empty() {
                return Err(AppError::Validation(
                    "One or more items are missing product IDs.".into(),
                ));
            }
            Ok(OrderItem {
                product: product.to_string(),
                name: input.name.trim().to_string(),
                qty: input.qty.unwrap_or(1).max(1),
                price: pricing::sanitize_price(&input.price),
                image: input.image.trim().to_string(),
            })
        })
        .collect()
}

fn validate_shipping_address(address: &ShippingAddress) -> AppResult<()> {
    let required = [
        ("name", &address.name),
        ("address", &address.address),
        ("city", &address.city),
        ("postal_code", &address.postal_code),
        ("country", &address.country),
        ("phone", &address.phone),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Shipping address is missing: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

struct MinorTotals {
    items_price: i64,
    shipping_price: i64,
    protection_price: i64,
    discount_price: i64,
    total_price: i64,
}

impl MinorTotals {
    fn from_totals(totals: &Totals) -> AppResult<Self> {
        let minor = |amount: Decimal| {
            pricing::to_minor(amount)
                .ok_or_else(|| AppError::Validation("Order total is out of range".into()))
        };
        Ok(Self {
            items_price: minor(totals.items_price)?,
            shipping_price: minor(totals.shipping_price)?,
            protection_price: minor(totals.protection_price)?,
            discount_price: minor(totals.discount_price)?,
            total_price: minor(totals.total_price)?,
        })
    }
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let decode = |what: &str, err: serde_json::Error| {
        AppError::Internal(anyhow::anyhow!("order {} has malformed {}: {}", model.id, what, err))
    };

    let order_items: Vec<OrderItem> = serde_json::from_value(model.order_items.clone())
        .map_err(|e| decode("order_items", e))?;
    let shipping_address: ShippingAddress = serde_json::from_value(model.shipping_address.clone())
        .map_err(|e| decode("shipping_address", e))?;
    let payment_result = model
        .payment_result
        .clone()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| decode("payment_result", e))?;
    let payment_method = PaymentMethod::parse(&model.payment_method).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has unknown payment method {}",
            model.id,
            model.payment_method
        ))
    })?;
    let delivery_option = DeliveryOption::parse(&model.delivery_option).unwrap_or_default();

    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        order_items,
        shipping_address,
        payment_method,
        promo_code: model.promo_code.as_deref().and_then(Promo::parse),
        delivery_option,
        delivery_notes: model.delivery_notes,
        items_price: pricing::from_minor(model.items_price),
        shipping_price: pricing::from_minor(model.shipping_price),
        protection_price: pricing::from_minor(model.protection_price),
        discount_price: pricing::from_minor(model.discount_price),
        total_price: pricing::from_minor(model.total_price),
        is_paid: model.is_paid,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        payment_result,
        is_delivered: model.is_delivered,
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
