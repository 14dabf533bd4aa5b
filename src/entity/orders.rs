use sea_orm::entity::prelude::*;

/// An order document. Line items, the shipping address and the gateway
/// payment result are stored as JSON; prices are integer paise.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_items: Json,
    pub shipping_address: Json,
    pub payment_method: String,
    pub promo_code: Option<String>,
    pub delivery_option: String,
    pub delivery_notes: Option<String>,
    pub items_price: i64,
    pub shipping_price: i64,
    pub protection_price: i64,
    pub discount_price: i64,
    pub total_price: i64,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub payment_result: Option<Json>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
