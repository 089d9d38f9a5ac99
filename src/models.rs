use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Carts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartEntity {
    pub id: i32,
    pub user_id: i32,
    pub cart_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(belongs_to(CartEntity, foreign_key = cart_id))]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemEntity {
    pub cart_id: i32,
    pub order_date: NaiveDate,
    pub meal_type: String,
    pub dish_id: i32,
    pub seq: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::carts)]
pub struct CreateCartEntity {
    pub user_id: i32,
    pub cart_type: String,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct CreateCartItemEntity {
    pub cart_id: i32,
    pub order_date: NaiveDate,
    pub meal_type: String,
    pub dish_id: i32,
    pub seq: i32,
    pub quantity: i32,
}

// Pay orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::pay_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PayOrderEntity {
    pub id: i32,
    pub user_id: i32,
    pub building: String,
    pub floor: String,
    pub room: String,
    pub meal_time: NaiveDate,
    pub total_cents: i64,
    pub pay_cents: i64,
    pub discount_cents: i64,
    pub payment_method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::pay_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreatePayOrderEntity {
    pub user_id: i32,
    pub building: String,
    pub floor: String,
    pub room: String,
    pub meal_time: NaiveDate,
    pub total_cents: i64,
    pub pay_cents: i64,
    pub discount_cents: i64,
    pub payment_method: String,
    pub status: String,
}

// Orders (one per meal slot)

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub pay_order_id: i32,
    pub order_date: NaiveDate,
    pub meal_type: String,
    pub total_cents: i64,
    pub pay_cents: i64,
    pub discount_cents: i64,
    pub status: String,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub pay_order_id: i32,
    pub order_date: NaiveDate,
    pub meal_type: String,
    pub total_cents: i64,
    pub pay_cents: i64,
    pub discount_cents: i64,
    pub status: String,
}

// Order details (price snapshots, immutable once written)

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(belongs_to(OrderEntity, foreign_key = order_id))]
#[diesel(table_name = crate::schema::order_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderDetailEntity {
    pub id: i32,
    pub order_id: i32,
    pub dish_id: i32,
    pub dish_type: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderDetailEntity {
    pub order_id: i32,
    pub dish_id: i32,
    pub dish_type: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
}
