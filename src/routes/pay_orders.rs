use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    api::{dishes::get_dish_catalog, users},
    billing::{DiscountBudget, line_total_cents},
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    keys::{MealSlot, day_bounds},
    models::{
        CreateOrderDetailEntity, CreateOrderEntity, CreatePayOrderEntity, OrderDetailEntity,
        OrderEntity, PayOrderEntity,
    },
    routes::carts::lock_current_cart,
    schema::{cart_items, order_details, orders, pay_orders},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/pay-orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_pay_orders))
            .routes(utoipa_axum::routes!(get_pay_order))
            .routes(utoipa_axum::routes!(submit_pay_order))
            .routes(utoipa_axum::routes!(cancel_pay_order)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitPayOrderReq {
    pub user_id: i32,
    pub building: String,
    pub floor: String,
    pub room: String,
    pub payment_method: String,
    pub meal_orders: Vec<SubmitMealOrder>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitMealOrder {
    /// Opaque slot key, e.g. `2024-05-01_lunch`.
    pub slot: String,
    pub items: Vec<SubmitLineItem>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitLineItem {
    pub dish_id: i32,
    pub quantity: i32,
}

#[derive(Serialize, ToSchema)]
pub struct SubmitPayOrderRes {
    /// Opaque identifier handed to the downstream payment capture step.
    pub prepare_id: String,
    pub total_cents: i64,
    pub pay_cents: i64,
}

/// One submitted meal order with catalog prices already snapshotted.
struct PricedMealOrder {
    slot: MealSlot,
    total_cents: i64,
    details: Vec<CreateOrderDetailEntity>,
}

/// Convert the user's staged meal selections into one pay order with one
/// child order per meal slot, allocating the daily discount budget and the
/// once-per-day surcharge, then clear the cart. All writes happen in a
/// single transaction; concurrent submissions by the same user serialize on
/// the `FOR UPDATE` read of today's pay orders.
#[utoipa::path(
    post,
    path = "/",
    tags = ["PayOrders"],
    request_body = SubmitPayOrderReq,
    responses(
        (status = 200, description = "Pay order submitted successfully", body = StdResponse<SubmitPayOrderRes, String>)
    )
)]
async fn submit_pay_order(
    State(state): State<AppState>,
    Json(body): Json<SubmitPayOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.meal_orders.is_empty() {
        return Err(AppError::BadRequest("no meal orders submitted".into()));
    }
    for meal_order in &body.meal_orders {
        if meal_order.items.is_empty() {
            return Err(AppError::BadRequest(format!(
                "meal order {} has no line items",
                meal_order.slot
            )));
        }
        for item in &meal_order.items {
            if item.quantity <= 0 {
                return Err(AppError::BadRequest(format!(
                    "dish {} has a non-positive quantity",
                    item.dish_id
                )));
            }
        }
    }

    let slots = body
        .meal_orders
        .iter()
        .map(|meal_order| meal_order.slot.parse::<MealSlot>())
        .collect::<Result<Vec<_>, _>>()?;

    let identity = users::resolve_user(state.http_client.clone(), body.user_id).await?;
    let tier =
        users::get_discount_tier(state.http_client.clone(), identity.discount_tier_id).await?;
    // A single flat daily budget, keyed off the first submitted slot's meal.
    let daily_budget_cents = tier
        .map(|tier| tier.discount_for(slots[0].meal_type))
        .unwrap_or(0);

    let dish_ids: Vec<i32> = body
        .meal_orders
        .iter()
        .flat_map(|meal_order| meal_order.items.iter().map(|item| item.dish_id))
        .collect();
    let catalog = get_dish_catalog(state.http_client.clone(), dish_ids).await?;

    let mut priced_orders = Vec::with_capacity(body.meal_orders.len());
    for (meal_order, slot) in body.meal_orders.iter().zip(slots) {
        let mut total_cents = 0i64;
        let mut details = Vec::with_capacity(meal_order.items.len());
        for item in &meal_order.items {
            let dish = catalog.get(&item.dish_id).ok_or_else(|| {
                AppError::BadRequest(format!("dish {} does not exist", item.dish_id))
            })?;
            total_cents += line_total_cents(dish.price_cents, item.quantity);
            details.push(CreateOrderDetailEntity {
                order_id: 0, // back-filled once the order row exists
                dish_id: dish.id,
                dish_type: dish.dish_type.clone(),
                unit_price_cents: dish.price_cents,
                quantity: item.quantity,
            });
        }
        priced_orders.push(PricedMealOrder {
            slot,
            total_cents,
            details,
        });
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user_id = body.user_id;
    let surcharge_cents = state.surcharge_cents;
    let (pay_order_id, total_cents, pay_cents) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let (day_start, day_end) = day_bounds(Utc::now());
                // Serialization point: blocks concurrent submissions by the
                // same user until this transaction commits or rolls back.
                let todays_orders: Vec<PayOrderEntity> = pay_orders::table
                    .filter(pay_orders::user_id.eq(user_id))
                    .filter(pay_orders::status.eq_any(vec!["NEW", "FINISHED"]))
                    .filter(pay_orders::created_at.ge(day_start))
                    .filter(pay_orders::created_at.lt(day_end))
                    .for_update()
                    .get_results(conn)
                    .await?;

                let spent_today_cents: i64 = todays_orders
                    .iter()
                    .map(|pay_order| pay_order.discount_cents)
                    .sum();
                let mut budget = DiscountBudget::new(
                    daily_budget_cents,
                    spent_today_cents,
                    todays_orders.is_empty(),
                    surcharge_cents,
                );

                let pay_order: PayOrderEntity = diesel::insert_into(pay_orders::table)
                    .values(CreatePayOrderEntity {
                        user_id,
                        building: body.building,
                        floor: body.floor,
                        room: body.room,
                        meal_time: priced_orders[0].slot.order_date,
                        total_cents: 0,
                        pay_cents: 0,
                        discount_cents: 0,
                        payment_method: body.payment_method,
                        status: "NEW".into(),
                    })
                    .returning(PayOrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create pay order")?;

                let mut total_cents = 0i64;
                let mut pay_cents = 0i64;
                let mut discount_cents = 0i64;
                for priced in priced_orders {
                    let amounts = budget.apply(priced.total_cents);

                    let order: OrderEntity = diesel::insert_into(orders::table)
                        .values(CreateOrderEntity {
                            pay_order_id: pay_order.id,
                            order_date: priced.slot.order_date,
                            meal_type: priced.slot.meal_type.as_str().into(),
                            total_cents: amounts.total_cents,
                            pay_cents: amounts.pay_cents,
                            discount_cents: amounts.discount_cents,
                            status: "NEW".into(),
                        })
                        .returning(OrderEntity::as_returning())
                        .get_result(conn)
                        .await
                        .context("Failed to create meal order")?;

                    let details: Vec<CreateOrderDetailEntity> = priced
                        .details
                        .into_iter()
                        .map(|detail| CreateOrderDetailEntity {
                            order_id: order.id,
                            ..detail
                        })
                        .collect();
                    diesel::insert_into(order_details::table)
                        .values(details)
                        .execute(conn)
                        .await
                        .context("Failed to create order details")?;

                    total_cents += amounts.total_cents;
                    pay_cents += amounts.pay_cents;
                    discount_cents += amounts.discount_cents;
                }

                diesel::update(pay_orders::table.find(pay_order.id))
                    .set((
                        pay_orders::total_cents.eq(total_cents),
                        pay_orders::pay_cents.eq(pay_cents),
                        pay_orders::discount_cents.eq(discount_cents),
                        pay_orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await
                    .context("Failed to update pay order totals")?;

                // Clearing an already-empty cart is not an error.
                if let Some(cart) = lock_current_cart(conn, user_id).await? {
                    diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                        .execute(conn)
                        .await
                        .context("Failed to clear cart items")?;
                    diesel::delete(crate::schema::carts::table.find(cart.id))
                        .execute(conn)
                        .await
                        .context("Failed to clear cart")?;
                }

                Ok::<(i32, i64, i64), AppError>((pay_order.id, total_cents, pay_cents))
            })
        })
        .await?;

    let prepare_id = Uuid::new_v4().to_string();
    tracing::info!(
        "Pay order #{} submitted for user {} (total {} cents, pay {} cents)",
        pay_order_id,
        user_id,
        total_cents,
        pay_cents
    );

    Ok(StdResponse {
        data: Some(SubmitPayOrderRes {
            prepare_id,
            total_cents,
            pay_cents,
        }),
        message: Some("Pay order submitted successfully"),
    })
}

/// Cancel a pay order and all of its meal orders in one transaction.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["PayOrders"],
    params(
        ("id" = i32, Path, description = "Pay order ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled pay order successfully", body = StdResponse<PayOrderEntity, String>)
    )
)]
async fn cancel_pay_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cancelled = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cancelled: PayOrderEntity = diesel::update(pay_orders::table.find(id))
                    .set((
                        pay_orders::status.eq("CANCELLED"),
                        pay_orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(PayOrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|err| match err {
                        DieselError::NotFound => AppError::NotFound,
                        _ => err.into(),
                    })?;

                diesel::update(orders::table.filter(orders::pay_order_id.eq(cancelled.id)))
                    .set((
                        orders::status.eq("CANCELLED"),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await
                    .context("Failed to cancel meal orders")?;

                Ok::<PayOrderEntity, AppError>(cancelled)
            })
        })
        .await?;

    tracing::info!("Pay order #{} has been cancelled", cancelled.id);

    Ok(StdResponse {
        data: Some(cancelled),
        message: Some("Cancelled pay order successfully"),
    })
}

#[derive(Serialize, ToSchema)]
pub struct OrderWithDetails {
    pub order: OrderEntity,
    pub details: Vec<OrderDetailEntity>,
}

#[derive(Serialize, ToSchema)]
pub struct GetPayOrderRes {
    pub pay_order: PayOrderEntity,
    pub orders: Vec<OrderWithDetails>,
}

#[derive(Deserialize, IntoParams)]
pub struct UserIdQuery {
    pub user_id: i32,
}

/// Fetch all pay orders belonging to a user, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["PayOrders"],
    params(UserIdQuery),
    responses(
        (status = 200, description = "List pay orders", body = StdResponse<Vec<GetPayOrderRes>, String>)
    )
)]
async fn get_pay_orders(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let pay_order_list: Vec<PayOrderEntity> = pay_orders::table
        .filter(pay_orders::user_id.eq(query.user_id))
        .order_by(pay_orders::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get pay orders")?;

    let pay_order_ids: Vec<i32> = pay_order_list.iter().map(|pay_order| pay_order.id).collect();
    let order_list: Vec<OrderEntity> = orders::table
        .filter(orders::pay_order_id.eq_any(&pay_order_ids))
        .get_results(conn)
        .await
        .context("Failed to get meal orders")?;

    let order_ids: Vec<i32> = order_list.iter().map(|order| order.id).collect();
    let detail_list: Vec<OrderDetailEntity> = order_details::table
        .filter(order_details::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get order details")?;

    let mut details_by_order: HashMap<i32, Vec<OrderDetailEntity>> = HashMap::new();
    for detail in detail_list {
        details_by_order.entry(detail.order_id).or_default().push(detail);
    }

    let mut orders_by_pay_order: HashMap<i32, Vec<OrderWithDetails>> = HashMap::new();
    for order in order_list {
        let details = details_by_order.remove(&order.id).unwrap_or_default();
        orders_by_pay_order
            .entry(order.pay_order_id)
            .or_default()
            .push(OrderWithDetails { order, details });
    }

    let pay_orders_with_children: Vec<GetPayOrderRes> = pay_order_list
        .into_iter()
        .map(|pay_order| {
            let orders = orders_by_pay_order.remove(&pay_order.id).unwrap_or_default();
            GetPayOrderRes { pay_order, orders }
        })
        .collect();

    Ok(StdResponse {
        data: Some(pay_orders_with_children),
        message: Some("Get pay orders successfully"),
    })
}

/// Fetch a single pay order with its meal orders and line items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["PayOrders"],
    params(
        ("id" = i32, Path, description = "Pay order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get pay order successfully", body = StdResponse<GetPayOrderRes, String>)
    )
)]
async fn get_pay_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let pay_order: PayOrderEntity = pay_orders::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => err.into(),
        })?;

    let order_list: Vec<OrderEntity> = orders::table
        .filter(orders::pay_order_id.eq(pay_order.id))
        .get_results(conn)
        .await
        .context("Failed to get meal orders")?;

    let order_ids: Vec<i32> = order_list.iter().map(|order| order.id).collect();
    let detail_list: Vec<OrderDetailEntity> = order_details::table
        .filter(order_details::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get order details")?;

    let mut details_by_order: HashMap<i32, Vec<OrderDetailEntity>> = HashMap::new();
    for detail in detail_list {
        details_by_order.entry(detail.order_id).or_default().push(detail);
    }

    let orders = order_list
        .into_iter()
        .map(|order| {
            let details = details_by_order.remove(&order.id).unwrap_or_default();
            OrderWithDetails { order, details }
        })
        .collect();

    Ok(StdResponse {
        data: Some(GetPayOrderRes { pay_order, orders }),
        message: Some("Get pay order successfully"),
    })
}
