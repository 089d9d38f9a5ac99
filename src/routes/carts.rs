use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api::dishes::get_dish_catalog,
    billing::line_total_cents,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    keys::{CartItemKey, MealSlot, is_stale},
    models::{CartEntity, CartItemEntity, CreateCartEntity, CreateCartItemEntity},
    schema::{cart_items, carts},
};

const ORDERING: &str = "ORDERING";

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart))
            .routes(utoipa_axum::routes!(modify_cart)),
    )
}

#[derive(Serialize, ToSchema)]
pub struct GetCartRes {
    /// Opaque item key (`date_mealType_dishId_seq`) to staged quantity.
    pub items: HashMap<String, i32>,
    pub total_cents: i64,
    pub total_items: i32,
}

#[derive(Deserialize, IntoParams)]
pub struct UserIdQuery {
    pub user_id: i32,
}

/// Rebuilds the display shape of a cart: its item map plus running totals,
/// priced from the current catalog. Read-side only.
async fn build_cart_view(
    client: reqwest::Client,
    items: Vec<CartItemEntity>,
) -> Result<GetCartRes, AppError> {
    let dish_ids: Vec<i32> = items.iter().map(|item| item.dish_id).collect();
    let catalog = get_dish_catalog(client, dish_ids).await?;

    let mut total_cents = 0i64;
    let mut total_items = 0i32;
    let mut item_map = HashMap::new();
    for item in items {
        let unit_price = catalog
            .get(&item.dish_id)
            .map(|dish| dish.price_cents)
            .unwrap_or(0);
        total_cents += line_total_cents(unit_price, item.quantity);
        total_items += item.quantity;

        let key = CartItemKey {
            slot: MealSlot {
                order_date: item.order_date,
                meal_type: item
                    .meal_type
                    .parse()
                    .context("Stored cart item has an invalid meal type")?,
            },
            dish_id: item.dish_id,
            seq: item.seq,
        };
        item_map.insert(key.to_string(), item.quantity);
    }

    Ok(GetCartRes {
        items: item_map,
        total_cents,
        total_items,
    })
}

/// Fetch the user's current ordering cart, purging it first if it was
/// created before today. A stale cart's lines are never returned.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Carts"],
    params(UserIdQuery),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<GetCartRes, String>)
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user_id = query.user_id;
    let items = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cart = lock_current_cart(conn, user_id).await?;
                let items = match cart {
                    Some(cart) => {
                        cart_items::table
                            .filter(cart_items::cart_id.eq(cart.id))
                            .get_results(conn)
                            .await
                            .context("Failed to get cart items")?
                    }
                    None => Vec::new(),
                };
                Ok::<Vec<CartItemEntity>, AppError>(items)
            })
        })
        .await?;

    let view = build_cart_view(state.http_client, items).await?;

    Ok(StdResponse {
        data: Some(view),
        message: Some("Get cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct ModifyCartReq {
    pub user_id: i32,
    /// Opaque item key, e.g. `2024-05-01_lunch_42_1`.
    pub item_id: String,
    /// Desired quantity; zero removes the line.
    pub quantity: i32,
}

/// Stage, change or remove one cart line. Creates the day's cart on first
/// use and purges yesterday's cart before touching anything.
#[utoipa::path(
    put,
    path = "/items",
    tags = ["Carts"],
    request_body = ModifyCartReq,
    responses(
        (status = 200, description = "Cart modified successfully", body = StdResponse<GetCartRes, String>)
    )
)]
async fn modify_cart(
    State(state): State<AppState>,
    Json(body): Json<ModifyCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let key: CartItemKey = body.item_id.parse()?;
    if body.quantity < 0 {
        return Err(AppError::BadRequest("quantity must not be negative".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user_id = body.user_id;
    let quantity = body.quantity;
    let items = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cart = match lock_current_cart(conn, user_id).await? {
                    Some(cart) => cart,
                    None => {
                        // A concurrent first-of-the-day request may insert the
                        // cart between our lock-read and this insert; let it
                        // win and lock whichever row survives.
                        diesel::insert_into(carts::table)
                            .values(CreateCartEntity {
                                user_id,
                                cart_type: ORDERING.into(),
                            })
                            .on_conflict((carts::user_id, carts::cart_type))
                            .do_nothing()
                            .execute(conn)
                            .await
                            .context("Failed to create cart")?;

                        carts::table
                            .filter(carts::user_id.eq(user_id))
                            .filter(carts::cart_type.eq(ORDERING))
                            .for_update()
                            .get_result(conn)
                            .await?
                    }
                };

                let meal_type = key.slot.meal_type.as_str().to_string();
                if quantity == 0 {
                    diesel::delete(cart_items::table.find((
                        cart.id,
                        key.slot.order_date,
                        meal_type,
                        key.dish_id,
                        key.seq,
                    )))
                    .execute(conn)
                    .await
                    .context("Failed to remove cart item")?;
                } else {
                    diesel::insert_into(cart_items::table)
                        .values(CreateCartItemEntity {
                            cart_id: cart.id,
                            order_date: key.slot.order_date,
                            meal_type,
                            dish_id: key.dish_id,
                            seq: key.seq,
                            quantity,
                        })
                        .on_conflict((
                            cart_items::cart_id,
                            cart_items::order_date,
                            cart_items::meal_type,
                            cart_items::dish_id,
                            cart_items::seq,
                        ))
                        .do_update()
                        .set((
                            cart_items::quantity.eq(quantity),
                            cart_items::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await
                        .context("Failed to upsert cart item")?;
                }

                diesel::update(carts::table.find(cart.id))
                    .set(carts::updated_at.eq(diesel::dsl::now))
                    .execute(conn)
                    .await
                    .context("Failed to update cart timestamp")?;

                let items: Vec<CartItemEntity> = cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .get_results(conn)
                    .await
                    .context("Failed to get updated cart items")?;

                Ok::<Vec<CartItemEntity>, AppError>(items)
            })
        })
        .await?;

    let view = build_cart_view(state.http_client, items).await?;

    Ok(StdResponse {
        data: Some(view),
        message: Some("Cart modified successfully"),
    })
}

/// Lock-reads the user's ordering cart (`FOR UPDATE`). A cart created before
/// the start of the current day is deleted along with its lines and reported
/// as absent.
pub async fn lock_current_cart(
    conn: &mut diesel_async::AsyncPgConnection,
    user_id: i32,
) -> Result<Option<CartEntity>, AppError> {
    let cart: Option<CartEntity> = carts::table
        .filter(carts::user_id.eq(user_id))
        .filter(carts::cart_type.eq(ORDERING))
        .for_update()
        .get_result(conn)
        .await
        .optional()?;

    let Some(cart) = cart else {
        return Ok(None);
    };

    if is_stale(cart.created_at, Utc::now()) {
        diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
            .execute(conn)
            .await
            .context("Failed to purge stale cart items")?;
        diesel::delete(carts::table.find(cart.id))
            .execute(conn)
            .await
            .context("Failed to purge stale cart")?;
        tracing::info!("Purged stale cart #{} for user {}", cart.id, user_id);
        return Ok(None);
    }

    Ok(Some(cart))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_creation_tolerates_a_concurrent_insert() {
        let stmt = diesel::insert_into(carts::table)
            .values(CreateCartEntity {
                user_id: 7,
                cart_type: ORDERING.into(),
            })
            .on_conflict((carts::user_id, carts::cart_type))
            .do_nothing();
        let sql = diesel::debug_query::<diesel::pg::Pg, _>(&stmt).to_string();
        assert!(sql.contains("ON CONFLICT"), "{sql}");
        assert!(sql.contains("DO NOTHING"), "{sql}");
    }
}
