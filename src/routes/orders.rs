use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::{OrderDetailEntity, OrderEntity},
    schema::{order_details, orders},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(deliver_order)),
    )
}

#[derive(Serialize, ToSchema)]
struct GetOrderRes {
    pub order: OrderEntity,
    pub details: Vec<OrderDetailEntity>,
}

/// Fetch a single meal order with its line items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<GetOrderRes, String>)
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => err.into(),
        })?;

    let details: Vec<OrderDetailEntity> = order_details::table
        .filter(order_details::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get order details")?;

    Ok(StdResponse {
        data: Some(GetOrderRes { order, details }),
        message: Some("Get order successfully"),
    })
}

/// Mark a single meal order as delivered. The parent pay order is not
/// affected.
#[utoipa::path(
    patch,
    path = "/{id}/deliver",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to mark as delivered")
    ),
    responses(
        (status = 200, description = "Order delivered successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn deliver_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let delivered: OrderEntity = diesel::update(orders::table.find(id))
        .set((
            orders::status.eq("FINISHED"),
            orders::delivered_at.eq(diesel::dsl::now),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => err.into(),
        })?;

    tracing::info!("Order #{} has been delivered", delivered.id);

    Ok(StdResponse {
        data: Some(delivered),
        message: Some("Order delivered successfully"),
    })
}
