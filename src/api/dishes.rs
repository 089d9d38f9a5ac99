use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::api::ApiUrls;
use crate::core::app_error::AppError;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Dish {
    pub id: i32,
    pub name: String,
    pub dish_type: String,
    pub price_cents: i64,
}

/// Fetches the current price catalog entries for the given dish ids. Dishes
/// unknown to the catalog are simply absent from the returned map; callers
/// decide whether that is an error.
pub async fn get_dish_catalog(
    client: Client,
    ids: Vec<i32>,
) -> Result<HashMap<i32, Dish>, AppError> {
    let ids_query = ids
        .into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let url = ApiUrls::get_catalog_service_url();
    let dishes: Vec<Dish> = client
        .get(format!("{}/dishes", url))
        .query(&[("ids", ids_query)])
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("CatalogService".into()))?
        .json()
        .await
        .context("Failed to parse JSON")?;

    let catalog: HashMap<i32, Dish> = dishes.into_iter().map(|d| (d.id, d)).collect();

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_catalog_surfaces_as_service_unreachable() {
        // Port 9 (discard) refuses connections immediately.
        unsafe { std::env::set_var("CATALOG_SERVICE_URL", "http://127.0.0.1:9") };

        let err = get_dish_catalog(Client::new(), vec![1, 2])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ServiceUnreachable(_)), "{err:?}");
    }
}
