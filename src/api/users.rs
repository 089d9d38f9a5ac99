use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::api::ApiUrls;
use crate::core::app_error::{AppError, StdResponse};
use crate::keys::MealType;

#[derive(Serialize, Deserialize, Debug)]
pub struct UserIdentity {
    pub id: i32,
    pub phone_number: String,
    pub discount_tier_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DiscountTier {
    pub id: i32,
    pub name: String,
    pub breakfast_discount_cents: i64,
    pub lunch_discount_cents: i64,
    pub dinner_discount_cents: i64,
}

impl DiscountTier {
    pub fn discount_for(&self, meal_type: MealType) -> i64 {
        match meal_type {
            MealType::Breakfast => self.breakfast_discount_cents,
            MealType::Lunch => self.lunch_discount_cents,
            MealType::Dinner => self.dinner_discount_cents,
        }
    }
}

pub async fn resolve_user(client: Client, user_id: i32) -> Result<UserIdentity, AppError> {
    let url = ApiUrls::get_accounts_service_url();
    let user: StdResponse<UserIdentity, String> = client
        .get(format!("{}/users/{}", url, user_id))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("AccountsService".into()))?
        .json()
        .await
        .context("Failed to parse JSON")?;

    match user.data {
        Some(user) => Ok(user),
        None => Err(AppError::NotFound),
    }
}

/// Looks up the discount policy for a tier. Tier id 0 means the user has no
/// tier and therefore no discount budget.
pub async fn get_discount_tier(
    client: Client,
    tier_id: i32,
) -> Result<Option<DiscountTier>, AppError> {
    if tier_id == 0 {
        return Ok(None);
    }

    let url = ApiUrls::get_accounts_service_url();
    let tier: StdResponse<DiscountTier, String> = client
        .get(format!("{}/discount-tiers/{}", url, tier_id))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("AccountsService".into()))?
        .json()
        .await
        .context("Failed to parse JSON")?;

    Ok(tier.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tier_zero_needs_no_lookup() {
        let tier = get_discount_tier(Client::new(), 0).await.unwrap();
        assert!(tier.is_none());
    }

    #[tokio::test]
    async fn unreachable_accounts_service_surfaces_as_service_unreachable() {
        unsafe { std::env::set_var("ACCOUNTS_SERVICE_URL", "http://127.0.0.1:9") };

        let err = get_discount_tier(Client::new(), 3).await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnreachable(_)), "{err:?}");
    }
}
