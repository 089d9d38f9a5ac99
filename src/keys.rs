//! Structured forms of the opaque keys used on the wire.
//!
//! Cart lines and submitted meal orders are addressed by string keys of the
//! shape `2024-05-01_lunch` (a meal slot) and `2024-05-01_lunch_42_1` (a cart
//! item). They are parsed exactly once at the HTTP boundary; everything
//! downstream works with the typed forms.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use thiserror::Error;

use crate::core::app_error::AppError;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed key {0:?}")]
pub struct KeyParseError(pub String);

impl From<KeyParseError> for AppError {
    fn from(err: KeyParseError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl FromStr for MealType {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            _ => Err(KeyParseError(s.to_string())),
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per-meal order slot: a calendar date plus a meal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MealSlot {
    pub order_date: NaiveDate,
    pub meal_type: MealType,
}

impl FromStr for MealSlot {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        let [date, meal] = parts.as_slice() else {
            return Err(KeyParseError(s.to_string()));
        };
        let order_date =
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| KeyParseError(s.to_string()))?;
        let meal_type = meal.parse()?;
        Ok(MealSlot {
            order_date,
            meal_type,
        })
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.order_date.format("%Y-%m-%d"), self.meal_type)
    }
}

/// Identifies one cart line: a meal slot, a dish, and a sequence number
/// disambiguating repeated dishes within the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CartItemKey {
    pub slot: MealSlot,
    pub dish_id: i32,
    pub seq: i32,
}

impl FromStr for CartItemKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        let [date, meal, dish, seq] = parts.as_slice() else {
            return Err(KeyParseError(s.to_string()));
        };
        let slot: MealSlot = format!("{date}_{meal}").parse()?;
        let dish_id = dish.parse().map_err(|_| KeyParseError(s.to_string()))?;
        let seq = seq.parse().map_err(|_| KeyParseError(s.to_string()))?;
        Ok(CartItemKey { slot, dish_id, seq })
    }
}

impl fmt::Display for CartItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.slot, self.dish_id, self.seq)
    }
}

/// UTC day window `[start, end)` containing `now`. The discount budget,
/// the one-per-day surcharge and cart staleness are all scoped to it.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + TimeDelta::days(1))
}

/// A cart created before the start of the current day must be purged and
/// never reused.
pub fn is_stale(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    created_at < day_bounds(now).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_meal_slot() {
        let slot: MealSlot = "2024-05-01_lunch".parse().unwrap();
        assert_eq!(slot.order_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(slot.meal_type, MealType::Lunch);
        assert_eq!(slot.to_string(), "2024-05-01_lunch");
    }

    #[test]
    fn parses_cart_item_key() {
        let key: CartItemKey = "2024-05-01_breakfast_42_2".parse().unwrap();
        assert_eq!(key.slot.meal_type, MealType::Breakfast);
        assert_eq!(key.dish_id, 42);
        assert_eq!(key.seq, 2);
        assert_eq!(key.to_string(), "2024-05-01_breakfast_42_2");
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!("".parse::<MealSlot>().is_err());
        assert!("2024-05-01".parse::<MealSlot>().is_err());
        assert!("2024-13-01_lunch".parse::<MealSlot>().is_err());
        assert!("2024-05-01_brunch".parse::<MealSlot>().is_err());
        assert!("2024-05-01_lunch_42".parse::<CartItemKey>().is_err());
        assert!("2024-05-01_lunch_x_1".parse::<CartItemKey>().is_err());
        assert!("2024-05-01_lunch_42_1_9".parse::<CartItemKey>().is_err());
    }

    #[test]
    fn carts_go_stale_at_the_day_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap();

        // Created yesterday, even one second before midnight: stale.
        assert!(is_stale(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), now));
        assert!(is_stale(Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap(), now));

        // Created exactly at midnight or later today: still current.
        assert!(!is_stale(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(), now));
        assert!(!is_stale(Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap(), now));
        assert!(!is_stale(now, now));
    }

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 45, 9).unwrap();
        let (start, end) = day_bounds(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
        assert!(start <= now && now < end);
    }
}
