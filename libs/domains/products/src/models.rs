use chrono::{DateTime, Duration, SubsecRound, Utc};
use rust_decimal::{Decimal, dec};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Fractional digits stored for `price` (`NUMERIC(10,2)`)
pub const PRICE_SCALE: u32 = 2;

/// Largest price that fits `NUMERIC(10,2)`
const MAX_PRICE: Decimal = dec!(99999999.99);

/// Product domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    /// Unique across all products
    pub name: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 9.99)]
    pub price: Decimal,
    /// `true` when the product is active
    pub status: bool,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating a new product
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 9.99)]
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    pub status: bool,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub category: Option<String>,
}

/// DTO for a partial update; absent fields are left untouched.
///
/// `category` distinguishes an absent key (`None`) from an explicit
/// `null` (`Some(None)`), which clears the stored category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<f64>, example = 4.5)]
    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    #[validate(length(max = 255))]
    pub category: Option<Option<String>>,
}

/// Query filters for listing products
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    /// Case-insensitive substring of the category
    pub category: Option<String>,
}

impl ProductFilter {
    /// Name pattern, ignoring an empty or blank value
    pub fn name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    /// Category pattern, ignoring an empty or blank value
    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        return Err(ValidationError::new("range").with_message("price must not be negative".into()));
    }
    if round_price(*price) > MAX_PRICE {
        return Err(ValidationError::new("range")
            .with_message("price does not fit NUMERIC(10,2)".into()));
    }
    Ok(())
}

/// Present-but-null deserializes to `Some(None)`, absent stays `None`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Round half away from zero to the stored scale
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(
        PRICE_SCALE,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    )
}

/// Current time at the microsecond precision PostgreSQL stores
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl Product {
    /// Build a new product with a fresh v7 id; both timestamps share one instant.
    pub fn new(input: CreateProduct) -> Self {
        let now = now();
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            quantity: input.quantity,
            price: round_price(input.price),
            status: input.status,
            category: input.category,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the present fields of `update`, then [`touch`](Self::touch).
    pub fn apply_update(&mut self, update: UpdateProduct) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(quantity) = update.quantity {
            self.quantity = quantity;
        }
        if let Some(price) = update.price {
            self.price = round_price(price);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        self.touch();
    }

    /// Advance `updated_at`, strictly past its previous value.
    pub fn touch(&mut self) {
        let now = now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

impl UpdateProduct {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.status.is_none()
            && self.category.is_none()
    }
}
