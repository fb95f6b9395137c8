//! Car input rules and read representation.

use crate::{
    models::car::{Car, NewCar},
    serializers::review::ReviewOut,
    validation::{self, Field, ValidationErrors},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Prices must be strictly above this.
pub const MIN_PRICE: i64 = 20_000;

/// Flat amount taken off the price in `discount_price`.
pub const DISCOUNT: i64 = 5_000;

const PRICE_MAX_DIGITS: u32 = 9;
const PRICE_DECIMAL_PLACES: u32 = 2;

const INVALID_NUMBER: &str = "A valid number is required.";
const INVALID_BOOLEAN: &str = "Must be a valid boolean.";
const INVALID_PK: &str = "Incorrect type. Expected pk value.";

const CAR_NAME_MAX: usize = 100;
const CAR_DECSTR_MAX: usize = 500;

/// Client-supplied car fields. `id` and `discount_price` are read-only and
/// ignored if sent.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CarInput {
    pub car_name: Field<String>,
    pub car_decstr: Field<String>,
    pub active: Field<bool>,
    pub car_number: Field<String>,
    pub price: Field<Decimal>,
    pub showroom: Field<i64>,
}

impl CarInput {
    /// Fill every field the client left out from `existing` (partial update).
    /// An explicit `null` is kept, so nullable fields can be cleared.
    pub fn merged_over(self, existing: &Car) -> Self {
        Self {
            car_name: self
                .car_name
                .or_else(|| Field::Present(existing.car_name.clone())),
            car_decstr: self
                .car_decstr
                .or_else(|| Field::Present(existing.car_decstr.clone())),
            active: self.active.or_else(|| Field::Present(existing.active)),
            car_number: self
                .car_number
                .or_else(|| Field::from_option(existing.car_number.clone())),
            price: self.price.or_else(|| Field::from_option(existing.price)),
            showroom: self
                .showroom
                .or_else(|| Field::from_option(existing.showroom_id)),
        }
    }

    pub fn validate(self) -> Result<NewCar, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let car_name = validation::require_text(&mut errors, "car_name", self.car_name);
        validation::max_length(&mut errors, "car_name", &car_name, CAR_NAME_MAX);
        let car_decstr = validation::require_text(&mut errors, "car_decstr", self.car_decstr);
        validation::max_length(&mut errors, "car_decstr", &car_decstr, CAR_DECSTR_MAX);

        let active = validation::optional(&mut errors, "active", self.active, INVALID_BOOLEAN);

        let car_number = validation::optional_text(&mut errors, "car_number", self.car_number);
        if let Some(number) = &car_number {
            if let Err(msg) = alphanumeric(number) {
                errors.add("car_number", msg);
            }
        }

        let price = match validation::require(&mut errors, "price", self.price, INVALID_NUMBER) {
            Some(price) => {
                if let Err(msg) = price_digits(price).and_then(|()| validate_price(price)) {
                    errors.add("price", msg);
                }
                price
            }
            None => Decimal::ZERO,
        };

        let showroom_id = validation::optional(&mut errors, "showroom", self.showroom, INVALID_PK);

        // object-level rule, only meaningful once both fields are present
        if !car_name.is_empty() && car_name == car_decstr {
            errors.add_non_field("Car name and description cannot be the same.");
        }

        errors.into_result()?;
        Ok(NewCar {
            car_name,
            car_decstr,
            active: active.unwrap_or(false),
            car_number,
            price,
            showroom_id,
        })
    }
}

/// Prices are stored with at most 9 digits, 2 of them after the point.
pub fn price_digits(price: Decimal) -> Result<(), &'static str> {
    let price = price.normalize();
    let decimals = price.scale();
    let digits = (price.mantissa().unsigned_abs().to_string().len() as u32).max(decimals);
    if digits > PRICE_MAX_DIGITS {
        Err("Ensure that there are no more than 9 digits in total.")
    } else if decimals > PRICE_DECIMAL_PLACES {
        Err("Ensure that there are no more than 2 decimal places.")
    } else if digits - decimals > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
        Err("Ensure that there are no more than 7 digits before the decimal point.")
    } else {
        Ok(())
    }
}

pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::from(MIN_PRICE) {
        Err("Price must be more than 20,000.")
    } else {
        Ok(())
    }
}

pub fn alphanumeric(value: &str) -> Result<(), &'static str> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err("Only alphanumeric characters are allowed.")
    }
}

pub fn discount_price(price: Option<Decimal>) -> Option<Decimal> {
    price.map(|p| p - Decimal::from(DISCOUNT))
}

/// Car as returned to clients, with its reviews nested.
#[derive(Debug, Clone, Serialize)]
pub struct CarOut {
    pub id: i64,
    pub reiviews: Vec<ReviewOut>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub discount_price: Option<Decimal>,
    pub car_name: String,
    pub car_decstr: String,
    pub active: bool,
    pub car_number: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub showroom: Option<i64>,
}

impl CarOut {
    pub fn new(car: Car, reiviews: Vec<ReviewOut>) -> Self {
        Self {
            id: car.id,
            reiviews,
            discount_price: discount_price(car.price),
            car_name: car.car_name,
            car_decstr: car.car_decstr,
            active: car.active,
            car_number: car.car_number,
            price: car.price,
            showroom: car.showroom_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::NON_FIELD_ERRORS;
    use proptest::prelude::*;

    fn input(name: &str, decstr: &str, price: i64) -> CarInput {
        CarInput {
            car_name: Field::Present(name.into()),
            car_decstr: Field::Present(decstr.into()),
            price: Field::Present(Decimal::from(price)),
            ..CarInput::default()
        }
    }

    #[test]
    fn accepts_a_valid_car() {
        let car = input("Civic", "Sedan", 25_000).validate().unwrap();
        assert_eq!(car.price, Decimal::from(25_000));
        assert!(!car.active);
        assert_eq!(car.showroom_id, None);
    }

    #[test]
    fn price_at_threshold_is_rejected() {
        let errors = input("Civic", "Sedan", 20_000).validate().unwrap_err();
        assert_eq!(errors.messages("price"), ["Price must be more than 20,000."]);
    }

    #[test]
    fn missing_price_is_required() {
        let errors = CarInput {
            price: Field::Absent,
            ..input("Civic", "Sedan", 0)
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.messages("price"), [validation::REQUIRED]);
    }

    #[test]
    fn name_equal_to_description_is_a_non_field_error() {
        let errors = input("X", "X", 30_000).validate().unwrap_err();
        assert!(errors.contains(NON_FIELD_ERRORS));
        assert!(!errors.contains("price"));
    }

    #[test]
    fn car_number_must_be_alphanumeric() {
        let mut bad = input("Civic", "Sedan", 25_000);
        bad.car_number = Field::Present("AB-12".into());
        assert!(bad.validate().unwrap_err().contains("car_number"));

        let mut good = input("Civic", "Sedan", 25_000);
        good.car_number = Field::Present("AB12".into());
        assert_eq!(good.validate().unwrap().car_number.as_deref(), Some("AB12"));
    }

    #[test]
    fn discount_follows_price() {
        assert_eq!(
            discount_price(Some(Decimal::from(25_000))),
            Some(Decimal::from(20_000))
        );
        assert_eq!(discount_price(None), None);
    }

    #[test]
    fn partial_input_keeps_stored_fields() {
        let stored = Car {
            id: 1,
            car_name: "Civic".into(),
            car_decstr: "Sedan".into(),
            active: true,
            car_number: Some("A1".into()),
            price: Some(Decimal::from(30_000)),
            showroom_id: Some(4),
        };
        let patch = CarInput {
            price: Field::Present(Decimal::from(40_000)),
            ..CarInput::default()
        };
        let car = patch.merged_over(&stored).validate().unwrap();
        assert_eq!(car.car_name, "Civic");
        assert!(car.active);
        assert_eq!(car.price, Decimal::from(40_000));
        assert_eq!(car.showroom_id, Some(4));
    }

    #[test]
    fn explicit_null_clears_nullable_fields() {
        let stored = Car {
            id: 1,
            car_name: "Civic".into(),
            car_decstr: "Sedan".into(),
            active: true,
            car_number: Some("A1".into()),
            price: Some(Decimal::from(30_000)),
            showroom_id: Some(4),
        };
        let patch: CarInput =
            serde_json::from_value(serde_json::json!({ "showroom": null, "car_number": null }))
                .unwrap();
        let car = patch.merged_over(&stored).validate().unwrap();
        assert_eq!(car.showroom_id, None);
        assert_eq!(car.car_number, None);
        assert_eq!(car.car_name, "Civic");
    }

    #[test]
    fn padded_name_still_equals_description() {
        let errors = input("X", " X ", 30_000).validate().unwrap_err();
        assert!(errors.contains(NON_FIELD_ERRORS));

        let car = input("  Civic ", "Sedan", 30_000).validate().unwrap();
        assert_eq!(car.car_name, "Civic");
    }

    #[test]
    fn wrongly_typed_fields_are_field_errors() {
        let body: CarInput = serde_json::from_value(serde_json::json!({
            "car_name": "Civic",
            "car_decstr": "Sedan",
            "price": "abc",
            "active": "yes please",
            "showroom": "downtown",
        }))
        .unwrap();
        let errors = body.validate().unwrap_err();
        assert_eq!(errors.messages("price"), [INVALID_NUMBER]);
        assert_eq!(errors.messages("active"), [INVALID_BOOLEAN]);
        assert_eq!(errors.messages("showroom"), [INVALID_PK]);
    }

    #[test]
    fn price_precision_is_bounded() {
        let price = |raw: &str| raw.parse::<Decimal>().unwrap();
        assert!(price_digits(price("25000.12")).is_ok());
        assert!(price_digits(price("25000.1000")).is_ok());
        assert!(price_digits(price("9999999.99")).is_ok());
        assert_eq!(
            price_digits(price("25000.123")),
            Err("Ensure that there are no more than 2 decimal places.")
        );
        assert_eq!(
            price_digits(price("1234567890")),
            Err("Ensure that there are no more than 9 digits in total.")
        );
        assert_eq!(
            price_digits(price("12345678.9")),
            Err("Ensure that there are no more than 7 digits before the decimal point.")
        );

        let mut car = input("Civic", "Sedan", 0);
        car.price = Field::Present(price("25000.123456789"));
        assert!(car.validate().unwrap_err().contains("price"));
    }

    #[test]
    fn read_representation_has_discount() {
        let car = Car {
            id: 9,
            car_name: "Civic".into(),
            car_decstr: "Sedan".into(),
            active: false,
            car_number: None,
            price: Some(Decimal::from(25_000)),
            showroom_id: None,
        };
        let json = serde_json::to_value(CarOut::new(car, Vec::new())).unwrap();
        assert_eq!(json["discount_price"].as_f64(), Some(20_000.0));
        assert_eq!(json["price"].as_f64(), Some(25_000.0));
        assert!(json["reiviews"].as_array().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn validated_price_exceeds_threshold(price in 0i64..100_000) {
            match input("Civic", "Sedan", price).validate() {
                Ok(car) => prop_assert!(car.price > Decimal::from(MIN_PRICE)),
                Err(errors) => {
                    prop_assert!(price <= MIN_PRICE);
                    prop_assert!(errors.contains("price"));
                }
            }
        }

        #[test]
        fn validated_name_differs_from_description(name in "[a-z]{1,8}", decstr in "[a-z]{1,8}") {
            let result = input(&name, &decstr, 25_000).validate();
            prop_assert_eq!(result.is_ok(), name != decstr);
        }
    }
}
