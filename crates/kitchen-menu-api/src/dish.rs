
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

pub type DishId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub id: DishId,
    pub name: String,
    #[serde(alias = "gramaj")]
    pub quantity: u32,
    #[serde(default)]
    pub unit: Unit,
    /// free text shown instead of `quantity`, never parsed
    #[serde(default, alias = "displayGramaj")]
    pub display_quantity: Option<String>,
}

impl Dish {
    /// the override if it is not blank, the plain quantity otherwise
    pub fn display_amount(&self) -> String {
        match self.display_quantity.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => self.quantity.to_string(),
        }
    }

    pub fn amount_label(&self) -> String {
        format!("{} {}", self.display_amount(), self.unit.short_label())
    }
}

#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    #[default] Gram,
    Milliliter,
    #[serde(alias = "BUCATA")]
    Piece,
}

impl Unit {
    pub const ALL: [Unit; 3] = [Unit::Gram, Unit::Milliliter, Unit::Piece];

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Gram => "GRAM",
            Unit::Milliliter => "MILLILITER",
            Unit::Piece => "PIECE",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Unit::Gram => "g",
            Unit::Milliliter => "ml",
            Unit::Piece => "buc",
        }
    }

    pub fn accepted() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.as_str()).collect()
    }

    /// Maps free text ("gr", "Mililitri", "bucăți", ...) to a unit.
    pub fn normalize(input: &str) -> Result<Self, UnitError> {
        let canonical: String = input
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
        .collect();

        Self::from_canonical(&canonical)
            .ok_or_else(|| UnitError::Unrecognized(input.to_string()))
    }

    fn from_canonical(s: &str) -> Option<Self> {
        use Unit::*;

        Some(match s {
            "G" | "GR" | "GRAM" | "GRAMS" | "GRAME" | "GRAMAJ" => Gram,

            "ML" | "MIL" | "MILLILITER" | "MILLILITERS" | "MILLILITRE"
            | "MILLILITRES" | "MILILITRU" | "MILILITRI" => Milliliter,

            "BUC" | "BUCATA" | "BUCATI" | "PIECE" | "PIECES" | "PCS" => Piece,
            _ => None?,
        })
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("unrecognized unit: '{0}'")]
    Unrecognized(String),
}

/// A quantity as sent by a client, either a JSON number or text like "12,5".
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Number(f64),
    Text(String),
}

impl QuantityInput {
    pub fn parse(&self) -> Result<u32, QuantityError> {
        match self {
            QuantityInput::Number(v) => round_quantity(*v),
            QuantityInput::Text(s) => parse_quantity(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuantityError {
    #[error("quantity is not a number: '{0}'")]
    NotANumber(String),
    #[error("quantity must be greater than zero")]
    NotPositive,
    #[error("quantity is too large")]
    TooLarge,
}

/// Accepts both `,` and `.` as the decimal separator.
pub fn parse_quantity(raw: &str) -> Result<u32, QuantityError> {
    let v: f64 = raw.trim().replace(',', ".").parse()
        .map_err(|_| QuantityError::NotANumber(raw.to_string()))?;
    round_quantity(v)
}

pub fn round_quantity(v: f64) -> Result<u32, QuantityError> {
    if !v.is_finite() {
        return Err(QuantityError::NotANumber(v.to_string()));
    }
    if v <= 0.0 {
        return Err(QuantityError::NotPositive);
    }

    let rounded = v.round();
    if rounded < 1.0 {
        Err(QuantityError::NotPositive)
    } else if rounded > u32::MAX as f64 {
        Err(QuantityError::TooLarge)
    } else {
        Ok(rounded as u32)
    }
}
