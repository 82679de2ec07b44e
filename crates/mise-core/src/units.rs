use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Mass,
    Volume,
    Count,
}

/// Units an ingredient can be stocked, bought or used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "L")]
    Liter,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "un")]
    Piece,
    #[serde(rename = "box")]
    Box,
    #[serde(rename = "pack")]
    Pack,
    #[serde(rename = "case")]
    Case,
}

impl Unit {
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Kilogram | Unit::Gram => Dimension::Mass,
            Unit::Liter | Unit::Milliliter => Dimension::Volume,
            Unit::Piece | Unit::Box | Unit::Pack | Unit::Case => Dimension::Count,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Liter => "L",
            Unit::Milliliter => "ml",
            Unit::Piece => "un",
            Unit::Box => "box",
            Unit::Pack => "pack",
            Unit::Case => "case",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = EngineError;

    /// Accepts the spellings receipts and invoices commonly print.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().trim_end_matches('.').to_lowercase();
        let unit = match normalized.as_str() {
            "kg" | "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" | "quilo" | "quilos" => {
                Unit::Kilogram
            }
            "g" | "gr" | "grs" | "gram" | "grams" | "grama" | "gramas" => Unit::Gram,
            "l" | "lt" | "lts" | "liter" | "liters" | "litre" | "litres" | "litro" | "litros" => {
                Unit::Liter
            }
            "ml" | "milliliter" | "milliliters" | "mililitro" | "mililitros" => Unit::Milliliter,
            "" | "un" | "und" | "unid" | "unit" | "units" | "unidade" | "unidades" | "pc"
            | "pcs" | "piece" | "pieces" => Unit::Piece,
            "box" | "boxes" | "cx" | "caixa" | "caixas" => Unit::Box,
            "pack" | "packs" | "pct" | "pacote" | "pacotes" => Unit::Pack,
            "case" | "cases" | "fardo" | "fardos" => Unit::Case,
            _ => return Err(EngineError::UnknownUnit(value.to_string())),
        };

        Ok(unit)
    }
}
