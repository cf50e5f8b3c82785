//! # Catalog Module
//!
//! Car and mobile-phone price catalogs, their lookups, free-text search and
//! bulk import from uploaded Excel workbooks (or JSON row arrays).
//!
//! Prices are kept in the catalog's own unit (millions of Tomans in the
//! shipped seed data); nothing here converts currencies.

use calamine::{open_workbook_from_rs, RangeDeserializerBuilder, Reader, Xlsx};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;
use thiserror::Error;

/// Maximum number of hits returned by [`search`]
pub const MAX_SEARCH_RESULTS: usize = 20;

const SEED_CATALOG: &str = include_str!("../data/seed_catalog.json");

/// A single trim level of a car model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    pub market_price: f64,
    pub factory_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarModel {
    pub name: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    /// Optional display name when it differs from the catalog key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub models: Vec<CarModel>,
}

/// Brand → models → variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarCatalog {
    brands: BTreeMap<String, Brand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileModel {
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MobileBrand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub models: Vec<MobileModel>,
}

/// Brand → phone models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MobileCatalog {
    brands: BTreeMap<String, MobileBrand>,
}

/// One row of a car price import file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarRow {
    pub brand: String,
    pub model: String,
    pub variant: String,
    pub market_price: f64,
    pub factory_price: f64,
}

/// One row of a mobile price import file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MobileRow {
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub storage: Option<String>,
    pub price: f64,
}

/// Which catalog an import or screen refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogKind {
    Cars,
    Mobiles,
}

/// Outcome of applying an import file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub rejected: usize,
}

impl ImportSummary {
    pub fn applied(&self) -> usize {
        self.created + self.updated
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file is not a JSON array of rows: {0}")]
    Json(#[from] serde_json::Error),
    #[error("spreadsheet could not be opened: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("spreadsheet row could not be read: {0}")]
    Row(#[from] calamine::DeError),
    #[error("import file contains no rows")]
    Empty,
}

/// Whether a row was merged as a new entry or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// A search hit over both catalogs
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit {
    Car {
        brand: String,
        model: String,
        variant: Variant,
    },
    Mobile {
        brand: String,
        model: MobileModel,
    },
}

fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

fn matches(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl CarCatalog {
    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    pub fn brands(&self) -> Vec<String> {
        self.brands.keys().cloned().collect()
    }

    pub fn brand(&self, brand: &str) -> Option<&Brand> {
        self.brands.get(brand)
    }

    /// Model names of a brand, or `None` when the brand is unknown
    pub fn models(&self, brand: &str) -> Option<Vec<String>> {
        self.brands
            .get(brand)
            .map(|b| b.models.iter().map(|m| m.name.clone()).collect())
    }

    pub fn model(&self, brand: &str, model: &str) -> Option<&CarModel> {
        self.brands
            .get(brand)
            .and_then(|b| b.models.iter().find(|m| m.name == model))
    }

    pub fn variant(&self, brand: &str, model: &str, index: usize) -> Option<&Variant> {
        self.model(brand, model).and_then(|m| m.variants.get(index))
    }

    /// Insert or update the variant described by `row`
    pub fn upsert_variant(&mut self, row: &CarRow) -> Upsert {
        let brand = self.brands.entry(row.brand.clone()).or_default();
        let variant = Variant {
            name: row.variant.clone(),
            market_price: row.market_price,
            factory_price: row.factory_price,
        };

        let Some(model) = brand.models.iter_mut().find(|m| m.name == row.model) else {
            brand.models.push(CarModel {
                name: row.model.clone(),
                variants: vec![variant],
            });
            return Upsert::Created;
        };

        match model.variants.iter_mut().find(|v| v.name == row.variant) {
            Some(existing) => {
                *existing = variant;
                Upsert::Updated
            }
            None => {
                model.variants.push(variant);
                Upsert::Created
            }
        }
    }

    /// Apply rows in order, skipping rows with empty names or bad prices
    pub fn import_rows(&mut self, rows: &[CarRow]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for row in rows {
            let names_ok = [&row.brand, &row.model, &row.variant]
                .iter()
                .all(|s| !s.trim().is_empty());
            if !names_ok || !valid_price(row.market_price) || !valid_price(row.factory_price) {
                summary.rejected += 1;
                continue;
            }
            match self.upsert_variant(row) {
                Upsert::Created => summary.created += 1,
                Upsert::Updated => summary.updated += 1,
            }
        }
        summary
    }
}

impl MobileCatalog {
    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    pub fn brands(&self) -> Vec<String> {
        self.brands.keys().cloned().collect()
    }

    pub fn brand(&self, brand: &str) -> Option<&MobileBrand> {
        self.brands.get(brand)
    }

    pub fn model(&self, brand: &str, model: &str) -> Option<&MobileModel> {
        self.brands
            .get(brand)
            .and_then(|b| b.models.iter().find(|m| m.name == model))
    }

    /// Insert or update the model described by `row`
    pub fn upsert_model(&mut self, row: &MobileRow) -> Upsert {
        let brand = self.brands.entry(row.brand.clone()).or_default();
        match brand.models.iter_mut().find(|m| m.name == row.model) {
            Some(existing) => {
                existing.price = row.price;
                existing.storage = row.storage.clone();
                Upsert::Updated
            }
            None => {
                brand.models.push(MobileModel {
                    name: row.model.clone(),
                    price: row.price,
                    storage: row.storage.clone(),
                });
                Upsert::Created
            }
        }
    }

    pub fn import_rows(&mut self, rows: &[MobileRow]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for row in rows {
            if row.brand.trim().is_empty() || row.model.trim().is_empty() || !valid_price(row.price) {
                summary.rejected += 1;
                continue;
            }
            match self.upsert_model(row) {
                Upsert::Created => summary.created += 1,
                Upsert::Updated => summary.updated += 1,
            }
        }
        summary
    }
}

/// Zip local-file header that starts every `.xlsx` workbook
const XLSX_MAGIC: &[u8] = b"PK\x03\x04";

/// Rows of the first worksheet, keyed by the header row
fn read_sheet<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, ImportError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(ImportError::Empty)??;

    let rows = RangeDeserializerBuilder::new()
        .from_range(&range)?
        .collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Parse an `.xlsx` workbook or a JSON array of rows
fn parse_rows<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, ImportError> {
    let rows: Vec<T> = if bytes.starts_with(XLSX_MAGIC) {
        read_sheet(bytes)?
    } else {
        serde_json::from_slice(bytes)?
    };

    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(rows)
}

/// Parse an uploaded car price file
///
/// Columns: `Brand`, `Model`, `Variant`, `MarketPrice`, `FactoryPrice`.
pub fn parse_car_rows(bytes: &[u8]) -> Result<Vec<CarRow>, ImportError> {
    parse_rows(bytes)
}

/// Parse an uploaded mobile price file
///
/// Columns: `Brand`, `Model`, `Price` and optionally `Storage`.
pub fn parse_mobile_rows(bytes: &[u8]) -> Result<Vec<MobileRow>, ImportError> {
    parse_rows(bytes)
}

/// Case-insensitive substring search over brand, model and variant names
pub fn search(cars: &CarCatalog, mobiles: &MobileCatalog, query: &str) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let needle = needle.as_str();

    let car_hits = cars.brands.iter().flat_map(|(brand, b)| {
        let brand_hit = matches(brand, &needle);
        b.models.iter().flat_map(move |m| {
            let model_hit = brand_hit || matches(&m.name, &needle);
            m.variants
                .iter()
                .filter(move |v| model_hit || matches(&v.name, &needle))
                .map(move |v| SearchHit::Car {
                    brand: brand.clone(),
                    model: m.name.clone(),
                    variant: v.clone(),
                })
        })
    });

    let mobile_hits = mobiles.brands.iter().flat_map(|(brand, b)| {
        let brand_hit = matches(brand, &needle)
            || b.name.as_deref().is_some_and(|n| matches(n, &needle));
        b.models
            .iter()
            .filter(move |m| brand_hit || matches(&m.name, &needle))
            .map(move |m| SearchHit::Mobile {
                brand: brand.clone(),
                model: m.clone(),
            })
    });

    car_hits.chain(mobile_hits).take(MAX_SEARCH_RESULTS).collect()
}

#[derive(Deserialize)]
struct SeedCatalog {
    cars: CarCatalog,
    mobiles: MobileCatalog,
}

/// Catalogs shipped with the bot, used when the data file has none
pub fn seed_catalogs() -> (CarCatalog, MobileCatalog) {
    match serde_json::from_str::<SeedCatalog>(SEED_CATALOG) {
        Ok(seed) => (seed.cars, seed.mobiles),
        Err(e) => {
            tracing::error!(error = %e, "Bundled seed catalog is malformed");
            (CarCatalog::default(), MobileCatalog::default())
        }
    }
}
