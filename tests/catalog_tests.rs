//! # Catalog Tests
//!
//! Import files, merging and free-text search across both catalogs.

use anyhow::Result;
use carprice_bot::catalog::{
    parse_car_rows, parse_mobile_rows, search, CarCatalog, ImportError, ImportSummary,
    MobileCatalog, SearchHit, MAX_SEARCH_RESULTS,
};
use rust_xlsxwriter::Workbook;

const CAR_FILE: &str = r#"[
    {"Brand": "Saipa", "Model": "Shahin", "Variant": "GL", "MarketPrice": 1000, "FactoryPrice": 720},
    {"Brand": "Saipa", "Model": "Shahin", "Variant": "GL", "MarketPrice": 1050, "FactoryPrice": 720},
    {"Brand": "Saipa", "Model": "Shahin", "Variant": "CVT", "MarketPrice": 1200, "FactoryPrice": 900},
    {"Brand": "", "Model": "Ghost", "Variant": "X", "MarketPrice": 10, "FactoryPrice": 5},
    {"Brand": "Iran Khodro", "Model": "Dena", "Variant": "Plus", "MarketPrice": -1, "FactoryPrice": 5}
]"#;

const MOBILE_FILE: &str = r#"[
    {"Brand": "Samsung", "Model": "Galaxy A55", "Storage": "256GB", "Price": 24},
    {"Brand": "Apple", "Model": "iPhone 15", "Price": 72},
    {"Brand": "Apple", "Model": "iPhone 15", "Price": 70.5}
]"#;

#[test]
fn test_car_import_merges_and_rejects() {
    let rows = parse_car_rows(CAR_FILE.as_bytes()).expect("valid file");
    let mut catalog = CarCatalog::default();

    let summary = catalog.import_rows(&rows);
    assert_eq!(
        summary,
        ImportSummary {
            created: 2,
            updated: 1,
            rejected: 2,
        }
    );
    assert_eq!(summary.applied(), 3);

    assert_eq!(catalog.brands(), vec!["Saipa".to_string()]);
    let gl = catalog.variant("Saipa", "Shahin", 0).expect("GL variant");
    assert_eq!(gl.name, "GL");
    assert_eq!(gl.market_price, 1050.0);
    assert_eq!(catalog.variant("Saipa", "Shahin", 1).map(|v| v.name.as_str()), Some("CVT"));
}

#[test]
fn test_mobile_import_updates_existing_model() {
    let rows = parse_mobile_rows(MOBILE_FILE.as_bytes()).expect("valid file");
    let mut catalog = MobileCatalog::default();

    let summary = catalog.import_rows(&rows);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.updated, 1);

    let iphone = catalog.model("Apple", "iPhone 15").expect("imported");
    assert_eq!(iphone.price, 70.5);
    assert_eq!(iphone.storage, None);
    assert_eq!(
        catalog.model("Samsung", "Galaxy A55").and_then(|m| m.storage.as_deref()),
        Some("256GB")
    );
}

/// Workbook with a header row followed by `rows`
fn workbook(header: &[&str], rows: &[(&str, &str, &str, f64, f64)]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, title) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }
    for (i, (brand, model, variant, market, factory)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *brand)?;
        sheet.write_string(row, 1, *model)?;
        sheet.write_string(row, 2, *variant)?;
        sheet.write_number(row, 3, *market)?;
        sheet.write_number(row, 4, *factory)?;
    }
    Ok(workbook.save_to_buffer()?)
}

const CAR_HEADER: [&str; 5] = ["Brand", "Model", "Variant", "MarketPrice", "FactoryPrice"];

#[test]
fn test_car_import_from_excel() -> Result<()> {
    let bytes = workbook(
        &CAR_HEADER,
        &[
            ("Saipa", "Shahin", "GL", 1000.0, 720.0),
            ("Saipa", "Shahin", "CVT", 1200.0, 900.0),
            ("ایران خودرو", "دنا", "پلاس", 1300.0, 1000.0),
        ],
    )?;

    let rows = parse_car_rows(&bytes)?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].brand, "ایران خودرو");
    assert_eq!(rows[1].market_price, 1200.0);

    let mut catalog = CarCatalog::default();
    assert_eq!(catalog.import_rows(&rows).created, 3);
    assert_eq!(catalog.models("Saipa"), Some(vec!["Shahin".to_string()]));
    Ok(())
}

#[test]
fn test_excel_without_rows_or_columns_is_rejected() -> Result<()> {
    let header_only = workbook(&CAR_HEADER, &[])?;
    assert!(matches!(parse_car_rows(&header_only), Err(ImportError::Empty)));

    let wrong_columns = workbook(&["Name", "Price"], &[])?;
    assert!(parse_car_rows(&wrong_columns).is_err());

    assert!(matches!(
        parse_car_rows(b"PK\x03\x04 not really a workbook"),
        Err(ImportError::Workbook(_))
    ));
    Ok(())
}

#[test]
fn test_parse_errors() {
    assert!(matches!(parse_car_rows(b"[]"), Err(ImportError::Empty)));
    assert!(matches!(parse_car_rows(b"not json"), Err(ImportError::Json(_))));
    assert!(matches!(
        parse_mobile_rows(br#"[{"Brand": "Apple"}]"#),
        Err(ImportError::Json(_))
    ));
}

#[test]
fn test_search_is_case_insensitive_across_catalogs() {
    let mut cars = CarCatalog::default();
    cars.import_rows(&parse_car_rows(CAR_FILE.as_bytes()).expect("valid file"));
    let mut mobiles = MobileCatalog::default();
    mobiles.import_rows(&parse_mobile_rows(MOBILE_FILE.as_bytes()).expect("valid file"));

    let hits = search(&cars, &mobiles, "  SHAHIN ");
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| matches!(hit, SearchHit::Car { model, .. } if model == "Shahin")));

    let hits = search(&cars, &mobiles, "iphone");
    assert!(matches!(
        hits.as_slice(),
        [SearchHit::Mobile { brand, .. }] if brand == "Apple"
    ));

    let hits = search(&cars, &mobiles, "cvt");
    assert_eq!(hits.len(), 1);

    assert!(search(&cars, &mobiles, "   ").is_empty());
    assert!(search(&cars, &mobiles, "tesla").is_empty());
}

#[test]
fn test_search_is_capped() {
    let mut mobiles = MobileCatalog::default();
    let rows: Vec<_> = (0..50)
        .map(|i| format!(r#"{{"Brand": "Xiaomi", "Model": "Redmi {i}", "Price": 10}}"#))
        .collect();
    let file = format!("[{}]", rows.join(","));
    mobiles.import_rows(&parse_mobile_rows(file.as_bytes()).expect("valid file"));

    let hits = search(&CarCatalog::default(), &mobiles, "redmi");
    assert_eq!(hits.len(), MAX_SEARCH_RESULTS);
}
