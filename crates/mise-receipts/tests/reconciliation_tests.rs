//! Receipt lines from matching through import against the in-memory store.

use std::sync::Arc;

use mise_core::{
    BulkItemCandidate, EngineError, InventoryPolicy, MovementLog, PurchaseUnit, Unit,
};
use mise_inventory::{IngredientCatalog, IngredientUpdate, NewIngredient};
use mise_receipts::{ItemStatus, ReceiptImporter, match_candidates};
use mise_store::InMemoryStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const TENANT: &str = "cantina";

fn services() -> (
    Arc<InMemoryStore>,
    IngredientCatalog<InMemoryStore>,
    ReceiptImporter<InMemoryStore>,
) {
    let store = Arc::new(InMemoryStore::new());
    (
        Arc::clone(&store),
        IngredientCatalog::new(Arc::clone(&store)),
        ReceiptImporter::new(store, InventoryPolicy::default()),
    )
}

fn ingredient(name: &str, unit: Unit) -> NewIngredient {
    NewIngredient {
        name: name.to_string(),
        unit,
        min_stock: Decimal::ZERO,
        purchase_unit: None,
    }
}

#[tokio::test]
async fn imports_matched_lines_and_reports_the_rest() {
    let (store, catalog, importer) = services();
    let cheese = catalog
        .create(TENANT, ingredient("Queijo Muçarela", Unit::Kilogram))
        .await
        .unwrap();
    let milk = catalog
        .create(
            TENANT,
            NewIngredient {
                purchase_unit: Some(PurchaseUnit {
                    unit: Unit::Box,
                    conversion_factor: dec!(12),
                }),
                ..ingredient("Leite Integral", Unit::Liter)
            },
        )
        .await
        .unwrap();
    catalog.create(TENANT, ingredient("Tomate", Unit::Kilogram)).await.unwrap();

    let lines = vec![
        BulkItemCandidate::new("QUEIJO MUSSARELA", dec!(2), dec!(80), "kg"),
        BulkItemCandidate::new("LEITE INTEGRAL 1L", dec!(2), dec!(96), "cx"),
        BulkItemCandidate::new("Detergente neutro", dec!(1), dec!(5), "un"),
        BulkItemCandidate::new("Tomate italiano", dec!(1), dec!(9), "dz"),
    ];
    let matched = match_candidates(lines, &catalog.list(TENANT).await.unwrap());
    assert_eq!(matched[0].matched_ingredient_id, Some(cheese.id));
    assert_eq!(matched[1].matched_ingredient_id, Some(milk.id));
    assert!(!matched[2].is_matched());
    assert!(matched[3].is_matched());

    let report = importer.confirm_import(TENANT, &matched).await;

    assert_eq!(report.summary(), "2 of 4 imported");
    assert_eq!(report.imported_ingredients(), vec![cheese.id, milk.id]);
    assert_eq!(report.items[2].status, ItemStatus::Unmatched);
    assert!(matches!(
        &report.items[3].status,
        ItemStatus::Failed { error } if error == "unknown unit 'dz'"
    ));

    let cheese = catalog.get(TENANT, cheese.id).await.unwrap();
    assert_eq!(cheese.current_stock, dec!(2));
    assert_eq!(cheese.cost_per_unit, dec!(40));

    // two boxes of twelve liters
    let milk = catalog.get(TENANT, milk.id).await.unwrap();
    assert_eq!(milk.current_stock, dec!(24));
    assert_eq!(milk.cost_per_unit, dec!(4));
    assert_eq!(store.movements(TENANT, milk.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn one_bad_line_does_not_abort_the_batch() {
    let (_, catalog, importer) = services();
    let flour = catalog
        .create(TENANT, ingredient("Farinha", Unit::Kilogram))
        .await
        .unwrap();
    let sugar = catalog
        .create(TENANT, ingredient("Açúcar", Unit::Kilogram))
        .await
        .unwrap();

    let mut zero = BulkItemCandidate::new("Farinha", Decimal::ZERO, dec!(10), "kg");
    zero.matched_ingredient_id = Some(flour.id);
    let mut bulk = BulkItemCandidate::new("Farinha", dec!(1), dec!(10), "fardo");
    bulk.matched_ingredient_id = Some(flour.id);
    bulk.is_bulk_unit = true;
    let mut good = BulkItemCandidate::new("Acucar", dec!(5), dec!(20), "kg");
    good.matched_ingredient_id = Some(sugar.id);

    let report = importer.confirm_import(TENANT, &[zero, bulk, good]).await;

    assert_eq!(report.summary(), "1 of 3 imported");
    assert!(matches!(
        &report.items[0].status,
        ItemStatus::Failed { error } if error == "cannot restock Farinha: quantity must be positive"
    ));
    assert!(matches!(report.items[1].status, ItemStatus::Failed { .. }));
    assert!(matches!(
        report.items[2].status,
        ItemStatus::Imported { quantity, .. } if quantity == dec!(5)
    ));
    assert_eq!(catalog.get(TENANT, flour.id).await.unwrap().current_stock, Decimal::ZERO);
}

#[tokio::test]
async fn manual_link_requires_an_active_ingredient() {
    let (_, catalog, importer) = services();
    let oil = catalog
        .create(TENANT, ingredient("Azeite", Unit::Liter))
        .await
        .unwrap();
    let line = BulkItemCandidate::new("Oleo de oliva extra virgem", dec!(3), dec!(75), "lt");

    let linked = importer.link_candidate(TENANT, line.clone(), oil.id).await.unwrap();
    assert_eq!(linked.matched_ingredient_id, Some(oil.id));

    catalog.remove(TENANT, oil.id).await.unwrap();
    let err = importer.link_candidate(TENANT, line, oil.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let lard = catalog
        .create(TENANT, ingredient("Banha", Unit::Kilogram))
        .await
        .unwrap();
    let history = BulkItemCandidate {
        matched_ingredient_id: Some(lard.id),
        ..BulkItemCandidate::new("Banha", dec!(1), dec!(8), "kg")
    };
    importer.confirm_import(TENANT, &[history]).await;
    catalog.remove(TENANT, lard.id).await.unwrap();

    let err = importer
        .link_candidate(TENANT, BulkItemCandidate::new("Banha", dec!(1), dec!(8), "kg"), lard.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InactiveIngredient { .. }));
}

#[tokio::test]
async fn unmatched_line_can_become_a_new_ingredient() {
    let (_, catalog, importer) = services();
    let mut line = BulkItemCandidate::new("  Manjericão fresco ", dec!(4), dec!(12), "pct");
    line.is_bulk_unit = true;

    let (basil, linked) = importer
        .create_ingredient_from_candidate(TENANT, line)
        .await
        .unwrap();

    assert_eq!(basil.name, "Manjericão fresco");
    assert_eq!(basil.unit, Unit::Pack);
    assert_eq!(linked.matched_ingredient_id, Some(basil.id));
    assert!(!linked.is_bulk_unit);

    let report = importer.confirm_import(TENANT, &[linked]).await;
    assert_eq!(report.summary(), "1 of 1 imported");
    let basil = catalog.get(TENANT, basil.id).await.unwrap();
    assert_eq!(basil.current_stock, dec!(4));
    assert_eq!(basil.cost_per_unit, dec!(3));

    // the catalog entry is an ordinary ingredient from here on
    catalog
        .update_metadata(
            TENANT,
            basil.id,
            IngredientUpdate {
                min_stock: Some(dec!(2)),
                ..IngredientUpdate::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn report_serializes_with_status_tags() {
    let (_, catalog, importer) = services();
    let egg = catalog.create(TENANT, ingredient("Ovo", Unit::Piece)).await.unwrap();
    let mut line = BulkItemCandidate::new("Ovos brancos", dec!(30), dec!(24), "un");
    line.matched_ingredient_id = Some(egg.id);

    let report = importer
        .confirm_import(TENANT, &[line, BulkItemCandidate::new("Sacola", dec!(1), dec!(0.1), "un")])
        .await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["imported"], 1);
    assert_eq!(json["items"][0]["status"], "imported");
    assert_eq!(json["items"][0]["quantity"], "30");
    assert_eq!(json["items"][1]["status"], "unmatched");
    assert!(json["items"][1]["ingredient_id"].is_null());
}
