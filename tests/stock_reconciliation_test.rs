mod common;

use assert_matches::assert_matches;
use common::{event_sender, seed_material, seed_project, test_db, ProjectSeed};
use construction_inventory::{
    entities::material_item,
    errors::ServiceError,
    services::{
        stock::{StockService, StockUpdate},
        Identity,
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};

fn update(allocated: Option<Decimal>, used: Option<Decimal>) -> StockUpdate {
    StockUpdate {
        allocated,
        used,
        notes: None,
    }
}

#[tokio::test]
async fn usage_above_allocation_is_clamped() {
    let db = test_db().await;
    let project = seed_project(&db, ProjectSeed::owned_by(1, "P-STOCK")).await;
    let cement = seed_material(&db, "cement").await;
    let service = StockService::new(db.clone(), event_sender());
    let owner = Identity::owner(1);

    let saved = service
        .apply_update(&owner, project.id, cement.id, update(Some(dec!(100)), Some(dec!(150))))
        .await
        .unwrap();
    assert_eq!(saved.allocated, dec!(100));
    assert_eq!(saved.used, dec!(100));

    let overview = service.stock_overview(&owner, project.id).await.unwrap();
    let line = overview
        .iter()
        .find(|l| l.material_item_id == cement.id)
        .unwrap();
    assert_eq!(line.remaining, Decimal::ZERO);
}

#[tokio::test]
async fn partial_update_keeps_other_field() {
    let db = test_db().await;
    let project = seed_project(&db, ProjectSeed::owned_by(1, "P-PARTIAL")).await;
    let steel = seed_material(&db, "steel").await;
    let service = StockService::new(db.clone(), event_sender());
    let owner = Identity::owner(1);

    service
        .apply_update(&owner, project.id, steel.id, update(Some(dec!(40)), None))
        .await
        .unwrap();
    let saved = service
        .apply_update(&owner, project.id, steel.id, update(None, Some(dec!(15))))
        .await
        .unwrap();

    assert_eq!(saved.allocated, dec!(40));
    assert_eq!(saved.used, dec!(15));
}

#[tokio::test]
async fn overview_reads_zero_for_untouched_materials() {
    let db = test_db().await;
    let project = seed_project(&db, ProjectSeed::owned_by(1, "P-EMPTY")).await;
    let service = StockService::new(db.clone(), event_sender());

    let seeded = service.ensure_default_materials().await.unwrap();
    assert_eq!(seeded, 4);
    assert_eq!(service.ensure_default_materials().await.unwrap(), 0);
    assert_eq!(material_item::Entity::find().count(&*db).await.unwrap(), 4);

    let overview = service
        .stock_overview(&Identity::owner(1), project.id)
        .await
        .unwrap();
    assert_eq!(overview.len(), 4);
    assert!(overview
        .iter()
        .all(|l| l.allocated.is_zero() && l.used.is_zero() && l.remaining.is_zero()));
}

#[tokio::test]
async fn rejects_unknown_material_and_negative_quantities() {
    let db = test_db().await;
    let project = seed_project(&db, ProjectSeed::owned_by(1, "P-BAD")).await;
    let sand = seed_material(&db, "sand").await;
    let service = StockService::new(db.clone(), event_sender());
    let owner = Identity::owner(1);

    assert_matches!(
        service
            .apply_update(&owner, project.id, 9_999, update(Some(dec!(1)), None))
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        service
            .apply_update(&owner, project.id, sand.id, update(Some(dec!(-5)), None))
            .await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        service
            .apply_update(&Identity::owner(2), project.id, sand.id, update(Some(dec!(5)), None))
            .await,
        Err(ServiceError::Forbidden(_))
    );
}
