mod common;

use assert_matches::assert_matches;
use common::{block_units, event_sender, seed_block, seed_profile, seed_project, test_db, ProjectSeed};
use construction_inventory::{
    entities::{project_unit, CrmStage, UnitStatus},
    errors::ServiceError,
    services::{
        inventory_generator::InventoryGenerator,
        units::{UnitService, UpdateUnitInput},
        Identity,
    },
};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use std::sync::Arc;

struct Fixture {
    db: Arc<sea_orm::DatabaseConnection>,
    service: UnitService,
    owner: Identity,
    project_id: i32,
    units: Vec<project_unit::Model>,
}

/// One owner, one project, a 2x2 block generated.
async fn fixture() -> Fixture {
    let db = test_db().await;
    seed_profile(&db, 1, Some("builder")).await;
    let project = seed_project(&db, ProjectSeed::owned_by(1, "P-UNITS")).await;
    let block = seed_block(&db, project.id, "Block A", 2, 2, None).await;
    let events = event_sender();
    InventoryGenerator::new(db.clone(), events.clone())
        .ensure_units(&block, None)
        .await
        .unwrap();
    let units = block_units(&db, block.id).await;

    Fixture {
        service: UnitService::new(db.clone(), events),
        db,
        owner: Identity::owner(1),
        project_id: project.id,
        units,
    }
}

fn status(raw: &str) -> UpdateUnitInput {
    UpdateUnitInput {
        status: Some(raw.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn status_change_derives_stage() {
    let f = fixture().await;
    let unit_id = f.units[0].id;

    let booked = f.service.update_unit(&f.owner, unit_id, status("booked")).await.unwrap();
    assert_eq!(booked.status, UnitStatus::Booked);
    assert_eq!(booked.crm_stage, CrmStage::Active);

    let sold = f.service.update_unit(&f.owner, unit_id, status("Sold")).await.unwrap();
    assert_eq!(sold.crm_stage, CrmStage::Completed);
    assert!(!sold.crm_stage_explicit);
}

#[tokio::test]
async fn sold_unit_can_move_back_to_booked() {
    let f = fixture().await;
    let unit_id = f.units[0].id;
    f.service.update_unit(&f.owner, unit_id, status("sold")).await.unwrap();

    let input = UpdateUnitInput {
        status: Some("booked".to_string()),
        buyer_name: Some("Ravi".to_string()),
        ..Default::default()
    };
    let reopened = f.service.update_unit(&f.owner, unit_id, input).await.unwrap();
    assert_eq!(reopened.status, UnitStatus::Booked);
    assert_eq!(reopened.crm_stage, CrmStage::Active);

    let stored = project_unit::Entity::find_by_id(unit_id)
        .one(&*f.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, UnitStatus::Booked);
    assert_eq!(stored.buyer_name.as_deref(), Some("Ravi"));
}

#[tokio::test]
async fn bad_input_is_rejected_before_any_write() {
    let f = fixture().await;
    let unit_id = f.units[0].id;

    assert_matches!(
        f.service.update_unit(&f.owner, unit_id, status("reserved")).await,
        Err(ServiceError::InvalidInput(_))
    );

    let negative = UpdateUnitInput {
        price: Some(dec!(-1)),
        ..Default::default()
    };
    assert_matches!(
        f.service.update_unit(&f.owner, unit_id, negative).await,
        Err(ServiceError::InvalidInput(_))
    );
}

#[tokio::test]
async fn explicit_stage_survives_status_changes() {
    let f = fixture().await;
    let unit_id = f.units[0].id;

    let moved = f.service.update_stage(&f.owner, unit_id, "completed").await.unwrap();
    assert_eq!(moved.crm_stage, CrmStage::Completed);
    assert!(moved.crm_stage_explicit);

    let held = f.service.update_unit(&f.owner, unit_id, status("hold")).await.unwrap();
    assert_eq!(held.status, UnitStatus::Hold);
    assert_eq!(held.crm_stage, CrmStage::Completed);

    assert_matches!(
        f.service.update_stage(&f.owner, unit_id, "negotiating").await,
        Err(ServiceError::InvalidInput(_))
    );
}

#[tokio::test]
async fn foreign_actor_cannot_touch_units() {
    let f = fixture().await;
    seed_profile(&f.db, 2, Some("builder")).await;

    assert_matches!(
        f.service
            .update_unit(&Identity::owner(2), f.units[0].id, status("hold"))
            .await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        f.service.update_stage(&f.owner, 9_999, "active").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn kanban_groups_by_effective_stage() {
    let f = fixture().await;
    f.service.update_unit(&f.owner, f.units[0].id, status("booked")).await.unwrap();
    f.service.update_stage(&f.owner, f.units[1].id, "completed").await.unwrap();

    let board = f.service.kanban_board(&f.owner, f.project_id).await.unwrap();
    let keys: Vec<_> = board.iter().map(|c| c.key).collect();
    assert_eq!(keys, vec![CrmStage::Visitor, CrmStage::Active, CrmStage::Completed]);

    let counts: Vec<_> = board.iter().map(|c| c.cards.len()).collect();
    assert_eq!(counts, vec![2, 1, 1]);
    assert_eq!(board[1].cards[0].unit_id, f.units[0].id);
    assert_eq!(board[2].cards[0].block_name, "Block A");
}

#[tokio::test]
async fn grid_lists_floors_top_down() {
    let f = fixture().await;
    f.service.update_unit(&f.owner, f.units[0].id, status("sold")).await.unwrap();

    let grid = f.service.project_grid(&f.owner, f.project_id).await.unwrap();
    assert_eq!(grid.blocks.len(), 1);

    let block = &grid.blocks[0];
    let floors: Vec<_> = block.floors.iter().map(|fl| fl.floor).collect();
    assert_eq!(floors, vec![2, 1]);
    let numbers: Vec<_> = block.floors[0].units.iter().map(|u| u.unit_number).collect();
    assert_eq!(numbers, vec![1, 2]);

    assert_eq!(grid.totals.total, 4);
    assert_eq!(grid.totals.sold, 1);
    assert_eq!(grid.totals.available, 3);
    assert_eq!(block.totals, grid.totals);
}
