mod common;

use assert_matches::assert_matches;
use common::{
    event_sender, seed_expense, seed_payment, seed_profile, seed_supervisor, test_config, test_db,
    ProjectSeed,
};
use construction_inventory::{
    entities::{
        project, project_block, project_unit, CrmStage, ProjectConfiguration, ProjectStatus,
        UnitStatus,
    },
    errors::ServiceError,
    services::{
        blocks::{BlockService, CreateBlockInput, UpdateBlockInput},
        projects::{ConfigurationFilter, CreateProjectInput, ProjectService, UpdateProjectInput},
        Identity,
    },
};
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use std::sync::Arc;

struct Services {
    db: Arc<DatabaseConnection>,
    projects: ProjectService,
    blocks: BlockService,
    owner: Identity,
}

async fn services() -> Services {
    let db = test_db().await;
    seed_profile(&db, 1, Some("builder")).await;
    let events = event_sender();

    Services {
        projects: ProjectService::new(db.clone(), events.clone()),
        blocks: BlockService::new(db.clone(), events, test_config().capacity_limits()),
        db,
        owner: Identity::owner(1),
    }
}

fn new_project(code: &str) -> CreateProjectInput {
    CreateProjectInput {
        code: code.to_string(),
        name: format!("Project {}", code),
        status: None,
        configuration: ProjectConfiguration::MultiFlat,
        budget: Some(dec!(2500000)),
        land_address: None,
        duration_months: Some(24),
        assigned_supervisor_id: None,
        assigned_customer_id: None,
    }
}

fn new_block(name: Option<&str>, floors: i32, units: i32) -> CreateBlockInput {
    CreateBlockInput {
        name: name.map(str::to_string),
        floor_count: floors,
        units_per_floor: units,
        notes: None,
        unit_layout_template: None,
    }
}

#[tokio::test]
async fn create_project_defaults_and_duplicate_code() {
    let s = services().await;

    let created = s.projects.create_project(&s.owner, new_project("P-100")).await.unwrap();
    assert_eq!(created.owner_id, 1);
    assert_eq!(created.status, ProjectStatus::Active);
    assert_eq!(created.block_count, 0);

    assert_matches!(
        s.projects.create_project(&s.owner, new_project("P-100")).await,
        Err(ServiceError::Conflict(_))
    );

    let mut negative = new_project("P-101");
    negative.budget = Some(dec!(-1));
    assert_matches!(
        s.projects.create_project(&s.owner, negative).await,
        Err(ServiceError::InvalidInput(_))
    );

    let mut unknown_supervisor = new_project("P-102");
    unknown_supervisor.assigned_supervisor_id = Some(4_242);
    assert_matches!(
        s.projects.create_project(&s.owner, unknown_supervisor).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn update_project_changes_status_and_assignment() {
    let s = services().await;
    let supervisor = seed_supervisor(&s.db, None, 1, "SUP-0001").await;
    let created = s.projects.create_project(&s.owner, new_project("P-200")).await.unwrap();

    let input = UpdateProjectInput {
        status: Some("on hold".to_string()),
        assigned_supervisor_id: Some(supervisor.id),
        ..Default::default()
    };
    let updated = s
        .projects
        .update_project(&s.owner, created.id, input)
        .await
        .unwrap();

    assert_eq!(updated.status, ProjectStatus::OnHold);
    assert_eq!(updated.assigned_supervisor_id, Some(supervisor.id));
    assert_eq!(updated.code, "P-200");
}

#[tokio::test]
async fn blocks_generate_units_and_track_count() {
    let s = services().await;
    let project = s.projects.create_project(&s.owner, new_project("P-300")).await.unwrap();

    let first = s
        .blocks
        .create_block(&s.owner, project.id, new_block(None, 2, 3))
        .await
        .unwrap();
    assert_eq!(first.block.name, "Block A");
    assert_eq!(first.created_units, 6);

    let second = s
        .blocks
        .create_block(&s.owner, project.id, new_block(None, 1, 1))
        .await
        .unwrap();
    assert_eq!(second.block.name, "Block B");
    assert_eq!(second.block.sequence, 2);

    assert_matches!(
        s.blocks
            .create_block(&s.owner, project.id, new_block(Some("Block A"), 1, 1))
            .await,
        Err(ServiceError::Conflict(_))
    );

    let stored = project::Entity::find_by_id(project.id)
        .one(&*s.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.block_count, 2);

    let summaries = s
        .projects
        .project_summaries(&s.owner, ConfigurationFilter::Flat)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].units.total, 7);
    assert_eq!(summaries[0].units.available, 7);
}

#[tokio::test]
async fn block_capacity_only_grows() {
    let s = services().await;
    let project = s.projects.create_project(&s.owner, new_project("P-400")).await.unwrap();
    let created = s
        .blocks
        .create_block(&s.owner, project.id, new_block(Some("Tower 1"), 2, 2))
        .await
        .unwrap();
    let block_id = created.block.id;

    let shrink = UpdateBlockInput {
        floor_count: Some(1),
        ..Default::default()
    };
    assert_matches!(
        s.blocks.update_block(&s.owner, block_id, shrink).await,
        Err(ServiceError::InvalidInput(_))
    );

    // A sold unit with a buyer and a pinned stage must survive the resize untouched
    let first = project_unit::Entity::find()
        .filter(project_unit::Column::BlockId.eq(block_id))
        .filter(project_unit::Column::FloorNumber.eq(1))
        .filter(project_unit::Column::UnitNumber.eq(1))
        .one(&*s.db)
        .await
        .unwrap()
        .unwrap();
    let mut sold: project_unit::ActiveModel = first.into();
    sold.label = Set("Penthouse".to_string());
    sold.status = Set(UnitStatus::Sold);
    sold.crm_stage = Set(CrmStage::Active);
    sold.crm_stage_explicit = Set(true);
    sold.buyer_name = Set(Some("Meera".to_string()));
    sold.buyer_phone = Set(Some("98450 00000".to_string()));
    sold.price = Set(Some(dec!(7500000)));
    let sold = sold.update(&*s.db).await.unwrap();

    let grow = UpdateBlockInput {
        floor_count: Some(3),
        units_per_floor: Some(3),
        ..Default::default()
    };
    let grown = s.blocks.update_block(&s.owner, block_id, grow).await.unwrap();
    assert_eq!(grown.created_units, 5);
    assert_eq!(project_unit::Entity::find().count(&*s.db).await.unwrap(), 9);

    let after = project_unit::Entity::find_by_id(sold.id)
        .one(&*s.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after, sold);

    assert_matches!(
        s.blocks
            .create_block(&s.owner, project.id, new_block(None, 0, 4))
            .await,
        Err(ServiceError::InvalidInput(_))
    );
}

#[tokio::test]
async fn delete_block_removes_its_units() {
    let s = services().await;
    let project = s.projects.create_project(&s.owner, new_project("P-450")).await.unwrap();
    let created = s
        .blocks
        .create_block(&s.owner, project.id, new_block(None, 2, 2))
        .await
        .unwrap();

    s.blocks.delete_block(&s.owner, created.block.id).await.unwrap();

    assert_eq!(project_unit::Entity::find().count(&*s.db).await.unwrap(), 0);
    let stored = project::Entity::find_by_id(project.id)
        .one(&*s.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.block_count, 0);
}

#[tokio::test]
async fn finance_records_guard_deletion() {
    let s = services().await;
    let with_expense = s.projects.create_project(&s.owner, new_project("P-500")).await.unwrap();
    let with_payment = s.projects.create_project(&s.owner, new_project("P-501")).await.unwrap();
    seed_expense(&s.db, with_expense.id, dec!(1200)).await;
    seed_payment(&s.db, with_payment.id, dec!(50000)).await;

    assert_matches!(
        s.projects.delete_project(&s.owner, with_expense.id).await,
        Err(ServiceError::ReferentialGuard(_))
    );
    assert_matches!(
        s.projects.delete_project(&s.owner, with_payment.id).await,
        Err(ServiceError::ReferentialGuard(_))
    );
    assert_eq!(project::Entity::find().count(&*s.db).await.unwrap(), 2);
}

#[tokio::test]
async fn delete_cascades_through_blocks_and_units() {
    let s = services().await;
    let project = s.projects.create_project(&s.owner, new_project("P-600")).await.unwrap();
    s.blocks
        .create_block(&s.owner, project.id, new_block(None, 2, 2))
        .await
        .unwrap();

    s.projects.delete_project(&s.owner, project.id).await.unwrap();

    assert_eq!(project::Entity::find().count(&*s.db).await.unwrap(), 0);
    assert_eq!(project_block::Entity::find().count(&*s.db).await.unwrap(), 0);
    assert_eq!(project_unit::Entity::find().count(&*s.db).await.unwrap(), 0);
    assert_matches!(
        s.projects.get_project(&s.owner, project.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn only_the_owner_deletes() {
    let s = services().await;
    let project = common::seed_project(&s.db, ProjectSeed::owned_by(2, "P-700")).await;

    assert_matches!(
        s.projects.delete_project(&s.owner, project.id).await,
        Err(ServiceError::Forbidden(_))
    );
}

#[rstest::rstest]
#[case(0, 4)]
#[case(2, 0)]
#[case(201, 1)]
#[case(1, 101)]
#[tokio::test]
async fn capacity_outside_limits_is_rejected(#[case] floors: i32, #[case] units: i32) {
    let s = services().await;
    let project = s.projects.create_project(&s.owner, new_project("P-CAP")).await.unwrap();

    assert_matches!(
        s.blocks
            .create_block(&s.owner, project.id, new_block(None, floors, units))
            .await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_eq!(project_block::Entity::find().count(&*s.db).await.unwrap(), 0);
}
