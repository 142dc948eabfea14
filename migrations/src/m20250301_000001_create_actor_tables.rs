use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Profile carries the declared role (user_type) of an authenticated actor
        manager
            .create_table(
                Table::create()
                    .table(ActorProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActorProfiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ActorProfiles::ActorId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ActorProfiles::UserType).string_len(32).null())
                    .col(ColumnDef::new(ActorProfiles::DisplayName).string().null())
                    .col(
                        ColumnDef::new(ActorProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Supervisors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Supervisors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Supervisors::ActorId).integer().null())
                    .col(ColumnDef::new(Supervisors::CreatedBy).integer().null())
                    .col(ColumnDef::new(Supervisors::Code).string_len(32).not_null())
                    .col(ColumnDef::new(Supervisors::Name).string().not_null())
                    .col(ColumnDef::new(Supervisors::PrimaryPhone).string_len(32).null())
                    .col(ColumnDef::new(Supervisors::Email).string().null())
                    .col(ColumnDef::new(Supervisors::Address).text().null())
                    .col(
                        ColumnDef::new(Supervisors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Supervisors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::ActorId).integer().null())
                    .col(ColumnDef::new(Customers::Code).string_len(32).not_null())
                    .col(ColumnDef::new(Customers::Name).string().not_null())
                    .col(ColumnDef::new(Customers::PrimaryPhone).string_len(32).null())
                    .col(ColumnDef::new(Customers::Email).string().null())
                    .col(ColumnDef::new(Customers::CompanyName).string().null())
                    .col(
                        ColumnDef::new(Customers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Customers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Supervisors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActorProfiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ActorProfiles {
    Table,
    Id,
    ActorId,
    UserType,
    DisplayName,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Supervisors {
    Table,
    Id,
    ActorId,
    CreatedBy,
    Code,
    Name,
    PrimaryPhone,
    Email,
    Address,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Customers {
    Table,
    Id,
    ActorId,
    Code,
    Name,
    PrimaryPhone,
    Email,
    CompanyName,
    CreatedAt,
    UpdatedAt,
}
