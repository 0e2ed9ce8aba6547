use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_properties_table::Migration),
            Box::new(m20240101_000003_create_parts_table::Migration),
            Box::new(m20240101_000004_create_procurements_table::Migration),
            Box::new(m20240101_000005_create_deployments_table::Migration),
            Box::new(m20240101_000006_create_sales_table::Migration),
            Box::new(m20240101_000007_create_expenses_table::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    Avatar,
    IsAllowed,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Parts {
    Table,
    Id,
    PartName,
    BrandName,
    QtyLeft,
    CreatedAt,
    UpdatedAt,
}

mod m20240101_000001_create_users_table {
    use super::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Avatar).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsAllowed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000002_create_properties_table {
    use super::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_properties_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Properties::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Properties::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Properties::Title).string().not_null())
                        .col(ColumnDef::new(Properties::Description).text().not_null())
                        .col(ColumnDef::new(Properties::PropertyType).string().not_null())
                        .col(ColumnDef::new(Properties::Location).string().not_null())
                        .col(
                            ColumnDef::new(Properties::Price)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Properties::Photo).string().not_null())
                        .col(ColumnDef::new(Properties::CreatorId).uuid().not_null())
                        .col(
                            ColumnDef::new(Properties::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_properties_creator")
                                .from(Properties::Table, Properties::CreatorId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_properties_creator")
                        .table(Properties::Table)
                        .col(Properties::CreatorId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Properties::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Properties {
        Table,
        Id,
        Title,
        Description,
        PropertyType,
        Location,
        Price,
        Photo,
        CreatorId,
        CreatedAt,
    }
}

mod m20240101_000003_create_parts_table {
    use super::Parts;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_parts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Parts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Parts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Parts::PartName).string().not_null())
                        .col(ColumnDef::new(Parts::BrandName).string().not_null())
                        .col(
                            ColumnDef::new(Parts::QtyLeft)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Parts::QtyLeft).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Parts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Parts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_parts_name_brand")
                        .table(Parts::Table)
                        .col(Parts::PartName)
                        .col(Parts::BrandName)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Parts::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000004_create_procurements_table {
    use super::{Parts, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_procurements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Procurements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Procurements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Procurements::Seq).integer().not_null())
                        .col(ColumnDef::new(Procurements::Date).date().not_null())
                        .col(ColumnDef::new(Procurements::SupplierName).string().not_null())
                        .col(ColumnDef::new(Procurements::Reference).string().not_null())
                        .col(ColumnDef::new(Procurements::Tin).string().not_null())
                        .col(ColumnDef::new(Procurements::Address).string().not_null())
                        .col(ColumnDef::new(Procurements::Description).text().not_null())
                        .col(ColumnDef::new(Procurements::PartId).uuid().not_null())
                        .col(
                            ColumnDef::new(Procurements::QuantityBought)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Procurements::Amount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Procurements::NetOfVat)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Procurements::InputVat)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Procurements::IsNonVat)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Procurements::NoValidReceipt)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Procurements::CreatorId).uuid().not_null())
                        .col(
                            ColumnDef::new(Procurements::Deleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Procurements::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Procurements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Procurements::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_procurements_part")
                                .from(Procurements::Table, Procurements::PartId)
                                .to(Parts::Table, Parts::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_procurements_creator")
                                .from(Procurements::Table, Procurements::CreatorId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_procurements_part")
                        .table(Procurements::Table)
                        .col(Procurements::PartId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_procurements_date")
                        .table(Procurements::Table)
                        .col(Procurements::Date)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Procurements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Procurements {
        Table,
        Id,
        Seq,
        Date,
        SupplierName,
        Reference,
        Tin,
        Address,
        Description,
        PartId,
        QuantityBought,
        Amount,
        NetOfVat,
        InputVat,
        IsNonVat,
        NoValidReceipt,
        CreatorId,
        Deleted,
        DeletedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_deployments_table {
    use super::{Parts, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_deployments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Deployments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Deployments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Deployments::Seq).integer().not_null())
                        .col(ColumnDef::new(Deployments::Date).date().not_null())
                        .col(ColumnDef::new(Deployments::ClientName).string().not_null())
                        .col(ColumnDef::new(Deployments::VehicleName).string().not_null())
                        .col(
                            ColumnDef::new(Deployments::CarRegistration)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Deployments::PartId).uuid().not_null())
                        .col(
                            ColumnDef::new(Deployments::QuantityUsed)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Deployments::DeploymentStatus)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Deployments::DeploymentDate).date().null())
                        .col(
                            ColumnDef::new(Deployments::ReleaseStatus)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Deployments::ReleaseDate).date().null())
                        .col(ColumnDef::new(Deployments::CreatorId).uuid().not_null())
                        .col(
                            ColumnDef::new(Deployments::Deleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Deployments::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Deployments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Deployments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deployments_part")
                                .from(Deployments::Table, Deployments::PartId)
                                .to(Parts::Table, Parts::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deployments_creator")
                                .from(Deployments::Table, Deployments::CreatorId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_deployments_part")
                        .table(Deployments::Table)
                        .col(Deployments::PartId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_deployments_registration")
                        .table(Deployments::Table)
                        .col(Deployments::CarRegistration)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Deployments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Deployments {
        Table,
        Id,
        Seq,
        Date,
        ClientName,
        VehicleName,
        CarRegistration,
        PartId,
        QuantityUsed,
        DeploymentStatus,
        DeploymentDate,
        ReleaseStatus,
        ReleaseDate,
        CreatorId,
        Deleted,
        DeletedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_sales_table {
    use super::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_sales_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sales::Seq).integer().not_null())
                        .col(ColumnDef::new(Sales::Date).date().not_null())
                        .col(ColumnDef::new(Sales::ClientName).string().not_null())
                        .col(ColumnDef::new(Sales::Tin).string().not_null())
                        .col(ColumnDef::new(Sales::Address).string().not_null())
                        .col(ColumnDef::new(Sales::Description).text().not_null())
                        .col(ColumnDef::new(Sales::Amount).decimal_len(14, 2).not_null())
                        .col(ColumnDef::new(Sales::NetOfVat).decimal_len(14, 2).not_null())
                        .col(ColumnDef::new(Sales::OutputVat).decimal_len(14, 2).not_null())
                        .col(ColumnDef::new(Sales::CreatorId).uuid().not_null())
                        .col(
                            ColumnDef::new(Sales::Deleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Sales::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Sales::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sales::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_creator")
                                .from(Sales::Table, Sales::CreatorId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_sales_date")
                        .table(Sales::Table)
                        .col(Sales::Date)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
        Seq,
        Date,
        ClientName,
        Tin,
        Address,
        Description,
        Amount,
        NetOfVat,
        OutputVat,
        CreatorId,
        Deleted,
        DeletedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000007_create_expenses_table {
    use super::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_expenses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Expenses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Expenses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Expenses::Seq).integer().not_null())
                        .col(ColumnDef::new(Expenses::Date).date().not_null())
                        .col(ColumnDef::new(Expenses::SupplierName).string().not_null())
                        .col(ColumnDef::new(Expenses::Reference).string().not_null())
                        .col(ColumnDef::new(Expenses::Tin).string().not_null())
                        .col(ColumnDef::new(Expenses::Address).string().not_null())
                        .col(ColumnDef::new(Expenses::Description).text().not_null())
                        .col(ColumnDef::new(Expenses::Amount).decimal_len(14, 2).not_null())
                        .col(ColumnDef::new(Expenses::NetOfVat).decimal_len(14, 2).not_null())
                        .col(ColumnDef::new(Expenses::InputVat).decimal_len(14, 2).not_null())
                        .col(
                            ColumnDef::new(Expenses::IsNonVat)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Expenses::NoValidReceipt)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Expenses::CreatorId).uuid().not_null())
                        .col(
                            ColumnDef::new(Expenses::Deleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Expenses::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Expenses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Expenses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_expenses_creator")
                                .from(Expenses::Table, Expenses::CreatorId)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_expenses_date")
                        .table(Expenses::Table)
                        .col(Expenses::Date)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Expenses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Expenses {
        Table,
        Id,
        Seq,
        Date,
        SupplierName,
        Reference,
        Tin,
        Address,
        Description,
        Amount,
        NetOfVat,
        InputVat,
        IsNonVat,
        NoValidReceipt,
        CreatorId,
        Deleted,
        DeletedAt,
        CreatedAt,
        UpdatedAt,
    }
}
