use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_asu_tables::Migration),
            Box::new(m20240101_000003_create_dyeing_tables::Migration),
            Box::new(m20240101_000004_create_inventory_tables::Migration),
            Box::new(m20240101_000005_create_shop_floor_tables::Migration),
            Box::new(m20240101_000006_create_bom_tables::Migration),
            Box::new(m20240101_000007_single_running_job_per_machine::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_users_table {
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
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                        .col(ColumnDef::new(Users::Unit).integer().null())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::LastLoginAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
                        .unique()
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

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        Unit,
        Active,
        LastLoginAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_asu_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_asu_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AsuMachines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AsuMachines::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(AsuMachines::Unit).integer().not_null())
                        .col(ColumnDef::new(AsuMachines::MachineNo).integer().not_null())
                        .col(ColumnDef::new(AsuMachines::MachineName).string().not_null())
                        .col(ColumnDef::new(AsuMachines::Count).string().not_null())
                        .col(ColumnDef::new(AsuMachines::YarnType).string().not_null())
                        .col(
                            ColumnDef::new(AsuMachines::Spindles)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(AsuMachines::Speed)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(AsuMachines::ProductionAt100)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(AsuMachines::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(AsuMachines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuMachines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_asu_machines_unit_machine_no")
                        .table(AsuMachines::Table)
                        .col(AsuMachines::Unit)
                        .col(AsuMachines::MachineNo)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AsuMachineConfigurations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::MachineId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::Version)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AsuMachineConfigurations::Count).string().not_null())
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::YarnType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::Spindles)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AsuMachineConfigurations::Speed).double().not_null())
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::ProductionAt100)
                                .double()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::EffectiveFrom)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::EffectiveTo)
                                .date()
                                .null(),
                        )
                        .col(ColumnDef::new(AsuMachineConfigurations::Notes).text().null())
                        .col(ColumnDef::new(AsuMachineConfigurations::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(AsuMachineConfigurations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asu_configurations_machine_id")
                                .from(
                                    AsuMachineConfigurations::Table,
                                    AsuMachineConfigurations::MachineId,
                                )
                                .to(AsuMachines::Table, AsuMachines::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_asu_configurations_machine_version")
                        .table(AsuMachineConfigurations::Table)
                        .col(AsuMachineConfigurations::MachineId)
                        .col(AsuMachineConfigurations::Version)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AsuProductionEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AsuProductionEntries::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(AsuProductionEntries::Unit).integer().not_null())
                        .col(
                            ColumnDef::new(AsuProductionEntries::MachineId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AsuProductionEntries::Date).date().not_null())
                        .col(
                            ColumnDef::new(AsuProductionEntries::Shift)
                                .string_len(8)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuProductionEntries::ActualProduction)
                                .double()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuProductionEntries::TheoreticalProduction)
                                .double()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuProductionEntries::Percentage)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(AsuProductionEntries::Remarks).text().null())
                        .col(ColumnDef::new(AsuProductionEntries::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(AsuProductionEntries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AsuProductionEntries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asu_entries_machine_id")
                                .from(AsuProductionEntries::Table, AsuProductionEntries::MachineId)
                                .to(AsuMachines::Table, AsuMachines::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_asu_entries_unit_machine_date_shift")
                        .table(AsuProductionEntries::Table)
                        .col(AsuProductionEntries::Unit)
                        .col(AsuProductionEntries::MachineId)
                        .col(AsuProductionEntries::Date)
                        .col(AsuProductionEntries::Shift)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asu_entries_date")
                        .table(AsuProductionEntries::Table)
                        .col(AsuProductionEntries::Date)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AsuProductionEntries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AsuMachineConfigurations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AsuMachines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AsuMachines {
        Table,
        Id,
        Unit,
        MachineNo,
        MachineName,
        Count,
        YarnType,
        Spindles,
        Speed,
        #[sea_orm(iden = "production_at_100")]
        ProductionAt100,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum AsuMachineConfigurations {
        Table,
        Id,
        MachineId,
        Version,
        Count,
        YarnType,
        Spindles,
        Speed,
        #[sea_orm(iden = "production_at_100")]
        ProductionAt100,
        EffectiveFrom,
        EffectiveTo,
        Notes,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum AsuProductionEntries {
        Table,
        Id,
        Unit,
        MachineId,
        Date,
        Shift,
        ActualProduction,
        TheoreticalProduction,
        Percentage,
        Remarks,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_dyeing_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_dyeing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CountProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CountProducts::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CountProducts::CountName)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(CountProducts::YarnType).string().not_null())
                        .col(ColumnDef::new(CountProducts::Quality).string().null())
                        .col(ColumnDef::new(CountProducts::Description).text().null())
                        .col(
                            ColumnDef::new(CountProducts::RatePerKg)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CountProducts::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(CountProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CountProducts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DyeingFirms::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DyeingFirms::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DyeingFirms::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(DyeingFirms::ContactPerson).string().null())
                        .col(ColumnDef::new(DyeingFirms::Phone).string().null())
                        .col(ColumnDef::new(DyeingFirms::Address).text().null())
                        .col(
                            ColumnDef::new(DyeingFirms::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(DyeingFirms::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DyeingFirms::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DyeingOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DyeingOrders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DyeingOrders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(DyeingOrders::FirmId).integer().not_null())
                        .col(ColumnDef::new(DyeingOrders::CountProductId).integer().null())
                        .col(ColumnDef::new(DyeingOrders::Shade).string().not_null())
                        .col(
                            ColumnDef::new(DyeingOrders::QuantitySentKg)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DyeingOrders::QuantityReceivedKg)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(DyeingOrders::RatePerKg)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(DyeingOrders::Status).string_len(24).not_null())
                        .col(ColumnDef::new(DyeingOrders::SentDate).date().null())
                        .col(ColumnDef::new(DyeingOrders::ExpectedDate).date().null())
                        .col(ColumnDef::new(DyeingOrders::ReceivedDate).date().null())
                        .col(ColumnDef::new(DyeingOrders::Remarks).text().null())
                        .col(
                            ColumnDef::new(DyeingOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DyeingOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_dyeing_orders_firm_id")
                                .from(DyeingOrders::Table, DyeingOrders::FirmId)
                                .to(DyeingFirms::Table, DyeingFirms::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_dyeing_orders_count_product_id")
                                .from(DyeingOrders::Table, DyeingOrders::CountProductId)
                                .to(CountProducts::Table, CountProducts::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_dyeing_orders_status")
                        .table(DyeingOrders::Table)
                        .col(DyeingOrders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DyeingOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DyeingFirms::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CountProducts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CountProducts {
        Table,
        Id,
        CountName,
        YarnType,
        Quality,
        Description,
        RatePerKg,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DyeingFirms {
        Table,
        Id,
        Name,
        ContactPerson,
        Phone,
        Address,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DyeingOrders {
        Table,
        Id,
        OrderNumber,
        FirmId,
        CountProductId,
        Shade,
        QuantitySentKg,
        QuantityReceivedKg,
        RatePerKg,
        Status,
        SentDate,
        ExpectedDate,
        ReceivedDate,
        Remarks,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::Sku)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Category).string_len(16).not_null())
                        .col(ColumnDef::new(InventoryItems::UnitOfMeasure).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::Quantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::ReorderLevel)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UnitCost)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(InventoryItems::Location).string().null())
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryTransactions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(InventoryTransactions::ItemId).integer().not_null())
                        .col(
                            ColumnDef::new(InventoryTransactions::Kind)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::QuantityChange)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryTransactions::BalanceAfter)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryTransactions::Reason).string().not_null())
                        .col(ColumnDef::new(InventoryTransactions::Reference).string().null())
                        .col(ColumnDef::new(InventoryTransactions::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(InventoryTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_transactions_item_id")
                                .from(InventoryTransactions::Table, InventoryTransactions::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_transactions_item_id")
                        .table(InventoryTransactions::Table)
                        .col(InventoryTransactions::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
        Sku,
        Name,
        Category,
        UnitOfMeasure,
        Quantity,
        ReorderLevel,
        UnitCost,
        Location,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryTransactions {
        Table,
        Id,
        ItemId,
        Kind,
        QuantityChange,
        BalanceAfter,
        Reason,
        Reference,
        CreatedBy,
        CreatedAt,
    }
}

mod m20240101_000005_create_shop_floor_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_shop_floor_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Machines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Machines::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Machines::MachineCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Machines::Name).string().not_null())
                        .col(ColumnDef::new(Machines::MachineType).string().not_null())
                        .col(ColumnDef::new(Machines::Department).string().null())
                        .col(ColumnDef::new(Machines::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Machines::CapacityPerHour).double().null())
                        .col(ColumnDef::new(Machines::InstalledOn).date().null())
                        .col(
                            ColumnDef::new(Machines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Machines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(WorkOrders::Title).string().not_null())
                        .col(ColumnDef::new(WorkOrders::CountProductId).integer().null())
                        .col(
                            ColumnDef::new(WorkOrders::TargetQuantityKg)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::ProducedQuantityKg)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(WorkOrders::Status).string_len(16).not_null())
                        .col(ColumnDef::new(WorkOrders::Priority).string_len(8).not_null())
                        .col(ColumnDef::new(WorkOrders::DueDate).date().null())
                        .col(ColumnDef::new(WorkOrders::AssignedTo).string().null())
                        .col(ColumnDef::new(WorkOrders::Notes).text().null())
                        .col(
                            ColumnDef::new(WorkOrders::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_orders_count_product_id")
                                .from(WorkOrders::Table, WorkOrders::CountProductId)
                                .to(CountProducts::Table, CountProducts::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductionJobs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionJobs::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::JobNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProductionJobs::MachineId).integer().not_null())
                        .col(ColumnDef::new(ProductionJobs::WorkOrderId).integer().null())
                        .col(
                            ColumnDef::new(ProductionJobs::PlannedQuantityKg)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::ProducedQuantityKg)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(ProductionJobs::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(ProductionJobs::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::FinishedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductionJobs::Notes).text().null())
                        .col(
                            ColumnDef::new(ProductionJobs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_jobs_machine_id")
                                .from(ProductionJobs::Table, ProductionJobs::MachineId)
                                .to(Machines::Table, Machines::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_jobs_work_order_id")
                                .from(ProductionJobs::Table, ProductionJobs::WorkOrderId)
                                .to(WorkOrders::Table, WorkOrders::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_jobs_machine_status")
                        .table(ProductionJobs::Table)
                        .col(ProductionJobs::MachineId)
                        .col(ProductionJobs::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductionJobs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Machines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Machines {
        Table,
        Id,
        MachineCode,
        Name,
        MachineType,
        Department,
        Status,
        CapacityPerHour,
        InstalledOn,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WorkOrders {
        Table,
        Id,
        OrderNumber,
        Title,
        CountProductId,
        TargetQuantityKg,
        ProducedQuantityKg,
        Status,
        Priority,
        DueDate,
        AssignedTo,
        Notes,
        StartedAt,
        CompletedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductionJobs {
        Table,
        Id,
        JobNumber,
        MachineId,
        WorkOrderId,
        PlannedQuantityKg,
        ProducedQuantityKg,
        Status,
        StartedAt,
        FinishedAt,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CountProducts {
        Table,
        Id,
    }
}

mod m20240101_000006_create_bom_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_bom_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BomHeaders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BomHeaders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(BomHeaders::BomCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(BomHeaders::ProductName).string().not_null())
                        .col(ColumnDef::new(BomHeaders::CountProductId).integer().null())
                        .col(
                            ColumnDef::new(BomHeaders::OutputQuantityKg)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(BomHeaders::Revision).string().not_null())
                        .col(
                            ColumnDef::new(BomHeaders::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(BomHeaders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BomHeaders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bom_headers_count_product_id")
                                .from(BomHeaders::Table, BomHeaders::CountProductId)
                                .to(CountProducts::Table, CountProducts::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BomLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BomLines::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(BomLines::BomId).integer().not_null())
                        .col(ColumnDef::new(BomLines::InventoryItemId).integer().not_null())
                        .col(
                            ColumnDef::new(BomLines::QuantityPerBatch)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BomLines::WastagePercent)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(BomLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bom_lines_bom_id")
                                .from(BomLines::Table, BomLines::BomId)
                                .to(BomHeaders::Table, BomHeaders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bom_lines_inventory_item_id")
                                .from(BomLines::Table, BomLines::InventoryItemId)
                                .to(InventoryItems::Table, InventoryItems::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_bom_lines_bom_item")
                        .table(BomLines::Table)
                        .col(BomLines::BomId)
                        .col(BomLines::InventoryItemId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BomLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BomHeaders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BomHeaders {
        Table,
        Id,
        BomCode,
        ProductName,
        CountProductId,
        OutputQuantityKg,
        Revision,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum BomLines {
        Table,
        Id,
        BomId,
        InventoryItemId,
        QuantityPerBatch,
        WastagePercent,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum InventoryItems {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum CountProducts {
        Table,
        Id,
    }
}

mod m20240101_000007_single_running_job_per_machine {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_single_running_job_per_machine"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Partial index; same syntax on Postgres and SQLite
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS uq_production_jobs_running_machine \
                     ON production_jobs (machine_id) WHERE status = 'running'",
                )
                .await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .get_connection()
                .execute_unprepared("DROP INDEX IF EXISTS uq_production_jobs_running_machine")
                .await?;
            Ok(())
        }
    }
}

/// Connects to `db_url` and applies every pending migration.
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
