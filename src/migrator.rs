use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_invoice_lines_table::Migration),
            Box::new(m20240101_000003_create_movements_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Suppliers::ContactInfo).string().null())
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::Barcode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Unit)
                                .string()
                                .not_null()
                                .default("pcs"),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
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
                        .name("idx_products_name")
                        .table(Products::Table)
                        .col(Products::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Suppliers {
        Table,
        Id,
        Name,
        ContactInfo,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Id,
        Barcode,
        Name,
        Unit,
        CreatedAt,
    }
}

mod m20240101_000002_create_invoice_lines_table {

    use super::m20240101_000001_create_catalog_tables::{Products, Suppliers};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_invoice_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InvoiceLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InvoiceLines::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceLines::SupplierId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceLines::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InvoiceLines::DocumentNo).string().not_null())
                        .col(ColumnDef::new(InvoiceLines::InvoiceDate).date().not_null())
                        .col(
                            ColumnDef::new(InvoiceLines::QuantityReceived)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceLines::QuantityRemaining)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InvoiceLines::UnitPrice).decimal().not_null())
                        .col(
                            ColumnDef::new(InvoiceLines::DiscountPct)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InvoiceLines::VatPct).decimal().not_null())
                        .col(
                            ColumnDef::new(InvoiceLines::NetUnitCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InvoiceLines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoice_lines_supplier_id")
                                .from(InvoiceLines::Table, InvoiceLines::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoice_lines_product_id")
                                .from(InvoiceLines::Table, InvoiceLines::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            // One document number per supplier
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoice_lines_supplier_document")
                        .table(InvoiceLines::Table)
                        .col(InvoiceLines::SupplierId)
                        .col(InvoiceLines::DocumentNo)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // FIFO scan: (supplier, product) ordered by date
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoice_lines_fifo")
                        .table(InvoiceLines::Table)
                        .col(InvoiceLines::SupplierId)
                        .col(InvoiceLines::ProductId)
                        .col(InvoiceLines::InvoiceDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InvoiceLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum InvoiceLines {
        Table,
        Id,
        SupplierId,
        ProductId,
        DocumentNo,
        InvoiceDate,
        QuantityReceived,
        QuantityRemaining,
        UnitPrice,
        DiscountPct,
        VatPct,
        NetUnitCost,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_movements_table {

    use super::m20240101_000001_create_catalog_tables::{Products, Suppliers};
    use super::m20240101_000002_create_invoice_lines_table::InvoiceLines;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Movements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Movements::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Movements::InvoiceLineId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Movements::SupplierId).big_integer().not_null())
                        .col(ColumnDef::new(Movements::ProductId).big_integer().not_null())
                        .col(ColumnDef::new(Movements::Quantity).integer().not_null())
                        .col(ColumnDef::new(Movements::ShipmentNo).string().not_null())
                        .col(ColumnDef::new(Movements::Destination).string().not_null())
                        .col(ColumnDef::new(Movements::Recipient).string().not_null())
                        .col(ColumnDef::new(Movements::MovementDate).date().not_null())
                        .col(
                            ColumnDef::new(Movements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_movements_invoice_line_id")
                                .from(Movements::Table, Movements::InvoiceLineId)
                                .to(InvoiceLines::Table, InvoiceLines::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_movements_supplier_id")
                                .from(Movements::Table, Movements::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_movements_product_id")
                                .from(Movements::Table, Movements::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_movements_invoice_line_id")
                        .table(Movements::Table)
                        .col(Movements::InvoiceLineId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_movements_supplier_product")
                        .table(Movements::Table)
                        .col(Movements::SupplierId)
                        .col(Movements::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Movements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Movements {
        Table,
        Id,
        InvoiceLineId,
        SupplierId,
        ProductId,
        Quantity,
        ShipmentNo,
        Destination,
        Recipient,
        MovementDate,
        CreatedAt,
    }
}
