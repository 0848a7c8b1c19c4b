//! Schema migrations, compiled into the crate so tests and the binary share
//! one migrator.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_cart_and_promo_tables::Migration),
            Box::new(m20240101_000003_create_order_tables::Migration),
            Box::new(m20240101_000004_create_settings_table::Migration),
        ]
    }
}

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
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Price).decimal().not_null())
                        .col(ColumnDef::new(Products::StockQuantity).integer().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::MaxQuantityPerOrder)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                        .col(ColumnDef::new(ProductVariants::Price).decimal().not_null())
                        .col(
                            ColumnDef::new(ProductVariants::StockQuantity)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_product_variants_product_id")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::ProductId)
                        .to_owned(),
                )
                .await?;

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
                        .col(ColumnDef::new(Properties::Name).string().not_null())
                        .col(ColumnDef::new(Properties::Description).text().null())
                        .col(ColumnDef::new(Properties::Location).string().not_null())
                        .col(ColumnDef::new(Properties::NightlyRate).decimal().not_null())
                        .col(ColumnDef::new(Properties::MaxGuests).integer().not_null())
                        .col(
                            ColumnDef::new(Properties::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Properties::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Properties::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Activities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Activities::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Activities::Name).string().not_null())
                        .col(ColumnDef::new(Activities::Description).text().null())
                        .col(ColumnDef::new(Activities::Price).decimal().not_null())
                        .col(
                            ColumnDef::new(Activities::MinParticipants)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Activities::MaxParticipants)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Activities::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Activities::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Activities::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Activities::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Properties::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Description,
        Price,
        StockQuantity,
        IsActive,
        MaxQuantityPerOrder,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductVariants {
        Table,
        Id,
        ProductId,
        Name,
        Price,
        StockQuantity,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Properties {
        Table,
        Id,
        Name,
        Description,
        Location,
        NightlyRate,
        MaxGuests,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Activities {
        Table,
        Id,
        Name,
        Description,
        Price,
        MinParticipants,
        MaxParticipants,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_cart_and_promo_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_cart_and_promo_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::VariantId).uuid().null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(CartItems::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(CartItems::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_user_id")
                        .table(CartItems::Table)
                        .col(CartItems::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PromoCodes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PromoCodes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PromoCodes::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PromoCodes::DiscountType).string().not_null())
                        .col(
                            ColumnDef::new(PromoCodes::DiscountValue)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PromoCodes::MinimumAmount).decimal().null())
                        .col(ColumnDef::new(PromoCodes::MaximumDiscount).decimal().null())
                        .col(ColumnDef::new(PromoCodes::UsageLimit).integer().null())
                        .col(ColumnDef::new(PromoCodes::ExpiresAt).timestamp().null())
                        .col(
                            ColumnDef::new(PromoCodes::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(PromoCodes::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(PromoCodes::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserPromoCodes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(UserPromoCodes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(UserPromoCodes::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(UserPromoCodes::PromoCodeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserPromoCodes::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(UserPromoCodes::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserPromoCodes::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_user_promo_codes_user_id")
                        .table(UserPromoCodes::Table)
                        .col(UserPromoCodes::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UserPromoCodes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PromoCodes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        UserId,
        ProductId,
        VariantId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PromoCodes {
        Table,
        Id,
        Code,
        DiscountType,
        DiscountValue,
        MinimumAmount,
        MaximumDiscount,
        UsageLimit,
        ExpiresAt,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum UserPromoCodes {
        Table,
        Id,
        UserId,
        PromoCodeId,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::OrderType).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::Subtotal).decimal().not_null())
                        .col(ColumnDef::new(Orders::Tax).decimal().not_null())
                        .col(ColumnDef::new(Orders::Shipping).decimal().not_null())
                        .col(ColumnDef::new(Orders::Total).decimal().not_null())
                        .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).json().null())
                        .col(ColumnDef::new(Orders::BillingAddress).json().null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::VariantId).uuid().null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::LineTotal).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PropertyBookings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PropertyBookings::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PropertyBookings::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(PropertyBookings::PropertyId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PropertyBookings::CheckIn).date().not_null())
                        .col(ColumnDef::new(PropertyBookings::CheckOut).date().not_null())
                        .col(ColumnDef::new(PropertyBookings::Guests).integer().not_null())
                        .col(ColumnDef::new(PropertyBookings::Nights).integer().not_null())
                        .col(
                            ColumnDef::new(PropertyBookings::NightlyRate)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PropertyBookings::Total).decimal().not_null())
                        .col(ColumnDef::new(PropertyBookings::Status).string().not_null())
                        .col(
                            ColumnDef::new(PropertyBookings::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_property_bookings_property_id")
                        .table(PropertyBookings::Table)
                        .col(PropertyBookings::PropertyId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ActivityBookings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ActivityBookings::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ActivityBookings::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(ActivityBookings::ActivityId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ActivityBookings::ActivityDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ActivityBookings::Participants)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ActivityBookings::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ActivityBookings::Total).decimal().not_null())
                        .col(ColumnDef::new(ActivityBookings::Status).string().not_null())
                        .col(
                            ColumnDef::new(ActivityBookings::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ActivityBookings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PropertyBookings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        UserId,
        OrderType,
        Status,
        Subtotal,
        Tax,
        Shipping,
        Total,
        PaymentMethod,
        PaymentStatus,
        ShippingAddress,
        BillingAddress,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        VariantId,
        Name,
        Quantity,
        UnitPrice,
        LineTotal,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PropertyBookings {
        Table,
        Id,
        OrderId,
        PropertyId,
        CheckIn,
        CheckOut,
        Guests,
        Nights,
        NightlyRate,
        Total,
        Status,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ActivityBookings {
        Table,
        Id,
        OrderId,
        ActivityId,
        ActivityDate,
        Participants,
        UnitPrice,
        Total,
        Status,
        CreatedAt,
    }
}

mod m20240101_000004_create_settings_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_settings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Settings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Settings::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Settings::Key)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Settings::Value).text().not_null())
                        .col(ColumnDef::new(Settings::DataType).string().not_null())
                        .col(
                            ColumnDef::new(Settings::Category)
                                .string()
                                .not_null()
                                .default("general"),
                        )
                        .col(
                            ColumnDef::new(Settings::IsEditable)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Settings::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Settings::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Settings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Settings {
        Table,
        Id,
        Key,
        Value,
        DataType,
        Category,
        IsEditable,
        CreatedAt,
        UpdatedAt,
    }
}
