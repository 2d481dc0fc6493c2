use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Raw RatesUpdated batches, keyed by "<tx hash>-<log index>"
        manager
            .create_table(
                Table::create()
                    .table(RatesUpdated::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RatesUpdated::Id)
                            .string_len(96)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RatesUpdated::CurrencyKeys)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RatesUpdated::NewRates).json_binary().not_null())
                    .col(ColumnDef::new(RatesUpdated::Timestamp).big_integer().not_null())
                    .col(ColumnDef::new(RatesUpdated::Block).big_integer().not_null())
                    .col(ColumnDef::new(RatesUpdated::FromAddress).string_len(42).not_null())
                    .col(ColumnDef::new(RatesUpdated::GasPrice).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RateUpdates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RateUpdates::Id)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RateUpdates::Block).big_integer().not_null())
                    .col(ColumnDef::new(RateUpdates::Timestamp).big_integer().not_null())
                    .col(ColumnDef::new(RateUpdates::CurrencyKey).string_len(66).not_null())
                    .col(ColumnDef::new(RateUpdates::Synth).string_len(32).not_null())
                    .col(ColumnDef::new(RateUpdates::Rate).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rate_updates_synth_timestamp")
                    .table(RateUpdates::Table)
                    .col(RateUpdates::Synth)
                    .col((RateUpdates::Timestamp, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AggregatorAnswers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AggregatorAnswers::Id)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AggregatorAnswers::Block).big_integer().not_null())
                    .col(ColumnDef::new(AggregatorAnswers::Timestamp).big_integer().not_null())
                    .col(
                        ColumnDef::new(AggregatorAnswers::CurrencyKey)
                            .string_len(66)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AggregatorAnswers::Synth).string_len(32).not_null())
                    .col(ColumnDef::new(AggregatorAnswers::Rate).text().not_null())
                    .col(ColumnDef::new(AggregatorAnswers::RoundId).text().not_null())
                    .col(
                        ColumnDef::new(AggregatorAnswers::Aggregator)
                            .string_len(42)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LatestRates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LatestRates::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LatestRates::Rate).text().not_null())
                    .to_owned(),
            )
            .await?;

        // Daily and fifteen-minute SNX buckets share one layout
        for table in [SnxPrices::DailyTable, SnxPrices::FifteenMinuteTable] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SnxPrices::Id)
                                .string_len(20)
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(SnxPrices::Count)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SnxPrices::AveragePrice)
                                .text()
                                .not_null()
                                .default("0"),
                        )
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SnxPrices::FifteenMinuteTable).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SnxPrices::DailyTable).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LatestRates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AggregatorAnswers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RateUpdates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RatesUpdated::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RatesUpdated {
    Table,
    Id,
    CurrencyKeys,
    NewRates,
    Timestamp,
    Block,
    FromAddress,
    GasPrice,
}

#[derive(Iden)]
enum RateUpdates {
    Table,
    Id,
    Block,
    Timestamp,
    CurrencyKey,
    Synth,
    Rate,
}

#[derive(Iden)]
enum AggregatorAnswers {
    Table,
    Id,
    Block,
    Timestamp,
    CurrencyKey,
    Synth,
    Rate,
    RoundId,
    Aggregator,
}

#[derive(Iden)]
enum LatestRates {
    Table,
    Id,
    Rate,
}

#[derive(Iden)]
enum SnxPrices {
    #[iden = "daily_snx_prices"]
    DailyTable,
    #[iden = "fifteen_minute_snx_prices"]
    FifteenMinuteTable,
    Id,
    Count,
    AveragePrice,
}
