//! End-to-end ingestion flow against a real SQLite database.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use stockfolio_core::cache::{CacheStoreTrait, InMemoryCacheStore};
use stockfolio_core::constants::dashboard_cache_key;
use stockfolio_core::db;
use stockfolio_core::errors::Error;
use stockfolio_core::holdings::{
    HoldingEdit, HoldingError, HoldingsRepositoryTrait, HoldingsService, IngestionService,
    NewHoldingInput, ParsedHoldingRow, SqliteHoldingsRepository,
};

struct TestContext {
    _temp_dir: TempDir,
    repository: Arc<SqliteHoldingsRepository>,
    cache: Arc<InMemoryCacheStore>,
    ingestion: IngestionService,
    holdings: HoldingsService,
}

fn setup() -> TestContext {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = Arc::new(db::init_pool(db_path.to_str().unwrap()).unwrap());
    let repository = Arc::new(SqliteHoldingsRepository::new(pool));
    let cache = Arc::new(InMemoryCacheStore::new());
    let ingestion = IngestionService::new(repository.clone(), cache.clone());
    let holdings = HoldingsService::new(repository.clone(), cache.clone());
    TestContext {
        _temp_dir: temp_dir,
        repository,
        cache,
        ingestion,
        holdings,
    }
}

fn row(isin: &str, client_id: Option<&str>, name: &str, quantity: i64) -> ParsedHoldingRow {
    ParsedHoldingRow {
        client_id: client_id.map(str::to_string),
        company_name: name.to_string(),
        isin: isin.to_string(),
        sector: Some("Energy".to_string()),
        market_cap: Some(1.0e12),
        total_quantity: quantity,
        avg_trading_price: 100.0,
        ltp: 100.0,
        invested_value: quantity as f64 * 100.0,
        market_value: quantity as f64 * 100.0,
        overall_gain_loss: 0.0,
        stcg_quantity: None,
        stcg_value: None,
    }
}

#[tokio::test]
async fn test_import_creates_updates_and_skips() {
    let ctx = setup();

    let report = ctx
        .ingestion
        .import_holdings(
            "user-1",
            vec![
                row("INE002A01018", None, "Reliance Industries", 10),
                row("INE009A01021", None, "Infosys", 5),
                row("INE009A01021", None, "Infosys", 99),
                row("", None, "No Isin Corp", 3),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.created, 2);
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.total_processed, 4);
    assert_eq!(report.skip_reasons.len(), 2);

    let stored = ctx.repository.get_holdings_by_user("user-1").unwrap();
    assert_eq!(stored.len(), 2);
    let infosys = stored.iter().find(|h| h.company_name == "Infosys").unwrap();
    assert_eq!(infosys.total_quantity, 5);
}

#[tokio::test]
async fn test_reupload_merges_in_place() {
    let ctx = setup();

    ctx.ingestion
        .import_holdings(
            "user-1",
            vec![row("INE002A01018", None, "Reliance Industries", 10)],
        )
        .await
        .unwrap();
    let original_id = ctx.repository.get_holdings_by_user("user-1").unwrap()[0]
        .id
        .clone();

    let report = ctx
        .ingestion
        .import_holdings(
            "user-1",
            vec![row("INE002A01018", None, "Reliance Industries Ltd", 25)],
        )
        .await
        .unwrap();

    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 1);

    let stored = ctx.repository.get_holdings_by_user("user-1").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, original_id);
    assert_eq!(stored[0].total_quantity, 25);
    assert_eq!(stored[0].company_name, "Reliance Industries Ltd");
}

#[tokio::test]
async fn test_same_isin_across_client_ids_stays_separate() {
    let ctx = setup();

    ctx.ingestion
        .import_holdings(
            "user-1",
            vec![
                row("INE002A01018", Some("C1"), "Reliance Industries", 10),
                row("INE002A01018", Some("C2"), "Reliance Industries", 7),
            ],
        )
        .await
        .unwrap();

    let stored = ctx.repository.get_holdings_by_user("user-1").unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_import_invalidates_dashboard_cache() {
    let ctx = setup();
    let key = dashboard_cache_key("user-1");
    ctx.cache
        .set_with_ttl(&key, b"{}".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();

    ctx.ingestion
        .import_holdings(
            "user-1",
            vec![row("INE002A01018", None, "Reliance Industries", 10)],
        )
        .await
        .unwrap();

    assert!(ctx.cache.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_import_with_only_invalid_rows_leaves_cache_alone() {
    let ctx = setup();
    let key = dashboard_cache_key("user-1");
    ctx.cache
        .set_with_ttl(&key, b"{}".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();

    let report = ctx
        .ingestion
        .import_holdings("user-1", vec![row("", None, "No Isin Corp", 3)])
        .await
        .unwrap();

    assert_eq!(report.created + report.updated, 0);
    assert!(ctx.cache.get(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_manual_crud_roundtrip() {
    let ctx = setup();

    let created = ctx
        .holdings
        .add_holding(
            "user-1",
            NewHoldingInput {
                client_id: None,
                company_name: "Tata Motors".to_string(),
                isin: "INE155A01022".to_string(),
                sector: Some("Auto".to_string()),
                total_quantity: 20,
                avg_trading_price: 450.0,
            },
        )
        .await
        .unwrap();
    assert_eq!(created.invested_value, 9_000.0);
    assert_eq!(created.market_value, 9_000.0);
    assert_eq!(created.overall_gain_loss, 0.0);

    let updated = ctx
        .holdings
        .update_holding(
            "user-1",
            &created.id,
            HoldingEdit {
                total_quantity: Some(30),
                ..HoldingEdit::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.total_quantity, 30);
    assert_eq!(updated.market_value, 30.0 * 450.0);

    ctx.holdings.delete_holding("user-1", &created.id).await.unwrap();
    assert!(ctx.repository.get_holdings_by_user("user-1").unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_missing_holding_is_not_found() {
    let ctx = setup();

    let result = ctx.holdings.delete_holding("user-1", "no-such-id").await;
    assert!(matches!(
        result,
        Err(Error::Holding(HoldingError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_duplicate_manual_entry_rejected() {
    let ctx = setup();
    let input = NewHoldingInput {
        client_id: None,
        company_name: "Tata Motors".to_string(),
        isin: "INE155A01022".to_string(),
        sector: None,
        total_quantity: 20,
        avg_trading_price: 450.0,
    };

    ctx.holdings.add_holding("user-1", input.clone()).await.unwrap();
    let result = ctx.holdings.add_holding("user-1", input).await;

    assert!(matches!(
        result,
        Err(Error::Holding(HoldingError::InvalidData(_)))
    ));
}

#[tokio::test]
async fn test_holdings_are_scoped_per_user() {
    let ctx = setup();

    ctx.ingestion
        .import_holdings(
            "user-1",
            vec![row("INE002A01018", None, "Reliance Industries", 10)],
        )
        .await
        .unwrap();

    assert!(ctx.repository.get_holdings_by_user("user-2").unwrap().is_empty());
    let holding_id = ctx.repository.get_holdings_by_user("user-1").unwrap()[0]
        .id
        .clone();
    let result = ctx.holdings.delete_holding("user-2", &holding_id).await;
    assert!(result.is_err());
    assert_eq!(ctx.repository.get_holdings_by_user("user-1").unwrap().len(), 1);
}
