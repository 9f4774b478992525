mod support;

use std::sync::Arc;

use anyhow::Result;
use coinrate::market_data::{
    Aggregation, MemoryPriceStore, PriceError, PriceService, PriceStore,
};
use support::{observation, symbols, t, FlakyStore, MockPriceSource};

fn service_with(
    store: Arc<dyn PriceStore>,
    source: Arc<MockPriceSource>,
) -> PriceService {
    PriceService::new(store, source)
}

#[tokio::test]
async fn aggregates_btc_history() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    store
        .append(&[
            observation("BTC", 100.0, 1),
            observation("BTC", 300.0, 2),
            observation("BTC", 200.0, 3),
        ])
        .await?;
    let service = service_with(store, Arc::new(MockPriceSource::new()));
    let btc = symbols(&["BTC"]);

    assert_eq!(service.latest_price(&btc).await?[0].price(), 200.0);
    assert_eq!(service.min_price(&btc).await?[0].price(), 100.0);
    assert_eq!(service.max_price(&btc).await?[0].price(), 300.0);
    assert_eq!(service.avg_price(&btc).await?[0].price(), 200.0);
    Ok(())
}

#[tokio::test]
async fn get_price_preserves_input_order() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    store
        .append(&[
            observation("BTC", 50_000.0, 1),
            observation("ETH", 3_000.0, 1),
            observation("SOL", 150.0, 1),
        ])
        .await?;
    let service = service_with(store, Arc::new(MockPriceSource::new()));

    let prices = service
        .get_price(&symbols(&["SOL", "BTC", "ETH"]), Aggregation::Latest)
        .await?;
    let order: Vec<&str> = prices.iter().map(|o| o.symbol()).collect();
    assert_eq!(order, vec!["SOL", "BTC", "ETH"]);
    Ok(())
}

#[tokio::test]
async fn one_missing_symbol_fails_the_whole_batch() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    store
        .append(&[observation("BTC", 1.0, 1), observation("ETH", 2.0, 1)])
        .await?;
    let source = Arc::new(MockPriceSource::new().with_price("XRP", 0.5));
    let service = service_with(store, source.clone());

    let err = service
        .get_price(&symbols(&["BTC", "XRP", "ETH"]), Aggregation::Avg)
        .await
        .unwrap_err();
    match err {
        PriceError::NotFound { symbol, .. } => assert_eq!(symbol, "XRP"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(source.call_count(), 0, "reads must not reach the source");
    Ok(())
}

#[tokio::test]
async fn store_query_failure_is_internal() -> Result<()> {
    let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryPriceStore::new())));
    flaky.fail_query(true);
    let service = service_with(flaky.clone(), Arc::new(MockPriceSource::new()));

    let err = service
        .get_price(&symbols(&["BTC"]), Aggregation::Latest)
        .await
        .unwrap_err();
    assert!(matches!(err, PriceError::InternalFailure { operation: "query", .. }));
    Ok(())
}

#[tokio::test]
async fn refresh_then_read_end_to_end() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(
        MockPriceSource::new()
            .with_price("BTC", 50_000.0)
            .with_price("ETH", 3_000.0),
    );
    let service = service_with(store.clone(), source);

    let refreshed = service.refresh(&symbols(&["BTC", "ETH"])).await?;
    assert_eq!(refreshed.len(), 2);

    let stored = store.all().await;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored, refreshed);

    let latest = service
        .get_price(&symbols(&["BTC", "ETH"]), Aggregation::Latest)
        .await?;
    assert_eq!(latest[0].symbol(), "BTC");
    assert_eq!(latest[0].price(), 50_000.0);
    assert_eq!(latest[1].symbol(), "ETH");
    assert_eq!(latest[1].price(), 3_000.0);
    Ok(())
}

#[tokio::test]
async fn refresh_without_symbols_uses_known_symbols() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    store
        .append(&[observation("ETH", 1.0, 1), observation("BTC", 2.0, 1)])
        .await?;
    let source = Arc::new(
        MockPriceSource::new()
            .with_price("BTC", 3.0)
            .with_price("ETH", 4.0),
    );
    let service = service_with(store.clone(), source.clone());

    let known = store.list_known_symbols().await?;
    service.refresh(&[]).await?;
    service.refresh(&known).await?;

    let calls = source.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
    assert_eq!(calls[0], symbols(&["ETH", "BTC"]));
    Ok(())
}

#[tokio::test]
async fn refresh_listing_failure_is_internal() -> Result<()> {
    let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryPriceStore::new())));
    flaky.fail_list(true);
    let source = Arc::new(MockPriceSource::new());
    let service = service_with(flaky, source.clone());

    let err = service.refresh(&[]).await.unwrap_err();
    assert!(matches!(
        err,
        PriceError::InternalFailure { operation: "list_known_symbols", .. }
    ));
    assert_eq!(source.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn source_failure_is_upstream_and_stores_nothing() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(MockPriceSource::new().with_price("BTC", 1.0).fail_on_fetch());
    let service = service_with(store.clone(), source);

    let err = service.refresh(&symbols(&["BTC"])).await.unwrap_err();
    assert!(matches!(err, PriceError::UpstreamFailure { .. }));
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn failed_persist_leaves_no_trace() -> Result<()> {
    let inner = Arc::new(MemoryPriceStore::new());
    let flaky = Arc::new(FlakyStore::new(inner.clone()));
    let source = Arc::new(MockPriceSource::new().with_price("BTC", 42_000.0));
    let service = service_with(flaky.clone(), source);

    flaky.fail_append(true);
    let err = service.refresh(&symbols(&["BTC"])).await.unwrap_err();
    assert!(matches!(err, PriceError::InternalFailure { operation: "append", .. }));

    flaky.fail_append(false);
    let err = service
        .get_price(&symbols(&["BTC"]), Aggregation::Latest)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(inner.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn unpriced_symbol_stays_missing_after_refresh() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    let source = Arc::new(MockPriceSource::new().with_price("BTC", 1.0));
    let service = service_with(store, source);
    let xrp = symbols(&["XRP"]);

    let err = service.get_price(&xrp, Aggregation::Latest).await.unwrap_err();
    assert!(err.is_not_found());

    let refreshed = service.refresh(&xrp).await?;
    assert!(refreshed.is_empty());

    let err = service.get_price(&xrp, Aggregation::Latest).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn get_or_refresh_serves_stored_data_without_fetching() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    store.append(&[observation("BTC", 10.0, 1)]).await?;
    let source = Arc::new(MockPriceSource::new().with_price("BTC", 99.0));
    let service = service_with(store, source.clone());

    let prices = service
        .get_or_refresh(&symbols(&["BTC"]), Aggregation::Max)
        .await?;
    assert_eq!(prices[0].price(), 10.0);
    assert_eq!(source.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn get_or_refresh_falls_back_to_live_fetch_on_miss() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    store.append(&[observation("BTC", 10.0, 1)]).await?;
    let source = Arc::new(
        MockPriceSource::new()
            .with_price("BTC", 11.0)
            .with_price("ETH", 2.0)
            .with_observed_at(t(90)),
    );
    let service = service_with(store.clone(), source.clone());

    let prices = service
        .get_or_refresh(&symbols(&["BTC", "ETH"]), Aggregation::Latest)
        .await?;
    assert_eq!(prices.len(), 2);
    assert_eq!(prices[0].price(), 11.0);
    assert_eq!(prices[1].symbol(), "ETH");
    assert_eq!(source.calls(), vec![symbols(&["BTC", "ETH"])]);

    let eth = service
        .get_price(&symbols(&["ETH"]), Aggregation::Latest)
        .await?;
    assert_eq!(eth[0].observed_at(), t(90));
    Ok(())
}

#[tokio::test]
async fn get_or_refresh_keeps_not_found_when_source_has_nothing() -> Result<()> {
    let service = service_with(
        Arc::new(MemoryPriceStore::new()),
        Arc::new(MockPriceSource::new()),
    );

    let err = service
        .get_or_refresh(&symbols(&["XRP"]), Aggregation::Latest)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn get_or_refresh_does_not_mask_internal_failures() -> Result<()> {
    let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryPriceStore::new())));
    flaky.fail_query(true);
    let source = Arc::new(MockPriceSource::new().with_price("BTC", 1.0));
    let service = service_with(flaky, source.clone());

    let err = service
        .get_or_refresh(&symbols(&["BTC"]), Aggregation::Latest)
        .await
        .unwrap_err();
    assert!(matches!(err, PriceError::InternalFailure { .. }));
    assert_eq!(source.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_refresh_and_reads_do_not_interfere() -> Result<()> {
    let store = Arc::new(MemoryPriceStore::new());
    store.append(&[observation("BTC", 1.0, 1)]).await?;
    let source = Arc::new(MockPriceSource::new().with_price("BTC", 2.0));
    let service = Arc::new(service_with(store.clone(), source));

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service.refresh(&symbols(&["BTC"])).await.map(|_| ())
            } else {
                service
                    .get_price(&symbols(&["BTC"]), Aggregation::Min)
                    .await
                    .map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(store.len().await, 1 + 8);
    Ok(())
}
