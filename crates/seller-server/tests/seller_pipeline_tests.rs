//! Integration tests for the seller pipelines
//!
//! The marketplace is a `wiremock` server; journal, store and observer are the
//! in-memory fakes from `common`.

mod common;

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{credentials, owner_ids, Harness, StoreMode, OWNER_ID};
use seller_server::{
    features::seller::{
        analytics::{self, AnalyticsRequest},
        fetch_and_import,
        pipeline::{Products, Stock, Transactions},
        products::{self, ProductRequest},
        stock::StockRequest,
        transactions::{self, TransactionRequest},
        FetchError, ImportError, PipelineError, PipelineEvent, Resource,
    },
    journal::Priority,
    marketplace::Credentials,
};

fn envelope(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": result }))
}

fn operation(id: i64) -> Value {
    json!({
        "operation_id": id,
        "operation_type": "OperationAgentDeliveredToCustomer",
        "operation_date": "2024-05-01 10:00:00",
        "operation_type_name": "Delivery",
        "amount": 100.0,
        "type": "orders",
        "posting": {"delivery_schema": "FBO", "posting_number": format!("P-{}", id), "warehouse_id": 9},
        "items": [{"sku": id}],
        "services": []
    })
}

fn product(id: i64) -> Value {
    json!({
        "product_id": id,
        "offer_id": format!("OFFER-{}", id),
        "has_fbo_stocks": true,
        "has_fbs_stocks": false,
        "archived": false,
        "is_discounted": false,
        "quants": []
    })
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_transactions_follow_page_count() {
    let server = MockServer::start().await;
    for page in 1..=3 {
        Mock::given(method("POST"))
            .and(path(transactions::PATH))
            .and(header("Client-Id", "12345"))
            .and(header("Api-Key", "secret-key"))
            .and(body_partial_json(json!({ "page": page })))
            .respond_with(envelope(json!({
                "operations": [operation(page)],
                "page_count": 3,
                "row_count": 3
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let harness = Harness::new(&server.uri());
    let rows = transactions::fetch(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        TransactionRequest::default(),
    )
    .await
    .unwrap();

    let ids: Vec<i64> = rows.iter().map(|r| r.operation_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(rows[1].posting_number, "P-2");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_transactions_single_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(transactions::PATH))
        .respond_with(envelope(json!({
            "operations": [operation(1), operation(2)],
            "page_count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let rows = transactions::fetch(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        TransactionRequest::default(),
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_transactions_last_possible_page_is_not_followed() {
    for page_count in [2, u32::MAX] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(transactions::PATH))
            .and(body_partial_json(json!({ "page": u32::MAX })))
            .respond_with(envelope(json!({
                "operations": [operation(1)],
                "page_count": page_count
            })))
            .expect(1)
            .mount(&server)
            .await;

        let harness = Harness::new(&server.uri());
        let request = TransactionRequest {
            page: Some(u32::MAX),
            ..Default::default()
        };
        let rows = transactions::fetch(
            &harness.seller_context(),
            OWNER_ID,
            &credentials(),
            request,
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_products_follow_cursor_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(products::PATH))
        .and(body_partial_json(json!({ "last_id": "" })))
        .respond_with(envelope(json!({
            "items": [product(1), product(2)],
            "total": 4,
            "last_id": "cursor-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(products::PATH))
        .and(body_partial_json(json!({ "last_id": "cursor-1" })))
        .respond_with(envelope(json!({
            "items": [product(3)],
            "total": 4,
            "last_id": "cursor-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let rows = products::fetch(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        ProductRequest::default(),
    )
    .await
    .unwrap();

    let ids: Vec<i64> = rows.iter().map(|r| r.product_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_products_without_cursor_single_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(products::PATH))
        .respond_with(envelope(json!({ "items": [product(1)], "total": 1, "last_id": "" })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let rows = products::fetch(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        ProductRequest::default(),
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quants, "null");
}

// ============================================================================
// Reshaping through the fetch routine
// ============================================================================

#[tokio::test]
async fn test_analytics_pairs_metrics_and_reports_drops() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(analytics::PATH))
        .and(body_partial_json(json!({
            "metrics": ["revenue", "ordered_units", "adv_views"],
            "dimension": ["sku", "day"]
        })))
        .respond_with(envelope(json!({
            "data": [{
                "dimensions": [{"id": "1001", "name": "Mug"}, {"id": "2024-05-01"}],
                "metrics": [100, 5, 42]
            }],
            "totals": [100, 5, 42]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let request = AnalyticsRequest {
        metrics: Some(vec!["revenue".into(), "ordered_units".into(), "adv_views".into()]),
        ..Default::default()
    };
    let rows = analytics::fetch(&harness.seller_context(), OWNER_ID, &credentials(), request)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].metrics.revenue, 100.0);
    assert_eq!(rows[0].metrics.ordered_units, 5.0);
    assert_eq!(rows[0].metrics.hits_view, 0.0);

    let events = harness.observer.events();
    assert!(events.contains(&PipelineEvent::MetricDropped {
        resource: Resource::Analytics,
        metric: "adv_views".into(),
    }));
    assert!(events.contains(&PipelineEvent::Reshaped {
        resource: Resource::Analytics,
        rows: 1,
    }));
}

// ============================================================================
// Credential gate
// ============================================================================

#[tokio::test]
async fn test_missing_credentials_fail_closed() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server.uri());

    let result = transactions::fetch(
        &harness.seller_context(),
        OWNER_ID,
        &Credentials {
            client_id: Some("12345".into()),
            api_key: None,
        },
        TransactionRequest::default(),
    )
    .await;

    assert!(matches!(result, Err(FetchError::Unauthorized)));
    assert!(server.received_requests().await.unwrap().is_empty());

    let records = harness.journal.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].code, "401");
    assert_eq!(records[0].priority, Priority::High);
    assert_eq!(records[0].owner_id, OWNER_ID);
    assert_eq!(records[0].service_name, "Seller/Transaction");
    assert_eq!(records[0].message, "Unauthorized. No Client-Id or Api-Key.");
}

#[tokio::test]
async fn test_analytics_unauthorized_service_name() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server.uri());

    let result = analytics::fetch(
        &harness.seller_context(),
        OWNER_ID,
        &Credentials::default(),
        AnalyticsRequest::default(),
    )
    .await;

    assert!(matches!(result, Err(FetchError::Unauthorized)));
    assert_eq!(harness.journal.records()[0].service_name, "Seller/Analytics");
}

// ============================================================================
// Upstream failures
// ============================================================================

#[tokio::test]
async fn test_upstream_error_is_journaled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(products::PATH))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"code": 7, "message": "Api-Key is invalid"})),
        )
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let result = fetch_and_import::<Products>(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        ProductRequest::default(),
    )
    .await;

    assert!(matches!(result, Err(PipelineError::Fetch(FetchError::Upstream(_)))));
    assert_eq!(harness.store.calls(), 0);

    let records = harness.journal.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].code, "403");
    assert_eq!(records[0].priority, Priority::High);
    assert_eq!(records[0].service_name, "Seller/ProductList");
    assert!(records[0].message.starts_with("Request aborted, error:"));
    assert!(records[0].message.contains("Api-Key is invalid"));
}

#[tokio::test]
async fn test_failure_on_later_page_aborts_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(transactions::PATH))
        .and(body_partial_json(json!({ "page": 1 })))
        .respond_with(envelope(json!({ "operations": [operation(1)], "page_count": 2 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(transactions::PATH))
        .and(body_partial_json(json!({ "page": 2 })))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let result = fetch_and_import::<Transactions>(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        TransactionRequest::default(),
    )
    .await;

    assert!(matches!(result, Err(PipelineError::Fetch(FetchError::Upstream(_)))));
    assert_eq!(harness.store.calls(), 0);
    assert_eq!(harness.journal.records()[0].code, "500");
}

#[tokio::test]
async fn test_undecodable_body_is_journaled_as_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/analytics/stock_on_warehouses"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let result = fetch_and_import::<Stock>(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        StockRequest::default(),
    )
    .await;

    assert!(result.is_err());
    let records = harness.journal.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].code, "500");
    assert_eq!(records[0].service_name, "Seller/Stock/WareHouse");
}

// ============================================================================
// Import
// ============================================================================

#[tokio::test]
async fn test_import_stamps_owner_on_every_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(products::PATH))
        .respond_with(envelope(json!({
            "items": [product(1), product(2), product(3)],
            "last_id": ""
        })))
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let imported = fetch_and_import::<Products>(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        ProductRequest::default(),
    )
    .await
    .unwrap();

    assert_eq!(imported, 3);
    let batches = harness.store.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].resource(), Resource::Products);
    assert_eq!(owner_ids(&batches[0]), vec![OWNER_ID; 3]);
    assert!(harness.journal.records().is_empty());

    let stored = serde_json::to_value(&batches[0]).unwrap();
    assert_eq!(stored[0]["owner_id"], OWNER_ID);
    assert_eq!(stored[0]["offer_id"], "OFFER-1");
}

#[tokio::test]
async fn test_empty_result_is_journaled_and_never_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/analytics/stock_on_warehouses"))
        .respond_with(envelope(json!({ "rows": [] })))
        .mount(&server)
        .await;

    let harness = Harness::new(&server.uri());
    let result = fetch_and_import::<Stock>(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        StockRequest::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(PipelineError::Import(ImportError::EmptyResult {
            resource: Resource::Stock
        }))
    ));
    assert_eq!(harness.store.calls(), 0);

    let records = harness.journal.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].code, "404");
    assert_eq!(records[0].priority, Priority::Medium);
    assert_eq!(records[0].message, "No data");
}

async fn stock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/analytics/stock_on_warehouses"))
        .respond_with(envelope(json!({
            "rows": [{"sku": 1, "item_code": "A", "item_name": "Mug", "warehouse_name": "Main"}]
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_server_side_persistence_failure_is_journaled() {
    let server = stock_server().await;
    let harness = Harness::new(&server.uri());
    harness.store.set_mode(StoreMode::Unavailable);

    let err = fetch_and_import::<Stock>(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        StockRequest::default(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().starts_with("Failed to import stock data: "));
    let records = harness.journal.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].code, "500");
    assert_eq!(records[0].priority, Priority::High);
}

#[tokio::test]
async fn test_rejected_rows_are_not_journaled() {
    let server = stock_server().await;
    let harness = Harness::new(&server.uri());
    harness.store.set_mode(StoreMode::Reject);

    let err = fetch_and_import::<Stock>(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        StockRequest::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to import stock data: duplicate key value violates unique constraint"
    );
    assert!(harness.journal.records().is_empty());
}

#[tokio::test]
async fn test_observer_sees_pipeline_progress() {
    let server = stock_server().await;
    let harness = Harness::new(&server.uri());

    fetch_and_import::<Stock>(
        &harness.seller_context(),
        OWNER_ID,
        &credentials(),
        StockRequest::default(),
    )
    .await
    .unwrap();

    let events = harness.observer.events();
    assert_eq!(
        events.first(),
        Some(&PipelineEvent::FetchStarted {
            resource: Resource::Stock
        })
    );
    assert_eq!(
        events.last(),
        Some(&PipelineEvent::Imported {
            resource: Resource::Stock,
            owner_id: OWNER_ID,
            rows: 1
        })
    );
}
