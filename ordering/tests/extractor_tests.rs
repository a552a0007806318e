mod mocks;

use async_trait::async_trait;
use mocks::*;
use ordering::{
    error::{OrderError, Result},
    extractor::OrdersExtractor,
    model::{ModelId, Role, User},
    storage::UsersStorage,
    ui_model::{Filter, FilterValue},
};
use std::sync::Arc;
use std::time::Duration;

/// Users whose lookups finish later the smaller their id is.
struct SlowFirstUsers;

#[async_trait]
impl UsersStorage for SlowFirstUsers {
    async fn get_by_id(&self, id: ModelId) -> Result<User> {
        tokio::time::sleep(Duration::from_millis(100_u64.saturating_sub(id as u64 * 5))).await;
        let role = if id % 2 == 0 { Role::Waiter } else { Role::Cook };
        Ok(User {
            id,
            role,
            name: format!("user-{}", id),
        })
    }
}

#[tokio::test]
async fn test_order_without_score_has_no_total_amount() {
    let extractor = create_plain_extractor();

    let full = extractor.get_full_order_info(test_order(1)).await.unwrap();

    assert_eq!(full.total_amount, None);
    let json = serde_json::to_value(&full).unwrap();
    assert!(json["totalAmount"].is_null());
    assert!(json.get("score").is_none());
}

#[tokio::test]
async fn test_order_with_score_exposes_payment_amount() {
    let mut scores = MockScores::new();
    scores
        .expect_get_by_id()
        .withf(|id| *id == 5)
        .times(1)
        .returning(|id| Ok(test_score(id, 42.50)));
    let extractor = OrdersExtractor::new(
        Arc::new(create_mock_performers(vec![])),
        Arc::new(scores),
        Arc::new(create_mock_users(vec![])),
    );

    let mut order = test_order(1);
    order.score = Some(5);
    let full = extractor.get_full_order_info(order).await.unwrap();

    assert_eq!(full.total_amount, Some(42.5));
    let json = serde_json::to_value(&full).unwrap();
    assert_eq!(json["totalAmount"], serde_json::json!(42.5));
}

#[tokio::test]
async fn test_performers_are_split_by_role_in_fetch_order() {
    let extractor = OrdersExtractor::new(
        Arc::new(create_mock_performers(vec![
            test_performer(1, 11, 1),
            test_performer(2, 12, 1),
            test_performer(3, 13, 1),
        ])),
        Arc::new(create_empty_scores()),
        Arc::new(create_mock_users(vec![
            (11, Role::Cook),
            (12, Role::Waiter),
            (13, Role::Cook),
        ])),
    );

    let full = extractor.get_full_order_info(test_order(1)).await.unwrap();

    assert_eq!(full.cooks, vec![11, 13]);
    assert_eq!(full.waiters, vec![12]);
}

#[tokio::test]
async fn test_staff_order_follows_fetch_not_completion() {
    let extractor = OrdersExtractor::new(
        Arc::new(create_mock_performers(vec![
            test_performer(1, 1, 1),
            test_performer(2, 2, 1),
            test_performer(3, 3, 1),
            test_performer(4, 5, 1),
        ])),
        Arc::new(create_empty_scores()),
        Arc::new(SlowFirstUsers),
    );

    let full = extractor.get_full_order_info(test_order(1)).await.unwrap();

    assert_eq!(full.cooks, vec![1, 3, 5]);
    assert_eq!(full.waiters, vec![2]);
}

#[tokio::test]
async fn test_other_roles_are_not_listed_as_staff() {
    let extractor = OrdersExtractor::new(
        Arc::new(create_mock_performers(vec![
            test_performer(1, 21, 1),
            test_performer(2, 22, 1),
        ])),
        Arc::new(create_empty_scores()),
        Arc::new(create_mock_users(vec![(21, Role::Manager), (22, Role::Waiter)])),
    );

    let full = extractor.get_full_order_info(test_order(1)).await.unwrap();

    assert!(full.cooks.is_empty());
    assert_eq!(full.waiters, vec![22]);
}

#[tokio::test]
async fn test_performers_are_requested_for_the_order() {
    let mut performers = MockPerformers::new();
    performers
        .expect_get_all()
        .withf(|filter: &Filter| {
            let predicate = filter.to_predicate();
            predicate.clause == "WHERE order_id = $1" && predicate.values == vec![FilterValue::Int(9)]
        })
        .times(1)
        .returning(|_| Ok(vec![]));
    let extractor = OrdersExtractor::new(
        Arc::new(performers),
        Arc::new(create_empty_scores()),
        Arc::new(create_mock_users(vec![])),
    );

    extractor.get_full_order_info(test_order(9)).await.unwrap();
}

#[tokio::test]
async fn test_visit_time_is_reshaped() {
    let extractor = create_plain_extractor();
    let mut order = test_order(1);
    order.visit_time = "(2024-01-01 10:00,2024-01-01 12:00)".to_string();

    let full = extractor.get_full_order_info(order).await.unwrap();

    assert_eq!(full.visit_time.start, "2024-01-01T10:00Z");
    assert_eq!(full.visit_time.end, "2024-01-01T12:00Z");
}

#[tokio::test]
async fn test_malformed_visit_time_is_rejected() {
    let extractor = create_plain_extractor();
    let mut order = test_order(1);
    order.visit_time = "2024-01-01 10:00 - 2024-01-01 12:00".to_string();

    let err = extractor.get_full_order_info(order).await.unwrap_err();

    assert!(matches!(err, OrderError::MalformedVisitTime(_)));
}

#[tokio::test]
async fn test_missing_score_propagates_not_found() {
    let extractor = create_plain_extractor();
    let mut order = test_order(1);
    order.score = Some(77);

    let err = extractor.get_full_order_info(order).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Score 77 not found");
}

#[tokio::test]
async fn test_user_lookup_failure_aborts_the_order() {
    let extractor = OrdersExtractor::new(
        Arc::new(create_mock_performers(vec![
            test_performer(1, 11, 1),
            test_performer(2, 99, 1),
        ])),
        Arc::new(create_empty_scores()),
        Arc::new(create_mock_users(vec![(11, Role::Cook)])),
    );

    let err = extractor.get_full_order_info(test_order(1)).await.unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_full_orders_keep_input_order() {
    let extractor = create_plain_extractor();

    let full = extractor
        .get_full_orders(vec![test_order(3), test_order(1), test_order(2)])
        .await
        .unwrap();

    let ids: Vec<_> = full.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn test_one_failing_order_aborts_the_list() {
    let extractor = create_plain_extractor();
    let mut broken = test_order(2);
    broken.score = Some(500);

    let result = extractor
        .get_full_orders(vec![test_order(1), broken, test_order(3)])
        .await;

    assert!(matches!(result, Err(OrderError::NotFound { entity: "Score", id: 500 })));
}

#[tokio::test]
async fn test_empty_list_yields_empty_result() {
    let extractor = create_plain_extractor();

    let full = extractor.get_full_orders(vec![]).await.unwrap();

    assert!(full.is_empty());
}

#[test]
fn test_failed_aggregation_is_still_timed() {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let extractor = create_plain_extractor();
    let mut broken = test_order(2);
    broken.score = Some(500);

    let result = metrics::with_local_recorder(&recorder, || {
        futures::executor::block_on(extractor.get_full_orders(vec![test_order(1), broken]))
    });

    assert!(result.is_err());
    assert!(handle.render().contains("restaurant_backend_extract_seconds"));
}
