#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::mock;
use ordering::{
    error::Result,
    extractor::OrdersExtractor,
    model::*,
    storage::{OrdersStorage, PerformersStorage, ScoresStorage, UsersStorage},
    ui_model::Filter,
};
use std::collections::HashMap;
use std::sync::Arc;

mock! {
    pub Orders {}

    #[async_trait]
    impl OrdersStorage for Orders {
        async fn get_all(&self, filter: &Filter) -> Result<Vec<Order>>;
        async fn get_by_id(&self, id: ModelId) -> Result<Order>;
        async fn add(&self, order: &OrderCreateInfo) -> Result<Order>;
        async fn update(&self, id: ModelId, patch: &OrderPatch) -> Result<Order>;
    }
}

mock! {
    pub Performers {}

    #[async_trait]
    impl PerformersStorage for Performers {
        async fn get_all(&self, filter: &Filter) -> Result<Vec<Performer>>;
        async fn add(&self, performer: &NewPerformer) -> Result<Performer>;
        async fn get_by_id(&self, id: ModelId) -> Result<Performer>;
    }
}

mock! {
    pub Scores {}

    #[async_trait]
    impl ScoresStorage for Scores {
        async fn get_by_id(&self, id: ModelId) -> Result<Score>;
    }
}

mock! {
    pub Users {}

    #[async_trait]
    impl UsersStorage for Users {
        async fn get_by_id(&self, id: ModelId) -> Result<User>;
    }
}

pub fn test_order(id: ModelId) -> Order {
    Order {
        id,
        restaurant: 1,
        client: 7,
        number_of_persons: 2,
        visit_time: "[\"2024-01-01 10:00:00\",\"2024-01-01 12:00:00\")".to_string(),
        comment: None,
        menu: None,
        score: None,
        status: OrderStatus::New,
        cooks_status: PerformersStatus::NotAssigned,
        waiters_status: PerformersStatus::NotAssigned,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    }
}

pub fn test_performer(id: ModelId, performer_id: ModelId, order_id: ModelId) -> Performer {
    Performer {
        id,
        performer_id,
        order_id,
        start_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
        end_time: None,
    }
}

pub fn test_score(id: ModelId, payment_amount: f64) -> Score {
    Score {
        id,
        payment_amount,
        payment_token: Some(format!("token-{}", id)),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    }
}

/// Performers storage returning the given assignments for every order.
pub fn create_mock_performers(performers: Vec<Performer>) -> MockPerformers {
    let mut mock = MockPerformers::new();
    mock.expect_get_all()
        .returning(move |_| Ok(performers.clone()));
    mock
}

/// Users storage that knows exactly the given users.
pub fn create_mock_users(users: Vec<(ModelId, Role)>) -> MockUsers {
    let known: HashMap<ModelId, Role> = users.into_iter().collect();
    let mut mock = MockUsers::new();
    mock.expect_get_by_id().returning(move |id| match known.get(&id) {
        Some(role) => Ok(User {
            id,
            role: *role,
            name: format!("user-{}", id),
        }),
        None => Err(ordering::error::OrderError::not_found("User", id)),
    });
    mock
}

/// Scores storage with no records at all.
pub fn create_empty_scores() -> MockScores {
    let mut mock = MockScores::new();
    mock.expect_get_by_id()
        .returning(|id| Err(ordering::error::OrderError::not_found("Score", id)));
    mock
}

/// Extractor over an order with no staff and no payment.
pub fn create_plain_extractor() -> Arc<OrdersExtractor> {
    Arc::new(OrdersExtractor::new(
        Arc::new(create_mock_performers(vec![])),
        Arc::new(create_empty_scores()),
        Arc::new(create_mock_users(vec![])),
    ))
}
