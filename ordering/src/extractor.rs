use crate::{
    error::Result,
    model::{ModelId, Order, OrderStatus, PerformersStatus, Role},
    storage::{PerformersStorage, ScoresStorage, UsersStorage},
    ui_model::Filter,
    visit_time::VisitTime,
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use metrics::histogram;
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tracing::{debug, error};

/// The API view of an order: the stored fields with the visit time reshaped,
/// the score reference replaced by its payment amount, and the assigned staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullOrder {
    pub id: ModelId,
    pub restaurant: ModelId,
    pub client: ModelId,
    pub number_of_persons: i32,
    pub visit_time: VisitTime,
    pub comment: Option<String>,
    pub menu: Option<Vec<ModelId>>,
    pub status: OrderStatus,
    pub cooks_status: PerformersStatus,
    pub waiters_status: PerformersStatus,
    pub created_at: DateTime<Utc>,
    pub total_amount: Option<f64>,
    pub cooks: Vec<ModelId>,
    pub waiters: Vec<ModelId>,
}

pub struct OrdersExtractor {
    performers: Arc<dyn PerformersStorage>,
    scores: Arc<dyn ScoresStorage>,
    users: Arc<dyn UsersStorage>,
}

impl OrdersExtractor {
    pub fn new(
        performers: Arc<dyn PerformersStorage>,
        scores: Arc<dyn ScoresStorage>,
        users: Arc<dyn UsersStorage>,
    ) -> Self {
        Self {
            performers,
            scores,
            users,
        }
    }

    /// Builds the full view of one order. Any collaborator failure fails the
    /// whole order.
    pub async fn get_full_order_info(&self, order: Order) -> Result<FullOrder> {
        let visit_time = VisitTime::from_stored(&order.visit_time)?;

        let total_amount = match order.score {
            Some(score_id) => Some(self.scores.get_by_id(score_id).await?.payment_amount),
            None => None,
        };

        let (cooks, waiters) = self.get_staff(order.id).await?;

        Ok(FullOrder {
            id: order.id,
            restaurant: order.restaurant,
            client: order.client,
            number_of_persons: order.number_of_persons,
            visit_time,
            comment: order.comment,
            menu: order.menu,
            status: order.status,
            cooks_status: order.cooks_status,
            waiters_status: order.waiters_status,
            created_at: order.created_at,
            total_amount,
            cooks,
            waiters,
        })
    }

    /// Builds full views for a list of orders, keeping their order. The first
    /// failing order fails the whole list.
    pub async fn get_full_orders(&self, orders: Vec<Order>) -> Result<Vec<FullOrder>> {
        let t0 = Instant::now();
        let count = orders.len();

        let result = try_join_all(orders.into_iter().map(|order| async move {
            let order_id = order.id;
            self.get_full_order_info(order).await.inspect_err(|e| {
                error!(order_id, error = %e, "Failed to build full order");
            })
        }))
        .await;

        let h = histogram!("restaurant_backend_extract_seconds", "op" => "get_full_orders");
        h.record(t0.elapsed().as_secs_f64());

        let full_orders = result?;
        debug!(count, "Built full orders");

        Ok(full_orders)
    }

    /// Resolves the performers of an order into cook ids and waiter ids, both
    /// in the order the assignments were fetched.
    async fn get_staff(&self, order_id: ModelId) -> Result<(Vec<ModelId>, Vec<ModelId>)> {
        let filter = Filter::new().with("order_id", order_id);
        let performers = self.performers.get_all(&filter).await?;

        let users = try_join_all(
            performers
                .iter()
                .map(|performer| self.users.get_by_id(performer.performer_id)),
        )
        .await?;

        let mut cooks = Vec::new();
        let mut waiters = Vec::new();
        for user in users {
            match user.role {
                Role::Cook => cooks.push(user.id),
                Role::Waiter => waiters.push(user.id),
                _ => {}
            }
        }

        Ok((cooks, waiters))
    }
}
