use crate::error::{OrderError, Result};
use crate::model::{
    ModelId, NewPerformer, Order, OrderCreateInfo, OrderPatch, OrderStatus, PerformersStatus,
    Performer, Role, Score, User,
};
use crate::storage::base::{BaseRepository, ColumnValue, ColumnValues, Persistable, try_get_enum};
use crate::storage::performers::{add_in, close_open_in};
use crate::ui_model::Filter;
use crate::visit_time::VisitTimeRange;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

impl Persistable for Order {
    fn get_table_name() -> &'static str {
        "orders"
    }

    fn get_entity_name() -> &'static str {
        "Order"
    }

    fn get_select_columns() -> &'static str {
        "id, restaurant, client, number_of_persons, visit_time::text AS visit_time, comment, \
         menu, score, status, cooks_status, waiters_status, created_at"
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Order {
            id: row.try_get("id")?,
            restaurant: row.try_get("restaurant")?,
            client: row.try_get("client")?,
            number_of_persons: row.try_get("number_of_persons")?,
            visit_time: row.try_get("visit_time")?,
            comment: row.try_get("comment")?,
            menu: row.try_get("menu")?,
            score: row.try_get("score")?,
            status: try_get_enum(row, "status")?,
            cooks_status: try_get_enum(row, "cooks_status")?,
            waiters_status: try_get_enum(row, "waiters_status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
pub trait OrdersStorage: Send + Sync {
    /// Orders matching the filter, oldest first.
    async fn get_all(&self, filter: &Filter) -> Result<Vec<Order>>;

    async fn get_by_id(&self, id: ModelId) -> Result<Order>;

    /// Checks capacity, records the payment for a menu order and stores the
    /// new order, all in one transaction.
    async fn add(&self, order: &OrderCreateInfo) -> Result<Order>;

    /// Applies the present patch fields in one transaction. Nothing is written
    /// when any of them is invalid.
    async fn update(&self, id: ModelId, patch: &OrderPatch) -> Result<Order>;
}

#[derive(Clone)]
pub struct ProdOrdersStorage {
    pool: PgPool,
    orders: BaseRepository<Order>,
    performers: BaseRepository<Performer>,
    scores: BaseRepository<Score>,
    users: BaseRepository<User>,
}

impl ProdOrdersStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            orders: BaseRepository::new(),
            performers: BaseRepository::new(),
            scores: BaseRepository::new(),
            users: BaseRepository::new(),
        }
    }

    /// Locks the restaurant row so concurrent creations for it are serialized,
    /// then checks that the overlapping guests still fit.
    async fn ensure_place(
        &self,
        conn: &mut PgConnection,
        restaurant: ModelId,
        range: &VisitTimeRange,
        persons: i32,
    ) -> Result<()> {
        let capacity: Option<i32> =
            sqlx::query_scalar("SELECT capacity FROM restaurants WHERE id = $1 FOR UPDATE")
                .bind(restaurant)
                .fetch_optional(&mut *conn)
                .await?;
        let capacity = capacity.ok_or_else(|| {
            OrderError::IncorrectOrderParameters(format!("restaurant {} does not exist", restaurant))
        })?;

        let occupied: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(number_of_persons), 0)::int8 FROM orders \
             WHERE restaurant = $1 AND status <> $2 AND visit_time && $3::tsrange",
        )
        .bind(restaurant)
        .bind(OrderStatus::Cancelled.to_string())
        .bind(range.to_sql_literal())
        .fetch_one(&mut *conn)
        .await?;

        debug!(restaurant, capacity, occupied, persons, "Checked restaurant capacity");

        if occupied + i64::from(persons) > i64::from(capacity) {
            return Err(OrderError::NoPlace(format!(
                "restaurant {} has {} of {} places taken for this visit time",
                restaurant, occupied, capacity
            )));
        }
        Ok(())
    }

    /// Prices the menu and stores the payment record for it.
    async fn record_payment(
        &self,
        conn: &mut PgConnection,
        menu: &[ModelId],
        payment_token: &str,
    ) -> Result<Score> {
        let prices: HashMap<ModelId, f64> =
            sqlx::query_as::<_, (ModelId, f64)>("SELECT id, price::float8 FROM menu_items WHERE id = ANY($1)")
                .bind(menu)
                .fetch_all(&mut *conn)
                .await?
                .into_iter()
                .collect();

        let mut total = 0.0;
        for item in menu {
            let price = prices.get(item).ok_or_else(|| {
                OrderError::IncorrectOrderParameters(format!("menu item {} does not exist", item))
            })?;
            total += price;
        }

        self.scores
            .insert(
                conn,
                &[
                    ("payment_amount", ColumnValue::Float(Some(total))),
                    ("payment_token", ColumnValue::text(payment_token)),
                ],
            )
            .await
    }

    /// Returns the users from `ids` that are not yet assigned to the order,
    /// after checking that every one of them holds `role`.
    async fn new_assignees(
        &self,
        conn: &mut PgConnection,
        ids: &[ModelId],
        role: Role,
        assigned: &HashSet<ModelId>,
    ) -> Result<Vec<ModelId>> {
        let mut fresh = Vec::new();
        for &id in ids {
            let user = match self.users.select_by_id(conn, id).await {
                Ok(user) => user,
                Err(e) if e.is_not_found() => {
                    return Err(OrderError::IncorrectOrderParameters(format!(
                        "user {} does not exist",
                        id
                    )));
                }
                Err(e) => return Err(e),
            };
            if user.role != role {
                return Err(OrderError::IncorrectOrderParameters(format!(
                    "user {} is a {}, not a {}",
                    id, user.role, role
                )));
            }
            if !assigned.contains(&id) && !fresh.contains(&id) {
                fresh.push(id);
            }
        }
        Ok(fresh)
    }
}

#[async_trait]
impl OrdersStorage for ProdOrdersStorage {
    async fn get_all(&self, filter: &Filter) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        self.orders.select(&mut conn, &filter.to_predicate()).await
    }

    async fn get_by_id(&self, id: ModelId) -> Result<Order> {
        let mut conn = self.pool.acquire().await?;
        self.orders.select_by_id(&mut conn, id).await
    }

    async fn add(&self, order: &OrderCreateInfo) -> Result<Order> {
        if order.number_of_persons <= 0 {
            return Err(OrderError::IncorrectOrderParameters(format!(
                "number of persons must be positive, got {}",
                order.number_of_persons
            )));
        }
        let range = order.visit_time.to_range()?;

        let mut tx = self.pool.begin().await?;

        self.ensure_place(&mut tx, order.restaurant, &range, order.number_of_persons)
            .await?;

        let score = match (&order.menu, &order.payment_token) {
            (Some(menu), Some(token)) => Some(self.record_payment(&mut tx, menu, token).await?),
            (Some(_), None) => {
                return Err(OrderError::InvalidArgument("paymentToken is required".to_string()));
            }
            _ => None,
        };

        let values: ColumnValues = vec![
            ("restaurant", ColumnValue::Int(Some(order.restaurant))),
            ("client", ColumnValue::Int(Some(order.client))),
            ("number_of_persons", ColumnValue::Int(Some(i64::from(order.number_of_persons)))),
            ("visit_time", ColumnValue::TimeRange(range.to_sql_literal())),
            ("comment", ColumnValue::Text(order.comment.clone())),
            ("menu", ColumnValue::IdList(order.menu.clone())),
            ("score", ColumnValue::Int(score.map(|s| s.id))),
            ("status", ColumnValue::text(OrderStatus::New.to_string())),
            ("cooks_status", ColumnValue::text(PerformersStatus::NotAssigned.to_string())),
            ("waiters_status", ColumnValue::text(PerformersStatus::NotAssigned.to_string())),
        ];
        let created = self.orders.insert(&mut tx, &values).await?;

        tx.commit().await?;

        info!(
            order_id = created.id,
            restaurant = created.restaurant,
            client = created.client,
            "Created order"
        );
        Ok(created)
    }

    async fn update(&self, id: ModelId, patch: &OrderPatch) -> Result<Order> {
        if patch.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut tx = self.pool.begin().await?;

        self.orders.lock_by_id(&mut tx, id).await?;

        let assigned: HashSet<ModelId> = self
            .performers
            .select(&mut tx, &Filter::new().with("order_id", id).to_predicate())
            .await?
            .into_iter()
            .map(|p| p.performer_id)
            .collect();

        let mut new_performers = Vec::new();
        if let Some(cooks) = &patch.cooks {
            new_performers.extend(self.new_assignees(&mut tx, cooks, Role::Cook, &assigned).await?);
        }
        if let Some(waiters) = &patch.waiters {
            new_performers.extend(self.new_assignees(&mut tx, waiters, Role::Waiter, &assigned).await?);
        }

        let mut values: ColumnValues = Vec::new();
        if let Some(status) = patch.status {
            values.push(("status", ColumnValue::text(status.to_string())));
        }
        if let Some(status) = patch.cooks_status {
            values.push(("cooks_status", ColumnValue::text(status.to_string())));
        }
        if let Some(status) = patch.waiters_status {
            values.push(("waiters_status", ColumnValue::text(status.to_string())));
        }

        let updated = self.orders.update_by_id(&mut tx, id, &values).await?;

        for performer_id in &new_performers {
            add_in(
                &self.performers,
                &mut tx,
                &NewPerformer {
                    performer_id: *performer_id,
                    order_id: id,
                },
            )
            .await?;
        }

        if patch.status.is_some_and(|status| status.is_final()) {
            let closed = close_open_in(&mut tx, id).await?;
            debug!(order_id = id, closed, "Closed performer assignments");
        }

        tx.commit().await?;

        info!(
            order_id = id,
            status = %updated.status,
            new_performers = new_performers.len(),
            "Updated order"
        );
        Ok(updated)
    }
}
