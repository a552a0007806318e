use crate::error::OrderError;
use crate::visit_time::VisitTime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub type ModelId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    New,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses after which nobody works on the order anymore.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Progress of the cooks or the waiters on one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PerformersStatus {
    NotAssigned,
    Assigned,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Client,
    Cook,
    Waiter,
    Manager,
    Administrator,
}

/// An order row as persisted. `visit_time` keeps the stored range encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: ModelId,
    pub restaurant: ModelId,
    pub client: ModelId,
    pub number_of_persons: i32,
    pub visit_time: String,
    pub comment: Option<String>,
    pub menu: Option<Vec<ModelId>>,
    pub score: Option<ModelId>,
    pub status: OrderStatus,
    pub cooks_status: PerformersStatus,
    pub waiters_status: PerformersStatus,
    pub created_at: DateTime<Utc>,
}

/// One user's tenure working a given order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performer {
    pub id: ModelId,
    pub performer_id: ModelId,
    pub order_id: ModelId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewPerformer {
    pub performer_id: ModelId,
    pub order_id: ModelId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: ModelId,
    pub role: Role,
    pub name: String,
}

/// Payment record referenced by an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub id: ModelId,
    pub payment_amount: f64,
    pub payment_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /orders` as received. Fields stay optional so that missing
/// properties surface as `InvalidArgument` instead of a deserialization error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateRequest {
    pub restaurant: Option<ModelId>,
    pub client: Option<ModelId>,
    pub number_of_persons: Option<i32>,
    pub visit_time: Option<VisitTime>,
    pub comment: Option<String>,
    pub menu: Option<serde_json::Value>,
    pub payment_token: Option<String>,
}

/// Creation input that passed the structural checks.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCreateInfo {
    pub restaurant: ModelId,
    pub client: ModelId,
    pub number_of_persons: i32,
    pub visit_time: VisitTime,
    pub comment: Option<String>,
    pub menu: Option<Vec<ModelId>>,
    pub payment_token: Option<String>,
}

impl OrderCreateRequest {
    pub fn validate(self) -> Result<OrderCreateInfo, OrderError> {
        let missing = |name: &str| OrderError::InvalidArgument(format!("{} is required", name));

        let restaurant = self.restaurant.ok_or_else(|| missing("restaurant"))?;
        let client = self.client.ok_or_else(|| missing("client"))?;
        let visit_time = self.visit_time.ok_or_else(|| missing("visitTime"))?;
        let number_of_persons = match self.number_of_persons {
            Some(n) if n != 0 => n,
            _ => return Err(missing("numberOfPersons")),
        };

        let menu = match self.menu {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.as_i64().ok_or_else(|| {
                            OrderError::InvalidArgument(format!("menu item {} is not an id", item))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => {
                return Err(OrderError::InvalidArgument("menu must be an array".to_string()));
            }
        };

        if menu.is_some() && self.payment_token.is_none() {
            return Err(missing("paymentToken"));
        }

        Ok(OrderCreateInfo {
            restaurant,
            client,
            number_of_persons,
            visit_time,
            comment: self.comment,
            menu,
            payment_token: self.payment_token,
        })
    }
}

/// Body of `PATCH /orders/{id}` as received.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatchRequest {
    pub order_status: Option<String>,
    pub order_cooks_status: Option<String>,
    pub order_waiters_status: Option<String>,
    pub cooks: Option<Vec<ModelId>>,
    pub waiters: Option<Vec<ModelId>>,
}

/// Typed partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub cooks_status: Option<PerformersStatus>,
    pub waiters_status: Option<PerformersStatus>,
    pub cooks: Option<Vec<ModelId>>,
    pub waiters: Option<Vec<ModelId>>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        *self == OrderPatch::default()
    }
}

fn parse_status<T: std::str::FromStr>(field: &str, raw: Option<String>) -> Result<Option<T>, OrderError> {
    raw.map(|value| {
        value.parse::<T>().map_err(|_| {
            OrderError::IncorrectOrderParameters(format!("unknown {} '{}'", field, value))
        })
    })
    .transpose()
}

impl TryFrom<OrderPatchRequest> for OrderPatch {
    type Error = OrderError;

    fn try_from(request: OrderPatchRequest) -> Result<Self, Self::Error> {
        Ok(OrderPatch {
            status: parse_status("orderStatus", request.order_status)?,
            cooks_status: parse_status("orderCooksStatus", request.order_cooks_status)?,
            waiters_status: parse_status("orderWaitersStatus", request.order_waiters_status)?,
            cooks: request.cooks,
            waiters: request.waiters,
        })
    }
}
