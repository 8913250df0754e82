use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const HAL_JSON: &str = "application/hal+json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub item: String,
    pub quantity: u32,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CreateOrder {
    pub item: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct ReplaceOrder {
    pub item: String,
    pub quantity: u32,
    pub status: String,
}

#[derive(Deserialize)]
pub struct UpdateOrder {
    pub item: Option<String>,
    pub quantity: Option<u32>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Order>>>;

/// Serializes `T` as `application/hal+json`.
pub struct Hal<T>(pub T);

impl<T: Serialize> IntoResponse for Hal<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => ([(header::CONTENT_TYPE, HAL_JSON)], body).into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

type NotFound = (StatusCode, Hal<Value>);

fn not_found() -> NotFound {
    (StatusCode::NOT_FOUND, Hal(json!({ "error": "not found" })))
}

/// HAL representation of one order.
pub fn order_resource(order: &Order) -> Value {
    json!({
        "_links": {
            "self": { "href": format!("/orders/{}", order.id) },
            "ea:orders": { "href": "/orders" }
        },
        "id": order.id,
        "item": order.item,
        "quantity": order.quantity,
        "status": order.status
    })
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/", get(root))
        .route("/headers", get(echo_headers))
        .route("/orders", get(list_orders).post(create_order))
        .route(
            "/orders/{id}",
            get(get_order)
                .put(replace_order)
                .patch(update_order)
                .delete(delete_order),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn root() -> Hal<Value> {
    Hal(json!({
        "_links": {
            "self": { "href": "/" },
            "ea:orders": { "href": "/orders{?status}", "templated": true },
            "ea:order": { "href": "/orders/{id}", "templated": true },
            "ea:headers": { "href": "/headers" }
        },
        "name": "orders"
    }))
}

/// Echoes the request headers, one array of values per lowercase name.
async fn echo_headers(headers: HeaderMap) -> Hal<Value> {
    let mut seen: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Hal(json!({ "headers": seen }))
}

async fn list_orders(State(db): State<Db>, Query(query): Query<ListQuery>) -> Hal<Value> {
    let orders = db.read().await;
    let mut matching: Vec<&Order> = orders
        .values()
        .filter(|o| query.status.as_deref().map_or(true, |s| o.status == s))
        .collect();
    matching.sort_by_key(|o| o.id);
    let embedded: Vec<Value> = matching.into_iter().map(order_resource).collect();
    Hal(json!({
        "_links": { "self": { "href": "/orders" } },
        "_embedded": { "ea:order": embedded },
        "count": embedded.len()
    }))
}

async fn create_order(State(db): State<Db>, Json(input): Json<CreateOrder>) -> impl IntoResponse {
    let order = Order {
        id: Uuid::new_v4(),
        item: input.item,
        quantity: input.quantity,
        status: "pending".to_string(),
    };
    tracing::debug!(id = %order.id, "order created");
    db.write().await.insert(order.id, order.clone());
    (
        StatusCode::CREATED,
        [(header::LOCATION, format!("/orders/{}", order.id))],
        Hal(order_resource(&order)),
    )
}

async fn get_order(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Hal<Value>, NotFound> {
    let orders = db.read().await;
    orders
        .get(&id)
        .map(|o| Hal(order_resource(o)))
        .ok_or_else(not_found)
}

async fn replace_order(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<ReplaceOrder>,
) -> Result<Hal<Value>, NotFound> {
    let mut orders = db.write().await;
    let order = orders.get_mut(&id).ok_or_else(not_found)?;
    order.item = input.item;
    order.quantity = input.quantity;
    order.status = input.status;
    Ok(Hal(order_resource(order)))
}

async fn update_order(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrder>,
) -> Result<Hal<Value>, NotFound> {
    let mut orders = db.write().await;
    let order = orders.get_mut(&id).ok_or_else(not_found)?;
    if let Some(item) = input.item {
        order.item = item;
    }
    if let Some(quantity) = input.quantity {
        order.quantity = quantity;
    }
    if let Some(status) = input.status {
        order.status = status;
    }
    Ok(Hal(order_resource(order)))
}

async fn delete_order(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<StatusCode, NotFound> {
    let mut orders = db.write().await;
    tracing::debug!(%id, "deleting order");
    orders
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}
