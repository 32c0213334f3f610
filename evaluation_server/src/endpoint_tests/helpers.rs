use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use evaluation_engine::db_types::{Client, Payment, PaymentStatus, TraderStatus};
use serde_json::{json, Value};
use teg_common::{Cents, Secret};

use crate::config::ServerConfig;

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        webhook_secret: Secret::from(WEBHOOK_SECRET.to_string()),
        registration_base_url: "https://portal.test".to_string(),
        ..ServerConfig::default()
    }
}

pub async fn get_request(
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    send(TestRequest::get().uri(path), configure).await
}

pub async fn delete_request(
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    send(TestRequest::delete().uri(path), configure).await
}

pub async fn post_request(
    path: &str,
    headers: &[(&str, &str)],
    body: Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path);
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    send(req.set_json(body), configure).await
}

/// The webhook handler takes a raw string body, so the payload goes in
/// unparsed.
pub async fn post_raw(
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path);
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    send(req.set_payload(body.to_string()), configure).await
}

async fn send(req: TestRequest, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    if status.is_client_error() || status.is_server_error() {
        // Handler errors arrive as a 4xx response with an `{"error": ...}` body
        // rather than through the service's Err channel.
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        return Err(message);
    }
    Ok((status, body))
}

//----------------------------------------------   Fixtures  ----------------------------------------------------

pub fn sample_payment(payment_id: &str, status: PaymentStatus) -> Payment {
    Payment {
        id: 1,
        payment_id: payment_id.to_string(),
        status,
        plan: "FX - 25K".to_string(),
        platform: "Black Arrow Pro".to_string(),
        amount: Cents::from(49700),
        customer_name: "Ana Souza".to_string(),
        customer_email: "ana@example.com".to_string(),
        customer_phone: Some("11999990000".to_string()),
        customer_document: "12345678900".to_string(),
        payment_method: Some("credit_card".to_string()),
        sale_date: Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap(),
        created_at: Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 5).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 5).unwrap(),
    }
}

pub fn sample_client(id: i64, status: TraderStatus) -> Client {
    Client {
        id,
        name: "Ana Souza".to_string(),
        cpf: "12345678900".to_string(),
        phone: "11999990000".to_string(),
        birth_date: None,
        email: "ana@example.com".to_string(),
        address: Some("Rua das Laranjeiras, 100".to_string()),
        zip_code: Some("01310-000".to_string()),
        platform: "Black Arrow Pro".to_string(),
        plan: "FX - 25K".to_string(),
        trader_status: status,
        observation: None,
        start_date: None,
        end_date: None,
        cancellation_date: None,
        broker_customer_id: None,
        broker_subscription_id: None,
        broker_license_id: None,
        broker_account: None,
        created_at: Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap(),
    }
}

pub fn provisioned_client(id: i64, status: TraderStatus) -> Client {
    let mut client = sample_client(id, status);
    client.broker_customer_id = Some("cust-1".to_string());
    client.broker_subscription_id = Some("sub-1".to_string());
    client.broker_license_id = Some("lic-1".to_string());
    client.broker_account = Some("AC100".to_string());
    client
}

pub fn webhook_body(event_type: &str, invoice_id: &str, status: &str, product: &str) -> String {
    json!({
        "type": event_type,
        "version": "2.0.0",
        "event": {
            "product": { "id": "prod-1", "name": product },
            "invoice": {
                "id": invoice_id,
                "status": status,
                "amount": { "totalCents": 49700 },
                "saleDate": "2025-03-01T10:30:00Z",
                "paymentMethod": "credit_card"
            },
            "user": {
                "firstName": "Ana",
                "lastName": "Souza",
                "email": "ana@example.com",
                "phone": "11999990000",
                "document": "123.456.789-00"
            }
        }
    })
    .to_string()
}
