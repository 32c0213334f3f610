use actix_web::{http::StatusCode, web, web::ServiceConfig};
use evaluation_engine::{
    db_types::{PaymentStatus, TraderStatus},
    eval_api::PaymentFlowApi,
    traits::PaymentStoreError,
};
use serde_json::{json, Value};

use super::helpers::{get_request, post_request, sample_client, sample_payment};
use crate::{
    endpoint_tests::mocks::MockStore,
    routes::{CheckClientRoute, ProcessRegistrationRoute, ValidatePaymentRoute},
};

#[actix_web::test]
async fn receivable_payments_validate() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request("/validate-payment?paymentId=inv-1", configure_receivable).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let response = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(response["valid"], true);
    assert_eq!(response["paymentData"]["plan"], "FX - 25K");
    assert_eq!(response["paymentData"]["customerEmail"], "ana@example.com");
}

#[actix_web::test]
async fn consumed_or_unknown_payments_get_a_404() {
    let _ = env_logger::try_init().ok();
    let err = get_request("/validate-payment?paymentId=inv-9", configure_no_payment)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "The data was not found. No receivable payment inv-9");
}

#[actix_web::test]
async fn known_clients_are_reported_with_their_record() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/check-client?email=ana@example.com&document=123.456.789-00", configure_client_exists)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let response = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(response["exists"], true);
    assert_eq!(response["clientData"]["email"], "ana@example.com");
}

#[actix_web::test]
async fn unknown_clients_are_reported_clean() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/check-client?email=novo@example.com&document=98765432100", configure_no_client)
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let response = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(response["exists"], false);
    assert!(response.get("clientData").is_none());
}

#[actix_web::test]
async fn registrations_consume_the_payment_and_create_the_client() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/process", &[], registration_body(), configure_registration).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let response = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(response["evaluationId"], 7);
}

#[actix_web::test]
async fn a_payment_cannot_back_two_registrations() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/process", &[], registration_body(), configure_consumed_payment)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "The data was not found. Payment inv-1 was already processed");
}

fn registration_body() -> Value {
    json!({
        "paymentId": "inv-1",
        "platform": "Black Arrow Pro",
        "plan": "FX - 25K",
        "name": "Ana Souza",
        "email": "ana@example.com",
        "cpf": "123.456.789-00",
        "phone": "11999990000",
        "address": "Rua das Laranjeiras, 100",
        "zipCode": "01310-000"
    })
}

fn configure_receivable(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store
        .expect_fetch_receivable_payment()
        .withf(|id| id == "inv-1")
        .returning(|_| Ok(Some(sample_payment("inv-1", PaymentStatus::Received))));
    register(cfg, store);
}

fn configure_no_payment(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_receivable_payment().returning(|_| Ok(None));
    register(cfg, store);
}

fn configure_client_exists(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    // The handler normalises the document before the lookup.
    store
        .expect_fetch_client_by_cpf_or_email()
        .withf(|cpf, email| cpf == "12345678900" && email == "ana@example.com")
        .returning(|_, _| Ok(Some(sample_client(7, TraderStatus::Waiting))));
    register(cfg, store);
}

fn configure_no_client(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_client_by_cpf_or_email().returning(|_, _| Ok(None));
    register(cfg, store);
}

fn configure_registration(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store
        .expect_process_registration()
        .times(1)
        .withf(|id, client| id == "inv-1" && client.email == "ana@example.com")
        .returning(|_, _| {
            Ok((sample_payment("inv-1", PaymentStatus::Completed), sample_client(7, TraderStatus::Waiting)))
        });
    register(cfg, store);
}

fn configure_consumed_payment(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_process_registration().returning(|_, _| {
        Err(PaymentStoreError::NotReceivable("inv-1".to_string(), PaymentStatus::Completed))
    });
    register(cfg, store);
}

fn register(cfg: &mut ServiceConfig, store: MockStore) {
    let api = PaymentFlowApi::new(store);
    cfg.service(ValidatePaymentRoute::<MockStore>::new())
        .service(CheckClientRoute::<MockStore>::new())
        .service(ProcessRegistrationRoute::<MockStore>::new())
        .app_data(web::Data::new(api));
}
