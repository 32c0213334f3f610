use actix_web::{http::StatusCode, web, web::ServiceConfig};
use evaluation_engine::{db_types::PaymentStatus, eval_api::PaymentFlowApi};
use serde_json::Value;

use super::helpers::{post_raw, sample_payment, test_config, webhook_body, WEBHOOK_SECRET};
use crate::{
    config::ServerConfig,
    endpoint_tests::mocks::{MockNotifier, MockStore},
    routes::WebhookPaymentRoute,
    webhook::PAYMENT_SUCCEEDED,
};

const TOKEN_HEADER: (&str, &str) = ("x-webhook-token", WEBHOOK_SECRET);

#[actix_web::test]
async fn deliveries_without_the_shared_secret_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = webhook_body(PAYMENT_SUCCEEDED, "inv-1", "paid", "Trader 25K");
    let err = post_raw("/payment", &[], &body, configure_untouched).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. The webhook token is missing or does not match.");
}

#[actix_web::test]
async fn an_unset_secret_rejects_even_empty_tokens() {
    let _ = env_logger::try_init().ok();
    let body = webhook_body(PAYMENT_SUCCEEDED, "inv-1", "paid", "Trader 25K");
    let err = post_raw("/payment", &[("x-webhook-token", "")], &body, configure_no_secret)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "Authentication Error. The webhook token is missing or does not match.");
}

#[actix_web::test]
async fn garbage_payloads_get_a_400() {
    let _ = env_logger::try_init().ok();
    let err = post_raw("/payment", &[TOKEN_HEADER], "not json at all", configure_untouched)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "Payload deserialization error");
}

#[actix_web::test]
async fn first_time_payments_are_recorded_and_mailed() {
    let _ = env_logger::try_init().ok();
    let body = webhook_body(PAYMENT_SUCCEEDED, "inv-1", "paid", "Trader 25K");
    let (status, body) =
        post_raw("/payment", &[TOKEN_HEADER], &body, configure_first_payment).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let ack = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(ack["paymentId"], "inv-1");
    assert_eq!(ack["registrationUrl"], "https://portal.test/registration/inv-1");
}

#[actix_web::test]
async fn replayed_payments_do_not_resend_the_email() {
    let _ = env_logger::try_init().ok();
    let body = webhook_body(PAYMENT_SUCCEEDED, "inv-1", "paid", "Trader 25K");
    let (status, body) =
        post_raw("/payment", &[TOKEN_HEADER], &body, configure_replayed_payment).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let ack = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(ack["paymentId"], "inv-1");
}

#[actix_web::test]
async fn unpaid_invoices_are_acknowledged_but_ignored() {
    let _ = env_logger::try_init().ok();
    let body = webhook_body(PAYMENT_SUCCEEDED, "inv-1", "pending", "Trader 25K");
    let (status, body) =
        post_raw("/payment", &[TOKEN_HEADER], &body, configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let ack = serde_json::from_str::<Value>(&body).unwrap();
    assert!(ack["message"].as_str().unwrap().contains("ignored"));
    assert!(ack.get("paymentId").is_none());
}

#[actix_web::test]
async fn order_bumps_are_acknowledged_but_ignored() {
    let _ = env_logger::try_init().ok();
    let body = webhook_body(PAYMENT_SUCCEEDED, "inv-1-offer-2", "paid", "Trader 25K");
    let (status, body) =
        post_raw("/payment", &[TOKEN_HEADER], &body, configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let ack = serde_json::from_str::<Value>(&body).unwrap();
    assert!(ack["message"].as_str().unwrap().contains("order bump"));
}

/// For requests that never reach the store or the mailer.
fn configure_untouched(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_insert_payment().times(0);
    let mut notifier = MockNotifier::new();
    notifier.expect_send_registration_link().times(0);
    register(cfg, store, notifier);
}

/// No webhook secret configured at all. Nothing may get through.
fn configure_no_secret(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_insert_payment().times(0);
    let mut notifier = MockNotifier::new();
    notifier.expect_send_registration_link().times(0);
    let api = PaymentFlowApi::new(store);
    cfg.service(WebhookPaymentRoute::<MockStore, MockNotifier>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(notifier))
        .app_data(web::Data::new(ServerConfig::default()));
}

fn configure_first_payment(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store
        .expect_insert_payment()
        .times(1)
        .returning(|_| Ok((sample_payment("inv-1", PaymentStatus::Received), true)));
    let mut notifier = MockNotifier::new();
    notifier
        .expect_send_registration_link()
        .times(1)
        .withf(|_, email, url| email == "ana@example.com" && url == "https://portal.test/registration/inv-1")
        .returning(|_, _, _| Ok(()));
    register(cfg, store, notifier);
}

fn configure_replayed_payment(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store
        .expect_insert_payment()
        .times(1)
        .returning(|_| Ok((sample_payment("inv-1", PaymentStatus::Received), false)));
    let mut notifier = MockNotifier::new();
    notifier.expect_send_registration_link().times(0);
    register(cfg, store, notifier);
}

fn register(cfg: &mut ServiceConfig, store: MockStore, notifier: MockNotifier) {
    let api = PaymentFlowApi::new(store);
    cfg.service(WebhookPaymentRoute::<MockStore, MockNotifier>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(notifier))
        .app_data(web::Data::new(test_config()));
}
