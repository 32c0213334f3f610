use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use evaluation_engine::db_types::TraderStatus;
use mockall::Sequence;
use serde_json::{json, Value};
use broker_tools::data_objects::{AccountData, SubscriptionData};

use super::helpers::{post_request, provisioned_client, sample_client};
use crate::{
    endpoint_tests::mocks::{MockBroker, MockStore},
    integrations::BrokerService,
    routes::{FinishEvaluationRoute, ProvisionEvaluationRoute, StartEvaluationRoute},
};

#[actix_web::test]
async fn provisioning_stores_the_linkage_and_keeps_the_status() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/evaluations/7/provision", &[], json!({}), configure_provision).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let client = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(client["broker_account"], "AC100");
    assert_eq!(client["trader_status"], "Aguardando Inicio");
}

#[actix_web::test]
async fn unknown_plans_never_reach_the_broker() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/evaluations/7/provision", &[], json!({}), configure_unknown_plan)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "No broker profile exists for plan 'FX - 999K'");
}

#[actix_web::test]
async fn starting_requires_a_provisioned_account() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/evaluations/7/start", &[], json!({}), configure_start_unprovisioned)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "The client has no provisioned broker account yet");
}

#[actix_web::test]
async fn starting_with_an_unknown_plan_never_reaches_the_broker() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/evaluations/7/start", &[], json!({}), configure_start_unknown_plan)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "No broker profile exists for plan 'FX - 999K'");
}

#[actix_web::test]
async fn starting_applies_the_risk_profile_and_opens_a_sixty_day_window() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/evaluations/7/start", &[], json!({}), configure_start).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let client = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(client["trader_status"], "Em Curso");
}

#[actix_web::test]
async fn finishing_removes_the_account_before_recording_the_verdict() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/evaluations/7/finish", &[], json!({ "status": "Aprovado" }), configure_finish)
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let client = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(client["trader_status"], "Aprovado");
}

#[actix_web::test]
async fn an_evaluation_cannot_finish_in_a_non_terminal_status() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/evaluations/7/finish", &[], json!({ "status": "Em Curso" }), configure_untouched_broker)
        .await
        .expect_err("Expected error");
    assert!(err.contains("approved or rejected"));
}

fn configure_provision(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_client().returning(|id| Ok(Some(sample_client(id, TraderStatus::Waiting))));
    store
        .expect_update_broker_linkage()
        .times(1)
        .withf(|id, linkage| {
            *id == 7
                && linkage.customer_id == "cust-1"
                && linkage.subscription_id == "sub-1"
                && linkage.license_id == "lic-1"
                && linkage.account == "AC100"
        })
        .returning(|id, _| Ok(provisioned_client(id, TraderStatus::Waiting)));
    // No status write happens during provisioning.
    store.expect_start_evaluation().times(0);
    let mut broker = MockBroker::new();
    broker
        .expect_create_subscription()
        .times(1)
        .withf(|sub| sub.first_name == "Ana" && sub.last_name == "Souza")
        .returning(|_| {
            Ok(SubscriptionData {
                customer_id: "cust-1".to_string(),
                subscription_id: "sub-1".to_string(),
                license_id: "lic-1".to_string(),
                accounts: vec![],
            })
        });
    broker
        .expect_create_accounts()
        .times(1)
        .withf(|license, accounts| license == "lic-1" && accounts.len() == 1)
        .returning(|_, accounts| {
            Ok(vec![AccountData { account: "AC100".to_string(), profile_id: accounts[0].profile_id.clone() }])
        });
    register(cfg, store, broker);
}

fn configure_unknown_plan(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_client().returning(|id| {
        let mut client = sample_client(id, TraderStatus::Waiting);
        client.plan = "FX - 999K".to_string();
        Ok(Some(client))
    });
    store.expect_update_broker_linkage().times(0);
    let mut broker = MockBroker::new();
    broker.expect_create_subscription().times(0);
    broker.expect_create_accounts().times(0);
    register(cfg, store, broker);
}

fn configure_start_unprovisioned(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_client().returning(|id| Ok(Some(sample_client(id, TraderStatus::Waiting))));
    store.expect_start_evaluation().times(0);
    let mut broker = MockBroker::new();
    broker.expect_set_account_risk().times(0);
    register(cfg, store, broker);
}

fn configure_start_unknown_plan(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_client().returning(|id| {
        let mut client = provisioned_client(id, TraderStatus::Waiting);
        client.plan = "FX - 999K".to_string();
        Ok(Some(client))
    });
    store.expect_start_evaluation().times(0);
    let mut broker = MockBroker::new();
    broker.expect_set_account_risk().times(0);
    register(cfg, store, broker);
}

fn configure_start(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_client().returning(|id| Ok(Some(provisioned_client(id, TraderStatus::Waiting))));
    store
        .expect_start_evaluation()
        .times(1)
        .withf(|id, start, end| *id == 7 && *end - *start == Duration::days(60))
        .returning(|id, start, end| {
            let mut client = provisioned_client(id, TraderStatus::InProgress);
            client.start_date = Some(start);
            client.end_date = Some(end);
            Ok(client)
        });
    let mut broker = MockBroker::new();
    broker
        .expect_set_account_risk()
        .times(1)
        .withf(|license, account, _| license == "lic-1" && account == "AC100")
        .returning(|_, _, _| Ok(()));
    register(cfg, store, broker);
}

fn configure_finish(cfg: &mut ServiceConfig) {
    let mut seq = Sequence::new();
    let mut store = MockStore::new();
    let mut broker = MockBroker::new();
    store
        .expect_fetch_client()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|id| Ok(Some(provisioned_client(id, TraderStatus::InProgress))));
    broker
        .expect_remove_account()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|license, account| license == "lic-1" && account == "AC100")
        .returning(|_, _| Ok(()));
    store
        .expect_finish_evaluation()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|id, status, _| *id == 7 && *status == TraderStatus::Approved)
        .returning(|id, status, ended_at| {
            let mut client = provisioned_client(id, status);
            client.end_date = Some(ended_at);
            client.cancellation_date = Some(ended_at);
            Ok(client)
        });
    register(cfg, store, broker);
}

fn configure_untouched_broker(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_finish_evaluation().times(0);
    let mut broker = MockBroker::new();
    broker.expect_remove_account().times(0);
    register(cfg, store, broker);
}

fn register(cfg: &mut ServiceConfig, store: MockStore, broker: MockBroker) {
    let service = BrokerService::new(store, broker);
    cfg.service(ProvisionEvaluationRoute::<MockStore, MockBroker>::new())
        .service(StartEvaluationRoute::<MockStore, MockBroker>::new())
        .service(FinishEvaluationRoute::<MockStore, MockBroker>::new())
        .app_data(web::Data::new(service));
}
