use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use evaluation_engine::{
    db_types::{Contact, ContactStatus, TraderStatus},
    eval_api::ClientApi,
};
use serde_json::{json, Value};

use super::helpers::{delete_request, get_request, post_request, sample_client};
use crate::{
    endpoint_tests::mocks::MockStore,
    routes::{
        AddContactRoute,
        AwaitingClientsRoute,
        ContactHistoryRoute,
        DeleteClientRoute,
        GetClientRoute,
        RejectedClientsRoute,
    },
};

#[actix_web::test]
async fn listings_filter_on_trader_status() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/clients/awaiting", configure_listings).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let clients = serde_json::from_str::<Vec<Value>>(&body).unwrap();
    assert_eq!(clients.len(), 2);
    assert!(clients.iter().all(|c| c["trader_status"] == "Aguardando Inicio"));

    let (status, body) = get_request("/clients/rejected", configure_listings).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let clients = serde_json::from_str::<Vec<Value>>(&body).unwrap();
    assert_eq!(clients.len(), 1);
}

#[actix_web::test]
async fn missing_clients_get_a_404() {
    let _ = env_logger::try_init().ok();
    let err = get_request("/clients/99", configure_no_client).await.expect_err("Expected error");
    assert_eq!(err, "The data was not found. Client 99");
}

#[actix_web::test]
async fn deleted_clients_get_a_confirmation_body() {
    let _ = env_logger::try_init().ok();
    let (status, body) = delete_request("/clients/3", configure_delete).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let reply = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(reply["success"], true);
    assert_eq!(reply["message"], "Client 3 deleted");
}

#[actix_web::test]
async fn contacts_are_recorded_against_the_client() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "status": "Contatado", "notes": "Ligação atendida" });
    let (status, body) =
        post_request("/clients/3/contacts", &[], body, configure_contacts).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let contact = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(contact["client_id"], 3);
    assert_eq!(contact["status"], "Contatado");
}

#[actix_web::test]
async fn contact_history_is_returned_in_full() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/clients/3/contacts", configure_contacts).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let contacts = serde_json::from_str::<Vec<Value>>(&body).unwrap();
    assert_eq!(contacts.len(), 2);
}

fn sample_contact(id: i64, status: ContactStatus) -> Contact {
    Contact {
        id,
        client_id: 3,
        status,
        contact_date: Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap(),
        notes: Some("Ligação atendida".to_string()),
        created_at: Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap(),
    }
}

fn configure_listings(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_clients_by_status().returning(|status| {
        let clients = match status {
            TraderStatus::Waiting => vec![sample_client(1, status), sample_client(2, status)],
            TraderStatus::Rejected => vec![sample_client(3, status)],
            _ => vec![],
        };
        Ok(clients)
    });
    register(cfg, store);
}

fn configure_no_client(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_fetch_client().returning(|_| Ok(None));
    register(cfg, store);
}

fn configure_delete(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store.expect_delete_client().withf(|id| *id == 3).times(1).returning(|_| Ok(()));
    register(cfg, store);
}

fn configure_contacts(cfg: &mut ServiceConfig) {
    let mut store = MockStore::new();
    store
        .expect_add_contact()
        .withf(|contact| contact.client_id == 3 && contact.status == ContactStatus::Contacted)
        .returning(|contact| {
            let mut stored = sample_contact(1, contact.status);
            stored.notes = contact.notes;
            Ok(stored)
        });
    store.expect_contact_history().withf(|id| *id == 3).returning(|_| {
        Ok(vec![sample_contact(2, ContactStatus::Contacted), sample_contact(1, ContactStatus::NotContacted)])
    });
    register(cfg, store);
}

fn register(cfg: &mut ServiceConfig, store: MockStore) {
    let api = ClientApi::new(store);
    cfg.service(AwaitingClientsRoute::<MockStore>::new())
        .service(RejectedClientsRoute::<MockStore>::new())
        .service(GetClientRoute::<MockStore>::new())
        .service(DeleteClientRoute::<MockStore>::new())
        .service(AddContactRoute::<MockStore>::new())
        .service(ContactHistoryRoute::<MockStore>::new())
        .app_data(web::Data::new(api));
}
