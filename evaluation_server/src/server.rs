use std::time::Duration;

use actix_web::{
    dev::{Server, Service, ServiceRequest},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use log::*;
use broker_tools::BrokerApi;
use evaluation_engine::{
    eval_api::{ClientApi, PaymentFlowApi},
    SqliteDatabase,
};
use teg_common::Secret;

use crate::{
    config::ServerConfig,
    errors::{AuthError, ServerError, ServerError::AuthenticationError},
    integrations::BrokerService,
    notify::EmailApiNotifier,
    routes::{
        health,
        AddContactRoute,
        AwaitingClientsRoute,
        CheckClientRoute,
        ContactHistoryRoute,
        DeleteClientRoute,
        EvaluatingClientsRoute,
        FinishEvaluationRoute,
        GetClientRoute,
        ProcessRegistrationRoute,
        ProvisionEvaluationRoute,
        RejectedClientsRoute,
        StartEvaluationRoute,
        UpdateClientRoute,
        ValidatePaymentRoute,
        WebhookPaymentRoute,
    },
};

const MAX_DB_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    // Fail fast on a malformed broker URL before any worker spins up.
    BrokerApi::new(config.broker.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = HttpServer::new(move || {
        let payment_api = PaymentFlowApi::new(db.clone());
        let client_api = ClientApi::new(db.clone());
        let notifier = EmailApiNotifier::new(config.email.clone());
        // The broker client is per-worker; each worker maintains its own
        // session token.
        let broker = BrokerApi::new(config.broker.clone()).expect("broker config was validated at startup");
        let broker_service = BrokerService::new(db.clone(), broker);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("teg::access_log"))
            .app_data(web::Data::new(payment_api))
            .app_data(web::Data::new(client_api))
            .app_data(web::Data::new(broker_service))
            .app_data(web::Data::new(notifier))
            .app_data(web::Data::new(config.clone()));
        // The webhook route does its own shared-secret check, since the
        // checkout platform cannot send a Bearer header.
        let webhook_scope = web::scope("/webhook")
            .service(WebhookPaymentRoute::<SqliteDatabase, EmailApiNotifier>::new());
        let api_key = config.api_key.clone();
        let registration_scope = web::scope("/registration")
            .wrap_fn(move |req, srv| {
                if bearer_key_matches(&req, &api_key) {
                    srv.call(req)
                } else {
                    warn!("💻️ Registration endpoint called without a valid API key");
                    ok(req.error_response(AuthenticationError(AuthError::InvalidApiKey))).boxed_local()
                }
            })
            .service(ValidatePaymentRoute::<SqliteDatabase>::new())
            .service(CheckClientRoute::<SqliteDatabase>::new())
            .service(ProcessRegistrationRoute::<SqliteDatabase>::new());
        let api_key = config.api_key.clone();
        let api_scope = web::scope("/api")
            .wrap_fn(move |req, srv| {
                if bearer_key_matches(&req, &api_key) {
                    srv.call(req)
                } else {
                    warn!("💻️ API endpoint called without a valid API key");
                    ok(req.error_response(AuthenticationError(AuthError::InvalidApiKey))).boxed_local()
                }
            })
            .service(AwaitingClientsRoute::<SqliteDatabase>::new())
            .service(EvaluatingClientsRoute::<SqliteDatabase>::new())
            .service(RejectedClientsRoute::<SqliteDatabase>::new())
            .service(GetClientRoute::<SqliteDatabase>::new())
            .service(UpdateClientRoute::<SqliteDatabase>::new())
            .service(DeleteClientRoute::<SqliteDatabase>::new())
            .service(AddContactRoute::<SqliteDatabase>::new())
            .service(ContactHistoryRoute::<SqliteDatabase>::new())
            .service(ProvisionEvaluationRoute::<SqliteDatabase, BrokerApi>::new())
            .service(StartEvaluationRoute::<SqliteDatabase, BrokerApi>::new())
            .service(FinishEvaluationRoute::<SqliteDatabase, BrokerApi>::new());
        app.service(health).service(webhook_scope).service(registration_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

fn bearer_key_matches(req: &ServiceRequest, key: &Secret<String>) -> bool {
    // An unset TEG_API_KEY leaves the key empty, which means reject everything.
    if key.reveal().is_empty() {
        return false;
    }
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| presented.trim() == key.reveal().as_str())
}
