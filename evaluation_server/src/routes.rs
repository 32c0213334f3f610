//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the storage and broker traits so the endpoint
//! tests can run against mocks. Actix cannot register generic handlers
//! directly, so the `route!` macro builds a small `HttpServiceFactory` shim
//! per route.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use evaluation_engine::{
    db_types::{normalize_cpf, Client, NewContact},
    eval_api::{ClientApi, PaymentFlowApi},
    traits::EvaluationDatabase,
};
use log::*;
use serde::Deserialize;
use broker_tools::BrokerClient;

use crate::{
    config::ServerConfig,
    data_objects::{
        CheckClientResponse,
        FinishEvaluationRequest,
        JsonResponse,
        NewContactRequest,
        RegistrationData,
        RegistrationProcessed,
        ValidatePaymentResponse,
        WebhookAck,
    },
    errors::{AuthError, ServerError},
    integrations::BrokerService,
    notify::RegistrationNotifier,
    webhook::{extract_payment, Disposition, WebhookEvent},
};

// Actix cannot handle generics in handlers, so registration is implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhook  ----------------------------------------------------

route!(webhook_payment => Post "/payment" impl EvaluationDatabase, RegistrationNotifier);
/// Route handler for incoming checkout-platform payment events.
///
/// The platform sends a shared secret in the `x-webhook-token` header; a
/// missing or wrong token is rejected before the body is even parsed. Events
/// that pass the filter are persisted idempotently, and a first-time payment
/// triggers the registration email. Everything that parses gets a 2xx back,
/// because the platform retries anything else.
pub async fn webhook_payment<B, N>(
    req: HttpRequest,
    body: String,
    api: web::Data<PaymentFlowApi<B>>,
    notifier: web::Data<N>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: EvaluationDatabase,
    N: RegistrationNotifier,
{
    trace!("💻️ Received payment webhook request");
    let token = req.headers().get("x-webhook-token").and_then(|v| v.to_str().ok());
    let secret = config.webhook_secret.reveal().as_str();
    // An unset TEG_WEBHOOK_SECRET leaves the secret empty; reject every
    // delivery rather than accept an empty token.
    if secret.is_empty() || token != Some(secret) {
        warn!("💻️ Payment webhook called with a missing or invalid token");
        return Err(AuthError::InvalidWebhookToken.into());
    }
    let event = serde_json::from_str::<WebhookEvent>(&body).map_err(|e| {
        debug!("💻️ Could not parse webhook payload. {e}");
        ServerError::CouldNotDeserializePayload
    })?;
    let new_payment = match extract_payment(event)? {
        Disposition::Ignored(reason) => {
            info!("💻️ Ignoring webhook event: {reason}");
            return Ok(HttpResponse::Ok().json(WebhookAck::ignored(&reason)));
        },
        Disposition::Payment(p) => p,
    };
    let (payment, inserted) = api.process_payment(new_payment).await?;
    let registration_url =
        format!("{}/registration/{}", config.registration_base_url.trim_end_matches('/'), payment.payment_id);
    if inserted {
        if let Err(e) = notifier
            .send_registration_link(&payment.customer_name, &payment.customer_email, &registration_url)
            .await
        {
            // The payment is stored either way; the link can be re-sent.
            warn!("💻️ Could not send the registration email for {}. {e}", payment.payment_id);
        }
    }
    Ok(HttpResponse::Ok().json(WebhookAck::processed(payment.payment_id, registration_url)))
}

//----------------------------------------------   Registration  ----------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIdQuery {
    pub payment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ClientLookupQuery {
    pub email: String,
    pub document: String,
}

route!(validate_payment => Get "/validate-payment" impl EvaluationDatabase);
/// The registration portal calls this before showing the form. Only payments
/// that are still in `received` status validate; consumed or unknown ids 404.
pub async fn validate_payment<B: EvaluationDatabase>(
    query: web::Query<PaymentIdQuery>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payment_id = query.into_inner().payment_id;
    debug!("💻️ GET validate-payment for {payment_id}");
    let payment = api
        .validate_payment(&payment_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No receivable payment {payment_id}")))?;
    Ok(HttpResponse::Ok().json(ValidatePaymentResponse { valid: true, payment_data: (&payment).into() }))
}

route!(check_client => Get "/check-client" impl EvaluationDatabase);
pub async fn check_client<B: EvaluationDatabase>(
    query: web::Query<ClientLookupQuery>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    debug!("💻️ GET check-client for {}", query.email);
    let client = api.find_client(&normalize_cpf(&query.document), &query.email).await?;
    Ok(HttpResponse::Ok().json(CheckClientResponse { exists: client.is_some(), client_data: client }))
}

route!(process_registration => Post "/process" impl EvaluationDatabase);
/// Consume the payment and create the client in one transaction. A payment
/// that is unknown, or was already consumed, yields a 404 so the portal can
/// tell the trader the link is no longer valid.
pub async fn process_registration<B: EvaluationDatabase>(
    body: web::Json<RegistrationData>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let registration = body.into_inner();
    let payment_id = registration.payment_id.clone();
    debug!("💻️ POST process registration for payment {payment_id}");
    let (_, client) = api.process_registration(&payment_id, registration.into_new_client()).await?;
    let response =
        RegistrationProcessed { message: "Registration completed".to_string(), evaluation_id: client.id };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Clients  ----------------------------------------------------

route!(awaiting_clients => Get "/clients/awaiting" impl EvaluationDatabase);
pub async fn awaiting_clients<B: EvaluationDatabase>(
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET awaiting clients");
    Ok(HttpResponse::Ok().json(api.awaiting_clients().await?))
}

route!(evaluating_clients => Get "/clients/evaluating" impl EvaluationDatabase);
pub async fn evaluating_clients<B: EvaluationDatabase>(
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET evaluating clients");
    Ok(HttpResponse::Ok().json(api.evaluating_clients().await?))
}

route!(rejected_clients => Get "/clients/rejected" impl EvaluationDatabase);
pub async fn rejected_clients<B: EvaluationDatabase>(
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET rejected clients");
    Ok(HttpResponse::Ok().json(api.rejected_clients().await?))
}

route!(get_client => Get "/clients/{id}" impl EvaluationDatabase);
pub async fn get_client<B: EvaluationDatabase>(
    path: web::Path<i64>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET client {id}");
    let client =
        api.client(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Client {id}")))?;
    Ok(HttpResponse::Ok().json(client))
}

route!(update_client => Put "/clients/{id}" impl EvaluationDatabase);
pub async fn update_client<B: EvaluationDatabase>(
    path: web::Path<i64>,
    body: web::Json<Client>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PUT client {id}");
    let mut client = body.into_inner();
    // The path is authoritative for the id.
    client.id = id;
    let updated = api.update_client(&client).await?;
    Ok(HttpResponse::Ok().json(updated))
}

route!(delete_client => Delete "/clients/{id}" impl EvaluationDatabase);
pub async fn delete_client<B: EvaluationDatabase>(
    path: web::Path<i64>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ DELETE client {id}");
    api.delete_client(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Client {id} deleted"))))
}

//----------------------------------------------   Contacts  ----------------------------------------------------

route!(add_contact => Post "/clients/{id}/contacts" impl EvaluationDatabase);
pub async fn add_contact<B: EvaluationDatabase>(
    path: web::Path<i64>,
    body: web::Json<NewContactRequest>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let client_id = path.into_inner();
    let request = body.into_inner();
    debug!("💻️ POST contact for client {client_id}");
    let contact = NewContact {
        client_id,
        status: request.status,
        contact_date: request.contact_date.unwrap_or_else(Utc::now),
        notes: request.notes,
    };
    let stored = api.add_contact(contact).await?;
    Ok(HttpResponse::Ok().json(stored))
}

route!(contact_history => Get "/clients/{id}/contacts" impl EvaluationDatabase);
pub async fn contact_history<B: EvaluationDatabase>(
    path: web::Path<i64>,
    api: web::Data<ClientApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let client_id = path.into_inner();
    debug!("💻️ GET contact history for client {client_id}");
    Ok(HttpResponse::Ok().json(api.contact_history(client_id).await?))
}

//----------------------------------------------   Evaluations  ----------------------------------------------------

route!(provision_evaluation => Post "/evaluations/{id}/provision" impl EvaluationDatabase, BrokerClient);
/// Create the broker subscription and challenge account for a registered
/// client. Leaves the trader status alone; an operator starts the evaluation
/// as a separate step once the trader has their credentials.
pub async fn provision_evaluation<B, C>(
    path: web::Path<i64>,
    service: web::Data<BrokerService<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: EvaluationDatabase,
    C: BrokerClient,
{
    let id = path.into_inner();
    info!("💻️ POST provision evaluation for client {id}");
    let client = service.register_client_evaluation(id).await?;
    Ok(HttpResponse::Ok().json(client))
}

route!(start_evaluation => Post "/evaluations/{id}/start" impl EvaluationDatabase, BrokerClient);
pub async fn start_evaluation<B, C>(
    path: web::Path<i64>,
    service: web::Data<BrokerService<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: EvaluationDatabase,
    C: BrokerClient,
{
    let id = path.into_inner();
    info!("💻️ POST start evaluation for client {id}");
    let client = service.start_evaluation(id).await?;
    Ok(HttpResponse::Ok().json(client))
}

route!(finish_evaluation => Post "/evaluations/{id}/finish" impl EvaluationDatabase, BrokerClient);
pub async fn finish_evaluation<B, C>(
    path: web::Path<i64>,
    body: web::Json<FinishEvaluationRequest>,
    service: web::Data<BrokerService<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: EvaluationDatabase,
    C: BrokerClient,
{
    let id = path.into_inner();
    let status = body.into_inner().status;
    info!("💻️ POST finish evaluation for client {id} as {status}");
    let client = service.finish_evaluation(id, status).await?;
    Ok(HttpResponse::Ok().json(client))
}
