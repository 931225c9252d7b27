// src/services/api_server.rs
//! API Server for the credential lifecycle service
//!
//! A thin HTTP shell over the lifecycle components, built with Axum:
//! - DID creation and resolution
//! - Key pair generation
//! - Verifiable credential issuance and verification
//! - Verifiable presentation creation and verification
//!
//! Bodies are parsed by the handlers themselves so that an unparseable body
//! always answers `400 {"error": "Malformed request"}`. Component errors
//! answer `{"error", "kind"}`, with the DID in a `did` member for DID
//! failures. Failed verifications are a normal `200` answer with
//! `isValid: false`.

use crate::config::ServiceConfig;
use crate::error::{Error, ErrorKind};
use crate::models::did::DidMethod;
use crate::models::jwk::Jwk;
use crate::models::request::{CreatePresentationRequest, Field, Input, IssueCredentialRequest};
use crate::registry::{EbsiRegistryClient, Registry};
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::did_resolver::{create_did, DidResolver};
use crate::services::presentation::PresentationEngine;
use crate::services::verifier::{CredentialVerifier, Verification};
use crate::wallet::key_management::{generate_key_pair, KeyAlgorithm};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

// API request structures

/// Request payload for DID resolution
#[derive(Deserialize, Default)]
#[serde(default)]
struct ResolveRequest {
    did: Input<String>,
}

/// Request payload for DID creation
#[derive(Deserialize, Default)]
#[serde(default)]
struct CreateDidRequest {
    method: Input<String>,
    jwk: Input<Jwk>,
}

/// Request payload for key pair generation
#[derive(Deserialize, Default)]
#[serde(default)]
struct KeyPairRequest {
    algorithm: Input<String>,
}

/// Request payload for credential verification
#[derive(Deserialize, Default)]
#[serde(default)]
struct VerifyCredentialRequest {
    token: Input<String>,
}

/// Request payload for presentation verification
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct VerifyPresentationRequest {
    token: Input<String>,
    audience_did: Input<String>,
    /// Also verify every embedded credential.
    deep: Option<bool>,
}

/// API server state containing all service dependencies
pub struct ApiServer<R = EbsiRegistryClient> {
    /// Reported by `GET /info`
    service_name: String,

    /// Resolver shared by every verifying component
    resolver: Arc<DidResolver<R>>,

    /// Service for issuing credentials
    credential_issuer: Arc<CredentialIssuer>,

    /// Service for verifying credentials
    verifier: CredentialVerifier<R>,

    /// Service for creating and verifying presentations
    presentations: PresentationEngine<R>,
}

impl ApiServer<EbsiRegistryClient> {
    /// Creates a server backed by the EBSI registry named in `config`.
    ///
    /// # Errors
    /// `ResolverError` if the registry client cannot be built.
    pub fn from_config(config: &ServiceConfig) -> crate::error::Result<Self> {
        Ok(Self::new(config, EbsiRegistryClient::new(&config.resolver)?))
    }
}

impl<R: Registry + 'static> ApiServer<R> {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `config` - Service configuration; each component takes its section
    /// * `registry` - Registry used to resolve registry-backed DIDs
    pub fn new(config: &ServiceConfig, registry: R) -> Self {
        let resolver = Arc::new(DidResolver::new(registry));
        ApiServer {
            service_name: config.service_name.clone(),
            credential_issuer: Arc::new(CredentialIssuer::new(config.issuer.clone())),
            verifier: CredentialVerifier::new(Arc::clone(&resolver)),
            presentations: PresentationEngine::new(config.presentation.clone(), Arc::clone(&resolver)),
            resolver,
        }
    }

    /// Builds the router with every API route.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(Self::health_handler))
            .route("/info", get(Self::info_handler))
            .route("/resolve", get(Self::resolve_handler).post(Self::resolve_handler))
            .route("/did", post(Self::create_did_handler))
            .route("/jwk", post(Self::generate_jwk_handler))
            .route("/vc/issue", post(Self::issue_credential_handler))
            .route("/vc/verify", post(Self::verify_credential_handler))
            .route("/vp/create", post(Self::create_presentation_handler))
            .route("/vp/verify", post(Self::verify_presentation_handler))
            .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Errors
    /// Returns the I/O error if the address cannot be bound or serving fails.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("{} listening on {addr}", self.service_name);
        axum::serve(listener, app).await
    }

    // =====================
    // Service Handlers
    // =====================

    /// GET /
    async fn health_handler() -> &'static str {
        "Service is up"
    }

    /// GET /info
    async fn info_handler(State(state): State<Arc<Self>>) -> Response {
        Json(json!({ "name": state.service_name })).into_response()
    }

    // =====================
    // DID Handlers
    // =====================

    /// Resolves a DID to its resolution result
    ///
    /// # Endpoint
    /// GET or POST /resolve
    ///
    /// # Responses
    /// - 200 OK: `{didDocument, didDocumentMetadata, didResolutionMetadata}`
    /// - 400 Bad Request: malformed body, invalid DID or DID not found
    /// - 502 Bad Gateway: the registry failed
    async fn resolve_handler(State(state): State<Arc<Self>>, body: Bytes) -> Response {
        let Some(request) = parse::<ResolveRequest>(&body) else {
            return malformed();
        };
        let did = match request.did.require(Field::Did) {
            Ok(did) => did,
            Err(e) => return error_response(&e),
        };

        match state.resolver.resolve_result(&did).await {
            Ok(result) => (StatusCode::OK, Json(result)).into_response(),
            Err(e) => error_response(&e),
        }
    }

    /// Creates a DID for a public key
    ///
    /// # Endpoint
    /// POST /did
    async fn create_did_handler(body: Bytes) -> Response {
        let Some(request) = parse::<CreateDidRequest>(&body) else {
            return malformed();
        };
        let created = request
            .method
            .require(Field::Method)
            .and_then(|method| method.parse::<DidMethod>())
            .and_then(|method| {
                let jwk = request.jwk.require(Field::SigningKey)?;
                create_did(method, &jwk)
            });

        match created {
            Ok(did) => (StatusCode::OK, Json(json!({ "did": did }))).into_response(),
            Err(e) => error_response(&e),
        }
    }

    /// Generates a key pair
    ///
    /// # Endpoint
    /// POST /jwk
    ///
    /// # Responses
    /// - 200 OK: `{privateJwk, publicJwk}`
    /// - 400 Bad Request: unknown algorithm label
    async fn generate_jwk_handler(body: Bytes) -> Response {
        let Some(request) = parse::<KeyPairRequest>(&body) else {
            return malformed();
        };
        let algorithm = match request
            .algorithm
            .require(Field::Algorithm)
            .and_then(|label| label.parse::<KeyAlgorithm>())
        {
            Ok(algorithm) => algorithm,
            Err(e) => return error_response(&e),
        };

        // RSA generation is CPU bound
        match tokio::task::spawn_blocking(move || generate_key_pair(algorithm)).await {
            Ok(Ok(pair)) => (StatusCode::OK, Json(pair)).into_response(),
            Ok(Err(e)) => error_response(&e),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("key generation aborted: {e}") })),
            )
                .into_response(),
        }
    }

    // =====================
    // Credential Handlers
    // =====================

    /// Issues a credential
    ///
    /// # Endpoint
    /// POST /vc/issue
    async fn issue_credential_handler(State(state): State<Arc<Self>>, body: Bytes) -> Response {
        let Some(request) = parse::<IssueCredentialRequest>(&body) else {
            return malformed();
        };

        match state.credential_issuer.issue_credential(request) {
            Ok(token) => (StatusCode::OK, Json(json!({ "token": token }))).into_response(),
            Err(e) => error_response(&e),
        }
    }

    /// Verifies a credential
    ///
    /// # Endpoint
    /// POST /vc/verify
    ///
    /// # Responses
    /// - 200 OK: `{isValid: true, vcDocument}` or `{isValid: false, error, kind}`
    /// - 400 Bad Request: malformed body or missing token
    async fn verify_credential_handler(State(state): State<Arc<Self>>, body: Bytes) -> Response {
        let Some(request) = parse::<VerifyCredentialRequest>(&body) else {
            return malformed();
        };
        let token = match request.token.require(Field::Token) {
            Ok(token) => token,
            Err(e) => return error_response(&e),
        };

        let outcome = state.verifier.verify_credential(&token).await;
        verification_response(outcome, |vc| json!({ "isValid": true, "vcDocument": vc }))
    }

    // =====================
    // Presentation Handlers
    // =====================

    /// Creates a presentation
    ///
    /// # Endpoint
    /// POST /vp/create
    async fn create_presentation_handler(State(state): State<Arc<Self>>, body: Bytes) -> Response {
        let Some(request) = parse::<CreatePresentationRequest>(&body) else {
            return malformed();
        };

        match state.presentations.create_presentation(request) {
            Ok(token) => (StatusCode::OK, Json(json!({ "token": token }))).into_response(),
            Err(e) => error_response(&e),
        }
    }

    /// Verifies a presentation, optionally with its credentials
    ///
    /// # Endpoint
    /// POST /vp/verify
    ///
    /// # Responses
    /// - 200 OK: `{isValid: true, vpDocument[, vcDocuments]}` or `{isValid: false, error, kind}`
    /// - 400 Bad Request: malformed body, missing token or audience
    async fn verify_presentation_handler(State(state): State<Arc<Self>>, body: Bytes) -> Response {
        let Some(request) = parse::<VerifyPresentationRequest>(&body) else {
            return malformed();
        };
        let checked = request.token.require(Field::Token).and_then(|token| {
            Ok((token, request.audience_did.require(Field::AudienceDid)?))
        });
        let (token, audience) = match checked {
            Ok(fields) => fields,
            Err(e) => return error_response(&e),
        };

        if request.deep.unwrap_or(false) {
            let outcome = state.presentations.verify_presentation_deep(&token, &audience).await;
            verification_response(outcome, |bundle| {
                json!({
                    "isValid": true,
                    "vpDocument": bundle.presentation,
                    "vcDocuments": bundle.credentials,
                })
            })
        } else {
            let outcome = state.presentations.verify_presentation(&token, &audience).await;
            verification_response(outcome, |vp| json!({ "isValid": true, "vpDocument": vp }))
        }
    }
}

// Implement Clone for ApiServer to use with Axum's State
impl<R> Clone for ApiServer<R> {
    fn clone(&self) -> Self {
        ApiServer {
            service_name: self.service_name.clone(),
            resolver: Arc::clone(&self.resolver),
            credential_issuer: Arc::clone(&self.credential_issuer),
            verifier: self.verifier.clone(),
            presentations: self.presentations.clone(),
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &[u8]) -> Option<T> {
    serde_json::from_slice(body).ok()
}

fn malformed() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Malformed request" }))).into_response()
}

fn error_body(error: &Error) -> Value {
    match error {
        Error::InvalidDid(did) => json!({ "error": "Invalid DID", "did": did, "kind": error.kind() }),
        Error::NotFound(did) => json!({ "error": "DID not found", "did": did, "kind": error.kind() }),
        _ => json!({ "error": error.to_string(), "kind": error.kind() }),
    }
}

fn error_response(error: &Error) -> Response {
    let status = match error.kind() {
        ErrorKind::ResolverError => {
            warn!("registry failure: {error}");
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(error_body(error))).into_response()
}

fn verification_response<T>(outcome: Verification<T>, valid: impl FnOnce(T) -> Value) -> Response {
    let body = match outcome {
        Verification::Valid(document) => valid(document),
        Verification::Invalid(error) => {
            let mut body = error_body(&error);
            body["isValid"] = Value::Bool(false);
            body
        }
    };
    (StatusCode::OK, Json(body)).into_response()
}
