//! reqwest-backed gateway speaking the guest-portal REST API

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::PortalGateway;
use async_trait::async_trait;
use parking_lot::RwLock;
use portal_model::{
    ActivityId, ActivityRegistrationStatus, AggregateRecord, DressCodeId, DressPreference,
    DressPreferencePayload, FoodPreference, FoodPreferencePayload, Guest, GuestToken, HotelInfo,
    HotelPayload, RsvpPayload, TravelInfo, TravelPayload,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Correlation header attached to every request
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Backend endpoints used by the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Aggregate,
    Rsvp,
    Travel,
    Hotel,
    DressPreference,
    FoodPreference,
    RegisterActivity(ActivityId),
    UnregisterActivity(ActivityId),
}

impl Route {
    /// HTTP method
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Route::Aggregate => Method::GET,
            Route::Rsvp
            | Route::Travel
            | Route::Hotel
            | Route::DressPreference
            | Route::FoodPreference => Method::PUT,
            Route::RegisterActivity(_) | Route::UnregisterActivity(_) => Method::POST,
        }
    }

    /// Path below the origin
    #[must_use]
    pub fn path(&self, token: &GuestToken) -> String {
        let base = format!("/api/guest/{}", token.as_str());
        match self {
            Route::Aggregate => base,
            Route::Rsvp => format!("{base}/rsvp"),
            Route::Travel => format!("{base}/travel"),
            Route::Hotel => format!("{base}/hotel"),
            Route::DressPreference => format!("{base}/dress-preference"),
            Route::FoodPreference => format!("{base}/food-preference"),
            Route::RegisterActivity(id) => format!("{base}/activities/{id}/register"),
            Route::UnregisterActivity(id) => format!("{base}/activities/{id}/unregister"),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Route::Aggregate => "aggregate",
            Route::Rsvp => "rsvp",
            Route::Travel => "travel",
            Route::Hotel => "hotel",
            Route::DressPreference => "dress-preference",
            Route::FoodPreference => "food-preference",
            Route::RegisterActivity(_) => "activity-register",
            Route::UnregisterActivity(_) => "activity-unregister",
        }
    }
}

#[derive(Serialize)]
struct DressPreferenceRequest<'a> {
    dress_code_id: DressCodeId,
    #[serde(flatten)]
    preference: &'a DressPreferencePayload,
}

/// HTTP implementation of [`PortalGateway`]
#[derive(Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    credential: RwLock<Option<String>>,
}

impl HttpGateway {
    /// Build a gateway from configuration
    ///
    /// # Errors
    /// Returns a `Network` error if a configured header is malformed or the
    /// TLS backend cannot be initialised.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| GatewayError::network(format!("invalid header name {name}: {err}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|err| GatewayError::network(format!("invalid value for {name}: {err}")))?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|err| GatewayError::network(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.resolved_base_url(),
            credential: RwLock::new(config.credential.clone()),
        })
    }

    /// Absolute URL for a route
    #[must_use]
    pub fn url(&self, route: Route, token: &GuestToken) -> String {
        format!("{}{}", self.base_url, route.path(token))
    }

    /// Whether a bearer credential is currently held
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential.read().is_some()
    }

    /// Drop the held credential (done automatically on 401)
    pub fn clear_credential(&self) {
        self.credential.write().take();
    }

    async fn execute<B>(&self, route: Route, token: &GuestToken, body: Option<&B>) -> GatewayResult<String>
    where
        B: Serialize + ?Sized + Sync,
    {
        let request_id = Uuid::new_v4();
        let mut request = self
            .client
            .request(route.method(), self.url(route, token))
            .header(REQUEST_ID_HEADER, request_id.to_string());

        let credential = self.credential.read().clone();
        if let Some(credential) = credential {
            request = request.bearer_auth(credential);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(route = route.name(), %request_id, "sending gateway request");
        let response = request.send().await.map_err(|err| transport_error(&err))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|err| transport_error(&err))?;

        if (200..300).contains(&status) {
            return Ok(text);
        }

        let error = GatewayError::from_response(status, &text);
        if status == 401 {
            self.clear_credential();
            warn!(route = route.name(), %request_id, "credential rejected, cleared");
        }
        warn!(
            route = route.name(),
            %request_id,
            status,
            kind = %error.kind,
            "gateway request failed"
        );
        Err(error)
    }

    async fn call<T, B>(&self, route: Route, token: &GuestToken, body: Option<&B>) -> GatewayResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let text = self.execute(route, token, body).await?;
        decode(&text)
    }

    async fn registration(
        &self,
        route: Route,
        token: &GuestToken,
        activity_id: ActivityId,
        registered: bool,
    ) -> GatewayResult<ActivityRegistrationStatus> {
        let text = self.execute::<()>(route, token, None).await?;
        // A 2xx already confirms the write; some backends answer with an empty or message-only body.
        match serde_json::from_str::<ActivityRegistrationStatus>(&text) {
            Ok(status) => Ok(status),
            Err(_) => Ok(ActivityRegistrationStatus {
                activity_id,
                is_registered: registered,
            }),
        }
    }
}

#[async_trait]
impl PortalGateway for HttpGateway {
    #[instrument(skip_all, fields(token = %token))]
    async fn fetch_aggregate(&self, token: &GuestToken) -> GatewayResult<AggregateRecord> {
        self.call::<_, ()>(Route::Aggregate, token, None).await
    }

    #[instrument(skip_all, fields(token = %token))]
    async fn write_rsvp(&self, token: &GuestToken, payload: &RsvpPayload) -> GatewayResult<Guest> {
        self.call(Route::Rsvp, token, Some(payload)).await
    }

    #[instrument(skip_all, fields(token = %token))]
    async fn write_travel(
        &self,
        token: &GuestToken,
        payload: &TravelPayload,
    ) -> GatewayResult<TravelInfo> {
        self.call(Route::Travel, token, Some(payload)).await
    }

    #[instrument(skip_all, fields(token = %token))]
    async fn write_hotel(
        &self,
        token: &GuestToken,
        payload: &HotelPayload,
    ) -> GatewayResult<HotelInfo> {
        self.call(Route::Hotel, token, Some(payload)).await
    }

    #[instrument(skip_all, fields(token = %token, dress_code_id = %dress_code_id))]
    async fn write_dress_preference(
        &self,
        token: &GuestToken,
        dress_code_id: DressCodeId,
        payload: &DressPreferencePayload,
    ) -> GatewayResult<DressPreference> {
        let body = DressPreferenceRequest {
            dress_code_id,
            preference: payload,
        };
        self.call(Route::DressPreference, token, Some(&body)).await
    }

    #[instrument(skip_all, fields(token = %token))]
    async fn write_food_preference(
        &self,
        token: &GuestToken,
        payload: &FoodPreferencePayload,
    ) -> GatewayResult<FoodPreference> {
        self.call(Route::FoodPreference, token, Some(payload)).await
    }

    #[instrument(skip_all, fields(token = %token, activity_id = %activity_id))]
    async fn register_activity(
        &self,
        token: &GuestToken,
        activity_id: ActivityId,
    ) -> GatewayResult<ActivityRegistrationStatus> {
        self.registration(Route::RegisterActivity(activity_id), token, activity_id, true)
            .await
    }

    #[instrument(skip_all, fields(token = %token, activity_id = %activity_id))]
    async fn unregister_activity(
        &self,
        token: &GuestToken,
        activity_id: ActivityId,
    ) -> GatewayResult<ActivityRegistrationStatus> {
        self.registration(Route::UnregisterActivity(activity_id), token, activity_id, false)
            .await
    }
}

fn transport_error(err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(err.to_string())
    } else {
        GatewayError::network(err.to_string())
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> GatewayResult<T> {
    serde_json::from_str(text)
        .map_err(|err| GatewayError::server(format!("undecodable response body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn token() -> GuestToken {
        GuestToken::new("tok123")
    }

    #[test]
    fn routes_match_backend_contract() {
        let token = token();
        assert_eq!(Route::Aggregate.path(&token), "/api/guest/tok123");
        assert_eq!(Route::Rsvp.path(&token), "/api/guest/tok123/rsvp");
        assert_eq!(
            Route::DressPreference.path(&token),
            "/api/guest/tok123/dress-preference"
        );
        assert_eq!(
            Route::UnregisterActivity(ActivityId(9)).path(&token),
            "/api/guest/tok123/activities/9/unregister"
        );
        assert_eq!(Route::Aggregate.method(), Method::GET);
        assert_eq!(Route::FoodPreference.method(), Method::PUT);
        assert_eq!(Route::RegisterActivity(ActivityId(1)).method(), Method::POST);
    }

    #[test]
    fn url_joins_normalized_origin() {
        let config = GatewayConfig::new().with_base_url("https://rsvp.example.com/");
        let gateway = HttpGateway::new(&config).unwrap();
        assert_eq!(
            gateway.url(Route::Hotel, &token()),
            "https://rsvp.example.com/api/guest/tok123/hotel"
        );
    }

    #[test]
    fn malformed_header_is_rejected() {
        let config = GatewayConfig::new().with_header("bad header", "x");
        let err = HttpGateway::new(&config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[test]
    fn credential_can_be_cleared() {
        let config = GatewayConfig::new().with_credential("bearer-token");
        let gateway = HttpGateway::new(&config).unwrap();
        assert!(gateway.has_credential());
        gateway.clear_credential();
        assert!(!gateway.has_credential());
    }

    #[test]
    fn dress_request_flattens_payload() {
        let payload = DressPreferencePayload {
            planned_outfit: Some("Green silk dress".to_string()),
            ..DressPreferencePayload::default()
        };
        let body = DressPreferenceRequest {
            dress_code_id: DressCodeId(3),
            preference: &payload,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["dress_code_id"], 3);
        assert_eq!(value["planned_outfit"], "Green silk dress");
        assert_eq!(value["needs_shopping_assistance"], false);
    }

    #[test]
    fn undecodable_success_body_is_server_error() {
        let err = decode::<Guest>("<html>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let config = GatewayConfig::new()
            .with_base_url("http://127.0.0.1:9")
            .with_timeout_secs(2);
        let gateway = HttpGateway::new(&config).unwrap();
        let err = gateway.fetch_aggregate(&token()).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Network | ErrorKind::Timeout));
        assert!(err.is_retryable());
    }

    struct Canned {
        status: u16,
        reason: &'static str,
        body: &'static str,
    }

    fn head_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|window| window == b"\r\n\r\n")
    }

    fn content_length(head: &str) -> usize {
        head.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }

    async fn read_request(stream: &mut TcpStream) -> io::Result<String> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).await?;
            if read == 0 {
                return Ok(String::from_utf8_lossy(&buf).into_owned());
            }
            buf.extend_from_slice(&chunk[..read]);
            if let Some(end) = head_end(&buf) {
                let head = String::from_utf8_lossy(&buf[..end]).into_owned();
                let total = end + 4 + content_length(&head);
                while buf.len() < total {
                    let read = stream.read(&mut chunk).await?;
                    if read == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..read]);
                }
                return Ok(head);
            }
        }
    }

    /// One-connection-per-reply HTTP server; yields the request heads it saw
    async fn spawn_stub(
        replies: Vec<Canned>,
    ) -> io::Result<(String, JoinHandle<io::Result<Vec<String>>>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let handle = tokio::spawn(async move {
            let mut heads = Vec::with_capacity(replies.len());
            for reply in replies {
                let (mut stream, _) = listener.accept().await?;
                heads.push(read_request(&mut stream).await?);
                let response = format!(
                    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    reply.status,
                    reply.reason,
                    reply.body.len(),
                    reply.body
                );
                stream.write_all(response.as_bytes()).await?;
                stream.shutdown().await?;
            }
            Ok(heads)
        });
        Ok((base_url, handle))
    }

    fn stub_gateway(base_url: &str) -> HttpGateway {
        let config = GatewayConfig::new()
            .with_base_url(base_url)
            .with_credential("bearer-token")
            .with_timeout_secs(5);
        HttpGateway::new(&config).unwrap()
    }

    #[tokio::test]
    async fn rejected_credential_is_cleared_before_next_request() {
        let stub = spawn_stub(vec![
            Canned {
                status: 401,
                reason: "Unauthorized",
                body: r#"{"detail":"Token revoked","error_code":"AUTH_REVOKED"}"#,
            },
            Canned {
                status: 200,
                reason: "OK",
                body: "",
            },
        ])
        .await;
        let (base_url, server) = match stub {
            Ok(stub) => stub,
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                eprintln!("skipping http gateway test: port binding not permitted ({err})");
                return;
            }
            Err(err) => panic!("stub server failed to bind: {err}"),
        };
        let gateway = stub_gateway(&base_url);

        let err = gateway.fetch_aggregate(&token()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Auth);
        assert_eq!(err.status_code, Some(401));
        assert_eq!(err.error_code, "AUTH_REVOKED");
        assert_eq!(err.detail, "Token revoked");
        assert!(err.is_terminal());
        assert!(!gateway.has_credential());

        let status = gateway
            .register_activity(&token(), ActivityId(4))
            .await
            .unwrap();
        assert_eq!(
            status,
            ActivityRegistrationStatus {
                activity_id: ActivityId(4),
                is_registered: true,
            }
        );

        let heads = server.await.unwrap().unwrap();
        assert_eq!(heads.len(), 2);
        let first = heads[0].to_ascii_lowercase();
        let second = heads[1].to_ascii_lowercase();
        assert!(first.starts_with("get /api/guest/tok123 "));
        assert!(first.contains("authorization: bearer bearer-token"));
        assert!(first.contains("x-request-id:"));
        assert!(second.starts_with("post /api/guest/tok123/activities/4/register "));
        assert!(!second.contains("authorization:"));
    }

    #[tokio::test]
    async fn error_bodies_are_classified_and_message_bodies_synthesize_status() {
        let stub = spawn_stub(vec![
            Canned {
                status: 422,
                reason: "Unprocessable Entity",
                body: r#"{"detail":[{"loc":["body","number_of_attendees"],"msg":"must be at least 1"}]}"#,
            },
            Canned {
                status: 200,
                reason: "OK",
                body: r#"{"message":"Unregistered"}"#,
            },
        ])
        .await;
        let (base_url, server) = match stub {
            Ok(stub) => stub,
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                eprintln!("skipping http gateway test: port binding not permitted ({err})");
                return;
            }
            Err(err) => panic!("stub server failed to bind: {err}"),
        };
        let gateway = stub_gateway(&base_url);

        let payload = RsvpPayload {
            rsvp_status: portal_model::RsvpStatus::Confirmed,
            number_of_attendees: 0,
            special_requests: None,
        };
        let err = gateway.write_rsvp(&token(), &payload).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.status_code, Some(422));
        assert_eq!(
            err.errors.get("number_of_attendees").map(String::as_str),
            Some("must be at least 1")
        );
        assert!(gateway.has_credential());

        let status = gateway
            .unregister_activity(&token(), ActivityId(9))
            .await
            .unwrap();
        assert_eq!(status.activity_id, ActivityId(9));
        assert!(!status.is_registered);

        let heads = server.await.unwrap().unwrap();
        assert!(heads[0].to_ascii_lowercase().starts_with("put /api/guest/tok123/rsvp "));
    }
}
