//! LiveKit room service client.
//!
//! Talks to the Twirp endpoint `livekit.RoomService/ListParticipants` with a
//! short-lived HS256 access token carrying a `roomAdmin` grant for the room
//! being queried.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use halqa_core::config::LiveKitConfig;
use halqa_core::error::ErrorKind;
use halqa_core::result::AppResult;
use halqa_core::traits::LiveRoomProvider;
use halqa_core::AppError;

const LIST_PARTICIPANTS_PATH: &str = "/twirp/livekit.RoomService/ListParticipants";

/// Video grant embedded in the access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    /// Permission to list and manage participants.
    pub room_admin: bool,
    /// Room the grant is limited to.
    pub room: String,
}

/// LiveKit access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// API key the token is signed for.
    pub iss: String,
    /// Identity of the caller.
    pub sub: String,
    /// Not valid before, in Unix seconds.
    pub nbf: i64,
    /// Expiry, in Unix seconds.
    pub exp: i64,
    /// Room permissions.
    pub video: VideoGrant,
}

#[derive(Debug, Serialize)]
struct ListParticipantsRequest<'a> {
    room: &'a str,
}

/// Body of a `ListParticipants` response.
#[derive(Debug, Default, Deserialize)]
pub struct ListParticipantsResponse {
    /// Participants currently known to the room.
    #[serde(default)]
    pub participants: Vec<ParticipantInfo>,
}

/// The subset of LiveKit's participant info the reconciler needs.
#[derive(Debug, Deserialize)]
pub struct ParticipantInfo {
    /// Connection id, matched against the join event's participant sid.
    #[serde(default)]
    pub sid: String,
    /// Application identity the participant joined with.
    #[serde(default)]
    pub identity: String,
    /// Either the enum name (`"ACTIVE"`) or its number, depending on the
    /// server's JSON encoding.
    #[serde(default)]
    pub state: serde_json::Value,
}

impl ParticipantInfo {
    /// Whether the participant has not disconnected.
    pub fn is_connected(&self) -> bool {
        match &self.state {
            serde_json::Value::String(s) => s != "DISCONNECTED",
            serde_json::Value::Number(n) => n.as_u64() != Some(3),
            _ => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TwirpError {
    code: String,
    #[serde(default)]
    msg: String,
}

/// [`LiveRoomProvider`] backed by a LiveKit server.
#[derive(Debug, Clone)]
pub struct LiveKitRoomClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    token_ttl_seconds: i64,
}

impl LiveKitRoomClient {
    /// Build a client from configuration.
    pub fn new(config: &LiveKitConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build LiveKit HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            token_ttl_seconds: config.token_ttl_seconds,
        })
    }

    /// Sign an admin token for `room`.
    pub fn admin_token(&self, room: &str, now: DateTime<Utc>) -> AppResult<String> {
        let claims = AccessClaims {
            iss: self.api_key.clone(),
            sub: self.api_key.clone(),
            nbf: now.timestamp(),
            exp: now.timestamp() + self.token_ttl_seconds,
            video: VideoGrant {
                room_admin: true,
                room: room.to_string(),
            },
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Failed to sign LiveKit token", e))
    }

    /// List the participants of `room`. Returns `None` when the room does not exist.
    pub async fn list_participants(&self, room: &str) -> AppResult<Option<Vec<ParticipantInfo>>> {
        let token = self.admin_token(room, Utc::now())?;
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, LIST_PARTICIPANTS_PATH))
            .bearer_auth(token)
            .json(&ListParticipantsRequest { room })
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "LiveKit request failed", e)
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "Failed to read LiveKit response", e)
        })?;

        parse_list_participants(status, &body)
    }
}

/// Interpret a `ListParticipants` HTTP response.
fn parse_list_participants(status: StatusCode, body: &str) -> AppResult<Option<Vec<ParticipantInfo>>> {
    if status.is_success() {
        let parsed: ListParticipantsResponse = serde_json::from_str(body)?;
        return Ok(Some(parsed.participants));
    }

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    match serde_json::from_str::<TwirpError>(body) {
        Ok(err) if err.code == "not_found" => Ok(None),
        Ok(err) => Err(AppError::external_service(format!(
            "LiveKit returned {status}: {} {}",
            err.code, err.msg
        ))),
        Err(_) => Err(AppError::external_service(format!("LiveKit returned {status}"))),
    }
}

#[async_trait]
impl LiveRoomProvider for LiveKitRoomClient {
    async fn is_participant_active(&self, room_name: &str, participant_sid: &str) -> AppResult<bool> {
        let Some(participants) = self.list_participants(room_name).await? else {
            debug!(room = %room_name, "LiveKit room no longer exists");
            return Ok(false);
        };

        Ok(participants
            .iter()
            .any(|p| p.sid == participant_sid && p.is_connected()))
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

    use super::*;

    fn client() -> LiveKitRoomClient {
        LiveKitRoomClient::new(&LiveKitConfig {
            url: "http://livekit.local:7880/".to_string(),
            api_key: "APIkey".to_string(),
            api_secret: "secret-that-is-long-enough".to_string(),
            ..LiveKitConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_admin_token_claims() {
        let client = client();
        let now = Utc::now();
        let token = client.admin_token("room-1", now).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&["APIkey"]);
        let data = decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(b"secret-that-is-long-enough"),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.exp - data.claims.nbf, 600);
        assert_eq!(
            data.claims.video,
            VideoGrant {
                room_admin: true,
                room: "room-1".to_string()
            }
        );
        assert_eq!(client.base_url, "http://livekit.local:7880");
    }

    #[test]
    fn test_parse_participants() {
        let body = r#"{"participants":[
            {"sid":"PA_1","identity":"u1","state":"ACTIVE"},
            {"sid":"PA_2","identity":"u2","state":"DISCONNECTED"},
            {"sid":"PA_3","identity":"u3","state":1}
        ]}"#;

        let participants = parse_list_participants(StatusCode::OK, body).unwrap().unwrap();

        let connected: Vec<_> = participants
            .iter()
            .filter(|p| p.is_connected())
            .map(|p| p.sid.as_str())
            .collect();
        assert_eq!(connected, vec!["PA_1", "PA_3"]);
    }

    #[test]
    fn test_empty_room_has_no_participants() {
        let participants = parse_list_participants(StatusCode::OK, "{}").unwrap().unwrap();
        assert!(participants.is_empty());
    }

    #[test]
    fn test_missing_room_is_none() {
        assert!(parse_list_participants(StatusCode::NOT_FOUND, "").unwrap().is_none());
        let twirp = r#"{"code":"not_found","msg":"requested room does not exist"}"#;
        assert!(
            parse_list_participants(StatusCode::BAD_REQUEST, twirp)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_server_error_is_external_service_error() {
        let twirp = r#"{"code":"internal","msg":"boom"}"#;
        let err = parse_list_participants(StatusCode::INTERNAL_SERVER_ERROR, twirp).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);

        let err = parse_list_participants(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}
