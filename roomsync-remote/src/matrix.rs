//! Matrix client-server API (v3) over blocking HTTP.
//!
//! Every [`RoomApi`] call is one authenticated round trip. Path parameters
//! (aliases, room ids) are percent-encoded segment by segment, so `#` and
//! `!` never leak into the URL structure.

use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use roomsync_core::{
    AliasLookup, ApiError, HomeserverConfig, MemberEvent, Membership, PowerLevels, RoomAlias,
    RoomApi, RoomId, UserId, Visibility,
};

const API_PREFIX: [&str; 3] = ["_matrix", "client", "v3"];
const NAME_EVENT: &str = "m.room.name";
const POWER_LEVELS_EVENT: &str = "m.room.power_levels";

/// Authenticated client for one homeserver.
pub struct MatrixClient {
    agent: ureq::Agent,
    base: Url,
    access_token: String,
}

impl MatrixClient {
    pub fn new(config: &HomeserverConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.url)
            .map_err(|e| ApiError::Transport(format!("invalid homeserver url {}: {e}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Transport(format!(
                "invalid homeserver url {}: not a base url",
                config.url
            )));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Ok(Self {
            agent,
            base,
            access_token: config.access_token.clone(),
        })
    }

    /// `<base>/_matrix/client/v3/<segments>`.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        self.agent
            .request_url(method, url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        tracing::trace!(%url, "GET");
        let response = self.request("GET", &url).call().map_err(api_error)?;
        decode(response)
    }

    fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        tracing::trace!(%url, method, "sending");
        let response = self
            .request(method, &url)
            .send_json(body)
            .map_err(api_error)?;
        decode(response)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RoomIdBody {
    room_id: RoomId,
}

#[derive(Deserialize)]
struct NameContent {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct MembersResponse {
    #[serde(default)]
    chunk: Vec<RawMemberEvent>,
}

#[derive(Deserialize)]
struct RawMemberEvent {
    #[serde(rename = "type")]
    event_type: String,
    state_key: String,
    content: MemberContent,
}

#[derive(Deserialize)]
struct MemberContent {
    membership: Membership,
}

impl From<RawMemberEvent> for MemberEvent {
    fn from(raw: RawMemberEvent) -> Self {
        MemberEvent {
            event_type: raw.event_type,
            state_key: raw.state_key,
            membership: raw.content.membership,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct VisibilityBody {
    visibility: Visibility,
}

/// Standard error body, `{"errcode": "...", "error": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    errcode: String,
    #[serde(default)]
    error: String,
}

// ---------------------------------------------------------------------------
// RoomApi
// ---------------------------------------------------------------------------

impl RoomApi for MatrixClient {
    fn resolve_alias(&mut self, alias: &RoomAlias) -> Result<AliasLookup, ApiError> {
        match self.get::<RoomIdBody>(&["directory", "room", &alias.0]) {
            Ok(body) => Ok(AliasLookup::Found(body.room_id)),
            Err(e) if e.is_not_found() => Ok(AliasLookup::NotFound),
            Err(e) => Err(e),
        }
    }

    fn create_room(&mut self, alias_localpart: &str) -> Result<RoomId, ApiError> {
        let body: RoomIdBody = self.send(
            "POST",
            &["createRoom"],
            &json!({ "room_alias_name": alias_localpart }),
        )?;
        Ok(body.room_id)
    }

    fn room_name(&mut self, room: &RoomId) -> Result<Option<String>, ApiError> {
        match self.get::<NameContent>(&["rooms", &room.0, "state", NAME_EVENT]) {
            Ok(content) => Ok(Some(content.name)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_room_name(&mut self, room: &RoomId, name: &str) -> Result<(), ApiError> {
        self.send::<_, IgnoredAny>(
            "PUT",
            &["rooms", &room.0, "state", NAME_EVENT],
            &json!({ "name": name }),
        )?;
        Ok(())
    }

    fn members(&mut self, room: &RoomId) -> Result<Vec<MemberEvent>, ApiError> {
        let response: MembersResponse = self.get(&["rooms", &room.0, "members"])?;
        Ok(response.chunk.into_iter().map(MemberEvent::from).collect())
    }

    fn invite(&mut self, room: &RoomId, user: &UserId) -> Result<(), ApiError> {
        self.send::<_, IgnoredAny>(
            "POST",
            &["rooms", &room.0, "invite"],
            &json!({ "user_id": user }),
        )?;
        Ok(())
    }

    fn power_levels(&mut self, room: &RoomId) -> Result<PowerLevels, ApiError> {
        self.get(&["rooms", &room.0, "state", POWER_LEVELS_EVENT])
    }

    fn set_power_levels(&mut self, room: &RoomId, levels: &PowerLevels) -> Result<(), ApiError> {
        self.send::<_, IgnoredAny>("PUT", &["rooms", &room.0, "state", POWER_LEVELS_EVENT], levels)?;
        Ok(())
    }

    fn visibility(&mut self, room: &RoomId) -> Result<Visibility, ApiError> {
        let body: VisibilityBody = self.get(&["directory", "list", "room", &room.0])?;
        Ok(body.visibility)
    }

    fn set_visibility(&mut self, room: &RoomId, visibility: Visibility) -> Result<(), ApiError> {
        self.send::<_, IgnoredAny>(
            "PUT",
            &["directory", "list", "room", &room.0],
            &VisibilityBody { visibility },
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ApiError> {
    response
        .into_json()
        .map_err(|e| ApiError::Decode(e.to_string()))
}

fn api_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            status_error(status, &body)
        }
        ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
    }
}

/// Non-JSON error bodies (proxies, gateways) keep their text as the message.
fn status_error(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(body) => ApiError::Status {
            status,
            errcode: body.errcode,
            message: body.error,
        },
        Err(_) => ApiError::Status {
            status,
            errcode: "M_UNKNOWN".to_owned(),
            message: body.trim().to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn client(url: &str) -> MatrixClient {
        MatrixClient::new(&HomeserverConfig {
            url: url.into(),
            access_token: "token".into(),
            timeout_secs: 5,
        })
        .expect("client")
    }

    #[rstest]
    #[case("https://matrix.example.org")]
    #[case("https://matrix.example.org/")]
    fn endpoint_appends_api_prefix(#[case] base: &str) {
        let url = client(base).endpoint(&["createRoom"]);
        assert_eq!(url.as_str(), "https://matrix.example.org/_matrix/client/v3/createRoom");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let url = client("https://example.org/matrix/").endpoint(&["createRoom"]);
        assert_eq!(url.path(), "/matrix/_matrix/client/v3/createRoom");
    }

    #[test]
    fn alias_is_encoded_as_one_segment() {
        let url = client("https://example.org").endpoint(&["directory", "room", "#ops-eu:example.org"]);
        assert_eq!(url.path(), "/_matrix/client/v3/directory/room/%23ops-eu:example.org");
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn slash_in_segment_is_escaped() {
        let url = client("https://example.org").endpoint(&["rooms", "!a/b:example.org", "members"]);
        assert_eq!(url.path(), "/_matrix/client/v3/rooms/!a%2Fb:example.org/members");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = MatrixClient::new(&HomeserverConfig {
            url: "not a url".into(),
            access_token: String::new(),
            timeout_secs: 5,
        })
        .err()
        .expect("must fail");
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn matrix_error_body_is_decoded() {
        let err = status_error(404, r#"{"errcode":"M_NOT_FOUND","error":"Room alias not found"}"#);
        assert!(err.is_not_found());
        match err {
            ApiError::Status { errcode, message, .. } => {
                assert_eq!(errcode, "M_NOT_FOUND");
                assert_eq!(message, "Room alias not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn plain_text_error_body_is_kept() {
        let err = status_error(502, "Bad Gateway\n");
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "homeserver returned 502 M_UNKNOWN: Bad Gateway");
    }

    #[test]
    fn members_response_is_decoded() {
        let response: MembersResponse = serde_json::from_value(json!({
            "chunk": [
                {
                    "type": "m.room.member",
                    "state_key": "@a:example.org",
                    "sender": "@a:example.org",
                    "content": {"membership": "join", "displayname": "A"}
                },
                {
                    "type": "m.room.member",
                    "state_key": "@b:example.org",
                    "content": {"membership": "invite"}
                }
            ]
        }))
        .expect("decode");
        let events: Vec<MemberEvent> = response.chunk.into_iter().map(MemberEvent::from).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].state_key, "@a:example.org");
        assert_eq!(events[0].membership, Membership::Join);
        assert_eq!(events[1].membership, Membership::Invite);
    }

    #[test]
    fn visibility_body_round_trips_lowercase() {
        let body = serde_json::to_value(VisibilityBody { visibility: Visibility::Public }).unwrap();
        assert_eq!(body, json!({"visibility": "public"}));
    }
}
