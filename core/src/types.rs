//! Domain DTOs for the team, agent and transaction endpoints.
//!
//! Only the fields the resource clients need are modelled; unknown fields in
//! responses are ignored. Token-valued response fields are wrapped in
//! `Token` so a value added on the server side decodes as `Unrecognized`
//! instead of failing the whole record. Request parameters keep using the
//! closed enums directly.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::params::{AgentStatus, LifecycleState, StateOrProvince, TeamStatus, TeamType};

/// A token read from a response: either one of the known values of `T` or
/// the raw string the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token<T> {
    Known(T),
    Unrecognized(String),
}

impl<T> Token<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Token::Known(value) => Some(value),
            Token::Unrecognized(_) => None,
        }
    }
}

impl<T> From<T> for Token<T> {
    fn from(value: T) -> Self {
        Token::Known(value)
    }
}

impl<T: fmt::Display> fmt::Display for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Known(value) => value.fmt(f),
            Token::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub status: Token<TeamStatus>,
    pub team_type: Token<TeamType>,
    #[serde(default)]
    pub leader_id: Option<Uuid>,
}

/// Partial update for a team. Only the fields present are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TeamStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: Token<AgentStatus>,
    pub state_or_province: Token<StateOrProvince>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub code: String,
    pub address: String,
    pub lifecycle_state: Token<LifecycleState>,
    #[serde(default)]
    pub closing_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pagination::{Page, PageShape};

    fn team(team_type: &str) -> serde_json::Value {
        json!({
            "id": Uuid::from_u128(1),
            "name": "North Star",
            "status": "ACTIVE",
            "teamType": team_type
        })
    }

    #[test]
    fn known_tokens_decode_to_enums() {
        let team: Team = serde_json::from_value(team("PLATINUM")).unwrap();
        assert_eq!(team.status, Token::Known(TeamStatus::Active));
        assert_eq!(team.team_type.known(), Some(&TeamType::Platinum));
    }

    #[test]
    fn new_server_token_is_kept_raw() {
        let team: Team = serde_json::from_value(team("ENTERPRISE")).unwrap();
        assert_eq!(team.team_type, Token::Unrecognized("ENTERPRISE".to_string()));
        assert_eq!(team.team_type.known(), None);
        assert_eq!(team.team_type.to_string(), "ENTERPRISE");
    }

    #[test]
    fn page_with_new_token_still_decodes() {
        let body = json!({"totalCount": 2, "results": [team("NORMAL"), team("ENTERPRISE")]});
        let page: Page<Team> = PageShape::default().decode(200, body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].team_type, Token::Known(TeamType::Normal));
    }

    #[test]
    fn tokens_serialize_as_plain_strings() {
        let team: Team = serde_json::from_value(team("ENTERPRISE")).unwrap();
        let value = serde_json::to_value(&team).unwrap();
        assert_eq!(value["status"], "ACTIVE");
        assert_eq!(value["teamType"], "ENTERPRISE");
    }
}
