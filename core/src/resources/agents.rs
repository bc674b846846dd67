use uuid::Uuid;

use super::{check_page_size, DEFAULT_PAGE_SIZE};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::pagination::PageShape;
use crate::params::{AgentStatus, Sort, StateOrProvince};
use crate::request::RequestBuilder;
use crate::types::Agent;

pub const AGENTS_MAX_PAGE_SIZE: u32 = 200;

/// Filters for `AgentsApi::search_agents`. List filters are sent as
/// repeated query keys.
#[derive(Debug, Clone)]
pub struct AgentSearch {
    pub name: Option<String>,
    pub states_or_provinces: Vec<StateOrProvince>,
    pub statuses: Vec<AgentStatus>,
    pub sort: Option<Sort>,
    pub page_size: u32,
}

impl Default for AgentSearch {
    fn default() -> Self {
        Self {
            name: None,
            states_or_provinces: Vec::new(),
            statuses: Vec::new(),
            sort: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AgentsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AgentsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub fn get_agent(&self, agent_id: Uuid) -> Result<Agent, ApiError> {
        self.client
            .execute_json(&RequestBuilder::get("/api/v1/agents/{agentId}").path_arg(agent_id))
    }

    pub fn search_agents(
        &self,
        search: &AgentSearch,
    ) -> Result<impl Iterator<Item = Result<Agent, ApiError>> + 'a, ApiError> {
        check_page_size("agents", search.page_size, AGENTS_MAX_PAGE_SIZE)?;
        let request = RequestBuilder::get("/api/v1/agents/search")
            .query("name", &search.name)
            .query("stateOrProvince", &search.states_or_provinces)
            .query("status", &search.statuses)
            .sort(search.sort.as_ref());
        self.client
            .paginate(request, search.page_size, PageShape::default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::testing::{client, json, ScriptedTransport};
    use crate::types::Token;

    #[test]
    fn state_filters_are_repeated_keys() {
        let transport = ScriptedTransport::new(vec![json(200, "{\"results\": []}")]);
        let (client, _) = client(&transport, 1);
        let search = AgentSearch {
            states_or_provinces: vec![StateOrProvince::California, StateOrProvince::Texas],
            statuses: vec![AgentStatus::Active],
            ..AgentSearch::default()
        };
        let agents: Vec<Agent> = client
            .agents()
            .search_agents(&search)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(agents.is_empty());

        let req = &transport.requests()[0];
        assert_eq!(
            req.query_pairs(),
            vec![
                ("stateOrProvince", "CALIFORNIA"),
                ("stateOrProvince", "TEXAS"),
                ("status", "ACTIVE"),
                ("pageNumber", "0"),
                ("pageSize", "20"),
            ]
        );
        let url = req.url("http://api.test").unwrap();
        assert!(!url.as_str().contains("CALIFORNIA%2CTEXAS"));
        assert!(!url.as_str().contains("CALIFORNIA,TEXAS"));
    }

    #[test]
    fn get_agent_not_found() {
        let transport =
            ScriptedTransport::new(vec![json(404, "{\"message\":\"agent not found\"}")]);
        let (client, _) = client(&transport, 3);
        let err = client.agents().get_agent(Uuid::nil()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound { status: Some(404), .. }));
        assert_eq!(err.message(), "agent not found");
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn decodes_agent_fields() {
        let body = json!({
            "id": Uuid::from_u128(42),
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "status": "ACTIVE",
            "stateOrProvince": "NEW_YORK",
            "someFutureField": true
        });
        let transport = ScriptedTransport::new(vec![json(200, &body.to_string())]);
        let (client, _) = client(&transport, 1);
        let agent = client.agents().get_agent(Uuid::from_u128(42)).unwrap();
        assert_eq!(agent.first_name, "Ada");
        assert_eq!(agent.state_or_province, Token::Known(StateOrProvince::NewYork));
    }
}
