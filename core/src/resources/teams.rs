use uuid::Uuid;

use super::{check_page_size, DEFAULT_PAGE_SIZE};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::pagination::PageShape;
use crate::params::{Sort, TeamStatus, TeamType};
use crate::request::RequestBuilder;
use crate::types::{Team, TeamUpdate};

pub const TEAMS_MAX_PAGE_SIZE: u32 = 100;

/// Filters for `TeamsApi::search_teams`.
#[derive(Debug, Clone)]
pub struct TeamSearch {
    pub name: Option<String>,
    pub status: Option<TeamStatus>,
    pub team_types: Vec<TeamType>,
    pub sort: Option<Sort>,
    pub page_size: u32,
}

impl Default for TeamSearch {
    fn default() -> Self {
        Self {
            name: None,
            status: None,
            team_types: Vec::new(),
            sort: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TeamsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> TeamsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub fn get_team(&self, team_id: Uuid) -> Result<Team, ApiError> {
        self.client
            .execute_json(&RequestBuilder::get("/api/v1/teams/{teamId}").path_arg(team_id))
    }

    pub fn update_team(&self, team_id: Uuid, update: &TeamUpdate) -> Result<Team, ApiError> {
        self.client.execute_json(
            &RequestBuilder::patch("/api/v1/teams/{teamId}")
                .path_arg(team_id)
                .json(update),
        )
    }

    pub fn search_teams(
        &self,
        search: &TeamSearch,
    ) -> Result<impl Iterator<Item = Result<Team, ApiError>> + 'a, ApiError> {
        check_page_size("teams", search.page_size, TEAMS_MAX_PAGE_SIZE)?;
        let request = RequestBuilder::get("/api/v1/teams/search")
            .query("name", &search.name)
            .query("status", &search.status)
            .query("teamType", &search.team_types)
            .sort(search.sort.as_ref());
        self.client
            .paginate(request, search.page_size, PageShape::default())
    }
}
