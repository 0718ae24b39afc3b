//! GitHub billing API client
//!
//! Implements [`BillingApi`] against the GitHub REST API: the Copilot
//! seat roster, team enumeration in both scopes, and the enterprise
//! billing cost-center and budget endpoints. List endpoints are walked
//! at 100 items per page until a short page ends the listing.
//!
//! Rate limiting gets one second chance: a 429 response is retried a
//! single time after sleeping until the advertised reset, and a second
//! 429 fails the call.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use costsync_core::ports::BillingApi;
use costsync_domain::{
    Budget, CopilotUser, CostCenter, CostCenterMembership, CostsyncError, GithubConfig, Result,
    Team, TeamScope,
};
use reqwest::header::{self, HeaderMap};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::http::HttpClient;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PER_PAGE: usize = 100;
const API_VERSION: &str = "2022-11-28";
const APP_USER_AGENT: &str = concat!("costsync/", env!("CARGO_PKG_VERSION"));
/// Wait applied when a 429 response carries no usable reset header.
const RATE_LIMIT_FALLBACK_SECS: u64 = 60;

/// GitHub REST client scoped to one enterprise.
pub struct GitHubBillingClient {
    http: HttpClient,
    api_url: String,
    enterprise: String,
    token: String,
}

impl GitHubBillingClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let http =
            HttpClient::builder().timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            enterprise: config.enterprise.clone(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, &format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(header::USER_AGENT, APP_USER_AGENT)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    /// Send a request, honoring one rate-limit reset window and mapping
    /// non-success statuses to domain errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let retry = request.try_clone();
        let response = self.http.send(request).await?;
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return check_status(response).await;
        }
        let Some(retry) = retry else {
            return Err(CostsyncError::RateLimited(
                "rate limited on a request that cannot be replayed".to_string(),
            ));
        };
        let wait = rate_limit_wait(response.headers(), Utc::now());
        warn!(wait_secs = wait.as_secs(), "rate limited, waiting for the reset window");
        tokio::time::sleep(wait).await;
        let response = self.http.send(retry).await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(CostsyncError::RateLimited(
                "still rate limited after waiting for the reset window".to_string(),
            ));
        }
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| CostsyncError::Internal(format!("failed to parse API response: {err}")))
    }

    /// Walk a bare-array list endpoint page by page.
    async fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items: Vec<T> = Vec::new();
        let mut page: usize = 1;
        loop {
            let request = self
                .get(path)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())]);
            let batch: Vec<T> = self.get_json(request).await?;
            let full_page = batch.len() == PER_PAGE;
            items.extend(batch);
            if !full_page {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
    Err(match status {
        StatusCode::CONFLICT => CostsyncError::Conflict(body),
        StatusCode::NOT_FOUND => CostsyncError::NotFound(body),
        _ => CostsyncError::Api(format!("GitHub API error (HTTP {status}): {body}")),
    })
}

/// How long to sleep before retrying a rate-limited request: one second
/// past the advertised reset instant, or a fixed fallback when the
/// header is missing or unreadable.
fn rate_limit_wait(headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
    headers
        .get("x-ratelimit-reset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .map_or(Duration::from_secs(RATE_LIMIT_FALLBACK_SECS), |reset| {
            let remaining = (reset - now.timestamp()).max(0) as u64;
            Duration::from_secs(remaining + 1)
        })
}

#[async_trait]
impl BillingApi for GitHubBillingClient {
    async fn copilot_users(&self) -> Result<Vec<CopilotUser>> {
        let path = format!("/enterprises/{}/copilot/billing/seats", self.enterprise);
        let mut roster: BTreeMap<String, CopilotUser> = BTreeMap::new();
        let mut page: usize = 1;
        loop {
            let request = self
                .get(&path)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())]);
            let body: SeatsPage = self.get_json(request).await?;
            let count = body.seats.len();
            for seat in body.seats {
                let Some(user) = seat.into_user() else {
                    debug!("seat without an assignee login skipped");
                    continue;
                };
                let login = user.login.clone();
                if roster.insert(login.clone(), user).is_some() {
                    warn!(login = %login, "duplicate seat entry in roster");
                }
            }
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        info!(users = roster.len(), "fetched Copilot seat roster");
        Ok(roster.into_values().collect())
    }

    async fn teams(&self, scope: &TeamScope) -> Result<Vec<Team>> {
        let path = match scope {
            TeamScope::Organization(org) => format!("/orgs/{org}/teams"),
            TeamScope::Enterprise => format!("/enterprises/{}/teams", self.enterprise),
        };
        let teams: Vec<TeamDto> = self.get_all_pages(&path).await?;
        Ok(teams
            .into_iter()
            .map(|dto| {
                let name = dto.name.unwrap_or_else(|| dto.slug.clone());
                Team { slug: dto.slug, name, scope: scope.clone() }
            })
            .collect())
    }

    async fn team_members(&self, team: &Team) -> Result<Vec<String>> {
        let path = match &team.scope {
            TeamScope::Organization(org) => {
                format!("/orgs/{org}/teams/{}/members", team.slug)
            }
            TeamScope::Enterprise => {
                format!("/enterprises/{}/teams/{}/memberships", self.enterprise, team.slug)
            }
        };
        let members: Vec<MemberDto> = self.get_all_pages(&path).await?;
        Ok(members.into_iter().map(|member| member.login).collect())
    }

    async fn cost_centers(&self) -> Result<Vec<CostCenter>> {
        let path = format!("/enterprises/{}/settings/billing/cost-centers", self.enterprise);
        let body: CostCentersPage = self.get_json(self.get(&path)).await?;
        Ok(body.cost_centers)
    }

    async fn create_cost_center(&self, name: &str) -> Result<String> {
        let path = format!("/enterprises/{}/settings/billing/cost-centers", self.enterprise);
        let request = self.request(Method::POST, &path).json(&json!({ "name": name }));
        let created: CreatedCostCenter = self.get_json(request).await?;
        Ok(created.id)
    }

    async fn cost_center_members(&self, cost_center_id: &str) -> Result<Vec<String>> {
        let path = format!(
            "/enterprises/{}/settings/billing/cost-centers/{cost_center_id}",
            self.enterprise
        );
        let detail: CostCenterDetail = self.get_json(self.get(&path)).await?;
        Ok(detail
            .resources
            .into_iter()
            .filter(|resource| resource.kind == "User")
            .map(|resource| resource.name)
            .collect())
    }

    async fn add_users(&self, cost_center_id: &str, users: &[String]) -> Result<()> {
        let path = format!(
            "/enterprises/{}/settings/billing/cost-centers/{cost_center_id}/resource",
            self.enterprise
        );
        let request = self.request(Method::POST, &path).json(&json!({ "users": users }));
        self.send(request).await?;
        Ok(())
    }

    async fn remove_users(&self, cost_center_id: &str, users: &[String]) -> Result<()> {
        let path = format!(
            "/enterprises/{}/settings/billing/cost-centers/{cost_center_id}/resource",
            self.enterprise
        );
        let request = self.request(Method::DELETE, &path).json(&json!({ "users": users }));
        self.send(request).await?;
        Ok(())
    }

    async fn user_membership(&self, login: &str) -> Result<Option<CostCenterMembership>> {
        let path =
            format!("/enterprises/{}/settings/billing/cost-centers/memberships", self.enterprise);
        let request = self.get(&path).query(&[("resource_type", "user"), ("name", login)]);
        match self.get_json::<MembershipsPage>(request).await {
            Ok(body) => Ok(body.memberships.into_iter().next().map(|membership| {
                CostCenterMembership {
                    cost_center_id: membership.cost_center.id,
                    cost_center_name: membership.cost_center.name,
                }
            })),
            Err(CostsyncError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn budgets(&self) -> Result<Vec<Budget>> {
        let path = format!("/enterprises/{}/settings/billing/budgets", self.enterprise);
        match self.get_json::<BudgetsPage>(self.get(&path)).await {
            Ok(body) => Ok(body.budgets),
            Err(CostsyncError::NotFound(_)) => Err(CostsyncError::BudgetsUnavailable(format!(
                "budgets endpoint answered 404 for enterprise '{}'",
                self.enterprise
            ))),
            Err(err) => Err(err),
        }
    }

    async fn create_budget(&self, cost_center_id: &str) -> Result<()> {
        let path = format!("/enterprises/{}/settings/billing/budgets", self.enterprise);
        let payload = json!({
            "budget_type": "SkuPricing",
            "budget_product_sku": "copilot_premium_request",
            "budget_scope": "cost_center",
            "budget_amount": 0,
            "prevent_further_usage": true,
            "budget_entity_name": cost_center_id,
            "budget_alerting": { "will_alert": false, "alert_recipients": [] }
        });
        let request = self.request(Method::POST, &path).json(&payload);
        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(CostsyncError::NotFound(_)) => Err(CostsyncError::BudgetsUnavailable(format!(
                "budgets endpoint answered 404 for enterprise '{}'",
                self.enterprise
            ))),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SeatsPage {
    #[serde(default)]
    seats: Vec<SeatDto>,
}

#[derive(Debug, Deserialize)]
struct SeatDto {
    assignee: Option<AssigneeDto>,
    created_at: Option<DateTime<Utc>>,
    last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AssigneeDto {
    login: Option<String>,
    name: Option<String>,
    email: Option<String>,
    #[serde(rename = "type")]
    user_type: Option<String>,
}

impl SeatDto {
    fn into_user(self) -> Option<CopilotUser> {
        let assignee = self.assignee?;
        let login = assignee.login?;
        Some(CopilotUser {
            login,
            name: assignee.name,
            email: assignee.email,
            user_type: assignee.user_type,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
            cost_center: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TeamDto {
    slug: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberDto {
    login: String,
}

#[derive(Debug, Deserialize)]
struct CostCentersPage {
    #[serde(rename = "costCenters", default)]
    cost_centers: Vec<CostCenter>,
}

#[derive(Debug, Deserialize)]
struct CreatedCostCenter {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CostCenterDetail {
    #[serde(default)]
    resources: Vec<ResourceDto>,
}

#[derive(Debug, Deserialize)]
struct ResourceDto {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct MembershipsPage {
    #[serde(default)]
    memberships: Vec<MembershipDto>,
}

#[derive(Debug, Deserialize)]
struct MembershipDto {
    cost_center: CostCenterRef,
}

#[derive(Debug, Deserialize)]
struct CostCenterRef {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct BudgetsPage {
    #[serde(default)]
    budgets: Vec<Budget>,
}
