use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::{
    DomainEmail, LeadRecord, NewDomainEmail, NewLead, NewProject, NotificationSettings, Project,
    PropertyQuery, PropertySearch,
};
use crate::errors::ApiError;

/// Longest error body kept in [`ApiError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Typed client for the backend REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
    property_search: Option<Url>,
}

impl ApiClient {
    pub fn new(
        base: &Url,
        property_search: Option<Url>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sitewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Request {
                path: base.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base: base.as_str().trim_end_matches('/').to_string(),
            property_search,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        debug!(path, "API request");
        let resp = request.send().await.map_err(|source| ApiError::Request {
            path: path.to_string(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, ApiError> {
        resp.json::<T>().await.map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let resp = self
            .send(path, self.http.get(self.url(path)).query(query))
            .await?;
        Self::decode(path, resp).await
    }

    /// GET a list endpoint. A `null` body counts as an empty list.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let list: Option<Vec<T>> = self.get_json(path, query).await?;
        Ok(list.unwrap_or_default())
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.send(path, self.http.post(self.url(path)).json(body))
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(path, self.http.delete(self.url(path))).await?;
        Ok(())
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get_list("/projects", &[]).await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<(), ApiError> {
        project.validate()?;
        self.post_json("/projects", project).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/projects/{}", path_segment(id)?)).await
    }

    pub async fn list_leads(&self, project_domain: &str) -> Result<Vec<LeadRecord>, ApiError> {
        if project_domain.trim().is_empty() {
            return Err(ApiError::InvalidInput("project domain is required".into()));
        }
        self.get_list("/leads", &[("projectDomain", project_domain)])
            .await
    }

    pub async fn create_lead(&self, lead: &NewLead) -> Result<(), ApiError> {
        lead.validate()?;
        self.post_json("/leads", lead).await
    }

    pub async fn list_domain_emails(&self) -> Result<Vec<DomainEmail>, ApiError> {
        self.get_list("/domain-emails", &[]).await
    }

    pub async fn create_domain_email(&self, mapping: &NewDomainEmail) -> Result<(), ApiError> {
        mapping.validate()?;
        self.post_json("/domain-emails", mapping).await
    }

    pub async fn delete_domain_email(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/domain-emails/{}", path_segment(id)?))
            .await
    }

    /// Current settings, or defaults when the backend has none stored.
    pub async fn get_settings(&self) -> Result<NotificationSettings, ApiError> {
        let settings: Option<NotificationSettings> = self.get_json("/settings", &[]).await?;
        Ok(settings.unwrap_or_default())
    }

    pub async fn save_settings(&self, settings: &NotificationSettings) -> Result<(), ApiError> {
        settings.validate()?;
        self.post_json("/settings", settings).await
    }

    /// Search the property catalogue by name.
    pub async fn find_property(&self, query: &PropertyQuery) -> Result<PropertySearch, ApiError> {
        let url = self
            .property_search
            .as_ref()
            .ok_or(ApiError::PropertySearchUnavailable)?;
        if query.search_value.trim().is_empty() {
            return Err(ApiError::InvalidInput("search value is required".into()));
        }
        let path = url.path().to_string();
        let resp = self
            .send(&path, self.http.post(url.clone()).json(query))
            .await?;
        Self::decode(&path, resp).await
    }
}

/// Reject ids that would change the request path.
fn path_segment(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::InvalidInput(format!("'{}' is not a valid id", id)));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&Url::parse(base).unwrap(), None, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = client("http://localhost:9500/api/v1/");
        assert_eq!(api.url("/projects"), "http://localhost:9500/api/v1/projects");
    }

    #[test]
    fn test_path_segment_rejects_traversal() {
        assert_eq!(path_segment(" 65f0 ").unwrap(), "65f0");
        assert!(path_segment("").is_err());
        assert!(path_segment("../settings").is_err());
        assert!(path_segment("a?b").is_err());
    }

    #[tokio::test]
    async fn test_find_property_without_url_is_unavailable() {
        let api = client("http://localhost:9500/api/v1");
        let err = api
            .find_property(&PropertyQuery {
                search_value: "Skyline".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PropertySearchUnavailable));
    }

    #[tokio::test]
    async fn test_invalid_input_fails_before_any_request() {
        // Port 9 (discard) is never contacted: validation runs first.
        let api = client("http://127.0.0.1:9/api/v1");
        let err = api.list_leads("  ").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        let err = api.delete_project("a/b").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
