//! Microsoft Graph implementation of the provider port

use std::sync::Arc;

use async_trait::async_trait;
use calsync_core::CalendarProviderClient;
use calsync_domain::{
    CalSyncError, EventPage, PageRequest, ProviderConfig, RemoteEvent, Result, SyncWindow,
};
use chrono::SecondsFormat;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::auth::AccessTokenSource;
use super::types::{GraphItem, GraphPage};
use crate::errors::status_to_error;
use crate::http::HttpClient;

const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;
const OUTLOOK_ID_TYPE_HEADER: &str = r#"IdType="ImmutableId""#;
/// Upper bound on `instances` pages followed for one master.
const MAX_INSTANCE_PAGES: usize = 1000;

/// Graph calendar client
#[derive(Clone)]
pub struct GraphCalendarClient {
    http: HttpClient,
    base_url: Url,
    page_size: u32,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GraphCalendarClient {
    pub fn new(
        http: HttpClient,
        base_url: &str,
        page_size: u32,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| CalSyncError::Config(format!("invalid provider base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CalSyncError::Config(format!("provider base URL '{base_url}' cannot carry paths")));
        }
        Ok(Self { http, base_url, page_size: page_size.max(1), tokens })
    }

    /// Build a client with an `HttpClient` tuned from configuration.
    pub fn from_config(config: &ProviderConfig, tokens: Arc<dyn AccessTokenSource>) -> Result<Self> {
        Self::new(HttpClient::from_config(config)?, &config.base_url, config.page_size, tokens)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CalSyncError::Config("provider base URL cannot carry paths".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn delta_endpoint(&self, calendar_id: Option<&str>) -> Result<Url> {
        match calendar_id {
            Some(id) => self.endpoint(&["me", "calendars", id, "calendarView", "delta"]),
            None => self.endpoint(&["me", "calendarView", "delta"]),
        }
    }

    fn request_url(&self, request: &PageRequest) -> Result<Url> {
        match request {
            PageRequest::Window { calendar_id, window } => {
                let mut url = self.delta_endpoint(calendar_id.as_deref())?;
                append_window(&mut url, window);
                Ok(url)
            }
            PageRequest::Delta { calendar_id, token } => {
                if token.starts_with("https://") || token.starts_with("http://") {
                    return parse_link(token);
                }
                let mut url = self.delta_endpoint(calendar_id.as_deref())?;
                url.query_pairs_mut().append_pair("$deltatoken", token);
                Ok(url)
            }
            PageRequest::NextLink(link) => parse_link(link),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let token = self.tokens.access_token().await?;
        let builder = self
            .http
            .request(Method::GET, url)
            .bearer_auth(token)
            .header("Prefer", OUTLOOK_TIMEZONE_HEADER)
            .header("Prefer", format!("odata.maxpagesize={}", self.page_size))
            .header("Prefer", OUTLOOK_ID_TYPE_HEADER);

        let response = self.http.send(builder).await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, Some(detail.trim())));
        }

        response.json::<T>().await.map_err(|e| {
            CalSyncError::InvalidInput(format!("failed to parse Graph response: {e}"))
        })
    }

    async fn get_page(&self, url: Url) -> Result<GraphPage> {
        self.get_json(url).await
    }
}

#[async_trait]
impl CalendarProviderClient for GraphCalendarClient {
    #[instrument(skip(self, request), fields(kind = request_kind(request)))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<EventPage> {
        let url = self.request_url(request)?;
        let page = self.get_page(url).await?;

        let mut events = Vec::with_capacity(page.value.len());
        let mut removed_ids = Vec::new();
        for value in page.value {
            match GraphItem::from_value(value) {
                Ok(GraphItem::Event(event)) => events.push(event),
                Ok(GraphItem::Removed(id)) => removed_ids.push(id),
                Err(e) => warn!(error = %e, "skipping unreadable Graph event"),
            }
        }

        debug!(
            events = events.len(),
            removed = removed_ids.len(),
            has_next = page.next_link.is_some(),
            has_delta = page.delta_link.is_some(),
            "fetched Graph page"
        );

        Ok(EventPage { events, removed_ids, next_link: page.next_link, delta_link: page.delta_link })
    }

    #[instrument(skip(self, window))]
    async fn fetch_instances(
        &self,
        master_external_id: &str,
        window: &SyncWindow,
    ) -> Result<Vec<RemoteEvent>> {
        let mut url = self.endpoint(&["me", "events", master_external_id, "instances"])?;
        append_window(&mut url, window);

        let mut instances = Vec::new();
        let mut next = Some(url);
        let mut pages = 0usize;
        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_INSTANCE_PAGES {
                return Err(CalSyncError::Internal(format!(
                    "instance listing for {master_external_id} exceeded {MAX_INSTANCE_PAGES} pages"
                )));
            }

            let page = self.get_page(url).await?;
            for value in page.value {
                match GraphItem::from_value(value) {
                    Ok(GraphItem::Event(event)) => instances.push(event),
                    Ok(GraphItem::Removed(_)) => {}
                    Err(e) => warn!(error = %e, "skipping unreadable Graph instance"),
                }
            }
            next = page.next_link.as_deref().map(parse_link).transpose()?;
        }

        debug!(count = instances.len(), pages, "fetched series instances");
        Ok(instances)
    }

    #[instrument(skip(self))]
    async fn fetch_event(&self, external_id: &str) -> Result<Option<RemoteEvent>> {
        let url = self.endpoint(&["me", "events", external_id])?;
        let value = match self.get_json::<Value>(url).await {
            Ok(value) => value,
            Err(CalSyncError::NotFound(detail)) => {
                debug!(detail = %detail, "Graph event not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match GraphItem::from_value(value)? {
            GraphItem::Event(event) => Ok(Some(event)),
            GraphItem::Removed(_) => Ok(None),
        }
    }
}

fn append_window(url: &mut Url, window: &SyncWindow) {
    url.query_pairs_mut()
        .append_pair("startDateTime", &window.start.to_rfc3339_opts(SecondsFormat::Secs, true))
        .append_pair("endDateTime", &window.end.to_rfc3339_opts(SecondsFormat::Secs, true));
}

fn parse_link(link: &str) -> Result<Url> {
    Url::parse(link).map_err(|e| CalSyncError::InvalidInput(format!("invalid Graph link '{link}': {e}")))
}

fn request_kind(request: &PageRequest) -> &'static str {
    match request {
        PageRequest::Window { .. } => "window",
        PageRequest::Delta { .. } => "delta",
        PageRequest::NextLink(_) => "next",
    }
}
