//! Google Calendar API client.
//!
//! Each operation is one REST call carrying the session's bearer token. A 401
//! triggers exactly one forced token refresh and one retry. Nothing else is
//! retried: 429 and 5xx answers surface immediately as errors.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use gcal_core::event::{CalendarListEntry, Event};

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::session::AuthSession;

/// Largest page the events.list endpoint accepts.
const MAX_PAGE_SIZE: usize = 2500;

/// Parameters for listing events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Lower bound (exclusive) for an event's end time.
    pub time_min: DateTime<Utc>,
    /// Upper bound (exclusive) for an event's start time.
    pub time_max: Option<DateTime<Utc>>,
    /// Maximum number of events returned, across pages.
    pub max_results: usize,
    /// Free-text search (`q`).
    pub search: Option<String>,
}

impl EventQuery {
    /// Events that have not ended yet, starting from `now`.
    pub fn upcoming(now: DateTime<Utc>, max_results: usize) -> Self {
        Self {
            time_min: now,
            time_max: None,
            max_results,
            search: None,
        }
    }

    /// Events overlapping `[start, end)`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>, max_results: usize) -> Self {
        Self {
            time_min: start,
            time_max: Some(end),
            max_results,
            search: None,
        }
    }

    #[must_use]
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<Event>,
    next_page_token: Option<String>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// Error body returned by Google APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Google Calendar API client bound to one account's session.
#[derive(Debug, Clone)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    session: Arc<AuthSession>,
    base_url: String,
}

impl CalendarClient {
    /// Creates a client that authenticates through `session`.
    pub fn new(config: &GoogleConfig, session: Arc<AuthSession>) -> ProviderResult<Self> {
        Ok(Self {
            http_client: config.http_client()?,
            session,
            base_url: config.api_base_url.clone(),
        })
    }

    /// Returns the session used for authentication.
    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn calendar_url(&self, calendar_id: &str, rest: &str) -> String {
        format!(
            "{}/calendars/{}{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            rest
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        self.calendar_url(
            calendar_id,
            &format!("/events/{}", urlencoding::encode(event_id)),
        )
    }

    /// Lists events matching `query`, ordered by start time.
    ///
    /// Follows `nextPageToken` until `max_results` events are collected.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        query: &EventQuery,
    ) -> ProviderResult<Vec<Event>> {
        let url = self.calendar_url(calendar_id, "/events");
        let mut events: Vec<Event> = Vec::new();
        let mut page_token: Option<String> = None;

        while events.len() < query.max_results {
            let page_size = (query.max_results - events.len()).min(MAX_PAGE_SIZE);

            let mut params: Vec<(&str, String)> = vec![
                ("timeMin", query.time_min.to_rfc3339()),
                ("maxResults", page_size.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(time_max) = query.time_max {
                params.push(("timeMax", time_max.to_rfc3339()));
            }
            if let Some(search) = &query.search {
                params.push(("q", search.clone()));
            }
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = self
                .send_authorized(&format!("events in calendar '{}'", calendar_id), |http| {
                    http.get(&url).query(&params)
                })
                .await?;
            let page: EventListResponse = decode(response).await?;

            events.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        // Pages arrive in `orderBy=startTime` order, including all-day events
        // placed by the calendar's zone.
        events.truncate(query.max_results);
        for event in &mut events {
            event.calendar_id = Some(calendar_id.to_string());
        }

        debug!("fetched {} events from calendar {}", events.len(), calendar_id);
        Ok(events)
    }

    /// Fetches one event.
    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<Event> {
        let url = self.event_url(calendar_id, event_id);
        let response = self
            .send_authorized(&event_context(calendar_id, event_id), |http| {
                http.get(&url)
            })
            .await?;
        let event: Event = decode(response).await?;
        Ok(event.with_calendar_id(calendar_id))
    }

    /// Inserts an event.
    ///
    /// Requests conference data when the event carries a create request.
    pub async fn create_event(&self, calendar_id: &str, event: &Event) -> ProviderResult<Event> {
        let url = self.calendar_url(calendar_id, "/events");
        let with_conference = event.conference_data.is_some();

        let response = self
            .send_authorized(&format!("calendar '{}'", calendar_id), |http| {
                let request = http.post(&url).json(event);
                if with_conference {
                    request.query(&[("conferenceDataVersion", "1")])
                } else {
                    request
                }
            })
            .await?;

        let created: Event = decode(response).await?;
        info!(
            "created event {} in {}",
            created.id.as_deref().unwrap_or("?"),
            calendar_id
        );
        Ok(created.with_calendar_id(calendar_id))
    }

    /// Applies a partial update. Only fields set on `patch` are sent.
    pub async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &Event,
    ) -> ProviderResult<Event> {
        if patch.is_empty() {
            return Err(ProviderError::validation("nothing to update"));
        }

        let url = self.event_url(calendar_id, event_id);
        let response = self
            .send_authorized(&event_context(calendar_id, event_id), |http| {
                http.patch(&url).json(patch)
            })
            .await?;

        let updated: Event = decode(response).await?;
        info!("updated event {} in {}", event_id, calendar_id);
        Ok(updated.with_calendar_id(calendar_id))
    }

    /// Deletes an event.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let url = self.event_url(calendar_id, event_id);
        self.send_authorized(&event_context(calendar_id, event_id), |http| {
            http.delete(&url)
        })
        .await?;
        info!("deleted event {} from {}", event_id, calendar_id);
        Ok(())
    }

    /// Creates an event from a natural-language description.
    pub async fn quick_add(&self, calendar_id: &str, text: &str) -> ProviderResult<Event> {
        if text.trim().is_empty() {
            return Err(ProviderError::validation("quick-add text must not be empty"));
        }

        let url = self.calendar_url(calendar_id, "/events/quickAdd");
        let response = self
            .send_authorized(&format!("calendar '{}'", calendar_id), |http| {
                http.post(&url).query(&[("text", text)])
            })
            .await?;

        let created: Event = decode(response).await?;
        Ok(created.with_calendar_id(calendar_id))
    }

    /// Lists the calendars on the user's calendar list.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .send_authorized("calendar list", |http| {
                    let request = http.get(&url);
                    match &page_token {
                        Some(token) => request.query(&[("pageToken", token)]),
                        None => request,
                    }
                })
                .await?;
            let page: CalendarListResponse = decode(response).await?;

            calendars.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }

    /// Fetches a calendar's metadata (`calendars.get`).
    pub async fn get_calendar(&self, calendar_id: &str) -> ProviderResult<CalendarListEntry> {
        let url = self.calendar_url(calendar_id, "");
        let response = self
            .send_authorized(&format!("calendar '{}'", calendar_id), |http| {
                http.get(&url)
            })
            .await?;

        let mut calendar: CalendarListEntry = decode(response).await?;
        if calendar_id == "primary" {
            calendar.primary = true;
        }
        Ok(calendar)
    }

    /// Sends a request built by `build`, with one refresh-and-retry on 401.
    ///
    /// `context` names the requested resource in error messages.
    async fn send_authorized<F>(&self, context: &str, build: F) -> ProviderResult<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let token = self.session.access_token().await?;
        let response = build(&self.http_client).bearer_auth(&token).send().await?;
        debug!("{} {}", response.status(), response.url());

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response, context).await;
        }

        info!("access token rejected, refreshing and retrying once");
        let token = self.session.force_refresh().await?;
        let response = build(&self.http_client).bearer_auth(&token).send().await?;
        debug!("{} {} (retry)", response.status(), response.url());

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "Google rejected the refreshed access token; run `google-calendar init`",
            )
            .with_status(StatusCode::UNAUTHORIZED.as_u16()));
        }
        check_status(response, context).await
    }
}

fn event_context(calendar_id: &str, event_id: &str) -> String {
    format!("event '{}' in calendar '{}'", event_id, calendar_id)
}

/// Maps non-2xx answers onto the error taxonomy.
async fn check_status(response: reqwest::Response, context: &str) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let message = match retry_after {
            Some(secs) if secs.chars().all(|c| c.is_ascii_digit()) => {
                format!("rate limit exceeded, retry after {} seconds", secs)
            }
            Some(when) => format!("rate limit exceeded, retry after {}", when),
            None => "rate limit exceeded".to_string(),
        };
        return Err(ProviderError::rate_limited(message).with_status(status.as_u16()));
    }

    let body = response.text().await.unwrap_or_default();
    let detail = api_error_message(&body);

    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Err(ProviderError::not_found(format!("{} ({})", context, detail))
            .with_status(status.as_u16()));
    }

    Err(ProviderError::remote(format!("{} for {}: {}", status, context, detail))
        .with_status(status.as_u16()))
}

/// Extracts `error.message` from a Google error body, falling back to the
/// raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ if body.trim().is_empty() => "no details".to_string(),
        _ => body.trim().to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e)).with_source(e)
    })
}
