//! HTTP client mirroring the server's routes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use cycleit_shared::constants::APP_NAME;
use cycleit_shared::exchange::ExchangeBoard;
use cycleit_shared::listing::{ListingDraft, ListingFilter};
use cycleit_shared::models::{
    Category, ConversationEntry, DashboardStats, ExchangeDetail, Interest, Listing, Message,
    Profile,
};
use cycleit_shared::protocol::{
    AvatarUploaded, CreateExchangeRequest, ErrorBody, ExpressInterestRequest, InterestStatus,
    ListingCreated, ProfileUpdate, SendMessageRequest, SessionInfo, SetListingActiveRequest,
    SignInRequest, SignUpRequest, UpdateExchangeStatusRequest,
};
use cycleit_shared::ExchangeStatus;

use crate::error::ClientError;
use crate::session::{Session, SessionCache};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One image selected for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    fn into_part(self) -> Result<Part, ClientError> {
        Ok(Part::bytes(self.data)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?)
    }
}

#[derive(Clone)]
pub struct CycleItClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionCache>,
}

impl CycleItClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: Arc::new(SessionCache::new()),
        })
    }

    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    // ─── Auth ───

    pub async fn sign_up(&self, req: &SignUpRequest) -> Result<Session, ClientError> {
        let info: SessionInfo = self
            .execute(self.request(Method::POST, "/auth/signup").json(req), false)
            .await?;
        self.establish(info, None)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let info: SessionInfo = self
            .execute(self.request(Method::POST, "/auth/login").json(&body), false)
            .await?;
        self.establish(info, None)
    }

    /// Validate a token kept from an earlier run and adopt it.
    pub async fn restore(&self, token: &str) -> Result<Session, ClientError> {
        let req = self.request(Method::GET, "/auth/session").bearer_auth(token);
        match self.execute::<SessionInfo>(req, false).await {
            Ok(info) => self.establish(info, Some(token)),
            Err(e) if e.is_unauthorized() => {
                self.session.clear();
                Err(ClientError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }

    /// End the session on the server. The local session is dropped either way.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let result = match self.authed(Method::POST, "/auth/logout") {
            Ok(req) => self.execute_empty(req).await,
            Err(e) => Err(e),
        };
        self.session.clear();
        result
    }

    pub async fn current_session(&self) -> Result<SessionInfo, ClientError> {
        self.execute(self.authed(Method::GET, "/auth/session")?, true)
            .await
    }

    fn establish(&self, info: SessionInfo, token: Option<&str>) -> Result<Session, ClientError> {
        let access_token = info
            .access_token
            .or_else(|| token.map(str::to_string))
            .ok_or_else(|| ClientError::Api {
                status: StatusCode::OK,
                message: "server did not return an access token".into(),
            })?;
        let session = Session {
            user_id: info.user_id,
            username: info.username,
            access_token,
            expires_at: info.expires_at,
        };
        self.session.set(session.clone());
        Ok(session)
    }

    // ─── Listings ───

    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        self.execute(self.request(Method::GET, "/categories"), false)
            .await
    }

    pub async fn browse(&self, filter: &ListingFilter) -> Result<Vec<Listing>, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(category) = filter.category_id {
            query.push(("category_id", category.to_string()));
        }
        if let Some(condition) = filter.condition {
            query.push(("condition", condition.to_string()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query.push(("search", search.to_string()));
        }
        self.execute(self.request(Method::GET, "/listings").query(&query), false)
            .await
    }

    /// Sent with the session when there is one, so owners see their
    /// inactive listings.
    pub async fn listing(&self, id: Uuid) -> Result<Listing, ClientError> {
        let path = format!("/listings/{id}");
        match self.authed(Method::GET, &path) {
            Ok(req) => self.execute(req, true).await,
            Err(_) => self.execute(self.request(Method::GET, &path), false).await,
        }
    }

    pub async fn my_listings(&self) -> Result<Vec<Listing>, ClientError> {
        self.execute(self.authed(Method::GET, "/me/listings")?, true)
            .await
    }

    pub async fn create_listing(
        &self,
        draft: &ListingDraft,
        images: Vec<ImageUpload>,
    ) -> Result<ListingCreated, ClientError> {
        let mut form = Form::new()
            .text("title", draft.title.clone())
            .text("description", draft.description.clone())
            .text("category_id", draft.category_id.to_string())
            .text("condition", draft.condition.to_string());
        if let Some(desired) = &draft.desired_exchange {
            form = form.text("desired_exchange", desired.clone());
        }
        if let Some(location) = &draft.location {
            form = form.text("location", location.clone());
        }
        for image in images {
            form = form.part("images", image.into_part()?);
        }

        let req = self.authed(Method::POST, "/listings")?.multipart(form);
        let created: ListingCreated = self.execute(req, true).await?;
        if !created.failed_uploads.is_empty() {
            debug!(failed = ?created.failed_uploads, "some images were not stored");
        }
        Ok(created)
    }

    pub async fn set_listing_active(&self, id: Uuid, is_active: bool) -> Result<Listing, ClientError> {
        let req = self
            .authed(Method::PATCH, &format!("/listings/{id}"))?
            .json(&SetListingActiveRequest { is_active });
        self.execute(req, true).await
    }

    pub async fn delete_listing(&self, id: Uuid) -> Result<(), ClientError> {
        self.execute_empty(self.authed(Method::DELETE, &format!("/listings/{id}"))?)
            .await
    }

    pub async fn is_interested(&self, id: Uuid) -> Result<bool, ClientError> {
        let status: InterestStatus = self
            .execute(self.authed(Method::GET, &format!("/listings/{id}/interest"))?, true)
            .await?;
        Ok(status.interested)
    }

    pub async fn express_interest(
        &self,
        id: Uuid,
        message: Option<String>,
    ) -> Result<Interest, ClientError> {
        let req = self
            .authed(Method::POST, &format!("/listings/{id}/interest"))?
            .json(&ExpressInterestRequest { message });
        self.execute(req, true).await
    }

    // ─── Messaging ───

    pub async fn conversations(&self) -> Result<Vec<ConversationEntry>, ClientError> {
        self.execute(self.authed(Method::GET, "/messages/conversations")?, true)
            .await
    }

    /// Open the thread with `other`, marking their messages read.
    pub async fn thread(&self, other: Uuid) -> Result<Vec<Message>, ClientError> {
        let path = format!("/messages/conversations/{other}");
        self.execute(self.authed(Method::GET, &path)?, true).await
    }

    pub async fn send_message(&self, req: &SendMessageRequest) -> Result<Message, ClientError> {
        self.execute(self.authed(Method::POST, "/messages")?.json(req), true)
            .await
    }

    // ─── Exchanges ───

    pub async fn exchanges(&self) -> Result<ExchangeBoard, ClientError> {
        self.execute(self.authed(Method::GET, "/exchanges")?, true)
            .await
    }

    pub async fn start_exchange(
        &self,
        product_id: Uuid,
        counterparty_id: Option<Uuid>,
    ) -> Result<ExchangeDetail, ClientError> {
        let body = CreateExchangeRequest {
            product_id,
            counterparty_id,
        };
        self.execute(self.authed(Method::POST, "/exchanges")?.json(&body), true)
            .await
    }

    pub async fn update_exchange_status(
        &self,
        id: Uuid,
        status: ExchangeStatus,
    ) -> Result<ExchangeDetail, ClientError> {
        let req = self
            .authed(Method::PATCH, &format!("/exchanges/{id}"))?
            .json(&UpdateExchangeStatusRequest { status });
        self.execute(req, true).await
    }

    // ─── Profile ───

    pub async fn profile(&self) -> Result<Profile, ClientError> {
        self.execute(self.authed(Method::GET, "/profile")?, true)
            .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        self.execute(self.authed(Method::PUT, "/profile")?.json(update), true)
            .await
    }

    pub async fn upload_avatar(&self, image: ImageUpload) -> Result<AvatarUploaded, ClientError> {
        let form = Form::new().part("file", image.into_part()?);
        self.execute(self.authed(Method::PUT, "/profile/avatar")?.multipart(form), true)
            .await
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, ClientError> {
        self.execute(self.authed(Method::GET, "/dashboard")?, true)
            .await
    }

    // ─── Plumbing ───

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let session = self.session.require()?;
        Ok(self.request(method, path).bearer_auth(session.access_token))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        authed: bool,
    ) -> Result<T, ClientError> {
        let response = self.check(req.send().await?, authed).await?;
        Ok(response.json::<T>().await?)
    }

    async fn execute_empty(&self, req: RequestBuilder) -> Result<(), ClientError> {
        self.check(req.send().await?, true).await?;
        Ok(())
    }

    /// Turn error statuses into [`ClientError::Api`]. A 401 on an
    /// authenticated request means the session is dead.
    async fn check(
        &self,
        response: reqwest::Response,
        authed: bool,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if authed && status == StatusCode::UNAUTHORIZED && self.session.clear() {
            debug!("session rejected by server, cleared");
        }

        let text = response.text().await?;
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => text,
        };
        Err(ClientError::Api { status, message })
    }
}

