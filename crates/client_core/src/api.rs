//! Board service collaborator: the `BoardApi` seam and its reqwest
//! implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{cookie::Jar, Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{BoardId, TaskId, UserId, UserProfile},
    error::ApiError,
    protocol::{
        Board, BoardNameRequest, BoardSummary, CreateTaskRequest, MemberRequest, ReorderEntry,
        ReorderRequest, TaskPatch,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::Settings,
    error::{ClientError, ClientResult},
};

#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn current_user(&self) -> ClientResult<UserProfile>;
    async fn find_users_by_email(&self, email: &str) -> ClientResult<Vec<UserProfile>>;
    async fn list_boards(&self, query: Option<&str>) -> ClientResult<Vec<BoardSummary>>;
    async fn create_board(&self, board_name: &str) -> ClientResult<()>;
    async fn get_board(&self, board_id: &BoardId) -> ClientResult<Board>;
    async fn rename_board(&self, board_id: &BoardId, board_name: &str) -> ClientResult<()>;
    async fn reorder_boards(&self, entries: &[ReorderEntry]) -> ClientResult<()>;
    async fn delete_board(&self, board_id: &BoardId) -> ClientResult<()>;
    async fn create_task(&self, board_id: &BoardId, task: &CreateTaskRequest) -> ClientResult<()>;
    async fn update_task(
        &self,
        board_id: &BoardId,
        task_id: &TaskId,
        patch: &TaskPatch,
    ) -> ClientResult<()>;
    async fn delete_task(&self, board_id: &BoardId, task_id: &TaskId) -> ClientResult<()>;
    async fn invite_user(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()>;
    async fn accept_invite(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()>;
    async fn remove_member(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()>;
}

pub struct HttpBoardApi {
    http: Client,
    base_url: Url,
}

impl HttpBoardApi {
    pub fn new(base_url: Url) -> ClientResult<Self> {
        Self::with_client(Client::builder().cookie_store(true).build()?, base_url)
    }

    pub fn with_client(http: Client, base_url: Url) -> ClientResult<Self> {
        Ok(Self { http, base_url })
    }

    /// Builds a client carrying the configured session cookie, if any.
    pub fn from_settings(settings: &Settings) -> ClientResult<Self> {
        let base_url = settings.api_base_url()?;
        let jar = Arc::new(Jar::default());
        if let Some(cookie) = settings.session_cookie.as_deref() {
            jar.add_cookie_str(cookie, &base_url);
        }
        let http = Client::builder()
            .cookie_provider(jar)
            .timeout(settings.request_timeout())
            .build()?;
        Self::with_client(http, base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn member_update(
        &self,
        board_id: &BoardId,
        action: &str,
        user_id: &UserId,
    ) -> ClientResult<()> {
        let url = self.endpoint(&format!("kanban/boards/{board_id}/{action}"))?;
        let res = self
            .http
            .patch(url)
            .json(&MemberRequest {
                user_id: user_id.clone(),
            })
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }
}

async fn check(res: Response) -> ClientResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let url = res.url().clone();
    let body = res.text().await.unwrap_or_default();
    let err = ApiError::from_response(status.as_u16(), &body);
    warn!(%url, status = status.as_u16(), message = %err.message, "board service rejected request");
    Err(err.into())
}

async fn json<T: DeserializeOwned>(res: Response) -> ClientResult<T> {
    Ok(check(res).await?.json().await?)
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn current_user(&self) -> ClientResult<UserProfile> {
        let res = self.http.get(self.endpoint("users/current-user")?).send().await?;
        json(res).await
    }

    async fn find_users_by_email(&self, email: &str) -> ClientResult<Vec<UserProfile>> {
        let mut url = self.endpoint("users/")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config("api base url cannot carry a path".into()))?
            .pop_if_empty()
            .push(email);
        let res = self.http.get(url).send().await?;
        json(res).await
    }

    async fn list_boards(&self, query: Option<&str>) -> ClientResult<Vec<BoardSummary>> {
        let mut request = self.http.get(self.endpoint("kanban/boards")?);
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            request = request.query(&[("query", query)]);
        }
        let boards: Vec<BoardSummary> = json(request.send().await?).await?;
        debug!(count = boards.len(), "fetched boards");
        Ok(boards)
    }

    async fn create_board(&self, board_name: &str) -> ClientResult<()> {
        let res = self
            .http
            .post(self.endpoint("kanban/boards/create")?)
            .json(&BoardNameRequest {
                board_name: board_name.to_string(),
            })
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn get_board(&self, board_id: &BoardId) -> ClientResult<Board> {
        let res = self
            .http
            .get(self.endpoint(&format!("kanban/boards/{board_id}"))?)
            .send()
            .await?;
        json(res).await
    }

    async fn rename_board(&self, board_id: &BoardId, board_name: &str) -> ClientResult<()> {
        let res = self
            .http
            .patch(self.endpoint(&format!("kanban/boards/{board_id}"))?)
            .json(&BoardNameRequest {
                board_name: board_name.to_string(),
            })
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn reorder_boards(&self, entries: &[ReorderEntry]) -> ClientResult<()> {
        let res = self
            .http
            .patch(self.endpoint("kanban/boards/reorder")?)
            .json(&ReorderRequest {
                data: entries.to_vec(),
            })
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn delete_board(&self, board_id: &BoardId) -> ClientResult<()> {
        let res = self
            .http
            .delete(self.endpoint(&format!("kanban/boards/{board_id}"))?)
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn create_task(&self, board_id: &BoardId, task: &CreateTaskRequest) -> ClientResult<()> {
        let res = self
            .http
            .patch(self.endpoint(&format!("kanban/boards/{board_id}/create-task"))?)
            .json(task)
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn update_task(
        &self,
        board_id: &BoardId,
        task_id: &TaskId,
        patch: &TaskPatch,
    ) -> ClientResult<()> {
        let res = self
            .http
            .patch(self.endpoint(&format!("kanban/boards/{board_id}/{task_id}"))?)
            .json(patch)
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn delete_task(&self, board_id: &BoardId, task_id: &TaskId) -> ClientResult<()> {
        let res = self
            .http
            .delete(self.endpoint(&format!("kanban/boards/{board_id}/{task_id}"))?)
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn invite_user(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()> {
        self.member_update(board_id, "invite-user", user_id).await
    }

    async fn accept_invite(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()> {
        self.member_update(board_id, "accept-invite", user_id).await
    }

    async fn remove_member(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()> {
        self.member_update(board_id, "remove-member", user_id).await
    }
}
