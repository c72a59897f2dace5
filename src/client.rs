//! HTTP client for the assistant backend
//!
//! One [`ChatClient`] serves both concerns: plain JSON request/response calls
//! for the collaborator endpoints (auth, chat list, history) and the streaming
//! turn exchanges consumed as a [`TurnStream`].

mod turn;

#[cfg(test)]
pub(crate) mod testing;

pub use turn::{TurnEvent, TurnStream};

use crate::protocol::{
    AuthUrl, ChatSummary, HistoryEntry, HistoryResponse, InterruptReply, LoginAck,
    SendMessageBody, VerifiedLogin,
};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Transport-level failure: the exchange could not be opened, or the remote
/// side aborted it unexpectedly. Distinct from a clean end-of-stream.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        // No overall request timeout: a turn exchange stays open for as long
        // as the assistant streams. Stalls are ended by cancellation.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status { status, body })
    }

    // ------------------------------------------------------------------
    // Collaborator endpoints: auth, chat list, history
    // ------------------------------------------------------------------

    /// Request an OTP challenge for an email address.
    pub async fn login(&self, email: &str) -> Result<LoginAck, TransportError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Redeem an OTP for a login identity.
    pub async fn verify_otp(
        &self,
        email: &str,
        otp: &str,
    ) -> Result<VerifiedLogin, TransportError> {
        let response = self
            .http
            .post(self.url("/auth/verify-otp-login"))
            .json(&serde_json::json!({ "email": email, "otp": otp }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>, TransportError> {
        let response = self
            .http
            .get(self.url(&format!("/chats/lists/{user_id}")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_chat(&self, user_id: &str) -> Result<ChatSummary, TransportError> {
        let response = self
            .http
            .post(self.url(&format!("/chats/lists/{user_id}")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn delete_chat(&self, user_id: &str, chat_id: &str) -> Result<(), TransportError> {
        let response = self
            .http
            .delete(self.url(&format!("/chats/delete/{user_id}/{chat_id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn chat_history(
        &self,
        user_id: &str,
        chat_id: &str,
    ) -> Result<Vec<HistoryEntry>, TransportError> {
        let response = self
            .http
            .get(self.url(&format!("/chats/history/{user_id}/{chat_id}")))
            .send()
            .await?;
        let history: HistoryResponse = Self::check(response).await?.json().await?;
        Ok(history.into_entries())
    }

    /// Authorization URL for connecting the user's mailbox.
    pub async fn google_auth_url(&self, user_id: &str) -> Result<String, TransportError> {
        let response = self
            .http
            .get(self.url("/oauth/google/connect"))
            .query(&[("user_id", user_id)])
            .send()
            .await?;
        let auth: AuthUrl = Self::check(response).await?.json().await?;
        Ok(auth.authorization_url)
    }

    // ------------------------------------------------------------------
    // Turn exchanges
    // ------------------------------------------------------------------

    /// Open a turn exchange for a fresh user utterance.
    pub async fn send_message(
        &self,
        user_id: &str,
        chat_id: &str,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<TurnStream, TransportError> {
        let body = SendMessageBody {
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
            message: message.to_string(),
        };
        let response = self
            .http
            .post(self.url("/chats/ai/send"))
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response).await?;
        tracing::debug!(chat_id, "turn exchange opened");
        Ok(TurnStream::new(response, cancel))
    }

    /// Open a resume exchange carrying an interrupt decision, bound to the
    /// same conversation as the interrupted turn.
    pub async fn respond_to_interrupt(
        &self,
        user_id: &str,
        chat_id: &str,
        reply: &InterruptReply,
        cancel: CancellationToken,
    ) -> Result<TurnStream, TransportError> {
        let response = self
            .http
            .post(self.url("/chats/ai/interrupt/respond"))
            .query(&[("user_id", user_id), ("chat_id", chat_id)])
            .json(reply)
            .send()
            .await?;
        let response = Self::check(response).await?;
        tracing::debug!(chat_id, action = ?reply.action, "resume exchange opened");
        Ok(TurnStream::new(response, cancel))
    }
}
