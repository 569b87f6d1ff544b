//! Direct messaging: inbox grouping, threads and sending.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use cycleit_shared::constants::MAX_MESSAGE_LEN;
use cycleit_shared::conversation::group_conversations;
use cycleit_shared::protocol::SendMessageRequest;
use cycleit_store::{ConversationEntry, Message, ProfileSummary, StoreError};

use crate::api::AppState;
use crate::auth::CurrentUser;
use crate::error::ServerError;

/// Inbox: one entry per counterparty, most recent conversation first.
pub async fn conversations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ConversationEntry>>, ServerError> {
    let db = state.db()?;
    let messages = db.messages_for_user(user.user_id)?;
    let grouped = group_conversations(&messages, user.user_id);

    let mut profiles: HashMap<Uuid, ProfileSummary> = HashMap::new();
    let mut entries = Vec::with_capacity(grouped.len());
    for conversation in grouped {
        let other = conversation.other_user_id;
        let other_user = match profiles.get(&other) {
            Some(p) => p.clone(),
            None => {
                let p = db.get_profile_summary(other)?;
                profiles.insert(other, p.clone());
                p
            }
        };
        entries.push(ConversationEntry {
            other_user,
            conversation,
        });
    }

    Ok(Json(entries))
}

/// Opening a thread marks the other user's messages to the caller as read,
/// then returns the thread oldest first.
pub async fn thread(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(other): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let db = state.db()?;
    match db.get_profile_summary(other) {
        Ok(_) => {}
        Err(StoreError::NotFound) => return Err(ServerError::NotFound("user not found".into())),
        Err(e) => return Err(e.into()),
    }

    let marked = db.mark_thread_read(other, user.user_id)?;
    if marked > 0 {
        debug!(user = %user.user_id, from = %other, marked, "messages marked read");
    }
    Ok(Json(db.thread_between(user.user_id, other)?))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ServerError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ServerError::BadRequest("message content is empty".into()));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(ServerError::BadRequest(format!(
            "message exceeds {MAX_MESSAGE_LEN} characters"
        )));
    }
    if req.recipient_id == user.user_id {
        return Err(ServerError::BadRequest("cannot message yourself".into()));
    }

    let message = Message {
        id: Uuid::new_v4(),
        sender_id: user.user_id,
        recipient_id: req.recipient_id,
        product_id: req.product_id,
        content: content.to_string(),
        created_at: Utc::now(),
        is_read: false,
    };

    {
        let db = state.db()?;
        match db.get_profile_summary(req.recipient_id) {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                return Err(ServerError::NotFound("recipient not found".into()))
            }
            Err(e) => return Err(e.into()),
        }
        if let Some(product_id) = req.product_id {
            match db.get_product(product_id) {
                Ok(_) => {}
                Err(StoreError::NotFound) => {
                    return Err(ServerError::NotFound("product not found".into()))
                }
                Err(e) => return Err(e.into()),
            }
        }
        db.insert_message(&message)?;
    }

    info!(id = %message.id, from = %user.user_id, to = %req.recipient_id, "message sent");
    Ok((StatusCode::CREATED, Json(message)))
}
