//! Client-side grouping of direct messages into conversations.
//!
//! A conversation is not stored anywhere; it is the set of messages the
//! current user exchanged with one counterparty, summarised by its latest
//! message and the number of inbound messages not yet read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub other_user_id: Uuid,
    pub last_message: Message,
    pub unread_count: usize,
    /// Product of the latest message, used to spawn an exchange.
    pub product_id: Option<Uuid>,
}

/// Group `messages` (any order) by counterparty of `me`.
///
/// The last message is the one with the greatest `created_at`; on equal
/// timestamps the message seen first is kept. The result is sorted newest
/// conversation first, stable with respect to first appearance.
pub fn group_conversations(messages: &[Message], me: Uuid) -> Vec<Conversation> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_user: HashMap<Uuid, Conversation> = HashMap::new();

    for msg in messages {
        let other = msg.counterparty(me);
        let unread = usize::from(msg.is_unread_for(me));

        match by_user.get_mut(&other) {
            Some(conv) => {
                if msg.created_at > conv.last_message.created_at {
                    conv.last_message = msg.clone();
                    conv.product_id = msg.product_id;
                }
                conv.unread_count += unread;
            }
            None => {
                order.push(other);
                by_user.insert(
                    other,
                    Conversation {
                        other_user_id: other,
                        last_message: msg.clone(),
                        unread_count: unread,
                        product_id: msg.product_id,
                    },
                );
            }
        }
    }

    let mut conversations: Vec<Conversation> = order
        .into_iter()
        .filter_map(|id| by_user.remove(&id))
        .collect();
    conversations.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
    conversations
}
