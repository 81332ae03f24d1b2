//! Inbox conversation, message, and CRM aide models.

use canteiro_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DIRECTION_INBOUND: &str = "inbound";
pub const DIRECTION_OUTBOUND: &str = "outbound";

/// A conversation row from the `inbox_conversations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Conversation {
    pub id: DbId,
    pub company_id: DbId,
    pub contact_name: String,
    pub contact_phone: Option<String>,
    pub channel: String,
    pub status: String,
    pub last_message_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Conversation with its unread inbound message count, for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConversationSummary {
    pub id: DbId,
    pub company_id: DbId,
    pub contact_name: String,
    pub contact_phone: Option<String>,
    pub channel: String,
    pub status: String,
    pub last_message_at: Option<Timestamp>,
    pub unread_count: i64,
    pub created_at: Timestamp,
}

/// A message row from the `inbox_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    pub direction: String,
    pub body: String,
    pub read_at: Option<Timestamp>,
    pub sent_at: Timestamp,
}

/// DTO for opening a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConversation {
    pub contact_name: String,
    pub contact_phone: Option<String>,
    pub channel: String,
}

/// DTO for appending a message to a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessage {
    pub direction: String,
    pub body: String,
}
