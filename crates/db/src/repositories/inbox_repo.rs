//! Repository for inbox conversations and messages.

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::inbox::{
    Conversation, ConversationSummary, CreateConversation, Message,
};

const CONVERSATION_COLUMNS: &str = "id, company_id, contact_name, contact_phone, channel, \
                                    status, last_message_at, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, direction, body, read_at, sent_at";

/// Provides inbox operations.
pub struct InboxRepo;

impl InboxRepo {
    pub async fn create_conversation(
        pool: &PgPool,
        company_id: DbId,
        input: &CreateConversation,
    ) -> Result<Conversation, sqlx::Error> {
        let query = format!(
            "INSERT INTO inbox_conversations (company_id, contact_name, contact_phone, channel)
             VALUES ($1, $2, $3, $4)
             RETURNING {CONVERSATION_COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(company_id)
            .bind(&input.contact_name)
            .bind(&input.contact_phone)
            .bind(&input.channel)
            .fetch_one(pool)
            .await
    }

    pub async fn find_conversation(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM inbox_conversations
             WHERE id = $1 AND company_id = $2"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// List conversations with unread inbound counts, most recent activity
    /// first.
    pub async fn list_conversations(
        pool: &PgPool,
        company_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationSummary>, sqlx::Error> {
        sqlx::query_as::<_, ConversationSummary>(
            "SELECT c.id, c.company_id, c.contact_name, c.contact_phone, c.channel, c.status,
                    c.last_message_at,
                    (SELECT COUNT(*) FROM inbox_messages m
                     WHERE m.conversation_id = c.id
                       AND m.direction = 'inbound' AND m.read_at IS NULL) AS unread_count,
                    c.created_at
             FROM inbox_conversations c
             WHERE c.company_id = $1
             ORDER BY c.last_message_at DESC NULLS LAST, c.created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(company_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Append a message and bump the conversation's `last_message_at`.
    pub async fn append_message(
        pool: &PgPool,
        conversation_id: DbId,
        direction: &str,
        body: &str,
    ) -> Result<Message, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO inbox_messages (conversation_id, direction, body)
             VALUES ($1, $2, $3)
             RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(direction)
            .bind(body)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE inbox_conversations SET last_message_at = $2, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(conversation_id)
        .bind(message.sent_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Messages of a conversation, oldest first.
    pub async fn list_messages(
        pool: &PgPool,
        conversation_id: DbId,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM inbox_messages
             WHERE conversation_id = $1 ORDER BY sent_at"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .fetch_all(pool)
            .await
    }

    /// Latest inbound message, the input for reply suggestions.
    pub async fn latest_inbound_message(
        pool: &PgPool,
        conversation_id: DbId,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM inbox_messages
             WHERE conversation_id = $1 AND direction = 'inbound'
             ORDER BY sent_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark all inbound messages read. Called when a conversation is opened.
    pub async fn mark_read(pool: &PgPool, conversation_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE inbox_messages SET read_at = NOW()
             WHERE conversation_id = $1 AND direction = 'inbound' AND read_at IS NULL",
        )
        .bind(conversation_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_status(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
        status: &str,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!(
            "UPDATE inbox_conversations SET status = $3, updated_at = NOW()
             WHERE id = $1 AND company_id = $2
             RETURNING {CONVERSATION_COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .bind(company_id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }
}
