//! CRM collaborator boundary.
//!
//! The engine mirrors every inbound and outbound message into the CRM so a
//! human agent always has the full conversation in front of them. The trait
//! keeps the HTTP client out of the flows; [`sync_message`] is the one
//! orchestration every mirror goes through.

use {async_trait::async_trait, serde::Deserialize, thiserror::Error, tracing::info};

use charla_common::Attachment;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CRM returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected CRM payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Inbox {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrmAgent {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Direction of a mirrored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

impl MessageDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageDirection::Incoming => "incoming",
            MessageDirection::Outgoing => "outgoing",
        }
    }
}

/// One message headed for the CRM mirror.
#[derive(Debug, Clone)]
pub struct MirrorMessage {
    pub phone: String,
    pub name: String,
    pub content: String,
    pub direction: MessageDirection,
    pub attachment: Option<Attachment>,
}

/// CRM operations the engine depends on.
#[async_trait]
pub trait CrmSync: Send + Sync {
    async fn find_or_create_inbox(&self, name: &str) -> Result<Inbox, CrmError>;

    async fn find_or_create_contact(
        &self,
        phone: &str,
        name: &str,
        inbox_id: u64,
    ) -> Result<Contact, CrmError>;

    /// Returns the conversation and whether it was newly created.
    async fn find_or_create_conversation(
        &self,
        inbox_id: u64,
        contact_id: u64,
        phone: &str,
    ) -> Result<(Conversation, bool), CrmError>;

    /// Next agent in the round-robin rotation, if any are configured.
    async fn next_agent(&self) -> Result<Option<CrmAgent>, CrmError>;

    async fn assign_agent(&self, conversation_id: u64, agent_id: u64) -> Result<(), CrmError>;

    async fn create_message(
        &self,
        conversation_id: u64,
        content: &str,
        direction: MessageDirection,
        attachment: Option<&Attachment>,
    ) -> Result<(), CrmError>;

    async fn update_contact(
        &self,
        contact_id: u64,
        attrs: serde_json::Value,
    ) -> Result<(), CrmError>;
}

/// Mirror one message into the CRM.
///
/// Walks inbox → contact → conversation, assigns the next agent when the
/// conversation is new, then records the message itself.
pub async fn sync_message(
    crm: &dyn CrmSync,
    inbox_name: &str,
    message: &MirrorMessage,
) -> Result<(), CrmError> {
    let inbox = crm.find_or_create_inbox(inbox_name).await?;
    let contact = crm
        .find_or_create_contact(&message.phone, &message.name, inbox.id)
        .await?;
    let (conversation, created) = crm
        .find_or_create_conversation(inbox.id, contact.id, &message.phone)
        .await?;

    if created && let Some(agent) = crm.next_agent().await? {
        crm.assign_agent(conversation.id, agent.id).await?;
        info!(
            conversation_id = conversation.id,
            agent_id = agent.id,
            "assigned agent to new conversation"
        );
    }

    crm.create_message(
        conversation.id,
        &message.content,
        message.direction,
        message.attachment.as_ref(),
    )
    .await
}

/// Write attributes onto the CRM contact for `phone`, creating the contact
/// on the way if the CRM has never seen it.
pub async fn stamp_contact(
    crm: &dyn CrmSync,
    inbox_name: &str,
    phone: &str,
    name: &str,
    attrs: serde_json::Value,
) -> Result<(), CrmError> {
    let inbox = crm.find_or_create_inbox(inbox_name).await?;
    let contact = crm.find_or_create_contact(phone, name, inbox.id).await?;
    crm.update_contact(contact.id, attrs).await?;
    info!(contact_id = contact.id, phone, "updated CRM contact attributes");
    Ok(())
}
