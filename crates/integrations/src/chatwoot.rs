//! Chatwoot-style CRM client.
//!
//! Speaks the account-scoped REST API (`/api/v1/accounts/{id}/…`) with an
//! `api_access_token` header. List endpoints wrap results in `{"payload":
//! […]}`; agents come back as a bare array.

use std::sync::atomic::{AtomicUsize, Ordering};

use {async_trait::async_trait, secrecy::ExposeSecret, serde::Deserialize, tracing::debug};

use {
    crate::crm::{Contact, Conversation, CrmAgent, CrmError, CrmSync, Inbox, MessageDirection},
    charla_common::Attachment,
};

pub struct ChatwootClient {
    endpoint: String,
    account_id: u64,
    token: secrecy::Secret<String>,
    client: reqwest::Client,
    /// Round-robin cursor for agent assignment.
    rotation: AtomicUsize,
}

#[derive(Debug, Deserialize)]
struct Payload<T> {
    payload: Vec<T>,
}

impl ChatwootClient {
    pub fn new(
        endpoint: String,
        account_id: u64,
        token: secrecy::Secret<String>,
    ) -> Result<Self, CrmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            account_id,
            token,
            client,
            rotation: AtomicUsize::new(0),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}{path}",
            self.endpoint, self.account_id
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, CrmError> {
        let resp = self
            .client
            .get(self.url(path))
            .header("api_access_token", self.token.expose_secret())
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, CrmError> {
        let resp = self
            .client
            .post(self.url(path))
            .header("api_access_token", self.token.expose_secret())
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, CrmError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CrmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| CrmError::Payload(format!("{e}: {body}")))
    }
}

#[async_trait]
impl CrmSync for ChatwootClient {
    async fn find_or_create_inbox(&self, name: &str) -> Result<Inbox, CrmError> {
        let inboxes: Payload<Inbox> = self.get_json("/inboxes").await?;
        if let Some(found) = inboxes.payload.into_iter().find(|i| i.name == name) {
            return Ok(found);
        }
        debug!(name, "creating CRM inbox");
        self.post_json(
            "/inboxes",
            &serde_json::json!({
                "name": name,
                "channel": { "type": "api", "webhook_url": "" },
            }),
        )
        .await
    }

    async fn find_or_create_contact(
        &self,
        phone: &str,
        name: &str,
        inbox_id: u64,
    ) -> Result<Contact, CrmError> {
        let hits: Payload<Contact> = self.get_json(&format!("/contacts/search?q={phone}")).await?;
        if let Some(found) = hits.payload.into_iter().next() {
            return Ok(found);
        }
        debug!(phone, "creating CRM contact");
        #[derive(Debug, Deserialize)]
        struct Created {
            payload: CreatedInner,
        }
        #[derive(Debug, Deserialize)]
        struct CreatedInner {
            contact: Contact,
        }
        let created: Created = self
            .post_json(
                "/contacts",
                &serde_json::json!({
                    "inbox_id": inbox_id,
                    "name": name,
                    "phone_number": format!("+{phone}"),
                }),
            )
            .await?;
        Ok(created.payload.contact)
    }

    async fn find_or_create_conversation(
        &self,
        inbox_id: u64,
        contact_id: u64,
        phone: &str,
    ) -> Result<(Conversation, bool), CrmError> {
        let existing: Payload<Conversation> = self
            .get_json(&format!("/contacts/{contact_id}/conversations"))
            .await?;
        if let Some(found) = existing.payload.into_iter().next() {
            return Ok((found, false));
        }
        debug!(contact_id, "creating CRM conversation");
        let created: Conversation = self
            .post_json(
                "/conversations",
                &serde_json::json!({
                    "inbox_id": inbox_id,
                    "contact_id": contact_id,
                    "source_id": phone,
                }),
            )
            .await?;
        Ok((created, true))
    }

    async fn next_agent(&self) -> Result<Option<CrmAgent>, CrmError> {
        let agents: Vec<CrmAgent> = self.get_json("/agents").await?;
        if agents.is_empty() {
            return Ok(None);
        }
        let idx = self.rotation.fetch_add(1, Ordering::SeqCst) % agents.len();
        Ok(agents.into_iter().nth(idx))
    }

    async fn assign_agent(&self, conversation_id: u64, agent_id: u64) -> Result<(), CrmError> {
        let _: serde_json::Value = self
            .post_json(
                &format!("/conversations/{conversation_id}/assignments"),
                &serde_json::json!({ "assignee_id": agent_id }),
            )
            .await?;
        Ok(())
    }

    async fn create_message(
        &self,
        conversation_id: u64,
        content: &str,
        direction: MessageDirection,
        attachment: Option<&Attachment>,
    ) -> Result<(), CrmError> {
        let mut body = serde_json::json!({
            "content": content,
            "message_type": direction.as_str(),
            "private": false,
        });
        if let Some(att) = attachment {
            body["content_attributes"] = serde_json::json!({
                "file_type": att.file_type,
                "file_url": att.file_url,
                "file_name": att.file_name,
            });
        }
        let _: serde_json::Value = self
            .post_json(&format!("/conversations/{conversation_id}/messages"), &body)
            .await?;
        Ok(())
    }

    async fn update_contact(
        &self,
        contact_id: u64,
        attrs: serde_json::Value,
    ) -> Result<(), CrmError> {
        let resp = self
            .client
            .put(self.url(&format!("/contacts/{contact_id}")))
            .header("api_access_token", self.token.expose_secret())
            .json(&attrs)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CrmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn client(url: String) -> ChatwootClient {
        ChatwootClient::new(url, 3, secrecy::Secret::new("cw-token".to_string())).unwrap()
    }

    #[tokio::test]
    async fn finds_existing_inbox_by_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/accounts/3/inboxes")
            .match_header("api_access_token", "cw-token")
            .with_body(r#"{"payload": [{"id": 5, "name": "Charla"}, {"id": 6, "name": "Otra"}]}"#)
            .create_async()
            .await;

        let inbox = client(server.url())
            .find_or_create_inbox("Charla")
            .await
            .unwrap();
        assert_eq!(inbox.id, 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn creates_inbox_when_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/accounts/3/inboxes")
            .with_body(r#"{"payload": []}"#)
            .create_async()
            .await;
        let created = server
            .mock("POST", "/api/v1/accounts/3/inboxes")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"name": "Charla"}),
            ))
            .with_body(r#"{"id": 11, "name": "Charla"}"#)
            .create_async()
            .await;

        let inbox = client(server.url())
            .find_or_create_inbox("Charla")
            .await
            .unwrap();
        assert_eq!(inbox.id, 11);
        created.assert_async().await;
    }

    #[tokio::test]
    async fn contact_search_hit_skips_creation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                "/api/v1/accounts/3/contacts/search?q=51999000111",
            )
            .with_body(r#"{"payload": [{"id": 8, "name": "Ana", "phone_number": "+51999000111"}]}"#)
            .create_async()
            .await;

        let contact = client(server.url())
            .find_or_create_contact("51999000111", "Ana", 5)
            .await
            .unwrap();
        assert_eq!(contact.id, 8);
    }

    #[tokio::test]
    async fn new_conversation_reports_created() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/accounts/3/contacts/8/conversations")
            .with_body(r#"{"payload": []}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/accounts/3/conversations")
            .with_body(r#"{"id": 99}"#)
            .create_async()
            .await;

        let (conversation, created) = client(server.url())
            .find_or_create_conversation(5, 8, "51999000111")
            .await
            .unwrap();
        assert_eq!(conversation.id, 99);
        assert!(created);
    }

    #[tokio::test]
    async fn message_carries_direction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/accounts/3/conversations/99/messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "content": "hola",
                "message_type": "outgoing",
            })))
            .with_body("{}")
            .create_async()
            .await;

        client(server.url())
            .create_message(99, "hola", MessageDirection::Outgoing, None)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn agents_rotate_round_robin() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/accounts/3/agents")
            .with_body(r#"[{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]"#)
            .expect(3)
            .create_async()
            .await;

        let crm = client(server.url());
        let first = crm.next_agent().await.unwrap().unwrap();
        let second = crm.next_agent().await.unwrap().unwrap();
        let third = crm.next_agent().await.unwrap().unwrap();
        assert_eq!((first.id, second.id, third.id), (1, 2, 1));
    }

    #[tokio::test]
    async fn api_error_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/accounts/3/inboxes")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let err = client(server.url())
            .find_or_create_inbox("Charla")
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Api { status: 401, .. }));
    }
}
