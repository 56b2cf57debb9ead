//! Dispatcher: acts on routing decisions for each incoming update.
//!
//! The dispatcher owns the glue the router deliberately does not: mapping
//! wire updates to domain events, command replies for direct chats, reply
//! generation with a static fallback, channel selection for the outgoing
//! send (business relay first, standard send as fallback), and feeding every
//! delivered reply back into the loop detector.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use relayguard_core::generator::ReplyGenerator;
use relayguard_core::outbound::MessageSender;
use relayguard_core::repository::ConnectionRepository;
use relayguard_core::router::MessageRouter;
use relayguard_infra::telegram::types::{TgMessage, Update};
use relayguard_types::connection::ConnectionUpsert;
use relayguard_types::event::{ConnectionUpdate, InboundMessage};
use relayguard_types::routing::RouteDecision;

const WELCOME_REPLY: &str = "Привет! Я консультант Textil PRO. Напишите ваш вопрос о \
                             текстильном производстве, и я с радостью помогу!";

const HELP_REPLY: &str = "Команды:\n/start - начать работу\n/help - показать помощь\n\n\
                          Просто напишите ваш вопрос о текстильном производстве.";

pub struct Dispatcher<R, G, S>
where
    R: ConnectionRepository,
    G: ReplyGenerator,
    S: MessageSender,
{
    router: Arc<MessageRouter<R>>,
    generator: Arc<G>,
    sender: Arc<S>,
    fallback_reply: String,
}

impl<R, G, S> Clone for Dispatcher<R, G, S>
where
    R: ConnectionRepository,
    G: ReplyGenerator,
    S: MessageSender,
{
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            generator: Arc::clone(&self.generator),
            sender: Arc::clone(&self.sender),
            fallback_reply: self.fallback_reply.clone(),
        }
    }
}

impl<R, G, S> Dispatcher<R, G, S>
where
    R: ConnectionRepository,
    G: ReplyGenerator,
    S: MessageSender,
{
    pub fn new(
        router: Arc<MessageRouter<R>>,
        generator: Arc<G>,
        sender: Arc<S>,
        fallback_reply: String,
    ) -> Self {
        Self {
            router,
            generator,
            sender,
            fallback_reply,
        }
    }

    /// Process one update to completion. Never fails: every error path
    /// degrades to a logged fallback, so a bad update can cost at most its
    /// own reply.
    pub async fn handle_update(&self, update: Update) {
        let update_id = update.update_id;
        if let Some(message) = update.business_message {
            self.handle_business_message(message).await;
        } else if let Some(connection) = update.business_connection {
            let lifecycle = if connection.is_enabled {
                ConnectionUpdate::Established {
                    connection_id: connection.id,
                    owner_user_id: connection.user.id,
                    owner_name: connection.user.first_name,
                    owner_username: connection.user.username,
                }
            } else {
                ConnectionUpdate::Revoked {
                    connection_id: connection.id,
                }
            };
            self.apply_connection_update(lifecycle).await;
        } else if let Some(message) = update.message {
            self.handle_direct_message(message).await;
        } else if update.edited_business_message.is_some()
            || update.deleted_business_messages.is_some()
        {
            tracing::debug!(update_id, "edited/deleted business update ignored");
        } else {
            tracing::debug!(update_id, "unhandled update kind");
        }
    }

    /// Apply a connection lifecycle event to the ownership registry.
    pub async fn apply_connection_update(&self, update: ConnectionUpdate) {
        match update {
            ConnectionUpdate::Established {
                connection_id,
                owner_user_id,
                owner_name,
                owner_username,
            } => {
                self.router
                    .ownership()
                    .record_connection(&ConnectionUpsert {
                        connection_id,
                        owner_user_id,
                        owner_name,
                        owner_username,
                        is_active: true,
                    })
                    .await;
            }
            ConnectionUpdate::Revoked { connection_id } => {
                self.router.ownership().deactivate(&connection_id).await;
            }
        }
    }

    async fn handle_business_message(&self, message: TgMessage) {
        let chat_id = message.chat.id;
        let Some(text) = message.text.filter(|text| !text.is_empty()) else {
            tracing::debug!(chat_id, "business message without text dropped");
            return;
        };
        let Some(sender) = message.from else {
            tracing::debug!(chat_id, "business message without sender dropped");
            return;
        };
        if message.business_connection_id.is_none() {
            tracing::warn!(chat_id, sender_id = sender.id, "business message without connection id");
        }

        let inbound = InboundMessage {
            connection_id: message.business_connection_id,
            sender_id: sender.id,
            chat_id,
            text,
            from_business_channel: true,
            event_time: event_time(message.date),
        };

        match self.router.route(&inbound, Utc::now()).await {
            RouteDecision::OwnerSpeaking => {
                // Log only; the owner is handling this conversation.
            }
            RouteDecision::Ignore(reason) => {
                tracing::info!(chat_id, reason = %reason, "business message dropped");
            }
            RouteDecision::CustomerMessage => {
                let display_name = sender
                    .first_name
                    .clone()
                    .unwrap_or_else(|| "Клиент".to_string());
                let session_id = format!("business_{}", sender.id);
                let reply = self.generate_reply(&inbound.text, &session_id, &display_name).await;
                if self
                    .deliver(chat_id, &reply, inbound.connection_id.as_deref())
                    .await
                {
                    self.router.record_outgoing(&reply, chat_id, Utc::now());
                }
            }
        }
    }

    async fn handle_direct_message(&self, message: TgMessage) {
        let chat_id = message.chat.id;
        let Some(text) = message.text.filter(|text| !text.is_empty()) else {
            tracing::debug!(chat_id, "direct message without text dropped");
            return;
        };
        let Some(sender) = message.from else {
            tracing::debug!(chat_id, "direct message without sender dropped");
            return;
        };

        if text.starts_with("/start") {
            self.deliver(chat_id, WELCOME_REPLY, None).await;
            return;
        }
        if text.starts_with("/help") {
            self.deliver(chat_id, HELP_REPLY, None).await;
            return;
        }

        let inbound = InboundMessage {
            connection_id: None,
            sender_id: sender.id,
            chat_id,
            text,
            from_business_channel: false,
            event_time: event_time(message.date),
        };

        // Off-relay traffic always routes as a customer message; the call
        // keeps direct chat on the same pipeline as the relay.
        if self.router.route(&inbound, Utc::now()).await == RouteDecision::CustomerMessage {
            let display_name = sender
                .first_name
                .clone()
                .unwrap_or_else(|| "Пользователь".to_string());
            let session_id = format!("user_{}", sender.id);
            let reply = self.generate_reply(&inbound.text, &session_id, &display_name).await;
            self.deliver(chat_id, &reply, None).await;
        }
    }

    async fn generate_reply(&self, text: &str, session_id: &str, display_name: &str) -> String {
        match self.generator.generate(text, session_id, display_name).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(session_id, error = %err, "reply generation failed, using fallback");
                self.fallback_reply.clone()
            }
        }
    }

    /// Send a reply, preferring the business relay when a connection id is
    /// present. Returns whether any send succeeded.
    async fn deliver(&self, chat_id: i64, text: &str, connection_id: Option<&str>) -> bool {
        if let Some(connection_id) = connection_id {
            match self.sender.send_business(chat_id, text, connection_id).await {
                Ok(()) => return true,
                Err(err) => {
                    tracing::error!(
                        chat_id,
                        connection_id,
                        error = %err,
                        "business send failed, falling back to standard send"
                    );
                }
            }
        }
        match self.sender.send_standard(chat_id, text).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(chat_id, error = %err, "standard send failed");
                false
            }
        }
    }
}

fn event_time(unix: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix, 0).unwrap_or_else(Utc::now)
}
