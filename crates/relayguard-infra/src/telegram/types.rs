//! Telegram Bot API wire types.
//!
//! Only the fields the dispatcher consumes are modeled; everything else in
//! the update payload is ignored during deserialization.

use serde::Deserialize;

/// One incoming update from the webhook endpoint.
///
/// Exactly one of the payload fields is normally present; the dispatcher
/// checks them in order.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<TgMessage>,
    pub business_message: Option<TgMessage>,
    pub edited_business_message: Option<TgMessage>,
    pub deleted_business_messages: Option<serde_json::Value>,
    pub business_connection: Option<BusinessConnection>,
}

/// A chat message, standard or business.
#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub chat: TgChat,
    pub from: Option<TgUser>,
    pub text: Option<String>,
    /// Unix timestamp of the message.
    pub date: i64,
    /// Present only on business messages relayed through a connection.
    pub business_connection_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

/// A business connection lifecycle event. `is_enabled = false` means the
/// owner revoked the connection.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessConnection {
    pub id: String,
    pub user: TgUser,
    pub is_enabled: bool,
}

/// Result of `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotProfile {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_business_message_update() {
        let json = r#"{
            "update_id": 7,
            "business_message": {
                "business_connection_id": "conn1",
                "chat": {"id": 42},
                "from": {"id": 777, "first_name": "Ivan", "username": "ivan77"},
                "date": 1717243200,
                "text": "Hello, I need 500m of cotton fabric"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let msg = update.business_message.unwrap();
        assert_eq!(msg.chat.id, 42);
        assert_eq!(msg.business_connection_id.as_deref(), Some("conn1"));
        assert_eq!(msg.from.unwrap().id, 777);
        assert!(update.message.is_none());
    }

    #[test]
    fn test_deserialize_connection_update() {
        let json = r#"{
            "update_id": 8,
            "business_connection": {
                "id": "conn1",
                "user": {"id": 555, "first_name": "Elena"},
                "user_chat_id": 555,
                "date": 1717243200,
                "is_enabled": true
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let conn = update.business_connection.unwrap();
        assert_eq!(conn.id, "conn1");
        assert_eq!(conn.user.id, 555);
        assert!(conn.is_enabled);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{
            "update_id": 9,
            "message": {
                "message_id": 100,
                "chat": {"id": 1, "type": "private"},
                "from": {"id": 10, "is_bot": false},
                "date": 1717243200,
                "text": "/start",
                "entities": [{"type": "bot_command", "offset": 0, "length": 6}]
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.message.unwrap().text.as_deref(), Some("/start"));
    }

    #[test]
    fn test_message_without_text() {
        let json = r#"{
            "update_id": 10,
            "message": {"chat": {"id": 1}, "date": 1717243200, "photo": []}
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert!(update.message.unwrap().text.is_none());
    }
}
