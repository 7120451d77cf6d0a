//! Yammer API wire types.
//!
//! Only the fields the relay uses or logs are modelled; everything else in
//! the responses is ignored. Most fields default so that sparse responses
//! (e.g. system messages without a web link) still decode, and an explicit
//! `null` reads the same as a missing key.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat `null` like an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Plain text body of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default, deserialize_with = "nullable")]
    pub plain: String,
}

/// A single message as returned by the messages endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    #[serde(default)]
    pub replied_to_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub thread_id: i64,
    /// Group the message was posted to, absent for private messages.
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: String,
    #[serde(default, deserialize_with = "nullable")]
    pub sender_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub body: MessageBody,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub client_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub direct_message: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub privacy: String,
}

/// Feed metadata. Decoded but not acted upon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedMeta {
    #[serde(deserialize_with = "nullable")]
    pub older_available: bool,
    pub requested_poll_interval: Option<u64>,
    pub last_seen_message_id: Option<i64>,
    pub unseen_thread_count: Option<u64>,
    pub current_user_id: Option<i64>,
    #[serde(deserialize_with = "nullable")]
    pub feed_name: String,
    #[serde(deserialize_with = "nullable")]
    pub feed_desc: String,
}

/// Response of `messages/private.json` and `messages/in_group/<id>.json`.
///
/// `messages` is ordered newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(default, deserialize_with = "nullable")]
    pub messages: Vec<Message>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta: FeedMeta,
}

/// Response of `users/current.json` and `users/<id>.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub state: String,
    #[serde(deserialize_with = "nullable")]
    pub job_title: String,
    #[serde(deserialize_with = "nullable")]
    pub location: String,
    #[serde(deserialize_with = "nullable")]
    pub full_name: String,
    #[serde(deserialize_with = "nullable")]
    pub first_name: String,
    #[serde(deserialize_with = "nullable")]
    pub last_name: String,
    #[serde(deserialize_with = "nullable")]
    pub web_url: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub mugshot_url: String,
    #[serde(deserialize_with = "nullable")]
    pub timezone: String,
    #[serde(deserialize_with = "nullable")]
    pub email: String,
}

/// Group record from `groups/for_user/<id>.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
    pub id: i64,
    #[serde(deserialize_with = "nullable")]
    pub full_name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decodes_sparse_messages() {
        let json = r#"{
            "messages": [
                {"id": 108, "sender_id": 7, "thread_id": 100, "body": {"plain": "hi"}},
                {"id": 107, "sender_id": 8, "web_url": "https://www.yammer.com/x/107",
                 "group_id": 42, "direct_message": false}
            ],
            "meta": {"requested_poll_interval": 60, "last_seen_message_id": null,
                     "feed_name": "Company Feed"}
        }"#;

        let envelope: MessageEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.messages.len(), 2);
        assert_eq!(envelope.messages[0].body.plain, "hi");
        assert_eq!(envelope.messages[1].group_id, Some(42));
        assert_eq!(envelope.meta.requested_poll_interval, Some(60));
        assert_eq!(envelope.meta.last_seen_message_id, None);
    }

    #[test]
    fn test_user_profile_type_field() {
        let json = r#"{"type": "user", "id": 7, "full_name": "Ada Lovelace",
                       "mugshot_url": "https://mug0.assets-yammer.com/7.jpg"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.kind, "user");
        assert_eq!(profile.full_name, "Ada Lovelace");
    }

    #[test]
    fn test_message_requires_id() {
        let err = serde_json::from_str::<Message>(r#"{"sender_id": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_null_strings_decode_as_empty() {
        let groups: Vec<Group> = serde_json::from_str(
            r#"[{"id": 10, "full_name": "Eng", "description": null, "type": null}]"#,
        )
        .unwrap();
        assert_eq!(groups[0].full_name, "Eng");
        assert_eq!(groups[0].description, "");

        let profile: UserProfile = serde_json::from_str(
            r#"{"id": 7, "full_name": "Ada", "location": null, "job_title": null,
                "email": null, "mugshot_url": "https://example.com/7.jpg"}"#,
        )
        .unwrap();
        assert_eq!(profile.location, "");
        assert_eq!(profile.mugshot_url, "https://example.com/7.jpg");

        let message: Message = serde_json::from_str(
            r#"{"id": 1, "sender_id": 2, "created_at": null, "privacy": null,
                "body": {"plain": null}, "direct_message": null}"#,
        )
        .unwrap();
        assert_eq!(message.body.plain, "");
        assert!(!message.direct_message);
    }
}
