//! Provider payload normalization
//!
//! Converts raw message payloads into [`EmailDetail`] records, decoding the
//! transport-safe base64 body encoding along the way. Missing fields
//! degrade to documented defaults rather than failing the fetch.

use base64::Engine;

use super::api::{GmailMessage, MessagePayload};
use crate::models::{EmailDetail, MessageId};

/// Normalize a provider message into an [`EmailDetail`]
pub fn normalize_detail(id: MessageId, message: &GmailMessage) -> EmailDetail {
    let Some(payload) = &message.payload else {
        return EmailDetail {
            id,
            subject: EmailDetail::NO_SUBJECT.into(),
            sender: EmailDetail::UNKNOWN_SENDER.into(),
            body: EmailDetail::NO_BODY.into(),
        };
    };

    let subject =
        extract_header(payload, "Subject").unwrap_or_else(|| EmailDetail::NO_SUBJECT.into());
    let sender =
        extract_header(payload, "From").unwrap_or_else(|| EmailDetail::UNKNOWN_SENDER.into());
    let body = extract_plain_text_body(payload).unwrap_or_else(|| EmailDetail::NO_BODY.into());

    EmailDetail {
        id,
        subject,
        sender,
        body,
    }
}

/// Extract a header value by name (case-insensitive, first match wins)
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Locate and decode the plain-text body of a message.
///
/// Multipart messages use the first part whose media type is exactly
/// `text/plain`; a part with no data (or an empty string) counts as
/// absent, so the top-level body is still consulted.
fn extract_plain_text_body(payload: &MessagePayload) -> Option<String> {
    let part_data = payload.parts.as_ref().and_then(|parts| {
        parts
            .iter()
            .find(|p| p.mime_type.as_deref() == Some("text/plain"))
            .and_then(|p| p.body.as_ref())
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    });

    let data = part_data.or_else(|| {
        payload
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
    })?;

    if data.is_empty() {
        return None;
    }
    decode_transport_base64(data)
}

/// Decode transport-safe base64 body data.
///
/// The provider uses the URL-safe alphabet: substitute `-` with `+` and
/// `_` with `/`, then standard base64 decode. Padding varies, so an
/// unpadded decode is attempted as a fallback.
pub fn decode_transport_base64(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

    let normalized: String = data
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    for engine in [&STANDARD, &STANDARD_NO_PAD] {
        if let Ok(decoded) = engine.decode(&normalized)
            && let Ok(text) = String::from_utf8(decoded)
        {
            return Some(text);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessageBody, MessagePart};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn make_payload(headers: Vec<(&str, &str)>) -> MessagePayload {
        MessagePayload {
            headers: Some(
                headers
                    .into_iter()
                    .map(|(n, v)| Header {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            ),
            body: None,
            parts: None,
            mime_type: Some("text/plain".to_string()),
        }
    }

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    #[test]
    fn test_extract_header_case_insensitive_first_wins() {
        let payload = make_payload(vec![
            ("FROM", "first@example.com"),
            ("From", "second@example.com"),
        ]);
        assert_eq!(
            extract_header(&payload, "from"),
            Some("first@example.com".to_string())
        );
    }

    #[test]
    fn test_decode_round_trips_unicode() {
        let original = "Grüße aus Zürich — see you at 09:00 🎉";
        let decoded = decode_transport_base64(&encode(original));
        assert_eq!(decoded.as_deref(), Some(original));
    }

    #[test]
    fn test_decode_accepts_padded_input() {
        use base64::engine::general_purpose::URL_SAFE;
        let encoded = URL_SAFE.encode("Hello, World!".as_bytes());
        assert_eq!(
            decode_transport_base64(&encoded).as_deref(),
            Some("Hello, World!")
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_transport_base64("!!not base64!!"), None);
    }

    #[test]
    fn test_normalize_missing_fields_use_defaults() {
        let message = GmailMessage {
            id: "m1".into(),
            payload: None,
        };
        let detail = normalize_detail(MessageId::new("m1"), &message);
        assert_eq!(detail.subject, EmailDetail::NO_SUBJECT);
        assert_eq!(detail.sender, EmailDetail::UNKNOWN_SENDER);
        assert_eq!(detail.body, EmailDetail::NO_BODY);
    }

    #[test]
    fn test_normalize_prefers_plain_text_part() {
        let mut payload = make_payload(vec![("Subject", "Hi"), ("From", "a@b.com")]);
        payload.body = Some(MessageBody {
            data: Some(encode("top-level body")),
        });
        payload.parts = Some(vec![
            MessagePart {
                mime_type: Some("text/html".into()),
                body: Some(MessageBody {
                    data: Some(encode("<b>html</b>")),
                }),
                parts: None,
            },
            MessagePart {
                mime_type: Some("text/plain".into()),
                body: Some(MessageBody {
                    data: Some(encode("plain body")),
                }),
                parts: None,
            },
        ]);

        let message = GmailMessage {
            id: "m1".into(),
            payload: Some(payload),
        };
        let detail = normalize_detail(MessageId::new("m1"), &message);
        assert_eq!(detail.subject, "Hi");
        assert_eq!(detail.sender, "a@b.com");
        assert_eq!(detail.body, "plain body");
    }

    #[test]
    fn test_normalize_falls_back_to_top_level_body() {
        let mut payload = make_payload(vec![("Subject", "Hi"), ("From", "a@b.com")]);
        payload.body = Some(MessageBody {
            data: Some(encode("top-level body")),
        });
        payload.parts = Some(vec![MessagePart {
            mime_type: Some("text/html".into()),
            body: Some(MessageBody {
                data: Some(encode("<b>html</b>")),
            }),
            parts: None,
        }]);

        let message = GmailMessage {
            id: "m1".into(),
            payload: Some(payload),
        };
        let detail = normalize_detail(MessageId::new("m1"), &message);
        assert_eq!(detail.body, "top-level body");
    }

    #[test]
    fn test_normalize_empty_part_data_falls_back_to_top_level_body() {
        let mut payload = make_payload(vec![("Subject", "Hi"), ("From", "a@b.com")]);
        payload.body = Some(MessageBody {
            data: Some(encode("top-level body")),
        });
        payload.parts = Some(vec![MessagePart {
            mime_type: Some("text/plain".into()),
            body: Some(MessageBody {
                data: Some(String::new()),
            }),
            parts: None,
        }]);

        let message = GmailMessage {
            id: "m1".into(),
            payload: Some(payload),
        };
        let detail = normalize_detail(MessageId::new("m1"), &message);
        assert_eq!(detail.body, "top-level body");
    }

    #[test]
    fn test_normalize_empty_body_data_degrades() {
        let mut payload = make_payload(vec![("Subject", "Hi")]);
        payload.body = Some(MessageBody {
            data: Some(String::new()),
        });
        let message = GmailMessage {
            id: "m1".into(),
            payload: Some(payload),
        };
        let detail = normalize_detail(MessageId::new("m1"), &message);
        assert_eq!(detail.body, EmailDetail::NO_BODY);
    }
}
