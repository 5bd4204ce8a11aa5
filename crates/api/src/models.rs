use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Authentication
// ============================================================================

/// Token pair returned by POST /token/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    /// Issued by some deployments only; stored but never used for renewal
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Registration payload for POST /students/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterStudent {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
}

// ============================================================================
// Entities mirrored from server responses
// ============================================================================

/// The authenticated user record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub faculty: String,
    #[serde(default)]
    pub speciality: String,
    /// Balance available for ticket purchases
    pub wallet_balance: f64,
}

/// A student club
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Membership row as served by GET /clubs/{id}/members/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubMember {
    pub id: i64,
    pub user: i64,
    pub username: String,
    pub club: i64,
    pub club_name: String,
    /// "member" or "head"
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// Admission kind on the wire; servers send lowercase strings.
/// Unrecognized values decode as `Other` rather than failing the whole list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Free,
    Paid,
    #[serde(other)]
    Other,
}

/// An event hosted by a club
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub club: i64,
    pub club_name: String,
    pub room: i64,
    pub room_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub ticket_price: f64,
    pub ticket_type: TicketType,
    pub total_tickets: i64,
    pub tickets_available: i64,
    pub tickets_sold: i64,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Whether admission is free (price display and the free/paid filter)
    pub fn is_free(&self) -> bool {
        self.ticket_type == TicketType::Free || self.ticket_price == 0.0
    }

    /// Sold out events have their purchase action disabled client-side
    pub fn is_sold_out(&self) -> bool {
        self.tickets_available <= 0
    }
}

/// A review left on an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventReview {
    pub id: i64,
    pub event: i64,
    pub event_title: String,
    pub user: i64,
    pub user_username: String,
    /// 1 through 5 stars
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A purchased event ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub student: i64,
    pub student_username: String,
    pub event: i64,
    pub event_title: String,
    pub purchased_at: DateTime<Utc>,
}

/// A club subscription (notifications-only relationship, distinct from membership)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user: i64,
    pub club: i64,
    pub club_name: String,
    pub subscribed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_deserialization() {
        let json = r#"{"id":7,"username":"ada","email":"ada@uni.edu","faculty":"CS","speciality":"SE","wallet_balance":42.5}"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert_eq!(student.id, 7);
        assert_eq!(student.username, "ada");
        assert!((student.wallet_balance - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_student_missing_optional_profile_fields() {
        let json = r#"{"id":1,"username":"bob","email":"bob@uni.edu","wallet_balance":0.0}"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert_eq!(student.faculty, "");
        assert_eq!(student.speciality, "");
    }

    #[test]
    fn test_event_deserialization_and_flags() {
        let json = r#"{
            "id": 3,
            "title": "Rust Workshop",
            "description": "Intro to ownership",
            "club": 1,
            "club_name": "Programming Club",
            "room": 9,
            "room_name": "B-204",
            "start_date": "2025-05-01T18:00:00Z",
            "end_date": "2025-05-01T20:00:00Z",
            "ticket_price": 0.0,
            "ticket_type": "free",
            "total_tickets": 50,
            "tickets_available": 0,
            "tickets_sold": 50,
            "image": null,
            "created_at": "2025-04-01T09:30:00Z"
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert!(event.is_free());
        assert!(event.is_sold_out());
        assert_eq!(event.ticket_type, TicketType::Free);
        assert_eq!(event.club_name, "Programming Club");
    }

    #[test]
    fn test_unknown_ticket_type_falls_back_to_other() {
        let json = r#""donation""#;
        let kind: TicketType = serde_json::from_str(json).unwrap();
        assert_eq!(kind, TicketType::Other);
        assert_eq!(
            serde_json::to_string(&TicketType::Paid).unwrap(),
            r#""paid""#
        );
    }

    #[test]
    fn test_auth_tokens_without_refresh() {
        let tokens: AuthTokens = serde_json::from_str(r#"{"access":"abc"}"#).unwrap();
        assert_eq!(tokens.access, "abc");
        assert!(tokens.refresh.is_none());
    }

    #[test]
    fn test_register_payload_skips_absent_fields() {
        let payload = RegisterStudent {
            username: "ada".into(),
            email: "ada@uni.edu".into(),
            password: "secret1".into(),
            password2: "secret1".into(),
            faculty: None,
            speciality: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"username\":\"ada\""));
        assert!(!json.contains("faculty"));
        assert!(!json.contains("speciality"));
    }

    #[test]
    fn test_ticket_roundtrip() {
        let json = r#"{"id":11,"student":7,"student_username":"ada","event":3,"event_title":"Rust Workshop","purchased_at":"2025-04-20T12:00:00Z"}"#;
        let ticket: Ticket = serde_json::from_str(json).unwrap();
        let back = serde_json::to_string(&ticket).unwrap();
        let again: Ticket = serde_json::from_str(&back).unwrap();
        assert_eq!(again.id, 11);
        assert_eq!(again.event_title, "Rust Workshop");
    }
}
