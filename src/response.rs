//! JSON response envelope
//!
//! Every endpoint answers `{ success, message?, data? }`.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: Some(message.into()), data: Some(data) }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), data: None }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total_pages = (total + limit as i64 - 1) / limit.max(1) as i64;
        Self { page, limit, total, total_pages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let v = serde_json::to_value(ApiResponse::data(42)).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["data"], 42);
        assert!(v.get("message").is_none());
    }

    #[test]
    fn test_message_only() {
        let v = serde_json::to_value(ApiResponse::message("ok")).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["message"], "ok");
        assert!(v.get("data").is_none());
    }

    #[test]
    fn test_pagination_rounding() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);
        let p = Pagination::new(2, 10, 20);
        assert_eq!(p.total_pages, 2);
    }
}
