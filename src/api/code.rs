use axum::http::StatusCode;

/// HTTP-status-class tag carried by every error and every success envelope.
/// The set is fixed at compile time; the wire format is the numeric status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
}

impl Code {
    pub const fn as_u16(self) -> u16 {
        match self {
            Code::Ok => 200,
            Code::BadRequest => 400,
            Code::Unauthorized => 401,
            Code::Forbidden => 403,
            Code::NotFound => 404,
        }
    }

    pub fn status(self) -> StatusCode {
        // All five variants map to well-known status codes
        StatusCode::from_u16(self.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_to_http_statuses() {
        assert_eq!(Code::Ok.as_u16(), 200);
        assert_eq!(Code::BadRequest.as_u16(), 400);
        assert_eq!(Code::Unauthorized.as_u16(), 401);
        assert_eq!(Code::Forbidden.as_u16(), 403);
        assert_eq!(Code::NotFound.as_u16(), 404);
    }

    #[test]
    fn test_status_conversion() {
        assert_eq!(Code::Forbidden.status(), StatusCode::FORBIDDEN);
    }
}
