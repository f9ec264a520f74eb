use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::{debug, trace};
use loyalty_engine::db_types::UserId;

use crate::errors::ServerError;

/// The header the authenticating gateway uses to tell us who the caller is.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated caller. Extracting this from a request fails with `401 Unauthorized` if the `X-User-Id` header is
/// missing or is not a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl AuthenticatedUser {
    pub fn id(&self) -> UserId {
        self.0
    }
}

pub fn user_id_from_request(req: &HttpRequest) -> Result<UserId, ServerError> {
    let header = req
        .headers()
        .get(USER_ID_HEADER)
        .ok_or_else(|| ServerError::Unauthenticated(format!("The {USER_ID_HEADER} header is missing")))?;
    let user_id = header
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<UserId>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            debug!("💻️ Rejecting request with an invalid {USER_ID_HEADER} header: {header:?}");
            ServerError::Unauthenticated(format!("The {USER_ID_HEADER} header is invalid"))
        })?;
    trace!("💻️ Request from user #{user_id}");
    Ok(user_id)
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(user_id_from_request(req).map(AuthenticatedUser))
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn user_id_header() {
        let req = TestRequest::default().insert_header((USER_ID_HEADER, "42")).to_http_request();
        assert_eq!(user_id_from_request(&req).unwrap(), 42);
        let req = TestRequest::default().to_http_request();
        assert!(matches!(user_id_from_request(&req), Err(ServerError::Unauthenticated(_))));
        for bad in ["", "abc", "0", "-3", "1.5"] {
            let req = TestRequest::default().insert_header((USER_ID_HEADER, bad)).to_http_request();
            assert!(user_id_from_request(&req).is_err(), "{bad} should be rejected");
        }
    }
}
