//! OAuth 2.0 endpoints and scopes for the Photos Library API

pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Append-only upload plus access to albums this app created.
pub const PHOTOS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/photoslibrary.appendonly",
    "https://www.googleapis.com/auth/photoslibrary.readonly.appcreateddata",
    "https://www.googleapis.com/auth/photoslibrary.edit.appcreateddata",
];

/// Scopes joined the way the authorization endpoint expects them
pub fn scope_param() -> String {
    PHOTOS_SCOPES.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_param_is_space_separated() {
        let scopes = scope_param();
        assert_eq!(scopes.split(' ').count(), 3);
        assert!(scopes.starts_with("https://www.googleapis.com/auth/photoslibrary.appendonly"));
    }
}
