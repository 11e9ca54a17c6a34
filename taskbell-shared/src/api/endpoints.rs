use super::{LOGIN_PATH, NOTIFICATIONS_POLL_PATH};

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

/// Poll endpoint; `path` overrides the default route when the server mounts it elsewhere.
pub fn notifications_poll(base: &str, path: Option<&str>) -> String {
    base_join(base, path.unwrap_or(NOTIFICATIONS_POLL_PATH))
}
pub fn login(base: &str) -> String {
    base_join(base, LOGIN_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_doubled_slashes() {
        assert_eq!(
            notifications_poll("http://h:5000/", None),
            "http://h:5000/notifications/poll"
        );
        assert_eq!(
            notifications_poll("http://h", Some("/tm/notifications/poll")),
            "http://h/tm/notifications/poll"
        );
        assert_eq!(login("https://tm.example"), "https://tm.example/login");
    }

    #[test]
    fn session_cookie_keeps_name_value_pairs() {
        let c = crate::api::SessionCookie::from_set_cookie([
            "session=abc.def; HttpOnly; Path=/",
            "remember_token=1|xyz; Expires=Wed, 21 Oct 2026 07:28:00 GMT",
        ])
        .unwrap();
        assert_eq!(c.as_header(), "session=abc.def; remember_token=1|xyz");
        assert!(crate::api::SessionCookie::from_set_cookie(["; Path=/"]).is_none());
    }
}
