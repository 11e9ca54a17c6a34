use std::time::Duration;

use taskbell_client::alert::{DEFAULT_CHIME, SoundMode, Tone};
use taskbell_client::config::{self, ClientConfig, load_config, parse_config, save_config};

#[test]
fn minimal_config_uses_widget_defaults() {
    let cfg = parse_config("server_url: tm.example.com/\n").unwrap();
    assert_eq!(cfg.server_url, "http://tm.example.com");
    assert_eq!(cfg.poll_path, None);
    assert_eq!(cfg.seed.messages, 0);
    assert!(cfg.page.header_bell);
    assert!(!cfg.page.approvals_link);
    assert_eq!(cfg.sound, SoundMode::Auto);
    assert_eq!(cfg.chime, DEFAULT_CHIME.to_vec());

    let s = cfg.notifier_settings();
    assert_eq!(s.initial_delay, Duration::from_millis(500));
    assert_eq!(s.interval, Duration::from_millis(7000));
    assert_eq!(s.alert_delay, Duration::from_millis(200));
}

#[test]
fn full_config_parses() {
    let yaml = r#"
server_url: https://tm.example.com
poll_path: /tm/notifications/poll
interval_ms: 3000
seed:
  messages: 2
  approvals: 5
page:
  approvals_link: true
  cards: ["7", "8"]
sound: bell
chime: [[440, 100], [0, 50]]
"#;
    let cfg = parse_config(yaml).unwrap();
    assert_eq!(cfg.poll_path.as_deref(), Some("/tm/notifications/poll"));
    assert_eq!(cfg.interval_ms, 3000);
    assert_eq!(cfg.initial_delay_ms, 500);
    assert_eq!((cfg.seed.messages, cfg.seed.approvals), (2, 5));
    assert!(cfg.page.approvals_link);
    assert_eq!(cfg.page.cards, vec!["7".to_string(), "8".to_string()]);
    assert_eq!(cfg.sound, SoundMode::Bell);
    assert_eq!(cfg.chime, vec![Tone::new(440.0, 100), Tone::new(0.0, 50)]);
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sub").join("client.yaml");
    let mut cfg = ClientConfig::new("127.0.0.1:5000");
    cfg.state_path = Some(dir.path().join("state.json"));
    save_config(&path, &cfg).unwrap();
    let loaded = load_config(&path).unwrap();
    assert_eq!(loaded.server_url, "http://127.0.0.1:5000");
    assert_eq!(loaded.resolved_state_path(), cfg.state_path);
}

#[test]
fn invalid_server_url_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client.yaml");
    std::fs::write(&path, "server_url: \"http://exa mple\"\n").unwrap();
    assert!(load_config(&path).is_err());
}

#[test]
fn normalize_keeps_scheme_and_strips_slash() {
    assert_eq!(config::normalize_server_url(" https://a.b/ "), "https://a.b");
    assert_eq!(config::normalize_server_url("a.b:80"), "http://a.b:80");
}
