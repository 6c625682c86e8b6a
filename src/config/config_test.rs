use super::*;

#[test]
fn test_default_settings() {
    let settings = Settings::default();

    assert_eq!(settings.coordination.endpoints, vec!["127.0.0.1:2181".to_string()]);
    assert_eq!(settings.coordination.connect_timeout_in_ms, 3000);
    assert_eq!(settings.coordination.namespace_suffix, "default");
    assert_eq!(settings.notification.lock_timeout_in_ms, 1000);
    assert_eq!(settings.notification.notification_timeout_in_ms, 5000);
    assert_eq!(settings.retry.session.max_retries, 3);
    assert_eq!(settings.retry.cleanup.max_retries, 2);
}

#[test]
fn test_load_without_file_uses_defaults() {
    let settings = Settings::load(None).expect("load should succeed without a file");

    assert_eq!(settings.notification.lock_timeout_in_ms, 1000);
    assert_eq!(settings.retry.session.timeout_ms, 3000);
}

#[test]
fn test_notification_timeout_conversions() {
    let config = NotificationConfig {
        lock_timeout_in_ms: 250,
        notification_timeout_in_ms: 1500,
    };

    assert_eq!(config.lock_timeout(), std::time::Duration::from_millis(250));
    assert_eq!(config.notification_timeout(), std::time::Duration::from_millis(1500));
}
