use clap::Parser;

use super::*;

fn raw_with_database() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.database.url = Some("postgres://reelhouse@localhost/catalog".to_string());
    raw
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = raw_with_database();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw, EntityKind::Movie).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_follow_the_service_kind() {
    let movies = Settings::from_raw(raw_with_database(), EntityKind::Movie).expect("movies");
    assert_eq!(movies.server.addr.port(), 8082);
    assert_eq!(movies.events.topic, "movie-events");

    let users = Settings::from_raw(raw_with_database(), EntityKind::User).expect("users");
    assert_eq!(users.server.addr.port(), 8081);
    assert_eq!(users.events.topic, "user-events");
}

#[test]
fn dependency_defaults() {
    let settings = Settings::from_raw(raw_with_database(), EntityKind::Movie).expect("settings");

    assert_eq!(settings.cache.ttl, Duration::from_secs(86_400));
    assert_eq!(settings.cache.url, "redis://127.0.0.1:6379");
    assert_eq!(settings.events.brokers, "127.0.0.1:9092");
    assert_eq!(settings.events.queue_capacity.get(), 1024);
    assert_eq!(settings.bootstrap.max_attempts.get(), 10);
    assert_eq!(settings.bootstrap.interval, Duration::from_secs(2));
    assert_eq!(settings.database.statement_timeout, Duration::from_secs(5));
}

#[test]
fn database_url_is_required() {
    let err = Settings::from_raw(RawSettings::default(), EntityKind::Movie)
        .expect_err("missing url must be rejected");
    assert!(matches!(err, LoadError::Invalid { key: "database.url", .. }));

    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    assert!(Settings::from_raw(raw, EntityKind::Movie).is_err());
}

#[test]
fn zero_counts_are_rejected_with_their_key() {
    let mut raw = raw_with_database();
    raw.bootstrap.max_attempts = Some(0);
    let err = Settings::from_raw(raw, EntityKind::Movie).expect_err("zero attempts");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "bootstrap.max_attempts",
            ..
        }
    ));

    let mut raw = raw_with_database();
    raw.events.queue_capacity = Some(0);
    let err = Settings::from_raw(raw, EntityKind::Movie).expect_err("zero capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "events.queue_capacity",
            ..
        }
    ));

    let mut raw = raw_with_database();
    raw.cache.ttl_seconds = Some(0);
    assert!(Settings::from_raw(raw, EntityKind::Movie).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = raw_with_database();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw, EntityKind::User).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn dependency_overrides_apply() {
    let mut raw = raw_with_database();
    let overrides = ServeOverrides {
        cache_url: Some("redis://cache:6379".to_string()),
        cache_ttl_seconds: Some(60),
        events_brokers: Some("kafka:9092".to_string()),
        events_topic: Some("audit".to_string()),
        bootstrap_max_attempts: Some(3),
        bootstrap_interval_ms: Some(250),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw, EntityKind::Movie).expect("valid settings");

    assert_eq!(settings.cache.url, "redis://cache:6379");
    assert_eq!(settings.cache.ttl, Duration::from_secs(60));
    assert_eq!(settings.events.brokers, "kafka:9092");
    assert_eq!(settings.events.topic, "audit");
    assert_eq!(settings.bootstrap.max_attempts.get(), 3);
    assert_eq!(settings.bootstrap.interval, Duration::from_millis(250));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "reelhouse",
        "serve",
        "movies",
        "--server-host",
        "127.0.0.1",
        "--database-url",
        "postgres://override",
        "--bootstrap-max-attempts",
        "5",
    ]);

    let Command::Serve(serve) = args.command;
    assert_eq!(serve.service, ServiceKind::Movies);
    assert_eq!(serve.service.entity_kind(), EntityKind::Movie);
    assert_eq!(serve.overrides.server_host.as_deref(), Some("127.0.0.1"));
    assert_eq!(
        serve.overrides.database_url.as_deref(),
        Some("postgres://override")
    );
    assert_eq!(serve.overrides.bootstrap_max_attempts, Some(5));
}

#[test]
fn service_kind_is_required() {
    assert!(CliArgs::try_parse_from(["reelhouse", "serve"]).is_err());
    assert!(CliArgs::try_parse_from(["reelhouse", "serve", "posts"]).is_err());

    let args = CliArgs::try_parse_from(["reelhouse", "serve", "users"]).expect("users");
    let Command::Serve(serve) = args.command;
    assert_eq!(serve.service, ServiceKind::Users);
}
