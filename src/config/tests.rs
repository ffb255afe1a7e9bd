use clap::Parser;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cache_defaults_to_enabled_memory_backend() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.backend, CacheBackendKind::Memory);
    assert_eq!(settings.cache.default_ttl, Duration::from_secs(300));
    assert_eq!(settings.cache.views_ttl, Duration::from_secs(60));
    assert_eq!(settings.cache.memory_capacity.get(), 10_000);
    assert_eq!(settings.cache.operation_timeout, Duration::from_millis(250));
    assert!(!settings.comments.auto_approve);
}

#[test]
fn redis_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("redis".to_string());

    let err = Settings::from_raw(raw).expect_err("missing redis url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.redis_url",
            ..
        }
    ));
}

#[test]
fn redis_backend_accepts_url_from_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_backend: Some("Redis".to_string()),
        cache_redis_url: Some("redis://127.0.0.1:6379".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.cache.backend, CacheBackendKind::Redis);
    assert_eq!(
        settings.cache.redis_url.as_deref(),
        Some("redis://127.0.0.1:6379")
    );
}

#[test]
fn unknown_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("memcached".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(err.to_string().contains("cache.backend"));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.default_ttl_seconds = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_database_url_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn shared_listener_address_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(3001);

    let err = Settings::from_raw(raw).expect_err("shared address");
    assert!(err.to_string().contains("server.admin_port"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["quire"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_export_arguments() {
    let args = CliArgs::parse_from([
        "quire",
        "export",
        "--database-url",
        "postgres://example",
        "/tmp/site.toml",
    ]);

    match args.command.expect("export command") {
        Command::ExportSite(export) => {
            assert_eq!(
                export.database.database_url.as_deref(),
                Some("postgres://example")
            );
            assert_eq!(export.file, std::path::Path::new("/tmp/site.toml"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_import_arguments() {
    let args = CliArgs::parse_from(["quire", "import", "/tmp/site.toml"]);

    match args.command.expect("import command") {
        Command::ImportSite(import) => {
            assert!(import.database.database_url.is_none());
            assert_eq!(import.file, std::path::Path::new("/tmp/site.toml"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_cache_overrides() {
    let args = CliArgs::parse_from([
        "quire",
        "serve",
        "--cache-enabled",
        "false",
        "--cache-default-ttl-seconds",
        "30",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.cache_enabled, Some(false));
            assert_eq!(serve.overrides.cache_default_ttl_seconds, Some(30));
        }
        _ => panic!("wrong command parsed"),
    }
}
