use keel::config::Config;
use keel::error::ConfigError;

// Environment variables are process-wide, so every env-dependent check lives
// in this single test.
#[test]
fn test_config_load_from_env() {
    unsafe {
        std::env::remove_var("LISTEN");
        std::env::remove_var("KEEL_CONFIG");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.http.maximum_body_size, 32);
    assert!(cfg.http.public_folder.is_none());

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:3000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");

    let path = std::env::temp_dir().join(format!("keel-config-{}.yaml", std::process::id()));
    let yaml = "server:\n  listen_addr: \"127.0.0.1:9000\"\nhttp:\n  maximum_body_size: 4\n";
    std::fs::write(&path, yaml).unwrap();
    unsafe {
        std::env::remove_var("LISTEN");
        std::env::set_var("KEEL_CONFIG", &path);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.http.maximum_body_size, 4);

    unsafe {
        std::env::set_var("KEEL_CONFIG", "/definitely/not/here.yaml");
    }
    assert!(Config::load().is_err());

    unsafe {
        std::env::remove_var("KEEL_CONFIG");
    }
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_config_partial_yaml_uses_defaults() {
    let cfg = Config::from_yaml("http:\n  public_folder: /srv/www\n").unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.http.maximum_body_size, 32);
    assert_eq!(
        cfg.http.public_folder.as_deref(),
        Some(std::path::Path::new("/srv/www"))
    );
}

#[test]
fn test_config_rejects_bad_yaml() {
    assert!(Config::from_yaml("http:\n  maximum_body_size: lots\n").is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::from_yaml("server:\n  listen_addr: 0.0.0.0:5000\n").unwrap();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
}

#[test]
fn test_settings_require_a_handler_or_folder() {
    let cfg = Config::default();
    let err = cfg.http.settings().unwrap().build().unwrap_err();
    assert!(matches!(err, ConfigError::NoHandler));
}

#[test]
fn test_settings_reject_zero_body_size() {
    let cfg = Config::from_yaml("http:\n  maximum_body_size: 0\n").unwrap();
    let err = cfg
        .http
        .settings()
        .unwrap()
        .on_request(|_| keel::http::RequestOutcome::Unhandled)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroBodySize));
}

#[test]
fn test_settings_reject_missing_public_folder() {
    let cfg = Config::from_yaml("http:\n  public_folder: /definitely/not/here\n").unwrap();
    let Err(err) = cfg.http.settings() else {
        panic!("missing public folder accepted");
    };
    assert!(matches!(err, ConfigError::PublicFolder { .. }));
}

#[test]
fn test_settings_body_limit_in_bytes() {
    let settings = Config::from_yaml("http:\n  maximum_body_size: 2\n")
        .unwrap()
        .http
        .settings()
        .unwrap()
        .on_request(|_| keel::http::RequestOutcome::Unhandled)
        .build()
        .unwrap();

    assert_eq!(settings.maximum_body_size(), 2);
    assert_eq!(settings.max_body_bytes(), 2 * 1024 * 1024);
}
