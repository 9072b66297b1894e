use super::*;

#[test]
fn test_parse_serve_overrides() {
    let cli = Cli::try_parse_from([
        "reelay", "serve", "--config", "/tmp/x.json", "--host", "127.0.0.1", "--port", "9000",
    ])
    .unwrap();
    assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/x.json")));
    match cli.command {
        Commands::Serve { host, port } => {
            assert_eq!(host.as_deref(), Some("127.0.0.1"));
            assert_eq!(port, Some(9000));
        }
        _ => panic!("expected serve"),
    }
}

#[test]
fn test_parse_global_config_before_subcommand() {
    let cli = Cli::try_parse_from(["reelay", "-c", "c.json", "check"]).unwrap();
    assert_eq!(cli.config.as_deref(), Some(Path::new("c.json")));
    assert!(matches!(cli.command, Commands::Check));
}

#[test]
fn test_parse_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["reelay", "relay-everything"]).is_err());
}

#[test]
fn test_init_writes_and_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    init_config(&path, false).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["gateway"]["port"], 8080);
    assert_eq!(written["relay"]["coalesceWindowMs"], 2000);

    assert!(init_config(&path, false).is_err());
    init_config(&path, true).unwrap();
}

#[test]
fn test_serve_config_applies_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "discord": {"token": "t", "channelId": "123"},
            "instagram": {"botUserId": "9", "accessToken": "a", "verifyToken": "v"}
        }"#,
    )
    .unwrap();

    let config = serve_config(&path, Some("127.0.0.1".into()), Some(9100)).unwrap();
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 9100);
}

#[test]
fn test_serve_config_requires_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"discord": {"channelId": "123"}}"#).unwrap();
    let err = serve_config(&path, None, None).unwrap_err();
    assert!(format!("{:#}", err).contains("required"));
}

#[test]
fn test_encode_id_round_trips() {
    let encoded = encode_id("17841400").unwrap();
    assert_eq!(decode_hidden_id(&format!("name{encoded}")), Some("17841400".into()));
    assert!(encode_id("12a").is_err());
    assert!(encode_id("").is_err());
}

#[test]
fn test_escape_is_visible() {
    assert_eq!(escape("\u{feff}"), "\\u{feff}");
}
