use proposals::config::{ConfigError, ConfigLoader};
use proposals::plans::{Limit, PlanTier, ResourceKind};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const VARS: &[&str] = &[
    "PROPOSALS_PROFILE",
    "PROPOSALS_API_BIND_ADDR",
    "PROPOSALS_LOG_LEVEL",
    "PROPOSALS_OPERATOR_TOKEN",
    "PROPOSALS_OPERATOR_TOKENS",
    "PROPOSALS_BASE_DOMAIN",
    "PROPOSALS_PLAN_LIMITS_PATH",
    "PROPOSALS_DOMAIN_CACHE_CAPACITY",
    "PROPOSALS_DOMAIN_CACHE_TTL_SECONDS",
];

fn env_guard() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for var in VARS {
        unsafe { env::remove_var(var) };
    }
}

fn set_env(key: &str, value: &str) {
    unsafe { env::set_var(key, value) };
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_only_token_is_set() {
    let _guard = env_guard();
    clear_env();
    set_env("PROPOSALS_OPERATOR_TOKEN", "op-token");

    let dir = TempDir::new().unwrap();
    let cfg = loader(&dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.base_domain, "localhost");
    assert_eq!(cfg.operator_tokens, vec!["op-token".to_string()]);
    assert_eq!(cfg.domain_cache.capacity, 1024);
    assert_eq!(cfg.domain_cache.ttl_seconds, 60);
    assert!(cfg.plan_limits_path.is_none());
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let dir = TempDir::new().unwrap();
    write_env_file(&dir, ".env", "PROPOSALS_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(&dir, ".env.test", "PROPOSALS_API_BIND_ADDR=192.168.0.10:5000\n");
    write_env_file(
        &dir,
        ".env.test.local",
        "PROPOSALS_API_BIND_ADDR=10.0.0.5:6000\nPROPOSALS_BASE_DOMAIN=proposals.test\n",
    );
    // Profile is picked from .env.local before the profile files load.
    write_env_file(
        &dir,
        ".env.local",
        "PROPOSALS_PROFILE=test\nPROPOSALS_API_BIND_ADDR=127.0.0.1:4000\nPROPOSALS_OPERATOR_TOKEN=layered-token\n",
    );

    let cfg = loader(&dir).load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.base_domain, "proposals.test");
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let dir = TempDir::new().unwrap();
    write_env_file(
        &dir,
        ".env",
        "PROPOSALS_API_BIND_ADDR=127.0.0.1:3000\nPROPOSALS_OPERATOR_TOKEN=file-token\n",
    );
    set_env("PROPOSALS_API_BIND_ADDR", "0.0.0.0:9090");
    set_env("PROPOSALS_OPERATOR_TOKENS", "env-a, env-b,,");

    let cfg = loader(&dir).load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.operator_tokens, vec!["env-a".to_string(), "env-b".to_string()]);

    clear_env();
}

#[test]
fn missing_operator_tokens_is_an_error() {
    let _guard = env_guard();
    clear_env();

    let dir = TempDir::new().unwrap();
    let err = loader(&dir).load().expect_err("tokens are required");
    assert!(matches!(err, ConfigError::MissingOperatorTokens));
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();
    set_env("PROPOSALS_OPERATOR_TOKEN", "op-token");
    set_env("PROPOSALS_API_BIND_ADDR", "not-an-addr");

    let dir = TempDir::new().unwrap();
    let err = loader(&dir).load().expect_err("invalid bind addr should fail");
    assert!(err.to_string().contains("invalid api bind address"));

    clear_env();
}

#[test]
fn invalid_base_domain_and_cache_settings_are_rejected() {
    let _guard = env_guard();
    clear_env();
    set_env("PROPOSALS_OPERATOR_TOKEN", "op-token");
    let dir = TempDir::new().unwrap();

    set_env("PROPOSALS_BASE_DOMAIN", "-bad-.com");
    assert!(matches!(
        loader(&dir).load(),
        Err(ConfigError::InvalidBaseDomain(_))
    ));
    unsafe { env::remove_var("PROPOSALS_BASE_DOMAIN") };

    set_env("PROPOSALS_DOMAIN_CACHE_TTL_SECONDS", "0");
    assert!(matches!(
        loader(&dir).load(),
        Err(ConfigError::InvalidDomainCacheTtl { value: 0 })
    ));

    set_env("PROPOSALS_DOMAIN_CACHE_TTL_SECONDS", "soon");
    assert!(matches!(
        loader(&dir).load(),
        Err(ConfigError::InvalidNumber { .. })
    ));

    clear_env();
}

#[test]
fn plan_limits_can_be_loaded_from_file() {
    let _guard = env_guard();
    clear_env();
    set_env("PROPOSALS_OPERATOR_TOKEN", "op-token");

    let dir = TempDir::new().unwrap();
    let row = |tier: &str, proposals: i64, flag: bool| {
        format!(
            r#"{{"tier":"{tier}","max_proposals":{proposals},"max_api_keys":1,"max_custom_domains":0,"max_team_members":1,"remove_branding":{flag},"analytics":{flag},"priority_support":false,"custom_templates":false,"api_access":{flag}}}"#
        )
    };
    let table = format!(
        "[{},{},{}]",
        row("free", 3, false),
        row("pro", 50, true),
        row("enterprise", -1, true)
    );
    let path = dir.path().join("plans.json");
    fs::write(&path, table).unwrap();
    set_env("PROPOSALS_PLAN_LIMITS_PATH", path.to_str().unwrap());

    let cfg = loader(&dir).load().expect("plan table loads");
    let plans = cfg.plan_limits().unwrap();
    assert_eq!(
        plans.get(PlanTier::Free).limit_for(ResourceKind::Proposals),
        Limit::Max(3)
    );
    assert_eq!(
        plans.get(PlanTier::Enterprise).limit_for(ResourceKind::Proposals),
        Limit::Unlimited
    );

    fs::write(&path, format!("[{}]", row("free", 3, false))).unwrap();
    assert!(matches!(
        loader(&dir).load(),
        Err(ConfigError::PlanLimits { .. })
    ));

    clear_env();
}
