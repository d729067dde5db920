use std::io::BufRead;
use std::path::Path;

use anyhow::{bail, ensure};
use credgate_api::{AuthEngine, AuthError};
use credgate_auth::Argon2Hasher;
use credgate_connectors::EnvSecretStore;
use credgate_core::{AuthConfig, load_users_from_dir};
use credgate_runtime::AuthService;

fn read_password(from_stdin: bool) -> anyhow::Result<String> {
    let password = if from_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        rpassword::prompt_password("Password: ")?
    };
    ensure!(!password.is_empty(), "Password cannot be empty");
    Ok(password)
}

fn build_service(config: &AuthConfig, cfg_dir: &Path) -> anyhow::Result<AuthService> {
    let users = load_users_from_dir(cfg_dir, config.identity.email_policy)?;
    Ok(AuthService::from_config(config, users, &EnvSecretStore)?)
}

/// Print the failure in JSON mode, then hand it back for a non-zero exit.
fn report(json: bool, err: AuthError) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "ok": false,
                "error": err.to_string(),
                "class": err.class(),
                "status": err.http_status(),
            }))?
        );
    }
    bail!(err)
}

pub fn cmd_hash_password(config: &AuthConfig, from_stdin: bool, json: bool) -> anyhow::Result<()> {
    let p = &config.password;
    let hasher = Argon2Hasher::new(p.memory_kib, p.iterations, p.parallelism)?;
    let password = read_password(from_stdin)?;
    let phc = hasher.hash_password(&password)?;
    crate::pout(json, serde_json::json!({"password_hash": phc}), &phc)
}

pub fn cmd_login(
    config: &AuthConfig,
    cfg_dir: &Path,
    email: &str,
    from_stdin: bool,
    json: bool,
) -> anyhow::Result<()> {
    let svc = build_service(config, cfg_dir)?;
    let password = read_password(from_stdin)?;

    match svc.login(email, &password) {
        Ok(result) => crate::pout(json, serde_json::to_value(&result)?, &result.token),
        Err(e) => report(json, e),
    }
}

pub fn cmd_resolve(config: &AuthConfig, cfg_dir: &Path, email: &str, json: bool) -> anyhow::Result<()> {
    let svc = build_service(config, cfg_dir)?;
    match svc.resolve_user_id(email) {
        Ok(user_id) => crate::pout(
            json,
            serde_json::json!({"email": email, "user_id": user_id}),
            &user_id.to_string(),
        ),
        Err(e) => report(json, e),
    }
}

pub fn cmd_whoami(config: &AuthConfig, cfg_dir: &Path, token: &str, json: bool) -> anyhow::Result<()> {
    let svc = build_service(config, cfg_dir)?;
    match svc.authenticate_token(token) {
        Ok(user) => crate::pout(
            json,
            serde_json::to_value(&user)?,
            &format!("{} (user {})", user.email, user.user_id),
        ),
        Err(e) => report(json, e),
    }
}
