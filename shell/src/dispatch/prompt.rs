// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::{EnvKeys, Environment};

const HOME_ABBREVIATION: &str = "~";
const FALLBACK_HOST: &str = "localhost";
const FALLBACK_USER: &str = "user";

/// `USER@HOST [hh:mm:ss] [CWD]` then `-> ` on the next line. A `CWD` equal to `$HOME` is
/// shown as `~`.
#[must_use]
pub fn render_prompt(env: &Environment, cwd: &Path, now: DateTime<Local>) -> String {
    let user = env
        .get_key(EnvKeys::User)
        .filter(|it| !it.is_empty())
        .unwrap_or(FALLBACK_USER);
    let host = host_name(env);
    let cwd_display = match env.home() {
        Some(home) if Path::new(home) == cwd => HOME_ABBREVIATION.to_string(),
        _ => cwd.display().to_string(),
    };
    format!(
        "{user}@{host} [{time}] [{cwd_display}]\n-> ",
        time = now.format("%H:%M:%S")
    )
}

/// `$HOSTNAME`, else the system node name.
fn host_name(env: &Environment) -> String {
    if let Some(it) = env.get_key(EnvKeys::Hostname).filter(|it| !it.is_empty()) {
        return it.to_string();
    }
    nix::unistd::gethostname()
        .ok()
        .and_then(|it| it.into_string().ok())
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}
