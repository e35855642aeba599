/// Resolve an API key from a plaintext value or an environment variable.
///
/// Precedence:
/// 1. explicit `key`
/// 2. the variable named by `env`, read through `lookup`
///
/// Empty values at either step fall through. Returns `None` when nothing
/// non-empty is found; callers decide whether that is fatal.
pub fn resolve_api_key_with(
    key: Option<&str>,
    env: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    if let Some(key) = key.filter(|k| !k.is_empty()) {
        return Some(key.to_owned());
    }

    let var = env.filter(|v| !v.is_empty())?;
    match lookup(var).filter(|v| !v.is_empty()) {
        Some(val) => Some(val),
        None => {
            tracing::debug!(env_var = %var, "API key env var not set");
            None
        }
    }
}

/// [`resolve_api_key_with`] against the process environment.
pub fn resolve_api_key(key: Option<&str>, env: Option<&str>) -> Option<String> {
    resolve_api_key_with(key, env, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(name: &'static str, value: &'static str) -> impl Fn(&str) -> Option<String> {
        move |n| (n == name).then(|| value.to_owned())
    }

    #[test]
    fn plaintext_takes_precedence_over_env() {
        let key = resolve_api_key_with(Some("plain"), Some("K"), env_with("K", "from-env"));
        assert_eq!(key.as_deref(), Some("plain"));
    }

    #[test]
    fn env_var_is_read() {
        let key = resolve_api_key_with(None, Some("K"), env_with("K", "from-env"));
        assert_eq!(key.as_deref(), Some("from-env"));
    }

    #[test]
    fn empty_values_fall_through() {
        assert_eq!(resolve_api_key_with(Some(""), Some("K"), env_with("K", "")), None);
        assert_eq!(resolve_api_key_with(None, Some(""), |_| Some("x".into())), None);
    }

    #[test]
    fn nothing_configured() {
        assert_eq!(resolve_api_key_with(None, None, |_| None), None);
    }
}
