use gc_domain::config::{Config, ConfigSeverity};

/// Validate the config, printing any issues.
///
/// Returns `false` when at least one error was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML, with
/// API keys masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(&redacted(config))?;
    print!("{output}");
    Ok(())
}

fn redacted(config: &Config) -> Config {
    let mut out = config.clone();
    out.gateway.api_key = out.gateway.api_key.as_deref().map(mask);
    out.assistant.api_key = out.assistant.api_key.as_deref().map(mask);
    out
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".into()
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_masked() {
        let mut config = Config::default();
        config.gateway.api_key = Some("abcd1234efgh".into());
        config.assistant.api_key = Some("short".into());
        let r = redacted(&config);
        assert_eq!(r.gateway.api_key.as_deref(), Some("abcd****"));
        assert_eq!(r.assistant.api_key.as_deref(), Some("****"));
    }

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&redacted(&Config::default())).unwrap();
        assert!(text.contains("[gateway]"));
        assert!(text.contains("block_marker"));
    }
}
