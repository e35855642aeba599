//! Named OpenAI-compatible backends.
//!
//! A preset supplies the base URL, default model and API-key variable of a
//! hosted service; [`crate::OpenAiCompatAdapter::from_config`] layers the
//! explicit `[assistant]` settings on top.

/// Defaults for one hosted OpenAI-compatible service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub base_url: &'static str,
    pub model: &'static str,
    pub api_key_env: &'static str,
}

pub const OPENAI: Preset = Preset {
    name: "openai",
    base_url: "https://api.openai.com/v1",
    model: "gpt-3.5-turbo",
    api_key_env: "OPENAI_API_KEY",
};

pub const GROQ: Preset = Preset {
    name: "groq",
    base_url: "https://api.groq.com/openai/v1",
    model: "llama-3.1-8b-instant",
    api_key_env: "GROQ_API_KEY",
};

pub const TOGETHER: Preset = Preset {
    name: "together",
    base_url: "https://api.together.xyz/v1",
    model: "meta-llama/Llama-3-8b-chat-hf",
    api_key_env: "TOGETHER_API_KEY",
};

const PRESETS: [Preset; 3] = [OPENAI, GROQ, TOGETHER];

/// All presets, in display order.
pub fn all() -> &'static [Preset] {
    &PRESETS
}

/// Case-insensitive lookup by name.
pub fn lookup(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}

/// Sorted preset names, for help text and error messages.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PRESETS.iter().map(|p| p.name).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("Groq"), Some(&GROQ));
        assert_eq!(lookup(" together "), Some(&TOGETHER));
        assert_eq!(lookup("mistral"), None);
    }

    #[test]
    fn openai_defaults() {
        let p = lookup("openai").unwrap();
        assert_eq!(p.base_url, "https://api.openai.com/v1");
        assert_eq!(p.model, "gpt-3.5-turbo");
    }

    #[test]
    fn names_are_sorted() {
        assert_eq!(names(), vec!["groq", "openai", "together"]);
        assert_eq!(all().len(), 3);
    }
}
