//! Built-in probe payloads for exercising the security layer in front of
//! the chat gateway.

use clap::ValueEnum;

/// A payload family, or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum PayloadCategory {
    Xss,
    Sqli,
    Cmdi,
    PathTraversal,
    Xxe,
    Normal,
    All,
}

impl PayloadCategory {
    /// Every concrete category, in the order `All` runs them.
    pub const CONCRETE: [PayloadCategory; 6] = [
        PayloadCategory::Xss,
        PayloadCategory::Sqli,
        PayloadCategory::Cmdi,
        PayloadCategory::PathTraversal,
        PayloadCategory::Xxe,
        PayloadCategory::Normal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PayloadCategory::Xss => "xss",
            PayloadCategory::Sqli => "sqli",
            PayloadCategory::Cmdi => "cmdi",
            PayloadCategory::PathTraversal => "path_traversal",
            PayloadCategory::Xxe => "xxe",
            PayloadCategory::Normal => "normal",
            PayloadCategory::All => "all",
        }
    }

    /// The categories this selection expands to.
    pub fn expand(self) -> Vec<PayloadCategory> {
        match self {
            PayloadCategory::All => Self::CONCRETE.to_vec(),
            one => vec![one],
        }
    }

    /// Payloads of a concrete category. `All` yields nothing.
    pub fn payloads(self) -> &'static [&'static str] {
        match self {
            PayloadCategory::Xss => XSS,
            PayloadCategory::Sqli => SQLI,
            PayloadCategory::Cmdi => CMDI,
            PayloadCategory::PathTraversal => PATH_TRAVERSAL,
            PayloadCategory::Xxe => XXE,
            PayloadCategory::Normal => NORMAL,
            PayloadCategory::All => &[],
        }
    }
}

const XSS: &[&str] = &[
    "<script>alert('XSS')</script>",
    "<img src=x onerror=alert('XSS')>",
    "<svg/onload=alert('XSS')>",
    "javascript:alert('XSS')",
    "<iframe src='javascript:alert(\"XSS\")'></iframe>",
    "'\"><script>alert(String.fromCharCode(88,83,83))</script>",
    "<script>alert`XSS`</script>",
    "<img src='x' onerror='alert(1)'>",
];

const SQLI: &[&str] = &[
    "' OR '1'='1",
    "1' OR '1'='1' --",
    "admin'--",
    "' UNION SELECT NULL--",
    "1' AND '1'='2",
    "'; DROP TABLE users--",
    "1' UNION SELECT username, password FROM users--",
];

const CMDI: &[&str] = &[
    "; ls -la",
    "| whoami",
    "`id`",
    "$(whoami)",
    "; cat /etc/passwd",
    "& ping -c 5 127.0.0.1",
    "|| echo vulnerable",
];

const PATH_TRAVERSAL: &[&str] = &[
    "../../../etc/passwd",
    "..\\..\\..\\windows\\system32\\config\\sam",
    "....//....//....//etc/passwd",
    "..%2f..%2f..%2fetc%2fpasswd",
    "..%252f..%252f..%252fetc%252fpasswd",
];

const XXE: &[&str] = &[
    "<?xml version='1.0'?><!DOCTYPE foo [<!ENTITY xxe SYSTEM 'file:///etc/passwd'>]><foo>&xxe;</foo>",
    "<?xml version='1.0'?><!DOCTYPE data [<!ENTITY file SYSTEM 'file:///c:/windows/win.ini'>]><data>&file;</data>",
];

const NORMAL: &[&str] = &[
    "Hello, I need help with my account",
    "Can you help me reset my password?",
    "What are your business hours?",
    "I have a question about my order",
    "Thank you for your help!",
    "How do I update my profile?",
    "Is there a way to track my shipment?",
    "I'd like to speak with a supervisor",
];

/// Percent-encode every byte outside the unreserved set; spaces become
/// `%20`.
pub fn percent_encode(input: &str) -> String {
    url::form_urlencoded::byte_serialize(input.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// The payload followed by its encoded variants, duplicates removed.
///
/// Variants: percent-encoded, double percent-encoded, spaces as `%20`,
/// spaces as `+`, angle brackets as `%3C`/`%3E`.
pub fn encoding_variants(payload: &str) -> Vec<String> {
    let once = percent_encode(payload);
    let twice = percent_encode(&once);
    let candidates = [
        payload.to_owned(),
        once,
        twice,
        payload.replace(' ', "%20"),
        payload.replace(' ', "+"),
        payload.replace('<', "%3C").replace('>', "%3E"),
    ];

    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// The texts a payload run sends for one category.
pub fn texts_for(category: PayloadCategory, with_encodings: bool) -> Vec<String> {
    category
        .payloads()
        .iter()
        .flat_map(|p| {
            if with_encodings {
                encoding_variants(p)
            } else {
                vec![(*p).to_owned()]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_every_category() {
        let expanded = PayloadCategory::All.expand();
        assert_eq!(expanded.len(), 6);
        assert!(!expanded.contains(&PayloadCategory::All));
        assert_eq!(PayloadCategory::Sqli.expand(), vec![PayloadCategory::Sqli]);
    }

    #[test]
    fn every_concrete_category_has_payloads() {
        for c in PayloadCategory::CONCRETE {
            assert!(!c.payloads().is_empty(), "{} is empty", c.as_str());
        }
        assert!(PayloadCategory::All.payloads().is_empty());
    }

    #[test]
    fn percent_encoding_uses_percent_twenty() {
        assert_eq!(percent_encode("<a b>"), "%3Ca%20b%3E");
        assert_eq!(percent_encode("1+1"), "1%2B1");
    }

    #[test]
    fn variants_start_with_original_and_are_unique() {
        let v = encoding_variants("<script>alert(1)</script>");
        assert_eq!(v[0], "<script>alert(1)</script>");
        assert!(v.contains(&"%3Cscript%3Ealert(1)%3C/script%3E".to_string()));
        assert!(v.iter().any(|s| s.contains("%253C")));
        let mut dedup = v.clone();
        dedup.dedup();
        assert_eq!(dedup.len(), v.len());
    }

    #[test]
    fn variants_of_plain_word_collapse() {
        assert_eq!(encoding_variants("hello"), vec!["hello".to_string()]);
    }

    #[test]
    fn texts_for_expands_variants() {
        let plain = texts_for(PayloadCategory::Xxe, false);
        assert_eq!(plain.len(), 2);
        let encoded = texts_for(PayloadCategory::Xxe, true);
        assert!(encoded.len() > plain.len());
    }

    #[test]
    fn value_names_match_wire_names() {
        for c in PayloadCategory::CONCRETE {
            let parsed = PayloadCategory::from_str(c.as_str(), true).unwrap();
            assert_eq!(parsed, c);
        }
    }
}
