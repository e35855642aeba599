//! Sequencing and termination of the assistant-backed sources, driven by a
//! scripted in-memory adapter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use gc_domain::chat::ChatExchange;
use gc_providers::{AssistantAdapter, AssistantReply};
use gc_sources::generated::{follow_up, GeneratedSource};
use gc_sources::{ConversationSource, HybridSource, StaticSource};

// ── Scripted adapter ────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Mode {
    /// Reply `reply{n}` to the n-th prompt (1-based).
    Numbered,
    AlwaysFail,
    Blank,
}

#[derive(Default)]
struct Calls {
    prompts: Vec<String>,
    clears: usize,
}

struct ScriptedAdapter {
    mode: Mode,
    overrides: VecDeque<Option<String>>,
    calls: Arc<Mutex<Calls>>,
    history: Vec<ChatExchange>,
}

impl ScriptedAdapter {
    fn new(mode: Mode) -> (Box<dyn AssistantAdapter>, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let adapter = Self {
            mode,
            overrides: VecDeque::new(),
            calls: calls.clone(),
            history: Vec::new(),
        };
        (Box::new(adapter), calls)
    }

    /// Per-call replies; `None` fails that call. Falls back to `mode`.
    fn with_replies(replies: Vec<Option<&str>>) -> (Box<dyn AssistantAdapter>, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let adapter = Self {
            mode: Mode::AlwaysFail,
            overrides: replies.into_iter().map(|r| r.map(String::from)).collect(),
            calls: calls.clone(),
            history: Vec::new(),
        };
        (Box::new(adapter), calls)
    }
}

#[async_trait::async_trait]
impl AssistantAdapter for ScriptedAdapter {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn start_session(&mut self, _initial_message: Option<&str>) -> bool {
        self.history.clear();
        true
    }

    async fn send_message(&mut self, message: &str) -> AssistantReply {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.prompts.push(message.to_owned());
            calls.prompts.len()
        };
        self.history.push(ChatExchange::user(message));

        if let Some(next) = self.overrides.pop_front() {
            return match next {
                Some(text) => AssistantReply::ok(text),
                None => AssistantReply::failed("scripted failure"),
            };
        }
        match self.mode {
            Mode::Numbered => {
                let text = format!("reply{n}");
                self.history.push(ChatExchange::assistant(text.clone()));
                AssistantReply::ok(text)
            }
            Mode::AlwaysFail => AssistantReply::failed("HTTP 503 - unavailable"),
            Mode::Blank => AssistantReply::ok("   "),
        }
    }

    fn clear_history(&mut self) {
        self.calls.lock().unwrap().clears += 1;
        self.history.clear();
    }

    async fn end_session(&mut self) -> bool {
        true
    }

    fn history(&self) -> &[ChatExchange] {
        &self.history
    }
}

async fn drain(source: &mut dyn ConversationSource) -> Vec<String> {
    let mut out = Vec::new();
    // hard stop so a non-terminating source fails instead of hanging
    for _ in 0..1_000 {
        match source.next().await {
            Some(text) => out.push(text),
            None => {
                assert!(!source.has_more(), "{} reported more after None", source.name());
                return out;
            }
        }
    }
    panic!("{} did not terminate", source.name());
}

fn seeds(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Hybrid ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn hybrid_interleaves_lines_and_replies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.txt");
    std::fs::write(&path, "line1\nline2\n").unwrap();

    let (adapter, calls) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = HybridSource::new(StaticSource::from_file(&path).unwrap(), adapter, true);

    assert!(source.has_more());
    let texts = drain(&mut source).await;
    assert_eq!(texts, vec!["line1", "reply1", "line2", "reply2"]);
    assert_eq!(calls.lock().unwrap().prompts, vec!["line1", "line2"]);
}

#[tokio::test]
async fn hybrid_without_responses_is_the_script() {
    let (adapter, calls) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = HybridSource::new(StaticSource::from_lines(["a", "b", "c"]), adapter, false);

    assert_eq!(drain(&mut source).await, vec!["a", "b", "c"]);
    assert!(calls.lock().unwrap().prompts.is_empty());
}

#[tokio::test]
async fn hybrid_skips_failed_replies() {
    let (adapter, _) = ScriptedAdapter::with_replies(vec![None, Some("ok2")]);
    let mut source = HybridSource::new(StaticSource::from_lines(["a", "b"]), adapter, true);

    assert_eq!(drain(&mut source).await, vec!["a", "b", "ok2"]);
}

#[tokio::test]
async fn hybrid_reset_rewinds_and_clears_history() {
    let (adapter, calls) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = HybridSource::new(StaticSource::from_lines(["a"]), adapter, true);

    assert_eq!(drain(&mut source).await, vec!["a", "reply1"]);
    source.reset().await;
    assert_eq!(calls.lock().unwrap().clears, 1);
    assert!(source.adapter_mut().history().is_empty());
    assert_eq!(drain(&mut source).await, vec!["a", "reply2"]);
}

// ── Generated ───────────────────────────────────────────────────────────

#[tokio::test]
async fn generated_alternates_prompts_and_replies() {
    let (adapter, _) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = GeneratedSource::new(adapter, seeds(&["s1", "s2"]), 6, true);

    let texts = drain(&mut source).await;
    assert_eq!(
        texts,
        vec!["s1", "reply1", "s2", "reply2", follow_up(4), "reply3"]
    );
    assert_eq!(source.turns(), 6);
    assert_eq!(source.generated().len(), 3);
}

#[tokio::test]
async fn generated_never_exceeds_max_turns_when_backend_fails() {
    let (adapter, calls) = ScriptedAdapter::new(Mode::AlwaysFail);
    let mut source = GeneratedSource::new(
        adapter,
        seeds(&["s1", "s2", "s3", "s4", "s5", "s6"]),
        4,
        true,
    );

    let texts = drain(&mut source).await;
    assert_eq!(texts, vec!["s1", "s2", "s3", "s4"]);
    assert!(texts.len() <= 4);
    // the reply to s4 is never requested: the turn budget is spent
    assert_eq!(calls.lock().unwrap().prompts.len(), 3);
}

#[tokio::test]
async fn generated_stops_when_seeds_run_out_without_replies() {
    let (adapter, _) = ScriptedAdapter::new(Mode::Blank);
    let mut source = GeneratedSource::new(adapter, seeds(&["s1", "s2"]), 10, true);

    assert_eq!(drain(&mut source).await, vec!["s1", "s2"]);
}

#[tokio::test]
async fn generated_max_turns_cuts_a_pending_reply() {
    let (adapter, _) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = GeneratedSource::new(adapter, seeds(&["s1", "s2"]), 3, true);

    let texts = drain(&mut source).await;
    assert_eq!(texts, vec!["s1", "reply1", "s2"]);
}

#[tokio::test]
async fn generated_without_context_mode_only_sends_seeds() {
    let (adapter, calls) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = GeneratedSource::new(adapter, seeds(&["s1", "s2", "s3"]), 10, false);

    assert_eq!(drain(&mut source).await, vec!["s1", "s2", "s3"]);
    assert!(calls.lock().unwrap().prompts.is_empty());
}

#[tokio::test]
async fn generated_reset_clears_history_only_without_context_mode() {
    let (adapter, calls) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = GeneratedSource::new(adapter, seeds(&["s1"]), 4, true);
    drain(&mut source).await;
    source.reset().await;
    assert_eq!(calls.lock().unwrap().clears, 0);
    assert_eq!(source.turns(), 0);
    assert!(source.has_more());

    let (adapter, calls) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = GeneratedSource::new(adapter, seeds(&["s1"]), 4, false);
    drain(&mut source).await;
    source.reset().await;
    assert_eq!(calls.lock().unwrap().clears, 1);
    assert_eq!(drain(&mut source).await, vec!["s1"]);
}

#[tokio::test]
async fn zero_turn_budget_produces_nothing() {
    let (adapter, _) = ScriptedAdapter::new(Mode::Numbered);
    let mut source = GeneratedSource::new(adapter, seeds(&["s1"]), 0, true);
    assert!(!source.has_more());
    assert!(drain(&mut source).await.is_empty());
}
