use std::path::Path;

use gc_domain::error::Result;
use gc_domain::trace::TraceEvent;

use crate::traits::ConversationSource;

/// A fixed, replayable list of texts.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    lines: Vec<String>,
    cursor: usize,
}

impl StaticSource {
    /// Build from lines; each is trimmed and blank ones are dropped.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .map(|l| l.as_ref().trim().to_owned())
            .filter(|l| !l.is_empty())
            .collect();
        Self { lines, cursor: 0 }
    }

    /// Load one text per line from a UTF-8 file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let source = Self::from_lines(content.lines());
        tracing::info!(file = %path.display(), lines = source.total_count(), "loaded conversation script");
        Ok(source)
    }

    pub fn total_count(&self) -> usize {
        self.lines.len()
    }

    /// Index of the next line to be produced.
    pub fn current_index(&self) -> usize {
        self.cursor
    }

    pub(crate) fn take_next(&mut self) -> Option<String> {
        let line = self.lines.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(line)
    }
}

#[async_trait::async_trait]
impl ConversationSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn has_more(&self) -> bool {
        self.cursor < self.lines.len()
    }

    async fn next(&mut self) -> Option<String> {
        let line = self.take_next();
        if line.is_none() {
            TraceEvent::SourceExhausted {
                source: self.name().into(),
                produced: self.cursor,
            }
            .emit();
        }
        line
    }

    async fn reset(&mut self) {
        self.cursor = 0;
        tracing::debug!(lines = self.lines.len(), "static source rewound");
    }
}
