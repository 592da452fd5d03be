//! The LLM provider interface consumed by analyzers (spec §6 "LLM provider
//! interface"). The engine never talks to a concrete model; it only needs a
//! streamed-text capability, so this module stays a thin trait plus an
//! in-memory test double.

use async_trait::async_trait;

/// One event from a streamed completion. Only `"text_delta"` events carry
/// text the base algorithm accumulates; any other `kind` is ignored (spec
/// §4.3 step 4).
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub kind: String,
    pub text: String,
}

/// A closeable stream of [`StreamEvent`]s. Modelled as a pull-based async
/// iterator (spec §9 "Stream consumption": "When porting to a
/// single-threaded runtime, use an async iterator/observable that signals
/// completion instead").
#[async_trait]
pub trait EventStream: Send {
    async fn next(&mut self) -> Option<StreamEvent>;
}

#[async_trait]
pub trait StreamingProvider {
    async fn stream(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
    ) -> Result<Box<dyn EventStream>, String>;
}

pub mod test_support {
    use super::{EventStream, StreamEvent, StreamingProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A provider that replays one scripted response per call, useful for
    /// exercising the base algorithm without a real model.
    #[derive(Clone)]
    pub struct ScriptedProvider {
        responses: Arc<Vec<String>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        #[must_use]
        pub fn new(responses: Vec<String>) -> Self {
            Self {
                responses: Arc::new(responses),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    struct OneShotStream {
        text: Option<String>,
    }

    #[async_trait]
    impl EventStream for OneShotStream {
        async fn next(&mut self) -> Option<StreamEvent> {
            let text = self.text.take()?;
            Some(StreamEvent {
                kind: "text_delta".to_string(),
                text,
            })
        }
    }

    #[async_trait]
    impl StreamingProvider for ScriptedProvider {
        async fn stream(
            &self,
            _system_prompt: &str,
            _user_message: &str,
            _max_tokens: u32,
        ) -> Result<Box<dyn EventStream>, String> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self
                .responses
                .get(idx)
                .or_else(|| self.responses.last())
                .cloned()
                .unwrap_or_default();
            Ok(Box::new(OneShotStream { text: Some(response) }))
        }
    }
}
