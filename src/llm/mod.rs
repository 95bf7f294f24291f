//! Language model abstraction used by the reasoning loop.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text completion against a hosted language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`, stopping before any of the `stop` sequences.
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String>;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::LanguageModel;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Test model that replays canned completions in order, repeating the
    /// last one once the script runs out.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        last: Mutex<String>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
                last: Mutex::new(String::new()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, prompt: &str, _stop: &[String]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());

            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.replies.lock().unwrap().pop_front() {
                *last = next;
            }
            Ok(last.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }
}
