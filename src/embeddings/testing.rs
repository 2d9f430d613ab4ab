//! In-process gateway for unit tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Embedding, EmbeddingGateway, EmbeddingServiceError};

type EmbedFn = Box<dyn Fn(&str) -> Embedding + Send + Sync>;

pub(crate) struct FakeGateway {
    embed_fn: EmbedFn,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub(crate) fn new(embed_fn: impl Fn(&str) -> Embedding + Send + Sync + 'static) -> Self {
        Self {
            embed_fn: Box::new(embed_fn),
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn constant(vector: Embedding) -> Self {
        Self::new(move |_| vector.clone())
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::constant(vec![0.0])
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `embed` invocations, including ones that failed
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text passed to `embed`, in call order
    pub(crate) fn embedded_texts(&self) -> Vec<String> {
        self.texts.lock().expect("lock not poisoned").clone()
    }
}

#[async_trait]
impl EmbeddingGateway for FakeGateway {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts
            .lock()
            .expect("lock not poisoned")
            .extend(texts.iter().cloned());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(EmbeddingServiceError::Status { status: 429 });
        }

        Ok(texts.iter().map(|text| (self.embed_fn)(text)).collect())
    }

    fn model(&self) -> &str {
        "fake-embedder"
    }
}
