//! In-memory `Generator` and log capture for pipeline tests.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::llm_client::{GenerationRequest, Generator, LlmError};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub instructions: String,
    pub context: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

type FailWhen = Box<dyn Fn(&GenerationRequest<'_>) -> bool + Send + Sync>;

/// Returns deterministic text derived from the request and records every call.
pub struct ScriptedGenerator {
    calls: Mutex<Vec<RecordedCall>>,
    fail_when: Option<FailWhen>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_when: None,
        }
    }

    /// Fails (as if retries were exhausted) every request matching `predicate`.
    pub fn failing_when(
        predicate: impl Fn(&GenerationRequest<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_when: Some(Box::new(predicate)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            instructions: request.instructions.to_string(),
            context: request.context.to_string(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        });

        if self.fail_when.as_ref().is_some_and(|fail| fail(&request)) {
            return Err(LlmError::Exhausted {
                attempts: 5,
                last: Box::new(LlmError::RateLimited {
                    message: "scripted rate limit".to_string(),
                }),
            });
        }

        Ok(format!(
            "Output of '{}' at temperature {:?} over {} chars of context.\n",
            request.instructions,
            request.temperature,
            request.context.len()
        ))
    }
}

/// Formatted log output collected by `capture_logs`.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Routes events on the current thread into a buffer until the guard drops.
pub fn capture_logs() -> (DefaultGuard, LogBuffer) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (tracing::subscriber::set_default(subscriber), buffer)
}
