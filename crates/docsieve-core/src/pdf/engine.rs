//! Lazily bootstrapped PDF engine with single-flight initialization.
//!
//! An [`EngineHandle`] owns one [`PdfEngine`] for its lifetime. The first
//! caller to need the engine runs the loader; concurrent callers wait for
//! that same attempt instead of starting their own.

use std::future::Future;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::encoding::{self, CodeTable, GlyphNames};
use crate::error::{EngineError, ExtractError, Result};

/// Lifecycle of an engine handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EngineState {
    /// No attempt has started.
    Uninitialized = 0,
    /// An attempt is running, or one was abandoned before finishing.
    Initializing = 1,
    /// The engine is available.
    Ready = 2,
    /// The last attempt failed. Only [`EngineHandle::retry`] leaves this state.
    Failed = 3,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EngineState::Uninitialized,
            1 => EngineState::Initializing,
            2 => EngineState::Ready,
            _ => EngineState::Failed,
        }
    }
}

/// Prebuilt tables shared by every PDF decode.
pub struct PdfEngine {
    win_ansi: CodeTable,
    mac_roman: CodeTable,
    standard: CodeTable,
    pdf_doc: CodeTable,
    glyphs: GlyphNames,
}

impl PdfEngine {
    /// Build every table.
    pub fn build() -> std::result::Result<Self, EngineError> {
        let engine = Self {
            win_ansi: encoding::win_ansi_table()?,
            mac_roman: encoding::mac_roman_table()?,
            standard: encoding::standard_table(),
            pdf_doc: encoding::pdf_doc_table(),
            glyphs: GlyphNames::new(),
        };
        debug!("Built PDF engine with {} glyph names", engine.glyphs.len());
        Ok(engine)
    }

    /// Table for a named base encoding.
    pub fn base_encoding(&self, name: &[u8]) -> Option<&CodeTable> {
        match name {
            b"WinAnsiEncoding" => Some(&self.win_ansi),
            b"MacRomanEncoding" => Some(&self.mac_roman),
            b"StandardEncoding" => Some(&self.standard),
            b"PDFDocEncoding" => Some(&self.pdf_doc),
            _ => None,
        }
    }

    /// Adobe standard encoding.
    pub fn standard(&self) -> &CodeTable {
        &self.standard
    }

    /// Windows-1252.
    pub fn win_ansi(&self) -> &CodeTable {
        &self.win_ansi
    }

    /// PDFDocEncoding.
    pub fn pdf_doc(&self) -> &CodeTable {
        &self.pdf_doc
    }

    /// Resolve a glyph name.
    pub fn glyph(&self, name: &str) -> Option<char> {
        self.glyphs.resolve(name)
    }
}

/// Source of a [`PdfEngine`].
pub trait EngineLoader: Send + Sync {
    /// Produce a ready engine.
    fn load(&self) -> impl Future<Output = std::result::Result<PdfEngine, EngineError>> + Send;
}

/// Builds the engine from the bundled tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEngineLoader;

impl EngineLoader for StandardEngineLoader {
    async fn load(&self) -> std::result::Result<PdfEngine, EngineError> {
        PdfEngine::build()
    }
}

/// Shared handle to a lazily initialized engine.
///
/// Share it between decoders with `Arc`. At most one load attempt runs at
/// a time; a failed attempt is sticky until [`retry`](Self::retry).
pub struct EngineHandle<L: EngineLoader = StandardEngineLoader> {
    loader: L,
    engine: OnceLock<Arc<PdfEngine>>,
    guard: Mutex<()>,
    state: AtomicU8,
    attempts: AtomicUsize,
    finished: AtomicUsize,
}

impl EngineHandle<StandardEngineLoader> {
    /// Handle using the bundled tables.
    pub fn standard() -> Self {
        Self::new(StandardEngineLoader)
    }
}

impl Default for EngineHandle<StandardEngineLoader> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<L: EngineLoader> EngineHandle<L> {
    /// Create an uninitialized handle.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            engine: OnceLock::new(),
            guard: Mutex::new(()),
            state: AtomicU8::new(EngineState::Uninitialized as u8),
            attempts: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of load attempts started so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }

    /// The engine if it is already ready. Never starts an attempt.
    pub fn get(&self) -> Result<Arc<PdfEngine>> {
        self.engine.get().cloned().ok_or(ExtractError::EngineNotReady)
    }

    /// Wait until the engine is ready, starting the first attempt if needed.
    ///
    /// Returns [`ExtractError::EngineNotReady`] once an attempt has failed.
    pub async fn ready(&self) -> Result<Arc<PdfEngine>> {
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let _guard = self.guard.lock().await;
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }
        if self.state() == EngineState::Failed {
            debug!("PDF engine failed earlier, not retrying implicitly");
            return Err(ExtractError::EngineNotReady);
        }
        self.initialize().await
    }

    /// Run a new attempt after a failure.
    ///
    /// A caller that waited while another attempt ran to completion takes
    /// that attempt's outcome instead of starting its own.
    pub async fn retry(&self) -> Result<Arc<PdfEngine>> {
        let observed = self.finished.load(Ordering::Acquire);

        let _guard = self.guard.lock().await;
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }
        if self.finished.load(Ordering::Acquire) != observed {
            debug!("PDF engine attempt finished while waiting, sharing its failure");
            return Err(ExtractError::EngineNotReady);
        }
        self.initialize().await
    }

    /// Must be called with the guard held. An attempt dropped mid-load is
    /// never counted as finished.
    async fn initialize(&self) -> Result<Arc<PdfEngine>> {
        self.set_state(EngineState::Initializing);
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        info!("Initializing PDF engine (attempt {})", attempt);

        let loaded = self.loader.load().await;
        self.finished.fetch_add(1, Ordering::AcqRel);
        match loaded {
            Ok(engine) => {
                let engine = Arc::clone(self.engine.get_or_init(|| Arc::new(engine)));
                self.set_state(EngineState::Ready);
                info!("PDF engine ready");
                Ok(engine)
            }
            Err(e) => {
                error!("PDF engine initialization failed: {}", e);
                self.set_state(EngineState::Failed);
                Err(ExtractError::EngineNotReady)
            }
        }
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Counts loads and yields once so concurrent callers interleave.
    #[derive(Default)]
    pub struct CountingLoader {
        pub loads: AtomicUsize,
    }

    impl EngineLoader for CountingLoader {
        async fn load(&self) -> std::result::Result<PdfEngine, EngineError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            PdfEngine::build()
        }
    }

    /// Fails a fixed number of times, then succeeds.
    pub struct FlakyLoader {
        pub failures_left: AtomicUsize,
    }

    impl FlakyLoader {
        pub fn failing(times: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(times),
            }
        }
    }

    impl EngineLoader for FlakyLoader {
        async fn load(&self) -> std::result::Result<PdfEngine, EngineError> {
            tokio::task::yield_now().await;
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(EngineError::Loader("tables unavailable".to_string()));
            }
            PdfEngine::build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{CountingLoader, FlakyLoader};
    use super::*;
    use pretty_assertions::assert_eq;

    /// Never finishes its first load.
    #[derive(Default)]
    struct StallingLoader {
        calls: AtomicUsize,
    }

    impl EngineLoader for StallingLoader {
        fn load(&self) -> impl Future<Output = std::result::Result<PdfEngine, EngineError>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    std::future::pending::<()>().await;
                }
                PdfEngine::build()
            }
        }
    }

    #[test]
    fn test_get_before_bootstrap() {
        let handle = EngineHandle::standard();
        assert_eq!(handle.state(), EngineState::Uninitialized);
        assert!(matches!(handle.get(), Err(ExtractError::EngineNotReady)));
        assert_eq!(handle.attempts(), 0);
    }

    #[tokio::test]
    async fn test_ready_initializes_once() {
        let handle = EngineHandle::new(CountingLoader::default());
        handle.ready().await.unwrap();
        handle.ready().await.unwrap();
        assert_eq!(handle.state(), EngineState::Ready);
        assert_eq!(handle.loader.loads.load(Ordering::SeqCst), 1);
        assert!(handle.get().is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_attempt() {
        let handle = EngineHandle::new(CountingLoader::default());
        let (a, b) = tokio::join!(handle.ready(), handle.ready());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(handle.attempts(), 1);
        assert_eq!(handle.loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_sticky_until_retry() {
        let handle = EngineHandle::new(FlakyLoader::failing(1));

        assert!(matches!(handle.ready().await, Err(ExtractError::EngineNotReady)));
        assert_eq!(handle.state(), EngineState::Failed);

        assert!(matches!(handle.ready().await, Err(ExtractError::EngineNotReady)));
        assert_eq!(handle.attempts(), 1);

        handle.retry().await.unwrap();
        assert_eq!(handle.state(), EngineState::Ready);
        assert_eq!(handle.attempts(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_retries_run_one_attempt() {
        let handle = EngineHandle::new(FlakyLoader::failing(2));
        assert!(handle.ready().await.is_err());

        let (a, b) = tokio::join!(handle.retry(), handle.retry());
        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(handle.attempts(), 2);
        assert_eq!(handle.state(), EngineState::Failed);

        handle.retry().await.unwrap();
        assert_eq!(handle.attempts(), 3);
    }

    #[tokio::test]
    async fn test_retry_waiter_shares_success() {
        let handle = EngineHandle::new(FlakyLoader::failing(1));
        assert!(handle.ready().await.is_err());

        let (a, b, c) = tokio::join!(handle.retry(), handle.retry(), handle.retry());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(c.is_ok());
        assert_eq!(handle.attempts(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_attempt_is_restarted() {
        let handle = EngineHandle::new(StallingLoader::default());

        tokio::select! {
            biased;
            _ = handle.ready() => panic!("stalled load finished"),
            _ = std::future::ready(()) => {}
        }
        assert_eq!(handle.state(), EngineState::Initializing);
        assert_eq!(handle.attempts(), 1);

        handle.ready().await.unwrap();
        assert_eq!(handle.state(), EngineState::Ready);
        assert_eq!(handle.attempts(), 2);
    }

    #[test]
    fn test_base_encodings() {
        let engine = PdfEngine::build().unwrap();
        assert!(engine.base_encoding(b"WinAnsiEncoding").is_some());
        assert!(engine.base_encoding(b"MacRomanEncoding").is_some());
        assert!(engine.base_encoding(b"Identity-H").is_none());
        assert_eq!(engine.glyph("eacute"), Some('é'));
    }
}
