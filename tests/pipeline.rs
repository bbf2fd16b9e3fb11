//! Page pipeline tests with in-memory collaborators.
//!
//! pdfium, tesseract and the LLM are replaced by fakes, so these run without
//! native libraries or API keys. Each fake page image is a 2×2 grey square
//! whose shade is the page index, which lets the fakes tell pages apart.

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions};
use edgequake_pdf2txt::pipeline::encode::encode_page;
use edgequake_pdf2txt::pipeline::llm::{ChatBackend, ChatReply};
use edgequake_pdf2txt::pipeline::merge::merge_pages;
use edgequake_pdf2txt::pipeline::workdir::{Artifact, PageFile, WorkDir};
use edgequake_pdf2txt::pipeline::{process_pages, LocalOcr, PageSource};
use edgequake_pdf2txt::prompts::{CURRENT_PAGE_LABEL, NEXT_PAGE_LABEL, PREVIOUS_PAGE_LABEL};
use edgequake_pdf2txt::{
    Engines, ExtractionMethod, FailedPagePolicy, OcrMode, PageError, Pdf2TxtError, PipelineConfig,
};
use image::{DynamicImage, GrayImage, Luma};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

// ── Fakes ────────────────────────────────────────────────────────────────────

fn page_image(index: usize) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([index as u8])))
}

fn shade(image: &DynamicImage) -> usize {
    image.to_luma8().get_pixel(0, 0)[0] as usize
}

/// Pages with the given embedded text. Every page renders unless marked broken.
#[derive(Default)]
struct FakeSource {
    embedded: HashMap<usize, String>,
    unreadable_text: Option<usize>,
    unrenderable: Option<usize>,
    text_calls: AtomicUsize,
    render_calls: AtomicUsize,
}

impl FakeSource {
    fn with_text(pages: &[(usize, &str)]) -> Self {
        Self {
            embedded: pages.iter().map(|(i, t)| (*i, t.to_string())).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn embedded_text(&self, page: &PageFile) -> Result<String, String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreadable_text == Some(page.index) {
            return Err("corrupt content stream".into());
        }
        Ok(self.embedded.get(&page.index).cloned().unwrap_or_default())
    }

    async fn render(&self, page: &PageFile) -> Result<DynamicImage, String> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        if self.unrenderable == Some(page.index) {
            return Err("boom".into());
        }
        Ok(page_image(page.index))
    }
}

#[derive(Default)]
struct FakeOcr {
    calls: AtomicUsize,
}

#[async_trait]
impl LocalOcr for FakeOcr {
    async fn recognise(&self, image: &DynamicImage) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("ocr text of page {}", shade(image) + 1))
    }
}

/// Cleanup model that upper-cases its input, optionally failing first.
#[derive(Default)]
struct FakeCleanup {
    fail_first: AtomicUsize,
    fail_on: Option<&'static str>,
    delay_ms: u64,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ChatBackend for FakeCleanup {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<ChatReply, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let raw = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err("429 Too Many Requests".into());
        }
        if self.fail_on.is_some_and(|needle| raw.contains(needle)) {
            return Err("400 Bad Request".into());
        }
        Ok(ChatReply {
            content: raw.to_uppercase(),
            input_tokens: raw.len(),
            output_tokens: raw.len(),
        })
    }
}

/// Vision model that records the labelled images of every request.
#[derive(Default)]
struct FakeVision {
    requests: Mutex<Vec<Vec<(String, String)>>>,
}

#[async_trait]
impl ChatBackend for FakeVision {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<ChatReply, String> {
        let labelled: Vec<(String, String)> = messages
            .iter()
            .filter_map(|m| {
                let img = m.images.as_ref()?.first()?;
                Some((m.content.clone(), img.data.clone()))
            })
            .collect();

        let current = labelled
            .iter()
            .find(|(label, _)| label == CURRENT_PAGE_LABEL)
            .map(|(_, data)| data.clone())
            .ok_or("no current page")?;
        let page = (0..16)
            .find(|&i| encoded(i) == current)
            .ok_or("unknown image")?;

        self.requests.lock().unwrap().push(labelled);
        Ok(ChatReply {
            content: format!("vision text of page {}", page + 1),
            input_tokens: 100,
            output_tokens: 10,
        })
    }
}

fn encoded(index: usize) -> String {
    encode_page(&page_image(index)).unwrap().data
}

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Harness {
    source: Arc<FakeSource>,
    ocr: Arc<FakeOcr>,
    vision: Arc<FakeVision>,
    cleanup: Arc<FakeCleanup>,
}

impl Harness {
    fn new(source: FakeSource, cleanup: FakeCleanup) -> Self {
        Self {
            source: Arc::new(source),
            ocr: Arc::new(FakeOcr::default()),
            vision: Arc::new(FakeVision::default()),
            cleanup: Arc::new(cleanup),
        }
    }

    fn engines(&self, with_local_ocr: bool) -> Engines {
        Engines {
            source: self.source.clone(),
            local_ocr: with_local_ocr.then(|| self.ocr.clone() as Arc<dyn LocalOcr>),
            ocr_llm: self.vision.clone(),
            cleanup_llm: self.cleanup.clone(),
        }
    }
}

fn pages(work: &WorkDir, count: usize) -> Vec<PageFile> {
    (0..count).map(|i| PageFile::new(i, &work.pages_dir())).collect()
}

fn base_config() -> edgequake_pdf2txt::PipelineConfigBuilder {
    PipelineConfig::builder().retry_backoff_ms(1).max_retries(2)
}

fn segments(text: &str) -> Vec<String> {
    text.trim_end_matches('\n')
        .split("\n\u{000C}\n")
        .map(str::to_string)
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn auto_mode_ocrs_only_the_page_without_text() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(
        FakeSource::with_text(&[(0, "primera página"), (2, "tercera página")]),
        FakeCleanup::default(),
    );
    let config = base_config().ocr_mode(OcrMode::Auto).build().unwrap();
    let pages = pages(&work, 3);

    let results = process_pages(&pages, &config, &h.engines(true), &work)
        .await
        .unwrap();

    let methods: Vec<ExtractionMethod> = results.iter().map(|r| r.method).collect();
    assert_eq!(
        methods,
        vec![
            ExtractionMethod::Embedded,
            ExtractionMethod::LocalOcr,
            ExtractionMethod::Embedded
        ]
    );
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 1);
    assert!(h.vision.requests.lock().unwrap().is_empty());

    let merged = merge_pages(&results, 3, &config).unwrap();
    assert_eq!(
        segments(&merged),
        vec!["PRIMERA PÁGINA", "OCR TEXT OF PAGE 2", "TERCERA PÁGINA"]
    );
}

#[tokio::test]
async fn embedded_text_never_reaches_ocr() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(
        FakeSource::with_text(&[(0, "uno"), (1, "dos"), (2, "tres"), (3, "cuatro")]),
        FakeCleanup::default(),
    );
    let config = base_config().build().unwrap();

    let results = process_pages(&pages(&work, 4), &config, &h.engines(true), &work)
        .await
        .unwrap();

    assert!(results.iter().all(|r| r.method == ExtractionMethod::Embedded));
    assert_eq!(h.source.render_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);
    assert!(h.vision.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn auto_mode_without_tesseract_falls_back_to_vision() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(
        FakeSource::with_text(&[(0, "uno")]),
        FakeCleanup::default(),
    );
    let config = base_config().build().unwrap();

    let results = process_pages(&pages(&work, 2), &config, &h.engines(false), &work)
        .await
        .unwrap();

    assert_eq!(results[1].method, ExtractionMethod::LlmOcr);
    assert_eq!(results[1].text, "VISION TEXT OF PAGE 2");
    assert_eq!(h.vision.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn local_mode_without_tesseract_fails_the_page() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(
        FakeSource::with_text(&[(0, "uno")]),
        FakeCleanup::default(),
    );
    let config = base_config().ocr_mode(OcrMode::Local).build().unwrap();

    let results = process_pages(&pages(&work, 2), &config, &h.engines(false), &work)
        .await
        .unwrap();

    assert!(results[0].is_ok());
    assert_eq!(results[1].error, Some(PageError::OcrUnavailable { page: 2 }));
    assert!(h.vision.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn llm_mode_sends_neighbours_as_context() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(FakeSource::default(), FakeCleanup::default());
    let config = base_config().ocr_mode(OcrMode::Llm).build().unwrap();

    let results = process_pages(&pages(&work, 3), &config, &h.engines(true), &work)
        .await
        .unwrap();

    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.method, ExtractionMethod::LlmOcr);
        assert_eq!(r.text, format!("VISION TEXT OF PAGE {}", i + 1));
    }
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);

    let requests = h.vision.requests.lock().unwrap();
    let middle = requests
        .iter()
        .find(|req| req.iter().any(|(l, d)| l == CURRENT_PAGE_LABEL && *d == encoded(1)))
        .expect("a request for page 2");
    assert_eq!(
        middle,
        &vec![
            (PREVIOUS_PAGE_LABEL.to_string(), encoded(0)),
            (CURRENT_PAGE_LABEL.to_string(), encoded(1)),
            (NEXT_PAGE_LABEL.to_string(), encoded(2)),
        ]
    );

    let first = requests
        .iter()
        .find(|req| req.iter().any(|(l, d)| l == CURRENT_PAGE_LABEL && *d == encoded(0)))
        .expect("a request for page 1");
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn unrenderable_page_fails_alone_and_leaves_the_neighbours_context() {
    let work = WorkDir::temporary().unwrap();
    let source = FakeSource {
        unrenderable: Some(1),
        ..Default::default()
    };
    let h = Harness::new(source, FakeCleanup::default());
    let config = base_config().ocr_mode(OcrMode::Llm).build().unwrap();

    let results = process_pages(&pages(&work, 3), &config, &h.engines(true), &work)
        .await
        .unwrap();

    assert_eq!(
        results[1].error,
        Some(PageError::ExtractionFailed {
            page: 2,
            detail: "boom".into()
        })
    );
    assert_eq!(results[0].text, "VISION TEXT OF PAGE 1");
    assert_eq!(results[2].text, "VISION TEXT OF PAGE 3");

    // Pages 1 and 3 each lose page 2 as context and keep only themselves.
    let requests = h.vision.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    for req in requests.iter() {
        assert_eq!(req.len(), 1, "{:?}", req.iter().map(|(l, _)| l).collect::<Vec<_>>());
        assert_eq!(req[0].0, CURRENT_PAGE_LABEL);
        assert_ne!(req[0].1, encoded(1));
    }
    drop(requests);

    let merged = merge_pages(&results, 3, &config).unwrap();
    assert_eq!(
        segments(&merged),
        vec![
            "VISION TEXT OF PAGE 1",
            "[page 2: extraction failed: boom]",
            "VISION TEXT OF PAGE 3"
        ]
    );
}

#[tokio::test]
async fn unreadable_text_layer_falls_back_to_ocr() {
    let work = WorkDir::temporary().unwrap();
    let source = FakeSource {
        unreadable_text: Some(1),
        ..FakeSource::with_text(&[(0, "uno"), (1, "dos"), (2, "tres")])
    };
    let h = Harness::new(source, FakeCleanup::default());
    let config = base_config().build().unwrap();

    let results = process_pages(&pages(&work, 3), &config, &h.engines(true), &work)
        .await
        .unwrap();

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(results[1].method, ExtractionMethod::LocalOcr);
    assert_eq!(results[1].text, "OCR TEXT OF PAGE 2");
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.source.render_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let work = WorkDir::temporary().unwrap();
    let text: Vec<(usize, String)> = (0..10).map(|i| (i, format!("página {}", i + 1))).collect();
    let text_refs: Vec<(usize, &str)> = text.iter().map(|(i, t)| (*i, t.as_str())).collect();
    let h = Harness::new(
        FakeSource::with_text(&text_refs),
        FakeCleanup {
            delay_ms: 20,
            ..Default::default()
        },
    );
    let config = base_config().concurrency(3).build().unwrap();

    let results = process_pages(&pages(&work, 10), &config, &h.engines(true), &work)
        .await
        .unwrap();

    assert_eq!(results.len(), 10);
    assert!(h.cleanup.peak.load(Ordering::SeqCst) <= 3);
    let nums: Vec<usize> = results.iter().map(|r| r.page_num).collect();
    assert_eq!(nums, (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn transient_cleanup_failure_is_retried() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(
        FakeSource::with_text(&[(0, "hola")]),
        FakeCleanup {
            fail_first: AtomicUsize::new(1),
            ..Default::default()
        },
    );
    let config = base_config().build().unwrap();

    let results = process_pages(&pages(&work, 1), &config, &h.engines(true), &work)
        .await
        .unwrap();

    assert_eq!(results[0].text, "HOLA");
    assert_eq!(results[0].retries, 1);
    assert_eq!(h.cleanup.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_retries_fail_only_that_page() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(
        FakeSource::with_text(&[(0, "bien"), (1, "veneno"), (2, "bien")]),
        FakeCleanup {
            fail_on: Some("veneno"),
            ..Default::default()
        },
    );
    let config = base_config().build().unwrap();

    let results = process_pages(&pages(&work, 3), &config, &h.engines(true), &work)
        .await
        .unwrap();

    assert!(results[0].is_ok() && results[2].is_ok());
    assert!(matches!(
        results[1].error,
        Some(PageError::CleanupFailed { page: 2, retries: 2, .. })
    ));

    let merged = merge_pages(&results, 3, &config).unwrap();
    let segs = segments(&merged);
    assert_eq!(segs.len(), 3);
    assert!(segs[1].starts_with("[page 2: cleanup failed after 2 retries"), "{}", segs[1]);

    let skip = base_config()
        .on_page_failure(FailedPagePolicy::Skip)
        .build()
        .unwrap();
    assert_eq!(segments(&merge_pages(&results, 3, &skip).unwrap()), vec!["BIEN", "BIEN"]);
}

#[tokio::test]
async fn abort_policy_fails_the_run() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(
        FakeSource::with_text(&[(0, "uno"), (2, "tres")]),
        FakeCleanup::default(),
    );
    let config = base_config()
        .ocr_mode(OcrMode::Local)
        .on_page_failure(FailedPagePolicy::Abort)
        .build()
        .unwrap();

    let err = process_pages(&pages(&work, 3), &config, &h.engines(false), &work)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Pdf2TxtError::PageAborted {
            source: PageError::OcrUnavailable { page: 2 }
        }
    ));
}

#[tokio::test]
async fn resume_reuses_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let work = WorkDir::persistent(dir.path()).unwrap();
    let pages = pages(&work, 2);

    work.write_artifact(&pages[0], Artifact::Raw, "crudo uno").await.unwrap();
    work.write_artifact(&pages[0], Artifact::Clean, "Limpio uno").await.unwrap();
    work.write_artifact(&pages[1], Artifact::Raw, "crudo dos").await.unwrap();

    let h = Harness::new(FakeSource::default(), FakeCleanup::default());
    let config = base_config()
        .work_dir(dir.path())
        .resume(true)
        .build()
        .unwrap();

    let results = process_pages(&pages, &config, &h.engines(true), &work)
        .await
        .unwrap();

    assert_eq!(results[0].text, "Limpio uno");
    assert_eq!(results[0].method, ExtractionMethod::Resumed);
    assert_eq!(results[1].text, "CRUDO DOS");
    assert_eq!(h.source.text_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.source.render_calls.load(Ordering::SeqCst), 0);
    // Only page 2 still needed cleaning.
    assert_eq!(h.cleanup.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        work.read_artifact(&pages[1], Artifact::Clean).await.unwrap().as_deref(),
        Some("CRUDO DOS")
    );
}

#[tokio::test]
async fn artifacts_are_written_for_every_page() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(FakeSource::with_text(&[(0, "a"), (1, "b")]), FakeCleanup::default());
    let config = base_config().build().unwrap();
    let pages = pages(&work, 2);

    process_pages(&pages, &config, &h.engines(true), &work).await.unwrap();

    for (page, raw) in pages.iter().zip(["a", "b"]) {
        assert_eq!(
            work.read_artifact(page, Artifact::Raw).await.unwrap().as_deref(),
            Some(raw)
        );
        assert_eq!(
            work.read_artifact(page, Artifact::Clean).await.unwrap().as_deref(),
            Some(raw.to_uppercase().as_str())
        );
    }
}

#[test]
fn page_results_serialise_to_json() {
    let work = WorkDir::temporary().unwrap();
    let h = Harness::new(FakeSource::with_text(&[(0, "uno")]), FakeCleanup::default());
    let config = base_config().ocr_mode(OcrMode::Local).build().unwrap();

    let results = tokio_test::block_on(process_pages(
        &pages(&work, 2),
        &config,
        &h.engines(false),
        &work,
    ))
    .unwrap();

    let json = serde_json::to_string_pretty(&results).expect("results must serialise");
    let back: Vec<edgequake_pdf2txt::PageResult> =
        serde_json::from_str(&json).expect("results must deserialise");
    assert_eq!(back[0].text, "UNO");
    assert_eq!(back[1].error, Some(PageError::OcrUnavailable { page: 2 }));
}
