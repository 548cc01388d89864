//! Shared helpers for integration tests: in-memory PDFs, a scripted backend
//! and a recording observer.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use finextract::{
    ExtractionBackend, FinExtractError, LifecycleObserver, PendingFile, UploadResponse,
};
use futures::future::BoxFuture;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness. `RUST_LOG=finextract=debug`
/// shows ticks and transitions for a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A valid PDF with `pages` pages, one line of text each.
pub fn pdf_with_pages(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 780.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Statement page {n}"))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<Object>>(),
            "Count" => page_ids.len() as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Bytes of a tiny fake workbook (ZIP magic + padding).
pub fn workbook_bytes() -> Vec<u8> {
    let mut b = b"PK\x03\x04".to_vec();
    b.extend_from_slice(&[20, 0, 0, 0, 8, 0, 0xff, 0xfe]);
    b
}

/// A successful reply carrying `pnl` rows and a workbook.
pub fn success_reply(pnl: Value) -> Value {
    json!({
        "success": true,
        "financialData": {
            "pnl": pnl,
            "balanceSheet": [],
            "cashFlow": null,
            "others": []
        },
        "excelBuffer": STANDARD.encode(workbook_bytes())
    })
}

/// What the scripted backend answers.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 2xx with this JSON body.
    Json(Value),
    /// Non-2xx status.
    Status(u16),
    /// Connection failure.
    Unreachable,
}

/// Backend that waits `delay` (tokio time) and then answers `reply`.
pub struct ScriptedBackend {
    reply: Reply,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(reply: Reply, delay: Duration) -> Self {
        Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExtractionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn upload<'a>(
        &'a self,
        _file: &'a PendingFile,
    ) -> BoxFuture<'a, Result<UploadResponse, FinExtractError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Reply::Json(body) => serde_json::from_value::<UploadResponse>(body.clone())
                    .map_err(|e| FinExtractError::ResponseShape {
                        detail: e.to_string(),
                    }),
                Reply::Status(status) => Err(FinExtractError::HttpStatus {
                    status: *status,
                    detail: "scripted".into(),
                }),
                Reply::Unreachable => Err(FinExtractError::Transport {
                    url: "http://scripted.invalid/api/upload".into(),
                    reason: "connection refused".into(),
                }),
            }
        })
    }
}

/// Observer event, recorded in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String, usize),
    Progress(u8),
    Status(String),
    Complete(usize),
    Failed(String),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_processing_start(&self, file_name: &str, page_count: usize) {
        self.push(Event::Start(file_name.to_string(), page_count));
    }

    fn on_progress(&self, percent: u8) {
        self.push(Event::Progress(percent));
    }

    fn on_status(&self, message: &str) {
        self.push(Event::Status(message.to_string()));
    }

    fn on_complete(&self, total_rows: usize) {
        self.push(Event::Complete(total_rows));
    }

    fn on_failed(&self, user_message: &str) {
        self.push(Event::Failed(user_message.to_string()));
    }
}
