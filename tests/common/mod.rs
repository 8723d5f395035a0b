//! In-memory stand-ins for the desktop, the correction service and the
//! notification surface

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use textfix::clipboard::transaction::ClipboardTransaction;
use textfix::clipboard::ClipboardBackend;
use textfix::config::{CorrectionConfig, TimingConfig};
use textfix::correction::{
    CorrectionRequest, CorrectionResult, CorrectionService, Language, Usage,
};
use textfix::error::{ClipboardError, CorrectionError, InputError};
use textfix::input::{Chord, InputSimulator};
use textfix::notification::{NoticeKind, Notifier, ToastNotice, Toaster};
use textfix::orchestrator::Orchestrator;

/// A focused text field plus the system clipboard
///
/// Copy puts the selection on the clipboard; paste replaces the selection
/// with the clipboard contents.
#[derive(Default)]
pub struct Desktop {
    pub clipboard: Mutex<String>,
    pub selection: Mutex<String>,
    pub pasted: Mutex<Vec<String>>,
    pub chords: Mutex<Vec<Chord>>,
    pub chord_times: Mutex<Vec<Instant>>,
    pub fail_copy: Mutex<bool>,
    pub fail_paste: Mutex<bool>,
}

impl Desktop {
    pub fn new(clipboard: &str, selection: &str) -> Arc<Self> {
        let desktop = Self::default();
        *desktop.clipboard.lock().unwrap() = clipboard.to_string();
        *desktop.selection.lock().unwrap() = selection.to_string();
        Arc::new(desktop)
    }

    pub fn clipboard(&self) -> String {
        self.clipboard.lock().unwrap().clone()
    }

    pub fn selection(&self) -> String {
        self.selection.lock().unwrap().clone()
    }

    pub fn pasted(&self) -> Vec<String> {
        self.pasted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ClipboardBackend for Desktop {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        Ok(self.clipboard())
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.clipboard.lock().unwrap() = text.to_string();
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "desktop"
    }
}

#[async_trait::async_trait]
impl InputSimulator for Desktop {
    async fn send_chord(&self, chord: Chord) -> Result<(), InputError> {
        self.chords.lock().unwrap().push(chord);
        self.chord_times.lock().unwrap().push(Instant::now());
        match chord {
            Chord::Copy => {
                if *self.fail_copy.lock().unwrap() {
                    return Err(InputError::Failed {
                        tool: "fake",
                        message: "copy rejected".to_string(),
                    });
                }
                let selection = self.selection();
                // Apps leave the clipboard alone when nothing is selected
                if !selection.is_empty() {
                    *self.clipboard.lock().unwrap() = selection;
                }
            }
            Chord::Paste => {
                if *self.fail_paste.lock().unwrap() {
                    return Err(InputError::Failed {
                        tool: "fake",
                        message: "paste rejected".to_string(),
                    });
                }
                let text = self.clipboard();
                self.pasted.lock().unwrap().push(text.clone());
                *self.selection.lock().unwrap() = text;
            }
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "desktop"
    }
}

type Reply = Box<dyn Fn(&CorrectionRequest) -> Result<CorrectionResult, CorrectionError> + Send + Sync>;

/// Correction service with a scripted reply
pub struct ScriptedService {
    pub requests: Mutex<Vec<CorrectionRequest>>,
    reply: Reply,
    delay: Duration,
}

impl ScriptedService {
    pub fn new(
        reply: impl Fn(&CorrectionRequest) -> Result<CorrectionResult, CorrectionError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Box::new(reply),
            delay: Duration::ZERO,
        })
    }

    /// Replies with `corrected` after `delay`
    pub fn slow(corrected: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Box::new(move |_| Ok(corrected_result(corrected))),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CorrectionService for ScriptedService {
    async fn correct(&self, request: &CorrectionRequest) -> Result<CorrectionResult, CorrectionError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.reply)(request)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn corrected_result(text: &str) -> CorrectionResult {
    CorrectionResult {
        corrected_text: text.to_string(),
        changes: Vec::new(),
        usage: Usage::default(),
    }
}

/// Notification surface that tracks what is on screen
#[derive(Default)]
pub struct Screen {
    next_id: Mutex<u32>,
    on_screen: Mutex<BTreeSet<u32>>,
    max_on_screen: Mutex<usize>,
    pub shown: Mutex<Vec<(NoticeKind, String)>>,
}

impl Screen {
    pub fn shown(&self) -> Vec<(NoticeKind, String)> {
        self.shown.lock().unwrap().clone()
    }

    pub fn max_on_screen(&self) -> usize {
        *self.max_on_screen.lock().unwrap()
    }

    pub fn on_screen(&self) -> usize {
        self.on_screen.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Notifier for Screen {
    async fn show(&self, notice: &ToastNotice) -> Option<u32> {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let mut on_screen = self.on_screen.lock().unwrap();
        on_screen.insert(*next);
        let mut max = self.max_on_screen.lock().unwrap();
        *max = (*max).max(on_screen.len());
        self.shown
            .lock()
            .unwrap()
            .push((notice.kind, notice.message().to_string()));
        Some(*next)
    }

    async fn dismiss(&self, id: u32) {
        self.on_screen.lock().unwrap().remove(&id);
    }
}

pub const RELEASE_WAIT_MS: u64 = 20;

/// Settle waits short enough for tests
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        release_wait_ms: RELEASE_WAIT_MS,
        capture_settle_ms: 1,
        paste_settle_ms: 1,
        paste_complete_ms: 1,
        command_timeout_ms: 1000,
    }
}

/// Orchestrator over the fake desktop, with notices on `screen`
pub fn orchestrator(
    desktop: &Arc<Desktop>,
    service: Arc<dyn CorrectionService>,
    screen: &Arc<Screen>,
) -> Orchestrator {
    let transaction = ClipboardTransaction::new(desktop.clone(), desktop.clone(), fast_timing());
    let toaster = Toaster::new(screen.clone(), true, Duration::from_secs(60));
    let config = CorrectionConfig {
        language: Language::Pt,
        max_chars: 10_000,
    };
    Orchestrator::new(transaction, service, toaster, &config)
}

/// Answer one HTTP request with `status` and `body`
pub fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
        }
        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).unwrap();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
    });

    endpoint
}
