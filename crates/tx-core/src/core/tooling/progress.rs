use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Serializes stderr writes between the spinner thread and everything else.
pub(crate) static OUTPUT_LOCK: Mutex<()> = Mutex::new(());

static MANAGER: OnceLock<ProgressManager> = OnceLock::new();
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK: Duration = Duration::from_millis(80);
const START_DELAY: Duration = Duration::from_millis(120);

/// Whether spinners should render at all.
///
/// `TX_PROGRESS` overrides the terminal check: a falsey value (`0`, `false`,
/// `no`, `off` or empty) disables rendering, anything else forces it on.
/// Without the variable, spinners render only when stderr is a terminal.
pub fn progress_enabled() -> bool {
    match std::env::var("TX_PROGRESS") {
        Ok(value) => {
            let value = value.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        Err(_) => io::stderr().is_terminal(),
    }
}

struct ProgressTask {
    id: u64,
    label: String,
    started_at: Instant,
}

struct ProgressManager {
    tasks: Mutex<Vec<ProgressTask>>,
    suspended: AtomicU64,
    renderer_started: AtomicBool,
    line_drawn: AtomicBool,
}

impl ProgressManager {
    fn global() -> &'static Self {
        MANAGER.get_or_init(|| Self {
            tasks: Mutex::new(Vec::new()),
            suspended: AtomicU64::new(0),
            renderer_started: AtomicBool::new(false),
            line_drawn: AtomicBool::new(false),
        })
    }

    fn add_task(&'static self, label: String) -> u64 {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks.push(ProgressTask {
                id,
                label,
                started_at: Instant::now(),
            });
        }
        self.ensure_renderer();
        id
    }

    fn remove_task(&'static self, id: u64) {
        let empty = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks.retain(|task| task.id != id);
            tasks.is_empty()
        };
        if empty {
            let _guard = OUTPUT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            self.clear_if_drawn();
        }
    }

    fn suspend(&'static self) {
        self.suspended.fetch_add(1, Ordering::SeqCst);
        let _guard = OUTPUT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        self.clear_if_drawn();
    }

    fn resume(&'static self) {
        self.suspended.fetch_sub(1, Ordering::SeqCst);
    }

    fn ensure_renderer(&'static self) {
        if self.renderer_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = thread::Builder::new()
            .name("tx-progress".into())
            .spawn(move || self.render_loop());
    }

    fn render_loop(&'static self) {
        loop {
            thread::sleep(TICK);
            if self.suspended.load(Ordering::SeqCst) > 0 {
                continue;
            }
            let line = {
                let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                tasks.last().and_then(|task| {
                    let age = task.started_at.elapsed();
                    if age < START_DELAY {
                        return None;
                    }
                    let frame =
                        FRAMES[(age.as_millis() / TICK.as_millis()) as usize % FRAMES.len()];
                    Some(format!("tx ▸ {frame} {}", task.label))
                })
            };
            let _guard = OUTPUT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            match line {
                Some(line) => self.draw(&line),
                None => self.clear_if_drawn(),
            }
        }
    }

    // Callers hold OUTPUT_LOCK.
    fn draw(&self, line: &str) {
        let mut err = io::stderr().lock();
        let _ = write!(err, "\r\x1b[2K{line}");
        let _ = err.flush();
        self.line_drawn.store(true, Ordering::SeqCst);
    }

    fn clear_if_drawn(&self) {
        if self.line_drawn.swap(false, Ordering::SeqCst) {
            let mut err = io::stderr().lock();
            let _ = write!(err, "\r\x1b[2K");
            let _ = err.flush();
        }
    }
}

/// Handle for one spinner line. Dropping it removes the line.
pub struct ProgressReporter {
    task: Option<u64>,
}

impl ProgressReporter {
    pub fn spinner(label: impl Into<String>) -> Self {
        if !progress_enabled() {
            return Self { task: None };
        }
        let id = ProgressManager::global().add_task(label.into());
        Self { task: Some(id) }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(id) = self.task.take() {
            ProgressManager::global().remove_task(id);
        }
    }
}

/// Keeps the spinner line clear while a child process owns the terminal.
pub struct ProgressSuspendGuard(());

impl ProgressSuspendGuard {
    pub fn new() -> Self {
        ProgressManager::global().suspend();
        Self(())
    }
}

impl Default for ProgressSuspendGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressSuspendGuard {
    fn drop(&mut self) {
        ProgressManager::global().resume();
    }
}
