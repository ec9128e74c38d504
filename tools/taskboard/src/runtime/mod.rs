use crate::errors::TaskboardError;
use crate::render_tree::buffer_to_string;
use crate::types::Geometry;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use std::collections::{HashMap, VecDeque};
use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
    fn sleep_until(&self, deadline: SystemTime) -> Result<(), TaskboardError>;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, TaskboardError>;
    fn write_string(&self, path: &Path, contents: &str) -> Result<(), TaskboardError>;
    fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Interrupt,
    Resize,
    Other,
}

/// The single writer to the user's screen. Only the dashboard loop holds one.
pub trait Terminal: Send + Sync {
    fn stdin_is_tty(&self) -> bool;
    fn size(&self) -> Result<Geometry, TaskboardError>;
    fn write_line(&self, line: &str) -> Result<(), TaskboardError>;
    fn enter_screen(&self) -> Result<(), TaskboardError>;
    fn leave_screen(&self) -> Result<(), TaskboardError>;
    fn draw(&self, frame: &Buffer) -> Result<(), TaskboardError>;
    fn poll_key(&self, timeout: Duration) -> Result<Option<KeyInput>, TaskboardError>;
}

pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Holds the alternate screen for as long as it lives and hands the screen
/// back on drop, whichever way the owner exits.
pub struct ScreenGuard<'a> {
    terminal: &'a dyn Terminal,
}

impl<'a> ScreenGuard<'a> {
    pub fn acquire(terminal: &'a dyn Terminal) -> Result<Self, TaskboardError> {
        terminal.enter_screen()?;
        Ok(Self { terminal })
    }
}

impl Drop for ScreenGuard<'_> {
    fn drop(&mut self) {
        let _ = self.terminal.leave_screen();
    }
}

pub struct ProductionClock;

impl Clock for ProductionClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), TaskboardError> {
        let now = SystemTime::now();
        if let Ok(duration) = deadline.duration_since(now) {
            std::thread::sleep(duration);
        }
        Ok(())
    }
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, TaskboardError> {
        std::fs::read_to_string(path).map_err(|e| TaskboardError::Io(e.to_string()))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), TaskboardError> {
        std::fs::write(path, contents).map_err(|e| TaskboardError::Io(e.to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

type CrosstermTerminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

/// Crossterm-backed screen. ratatui keeps the previous frame and only flushes
/// the cells that changed between draws.
pub struct ProductionTerminal {
    screen: Mutex<Option<CrosstermTerminal>>,
}

impl ProductionTerminal {
    pub fn new() -> Self {
        Self {
            screen: Mutex::new(None),
        }
    }

    fn lock_screen(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<CrosstermTerminal>>, TaskboardError> {
        self.screen
            .lock()
            .map_err(|_| TaskboardError::Terminal("screen lock poisoned".to_string()))
    }
}

impl Default for ProductionTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for ProductionTerminal {
    fn stdin_is_tty(&self) -> bool {
        std::io::IsTerminal::is_terminal(&std::io::stdin())
            && std::io::IsTerminal::is_terminal(&std::io::stdout())
    }

    fn size(&self) -> Result<Geometry, TaskboardError> {
        let (columns, rows) =
            crossterm::terminal::size().map_err(|e| TaskboardError::Terminal(e.to_string()))?;
        Ok(Geometry::new(columns, rows))
    }

    fn write_line(&self, line: &str) -> Result<(), TaskboardError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| TaskboardError::Io(e.to_string()))
    }

    fn enter_screen(&self) -> Result<(), TaskboardError> {
        let mut screen = self.lock_screen()?;
        if screen.is_some() {
            return Ok(());
        }
        enable_raw_mode().map_err(|e| TaskboardError::Terminal(e.to_string()))?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)
            .map_err(|e| TaskboardError::Terminal(e.to_string()))?;
        let terminal = ratatui::Terminal::new(CrosstermBackend::new(stdout))
            .map_err(|e| TaskboardError::Terminal(e.to_string()))?;
        *screen = Some(terminal);
        Ok(())
    }

    fn leave_screen(&self) -> Result<(), TaskboardError> {
        let mut screen = self.lock_screen()?;
        if screen.take().is_some() {
            disable_raw_mode().map_err(|e| TaskboardError::Terminal(e.to_string()))?;
            execute!(std::io::stdout(), LeaveAlternateScreen, cursor::Show)
                .map_err(|e| TaskboardError::Terminal(e.to_string()))?;
        }
        Ok(())
    }

    fn draw(&self, frame: &Buffer) -> Result<(), TaskboardError> {
        let mut screen = self.lock_screen()?;
        let Some(terminal) = screen.as_mut() else {
            return Err(TaskboardError::Terminal(
                "draw called before entering the screen".to_string(),
            ));
        };
        terminal
            .draw(|f| {
                // A fixed-size frame may disagree with the real screen; copy the overlap only.
                let area = f.area().intersection(frame.area);
                let target = f.buffer_mut();
                for y in area.top()..area.bottom() {
                    for x in area.left()..area.right() {
                        target[(x, y)] = frame[(x, y)].clone();
                    }
                }
            })
            .map_err(|e| TaskboardError::Terminal(e.to_string()))?;
        Ok(())
    }

    fn poll_key(&self, timeout: Duration) -> Result<Option<KeyInput>, TaskboardError> {
        if !event::poll(timeout).map_err(|e| TaskboardError::Terminal(e.to_string()))? {
            return Ok(None);
        }
        let input = match event::read().map_err(|e| TaskboardError::Terminal(e.to_string()))? {
            Event::Key(key) if key.kind != KeyEventKind::Press => KeyInput::Other,
            Event::Key(key)
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c') =>
            {
                KeyInput::Interrupt
            }
            Event::Key(key) => match key.code {
                KeyCode::Char(c) => KeyInput::Char(c),
                KeyCode::Esc => KeyInput::Char('\u{1b}'),
                _ => KeyInput::Other,
            },
            Event::Resize(_, _) => KeyInput::Resize,
            _ => KeyInput::Other,
        };
        Ok(Some(input))
    }
}

pub struct ProductionRuntime {
    pub clock: Arc<dyn Clock>,
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ProductionClock),
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal::new()),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<SystemTime>>,
    sleeps: Arc<Mutex<Vec<SystemTime>>>,
}

impl FakeClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }

    pub fn sleeps(&self) -> Vec<SystemTime> {
        self.sleeps.lock().expect("sleep lock").clone()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().expect("clock lock")
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), TaskboardError> {
        self.sleeps.lock().expect("sleep lock").push(deadline);
        let mut now = self.now.lock().expect("clock lock");
        if deadline > *now {
            *now = deadline;
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
    fail_next: Arc<Mutex<Option<TaskboardError>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
        fs
    }

    pub fn set_fail_next(&self, error: TaskboardError) {
        *self.fail_next.lock().expect("fail lock") = Some(error);
    }

    fn maybe_fail(&self) -> Result<(), TaskboardError> {
        if let Some(err) = self.fail_next.lock().expect("fail lock").take() {
            return Err(err);
        }
        Ok(())
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, TaskboardError> {
        self.maybe_fail()?;
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| TaskboardError::Io(format!("missing file {}", path.display())))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), TaskboardError> {
        self.maybe_fail()?;
        self.files
            .lock()
            .expect("files lock")
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock").contains_key(path)
    }
}

/// Records everything the dashboard does to the screen. Keys are handed out in
/// the order they were queued; once the queue is empty `poll_key` reports no
/// input without blocking.
#[derive(Clone)]
pub struct FakeTerminal {
    pub is_tty: bool,
    geometry: Arc<Mutex<Geometry>>,
    writes: Arc<Mutex<Vec<String>>>,
    draws: Arc<Mutex<Vec<String>>>,
    keys: Arc<Mutex<VecDeque<KeyInput>>>,
    screen_events: Arc<Mutex<Vec<&'static str>>>,
    fail_draw_at: Arc<Mutex<Option<usize>>>,
}

impl FakeTerminal {
    pub fn new(is_tty: bool) -> Self {
        Self::with_geometry(is_tty, Geometry::new(120, 30))
    }

    pub fn with_geometry(is_tty: bool, geometry: Geometry) -> Self {
        Self {
            is_tty,
            geometry: Arc::new(Mutex::new(geometry)),
            writes: Arc::new(Mutex::new(Vec::new())),
            draws: Arc::new(Mutex::new(Vec::new())),
            keys: Arc::new(Mutex::new(VecDeque::new())),
            screen_events: Arc::new(Mutex::new(Vec::new())),
            fail_draw_at: Arc::new(Mutex::new(None)),
        }
    }

    pub fn resize(&self, geometry: Geometry) {
        *self.geometry.lock().expect("geometry lock") = geometry;
    }

    pub fn push_key(&self, key: KeyInput) {
        self.keys.lock().expect("keys lock").push_back(key);
    }

    /// Makes the draw with the given zero-based index fail.
    pub fn fail_draw_at(&self, index: usize) {
        *self.fail_draw_at.lock().expect("fail lock") = Some(index);
    }

    pub fn written_lines(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }

    pub fn drawn_frames(&self) -> Vec<String> {
        self.draws.lock().expect("draw lock").clone()
    }

    pub fn screen_events(&self) -> Vec<&'static str> {
        self.screen_events.lock().expect("screen lock").clone()
    }
}

impl Default for FakeTerminal {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Terminal for FakeTerminal {
    fn stdin_is_tty(&self) -> bool {
        self.is_tty
    }

    fn size(&self) -> Result<Geometry, TaskboardError> {
        Ok(*self.geometry.lock().expect("geometry lock"))
    }

    fn write_line(&self, line: &str) -> Result<(), TaskboardError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(line.to_string());
        Ok(())
    }

    fn enter_screen(&self) -> Result<(), TaskboardError> {
        self.screen_events.lock().expect("screen lock").push("enter");
        Ok(())
    }

    fn leave_screen(&self) -> Result<(), TaskboardError> {
        self.screen_events.lock().expect("screen lock").push("leave");
        Ok(())
    }

    fn draw(&self, frame: &Buffer) -> Result<(), TaskboardError> {
        let mut draws = self.draws.lock().expect("draw lock");
        if *self.fail_draw_at.lock().expect("fail lock") == Some(draws.len()) {
            return Err(TaskboardError::Terminal("fake draw failure".to_string()));
        }
        draws.push(buffer_to_string(frame));
        Ok(())
    }

    fn poll_key(&self, _timeout: Duration) -> Result<Option<KeyInput>, TaskboardError> {
        Ok(self.keys.lock().expect("keys lock").pop_front())
    }
}
