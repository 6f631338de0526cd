use crate::audio::{MediaBackend, NullBackend, RodioBackend};
use crate::config::{self, Settings};
use crate::library;
use crate::logging;
use crate::shell::{AfterCurrent, Intent, StatusBar, StatusReporter};
use crate::transport::{PlaybackClock, Transport};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

const VOLUME_STEP: u8 = 5;
const SEEK_STEP: f32 = 0.05;

#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub sets: Vec<String>,
    pub no_shuffle: bool,
    pub looping: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetChooser {
    pub sets: Vec<String>,
    pub chosen: Vec<bool>,
    pub selected: usize,
    pub shuffle: bool,
}

impl SetChooser {
    pub fn new(sets: Vec<String>, shuffle: bool) -> Self {
        let chosen = vec![false; sets.len()];
        Self {
            sets,
            chosen,
            selected: 0,
            shuffle,
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.sets.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn toggle_selected(&mut self) {
        if let Some(chosen) = self.chosen.get_mut(self.selected) {
            *chosen = !*chosen;
        }
    }

    pub fn choice(&self) -> Vec<String> {
        let checked: Vec<String> = self
            .sets
            .iter()
            .zip(&self.chosen)
            .filter(|(_, chosen)| **chosen)
            .map(|(name, _)| name.clone())
            .collect();
        if !checked.is_empty() {
            return checked;
        }
        self.sets.get(self.selected).cloned().into_iter().collect()
    }
}

pub struct App {
    transport: Transport<StatusBar>,
    sets_dir: PathBuf,
    settings: Settings,
    settings_changed: bool,
    chooser: Option<SetChooser>,
    show_history: bool,
    movement_cursor: usize,
    synced_index: Option<usize>,
    clock: PlaybackClock,
    dirty: bool,
}

impl App {
    pub fn new(backend: Box<dyn MediaBackend>, sets_dir: PathBuf, settings: Settings) -> Self {
        let mut transport = Transport::new(backend, StatusBar::new());
        transport.set_volume(settings.volume());
        transport.set_looping(settings.loop_playlist);
        Self {
            transport,
            sets_dir,
            settings,
            settings_changed: false,
            chooser: None,
            show_history: false,
            movement_cursor: 0,
            synced_index: None,
            clock: PlaybackClock::default(),
            dirty: true,
        }
    }

    pub fn transport(&self) -> &Transport<StatusBar> {
        &self.transport
    }

    pub fn chooser(&self) -> Option<&SetChooser> {
        self.chooser.as_ref()
    }

    pub fn show_history(&self) -> bool {
        self.show_history
    }

    pub fn movement_cursor(&self) -> usize {
        self.movement_cursor
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn should_exit(&self) -> bool {
        self.transport.shell().exit_requested
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty || self.transport.shell().dirty
    }

    pub fn mark_drawn(&mut self) {
        self.dirty = false;
        self.transport.shell_mut().dirty = false;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn open_chooser(&mut self) {
        match library::available_sets(&self.sets_dir) {
            Ok(sets) if sets.is_empty() => self.transport.shell_mut().notify_error(&format!(
                "No directory sets in {}",
                self.sets_dir.display()
            )),
            Ok(sets) => self.chooser = Some(SetChooser::new(sets, self.settings.shuffle)),
            Err(err) => self.transport.shell_mut().notify_error(&err.to_string()),
        }
        self.dirty = true;
    }

    pub fn tick(&mut self) {
        self.clock = self.transport.tick();
        self.sync_cursor();
        self.dirty = true;
    }

    pub fn dispatch(&mut self, intent: Intent) {
        match intent {
            Intent::PlayPause => self.transport.play_pause(),
            Intent::Next => {
                self.transport.advance();
            }
            Intent::Previous => self.transport.previous(),
            Intent::SelectMovement(index) => self.transport.select_movement(index),
            Intent::SetVolume(volume) => {
                self.transport.set_volume(volume);
                self.remember(|settings| settings.default_volume = volume.min(100));
            }
            Intent::ToggleMute => self.transport.toggle_mute(),
            Intent::Seek(position) => self.transport.seek(position),
            Intent::ToggleLoop(enabled) => {
                self.transport.set_looping(enabled);
                self.remember(|settings| settings.loop_playlist = enabled);
                let message = if enabled { "Loop on" } else { "Loop off" };
                self.transport.shell_mut().notify_info(message);
            }
            Intent::TogglePauseAfterCurrent => {
                let shell = self.transport.shell_mut();
                let enabled = !shell.pause_after_current();
                shell.set_pause_after_current(enabled);
            }
            Intent::ToggleExitAfterCurrent => {
                let shell = self.transport.shell_mut();
                shell.exit_after_current = !shell.exit_after_current;
                shell.dirty = true;
            }
            Intent::LoadNewSet { sets, shuffle } => self.load_sets(&sets, shuffle),
            Intent::Exit => self.transport.shell_mut().request_exit(),
        }
        self.sync_cursor();
        self.dirty = true;
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.dispatch(Intent::Exit);
            return;
        }

        if self.chooser.is_some() {
            self.handle_chooser_key(key);
            return;
        }

        if self.show_history {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Enter) {
                self.show_history = false;
                self.dirty = true;
            }
            return;
        }

        match key.code {
            KeyCode::Up => self.movement_cursor = self.movement_cursor.saturating_sub(1),
            KeyCode::Down => {
                let len = self.transport.current().movements.len();
                if self.movement_cursor + 1 < len {
                    self.movement_cursor += 1;
                }
            }
            KeyCode::Char('o') => self.open_chooser(),
            KeyCode::Char('h') => self.show_history = true,
            _ => {
                if let Some(intent) = self.intent_for_key(key) {
                    self.dispatch(intent);
                }
            }
        }
        self.dirty = true;
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.transport.exit();
        if self.settings_changed {
            config::save_settings(&self.settings)?;
        }
        Ok(())
    }

    fn intent_for_key(&self, key: KeyEvent) -> Option<Intent> {
        let volume = self.transport.volume();
        let position = self.transport.backend().position().unwrap_or(0.0);
        let intent = match key.code {
            KeyCode::Char(' ') => Intent::PlayPause,
            KeyCode::Char('n') | KeyCode::Right => Intent::Next,
            KeyCode::Char('p') | KeyCode::Left => Intent::Previous,
            KeyCode::Enter => Intent::SelectMovement(self.movement_cursor),
            KeyCode::Char(digit @ '1'..='9') => {
                Intent::SelectMovement(digit as usize - '1' as usize)
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                Intent::SetVolume(volume.saturating_add(VOLUME_STEP).min(100))
            }
            KeyCode::Char('-') => Intent::SetVolume(volume.saturating_sub(VOLUME_STEP)),
            KeyCode::Char('m') => Intent::ToggleMute,
            KeyCode::Char('.') => Intent::Seek((position + SEEK_STEP).min(1.0)),
            KeyCode::Char(',') => Intent::Seek((position - SEEK_STEP).max(0.0)),
            KeyCode::Char('l') => Intent::ToggleLoop(!self.transport.is_looping()),
            KeyCode::Char('a') => Intent::TogglePauseAfterCurrent,
            KeyCode::Char('x') => Intent::ToggleExitAfterCurrent,
            KeyCode::Char('q') => Intent::Exit,
            _ => return None,
        };
        Some(intent)
    }

    fn handle_chooser_key(&mut self, key: KeyEvent) {
        let Some(chooser) = self.chooser.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.chooser = None,
            KeyCode::Down => chooser.select_next(),
            KeyCode::Up => chooser.select_prev(),
            KeyCode::Char(' ') => chooser.toggle_selected(),
            KeyCode::Char('s') => chooser.shuffle = !chooser.shuffle,
            KeyCode::Enter => {
                let sets = chooser.choice();
                let shuffle = chooser.shuffle;
                if shuffle != self.settings.shuffle {
                    self.remember(|settings| settings.shuffle = shuffle);
                }
                self.dispatch(Intent::LoadNewSet { sets, shuffle });
            }
            _ => {}
        }
        self.dirty = true;
    }

    fn load_sets(&mut self, sets: &[String], shuffle: bool) {
        let loaded = library::load(&self.sets_dir, sets)
            .and_then(|library| self.transport.load_new_set(library, shuffle));
        match loaded {
            Ok(()) => {
                self.chooser = None;
                self.movement_cursor = 0;
                self.transport
                    .shell_mut()
                    .notify_info(&format!("Loaded {}", sets.join(", ")));
            }
            Err(err) => {
                warn!(sets = ?sets, error = %err, "failed to load directory sets");
                self.transport.shell_mut().notify_error(&err.to_string());
            }
        }
    }

    fn sync_cursor(&mut self) {
        let index = self.transport.current().current_index();
        if index != self.synced_index {
            self.synced_index = index;
            self.movement_cursor = index.unwrap_or(0);
        }
    }

    fn remember(&mut self, update: impl FnOnce(&mut Settings)) {
        update(&mut self.settings);
        self.settings_changed = true;
    }
}

pub fn run(options: StartupOptions) -> Result<()> {
    let root = config::ensure_config_dir()?;
    if let Err(err) = logging::init(&root) {
        eprintln!("logging disabled: {err:#}");
    }

    let settings = config::load_settings()?;
    let sets_dir = settings.resolved_sets_dir()?;
    info!(sets_dir = %sets_dir.display(), "starting");

    let backend: Box<dyn MediaBackend> = match RodioBackend::new() {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            warn!(error = %err, "no audio output available, playing silently");
            Box::new(NullBackend::new())
        }
    };

    let tick = settings.tick_interval();
    let mut app = App::new(backend, sets_dir, settings);
    if options.looping {
        app.transport.set_looping(true);
    }
    let shuffle = app.settings.shuffle && !options.no_shuffle;
    if options.sets.is_empty() {
        app.open_chooser();
        if let Some(chooser) = app.chooser.as_mut() {
            chooser.shuffle = shuffle;
        }
    } else {
        app.dispatch(Intent::LoadNewSet {
            sets: options.sets,
            shuffle,
        });
    }

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let input = spawn_input_thread();
    let mut last_tick = Instant::now();

    let result: Result<()> = loop {
        if app.needs_redraw() {
            if let Err(err) = terminal.draw(|frame| crate::ui::draw(frame, &app)) {
                break Err(err.into());
            }
            app.mark_drawn();
        }

        if app.should_exit() {
            break Ok(());
        }

        match input.recv_timeout(tick.saturating_sub(last_tick.elapsed())) {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => app.handle_key(key),
            Ok(Event::Resize(..)) => app.mark_dirty(),
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break Ok(()),
        }

        if last_tick.elapsed() >= tick {
            app.tick();
            last_tick = Instant::now();
        }
    };

    let shutdown_result = app.shutdown();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("stopped");
    result?;
    shutdown_result?;
    Ok(())
}

fn spawn_input_thread() -> Receiver<Event> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        loop {
            match event::read() {
                Ok(event) => {
                    if sender.send(event).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "terminal input closed");
                    break;
                }
            }
        }
    });
    receiver
}
