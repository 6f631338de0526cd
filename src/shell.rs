pub trait StatusReporter {
    fn update_status(&mut self, play_pause: &str, position: &str);
    fn notify_info(&mut self, message: &str);
    fn notify_error(&mut self, message: &str);
}

pub trait AfterCurrent {
    fn pause_after_current(&self) -> bool;
    fn set_pause_after_current(&mut self, enabled: bool);
    fn exit_after_current(&self) -> bool;
    /// Asks the application to shut down. Clears the exit-after-current flag.
    fn request_exit(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    PlayPause,
    Next,
    Previous,
    SelectMovement(usize),
    SetVolume(u8),
    ToggleMute,
    Seek(f32),
    ToggleLoop(bool),
    TogglePauseAfterCurrent,
    ToggleExitAfterCurrent,
    LoadNewSet { sets: Vec<String>, shuffle: bool },
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct StatusBar {
    pub play_pause: String,
    pub position: String,
    pub notice: Option<Notice>,
    pub pause_after_current: bool,
    pub exit_after_current: bool,
    pub exit_requested: bool,
    pub dirty: bool,
}

impl Default for StatusBar {
    fn default() -> Self {
        Self {
            play_pause: String::from("Paused"),
            position: String::new(),
            notice: None,
            pause_after_current: false,
            exit_after_current: false,
            exit_requested: false,
            dirty: true,
        }
    }
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_notice(&mut self, level: NoticeLevel, message: &str) {
        self.notice = Some(Notice {
            level,
            message: message.to_string(),
        });
        self.dirty = true;
    }
}

impl StatusReporter for StatusBar {
    fn update_status(&mut self, play_pause: &str, position: &str) {
        self.play_pause = play_pause.to_string();
        self.position = position.to_string();
        self.dirty = true;
    }

    fn notify_info(&mut self, message: &str) {
        self.set_notice(NoticeLevel::Info, message);
    }

    fn notify_error(&mut self, message: &str) {
        self.set_notice(NoticeLevel::Error, message);
    }
}

impl AfterCurrent for StatusBar {
    fn pause_after_current(&self) -> bool {
        self.pause_after_current
    }

    fn set_pause_after_current(&mut self, enabled: bool) {
        self.pause_after_current = enabled;
        self.dirty = true;
    }

    fn exit_after_current(&self) -> bool {
        self.exit_after_current
    }

    fn request_exit(&mut self) {
        self.exit_after_current = false;
        self.exit_requested = true;
        self.dirty = true;
    }
}
