use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    pub path: PathBuf,
    pub label: String,
    pub artist: Option<String>,
    pub duration: Option<Duration>,
}

impl Movement {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = file_stem_label(&path);
        Self {
            path,
            label,
            artist: None,
            duration: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub name: String,
    pub movements: Vec<Movement>,
}

impl Piece {
    pub fn new(name: impl Into<String>, movements: Vec<Movement>) -> Self {
        Self {
            name: name.into(),
            movements,
        }
    }

    pub fn describe(&self) -> String {
        let mut info = format!("\"{}\"", self.name);

        if let Some(artist) = self
            .movements
            .first()
            .and_then(|movement| movement.artist.as_deref())
        {
            info.push_str(&format!(" by {artist}"));
        }

        let total: Option<Duration> = self
            .movements
            .iter()
            .map(|movement| movement.duration)
            .sum();
        if let Some(total) = total {
            info.push_str(&format!(" ({})", format_clock(total.as_millis() as u64)));
        }

        info
    }
}

#[derive(Debug, Clone, Default)]
pub struct Library {
    pieces: Vec<Piece>,
    lookup: HashMap<String, usize>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, piece: Piece) -> Option<Piece> {
        if piece.movements.is_empty() {
            return None;
        }

        match self.lookup.get(&piece.name) {
            Some(&idx) => Some(std::mem::replace(&mut self.pieces[idx], piece)),
            None => {
                self.lookup.insert(piece.name.clone(), self.pieces.len());
                self.pieces.push(piece);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Piece> {
        self.lookup.get(name).and_then(|idx| self.pieces.get(*idx))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.pieces.iter().map(|piece| piece.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

impl FromIterator<Piece> for Library {
    fn from_iter<T: IntoIterator<Item = Piece>>(iter: T) -> Self {
        let mut library = Self::new();
        for piece in iter {
            library.insert(piece);
        }
        library
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayNext {
    Movement(usize),
    /// The loaded movement is the last one; the next advance starts a new piece.
    PieceExhausted,
}

impl PlayNext {
    fn after_loading(index: usize, movement_count: usize) -> Self {
        if index + 1 >= movement_count {
            Self::PieceExhausted
        } else {
            Self::Movement(index + 1)
        }
    }
}

/// The piece the transport is working through. Holds its own copy of the
/// movements so a library reload can't pull them out from under playback.
#[derive(Debug, Clone)]
pub struct CurrentPiece {
    pub title: String,
    pub description: String,
    pub movements: Vec<Movement>,
    pub play_next: PlayNext,
}

impl Default for CurrentPiece {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            movements: Vec::new(),
            play_next: PlayNext::PieceExhausted,
        }
    }
}

impl CurrentPiece {
    pub fn start(piece: &Piece) -> Self {
        Self {
            title: piece.name.clone(),
            description: piece.describe(),
            movements: piece.movements.clone(),
            play_next: PlayNext::after_loading(0, piece.movements.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn current_index(&self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        match self.play_next {
            PlayNext::PieceExhausted => Some(self.movements.len() - 1),
            PlayNext::Movement(next) => next.checked_sub(1),
        }
    }

    pub(crate) fn take_movement(&mut self, index: usize) -> Option<&Movement> {
        let count = self.movements.len();
        let movement = self.movements.get(index)?;
        self.play_next = PlayNext::after_loading(index, count);
        Some(movement)
    }

    pub fn movement_labels(&self) -> Vec<&str> {
        self.movements
            .iter()
            .map(|movement| movement.label.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayStatus {
    #[default]
    Paused,
    Playing,
}

impl PlayStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Paused => "Paused",
            Self::Playing => "Playing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Paused,
    Playing,
}

pub fn format_clock(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = ms / 60_000 % 60;
    let seconds = ms / 1_000 % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

fn file_stem_label(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| path.display().to_string())
}
