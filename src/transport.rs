use crate::audio::MediaBackend;
use crate::error::{PlayerError, Result};
use crate::history::History;
use crate::model::{CurrentPiece, Library, PlayNext, PlayStatus, TransportState, format_clock};
use crate::queue::PlaylistQueue;
use crate::shell::{AfterCurrent, StatusReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace, warn};

pub const END_OF_PLAYLIST: &str = "End of playlist reached.";

/// Single-flag handoff from the backend's callback context to the owner tick.
#[derive(Debug, Clone, Default)]
pub struct EndOfMediaFlag(Arc<AtomicBool>);

impl EndOfMediaFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Movement(usize),
    Piece,
    LoopReset,
    EndOfPlaylist,
    ExitRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    pub elapsed: String,
    pub remaining: String,
    pub progress: u16,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            elapsed: format_clock(0),
            remaining: format!("-{}", format_clock(0)),
            progress: 0,
        }
    }
}

pub struct Transport<S> {
    backend: Box<dyn MediaBackend>,
    shell: S,
    library: Library,
    queue: PlaylistQueue,
    current: CurrentPiece,
    status: PlayStatus,
    looping: bool,
    history: History,
    end_of_media: EndOfMediaFlag,
    volume: u8,
    volume_before_muted: u8,
}

impl<S: StatusReporter + AfterCurrent> Transport<S> {
    pub fn new(backend: Box<dyn MediaBackend>, shell: S) -> Self {
        Self::with_queue(backend, shell, PlaylistQueue::new())
    }

    pub fn with_queue(mut backend: Box<dyn MediaBackend>, shell: S, queue: PlaylistQueue) -> Self {
        let end_of_media = EndOfMediaFlag::default();
        let flag = end_of_media.clone();
        backend.on_end_of_media(Arc::new(move || flag.raise()));
        backend.set_volume(100);

        Self {
            backend,
            shell,
            library: Library::new(),
            queue,
            current: CurrentPiece::default(),
            status: PlayStatus::Paused,
            looping: false,
            history: History::new(),
            end_of_media,
            volume: 100,
            volume_before_muted: 100,
        }
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    pub fn backend(&self) -> &dyn MediaBackend {
        self.backend.as_ref()
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn queue(&self) -> &PlaylistQueue {
        &self.queue
    }

    pub fn current(&self) -> &CurrentPiece {
        &self.current
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn status(&self) -> PlayStatus {
        self.status
    }

    pub fn state(&self) -> TransportState {
        if self.current.is_empty() {
            return TransportState::Idle;
        }
        match self.status {
            PlayStatus::Paused => TransportState::Paused,
            PlayStatus::Playing => TransportState::Playing,
        }
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn end_of_media_flag(&self) -> EndOfMediaFlag {
        self.end_of_media.clone()
    }

    pub fn playlist_position(&self) -> String {
        let total = self.library.len();
        let played = total.saturating_sub(self.queue.len());
        format!("{played}/{total}")
    }

    pub fn advance(&mut self) -> Advance {
        match self.current.play_next {
            PlayNext::Movement(index) if index < self.current.movements.len() => {
                self.advance_within_piece(index)
            }
            _ => self.advance_to_next_piece(),
        }
    }

    fn advance_within_piece(&mut self, index: usize) -> Advance {
        if let Some(path) = self.take_movement_path(index) {
            self.load_into_backend(&path);
        }
        debug!(piece = %self.current.title, movement = index, "advanced within piece");

        if self.status == PlayStatus::Playing {
            self.backend.play();
        }
        self.report_position();
        Advance::Movement(index)
    }

    fn advance_to_next_piece(&mut self) -> Advance {
        if self.queue.is_empty() {
            if self.looping && !self.library.is_empty() {
                self.queue.reset_and_reshuffle(self.library.names());
                info!(
                    pieces = self.queue.len(),
                    shuffled = self.queue.is_shuffled(),
                    "playlist exhausted, looping"
                );
                return Advance::LoopReset;
            }

            if self.status == PlayStatus::Playing {
                self.pause_playback();
            }
            self.current.clear();
            info!("end of playlist reached");
            self.shell.update_status(self.status.label(), END_OF_PLAYLIST);
            return Advance::EndOfPlaylist;
        }

        if self.shell.exit_after_current() {
            info!("exit after current piece requested");
            self.shell.request_exit();
            return Advance::ExitRequested;
        }

        let pause_forced = self.shell.pause_after_current();
        if pause_forced && self.status == PlayStatus::Playing {
            self.pause_playback();
        }

        if let Err(err) = self.start_next_piece() {
            warn!(error = %err, "could not start next piece");
            self.report_position();
            return Advance::EndOfPlaylist;
        }

        if pause_forced {
            info!(piece = %self.current.title, "paused after previous piece");
            self.shell.set_pause_after_current(false);
        } else {
            self.start_playback();
        }
        self.report_position();
        Advance::Piece
    }

    fn start_next_piece(&mut self) -> Result<()> {
        loop {
            let name = self.queue.pop_next()?;
            let Some(piece) = self.library.get(&name) else {
                warn!(piece = %name, "queued piece is not in the library, skipping");
                continue;
            };

            self.current = CurrentPiece::start(piece);
            let first = self.current.movements[0].path.clone();
            self.load_into_backend(&first);
            self.history.record(&self.current.description);
            info!(piece = %self.current.title, movements = self.current.movements.len(), "piece started");
            return Ok(());
        }
    }

    pub fn play_pause(&mut self) {
        if self.current.is_empty() {
            return;
        }

        match self.status {
            PlayStatus::Paused => {
                if !self.backend.has_media() {
                    self.advance();
                    if self.current.is_empty() {
                        return;
                    }
                }
                self.start_playback();
            }
            PlayStatus::Playing => self.pause_playback(),
        }
        self.report_position();
    }

    pub fn previous(&mut self) {
        if self.current.movements.len() <= 1 {
            return;
        }
        let Some(target) = self
            .current
            .current_index()
            .and_then(|index| index.checked_sub(1))
        else {
            return;
        };

        self.backend.stop();
        if let Some(path) = self.take_movement_path(target) {
            self.load_into_backend(&path);
        }
        debug!(piece = %self.current.title, movement = target, "went back one movement");
        self.start_playback();
        self.report_position();
    }

    pub fn select_movement(&mut self, index: usize) {
        if index >= self.current.movements.len() || self.current.current_index() == Some(index) {
            return;
        }
        self.current.play_next = PlayNext::Movement(index);
        self.advance();
    }

    /// Records that the loaded movement finished. Safe to call from any thread
    /// holding the flag; the advance itself happens on the next tick.
    pub fn on_backend_end_of_media(&self) {
        self.end_of_media.raise();
    }

    pub fn tick(&mut self) -> PlaybackClock {
        self.backend.tick();
        if self.end_of_media.take() && self.advance() == Advance::LoopReset {
            self.end_of_media.raise();
        }
        self.clock()
    }

    pub fn clock(&self) -> PlaybackClock {
        if !self.backend.has_media() {
            return PlaybackClock::default();
        }

        let duration = match self.backend.duration_ms() {
            Ok(duration) => Some(duration),
            Err(err) => {
                trace!(error = %err, "duration unavailable");
                None
            }
        };
        let elapsed = match (self.backend.elapsed_ms(), duration) {
            (Ok(elapsed), Some(duration)) if elapsed <= duration => elapsed,
            (Ok(elapsed), None) => elapsed,
            _ => 0,
        };
        let remaining = duration.map_or(0, |duration| duration.saturating_sub(elapsed));
        let progress = self
            .backend
            .position()
            .map(|position| (position * 100.0).round().clamp(0.0, 100.0) as u16)
            .unwrap_or(0);

        PlaybackClock {
            elapsed: format_clock(elapsed),
            remaining: format!("-{}", format_clock(remaining)),
            progress,
        }
    }

    pub fn load_new_set(&mut self, library: Library, shuffle: bool) -> Result<()> {
        let playlist = library.names();
        self.load_new_set_with_playlist(library, playlist, shuffle)
    }

    pub fn load_new_set_with_playlist(
        &mut self,
        library: Library,
        playlist: Vec<String>,
        shuffle: bool,
    ) -> Result<()> {
        let playlist: Vec<String> = playlist
            .into_iter()
            .filter(|name| library.contains(name))
            .collect();
        if playlist.is_empty() {
            return Err(PlayerError::EmptyLibrary);
        }

        self.backend.stop();
        self.end_of_media.take();
        self.status = PlayStatus::Paused;
        self.current.clear();
        self.library = library;
        self.queue.seed(playlist, shuffle);
        info!(pieces = self.library.len(), shuffle, "loaded new directory sets");

        self.start_next_piece()?;
        self.report_position();
        Ok(())
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.backend.set_volume(self.volume);
    }

    pub fn toggle_mute(&mut self) {
        if self.volume == 0 {
            self.set_volume(self.volume_before_muted);
        } else {
            self.volume_before_muted = self.volume;
            self.set_volume(0);
        }
    }

    pub fn seek(&mut self, position: f32) {
        if !self.backend.has_media() {
            return;
        }
        if let Err(err) = self.backend.set_position(position) {
            debug!(error = %err, "seek ignored");
        }
    }

    pub fn set_looping(&mut self, enabled: bool) {
        self.looping = enabled;
    }

    pub fn exit(&mut self) {
        self.backend.release();
        self.status = PlayStatus::Paused;
        info!("transport released");
    }

    fn take_movement_path(&mut self, index: usize) -> Option<PathBuf> {
        self.current
            .take_movement(index)
            .map(|movement| movement.path.clone())
    }

    fn load_into_backend(&mut self, path: &Path) {
        self.end_of_media.take();
        if let Err(err) = self.backend.load(path) {
            warn!(path = %path.display(), error = %err, "failed to load movement");
            self.shell.notify_error(&err.to_string());
            if self.status == PlayStatus::Playing {
                self.end_of_media.raise();
            }
        }
    }

    fn start_playback(&mut self) {
        if !self.backend.has_media() {
            debug!(piece = %self.current.title, "nothing loaded, staying paused");
            self.status = PlayStatus::Paused;
            return;
        }
        self.backend.play();
        self.status = PlayStatus::Playing;
    }

    fn pause_playback(&mut self) {
        self.backend.pause();
        self.status = PlayStatus::Paused;
    }

    fn report_position(&mut self) {
        let position = self.playlist_position();
        self.shell.update_status(self.status.label(), &position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullBackend;
    use crate::model::{Movement, Piece};
    use crate::shell::StatusBar;
    use proptest::prop_assert;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::thread;

    fn piece(name: &str, count: usize) -> Piece {
        Piece::new(
            name,
            (0..count)
                .map(|n| Movement::from_path(format!("/music/{name}/{n:02}.mp3")))
                .collect(),
        )
    }

    fn library(shape: &[(&str, usize)]) -> Library {
        shape.iter().map(|(name, count)| piece(name, *count)).collect()
    }

    fn transport() -> Transport<StatusBar> {
        Transport::with_queue(
            Box::new(NullBackend::new()),
            StatusBar::new(),
            PlaylistQueue::with_rng(SmallRng::seed_from_u64(11)),
        )
    }

    fn loaded(shape: &[(&str, usize)]) -> Transport<StatusBar> {
        let mut transport = transport();
        transport
            .load_new_set(library(shape), false)
            .expect("library has pieces");
        transport
    }

    fn loaded_path(transport: &Transport<StatusBar>) -> Option<String> {
        transport
            .backend()
            .current_media()
            .map(|path| path.display().to_string())
    }

    #[test]
    fn load_new_set_starts_first_piece_paused() {
        let transport = loaded(&[("A", 2), ("B", 1)]);

        assert_eq!(transport.state(), TransportState::Paused);
        assert_eq!(transport.current().title, "A");
        assert_eq!(transport.current().play_next, PlayNext::Movement(1));
        assert_eq!(loaded_path(&transport).as_deref(), Some("/music/A/00.mp3"));
        assert_eq!(transport.history().len(), 1);
        assert_eq!(transport.shell().position, "1/2");
    }

    #[test]
    fn advance_walks_movements_then_crosses_piece() {
        let mut transport = loaded(&[("A", 3), ("B", 2)]);

        assert_eq!(transport.advance(), Advance::Movement(1));
        assert_eq!(transport.advance(), Advance::Movement(2));
        assert_eq!(transport.current().play_next, PlayNext::PieceExhausted);
        assert_eq!(transport.current().current_index(), Some(2));

        assert_eq!(transport.advance(), Advance::Piece);
        assert_eq!(transport.current().title, "B");
        assert_eq!(transport.current().current_index(), Some(0));
        assert_eq!(transport.shell().position, "2/2");
    }

    #[test]
    fn advance_within_piece_keeps_paused_status() {
        let mut transport = loaded(&[("A", 2)]);
        transport.advance();
        assert_eq!(transport.status(), PlayStatus::Paused);
        assert!(!transport.backend().is_playing());
    }

    #[test]
    fn advance_within_piece_keeps_playing_status() {
        let mut transport = loaded(&[("A", 2)]);
        transport.play_pause();
        transport.advance();
        assert_eq!(transport.status(), PlayStatus::Playing);
        assert!(transport.backend().is_playing());
        assert_eq!(loaded_path(&transport).as_deref(), Some("/music/A/01.mp3"));
    }

    #[test]
    fn crossing_a_piece_starts_playback() {
        let mut transport = loaded(&[("A", 1), ("B", 1)]);
        assert_eq!(transport.advance(), Advance::Piece);
        assert_eq!(transport.status(), PlayStatus::Playing);
        assert!(transport.backend().is_playing());
    }

    #[test]
    fn single_movement_piece_has_no_internal_navigation() {
        let mut transport = loaded(&[("Solo", 1), ("Next", 1)]);
        assert_eq!(transport.current().play_next, PlayNext::PieceExhausted);

        transport.previous();
        assert_eq!(transport.current().title, "Solo");
        assert_eq!(transport.current().current_index(), Some(0));
    }

    #[test]
    fn previous_is_noop_on_first_movement() {
        let mut transport = loaded(&[("A", 3)]);
        transport.previous();
        assert_eq!(transport.current().current_index(), Some(0));
        assert_eq!(transport.current().play_next, PlayNext::Movement(1));
        assert_eq!(transport.status(), PlayStatus::Paused);
    }

    #[test]
    fn previous_steps_back_one_movement_and_plays() {
        let mut transport = loaded(&[("A", 3)]);
        transport.advance();
        transport.advance();
        assert_eq!(transport.current().current_index(), Some(2));

        transport.previous();
        assert_eq!(transport.current().current_index(), Some(1));
        assert_eq!(transport.current().play_next, PlayNext::Movement(2));
        assert_eq!(loaded_path(&transport).as_deref(), Some("/music/A/01.mp3"));
        assert_eq!(transport.status(), PlayStatus::Playing);

        transport.previous();
        assert_eq!(transport.current().current_index(), Some(0));
    }

    #[test]
    fn select_movement_round_trips_every_index() {
        let mut transport = loaded(&[("A", 5)]);
        for k in [3, 0, 4, 1, 2, 2] {
            transport.select_movement(k);
            assert_eq!(transport.current().current_index(), Some(k));
            assert_eq!(
                loaded_path(&transport),
                Some(format!("/music/A/{k:02}.mp3"))
            );
        }
    }

    #[test]
    fn select_movement_ignores_out_of_range() {
        let mut transport = loaded(&[("A", 2)]);
        transport.select_movement(7);
        assert_eq!(transport.current().current_index(), Some(0));
    }

    #[test]
    fn exhausted_queue_without_loop_goes_idle() {
        let mut transport = loaded(&[("A", 1)]);
        transport.play_pause();

        assert_eq!(transport.advance(), Advance::EndOfPlaylist);
        assert_eq!(transport.state(), TransportState::Idle);
        assert!(transport.current().is_empty());
        assert!(transport.current().title.is_empty());
        assert_eq!(transport.status(), PlayStatus::Paused);
        assert_eq!(transport.shell().position, END_OF_PLAYLIST);

        transport.play_pause();
        assert_eq!(transport.state(), TransportState::Idle);
    }

    #[test]
    fn exhausted_queue_with_loop_refills_in_seed_order() {
        let mut transport = loaded(&[("A", 1), ("B", 1), ("C", 1)]);
        transport.set_looping(true);
        transport.advance();
        transport.advance();
        assert!(transport.queue().is_empty());

        assert_eq!(transport.advance(), Advance::LoopReset);
        assert_eq!(transport.current().title, "C");
        let refilled: Vec<&str> = transport.queue().iter().collect();
        assert_eq!(refilled, vec!["A", "B", "C"]);
    }

    #[test]
    fn loop_reset_reshuffles_shuffled_seed() {
        let names: Vec<String> = (0..24).map(|n| format!("P{n:02}")).collect();
        let shape: Vec<(&str, usize)> = names.iter().map(|name| (name.as_str(), 1)).collect();
        let mut transport = transport();
        transport
            .load_new_set(library(&shape), true)
            .expect("library has pieces");
        transport.set_looping(true);
        while transport.advance() != Advance::LoopReset {}

        let mut refilled: Vec<String> = transport.queue().iter().map(ToOwned::to_owned).collect();
        assert_ne!(refilled, names);
        refilled.sort();
        assert_eq!(refilled, names);
    }

    #[test]
    fn pause_after_current_pauses_at_next_piece() {
        let mut transport = loaded(&[("X", 2), ("Y", 2)]);
        transport.play_pause();
        transport.advance();
        transport.shell_mut().set_pause_after_current(true);

        assert_eq!(transport.advance(), Advance::Piece);
        assert_eq!(transport.current().title, "Y");
        assert_eq!(transport.status(), PlayStatus::Paused);
        assert!(!transport.shell().pause_after_current());
        assert_eq!(loaded_path(&transport).as_deref(), Some("/music/Y/00.mp3"));
        assert!(!transport.backend().is_playing());
    }

    #[test]
    fn pause_after_current_ignores_movement_boundaries() {
        let mut transport = loaded(&[("X", 3)]);
        transport.play_pause();
        transport.shell_mut().set_pause_after_current(true);

        transport.advance();
        assert_eq!(transport.status(), PlayStatus::Playing);
        assert!(transport.shell().pause_after_current());
    }

    #[test]
    fn exit_after_current_requests_exit_at_boundary() {
        let mut transport = loaded(&[("X", 1), ("Y", 1)]);
        transport.shell_mut().exit_after_current = true;

        assert_eq!(transport.advance(), Advance::ExitRequested);
        assert!(transport.shell().exit_requested);
        assert_eq!(transport.current().title, "X");
    }

    #[test]
    fn play_pause_toggles_backend() {
        let mut transport = loaded(&[("A", 1)]);
        transport.play_pause();
        assert_eq!(transport.state(), TransportState::Playing);
        assert!(transport.backend().is_playing());
        assert_eq!(transport.shell().play_pause, "Playing");

        transport.play_pause();
        assert_eq!(transport.state(), TransportState::Paused);
        assert!(!transport.backend().is_playing());
        assert_eq!(transport.shell().play_pause, "Paused");
    }

    #[test]
    fn play_pause_is_noop_when_idle() {
        let mut transport = transport();
        transport.play_pause();
        assert_eq!(transport.state(), TransportState::Idle);
        assert!(!transport.backend().has_media());
    }

    #[test]
    fn tick_advances_after_end_of_media_from_another_thread() {
        let mut transport = loaded(&[("A", 2)]);
        transport.play_pause();

        let flag = transport.end_of_media_flag();
        thread::spawn(move || flag.raise())
            .join()
            .expect("signal thread");
        assert_eq!(transport.current().current_index(), Some(0));

        transport.tick();
        assert_eq!(transport.current().current_index(), Some(1));
        assert!(!transport.end_of_media_flag().is_raised());
    }

    #[test]
    fn tick_without_pending_end_leaves_state_alone() {
        let mut transport = loaded(&[("A", 2)]);
        transport.play_pause();
        transport.tick();
        assert_eq!(transport.current().current_index(), Some(0));
    }

    #[test]
    fn looped_end_of_media_crosses_on_following_tick() {
        let mut transport = loaded(&[("A", 1), ("B", 1)]);
        transport.set_looping(true);
        transport.play_pause();
        transport.advance();
        assert_eq!(transport.current().title, "B");

        transport.on_backend_end_of_media();
        transport.tick();
        assert_eq!(transport.queue().len(), 2);
        assert!(transport.end_of_media_flag().is_raised());

        transport.tick();
        assert_eq!(transport.current().title, "A");
        assert_eq!(transport.state(), TransportState::Playing);
    }

    #[test]
    fn stale_end_of_media_is_dropped_on_manual_next() {
        let mut transport = loaded(&[("A", 3)]);
        transport.play_pause();
        transport.on_backend_end_of_media();
        transport.advance();
        transport.tick();
        assert_eq!(transport.current().current_index(), Some(1));
    }

    #[test]
    fn history_logs_pieces_not_movements() {
        let mut transport = loaded(&[("A", 3), ("B", 1)]);
        transport.advance();
        transport.advance();
        assert_eq!(transport.history().len(), 1);

        transport.advance();
        let described: Vec<&str> = transport
            .history()
            .entries()
            .iter()
            .map(|entry| entry.description.as_str())
            .collect();
        assert!(described.last().is_some_and(|last| *last == "\"B\""));
    }

    #[test]
    fn empty_library_is_rejected_without_disturbing_session() {
        let mut transport = loaded(&[("A", 2)]);
        transport.play_pause();

        let result = transport.load_new_set(Library::new(), true);
        assert!(matches!(result, Err(PlayerError::EmptyLibrary)));
        assert_eq!(transport.current().title, "A");
        assert_eq!(transport.state(), TransportState::Playing);
    }

    #[test]
    fn reload_replaces_queue_and_current_piece() {
        let mut transport = loaded(&[("A", 2), ("B", 1)]);
        transport.play_pause();

        transport
            .load_new_set(library(&[("C", 1), ("D", 1), ("E", 1)]), false)
            .expect("library has pieces");
        assert_eq!(transport.current().title, "C");
        assert_eq!(transport.state(), TransportState::Paused);
        assert_eq!(transport.queue().len(), 2);
        assert_eq!(transport.shell().position, "1/3");
    }

    #[test]
    fn clock_falls_back_when_duration_unknown() {
        let mut transport = loaded(&[("A", 1)]);
        let clock = transport.tick();
        assert_eq!(clock.elapsed, "00:00");
        assert_eq!(clock.remaining, "-00:00");
        assert_eq!(clock.progress, 0);
    }

    #[test]
    fn mute_restores_previous_volume() {
        let mut transport = transport();
        transport.set_volume(140);
        assert_eq!(transport.volume(), 100);
        transport.set_volume(40);

        transport.toggle_mute();
        assert_eq!(transport.volume(), 0);
        transport.toggle_mute();
        assert_eq!(transport.volume(), 40);
    }

    #[test]
    fn seek_without_media_is_ignored() {
        let mut transport = transport();
        transport.seek(0.5);
        assert!(!transport.backend().has_media());
    }

    #[test]
    fn exit_releases_backend() {
        let mut transport = loaded(&[("A", 1)]);
        transport.play_pause();
        transport.exit();
        assert!(!transport.backend().has_media());
        assert_eq!(transport.status(), PlayStatus::Paused);
    }

    struct UnplayableBackend {
        on_end: Option<crate::audio::EndOfMediaCallback>,
    }

    impl MediaBackend for UnplayableBackend {
        fn load(&mut self, path: &Path) -> Result<()> {
            Err(PlayerError::Backend(format!("cannot decode {}", path.display())))
        }
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn stop(&mut self) {}
        fn set_volume(&mut self, _volume: u8) {}
        fn elapsed_ms(&self) -> Result<u64> {
            Err(PlayerError::BackendTransient(String::from("no medium loaded")))
        }
        fn duration_ms(&self) -> Result<u64> {
            Err(PlayerError::BackendTransient(String::from("no medium loaded")))
        }
        fn position(&self) -> Result<f32> {
            Err(PlayerError::BackendTransient(String::from("no medium loaded")))
        }
        fn set_position(&mut self, _position: f32) -> Result<()> {
            Err(PlayerError::Backend(String::from("no medium loaded")))
        }
        fn on_end_of_media(&mut self, callback: crate::audio::EndOfMediaCallback) {
            self.on_end = Some(callback);
        }
        fn has_media(&self) -> bool {
            false
        }
        fn current_media(&self) -> Option<&Path> {
            None
        }
        fn is_playing(&self) -> bool {
            false
        }
        fn release(&mut self) {
            self.on_end = None;
        }
    }

    #[test]
    fn unplayable_movements_never_leave_transport_playing() {
        let mut transport = Transport::with_queue(
            Box::new(UnplayableBackend { on_end: None }),
            StatusBar::new(),
            PlaylistQueue::with_rng(SmallRng::seed_from_u64(11)),
        );
        transport.set_looping(true);
        transport
            .load_new_set(library(&[("A", 1)]), false)
            .expect("library has pieces");
        assert!(transport.shell().notice.is_some());

        for _ in 0..3 {
            transport.play_pause();
            for _ in 0..4 {
                transport.tick();
                assert_eq!(transport.status(), PlayStatus::Paused);
                assert!(!transport.backend().has_media());
            }
        }
        assert_eq!(transport.current().title, "A");
        assert_eq!(transport.shell().play_pause, "Paused");
    }

    proptest::proptest! {
        #[test]
        fn invariants_hold_under_random_intents(ops in proptest::collection::vec((0u8..7, 0usize..6), 1..200)) {
            let mut transport = loaded(&[("A", 1), ("B", 3), ("C", 2), ("D", 5)]);

            for (op, arg) in ops {
                match op {
                    0 => { transport.advance(); }
                    1 => transport.play_pause(),
                    2 => transport.previous(),
                    3 => transport.select_movement(arg),
                    4 => transport.set_looping(arg % 2 == 0),
                    5 => transport.on_backend_end_of_media(),
                    _ => { transport.tick(); }
                }

                let current = transport.current();
                if current.is_empty() {
                    prop_assert!(current.title.is_empty());
                    prop_assert!(transport.state() == TransportState::Idle);
                } else {
                    let index = current.current_index();
                    prop_assert!(index.is_some_and(|index| index < current.movements.len()));
                }
                prop_assert!(transport.queue().len() <= transport.library().len());
                prop_assert!(transport.queue().iter().all(|name| transport.library().contains(name)));
            }
        }
    }
}
