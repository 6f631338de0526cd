use crate::error::{PlayerError, Result};
use rodio::Source;
use rodio::cpal::traits::HostTrait;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Invoked by a backend when a loaded medium plays to its end. May run on a
/// thread the backend owns, so implementations must only flag, never act.
pub type EndOfMediaCallback = Arc<dyn Fn() + Send + Sync>;

pub trait MediaBackend {
    /// Replaces the current medium with `path` without starting playback.
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn set_volume(&mut self, volume: u8);
    fn elapsed_ms(&self) -> Result<u64>;
    fn duration_ms(&self) -> Result<u64>;
    fn position(&self) -> Result<f32>;
    fn set_position(&mut self, position: f32) -> Result<()>;
    fn on_end_of_media(&mut self, callback: EndOfMediaCallback);
    fn has_media(&self) -> bool;
    fn current_media(&self) -> Option<&Path>;
    fn is_playing(&self) -> bool;
    fn tick(&mut self) {}
    fn release(&mut self);
}

fn normalized_position(elapsed_ms: u64, duration_ms: u64) -> Result<f32> {
    if duration_ms == 0 {
        return Err(PlayerError::BackendTransient(String::from(
            "zero-length medium",
        )));
    }
    Ok((elapsed_ms as f64 / duration_ms as f64).clamp(0.0, 1.0) as f32)
}

pub struct RodioBackend {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
    volume: u8,
    on_end: Option<EndOfMediaCallback>,
    end_reported: bool,
}

impl RodioBackend {
    pub fn new() -> anyhow::Result<Self> {
        let stream = open_output_stream()?;
        let sink = Sink::connect_new(stream.mixer());
        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            volume: 100,
            on_end: None,
            end_reported: false,
        })
    }

    fn sink_volume(&self) -> f32 {
        f32::from(self.volume) / 100.0
    }
}

fn open_output_stream() -> anyhow::Result<OutputStream> {
    use anyhow::Context;

    let mut stream = with_silenced_stderr(|| {
        match OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")
            .and_then(|builder| {
                builder
                    .with_error_callback(|_| {})
                    .open_stream_or_fallback()
                    .context("failed to start default output stream")
            }) {
            Ok(stream) => Ok(stream),
            Err(default_err) => {
                let host = rodio::cpal::default_host();
                let devices = host
                    .output_devices()
                    .context("failed to enumerate output devices")?;
                for device in devices {
                    let opened = OutputStreamBuilder::from_device(device)
                        .context("failed to open fallback output device")
                        .and_then(|builder| {
                            builder
                                .with_error_callback(|_| {})
                                .open_stream_or_fallback()
                                .context("failed to start fallback output stream")
                        });
                    if let Ok(stream) = opened {
                        return Ok(stream);
                    }
                }
                Err(default_err.context("no fallback output device could be started"))
            }
        }
    })?;
    stream.log_on_drop(false);
    Ok(stream)
}

impl MediaBackend for RodioBackend {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();
        self.sink.set_volume(self.sink_volume());

        let file = File::open(path).map_err(|err| {
            PlayerError::Backend(format!("failed to open {}: {err}", path.display()))
        })?;
        let source = Decoder::try_from(file).map_err(|err| {
            PlayerError::Backend(format!("failed to decode {}: {err}", path.display()))
        })?;
        self.track_duration = source.total_duration();
        self.sink.append(source);
        self.current = Some(path.to_path_buf());
        self.end_reported = false;
        Ok(())
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.sink.set_volume(self.sink_volume());
    }

    fn elapsed_ms(&self) -> Result<u64> {
        if self.current.is_none() {
            return Err(PlayerError::BackendTransient(String::from(
                "no medium loaded",
            )));
        }
        Ok(self.sink.get_pos().as_millis() as u64)
    }

    fn duration_ms(&self) -> Result<u64> {
        self.track_duration
            .map(|duration| duration.as_millis() as u64)
            .ok_or_else(|| PlayerError::BackendTransient(String::from("duration unknown")))
    }

    fn position(&self) -> Result<f32> {
        normalized_position(self.elapsed_ms()?, self.duration_ms()?)
    }

    fn set_position(&mut self, position: f32) -> Result<()> {
        let duration = self
            .track_duration
            .ok_or_else(|| PlayerError::Backend(String::from("cannot seek without a duration")))?;
        if self.current.is_none() {
            return Err(PlayerError::Backend(String::from("no medium loaded")));
        }
        self.sink
            .try_seek(duration.mul_f32(position.clamp(0.0, 1.0)))
            .map_err(|err| PlayerError::Backend(format!("failed to seek: {err:?}")))
    }

    fn on_end_of_media(&mut self, callback: EndOfMediaCallback) {
        self.on_end = Some(callback);
    }

    fn has_media(&self) -> bool {
        self.current.is_some()
    }

    fn current_media(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && !self.sink.empty()
    }

    fn tick(&mut self) {
        if self.end_reported || self.current.is_none() || self.sink.is_paused() {
            return;
        }
        if self.sink.empty() {
            self.end_reported = true;
            if let Some(callback) = &self.on_end {
                callback();
            }
        }
    }

    fn release(&mut self) {
        self.stop();
        self.on_end = None;
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

pub struct NullBackend {
    paused: bool,
    current: Option<PathBuf>,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    on_end: Option<EndOfMediaCallback>,
    end_reported: bool,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            on_end: None,
            end_reported: false,
        }
    }

    pub fn set_track_duration(&mut self, duration: Option<Duration>) {
        self.track_duration = duration;
    }

    pub fn finish_current(&mut self) {
        if self.current.is_none() || self.end_reported {
            return;
        }
        self.position_offset = self.track_duration.unwrap_or(self.position_offset);
        self.started_at = None;
        self.paused = true;
        self.report_end();
    }

    fn report_end(&mut self) {
        self.end_reported = true;
        if let Some(callback) = &self.on_end {
            callback();
        }
    }

    fn estimate_duration(path: &Path) -> Option<Duration> {
        let file = File::open(path).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.current_position() >= duration
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for NullBackend {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.paused = true;
        self.current = Some(path.to_path_buf());
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(path);
        self.end_reported = false;
        Ok(())
    }

    fn play(&mut self) {
        if self.current.is_some() && self.paused {
            self.started_at = Some(Instant::now());
        }
        self.paused = false;
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn set_volume(&mut self, _volume: u8) {}

    fn elapsed_ms(&self) -> Result<u64> {
        if self.current.is_none() {
            return Err(PlayerError::BackendTransient(String::from(
                "no medium loaded",
            )));
        }
        Ok(self.current_position().as_millis() as u64)
    }

    fn duration_ms(&self) -> Result<u64> {
        self.track_duration
            .map(|duration| duration.as_millis() as u64)
            .ok_or_else(|| PlayerError::BackendTransient(String::from("duration unknown")))
    }

    fn position(&self) -> Result<f32> {
        normalized_position(self.elapsed_ms()?, self.duration_ms()?)
    }

    fn set_position(&mut self, position: f32) -> Result<()> {
        if self.current.is_none() {
            return Err(PlayerError::Backend(String::from("no medium loaded")));
        }
        let duration = self
            .track_duration
            .ok_or_else(|| PlayerError::Backend(String::from("cannot seek without a duration")))?;

        self.position_offset = duration.mul_f32(position.clamp(0.0, 1.0));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        Ok(())
    }

    fn on_end_of_media(&mut self, callback: EndOfMediaCallback) {
        self.on_end = Some(callback);
    }

    fn has_media(&self) -> bool {
        self.current.is_some()
    }

    fn current_media(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && !self.paused
    }

    fn tick(&mut self) {
        if !self.end_reported && self.is_finished() {
            self.pause();
            self.report_end();
        }
    }

    fn release(&mut self) {
        self.stop();
        self.on_end = None;
    }
}
