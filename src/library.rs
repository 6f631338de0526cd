use crate::error::{PlayerError, Result};
use crate::model::{Library, Movement, Piece};
use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::{MetadataOptions, StandardTagKey};
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];
const PREFIX_KEY: &str = "prefix=";
const TITLE_SEPARATOR: &str = " - ";
const DEFAULT_SET: &str = "Default";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration: Option<Duration>,
}

pub fn available_sets(sets_dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(sets_dir).map_err(|err| PlayerError::library_load(sets_dir, err))?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(ToOwned::to_owned))
        .collect();
    names.sort();
    if let Some(index) = names.iter().position(|name| is_default_set(name)) {
        let default = names.remove(index);
        names.insert(0, default);
    }
    Ok(names)
}

fn is_default_set(name: &str) -> bool {
    Path::new(name).file_stem().and_then(OsStr::to_str) == Some(DEFAULT_SET)
}

/// Directory paths listed by a set descriptor. `prefix=<value>` applies to
/// every directory line after it; blank lines and `#` comments are skipped.
pub fn parse_set_descriptor(text: &str) -> Vec<PathBuf> {
    let mut prefix = String::new();
    let mut directories = Vec::new();

    for line in text.lines() {
        let line = line.trim_end();
        if let Some(value) = line.strip_prefix(PREFIX_KEY) {
            prefix = value.to_string();
            continue;
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        directories.push(PathBuf::from(format!("{prefix}{line}")));
    }

    directories
}

pub fn read_set(sets_dir: &Path, name: &str) -> Result<Vec<PathBuf>> {
    let path = sets_dir.join(name);
    let text = fs::read_to_string(&path).map_err(|err| PlayerError::library_load(&path, err))?;
    Ok(parse_set_descriptor(&text))
}

pub fn load(sets_dir: &Path, set_names: &[String]) -> Result<Library> {
    load_with(sets_dir, set_names, read_tags)
}

pub fn load_with<F>(sets_dir: &Path, set_names: &[String], mut read_tags: F) -> Result<Library>
where
    F: FnMut(&Path) -> MovementTags,
{
    let mut directories = Vec::new();
    for name in set_names {
        directories.extend(read_set(sets_dir, name)?);
    }

    let mut listings = Vec::with_capacity(directories.len());
    for directory in &directories {
        listings.push(list_audio_files(directory)?);
    }

    let mut library = Library::new();
    for files in listings {
        let tagged = files.into_iter().map(|path| {
            let tags = read_tags(&path);
            (path, tags)
        });
        group_into(&mut library, tagged);
    }

    info!(
        sets = set_names.len(),
        directories = directories.len(),
        pieces = library.len(),
        "library loaded"
    );
    Ok(library)
}

pub fn list_audio_files(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(PlayerError::library_load(
            directory,
            "not a readable directory",
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| PlayerError::library_load(directory, err))?;
        if entry.file_type().is_file() && is_audio(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn split_title(title: &str) -> (&str, Option<&str>) {
    match title.split_once(TITLE_SEPARATOR) {
        Some((piece, movement)) => (piece.trim(), Some(movement.trim())),
        None => (title.trim(), None),
    }
}

/// Groups consecutive files sharing a piece title into pieces. A title seen
/// again after a different one starts over and replaces the earlier piece.
pub fn group_into<I>(library: &mut Library, files: I)
where
    I: IntoIterator<Item = (PathBuf, MovementTags)>,
{
    let mut run: Option<Piece> = None;

    for (path, tags) in files {
        let Some(title) = tags.title.as_deref() else {
            warn!(error = %PlayerError::MissingMetadata(path.clone()), "skipping file");
            continue;
        };
        let (piece_title, movement_title) = split_title(title);
        if piece_title.is_empty() {
            warn!(error = %PlayerError::MissingMetadata(path.clone()), "skipping file");
            continue;
        }

        let mut movement = Movement::from_path(path);
        if let Some(label) = movement_title.filter(|label| !label.is_empty()) {
            movement.label = label.to_string();
        }
        movement.artist = tags.artist;
        movement.duration = tags.duration;

        match run.as_mut() {
            Some(piece) if piece.name == piece_title => piece.movements.push(movement),
            _ => {
                if let Some(done) = run.take() {
                    insert_piece(library, done);
                }
                run = Some(Piece::new(piece_title, vec![movement]));
            }
        }
    }

    if let Some(done) = run {
        insert_piece(library, done);
    }
}

fn insert_piece(library: &mut Library, piece: Piece) {
    debug!(piece = %piece.name, movements = piece.movements.len(), "grouped piece");
    let name = piece.name.clone();
    if library.insert(piece).is_some() {
        warn!(piece = %name, "piece title seen again, replacing earlier movements");
    }
}

pub fn read_tags(path: &Path) -> MovementTags {
    let stripped = crate::config::strip_windows_verbatim_prefix(path);
    let mut tags = symphonia_tags(&stripped);
    if tags.title.is_none() || tags.artist.is_none() || tags.duration.is_none() {
        let fallback = lofty_tags(&stripped);
        tags.title = tags.title.or(fallback.title);
        tags.artist = tags.artist.or(fallback.artist);
        tags.duration = tags.duration.or(fallback.duration);
    }
    tags
}

fn symphonia_tags(path: &Path) -> MovementTags {
    let Ok(file) = File::open(path) else {
        return MovementTags::default();
    };
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    let Ok(mut opened) = get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) else {
        return MovementTags::default();
    };

    let duration = opened
        .format
        .default_track()
        .and_then(|track| codec_duration(&track.codec_params));

    let metadata = opened.format.metadata();
    let Some(revision) = metadata.current() else {
        return MovementTags {
            duration,
            ..MovementTags::default()
        };
    };

    let tags = revision.tags();
    MovementTags {
        title: tag_value(tags, StandardTagKey::TrackTitle, &["title"]),
        artist: tag_value(
            tags,
            StandardTagKey::Artist,
            &["artist", "albumartist", "album_artist"],
        ),
        duration,
    }
}

fn codec_duration(codec_params: &symphonia::core::codecs::CodecParameters) -> Option<Duration> {
    let frame_count = codec_params.n_frames?;

    if let Some(time_base) = codec_params.time_base {
        let time = time_base.calc_time(frame_count);
        return Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac));
    }

    codec_params
        .sample_rate
        .filter(|sample_rate| *sample_rate > 0)
        .map(|sample_rate| Duration::from_secs_f64(frame_count as f64 / f64::from(sample_rate)))
}

fn lofty_tags(path: &Path) -> MovementTags {
    let Ok(tagged_file) = Probe::open(path).and_then(|probe| probe.read()) else {
        return MovementTags::default();
    };

    let duration = Some(tagged_file.properties().duration()).filter(|duration| !duration.is_zero());
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    MovementTags {
        title: tag
            .and_then(|tag| tag.title())
            .and_then(|title| clean_metadata_value(&title)),
        artist: tag
            .and_then(|tag| tag.artist())
            .and_then(|artist| clean_metadata_value(&artist)),
        duration,
    }
}

fn tag_value(
    tags: &[symphonia::core::meta::Tag],
    standard_key: StandardTagKey,
    fallback_keys: &[&str],
) -> Option<String> {
    let from_standard = tags
        .iter()
        .find(|tag| tag.std_key == Some(standard_key))
        .map(|tag| tag.value.to_string());

    let from_fallback = || {
        tags.iter()
            .find(|tag| {
                fallback_keys
                    .iter()
                    .any(|key| tag.key.eq_ignore_ascii_case(key))
            })
            .map(|tag| tag.value.to_string())
    };

    from_standard
        .or_else(from_fallback)
        .and_then(|value| clean_metadata_value(&value))
}

fn clean_metadata_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn titled(titles: &[(&str, Option<&str>)]) -> HashMap<String, MovementTags> {
        titles
            .iter()
            .map(|(file, title)| {
                (
                    file.to_string(),
                    MovementTags {
                        title: title.map(ToOwned::to_owned),
                        ..MovementTags::default()
                    },
                )
            })
            .collect()
    }

    fn reader(tags: HashMap<String, MovementTags>) -> impl FnMut(&Path) -> MovementTags {
        move |path| {
            let name = path
                .file_name()
                .and_then(OsStr::to_str)
                .unwrap_or_default();
            tags.get(name).cloned().unwrap_or_default()
        }
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"x").expect("write fixture");
        }
    }

    fn write_set(sets_dir: &Path, name: &str, body: &str) {
        fs::write(sets_dir.join(name), body).expect("write set");
    }

    #[test]
    fn descriptor_applies_prefix_and_skips_comments() {
        let dirs = parse_set_descriptor(
            "# baroque\n/plain\n\nprefix=/mnt/music/\nbach\r\n# handel\nhandel  \n",
        );
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/plain"),
                PathBuf::from("/mnt/music/bach"),
                PathBuf::from("/mnt/music/handel"),
            ]
        );
    }

    #[test]
    fn piece_title_is_cut_at_first_separator() {
        assert_eq!(
            split_title("Symphony No. 5 - I. Allegro - con brio"),
            ("Symphony No. 5", Some("I. Allegro - con brio"))
        );
        assert_eq!(split_title("  Clair de lune "), ("Clair de lune", None));
        assert_eq!(split_title("Sonata-Allegro"), ("Sonata-Allegro", None));
    }

    #[test]
    fn contiguous_titles_form_pieces_in_listing_order() {
        let sets = tempdir().expect("tempdir");
        let music = tempdir().expect("tempdir");
        touch(music.path(), &["1.mp3", "2.mp3", "3.mp3", "4.mp3", "5.mp3"]);
        write_set(sets.path(), "main", &format!("{}\n", music.path().display()));

        let tags = titled(&[
            ("1.mp3", Some("A - I")),
            ("2.mp3", Some("A - II")),
            ("3.mp3", Some("B - I")),
            ("4.mp3", Some("B - II")),
            ("5.mp3", Some("B - III")),
        ]);
        let library = load_with(sets.path(), &[String::from("main")], reader(tags))
            .expect("library loads");

        assert_eq!(library.names(), vec!["A", "B"]);
        let a = library.get("A").expect("piece A");
        let b = library.get("B").expect("piece B");
        assert_eq!(a.movements.len(), 2);
        assert_eq!(b.movements.len(), 3);
        assert!(a.movements[0].path.ends_with("1.mp3"));
        assert!(b.movements[2].path.ends_with("5.mp3"));
        assert_eq!(b.movements[1].label, "II");
    }

    #[test]
    fn untitled_files_are_skipped_without_splitting_a_piece() {
        let music = tempdir().expect("tempdir");
        touch(music.path(), &["1.flac", "2.flac", "3.flac"]);
        let tags = titled(&[
            ("1.flac", Some("Suite - Prelude")),
            ("2.flac", None),
            ("3.flac", Some("Suite - Gigue")),
        ]);

        let mut library = Library::new();
        let files = list_audio_files(music.path()).expect("listing");
        let mut read = reader(tags);
        group_into(
            &mut library,
            files.into_iter().map(|path| {
                let tags = read(&path);
                (path, tags)
            }),
        );

        assert_eq!(library.len(), 1);
        assert_eq!(library.get("Suite").map(|p| p.movements.len()), Some(2));
    }

    #[test]
    fn interrupted_run_replaces_the_earlier_piece() {
        let mut library = Library::new();
        let entry = |file: &str, title: &str| {
            (
                PathBuf::from(file),
                MovementTags {
                    title: Some(title.to_string()),
                    ..MovementTags::default()
                },
            )
        };
        group_into(
            &mut library,
            vec![
                entry("1.mp3", "A - I"),
                entry("2.mp3", "B"),
                entry("3.mp3", "A - II"),
                entry("4.mp3", "A - III"),
            ],
        );

        assert_eq!(library.names(), vec!["A", "B"]);
        let a = library.get("A").expect("piece A");
        assert_eq!(a.movements.len(), 2);
        assert!(a.movements[0].path.ends_with("3.mp3"));
    }

    #[test]
    fn each_directory_starts_a_fresh_run() {
        let sets = tempdir().expect("tempdir");
        let first = tempdir().expect("tempdir");
        let second = tempdir().expect("tempdir");
        touch(first.path(), &["a.mp3"]);
        touch(second.path(), &["b.mp3"]);
        write_set(
            sets.path(),
            "both",
            &format!("{}\n{}\n", first.path().display(), second.path().display()),
        );

        let tags = titled(&[("a.mp3", Some("Same - I")), ("b.mp3", Some("Same - II"))]);
        let library = load_with(sets.path(), &[String::from("both")], reader(tags))
            .expect("library loads");

        let same = library.get("Same").expect("piece");
        assert_eq!(same.movements.len(), 1);
        assert!(same.movements[0].path.ends_with("b.mp3"));
    }

    #[test]
    fn listing_ignores_non_audio_and_sorts() {
        let music = tempdir().expect("tempdir");
        touch(music.path(), &["b.mp3", "a.MP3", "notes.txt", "c.ogg"]);
        fs::create_dir(music.path().join("sub.mp3")).expect("mkdir");

        let files = list_audio_files(music.path()).expect("listing");
        let names: Vec<&str> = files
            .iter()
            .filter_map(|path| path.file_name().and_then(OsStr::to_str))
            .collect();
        assert_eq!(names, vec!["a.MP3", "b.mp3", "c.ogg"]);
    }

    #[test]
    fn missing_set_is_a_load_error() {
        let sets = tempdir().expect("tempdir");
        let err = load(sets.path(), &[String::from("absent")]).expect_err("must fail");
        assert!(matches!(err, PlayerError::LibraryLoad { .. }), "{err}");
    }

    #[test]
    fn missing_directory_is_a_load_error() {
        let sets = tempdir().expect("tempdir");
        write_set(sets.path(), "broken", "/definitely/not/here\n");
        let err = load(sets.path(), &[String::from("broken")]).expect_err("must fail");
        assert!(err.to_string().contains("/definitely/not/here"), "{err}");
    }

    #[test]
    fn available_sets_are_sorted_files() {
        let sets = tempdir().expect("tempdir");
        write_set(sets.path(), "romantic", "");
        write_set(sets.path(), "baroque", "");
        fs::create_dir(sets.path().join("archive")).expect("mkdir");

        assert_eq!(
            available_sets(sets.path()).expect("listing"),
            vec!["baroque", "romantic"]
        );
    }

    #[test]
    fn default_set_is_listed_first() {
        let sets = tempdir().expect("tempdir");
        write_set(sets.path(), "Baroque", "");
        write_set(sets.path(), "Default.txt", "");
        write_set(sets.path(), "Ars nova", "");

        assert_eq!(
            available_sets(sets.path()).expect("listing"),
            vec!["Default.txt", "Ars nova", "Baroque"]
        );
    }

    #[test]
    fn metadata_value_cleaning_trims_and_drops_empty() {
        assert_eq!(
            clean_metadata_value("  hello  "),
            Some(String::from("hello"))
        );
        assert_eq!(clean_metadata_value("   \t  "), None);
    }

    #[test]
    fn unreadable_file_has_no_tags() {
        assert_eq!(
            read_tags(Path::new("missing-file.mp3")),
            MovementTags::default()
        );
    }
}
