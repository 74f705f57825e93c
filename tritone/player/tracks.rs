use crate::error::App;
use std::path::{Path, PathBuf};

/// The three bundled tracks shipped with the service. The list is fixed for
/// the lifetime of the process; indices are 0..TRACK_COUNT.
pub const TRACK_COUNT: usize = 3;

const TRACK_FILES: [&str; TRACK_COUNT] = ["song1.ogg", "song2.ogg", "song3.ogg"];

#[derive(Clone, Debug)]
pub struct Track {
    path: PathBuf,
}

impl Track {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uri(&self) -> Result<String, App> {
        let path = self
            .path
            .canonicalize()
            .map_err(|e| App::TrackLoad(format!("{}: {e}", self.path.display())))?;
        let uri = glib::filename_to_uri(&path, None)
            .map_err(|e| App::TrackLoad(format!("{}: {e}", path.display())))?;
        Ok(uri.to_string())
    }
}

pub fn bundled(assets_dir: &Path) -> Vec<Track> {
    TRACK_FILES
        .iter()
        .map(|file| Track::new(assets_dir.join(file)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_list_has_three_tracks() {
        let tracks = bundled(Path::new("/usr/share/tritone/tracks"));
        assert_eq!(tracks.len(), TRACK_COUNT);
        assert_eq!(
            tracks[0].path(),
            Path::new("/usr/share/tritone/tracks/song1.ogg")
        );
        assert_eq!(
            tracks[2].path(),
            Path::new("/usr/share/tritone/tracks/song3.ogg")
        );
    }

    #[test]
    fn uri_for_missing_file_is_a_track_load_error() {
        let track = Track::new(PathBuf::from("/nonexistent/tritone/song1.ogg"));
        assert!(matches!(track.uri(), Err(App::TrackLoad(_))));
    }
}
