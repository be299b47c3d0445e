use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

// pcm0c, pcm3abc, and the ALSA card/device form pcmC0D0c. Trailing c marks a capture stream.
static CAPTURE_NODE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pcm(?:C[0-9]+D)?[0-9]+[A-Za-z0-9]*c$").expect("valid capture node regex"));

/// Recognises capture stream device nodes directly below the device root.
#[derive(Debug, Clone)]
pub struct CaptureNodePattern {
    root: PathBuf,
}

impl CaptureNodePattern {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn matches(&self, path: &Path) -> bool {
        if path.parent() != Some(self.root.as_path()) {
            return false;
        }

        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| CAPTURE_NODE_NAME.is_match(name))
    }
}

impl std::fmt::Display for CaptureNodePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/pcm*c", self.root.display())
    }
}

/// A node counts as settled once its last access lies at least `minimum_age` in the past.
/// Freshly created nodes from a hot-plug are not settled yet.
pub fn is_settled(last_access: DateTime<Utc>, now: DateTime<Utc>, minimum_age: Duration) -> bool {
    now - last_access >= minimum_age
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> CaptureNodePattern {
        CaptureNodePattern::new("/dev/snd")
    }

    #[test]
    fn accepts_capture_nodes() {
        assert!(pattern().matches(Path::new("/dev/snd/pcm0c")));
        assert!(pattern().matches(Path::new("/dev/snd/pcm12abc")));
        assert!(pattern().matches(Path::new("/dev/snd/pcmC0D0c")));
    }

    #[test]
    fn rejects_playback_nodes() {
        assert!(!pattern().matches(Path::new("/dev/snd/pcm0p")));
        assert!(!pattern().matches(Path::new("/dev/snd/pcmC1D0p")));
    }

    #[test]
    fn rejects_other_names() {
        assert!(!pattern().matches(Path::new("/dev/snd/controlC0")));
        assert!(!pattern().matches(Path::new("/dev/snd/pcmc")));
        assert!(!pattern().matches(Path::new("/dev/snd/timer")));
        assert!(!pattern().matches(Path::new("/dev/snd/by-path")));
    }

    #[test]
    fn rejects_nodes_outside_root() {
        assert!(!pattern().matches(Path::new("/tmp/pcm0c")));
        assert!(!pattern().matches(Path::new("/dev/snd/by-id/pcm0c")));
        assert!(!pattern().matches(Path::new("pcm0c")));
    }

    #[test]
    fn display_shows_glob() {
        assert_eq!(pattern().to_string(), "/dev/snd/pcm*c");
    }

    #[test]
    fn settled_after_minimum_age() {
        let now = Utc::now();
        let minimum_age = Duration::seconds(5);

        assert!(!is_settled(now - Duration::seconds(2), now, minimum_age));
        assert!(is_settled(now - Duration::seconds(5), now, minimum_age));
        assert!(is_settled(now - Duration::seconds(6), now, minimum_age));
    }

    #[test]
    fn access_in_the_future_is_not_settled() {
        let now = Utc::now();

        assert!(!is_settled(now + Duration::seconds(1), now, Duration::seconds(5)));
        assert!(!is_settled(now + Duration::seconds(1), now, Duration::zero()));
    }

    #[test]
    fn zero_minimum_age_always_settled_for_past_access() {
        let now = Utc::now();

        assert!(is_settled(now, now, Duration::zero()));
    }
}
