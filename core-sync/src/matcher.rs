//! Loved-track matching.
//!
//! Remote favorites are grouped by artist identity; a local song matches the
//! first track in its artist's group whose normalized name is equal.
//! Tracks without an identity are never grouped and so never match.

use bridge_traits::library::LocalSong;
use core_scrobble::FavoriteTrack;
use std::collections::HashMap;

/// Lowercase and keep only alphanumeric characters.
///
/// Unicode-aware and locale-independent: `"Don't Stop Me Now"` and
/// `"dont stop me now"` both become `"dontstopmenow"`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Loose name equality used for matching
pub fn names_match(local: &str, remote: &str) -> bool {
    normalize_name(local) == normalize_name(remote)
}

/// Remote favorites keyed by artist identity, in fetch order
#[derive(Debug, Clone, Default)]
pub struct ArtistGroup {
    groups: HashMap<String, Vec<FavoriteTrack>>,
    ungrouped: usize,
}

impl ArtistGroup {
    /// Tracks for `identity`; `None` when no loved track carries it
    pub fn tracks_for(&self, identity: &str) -> Option<&[FavoriteTrack]> {
        self.groups
            .get(identity.trim())
            .map(Vec::as_slice)
            .filter(|tracks| !tracks.is_empty())
    }

    /// Number of distinct artist identities
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Tracks dropped because they had no artist identity
    pub fn ungrouped(&self) -> usize {
        self.ungrouped
    }
}

/// Group `tracks` by artist identity, preserving order within each group.
pub fn group_by_artist<I>(tracks: I) -> ArtistGroup
where
    I: IntoIterator<Item = FavoriteTrack>,
{
    let mut group = ArtistGroup::default();

    for track in tracks {
        match track.artist_identity.clone() {
            Some(identity) => group.groups.entry(identity).or_default().push(track),
            None => group.ungrouped += 1,
        }
    }

    group
}

/// First track in `tracks` whose name loosely equals the song's name.
pub fn find_match<'a>(tracks: &'a [FavoriteTrack], song: &LocalSong) -> Option<&'a FavoriteTrack> {
    let wanted = normalize_name(&song.name);
    tracks
        .iter()
        .find(|track| normalize_name(&track.name) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(name: &str) -> LocalSong {
        LocalSong {
            id: format!("song-{}", normalize_name(name)),
            name: name.to_string(),
            artist_identity: Some("queen".to_string()),
        }
    }

    fn track(name: &str, identity: Option<&str>) -> FavoriteTrack {
        FavoriteTrack::new(name, "Queen", identity)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Don't Stop Me Now"), "dontstopmenow");
        assert_eq!(normalize_name("  AC/DC - T.N.T.  "), "acdctnt");
        assert_eq!(normalize_name("Sigur Rós"), "sigurrós");
        assert_eq!(normalize_name("!!!"), "");
    }

    #[test]
    fn test_fuzzy_match_examples() {
        assert!(names_match("Don't Stop Me Now", "dont stop me now"));
        assert!(!names_match("Don't Stop Me Now", "Bohemian Rhapsody"));
    }

    #[test]
    fn test_group_by_artist() {
        let group = group_by_artist(vec![
            track("Bohemian Rhapsody", Some("queen")),
            track("Under Pressure", Some("queen")),
            track("Heroes", Some("bowie")),
            track("Unknown", None),
            track("Also Unknown", Some("   ")),
        ]);

        assert_eq!(group.len(), 2);
        assert_eq!(group.ungrouped(), 2);

        let queen: Vec<&str> = group
            .tracks_for("queen")
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(queen, vec!["Bohemian Rhapsody", "Under Pressure"]);
        assert!(group.tracks_for("abba").is_none());
    }

    #[test]
    fn test_find_match_first_wins() {
        let tracks = vec![
            track("Bohemian Rhapsody", Some("queen")),
            track("dont stop me now", Some("queen")),
            track("Don't Stop Me Now!", Some("queen")),
        ];

        let found = find_match(&tracks, &song("Don't Stop Me Now")).unwrap();
        assert_eq!(found.name, "dont stop me now");

        assert!(find_match(&tracks, &song("Radio Ga Ga")).is_none());
        assert!(find_match(&[], &song("Bohemian Rhapsody")).is_none());
    }
}
