/// Track state enumeration for the track lifecycle.
///
/// A track only ever moves forward through these states:
/// `Tentative` -> `Confirmed` -> `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TrackState {
    /// Newly created track, not yet confirmed
    #[default]
    Tentative,
    /// Confirmed track, eligible for emission
    Confirmed,
    /// Dead track, to be purged from the active set
    Deleted,
}
