//! Frame phases and per-tick frame data

/// The fixed phases every tick runs through, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Read host state (layout, styles)
    Read,
    /// Finish keyframe resolution, including batched measurement
    ResolveKeyframes,
    /// Advance animations
    Update,
    /// Derive values that depend on updated values
    PreRender,
    /// Write to the host
    Render,
    /// Cleanup and follow-up reads
    PostRender,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 6] = [
        Phase::Read,
        Phase::ResolveKeyframes,
        Phase::Update,
        Phase::PreRender,
        Phase::Render,
        Phase::PostRender,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Read => "read",
            Phase::ResolveKeyframes => "resolveKeyframes",
            Phase::Update => "update",
            Phase::PreRender => "preRender",
            Phase::Render => "render",
            Phase::PostRender => "postRender",
        }
    }
}

/// Snapshot of the current tick, handed to every job by value
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameData {
    /// Milliseconds since the previous tick
    pub delta: f64,
    /// Timestamp of this tick in milliseconds
    pub timestamp: f64,
    /// Whether a tick is being processed right now
    pub is_processing: bool,
}
