/// How a segment qualifier derives the frame in which to look up segments.
///
/// - `Target(p)`: frame is computed from the target's adjusted end.
/// - `Source(p)`: frame is computed from the source's adjusted start.
/// - `None`: the frameless bucket is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPhase {
    None,
    Source(u8),
    Target(u8),
}

/// Controls how segments of one type contribute to the score of an edge.
#[derive(Debug, Clone)]
pub struct SegmentQualifier {
    pub seg_idx       : usize,
    pub phase         : SegmentPhase,
    /// Only count segments whose start coincides with the source boundary.
    pub is_exact_src  : bool,
    /// Only count segments whose end coincides with the target boundary.
    pub is_exact_tgt  : bool,
    /// Allow segments that straddle the edge boundaries, clipped to the span.
    pub partial       : bool,
    /// Sum the contributions of this segment type; otherwise keep the maximum.
    pub score_sum     : bool,
    /// Use the overlap-merged list rather than the raw one.
    pub use_projected : bool,
}

/// Declares that features of one type, occurring strictly between the two
/// endpoints of an edge, invalidate it. An optional phase restricts the kill
/// to one frame relative to the measured endpoint.
#[derive(Debug, Clone, Copy)]
pub struct KillerFeatureQualifier {
    pub phase: Option<u8>,
}

/// Invalidates an edge whenever the source site carries `src_dna` and the
/// target site carries `tgt_dna`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnaKillerQualifier {
    pub src_dna: usize,
    pub tgt_dna: usize,
}
