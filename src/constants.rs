//! Global Constants
//!
//! Centralized constants for cost estimation, planning and networking.
//! All magic numbers should be defined here with documentation.

/// Oracle cost model constants (image token units)
pub mod cost {
    /// Flat cost of one image at low detail, also the base of a high-detail image
    pub const BASE_TOKENS: u64 = 85;

    /// Cost of one 512px tile at high detail
    pub const TILE_TOKENS: u64 = 170;

    /// Edge length of one tile (pixels)
    pub const TILE_SIZE: u32 = 512;

    /// Longest side an image is scaled to before tiling (pixels)
    pub const MAX_DIMENSION: u32 = 2048;

    /// Flat tile count assumed per high-detail window
    pub const SEQUENTIAL_TILE_FACTOR: u64 = 4;
}

/// Window planning constants
pub mod planning {
    /// Default number of images per window
    pub const DEFAULT_SEQUENCE_LENGTH: usize = 3;

    /// Default number of images shared by consecutive windows
    pub const DEFAULT_OVERLAP: usize = 1;

    /// Extensions accepted by the asset lister (case-sensitive)
    pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".png"];

    /// Default directory for composite artifacts, relative to the source
    pub const DEFAULT_COMPOSITE_DIR: &str = "composites";
}

/// Oracle request constants
pub mod oracle {
    /// Default completion length for one description
    pub const DEFAULT_MAX_TOKENS: u32 = 100;

    /// Default OpenAI-compatible model
    pub const DEFAULT_MODEL: &str = "gpt-4o";

    /// Default OpenAI-compatible endpoint
    pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
