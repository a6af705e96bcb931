use thiserror::Error;

/// Argument validation failures. Every setter that returns one of these
/// leaves its receiver untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("texel to pixel ratio must be positive, got {0}")]
    InvalidTexelRatio(f64),

    #[error("opacity must be within [0, 1], got {0}")]
    InvalidOpacity(f64),

    #[error("line width must not be negative, got {0}")]
    InvalidLineWidth(f64),

    #[error("scale must be positive, got {0}")]
    InvalidScale(f64),

    #[error("texels per edge interval must be positive, got {0}")]
    InvalidEdgeInterval(f64),

    #[error("minimum edge intervals {min} exceeds maximum {max}")]
    InvalidEdgeIntervalRange { min: u32, max: u32 },

    #[error("tile size must be positive")]
    InvalidTileSize,

    #[error("level count must be positive")]
    InvalidLevelCount,

    #[error("tile delta must be positive, got {0}")]
    InvalidTileDelta(f64),

    #[error("field of view must be within (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f64),

    #[error("altitude must be positive, got {0}")]
    InvalidAltitude(f64),

    #[error("viewport must have a non-zero size, got {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("radius must be positive, got {0}")]
    InvalidRadius(f64),

    #[error("width and height must be positive, got {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    #[error("ellipse needs at least {min} intervals, got {got}")]
    TooFewIntervals { min: u32, got: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
