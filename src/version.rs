// Version information for the CV Detection API

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-yolov8-detection-2025-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "image-detection",
    "video-detection",
    "annotated-jpeg",
    "model-info",
    "user-crud",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("CV Detection API {} ({})", VERSION_NUMBER, BUILD_DATE)
}
