//! Broadcaster caption drawn over each clip segment.
//!
//! The caption reads `@name` and sits in the bottom-right corner on a
//! semi-transparent box. Text is fed to `drawtext` through a `textfile` so
//! display names never need filtergraph escaping.

use std::path::Path;
use tracing::debug;

/// Name shown when a clip carries no broadcaster name.
pub const CAPTION_PLACEHOLDER: &str = "LeStreamerLuiLà";

/// Bundled caption font.
pub const DEFAULT_FONT_PATH: &str = "assets/font/Montserrat-VariableFont_wght.ttf";

const FALLBACK_FONT_PATHS: &[&str] = &[
    "/app/assets/font/Montserrat-VariableFont_wght.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
];

/// Caption text for a broadcaster.
pub fn caption_text(broadcaster_name: &str) -> String {
    let name = broadcaster_name.trim();
    if name.is_empty() {
        format!("@{}", CAPTION_PLACEHOLDER)
    } else {
        format!("@{}", name)
    }
}

/// Caption style.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionConfig {
    /// Font file; `None` lets ffmpeg pick its default font
    pub font_path: Option<String>,
    pub font_size: u32,
    pub font_color: String,
    /// Background box color in ffmpeg `color@alpha` form
    pub box_color: String,
    /// Padding between text and box edge (pixels)
    pub box_padding: u32,
    /// Text outline width (pixels)
    pub border_width: u32,
    pub border_color: String,
    /// Distance from the right edge (pixels)
    pub margin_x: u32,
    /// Distance from the bottom edge (pixels)
    pub margin_y: u32,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            font_path: resolve_font_path(DEFAULT_FONT_PATH),
            font_size: 36,
            font_color: "white".to_string(),
            box_color: "black@0.5".to_string(),
            box_padding: 12,
            border_width: 2,
            border_color: "black".to_string(),
            margin_x: 20,
            margin_y: 20,
        }
    }
}

impl CaptionConfig {
    /// Use `path` as the caption font, falling back to known locations when
    /// it does not exist.
    pub fn with_font(mut self, path: impl AsRef<str>) -> Self {
        self.font_path = resolve_font_path(path.as_ref());
        self
    }
}

fn resolve_font_path(preferred: &str) -> Option<String> {
    if Path::new(preferred).is_file() {
        return Some(preferred.to_string());
    }

    for path in FALLBACK_FONT_PATHS {
        if Path::new(path).is_file() {
            debug!(path = path, "Using fallback caption font");
            return Some(path.to_string());
        }
    }

    None
}

fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Build the `drawtext` filter reading its text from `text_file`.
pub fn build_caption_filter(config: &CaptionConfig, text_file: &Path) -> String {
    let mut opts = Vec::new();

    if let Some(font) = &config.font_path {
        opts.push(format!("fontfile='{}'", escape_filter_path(font)));
    }
    opts.push(format!(
        "textfile='{}'",
        escape_filter_path(&text_file.to_string_lossy())
    ));
    opts.push("expansion=none".to_string());
    opts.push(format!("fontsize={}", config.font_size));
    opts.push(format!("fontcolor={}", config.font_color));
    opts.push("box=1".to_string());
    opts.push(format!("boxcolor={}", config.box_color));
    opts.push(format!("boxborderw={}", config.box_padding));
    if config.border_width > 0 {
        opts.push(format!("borderw={}", config.border_width));
        opts.push(format!("bordercolor={}", config.border_color));
    }
    // Keep the box inside the frame: the padding extends past the text.
    opts.push(format!("x=w-tw-{}", config.margin_x + config.box_padding));
    opts.push(format!("y=h-th-{}", config.margin_y + config.box_padding));

    format!("drawtext={}", opts.join(":"))
}
