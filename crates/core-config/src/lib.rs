//! Configuration loading and parsing.
//!
//! Parses `glossa.toml` (or an override path provided by the host) into a
//! read-only `Config` that is passed explicitly into engine constructors.
//! There is no global settings singleton: every component receives the slice
//! of configuration it needs at construction time.
//!
//! Sections:
//! * `[palette]`: status background colors, accent / override / neutral
//!   foregrounds. Colors are `#RRGGBB` or `#AARRGGBB` strings; an invalid
//!   value falls back to its default and is logged under target `config`.
//! * `[highlight]`: rounded background paddings and corner radius.
//! * `[gesture]`: double-tap window, long-press threshold, touch slop.
//! * `[markup]`: attribute / class names understood by the ingestion parser.
//!
//! Unknown fields are ignored (TOML deserialization tolerance) so older
//! binaries keep reading newer files. A file that fails to parse falls back
//! to defaults rather than aborting startup.

use anyhow::Result;
use core_model::Color;
use serde::Deserialize;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "glossa.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PaletteConfig {
    /// Background colors for learning stages 1..=5.
    pub learning: [String; 5],
    /// Background for status 99. Transparent by default.
    pub well_known: String,
    /// Background for status 98. Transparent by default.
    pub ignored: String,
    /// Foreground for interactive terms without learning data.
    pub accent: String,
    /// Optional foreground applied on top of status backgrounds.
    pub override_foreground: Option<String>,
    /// Theme default foreground; style colors equal to it are not applied.
    pub neutral: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            learning: [
                "#F5B8A9".to_string(),
                "#F5CCA9".to_string(),
                "#F5E1A9".to_string(),
                "#F5F3A9".to_string(),
                "#DDFFDD".to_string(),
            ],
            well_known: "#00000000".to_string(),
            ignored: "#00000000".to_string(),
            accent: "#1E88E5".to_string(),
            override_foreground: None,
            neutral: "#000000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct HighlightConfig {
    pub padding_left: f32,
    pub padding_right: f32,
    pub padding_vertical: f32,
    pub corner_radius: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            padding_left: 2.0,
            padding_right: 2.0,
            padding_vertical: 1.0,
            corner_radius: 6.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    /// Two taps on the same entity closer than this are a double tap.
    pub double_tap_ms: u64,
    /// Pointer held at least this long without moving is a long press.
    pub long_press_ms: u64,
    /// Movement (surface units) beyond which a press is no longer a tap.
    pub touch_slop: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            double_tap_ms: 200,
            long_press_ms: 500,
            touch_slop: 8.0,
        }
    }
}

impl GestureConfig {
    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_ms)
    }

    pub fn long_press_threshold(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MarkupConfig {
    /// Elements that delimit paragraphs.
    pub block_tags: Vec<String>,
    /// Attribute carrying the term identity.
    pub term_attr: String,
    /// Attribute whose presence marks a word as interactive.
    pub interactive_attr: String,
    /// Attribute carrying the language identity.
    pub language_attr: String,
    /// Attributes that may carry a numeric paragraph id.
    pub paragraph_id_attrs: Vec<String>,
    /// Language used when a word carries none.
    pub default_language: u32,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            block_tags: ["p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            term_attr: "data-term-id".to_string(),
            interactive_attr: "data-clickable".to_string(),
            language_attr: "data-lang-id".to_string(),
            paragraph_id_attrs: vec!["data-paragraph-id".to_string(), "id".to_string()],
            default_language: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub palette: PaletteConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub markup: MarkupConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Best-effort config path: working directory first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("glossa").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    Ok(from_toml_str(&content))
}

/// Parse configuration text; parse errors fall back to defaults.
pub fn from_toml_str(content: &str) -> Config {
    match toml::from_str::<ConfigFile>(content) {
        Ok(file) => Config {
            raw: Some(content.to_string()),
            file,
        },
        Err(e) => {
            warn!(target: "config", error = %e, "config_parse_failed_using_defaults");
            Config::default()
        }
    }
}

/// Parse a palette color, falling back to `default` (logged) when malformed.
pub fn color_or(value: &str, default: Color, field: &'static str) -> Color {
    match value.parse::<Color>() {
        Ok(c) => c,
        Err(e) => {
            warn!(target: "config", field, error = %e, "palette_color_invalid");
            default
        }
    }
}

impl PaletteConfig {
    /// Resolved learning-stage background colors.
    pub fn learning_colors(&self) -> [Color; 5] {
        let defaults = PaletteConfig::default();
        let mut out = [Color::TRANSPARENT; 5];
        for (i, slot) in out.iter_mut().enumerate() {
            let fallback = defaults.learning[i]
                .parse()
                .unwrap_or(Color::TRANSPARENT);
            *slot = color_or(&self.learning[i], fallback, "palette.learning");
        }
        out
    }

    pub fn well_known_color(&self) -> Color {
        color_or(&self.well_known, Color::TRANSPARENT, "palette.well_known")
    }

    pub fn ignored_color(&self) -> Color {
        color_or(&self.ignored, Color::TRANSPARENT, "palette.ignored")
    }

    pub fn accent_color(&self) -> Color {
        color_or(&self.accent, Color::rgb(0x1e, 0x88, 0xe5), "palette.accent")
    }

    pub fn neutral_color(&self) -> Color {
        color_or(&self.neutral, Color::BLACK, "palette.neutral")
    }

    /// `None` when unset or malformed.
    pub fn override_foreground_color(&self) -> Option<Color> {
        let value = self.override_foreground.as_deref()?;
        match value.parse::<Color>() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(target: "config", field = "palette.override_foreground", error = %e, "palette_color_invalid");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.file, ConfigFile::default());
        assert_eq!(cfg.file.gesture.double_tap_window(), Duration::from_millis(200));
    }

    #[test]
    fn parses_sections_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[gesture]\ndouble_tap_ms = 300\n[palette]\naccent = \"#FF0000\"\noverride_foreground = \"#111111\"\n[markup]\nterm_attr = \"data_wid\"\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.gesture.double_tap_ms, 300);
        assert_eq!(cfg.file.gesture.long_press_ms, 500, "unset field keeps default");
        assert_eq!(cfg.file.palette.accent_color(), Color::rgb(0xff, 0, 0));
        assert_eq!(
            cfg.file.palette.override_foreground_color(),
            Some(Color::rgb(0x11, 0x11, 0x11))
        );
        assert_eq!(cfg.file.markup.term_attr, "data_wid");
        assert_eq!(cfg.file.markup.interactive_attr, "data-clickable");
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let cfg = from_toml_str("[gesture\ndouble_tap_ms = ");
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.file.gesture, GestureConfig::default());
    }

    #[test]
    fn palette_defaults_resolve() {
        let p = PaletteConfig::default();
        let learning = p.learning_colors();
        assert_eq!(learning[0], Color::rgb(0xf5, 0xb8, 0xa9));
        assert!(p.well_known_color().is_transparent());
        assert!(p.ignored_color().is_transparent());
        assert_eq!(p.override_foreground_color(), None);
        assert_eq!(p.neutral_color(), Color::BLACK);
    }

    #[test]
    fn invalid_palette_color_logs_and_falls_back() {
        let cfg = from_toml_str("[palette]\naccent = \"blue\"\n");
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let accent = with_default(subscriber, || cfg.file.palette.accent_color());

        assert_eq!(accent, Color::rgb(0x1e, 0x88, 0xe5));
        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("palette_color_invalid"));
    }
}
