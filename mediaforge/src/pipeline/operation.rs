//! Declarative operation descriptors.
//!
//! Every operation is a tagged parameter record. Enum-like parameters are
//! lenient: an unrecognized value falls back to the family default instead
//! of rejecting the request.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::{Error, Result};

macro_rules! lenient_from_string {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<String> for $ty {
                fn from(raw: String) -> Self {
                    raw.trim().parse().unwrap_or_default()
                }
            }
        )*
    };
}

/// xfade transition names.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum XfadeKind {
    #[default]
    Fade,
    FadeBlack,
    FadeWhite,
    Dissolve,
    Distance,
    Pixelize,
    Radial,
    WipeLeft,
    WipeRight,
    WipeUp,
    WipeDown,
    SlideLeft,
    SlideRight,
    SlideUp,
    SlideDown,
    SmoothLeft,
    SmoothRight,
    SmoothUp,
    SmoothDown,
    CircleCrop,
    RectCrop,
    CircleOpen,
    CircleClose,
}

/// Concatenation transition; `none` is a plain stream copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Transition {
    #[default]
    None,
    Xfade(XfadeKind),
}

impl From<String> for Transition {
    fn from(raw: String) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            Self::None
        } else {
            Self::Xfade(raw.parse().unwrap_or_default())
        }
    }
}

/// Pan target of the Ken Burns effect.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PanDirection {
    #[default]
    Center,
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum OverlayPosition {
    #[strum(serialize = "top-left", serialize = "top_left")]
    TopLeft,
    #[default]
    #[strum(serialize = "top-right", serialize = "top_right")]
    TopRight,
    #[strum(serialize = "bottom-left", serialize = "bottom_left")]
    BottomLeft,
    #[strum(serialize = "bottom-right", serialize = "bottom_right")]
    BottomRight,
    Center,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FilterType {
    #[default]
    Brightness,
    Contrast,
    Saturation,
    Blur,
    Sharpen,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FadeType {
    In,
    Out,
    #[default]
    Both,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CaptionPosition {
    #[default]
    Bottom,
    #[strum(serialize = "center", serialize = "middle")]
    Center,
    Top,
}

impl CaptionPosition {
    /// ASS numpad alignment.
    pub fn alignment(self) -> u8 {
        match self {
            Self::Bottom => 2,
            Self::Center => 5,
            Self::Top => 8,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ColorEffect {
    #[default]
    Cinematic,
    Vintage,
    Warm,
    Cool,
    #[strum(serialize = "black_white", serialize = "black-white", serialize = "bw")]
    BlackWhite,
    Vibrant,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    #[default]
    Youtube,
    Tiktok,
    Reels,
    Shorts,
    Instagram,
    Twitter,
}

impl Platform {
    /// Output frame size.
    pub fn frame_size(self) -> (u32, u32) {
        match self {
            Self::Youtube => (1920, 1080),
            Self::Tiktok | Self::Reels | Self::Shorts => (1080, 1920),
            Self::Instagram => (1080, 1080),
            Self::Twitter => (1280, 720),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    /// x264 constant rate factor.
    pub fn crf(self) -> u32 {
        match self {
            Self::Low => 28,
            Self::Medium => 23,
            Self::High => 18,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AudioFormat {
    #[default]
    Mp3,
    Aac,
    Wav,
    Flac,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Aac => "m4a",
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }

    pub fn codec(self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Aac => "aac",
            Self::Wav => "pcm_s16le",
            Self::Flac => "flac",
        }
    }
}

lenient_from_string!(
    XfadeKind,
    PanDirection,
    OverlayPosition,
    FilterType,
    FadeType,
    CaptionPosition,
    ColorEffect,
    Platform,
    Quality,
    AudioFormat,
);

fn default_transition_duration() -> f64 {
    1.0
}

fn default_one() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_ken_burns_duration() -> f64 {
    5.0
}

fn default_zoom_end() -> f64 {
    1.2
}

fn default_blur_strength() -> f64 {
    20.0
}

fn default_foreground_scale() -> f64 {
    0.8
}

fn default_portrait_width() -> u32 {
    1080
}

fn default_portrait_height() -> u32 {
    1920
}

fn default_margin() -> f64 {
    20.0
}

fn default_background_color() -> String {
    "000000".to_string()
}

fn default_font_size() -> u32 {
    24
}

fn default_font_color() -> String {
    "FFFFFF".to_string()
}

fn default_outline() -> f64 {
    2.0
}

fn default_key_color() -> String {
    "0x00FF00".to_string()
}

fn default_similarity() -> f64 {
    0.3
}

fn default_blend() -> f64 {
    0.1
}

fn default_thumbnail_width() -> u32 {
    320
}

fn default_thumbnail_quality() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConcatParams {
    pub video_ids: Vec<String>,
    #[serde(default)]
    pub transition: Transition,
    #[serde(default = "default_transition_duration")]
    pub transition_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MergeAudioParams {
    pub video_id: String,
    pub audio_id: String,
    #[serde(default = "default_one")]
    pub audio_volume: f64,
    /// Drop the original soundtrack instead of mixing into it.
    #[serde(default = "default_true")]
    pub replace_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KenBurnsParams {
    pub image_id: String,
    /// Seconds.
    #[serde(default = "default_ken_burns_duration")]
    pub duration: f64,
    #[serde(default = "default_one")]
    pub zoom_start: f64,
    #[serde(default = "default_zoom_end")]
    pub zoom_end: f64,
    #[serde(default)]
    pub direction: PanDirection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlurBackgroundParams {
    pub image_id: String,
    #[serde(default = "default_blur_strength")]
    pub blur_strength: f64,
    /// Foreground size relative to the source.
    #[serde(default = "default_foreground_scale")]
    pub scale: f64,
    #[serde(default = "default_portrait_width")]
    pub output_width: u32,
    #[serde(default = "default_portrait_height")]
    pub output_height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddOverlayParams {
    pub video_id: String,
    pub overlay_id: String,
    #[serde(default)]
    pub position: OverlayPosition,
    /// Pixels between the overlay and the frame edge.
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default = "default_one")]
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplyFilterParams {
    pub video_id: String,
    #[serde(default)]
    pub filter_type: FilterType,
    #[serde(default = "default_one")]
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddFadeParams {
    pub video_id: String,
    #[serde(default = "default_one")]
    pub fade_in_duration: f64,
    #[serde(default = "default_one")]
    pub fade_out_duration: f64,
    #[serde(default)]
    pub fade_type: FadeType,
}

/// Burned-in caption appearance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptionStyle {
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// `RRGGBB`.
    #[serde(default = "default_font_color")]
    pub font_color: String,
    #[serde(default)]
    pub position: CaptionPosition,
    #[serde(default = "default_outline")]
    pub outline: f64,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            font_color: default_font_color(),
            position: CaptionPosition::default(),
            outline: default_outline(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComposeParams {
    pub image_id: String,
    pub audio_id: String,
    #[serde(default)]
    pub subtitle_text: String,
    /// `RRGGBB` padding color.
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default)]
    pub caption_style: CaptionStyle,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColorGradeParams {
    pub video_id: String,
    #[serde(default)]
    pub effect: ColorEffect,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChromaKeyParams {
    /// Foreground shot in front of the key color.
    pub video_id: String,
    pub background_id: String,
    #[serde(default = "default_key_color")]
    pub color: String,
    #[serde(default = "default_similarity")]
    pub similarity: f64,
    #[serde(default = "default_blend")]
    pub blend: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptionParams {
    pub video_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub caption_style: CaptionStyle,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscodeParams {
    pub video_id: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub quality: Quality,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThumbnailParams {
    pub video_id: String,
    #[serde(default = "default_one")]
    pub timestamp_secs: f64,
    #[serde(default = "default_thumbnail_width")]
    pub width: u32,
    /// JPEG `-q:v`, lower is better.
    #[serde(default = "default_thumbnail_quality")]
    pub quality: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractAudioParams {
    pub video_id: String,
    #[serde(default)]
    pub format: AudioFormat,
}

/// A media operation and its parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    Concat(ConcatParams),
    MergeAudio(MergeAudioParams),
    KenBurns(KenBurnsParams),
    BlurBackground(BlurBackgroundParams),
    AddOverlay(AddOverlayParams),
    ApplyFilter(ApplyFilterParams),
    AddFade(AddFadeParams),
    Compose(ComposeParams),
    ColorGrade(ColorGradeParams),
    ChromaKey(ChromaKeyParams),
    Caption(CaptionParams),
    Transcode(TranscodeParams),
    Thumbnail(ThumbnailParams),
    ExtractAudio(ExtractAudioParams),
}

/// An input asset named by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Request field holding the id.
    pub parameter: &'static str,
    pub id: String,
}

impl AssetRef {
    fn new(parameter: &'static str, id: &str) -> Self {
        Self {
            parameter,
            id: id.to_string(),
        }
    }
}

impl Operation {
    /// Every operation tag, snake_case.
    pub const TAGS: &'static [&'static str] = &[
        "concat",
        "merge_audio",
        "ken_burns",
        "blur_background",
        "add_overlay",
        "apply_filter",
        "add_fade",
        "compose",
        "color_grade",
        "chroma_key",
        "caption",
        "transcode",
        "thumbnail",
        "extract_audio",
    ];

    /// The operation tag, also used as the record kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Concat(_) => "concat",
            Self::MergeAudio(_) => "merge_audio",
            Self::KenBurns(_) => "ken_burns",
            Self::BlurBackground(_) => "blur_background",
            Self::AddOverlay(_) => "add_overlay",
            Self::ApplyFilter(_) => "apply_filter",
            Self::AddFade(_) => "add_fade",
            Self::Compose(_) => "compose",
            Self::ColorGrade(_) => "color_grade",
            Self::ChromaKey(_) => "chroma_key",
            Self::Caption(_) => "caption",
            Self::Transcode(_) => "transcode",
            Self::Thumbnail(_) => "thumbnail",
            Self::ExtractAudio(_) => "extract_audio",
        }
    }

    /// Referenced input assets, in engine input order.
    pub fn references(&self) -> Vec<AssetRef> {
        match self {
            Self::Concat(p) => p
                .video_ids
                .iter()
                .map(|id| AssetRef::new("video_ids", id))
                .collect(),
            Self::MergeAudio(p) => vec![
                AssetRef::new("video_id", &p.video_id),
                AssetRef::new("audio_id", &p.audio_id),
            ],
            Self::KenBurns(p) => vec![AssetRef::new("image_id", &p.image_id)],
            Self::BlurBackground(p) => vec![AssetRef::new("image_id", &p.image_id)],
            Self::AddOverlay(p) => vec![
                AssetRef::new("video_id", &p.video_id),
                AssetRef::new("overlay_id", &p.overlay_id),
            ],
            Self::ApplyFilter(p) => vec![AssetRef::new("video_id", &p.video_id)],
            Self::AddFade(p) => vec![AssetRef::new("video_id", &p.video_id)],
            Self::Compose(p) => vec![
                AssetRef::new("image_id", &p.image_id),
                AssetRef::new("audio_id", &p.audio_id),
            ],
            Self::ColorGrade(p) => vec![AssetRef::new("video_id", &p.video_id)],
            Self::ChromaKey(p) => vec![
                AssetRef::new("video_id", &p.video_id),
                AssetRef::new("background_id", &p.background_id),
            ],
            Self::Caption(p) => vec![AssetRef::new("video_id", &p.video_id)],
            Self::Transcode(p) => vec![AssetRef::new("video_id", &p.video_id)],
            Self::Thumbnail(p) => vec![AssetRef::new("video_id", &p.video_id)],
            Self::ExtractAudio(p) => vec![AssetRef::new("video_id", &p.video_id)],
        }
    }

    /// Container extension of the output artifact.
    pub fn output_extension(&self) -> &'static str {
        match self {
            Self::BlurBackground(_) | Self::Thumbnail(_) => "jpg",
            Self::ExtractAudio(p) => p.format.extension(),
            _ => "mp4",
        }
    }
}

/// Normalize a route tag (`merge-audio`, `Merge_Audio`) to its snake_case form.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}

/// A submitted operation plus its optional completion callback.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub operation: Operation,
    pub callback_url: Option<String>,
}

impl OperationRequest {
    /// Build a request from a route tag and a JSON parameter object.
    pub fn from_parts(tag: &str, body: JsonValue) -> Result<Self> {
        let tag = normalize_tag(tag);
        if !Operation::TAGS.contains(&tag.as_str()) {
            return Err(Error::reference("operation", tag));
        }

        let mut params = match body {
            JsonValue::Object(map) => map,
            JsonValue::Null => serde_json::Map::new(),
            _ => {
                return Err(Error::validation(
                    "operation parameters must be a JSON object",
                ));
            }
        };
        let callback_url = match params.remove("callback_url") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(url)) => Some(url),
            Some(_) => return Err(Error::validation("callback_url must be a string")),
        };
        params.insert("operation".to_string(), JsonValue::String(tag.clone()));

        let operation = serde_json::from_value(JsonValue::Object(params))
            .map_err(|e| Error::validation(format!("invalid parameters for '{tag}': {e}")))?;
        Ok(Self {
            operation,
            callback_url,
        })
    }
}
