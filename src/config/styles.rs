//! Character styles: the template image a face is blended into, plus the
//! generation prompts that go with it.

use std::collections::BTreeMap;
use std::path::Path;

use garde::Validate;
use serde::{Deserialize, Serialize};

const SUPERHERO_PROMPT: &str = "Preserve the superhero's original head shape, jawline, skull structure, \
hair, hairstyle, costume, pose, and lighting exactly as in the base image. \
Subtly blend the child's facial characteristics into the face, \
including eyes, eyebrows, nose, mouth, and expression. \
Child face, young facial proportions, soft facial features. \
No face swap. No replacement of head shape. Maintain superhero identity. \
Photorealistic. Cinematic lighting. Clean studio background. High detail.";

const SUPERHERO_NEGATIVE: &str = "face swap, different jawline, different hair, adult face, aging, \
distorted face, cartoon, anime, exaggerated features, deformed";

const TEMPLATE_BASE: &str = "https://res.cloudinary.com/dfcqp8igu/image/upload";

/// Generation parameters for one character.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StyleConfig {
    #[garde(length(min = 1))]
    pub prompt: String,

    #[garde(skip)]
    pub negative_prompt: String,

    #[garde(url, custom(http_scheme))]
    pub template_url: String,
}

/// The inference service fetches templates over HTTP.
fn http_scheme(value: &str, _ctx: &()) -> garde::Result {
    let scheme = value.split_once("://").map(|(scheme, _)| scheme);
    match scheme {
        Some(s) if s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https") => Ok(()),
        _ => Err(garde::Error::new("template URL must use http or https")),
    }
}

/// A style picked for a request, with whether the default had to stand in.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedStyle<'a> {
    pub key: &'a str,
    pub style: &'a StyleConfig,
    pub fallback: bool,
}

/// Lookup table from lower-cased character key to style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleTable {
    default: String,
    styles: BTreeMap<String, StyleConfig>,
}

impl StyleTable {
    pub fn new(default: impl Into<String>, styles: BTreeMap<String, StyleConfig>) -> Self {
        let styles = styles
            .into_iter()
            .map(|(key, style)| (key.to_lowercase(), style))
            .collect();
        Self {
            default: default.into().to_lowercase(),
            styles,
        }
    }

    /// The characters the booth ships with.
    pub fn builtin(default: &str) -> Self {
        let mut styles = BTreeMap::new();

        let heroes = [
            ("superman", "v1768395277/templates/superman_template_vibrant_v4.png"),
            ("batman", "v1768659434/templates/batman_template_backend.jpg"),
            ("spiderman", "v1768659435/templates/spiderman_template_backend.jpg"),
            ("wonderwoman", "v1768659435/templates/wonderwoman_template_backend.jpg"),
            ("ironman", "v1768659436/templates/ironman_template_backend.jpg"),
            ("captainamerica", "v1768659437/templates/captainamerica_template_backend.jpg"),
        ];
        for (key, template) in heroes {
            let negative_prompt = if key == "superman" {
                format!(
                    "{SUPERHERO_NEGATIVE}, brown costume, gray costume, desaturated colors, muted colors"
                )
            } else {
                SUPERHERO_NEGATIVE.to_string()
            };
            styles.insert(
                key.to_string(),
                StyleConfig {
                    prompt: SUPERHERO_PROMPT.to_string(),
                    negative_prompt,
                    template_url: format!("{TEMPLATE_BASE}/{template}"),
                },
            );
        }

        let heritage = [
            (
                "saudi_central_male",
                "Saudi man wearing traditional bisht and thobe, photorealistic, cinematic lighting",
                "cartoon, drawing, anime, low quality",
                "templates/saudi_central_male_v7.png",
            ),
            (
                "saudi_traditional_daglah",
                "Saudi man wearing traditional daglah with golden embroidered patterns and black bandolier, \
                 white shemagh with black agal, photorealistic, cinematic lighting, traditional Saudi heritage setting",
                "cartoon, drawing, anime, low quality, modern clothing, western clothing",
                "v1770104351/templates/saudi_traditional_daglah.jpg",
            ),
            (
                "jeddah_young_character_1770485845273",
                "Young Saudi man wearing white bisht over black thobe, white shemagh with gold-striped agal, \
                 black goatee, Jeddah cityscape background, photorealistic, professional photography, natural lighting",
                "cartoon, drawing, anime, low quality, modern clothing, western clothing, old man, elderly",
                "v1770486929/templates/jeddah_young_white_bisht.jpg",
            ),
            (
                "jeddah_character_updated_1770487272655",
                "Young Saudi man wearing white bisht over black thobe, white shemagh with gold-striped agal, \
                 clean-shaven face with very light mustache, Jeddah cityscape background, photorealistic, \
                 professional photography, natural lighting",
                "cartoon, drawing, anime, low quality, modern clothing, western clothing, old man, elderly, \
                 goatee, beard, heavy mustache",
                "v1770487272/templates/jeddah_character_updated.jpg",
            ),
            (
                "daglah_child_character_1770488439465",
                "Saudi Arabian boy child aged 8-12 years old wearing traditional daglah with golden embroidery \
                 and black bandolier, white shemagh with black agal, child face, young boy, photorealistic, \
                 professional photography, natural lighting",
                "cartoon, drawing, anime, low quality, modern clothing, western clothing, adult, teenager, \
                 facial hair, beard, mustache",
                "v1770488439/templates/daglah_child_character.jpg",
            ),
            (
                "sharqawi_dress_character_1770578762613",
                "Saudi Arabian woman wearing traditional Eastern Province (Sharqiyah) black dress with intricate \
                 gold embroidery, black hijab with gold trim, elegant appearance, photorealistic, professional \
                 photography, natural lighting, traditional Saudi heritage setting",
                "cartoon, drawing, anime, low quality, modern clothing, western clothing, niqab",
                "v1770578762/templates/sharqawi_dress_character.jpg",
            ),
            (
                "jeddah_character_updated_1770660835227",
                "Fit athletic Saudi Arabian man wearing traditional white bisht over black thobe, white shemagh \
                 with gold-striped agal, well-groomed full light beard with mustache, natural neutral expression, \
                 historical Saudi heritage architecture background (old Jeddah Al-Balad style), photorealistic, \
                 professional photography, natural lighting",
                "cartoon, drawing, anime, low quality, modern clothing, western clothing, smile, goatee only, \
                 clean shaven",
                "templates/jeddah_updated_v2.jpg",
            ),
            (
                "northern_woman_v1_1770658383334",
                "Saudi Arabian woman wearing traditional Northern Saudi dress with burgundy/maroon embroidered \
                 vest featuring vertical striped patterns and gold coin necklace decorations, black hijab with \
                 burgundy and gold coin headband, black waist sash, elegant appearance, photorealistic, \
                 professional photography, natural lighting, traditional Saudi heritage setting",
                "cartoon, drawing, anime, low quality, modern clothing, western clothing, niqab",
                "templates/northern_woman_v1.jpg",
            ),
        ];
        for (key, prompt, negative_prompt, template) in heritage {
            styles.insert(
                key.to_string(),
                StyleConfig {
                    prompt: prompt.to_string(),
                    negative_prompt: negative_prompt.to_string(),
                    template_url: format!("{TEMPLATE_BASE}/{template}"),
                },
            );
        }

        Self::new(default, styles)
    }

    /// Load a table from `{"default": "...", "styles": {"key": {...}}}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StyleError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let table: StyleTable = serde_json::from_str(&raw)?;
        Ok(Self::new(table.default, table.styles))
    }

    /// Checked once at startup so a broken template never surfaces mid-request.
    pub fn validate(&self) -> Result<(), StyleError> {
        if self.styles.is_empty() {
            return Err(StyleError::Empty);
        }
        for (key, style) in &self.styles {
            style.validate().map_err(|report| StyleError::Invalid {
                key: key.clone(),
                report: report.to_string(),
            })?;
        }
        if !self.styles.contains_key(&self.default) {
            return Err(StyleError::UnknownDefault(self.default.clone()));
        }
        Ok(())
    }

    /// Look up a character, falling back to the default for unknown keys.
    ///
    /// Assumes [`validate`](Self::validate) has passed, so the default exists.
    pub fn resolve(&self, character: &str) -> Option<ResolvedStyle<'_>> {
        let wanted = character.to_lowercase();
        if let Some((key, style)) = self.styles.get_key_value(&wanted) {
            return Some(ResolvedStyle {
                key: key.as_str(),
                style,
                fallback: false,
            });
        }
        self.styles
            .get_key_value(&self.default)
            .map(|(key, style)| ResolvedStyle {
                key: key.as_str(),
                style,
                fallback: true,
            })
    }

    pub fn default_key(&self) -> &str {
        &self.default
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("Failed to read styles file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse styles file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Style table is empty")]
    Empty,

    #[error("Style '{key}' is invalid: {report}")]
    Invalid { key: String, report: String },

    #[error("Default style '{0}' is not in the table")]
    UnknownDefault(String),
}
