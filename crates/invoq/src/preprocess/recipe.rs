//! Attempt-keyed preprocessing recipes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PreprocessingConfig;

use super::transform::{TransformOptions, Upscale};

/// A preprocessing step recorded on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreprocessFlag {
    AutoRotate,
    ContrastBoost,
    Upscale,
    Denoise,
    ProviderDeskew,
}

impl PreprocessFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            PreprocessFlag::AutoRotate => "AUTO_ROTATE",
            PreprocessFlag::ContrastBoost => "CONTRAST_BOOST",
            PreprocessFlag::Upscale => "UPSCALE",
            PreprocessFlag::Denoise => "DENOISE",
            PreprocessFlag::ProviderDeskew => "PROVIDER_DESKEW",
        }
    }
}

impl FromStr for PreprocessFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO_ROTATE" => Ok(PreprocessFlag::AutoRotate),
            "CONTRAST_BOOST" => Ok(PreprocessFlag::ContrastBoost),
            "UPSCALE" => Ok(PreprocessFlag::Upscale),
            "DENOISE" => Ok(PreprocessFlag::Denoise),
            "PROVIDER_DESKEW" => Ok(PreprocessFlag::ProviderDeskew),
            other => Err(format!("unknown preprocess flag '{}'", other)),
        }
    }
}

/// What to do for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipe {
    /// Write a derived asset with these pixel transforms.
    Transform(TransformOptions),
    /// Leave pixels alone and ask the provider to deskew.
    ProviderDeskew,
}

/// Escalating recipe: rotate, then enhance, then provider-side deskew.
pub fn recipe_for(attempt: u32, settings: &PreprocessingConfig) -> Recipe {
    let base = TransformOptions {
        auto_rotate: true,
        contrast: None,
        upscale: None,
        denoise_sigma: None,
        max_width: settings.max_width,
        max_height: settings.max_height,
    };

    match attempt {
        0 | 1 => Recipe::Transform(base),
        2 => Recipe::Transform(TransformOptions {
            contrast: Some(settings.contrast),
            upscale: Some(Upscale {
                max_factor: settings.max_upscale,
            }),
            denoise_sigma: (settings.denoise_sigma > 0.0).then_some(settings.denoise_sigma),
            ..base
        }),
        _ => Recipe::ProviderDeskew,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_only_rotates() {
        let Recipe::Transform(options) = recipe_for(1, &PreprocessingConfig::default()) else {
            panic!("expected transform");
        };
        assert!(options.auto_rotate);
        assert!(options.contrast.is_none());
        assert!(options.upscale.is_none());
        assert!(options.denoise_sigma.is_none());
    }

    #[test]
    fn test_second_attempt_enhances() {
        let settings = PreprocessingConfig::default();
        let Recipe::Transform(options) = recipe_for(2, &settings) else {
            panic!("expected transform");
        };
        assert!(options.auto_rotate);
        assert_eq!(options.contrast, Some(settings.contrast));
        assert_eq!(options.upscale, Some(Upscale { max_factor: 2.0 }));
        assert_eq!(options.max_width, 4000);
        assert!(options.denoise_sigma.is_some());
    }

    #[test]
    fn test_third_attempt_defers_to_provider() {
        assert_eq!(
            recipe_for(3, &PreprocessingConfig::default()),
            Recipe::ProviderDeskew
        );
    }

    #[test]
    fn test_flag_strings() {
        assert_eq!(
            "PROVIDER_DESKEW".parse::<PreprocessFlag>().unwrap(),
            PreprocessFlag::ProviderDeskew
        );
        let json = serde_json::to_string(&vec![PreprocessFlag::AutoRotate]).unwrap();
        assert_eq!(json, r#"["AUTO_ROTATE"]"#);
    }
}
