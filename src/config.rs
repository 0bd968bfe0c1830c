//! Persistable view settings.
//!
//! These are plain serde values a preferences layer stores and hands to the
//! core at call time. Missing fields take their defaults, so older settings
//! files keep loading as fields are added.

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::convert::{ChannelReduction, ConvertOptions};
use crate::error::{Error, Result};
use crate::format::PixelSpec;
use crate::profile::{ColorProfile, Exposure};

/// Gamma used when settings do not name one.
pub const DEFAULT_GAMMA: f64 = 2.2;

/// Which color profile a view uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ProfileKind {
    /// No transform.
    #[default]
    Raw,
    /// Power-law display gamma.
    Gamma,
    /// 1-D lookup table.
    Lut,
    /// Photographic exposure.
    Exposure,
}

/// Stored color-profile parameters.
///
/// All parameter sets are kept regardless of `kind` so switching profiles in
/// a viewer does not lose the others' values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    /// Active profile.
    pub kind: ProfileKind,
    /// Gamma value for [`ProfileKind::Gamma`].
    pub gamma: f64,
    /// Exposure parameters for [`ProfileKind::Exposure`].
    pub exposure: Exposure,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            kind: ProfileKind::Raw,
            gamma: DEFAULT_GAMMA,
            exposure: Exposure::default(),
        }
    }
}

impl ProfileSettings {
    /// Build and validate the active profile.
    ///
    /// `lut` is the already-decoded table, required for [`ProfileKind::Lut`]
    /// and ignored otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidProfile`] if the parameters fail
    /// [`ColorProfile::prepare`] or a LUT profile has no table.
    pub fn to_profile(&self, lut: Option<PixelBuffer>) -> Result<ColorProfile> {
        let profile = match self.kind {
            ProfileKind::Raw => ColorProfile::Raw,
            ProfileKind::Gamma => ColorProfile::gamma(self.gamma),
            ProfileKind::Exposure => ColorProfile::Exposure(self.exposure),
            ProfileKind::Lut => ColorProfile::Lut {
                table: lut.ok_or(Error::InvalidProfile("lookup table profile needs a table"))?,
            },
        };
        profile.prepare()?;
        Ok(profile)
    }

    /// Record `profile` as the active one, keeping other stored parameters.
    pub fn store(&mut self, profile: &ColorProfile) {
        self.kind = match profile {
            ColorProfile::Raw => ProfileKind::Raw,
            ColorProfile::Gamma { value } => {
                self.gamma = *value;
                ProfileKind::Gamma
            }
            ColorProfile::Lut { .. } => ProfileKind::Lut,
            ColorProfile::Exposure(e) => {
                self.exposure = *e;
                ProfileKind::Exposure
            }
        };
    }
}

/// Stored display-conversion preferences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertSettings {
    /// Spec the renderer wants, e.g. `"RGBA U8"`.
    pub target: PixelSpec,
    /// Opt-in for color to luminance reduction.
    pub channel_reduction: ChannelReduction,
    /// Renderer expects blue-first channel order.
    pub bgr: bool,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            target: PixelSpec::RGBA_U8,
            channel_reduction: ChannelReduction::Reject,
            bgr: false,
        }
    }
}

impl ConvertSettings {
    /// Converter options for these settings.
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions::new()
            .with_channel_reduction(self.channel_reduction)
            .with_bgr(self.bgr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = ProfileSettings::default();
        assert_eq!(p.kind, ProfileKind::Raw);
        assert_eq!(p.gamma, 2.2);
        assert_eq!(p.exposure, Exposure::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(p.to_profile(None).unwrap(), ColorProfile::Raw);

        let c = ConvertSettings::default();
        assert_eq!(c.target, PixelSpec::RGBA_U8);
        assert_eq!(c.options(), ConvertOptions::default());
    }

    #[test]
    fn builds_each_kind() {
        let mut p = ProfileSettings {
            kind: ProfileKind::Gamma,
            gamma: 1.8,
            ..Default::default()
        };
        assert_eq!(p.to_profile(None).unwrap(), ColorProfile::gamma(1.8));

        p.kind = ProfileKind::Exposure;
        p.exposure.stops = 1.5;
        assert!(matches!(
            p.to_profile(None).unwrap(),
            ColorProfile::Exposure(e) if e.stops == 1.5
        ));

        p.kind = ProfileKind::Lut;
        let table = PixelBuffer::gradient(16, 1).unwrap();
        assert!(matches!(
            p.to_profile(Some(table)).unwrap(),
            ColorProfile::Lut { .. }
        ));
    }

    #[test]
    fn lut_kind_needs_a_table() {
        let p = ProfileSettings {
            kind: ProfileKind::Lut,
            ..Default::default()
        };
        assert!(matches!(p.to_profile(None), Err(Error::InvalidProfile(_))));
    }

    #[test]
    fn invalid_gamma_is_reported() {
        let p = ProfileSettings {
            kind: ProfileKind::Gamma,
            gamma: 0.0,
            ..Default::default()
        };
        assert!(p.to_profile(None).is_err());
    }

    #[test]
    fn store_keeps_other_parameters() {
        let mut p = ProfileSettings::default();
        p.store(&ColorProfile::Exposure(Exposure::new(2.0, 0.0, 0.0, 0.0)));
        p.store(&ColorProfile::gamma(2.4));
        assert_eq!(p.kind, ProfileKind::Gamma);
        assert_eq!(p.gamma, 2.4);
        assert_eq!(p.exposure.stops, 2.0);
    }

    #[test]
    fn serde_round_trip() {
        let settings = ConvertSettings {
            target: PixelSpec::RGB_U10,
            channel_reduction: ChannelReduction::Luminance,
            bgr: true,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"RGB U10\""), "{json}");
        let back: ConvertSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);

        let profile = ProfileSettings {
            kind: ProfileKind::Exposure,
            gamma: 2.2,
            exposure: Exposure::new(1.0, 0.01, 0.5, 5.0),
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"exposure\""), "{json}");
        let back: ProfileSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let p: ProfileSettings = serde_json::from_str(r#"{"kind":"gamma"}"#).unwrap();
        assert_eq!(p.kind, ProfileKind::Gamma);
        assert_eq!(p.gamma, DEFAULT_GAMMA);

        let p: ProfileSettings =
            serde_json::from_str(r#"{"exposure":{"stops":-1.0}}"#).unwrap();
        assert_eq!(p.exposure, Exposure::new(-1.0, 0.0, 0.0, 0.0));

        let c: ConvertSettings = serde_json::from_str(r#"{"target":"la_f16"}"#).unwrap();
        assert_eq!(c.target, PixelSpec::LA_F16);
        assert!(!c.bgr);
    }

    #[test]
    fn illegal_target_fails_to_load() {
        assert!(serde_json::from_str::<ConvertSettings>(r#"{"target":"L U10"}"#).is_err());
        assert!(serde_json::from_str::<ConvertSettings>(r#"{"target":"CMYK U8"}"#).is_err());
    }
}
