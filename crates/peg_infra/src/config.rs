//! Controller configuration with built-in defaults.
//!
//! Every tunable has a default. A configuration file only names the values it
//! overrides; the resolved set is validated as a whole before use, so a file
//! can never install a parameter set the controller itself would reject.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use peg_core::policy::PRICE_SCALE;
use peg_core::{
    AccountId, MarketOracle, ParameterSet, PegControllerBuilder, ReferenceOracle, TokenLedger,
    ValidationError,
};

/// Account name used when the file does not set one.
pub const DEFAULT_ACCOUNT: &str = "peg-controller";

/// Every configurable controller parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerParam {
    // Response thresholds
    SmallThresholdBp,
    MediumThresholdBp,
    LargeThresholdBp,
    ExtremeThresholdBp,

    // Base adjustment rates
    SmallRateBp,
    MediumRateBp,
    LargeRateBp,

    // Cooldown bounds
    MinCooldownS,
    MaxCooldownS,

    // Daily budget
    DailyCapBp,

    // Peg target (8 decimals)
    TargetPrice,
}

/// Error while loading or resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    Io { path: String, reason: String },
    /// The file is not a valid overrides document.
    Parse { reason: String },
    /// A value does not fit the parameter's type or domain.
    OutOfRange { param_name: &'static str, value: u64 },
    /// The resolved parameter set violates a controller rule.
    Invalid(ValidationError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "failed to read config {path}: {reason}"),
            Self::Parse { reason } => write!(f, "invalid config: {reason}"),
            Self::OutOfRange { param_name, value } => {
                write!(f, "config '{param_name}' has out-of-range value {value}")
            }
            Self::Invalid(err) => write!(f, "config rejected: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        Self::Invalid(err)
    }
}

/// Built-in default for a parameter.
pub fn param_default(param: ControllerParam) -> u64 {
    match param {
        ControllerParam::SmallThresholdBp => 50,
        ControllerParam::MediumThresholdBp => 200,
        ControllerParam::LargeThresholdBp => 500,
        ControllerParam::ExtremeThresholdBp => 1_000,

        ControllerParam::SmallRateBp => 10,
        ControllerParam::MediumRateBp => 50,
        ControllerParam::LargeRateBp => 100,

        ControllerParam::MinCooldownS => 3_600,
        ControllerParam::MaxCooldownS => 43_200,

        ControllerParam::DailyCapBp => 200,

        ControllerParam::TargetPrice => 100_000_000,
    }
}

/// snake_case key used in configuration files.
pub fn param_name(param: ControllerParam) -> &'static str {
    match param {
        ControllerParam::SmallThresholdBp => "small_threshold_bp",
        ControllerParam::MediumThresholdBp => "medium_threshold_bp",
        ControllerParam::LargeThresholdBp => "large_threshold_bp",
        ControllerParam::ExtremeThresholdBp => "extreme_threshold_bp",
        ControllerParam::SmallRateBp => "small_rate_bp",
        ControllerParam::MediumRateBp => "medium_rate_bp",
        ControllerParam::LargeRateBp => "large_rate_bp",
        ControllerParam::MinCooldownS => "min_cooldown_s",
        ControllerParam::MaxCooldownS => "max_cooldown_s",
        ControllerParam::DailyCapBp => "daily_cap_bp",
        ControllerParam::TargetPrice => "target_price",
    }
}

/// Expected number of `ControllerParam` variants. Bump with every new variant.
pub const EXPECTED_PARAM_COUNT: usize = 11;

/// All known `ControllerParam` variants.
pub const ALL_PARAMS: &[ControllerParam] = &[
    ControllerParam::SmallThresholdBp,
    ControllerParam::MediumThresholdBp,
    ControllerParam::LargeThresholdBp,
    ControllerParam::ExtremeThresholdBp,
    ControllerParam::SmallRateBp,
    ControllerParam::MediumRateBp,
    ControllerParam::LargeRateBp,
    ControllerParam::MinCooldownS,
    ControllerParam::MaxCooldownS,
    ControllerParam::DailyCapBp,
    ControllerParam::TargetPrice,
];

/// Explicit value if present, otherwise the built-in default.
pub fn resolve_param_value(param: ControllerParam, value: Option<u64>) -> u64 {
    value.unwrap_or_else(|| param_default(param))
}

/// Values named by a configuration file. Absent keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_threshold_bp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium_threshold_bp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold_bp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extreme_threshold_bp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_rate_bp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium_rate_bp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_rate_bp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cooldown_s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cooldown_s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_cap_bp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl ParameterOverrides {
    /// Overrides that pin every parameter of `params`.
    pub fn from_params(params: &ParameterSet) -> Self {
        Self {
            small_threshold_bp: Some(u64::from(params.small_threshold_bp)),
            medium_threshold_bp: Some(u64::from(params.medium_threshold_bp)),
            large_threshold_bp: Some(u64::from(params.large_threshold_bp)),
            extreme_threshold_bp: Some(u64::from(params.extreme_threshold_bp)),
            small_rate_bp: Some(u64::from(params.small_rate_bp)),
            medium_rate_bp: Some(u64::from(params.medium_rate_bp)),
            large_rate_bp: Some(u64::from(params.large_rate_bp)),
            min_cooldown_s: Some(params.min_cooldown_s),
            max_cooldown_s: Some(params.max_cooldown_s),
            daily_cap_bp: Some(u64::from(params.daily_cap_bp)),
            target_price: None,
            account: None,
        }
    }

    pub fn get(&self, param: ControllerParam) -> Option<u64> {
        match param {
            ControllerParam::SmallThresholdBp => self.small_threshold_bp,
            ControllerParam::MediumThresholdBp => self.medium_threshold_bp,
            ControllerParam::LargeThresholdBp => self.large_threshold_bp,
            ControllerParam::ExtremeThresholdBp => self.extreme_threshold_bp,
            ControllerParam::SmallRateBp => self.small_rate_bp,
            ControllerParam::MediumRateBp => self.medium_rate_bp,
            ControllerParam::LargeRateBp => self.large_rate_bp,
            ControllerParam::MinCooldownS => self.min_cooldown_s,
            ControllerParam::MaxCooldownS => self.max_cooldown_s,
            ControllerParam::DailyCapBp => self.daily_cap_bp,
            ControllerParam::TargetPrice => self.target_price,
        }
    }

    fn resolve_bp(&self, param: ControllerParam) -> Result<u32, ConfigError> {
        let value = resolve_param_value(param, self.get(param));
        u32::try_from(value).map_err(|_| ConfigError::OutOfRange {
            param_name: param_name(param),
            value,
        })
    }

    /// Parameter set with defaults filled in, validated.
    pub fn resolve_parameters(&self) -> Result<ParameterSet, ConfigError> {
        let params = ParameterSet {
            small_threshold_bp: self.resolve_bp(ControllerParam::SmallThresholdBp)?,
            medium_threshold_bp: self.resolve_bp(ControllerParam::MediumThresholdBp)?,
            large_threshold_bp: self.resolve_bp(ControllerParam::LargeThresholdBp)?,
            extreme_threshold_bp: self.resolve_bp(ControllerParam::ExtremeThresholdBp)?,
            small_rate_bp: self.resolve_bp(ControllerParam::SmallRateBp)?,
            medium_rate_bp: self.resolve_bp(ControllerParam::MediumRateBp)?,
            large_rate_bp: self.resolve_bp(ControllerParam::LargeRateBp)?,
            min_cooldown_s: resolve_param_value(
                ControllerParam::MinCooldownS,
                self.min_cooldown_s,
            ),
            max_cooldown_s: resolve_param_value(
                ControllerParam::MaxCooldownS,
                self.max_cooldown_s,
            ),
            daily_cap_bp: self.resolve_bp(ControllerParam::DailyCapBp)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Everything needed to construct a controller apart from its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub params: ParameterSet,
    /// Nominal peg target, 8 decimals.
    pub target_price: u128,
    pub account: AccountId,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            params: ParameterSet::default(),
            target_price: PRICE_SCALE,
            account: AccountId::new(DEFAULT_ACCOUNT),
        }
    }
}

impl ControllerSettings {
    pub fn from_overrides(overrides: &ParameterOverrides) -> Result<Self, ConfigError> {
        let params = overrides.resolve_parameters()?;
        let target_price =
            resolve_param_value(ControllerParam::TargetPrice, overrides.target_price);
        if target_price == 0 {
            return Err(ConfigError::OutOfRange {
                param_name: param_name(ControllerParam::TargetPrice),
                value: target_price,
            });
        }
        let account = overrides
            .account
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ACCOUNT);

        Ok(Self {
            params,
            target_price: u128::from(target_price),
            account: AccountId::new(account),
        })
    }

    /// Builder pre-loaded with these settings.
    pub fn builder(
        &self,
        market: Arc<dyn MarketOracle>,
        reference: Arc<dyn ReferenceOracle>,
        ledger: Arc<dyn TokenLedger>,
    ) -> PegControllerBuilder {
        PegControllerBuilder::new(market, reference, ledger)
            .params(self.params)
            .target_price(self.target_price)
            .account(self.account.clone())
    }
}

/// Parse an overrides document.
pub fn parse_overrides(raw: &str) -> Result<ParameterOverrides, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Parse {
        reason: e.to_string(),
    })
}

/// Load and resolve settings from a JSON file.
pub fn load_settings_from_path(path: impl AsRef<Path>) -> Result<ControllerSettings, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let overrides = parse_overrides(&raw)?;
    let settings = ControllerSettings::from_overrides(&overrides)?;
    tracing::info!(
        path = %path.display(),
        target_price = %settings.target_price,
        account = %settings.account,
        "controller settings loaded"
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_parameter_set() {
        let resolved = ParameterOverrides::default().resolve_parameters().unwrap();
        assert_eq!(resolved, ParameterSet::default());
        assert_eq!(
            u128::from(param_default(ControllerParam::TargetPrice)),
            PRICE_SCALE
        );
    }

    #[test]
    fn all_params_have_names() {
        for &param in ALL_PARAMS {
            assert!(
                !param_name(param).is_empty(),
                "ControllerParam::{param:?} has empty name"
            );
        }
    }

    #[test]
    fn all_params_listed_in_constant() {
        assert_eq!(
            ALL_PARAMS.len(),
            EXPECTED_PARAM_COUNT,
            "ALL_PARAMS length ({}) != EXPECTED_PARAM_COUNT ({})",
            ALL_PARAMS.len(),
            EXPECTED_PARAM_COUNT,
        );
        let mut names: Vec<&str> = ALL_PARAMS.iter().map(|&p| param_name(p)).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ALL_PARAMS.len(), "ALL_PARAMS has duplicate entries");
    }

    #[test]
    fn overrides_round_trip_through_params() {
        let params = ParameterSet {
            small_rate_bp: 25,
            daily_cap_bp: 400,
            ..ParameterSet::default()
        };
        let overrides = ParameterOverrides::from_params(&params);
        for &param in ALL_PARAMS {
            if param != ControllerParam::TargetPrice {
                assert!(overrides.get(param).is_some(), "{}", param_name(param));
            }
        }
        assert_eq!(overrides.resolve_parameters().unwrap(), params);
    }

    #[test]
    fn bp_values_wider_than_u32_are_out_of_range() {
        let overrides = ParameterOverrides {
            small_rate_bp: Some(u64::from(u32::MAX) + 1),
            ..ParameterOverrides::default()
        };
        assert_eq!(
            overrides.resolve_parameters(),
            Err(ConfigError::OutOfRange {
                param_name: "small_rate_bp",
                value: u64::from(u32::MAX) + 1,
            })
        );
    }
}
