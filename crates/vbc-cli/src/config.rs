use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vbc_core::models::contract::ContractParams;
use vbc_core::models::dataset::DatasetKind;
use vbc_metrics::AnalysisSettings;
use vbc_orchestrator::RetryPolicy;
use vbc_validation::Thresholds;

/// Current config version. Bump this when changing shape, and add the
/// transform from the previous version to [`migrate`].
pub const CURRENT_VERSION: u32 = 1;

pub const CONFIG_FILE: &str = "vbc.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VbcConfig {
    /// Schema version. A file without one is taken as current.
    #[serde(default = "current_version")]
    pub config_version: u32,
    /// Root of the on-disk extracts read by the file data source.
    pub data_dir: PathBuf,
    /// Rendered artifacts are copied to `{output_dir}/{workflow_id}/`.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default = "default_renderers")]
    pub renderers: Vec<String>,
    #[serde(default)]
    pub contracts: BTreeMap<String, ContractParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    Local {
        dir: PathBuf,
    },
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        region: Option<String>,
        /// S3-compatible endpoint instead of AWS.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        endpoint_url: Option<String>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Local {
            dir: PathBuf::from(".vbc/state"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Expected record counts; the volume rule only runs for listed collections.
    #[serde(default)]
    pub expected_volumes: BTreeMap<DatasetKind, usize>,
}

fn current_version() -> u32 {
    CURRENT_VERSION
}

fn default_renderers() -> Vec<String> {
    vec!["json".to_string(), "summary".to_string()]
}

impl Default for VbcConfig {
    fn default() -> Self {
        let mut contracts = BTreeMap::new();
        let sample = ContractParams::new("ACO-SAMPLE", 72_000_000.0);
        contracts.insert(sample.contract_id.clone(), sample);

        Self {
            config_version: CURRENT_VERSION,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("reports"),
            store: StoreConfig::default(),
            retry: RetryPolicy::default(),
            validation: ValidationConfig::default(),
            analysis: AnalysisSettings::default(),
            renderers: default_renderers(),
            contracts,
        }
    }
}

/// `vbc.json` in the working directory if present, else the user config dir.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|base| base.join("vbc").join(CONFIG_FILE))
        .unwrap_or(local)
}

pub fn load_config(path: &Path) -> eyre::Result<VbcConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = match json.get("config_version") {
        None => CURRENT_VERSION,
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| eyre::eyre!("config_version must be a positive integer, got {v}"))?,
    };

    let migrated = migrate(json, on_disk_version)?;
    let config: VbcConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Bring a raw config from `from_version` up to [`CURRENT_VERSION`].
///
/// Version 1 is the first released shape, so there is nothing to transform
/// yet; this only refuses versions this build does not know.
pub fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update vbc."
        ));
    }
    if from_version == 0 {
        return Err(eyre::eyre!("config_version 0 is not a known version"));
    }

    let obj = json
        .as_object_mut()
        .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
    obj.insert("config_version".to_string(), CURRENT_VERSION.into());
    Ok(json)
}

pub fn save_config(path: &Path, config: &VbcConfig) -> eyre::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;
    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("config path {} has no file name", path.display()))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = dir.join(tmp_name);
    std::fs::write(&tmp_path, json.as_bytes())?;
    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
