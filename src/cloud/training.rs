//! Training job parameters
//!
//! Parsed from the `/submit` form. Empty or missing fields fall back to
//! defaults; the batch size also decides how many GPUs the job requests.

use serde::Deserialize;

use crate::error::{PanelError, Result};

/// Largest batch size a single job may request
pub const MAX_BATCH_SIZE: u32 = 128;

/// Raw training form as posted by the page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingForm {
    pub batch_size: Option<String>,
    pub learning_rate: Option<String>,
    pub num_steps: Option<String>,
    pub steps_per_summary: Option<String>,
    pub steps_per_save: Option<String>,
    pub early_stop_loss_value: Option<String>,
}

/// Validated training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    pub batch_size: u32,
    pub learning_rate: f64,
    pub num_steps: u32,
    pub steps_per_summary: u32,
    pub steps_per_save: u32,
    pub early_stop_loss_value: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            batch_size: 16,
            learning_rate: 0.001,
            num_steps: 30_000,
            steps_per_summary: 300,
            steps_per_save: 300,
            early_stop_loss_value: 5.0,
        }
    }
}

impl TrainingParams {
    /// Validate a submitted form
    pub fn from_form(form: &TrainingForm) -> Result<Self> {
        let defaults = Self::default();

        let params = Self {
            batch_size: field(&form.batch_size, "batch_size", defaults.batch_size)?,
            learning_rate: field(&form.learning_rate, "learning_rate", defaults.learning_rate)?,
            num_steps: field(&form.num_steps, "num_steps", defaults.num_steps)?,
            steps_per_summary: field(
                &form.steps_per_summary,
                "steps_per_summary",
                defaults.steps_per_summary,
            )?,
            steps_per_save: field(&form.steps_per_save, "steps_per_save", defaults.steps_per_save)?,
            early_stop_loss_value: field(
                &form.early_stop_loss_value,
                "early_stop_loss_value",
                defaults.early_stop_loss_value,
            )?,
        };

        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(PanelError::invalid_parameter(
                "batch_size",
                format!("must be between 1 and {}", MAX_BATCH_SIZE),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(PanelError::invalid_parameter("learning_rate", "must be positive"));
        }
        if self.num_steps == 0 {
            return Err(PanelError::invalid_parameter("num_steps", "must be positive"));
        }
        if self.steps_per_summary == 0 || self.steps_per_save == 0 {
            return Err(PanelError::invalid_parameter(
                "steps_per_save",
                "summary and save intervals must be positive",
            ));
        }
        if !(self.early_stop_loss_value >= 0.0 && self.early_stop_loss_value.is_finite()) {
            return Err(PanelError::invalid_parameter(
                "early_stop_loss_value",
                "must be non-negative",
            ));
        }
        Ok(())
    }

    /// Machine profile sized for this batch
    pub fn machine_profile(&self) -> MachineProfile {
        MachineProfile::for_batch_size(self.batch_size)
    }

    /// Arguments passed to the training container entrypoint
    pub fn container_args(&self, bucket: &str) -> Vec<String> {
        vec![
            format!("--save_dir={}/model", bucket),
            format!("--file_pattern={}/preprocessed/train.tfrecord*", bucket),
            format!("--batch_size={}", self.batch_size),
            format!("--learning_rate={}", self.learning_rate),
            format!("--num_steps={}", self.num_steps),
            format!("--steps_per_summary={}", self.steps_per_summary),
            format!("--steps_per_save={}", self.steps_per_save),
            format!("--early_stop_loss_value={}", self.early_stop_loss_value),
        ]
    }
}

fn field<T: std::str::FromStr>(raw: &Option<String>, name: &str, default: T) -> Result<T> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| PanelError::invalid_parameter(name, format!("'{}' is not a number", value))),
    }
}

/// Master machine and accelerators for a training job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineProfile {
    pub machine_type: &'static str,
    pub gpu_count: u32,
}

impl MachineProfile {
    /// GPU type requested for every profile
    pub const GPU_TYPE: &'static str = "nvidia-tesla-v100";

    /// One V100 per 16 samples, rounded up to a supported count
    pub fn for_batch_size(batch_size: u32) -> Self {
        match batch_size {
            0..=16 => Self { machine_type: "n1-highmem-8", gpu_count: 1 },
            17..=32 => Self { machine_type: "n1-highmem-16", gpu_count: 2 },
            33..=64 => Self { machine_type: "n1-highmem-32", gpu_count: 4 },
            _ => Self { machine_type: "n1-highmem-64", gpu_count: 8 },
        }
    }

    /// Value for `--master-accelerator`
    pub fn accelerator_arg(&self) -> String {
        format!("count={},type={}", self.gpu_count, Self::GPU_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(batch: &str, lr: &str) -> TrainingForm {
        TrainingForm {
            batch_size: Some(batch.to_string()),
            learning_rate: Some(lr.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_form_uses_defaults() {
        let params = TrainingParams::from_form(&TrainingForm::default()).unwrap();
        assert_eq!(params, TrainingParams::default());

        let params = TrainingParams::from_form(&form("", " ")).unwrap();
        assert_eq!(params, TrainingParams::default());
    }

    #[test]
    fn test_parses_values() {
        let params = TrainingParams::from_form(&form("32", "0.0003")).unwrap();
        assert_eq!(params.batch_size, 32);
        assert!((params.learning_rate - 0.0003).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(TrainingParams::from_form(&form("abc", "")).is_err());
        assert!(TrainingParams::from_form(&form("0", "")).is_err());
        assert!(TrainingParams::from_form(&form("256", "")).is_err());
        assert!(TrainingParams::from_form(&form("16", "-1")).is_err());

        let err = TrainingParams::from_form(&form("x", "")).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_machine_profile() {
        assert_eq!(MachineProfile::for_batch_size(8).gpu_count, 1);
        assert_eq!(MachineProfile::for_batch_size(16).gpu_count, 1);
        assert_eq!(MachineProfile::for_batch_size(17).gpu_count, 2);
        assert_eq!(MachineProfile::for_batch_size(64).gpu_count, 4);
        assert_eq!(MachineProfile::for_batch_size(128).gpu_count, 8);
        assert_eq!(
            MachineProfile::for_batch_size(32).accelerator_arg(),
            "count=2,type=nvidia-tesla-v100"
        );
    }

    #[test]
    fn test_container_args() {
        let args = TrainingParams::default().container_args("gs://b");
        assert!(args.contains(&"--save_dir=gs://b/model".to_string()));
        assert!(args.contains(&"--file_pattern=gs://b/preprocessed/train.tfrecord*".to_string()));
        assert!(args.contains(&"--batch_size=16".to_string()));
    }
}
