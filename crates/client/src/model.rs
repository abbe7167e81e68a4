use snafu::ensure;

use crate::api::{CustomModel, CustomModelDraft, ModelInfo, ModelKind};
use crate::error::{ClientResult, InvalidCustomModelSnafu};

const PROMPT_PREVIEW_CHARS: usize = 100;

/// Models offered by the server, split the way the selector groups them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelCatalog {
    pub base: Vec<ModelInfo>,
    pub custom: Vec<ModelInfo>,
}

impl ModelCatalog {
    pub fn from_models(models: Vec<ModelInfo>) -> Self {
        let (base, custom) = models
            .into_iter()
            .partition(|model| model.kind == ModelKind::Base);
        Self { base, custom }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.custom.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|model| model.name == name)
    }

    /// Base models first, then custom ones.
    pub fn iter(&self) -> impl Iterator<Item = &ModelInfo> {
        self.base.iter().chain(self.custom.iter())
    }
}

impl ModelInfo {
    /// Selector label: size for base models, lineage for custom ones.
    pub fn label(&self) -> String {
        match self.kind {
            ModelKind::Base => match &self.size {
                Some(size) => format!("{} ({size})", self.name),
                None => self.name.clone(),
            },
            ModelKind::Custom => match &self.base_model {
                Some(base_model) => format!("{} (based on {base_model})", self.name),
                None => self.name.clone(),
            },
        }
    }
}

impl CustomModel {
    pub fn prompt_preview(&self) -> String {
        if self.system_prompt.chars().count() <= PROMPT_PREVIEW_CHARS {
            return self.system_prompt.clone();
        }
        let mut preview = self
            .system_prompt
            .chars()
            .take(PROMPT_PREVIEW_CHARS)
            .collect::<String>();
        preview.push_str("...");
        preview
    }
}

impl CustomModelDraft {
    pub fn new(
        name: impl Into<String>,
        base_model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_model: base_model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Trims every field and requires all of them.
    pub fn validated(self) -> ClientResult<Self> {
        let draft = Self {
            name: self.name.trim().to_string(),
            base_model: self.base_model.trim().to_string(),
            system_prompt: self.system_prompt.trim().to_string(),
        };
        ensure!(
            !draft.name.is_empty()
                && !draft.base_model.is_empty()
                && !draft.system_prompt.is_empty(),
            InvalidCustomModelSnafu {
                stage: "validate-custom-model",
                details: "Please fill all fields",
            }
        );
        Ok(draft)
    }
}
