use crate::storage::{KeyValueStore, StorageResult};

pub const MODEL_KEY: &str = "calavera_model";
pub const MODEL_LABEL_KEY: &str = "calavera_model_label";
pub const PERSONALITY_KEY: &str = "calavera_personality";
pub const PERSONALITY_LABEL_KEY: &str = "calavera_personality_label";
pub const AUTO_CLEAR_KEY: &str = "calavera_auto_clear";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelOption {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub supports_images: bool,
}

pub const MODELS: &[ModelOption] = &[
    ModelOption {
        id: "gemini",
        label: "Gemini 2.5 Flash",
        description: "Fast, multimodal, reads images and documents",
        supports_images: true,
    },
    ModelOption {
        id: "groq",
        label: "Llama 3.3 70B",
        description: "Open model served by Groq",
        supports_images: true,
    },
    ModelOption {
        id: "mistral",
        label: "Mistral Large",
        description: "Strong reasoning and writing",
        supports_images: true,
    },
    ModelOption {
        id: "deepseek",
        label: "DeepSeek V3",
        description: "Text only, no image analysis",
        supports_images: false,
    },
];

pub fn default_model() -> &'static ModelOption {
    &MODELS[0]
}

/// Unknown ids are treated as image-capable, matching the backend's default.
pub fn model_supports_images(id: &str) -> bool {
    find_model(id).is_none_or(|model| model.supports_images)
}

pub fn find_model(id: &str) -> Option<&'static ModelOption> {
    MODELS.iter().find(|model| model.id == id)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersonalityOption {
    /// Sent verbatim to the backend as the `personality` field.
    pub value: &'static str,
    pub label: &'static str,
}

pub const CUSTOM_PERSONALITY_LABEL: &str = "Custom";

pub const PERSONALITIES: &[PersonalityOption] = &[
    PersonalityOption {
        value: "",
        label: "Default",
    },
    PersonalityOption {
        value: "Warm, casual and encouraging, like a smart classmate.",
        label: "Friendly",
    },
    PersonalityOption {
        value: "Formal, precise and concise.",
        label: "Professional",
    },
    PersonalityOption {
        value: "Patient teacher who explains step by step with examples.",
        label: "Tutor",
    },
    PersonalityOption {
        value: "Playful and witty, still accurate.",
        label: "Funny",
    },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preferences {
    pub model: String,
    pub model_label: String,
    pub personality: String,
    pub personality_label: String,
    pub auto_clear: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            model: default_model().id.to_string(),
            model_label: default_model().label.to_string(),
            personality: String::new(),
            personality_label: PERSONALITIES[0].label.to_string(),
            auto_clear: true,
        }
    }
}

impl Preferences {
    /// Reads saved preferences. First run persists auto-clear as enabled.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();

        let (model, model_label) = match (store.get(MODEL_KEY), store.get(MODEL_LABEL_KEY)) {
            (Some(model), Some(label)) => (model, label),
            _ => (defaults.model, defaults.model_label),
        };
        let (personality, personality_label) =
            match (store.get(PERSONALITY_KEY), store.get(PERSONALITY_LABEL_KEY)) {
                (Some(value), Some(label)) => (value, label),
                _ => (defaults.personality, defaults.personality_label),
            };

        let auto_clear = match store.get(AUTO_CLEAR_KEY) {
            Some(saved) => saved.trim() == "true",
            None => {
                if let Err(err) = store.set(AUTO_CLEAR_KEY, "true") {
                    tracing::warn!(%err, "failed to persist auto-clear default");
                }
                tracing::info!("new user detected, auto-clear enabled by default");
                true
            }
        };

        Self {
            model,
            model_label,
            personality,
            personality_label,
            auto_clear,
        }
    }

    pub fn save_model(&self, store: &dyn KeyValueStore) -> StorageResult<()> {
        store.set(MODEL_KEY, &self.model)?;
        store.set(MODEL_LABEL_KEY, &self.model_label)
    }

    pub fn save_personality(&self, store: &dyn KeyValueStore) -> StorageResult<()> {
        store.set(PERSONALITY_KEY, &self.personality)?;
        store.set(PERSONALITY_LABEL_KEY, &self.personality_label)
    }

    pub fn save_auto_clear(&self, store: &dyn KeyValueStore) -> StorageResult<()> {
        store.set(AUTO_CLEAR_KEY, if self.auto_clear { "true" } else { "false" })
    }

    pub fn supports_images(&self) -> bool {
        model_supports_images(&self.model)
    }

    pub fn is_custom_personality(&self) -> bool {
        self.personality_label == CUSTOM_PERSONALITY_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_first_load_enables_auto_clear() {
        let store = MemoryStore::new();
        let prefs = Preferences::load(&store);
        assert_eq!(prefs, Preferences::default());
        assert_eq!(store.get(AUTO_CLEAR_KEY), Some("true".to_string()));
    }

    #[test]
    fn test_saved_values_are_restored() {
        let store = MemoryStore::new();
        let prefs = Preferences {
            model: "deepseek".to_string(),
            model_label: "DeepSeek V3".to_string(),
            personality: "Be brief.".to_string(),
            personality_label: CUSTOM_PERSONALITY_LABEL.to_string(),
            auto_clear: false,
        };
        prefs.save_model(&store).unwrap();
        prefs.save_personality(&store).unwrap();
        prefs.save_auto_clear(&store).unwrap();

        let loaded = Preferences::load(&store);
        assert_eq!(loaded, prefs);
        assert!(!loaded.supports_images());
        assert!(loaded.is_custom_personality());
    }

    #[test]
    fn test_model_without_label_falls_back() {
        let store = MemoryStore::new();
        store.set(MODEL_KEY, "groq").unwrap();
        assert_eq!(Preferences::load(&store).model, "gemini");
    }

    #[test]
    fn test_capabilities() {
        assert!(model_supports_images("gemini"));
        assert!(!model_supports_images("deepseek"));
        assert!(model_supports_images("unknown"));
    }
}
