use std::env;

/// Image provider connection settings.
#[derive(Debug, Clone, Default)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub generation_model: Option<String>,
    pub edit_model: Option<String>,
}

impl OpenAIConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY").ok();
        let base_url = env::var("OPENAI_BASE_URL").ok();
        let generation_model = env::var("OPENAI_IMAGE_MODEL").ok();
        let edit_model = env::var("OPENAI_EDIT_MODEL").ok();

        OpenAIConfig {
            api_key,
            base_url,
            generation_model,
            edit_model,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_models(
        mut self,
        generation_model: impl Into<String>,
        edit_model: impl Into<String>,
    ) -> Self {
        self.generation_model = Some(generation_model.into());
        self.edit_model = Some(edit_model.into());
        self
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub port: Option<u16>,
    pub openai: Option<OpenAIConfig>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());

        Config {
            port,
            openai: Some(OpenAIConfig::from_env()),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_openai(mut self, config: OpenAIConfig) -> Self {
        self.openai = Some(config);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_chain() {
        let config = Config::new()
            .with_port(8080)
            .with_openai(
                OpenAIConfig::new()
                    .with_api_key("sk-test")
                    .with_models("dall-e-3", "dall-e-2"),
            );

        assert_eq!(config.port, Some(8080));
        let openai = config.openai.unwrap();
        assert_eq!(openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(openai.generation_model.as_deref(), Some("dall-e-3"));
        assert_eq!(openai.edit_model.as_deref(), Some("dall-e-2"));
        assert!(openai.base_url.is_none());
    }

    #[test]
    fn defaults_are_empty() {
        let config = Config::new();
        assert!(config.port.is_none());
        assert!(config.openai.is_none());
    }
}
