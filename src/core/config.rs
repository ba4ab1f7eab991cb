use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_model: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    // When unset the grammar bundled with the binary is used
    pub grammar_path: Option<String>,
    pub grammar_version: String,
    pub greeting: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let openai_api_hostname =
            env::var("UIDL_LLM_HOST").unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("UIDL_LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());
        let grammar_path = env::var("UIDL_GRAMMAR_PATH").ok();
        let grammar_version =
            env::var("UIDL_GRAMMAR_VERSION").unwrap_or_else(|_| "1.0.0".to_string());
        let greeting = env::var("UIDL_GREETING").unwrap_or_else(|_| "我是UIDL机器人".to_string());

        Self {
            openai_api_hostname,
            openai_api_key,
            openai_model,
            grammar_path,
            grammar_version,
            greeting,
        }
    }
}
