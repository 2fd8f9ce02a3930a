//! In-process generator building the gateway document from environment
//! variables.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{process_env, write_atomic, ConfigGenerator, EnvSnapshot, GenerateError};
use crate::config::GeneratorConfig;

pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const AI_GATEWAY_API_KEY: &str = "CLOUDFLARE_AI_GATEWAY_API_KEY";
pub const GATEWAY_TOKEN: &str = "OPENCLAW_GATEWAY_TOKEN";
pub const DEV_MODE: &str = "OPENCLAW_DEV_MODE";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_DM_POLICY: &str = "TELEGRAM_DM_POLICY";
pub const TELEGRAM_DM_ALLOW_FROM: &str = "TELEGRAM_DM_ALLOW_FROM";

/// Provider API key, preferring the direct key over the AI gateway key.
pub fn provider_api_key(env: &EnvSnapshot) -> Option<&str> {
    non_empty(env, GOOGLE_API_KEY).or_else(|| non_empty(env, AI_GATEWAY_API_KEY))
}

fn non_empty<'a>(env: &'a EnvSnapshot, key: &str) -> Option<&'a str> {
    env.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

pub struct BuiltinGenerator {
    config: GeneratorConfig,
    gateway_port: u16,
    env: Option<EnvSnapshot>,
}

impl BuiltinGenerator {
    pub fn new(config: GeneratorConfig, gateway_port: u16) -> Self {
        Self {
            config,
            gateway_port,
            env: None,
        }
    }

    /// Use a fixed environment instead of reading the process environment.
    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// Build the gateway document for the given environment.
    pub fn build_document(&self, env: &EnvSnapshot) -> Value {
        let mut primary = Map::new();
        primary.insert("id".into(), json!("main"));
        primary.insert("provider".into(), json!("google"));
        primary.insert("model".into(), json!(self.config.model));
        if let Some(key) = provider_api_key(env) {
            primary.insert("apiKey".into(), json!(key));
        }
        primary.insert(
            "params".into(),
            json!({ "temperature": 0.7, "contextWindow": 16384, "maxTokens": 8192 }),
        );

        let mut auth = Map::new();
        if let Some(token) = non_empty(env, GATEWAY_TOKEN) {
            auth.insert("token".into(), json!(token));
        }

        let mut gateway = Map::new();
        gateway.insert("port".into(), json!(self.gateway_port));
        gateway.insert("mode".into(), json!("local"));
        gateway.insert("trustedProxies".into(), json!(self.config.trusted_proxies));
        gateway.insert("auth".into(), Value::Object(auth));
        if env.get(DEV_MODE).map(String::as_str) == Some("true") {
            gateway.insert("controlUi".into(), json!({ "allowInsecureAuth": true }));
        }

        let mut channels = Map::new();
        if let Some(telegram) = telegram_channel(env) {
            channels.insert("telegram".into(), telegram);
        }

        json!({
            "gateways": [Value::Object(primary)],
            "gateway": Value::Object(gateway),
            "channels": Value::Object(channels),
            "agents": [{
                "id": "main",
                "name": self.config.agent_name,
                "role": self.config.agent_role,
                "gateway": "main",
            }],
        })
    }
}

fn telegram_channel(env: &EnvSnapshot) -> Option<Value> {
    let token = non_empty(env, TELEGRAM_BOT_TOKEN)?;
    let policy = non_empty(env, TELEGRAM_DM_POLICY).unwrap_or("pairing");

    let mut channel = Map::new();
    channel.insert("botToken".into(), json!(token));
    channel.insert("enabled".into(), json!(true));
    channel.insert("dmPolicy".into(), json!(policy));

    if policy == "open" {
        channel.insert("allowFrom".into(), json!(["*"]));
    } else if let Some(allow) = non_empty(env, TELEGRAM_DM_ALLOW_FROM) {
        let ids: Vec<&str> = allow.split(',').collect();
        channel.insert("allowFrom".into(), json!(ids));
    }

    Some(Value::Object(channel))
}

#[async_trait]
impl ConfigGenerator for BuiltinGenerator {
    async fn generate(&self) -> Result<(), GenerateError> {
        let captured;
        let env = match &self.env {
            Some(env) => env,
            None => {
                captured = process_env();
                &captured
            }
        };

        tracing::info!(
            google_api_key = env.contains_key(GOOGLE_API_KEY),
            ai_gateway_api_key = env.contains_key(AI_GATEWAY_API_KEY),
            telegram = env.contains_key(TELEGRAM_BOT_TOKEN),
            "Generating gateway configuration"
        );

        let document = self.build_document(env);
        let rendered = serde_json::to_vec_pretty(&document)?;
        write_atomic(&self.config.output_path, &rendered).await?;

        tracing::info!(path = %self.config.output_path.display(), "Gateway configuration written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn generator() -> BuiltinGenerator {
        BuiltinGenerator::new(GeneratorConfig::default(), 3001)
    }

    #[test]
    fn minimal_document_without_secrets() {
        let doc = generator().build_document(&EnvSnapshot::new());

        assert_eq!(doc["gateway"]["port"], 3001);
        assert_eq!(doc["gateway"]["mode"], "local");
        assert_eq!(doc["gateway"]["trustedProxies"], json!(["10.1.0.0"]));
        assert_eq!(doc["gateway"]["auth"], json!({}));
        assert!(doc["gateway"].get("controlUi").is_none());
        assert!(doc["gateways"][0].get("apiKey").is_none());
        assert_eq!(doc["gateways"][0]["model"], "gemini-2.5-flash");
        assert_eq!(doc["channels"], json!({}));
        assert_eq!(doc["agents"][0]["gateway"], "main");
    }

    #[test]
    fn ai_gateway_key_is_fallback() {
        let doc = generator().build_document(&env(&[(AI_GATEWAY_API_KEY, "cf-key")]));
        assert_eq!(doc["gateways"][0]["apiKey"], "cf-key");

        let doc = generator().build_document(&env(&[
            (AI_GATEWAY_API_KEY, "cf-key"),
            (GOOGLE_API_KEY, "g-key"),
        ]));
        assert_eq!(doc["gateways"][0]["apiKey"], "g-key");
    }

    #[test]
    fn token_and_dev_mode() {
        let doc = generator().build_document(&env(&[
            (GATEWAY_TOKEN, "secret"),
            (DEV_MODE, "true"),
        ]));
        assert_eq!(doc["gateway"]["auth"]["token"], "secret");
        assert_eq!(doc["gateway"]["controlUi"]["allowInsecureAuth"], true);
    }

    #[test]
    fn telegram_pairing_with_allow_list() {
        let doc = generator().build_document(&env(&[
            (TELEGRAM_BOT_TOKEN, "bot"),
            (TELEGRAM_DM_ALLOW_FROM, "111,222"),
        ]));
        let telegram = &doc["channels"]["telegram"];
        assert_eq!(telegram["dmPolicy"], "pairing");
        assert_eq!(telegram["allowFrom"], json!(["111", "222"]));
    }

    #[test]
    fn telegram_open_policy_allows_everyone() {
        let doc = generator().build_document(&env(&[
            (TELEGRAM_BOT_TOKEN, "bot"),
            (TELEGRAM_DM_POLICY, "open"),
            (TELEGRAM_DM_ALLOW_FROM, "111"),
        ]));
        assert_eq!(doc["channels"]["telegram"]["allowFrom"], json!(["*"]));
    }

    #[tokio::test]
    async fn generate_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            output_path: dir.path().join("openclaw/openclaw.json"),
            ..GeneratorConfig::default()
        };
        let generator = BuiltinGenerator::new(config.clone(), 4001)
            .with_env(env(&[(GOOGLE_API_KEY, "g-key")]));

        generator.generate().await.unwrap();

        let written = std::fs::read_to_string(&config.output_path).unwrap();
        assert!(written.contains('\n'));
        let doc: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(doc["gateway"]["port"], 4001);
        assert_eq!(doc["gateways"][0]["apiKey"], "g-key");
    }
}
