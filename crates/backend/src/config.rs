//! Effective configuration and protocol mapping
//!
//! An `EffectiveConfig` is the merge of the gateway's base provider settings
//! with one pool record's credential fields (record fields win). The credential
//! fields are an open JSON mapping: the core only interprets a handful of
//! well-known keys (`apiKey`, `baseUrl`, `proxyUrl`) and passes everything
//! else through to the backend implementation untouched.

use serde_json::{Map, Value};

/// Wire protocol family for a provider type.
///
/// Determines the canonical request shape, the endpoint path, and the auth
/// header convention. Unknown provider types default to OpenAI-style chat,
/// which is the de-facto compatibility surface for third-party endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    /// `messages[]` + `model` body, `POST /v1/chat/completions`, Bearer auth
    OpenAiChat,
    /// `input[]` + `model` body, `POST /v1/responses`, Bearer auth
    OpenAiResponses,
    /// `messages[]` + `model` body, `POST /v1/messages`, x-api-key auth
    Claude,
    /// `contents[]` body, `POST /v1beta/models/{model}:generateContent`,
    /// x-goog-api-key auth
    Gemini,
}

impl ProtocolKind {
    /// Map a provider-type key to its protocol family.
    pub fn for_provider(provider_type: &str) -> Self {
        let key = provider_type.to_ascii_lowercase();
        if key.starts_with("gemini") {
            ProtocolKind::Gemini
        } else if key.starts_with("claude") || key.starts_with("anthropic") {
            ProtocolKind::Claude
        } else if key.starts_with("codex") || key.contains("responses") {
            ProtocolKind::OpenAiResponses
        } else {
            ProtocolKind::OpenAiChat
        }
    }
}

/// Default probe model per protocol family, used when a record carries no
/// `checkModelName`. Cheap, widely-available models keep probes inexpensive.
pub fn default_check_model(provider_type: &str) -> &'static str {
    match ProtocolKind::for_provider(provider_type) {
        ProtocolKind::Gemini => "gemini-2.5-flash",
        ProtocolKind::Claude => "claude-3-5-haiku-20241022",
        ProtocolKind::OpenAiResponses => "gpt-5-mini",
        ProtocolKind::OpenAiChat => "gpt-4o-mini",
    }
}

/// Resolved configuration for constructing one backend capability.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// Provider-type key this configuration targets
    pub provider_type: String,
    /// Open mapping of credential/config fields (camelCase keys)
    pub fields: Map<String, Value>,
}

impl EffectiveConfig {
    pub fn new(provider_type: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            provider_type: provider_type.into(),
            fields,
        }
    }

    /// Produce a new config with `overlay` deep-merged over this one
    /// (overlay fields win on conflict).
    pub fn merged(&self, overlay: &Map<String, Value>) -> Self {
        let mut base = Value::Object(self.fields.clone());
        deep_merge(&mut base, &Value::Object(overlay.clone()));
        let fields = match base {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            provider_type: self.provider_type.clone(),
            fields,
        }
    }

    /// Fetch a string-valued field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.str_field("apiKey")
    }

    pub fn base_url(&self) -> Option<&str> {
        self.str_field("baseUrl")
    }

    pub fn proxy_url(&self) -> Option<&str> {
        self.str_field("proxyUrl")
    }

    pub fn protocol(&self) -> ProtocolKind {
        ProtocolKind::for_provider(&self.provider_type)
    }
}

/// Recursively merge `overlay` into `base`. Objects merge key-by-key;
/// any other value in the overlay replaces the base value outright.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) if base_value.is_object() && overlay_value.is_object() => {
                        deep_merge(base_value, overlay_value);
                    }
                    _ => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}
