// src/config.rs
//! Service configuration.
//!
//! Settings are layered: built-in defaults first, then environment variables
//! prefixed with `VCL` (nested keys separated by `__`, e.g.
//! `VCL__RESOLVER__REGISTRY_URL`), then the plain `PORT` variable.
//!
//! Each component receives only its own section at construction time.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Default EBSI pilot DID registry endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "https://api-pilot.ebsi.eu/did-registry/v5/identifiers";

/// Default credential schema published in the EBSI trusted schemas registry.
pub const DEFAULT_SCHEMA_ID: &str = "https://api-pilot.ebsi.eu/trusted-schemas-registry/v3/schemas/zDpWGUBenmqXzurskry9Nsk6vq2R8thh9VSeoRqguoyMD";

/// Default credential schema validator type.
pub const DEFAULT_SCHEMA_TYPE: &str = "FullJsonSchemaValidator2021";

/// How the `kid` header of a signed token is formed from the caller's key id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KidScope {
    /// `<did>#<kid>`, matching DID document verification method ids.
    #[default]
    Issuer,
    /// The caller's key id, unchanged.
    Bare,
}

impl KidScope {
    /// Forms the header `kid` for a token signed by `did`.
    pub fn apply(self, did: &str, kid: &str) -> String {
        match self {
            Self::Bare => kid.to_string(),
            Self::Issuer if kid.starts_with(&format!("{did}#")) => kid.to_string(),
            Self::Issuer => format!("{did}#{kid}"),
        }
    }
}

/// DID resolution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Base URL of the registry's identifiers collection.
    pub registry_url: String,
    /// Upper bound for a single registry round-trip.
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

/// Credential issuance settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuerConfig {
    pub kid_scope: KidScope,
    /// `credentialSchema.id` placed in every issued credential.
    pub schema_id: String,
    /// `credentialSchema.type` placed in every issued credential.
    pub schema_type: String,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            kid_scope: KidScope::Issuer,
            schema_id: DEFAULT_SCHEMA_ID.to_string(),
            schema_type: DEFAULT_SCHEMA_TYPE.to_string(),
        }
    }
}

/// Presentation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PresentationConfig {
    pub kid_scope: KidScope,
    /// Seconds between a presentation's `iat` and its `exp`.
    pub lifetime_secs: i64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            kid_scope: KidScope::Issuer,
            lifetime_secs: 3600,
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Reported by `GET /info`.
    pub service_name: String,
    pub resolver: ResolverConfig,
    pub issuer: IssuerConfig,
    pub presentation: PresentationConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            service_name: "EBSI Ledger Onboarding Service".to_string(),
            resolver: ResolverConfig::default(),
            issuer: IssuerConfig::default(),
            presentation: PresentationConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Loads the configuration from defaults and the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if an override cannot be parsed into its field
    /// type (for example a non-numeric `PORT`), or if
    /// `presentation.lifetime_secs` is not positive.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::builder(Environment::with_prefix("VCL").separator("__"))?
            .set_override_option("port", std::env::var("PORT").ok())?
            .build()?
            .try_deserialize()?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.presentation.lifetime_secs <= 0 {
            return Err(ConfigError::Message(format!(
                "presentation.lifetime_secs must be positive, got {}",
                self.presentation.lifetime_secs
            )));
        }
        Ok(self)
    }

    fn builder(
        env: Environment,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("service_name", defaults.service_name)?
            .set_default("resolver.registry_url", defaults.resolver.registry_url)?
            .set_default("resolver.timeout_secs", defaults.resolver.timeout_secs as i64)?
            .set_default("issuer.kid_scope", "issuer")?
            .set_default("issuer.schema_id", defaults.issuer.schema_id)?
            .set_default("issuer.schema_type", defaults.issuer.schema_type)?
            .set_default("presentation.kid_scope", "issuer")?
            .set_default("presentation.lifetime_secs", defaults.presentation.lifetime_secs)
            .map(|builder| builder.add_source(env))
    }
}
