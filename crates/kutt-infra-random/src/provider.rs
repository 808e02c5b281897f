//! Provider generating random resource values

use crate::resources::{DEFAULT_SPECIAL, RandomPassword, RandomString};
use async_trait::async_trait;
use kutt_infra_core::{GraphError, ProviderOutputs, Resource, ResourceProvider, Result, Urn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::sync::Mutex;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &str = "0123456789";

/// Serves the `random` package
pub struct RandomProvider {
    rng: Mutex<StdRng>,
}

impl RandomProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceProvider for RandomProvider {
    fn package(&self) -> &str {
        "random"
    }

    fn display_name(&self) -> &str {
        "Random"
    }

    async fn create(&self, urn: &Urn, inputs: &Value) -> Result<ProviderOutputs> {
        let result = {
            let mut rng = self
                .rng
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            generate(&mut *rng, inputs)
                .map_err(|e| GraphError::ProviderFailed(format!("{}: {}", urn.name(), e)))?
        };

        match urn.type_token() {
            RandomPassword::TYPE_TOKEN => {
                tracing::debug!(urn = %urn, "Generated password");
                Ok(ProviderOutputs::new().with_secret("result", result))
            }
            RandomString::TYPE_TOKEN => {
                tracing::debug!(urn = %urn, "Generated string");
                Ok(ProviderOutputs::new()
                    .with("id", result.clone())
                    .with("result", result))
            }
            other => Err(GraphError::ProviderFailed(format!(
                "unsupported resource type: {}",
                other
            ))),
        }
    }

    async fn invoke(&self, token: &str, _args: &Value) -> Result<Value> {
        Err(GraphError::ProviderFailed(format!(
            "unsupported function: {}",
            token
        )))
    }
}

/// Generate a value from resolved random resource inputs
///
/// At least `min_special` characters come from the symbol set; the rest are
/// drawn from every enabled class, then the whole value is shuffled.
pub fn generate<R: Rng>(rng: &mut R, inputs: &Value) -> std::result::Result<String, String> {
    let flag = |key: &str, default: bool| {
        inputs
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    };
    let length = inputs
        .get("length")
        .and_then(Value::as_u64)
        .ok_or("length is required")? as usize;
    let min_special = inputs
        .get("min_special")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;

    if length == 0 {
        return Err("length must be at least 1".to_string());
    }

    let special: Vec<char> = if flag("special", true) {
        inputs
            .get("override_special")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SPECIAL)
            .chars()
            .collect()
    } else {
        Vec::new()
    };

    let mut pool: Vec<char> = Vec::new();
    if flag("lower", true) {
        pool.extend(LOWER.chars());
    }
    if flag("upper", true) {
        pool.extend(UPPER.chars());
    }
    if flag("numeric", true) {
        pool.extend(NUMERIC.chars());
    }
    pool.extend(special.iter().copied());

    if pool.is_empty() {
        return Err("no character classes enabled".to_string());
    }
    if min_special > 0 && special.is_empty() {
        return Err("min_special requires a symbol set".to_string());
    }
    if min_special > length {
        return Err(format!(
            "min_special ({}) exceeds length ({})",
            min_special, length
        ));
    }

    let mut chars: Vec<char> = (0..min_special)
        .map(|_| special[rng.gen_range(0..special.len())])
        .collect();
    chars.extend((min_special..length).map(|_| pool[rng.gen_range(0..pool.len())]));
    chars.shuffle(rng);

    Ok(chars.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{RandomPasswordArgs, RandomStringArgs};
    use kutt_infra_core::{IntoProperties, LocalBackend, ResourceOptions, Stack};
    use std::sync::Arc;

    async fn inputs(args: impl IntoProperties) -> Value {
        args.into_properties().value.resolve().await.unwrap()
    }

    #[tokio::test]
    async fn test_password_with_restricted_symbols() {
        let inputs = inputs(RandomPasswordArgs::new(16).with_special("@", 1)).await;
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let password = generate(&mut rng, &inputs).unwrap();
            assert_eq!(password.chars().count(), 16);
            assert!(password.contains('@'));
            assert!(
                password
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '@')
            );
        }
    }

    #[tokio::test]
    async fn test_name_safe_string() {
        let inputs = inputs(RandomStringArgs::name_safe(4)).await;
        let mut rng = StdRng::seed_from_u64(7);

        let value = generate(&mut rng, &inputs).unwrap();
        assert_eq!(value.len(), 4);
        assert!(
            value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let mut rng = StdRng::seed_from_u64(7);
        let zero = serde_json::json!({ "length": 0 });
        assert!(generate(&mut rng, &zero).is_err());

        let nothing = serde_json::json!({
            "length": 4, "lower": false, "upper": false, "numeric": false, "special": false
        });
        assert!(generate(&mut rng, &nothing).is_err());

        let too_many = serde_json::json!({ "length": 2, "min_special": 3 });
        assert!(generate(&mut rng, &too_many).is_err());
    }

    #[tokio::test]
    async fn test_declared_password_is_secret() {
        let backend =
            LocalBackend::new("kutt", "test").with_provider(Arc::new(RandomProvider::seeded(1)));
        let stack = Stack::new(Arc::new(backend));

        let password: RandomPassword = stack
            .declare(
                "db-password",
                RandomPasswordArgs::new(16).with_special("@", 1),
                ResourceOptions::new(),
            )
            .unwrap();
        assert!(password.result.is_secret());
        assert_eq!(password.result.resolve().await.unwrap().len(), 16);

        let state = stack.settle().await.unwrap();
        let recorded = state.get_resource(&password.urn).unwrap();
        assert!(recorded.secret_keys.contains("result"));
        assert_eq!(recorded.masked_outputs()["result"], "[secret]");
    }
}
