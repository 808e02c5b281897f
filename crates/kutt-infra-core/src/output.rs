//! Deferred resource attributes
//!
//! An [`Output`] is a value that becomes known only once the backend has
//! created (or looked up) the resource it belongs to. Outputs are combined
//! with [`Output::apply`], [`Output::zip`], [`Output::all`] and
//! [`Output::concat`]; the wrapped value is only ever read through
//! [`Output::resolve`].
//!
//! Every output carries the URNs of the resources it was derived from, so a
//! declaration that consumes an output automatically gains a dependency edge
//! on its producers, and a secret flag that survives every combinator.

use crate::resource::Urn;
use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Error carried by an output that failed to resolve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct OutputError(pub String);

impl OutputError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type Resolution<T> = std::result::Result<T, OutputError>;

/// Bounds every deferred value must satisfy
pub trait OutputValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> OutputValue for T {}

/// A deferred value of type `T`
pub struct Output<T: OutputValue> {
    value: Shared<BoxFuture<'static, Resolution<T>>>,
    dependencies: Arc<BTreeSet<Urn>>,
    secret: bool,
}

impl<T: OutputValue> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            dependencies: Arc::clone(&self.dependencies),
            secret: self.secret,
        }
    }
}

impl<T: OutputValue> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("secret", &self.secret)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl<T: OutputValue> Output<T> {
    fn from_parts(
        value: BoxFuture<'static, Resolution<T>>,
        dependencies: BTreeSet<Urn>,
        secret: bool,
    ) -> Self {
        Self {
            value: value.shared(),
            dependencies: Arc::new(dependencies),
            secret,
        }
    }

    /// A value that is already known
    pub fn new(value: T) -> Self {
        Self::from_parts(future::ready(Ok(value)).boxed(), BTreeSet::new(), false)
    }

    /// A known value that must never be displayed
    pub fn secret(value: T) -> Self {
        Self::new(value).as_secret()
    }

    /// A value that will never resolve successfully
    pub fn failed(message: impl Into<String>) -> Self {
        let error = OutputError::new(message);
        Self::from_parts(future::ready(Err(error)).boxed(), BTreeSet::new(), false)
    }

    /// A value produced by `future`, derived from the given resources
    pub fn from_future<F>(future: F, dependencies: impl IntoIterator<Item = Urn>) -> Self
    where
        F: Future<Output = Resolution<T>> + Send + 'static,
    {
        Self::from_parts(future.boxed(), dependencies.into_iter().collect(), false)
    }

    /// Mark this value as secret
    pub fn as_secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Add an explicit dependency on a resource
    pub fn depends_on(mut self, urn: Urn) -> Self {
        Arc::make_mut(&mut self.dependencies).insert(urn);
        self
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// Resources this value is derived from
    pub fn dependencies(&self) -> &BTreeSet<Urn> {
        &self.dependencies
    }

    /// Wait for the value
    pub async fn resolve(&self) -> Resolution<T> {
        self.value.clone().await
    }

    /// The value, if it is available without waiting
    ///
    /// Only values that depend on no resource are polled, so checking a
    /// literal never drives a provider call.
    pub fn try_now(&self) -> Option<Resolution<T>> {
        if !self.dependencies.is_empty() {
            return None;
        }
        self.value.clone().now_or_never()
    }

    /// Transform the value once it is known
    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: OutputValue,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let value = self.value.clone();
        Output::from_parts(
            async move { value.await.map(f) }.boxed(),
            (*self.dependencies).clone(),
            self.secret,
        )
    }

    /// Transform the value with a step that may fail
    pub fn try_apply<U, F>(&self, f: F) -> Output<U>
    where
        U: OutputValue,
        F: FnOnce(T) -> Resolution<U> + Send + 'static,
    {
        let value = self.value.clone();
        Output::from_parts(
            async move { value.await.and_then(f) }.boxed(),
            (*self.dependencies).clone(),
            self.secret,
        )
    }

    /// Combine two values into a pair
    pub fn zip<U: OutputValue>(&self, other: &Output<U>) -> Output<(T, U)> {
        let left = self.value.clone();
        let right = other.value.clone();
        let dependencies = self
            .dependencies
            .union(&other.dependencies)
            .cloned()
            .collect();
        Output::from_parts(
            async move { future::try_join(left, right).await }.boxed(),
            dependencies,
            self.secret || other.secret,
        )
    }

    /// Wait for every value, preserving order
    pub fn all(outputs: impl IntoIterator<Item = Output<T>>) -> Output<Vec<T>> {
        let mut dependencies = BTreeSet::new();
        let mut secret = false;
        let mut values = Vec::new();
        for output in outputs {
            dependencies.extend(output.dependencies.iter().cloned());
            secret |= output.secret;
            values.push(output.value);
        }
        Output::from_parts(
            async move { future::try_join_all(values).await }.boxed(),
            dependencies,
            secret,
        )
    }
}

impl<T: OutputValue + Serialize> Output<T> {
    /// Serialize the value into JSON once it is known
    pub fn to_json(&self) -> Output<Value> {
        self.try_apply(|value| {
            serde_json::to_value(value).map_err(|e| OutputError::new(e.to_string()))
        })
    }
}

impl Output<String> {
    /// Concatenate deferred strings
    pub fn concat(parts: impl IntoIterator<Item = Output<String>>) -> Output<String> {
        Output::all(parts).apply(|parts| parts.concat())
    }
}

impl Output<Value> {
    /// Extract and deserialize the attribute at a JSON pointer
    pub fn json_pointer<T>(&self, pointer: &str) -> Output<T>
    where
        T: OutputValue + DeserializeOwned,
    {
        let pointer = pointer.to_string();
        self.try_apply(move |value| {
            let field = value
                .pointer(&pointer)
                .cloned()
                .ok_or_else(|| OutputError::new(format!("missing attribute '{}'", pointer)))?;
            serde_json::from_value(field)
                .map_err(|e| OutputError::new(format!("attribute '{}': {}", pointer, e)))
        })
    }

    /// Render the value as a JSON document
    pub fn json_string(&self) -> Output<String> {
        self.apply(|value| value.to_string())
    }
}

impl<T: OutputValue> From<T> for Output<T> {
    fn from(value: T) -> Self {
        Output::new(value)
    }
}

impl From<&str> for Output<String> {
    fn from(value: &str) -> Self {
        Output::new(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urn(name: &str) -> Urn {
        Urn::new("test", "kutt", "test:index:Thing", name)
    }

    #[tokio::test]
    async fn test_apply_and_concat() {
        let arn = Output::from("arn:aws:secretsmanager:us-west-2:1:secret:kutt");
        let path = Output::concat([arn.clone(), Output::from(":JWT_SECRET::")]);
        assert_eq!(
            path.resolve().await.unwrap(),
            "arn:aws:secretsmanager:us-west-2:1:secret:kutt:JWT_SECRET::"
        );

        let len = arn.apply(|s| s.len());
        assert_eq!(len.resolve().await.unwrap(), 46);
    }

    #[tokio::test]
    async fn test_dependencies_and_secrecy_propagate() {
        let address = Output::new("db.internal".to_string()).depends_on(urn("db"));
        let password = Output::secret("hunter2".to_string()).depends_on(urn("password"));

        let combined = address.zip(&password);
        assert!(combined.is_secret());
        assert_eq!(combined.dependencies().len(), 2);

        let plain = Output::all([address.clone(), Output::from("x")]);
        assert!(!plain.is_secret());
        assert!(plain.dependencies().contains(&urn("db")));
    }

    #[tokio::test]
    async fn test_failure_reaches_every_reader() {
        let failed: Output<String> = Output::failed("vpc lookup failed");
        let derived = failed.apply(|s| s.to_uppercase());
        let joined = Output::concat([Output::from("a"), derived.clone()]);

        assert_eq!(derived.resolve().await.unwrap_err().0, "vpc lookup failed");
        assert!(joined.resolve().await.is_err());
    }

    #[tokio::test]
    async fn test_value_is_computed_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let output = Output::from_future(
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(7u32)
            },
            [],
        );
        let copy = output.clone();

        assert_eq!(output.resolve().await.unwrap(), 7);
        assert_eq!(copy.resolve().await.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_json_pointer() {
        let outputs = Output::new(serde_json::json!({
            "cache_nodes": [{ "address": "redis.internal", "port": 6379 }]
        }));

        let address: Output<String> = outputs.json_pointer("/cache_nodes/0/address");
        assert_eq!(address.resolve().await.unwrap(), "redis.internal");

        let missing: Output<String> = outputs.json_pointer("/cache_nodes/1/address");
        assert!(missing.resolve().await.is_err());
    }

    #[test]
    fn test_try_now_only_reads_literals() {
        let subnets = Output::new(vec!["subnet-a".to_string()]);
        assert_eq!(subnets.try_now(), Some(Ok(vec!["subnet-a".to_string()])));

        let derived = subnets.apply(|s| s.len()).depends_on(urn("vpc"));
        assert_eq!(derived.try_now(), None);
    }
}
