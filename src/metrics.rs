use serde_json::Value;
use tokio::sync::RwLock;

/// Latest metrics document posted by the crane, passed to the UI unchanged.
#[derive(Debug, Default)]
pub struct MetricStore {
    latest: RwLock<Option<Value>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, metrics: Value) {
        *self.latest.write().await = Some(metrics);
    }

    /// The last document, or an empty object if the crane never sent one.
    pub async fn get(&self) -> Value {
        self.latest
            .read()
            .await
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}
