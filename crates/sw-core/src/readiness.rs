use serde::{Deserialize, Serialize};

/// Per-subsystem readiness. Display only; `ReadinessSnapshot::ready` is the
/// single flag that gates the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentReadiness {
    pub worker: bool,
    pub queue: bool,
    pub websocket: bool,
    pub pipeline: bool,
    /// Advisory; the backend may run without a GPU.
    pub gpu: bool,
}

impl ComponentReadiness {
    /// Names of the required components that are not up yet. GPU is left out.
    pub fn pending(&self) -> Vec<&'static str> {
        [
            ("worker", self.worker),
            ("queue", self.queue),
            ("websocket", self.websocket),
            ("pipeline", self.pipeline),
        ]
        .into_iter()
        .filter(|(_, up)| !up)
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub name: String,
    pub vram_gb: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSnapshot {
    pub ready: bool,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub components: ComponentReadiness,
    #[serde(default)]
    pub gpu_info: Option<GpuInfo>,
}

impl ReadinessSnapshot {
    pub fn ready(message: impl Into<String>) -> Self {
        Self {
            ready: true,
            status_message: message.into(),
            components: ComponentReadiness {
                worker: true,
                queue: true,
                websocket: true,
                pipeline: true,
                gpu: true,
            },
            gpu_info: None,
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self {
            ready: false,
            status_message: message.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_is_not_required() {
        let components = ComponentReadiness {
            worker: true,
            queue: true,
            websocket: true,
            pipeline: true,
            gpu: false,
        };
        assert!(components.pending().is_empty());
    }

    #[test]
    fn pending_lists_missing_components() {
        let components = ComponentReadiness {
            worker: true,
            pipeline: true,
            ..Default::default()
        };
        assert_eq!(components.pending(), vec!["queue", "websocket"]);
    }

    #[test]
    fn snapshot_parses_with_missing_fields() {
        let snapshot: ReadinessSnapshot = serde_json::from_str(
            r#"{"ready": false, "components": {"worker": true}, "gpu_info": {"name": "RTX 4090", "vram_gb": 24.0}}"#,
        )
        .unwrap();
        assert!(!snapshot.ready);
        assert!(snapshot.components.worker);
        assert!(!snapshot.components.queue);
        assert_eq!(snapshot.gpu_info.unwrap().name, "RTX 4090");
    }
}
