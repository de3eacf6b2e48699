//! System snapshot included in the results report.
//!
//! Queries `docker system info` and `df`; every field degrades to an error
//! string rather than failing the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::Host;

/// Machine statistics at run start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub current_time: DateTime<Utc>,
    pub name: String,
    pub operating_system: String,
    #[serde(rename = "CPUs")]
    pub cpus: String,
    pub memory: String,
    pub containers: String,
    pub containers_running: String,
    pub images: String,
    pub disk_used: String,
    pub disk_size: String,
    pub workspace_root: String,
}

/// Snapshot the system. Never fails; unavailable tools leave their error
/// text in the affected fields.
pub async fn collect(host: &dyn Host, workspace_root: &str) -> SystemInfo {
    let mut info = SystemInfo {
        current_time: Utc::now(),
        name: String::new(),
        operating_system: String::new(),
        cpus: String::new(),
        memory: String::new(),
        containers: String::new(),
        containers_running: String::new(),
        images: String::new(),
        disk_used: String::new(),
        disk_size: String::new(),
        workspace_root: workspace_root.to_string(),
    };

    let docker_argv = ["docker", "system", "info", "--format", "{{json .}}"]
        .map(str::to_string)
        .to_vec();
    match host.output_of(&docker_argv, None).await {
        Ok(output) => {
            let parsed: Value = serde_json::from_str(output.trim()).unwrap_or(Value::Null);
            info.name = value_field(&parsed, "Name");
            info.operating_system = value_field(&parsed, "OperatingSystem");
            info.cpus = value_field(&parsed, "NCPU");
            info.memory = value_field(&parsed, "MemTotal");
            info.containers = value_field(&parsed, "Containers");
            info.containers_running = value_field(&parsed, "ContainersRunning");
            info.images = value_field(&parsed, "Images");
        }
        Err(err) => {
            let message = err.to_string();
            info.name = message.clone();
            info.operating_system = message.clone();
            info.cpus = message.clone();
            info.memory = message.clone();
            info.containers = message.clone();
            info.containers_running = message.clone();
            info.images = message;
        }
    }

    info.disk_size = df_field(host, "size").await;
    info.disk_used = df_field(host, "used").await;

    info
}

async fn df_field(host: &dyn Host, field: &str) -> String {
    let argv = vec![
        "df".to_string(),
        "/".to_string(),
        format!("--output={field}"),
    ];
    match host.output_of(&argv, None).await {
        Ok(output) => {
            // First line is the header, second the value for "/".
            let lines: Vec<&str> = output.trim().lines().collect();
            if lines.len() == 2 {
                lines[1].trim().to_string()
            } else {
                "unexpected df output".to_string()
            }
        }
        Err(err) => err.to_string(),
    }
}

fn value_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
