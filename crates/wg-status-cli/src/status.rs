//! Status command implementation.

use std::io::Write;

use wg_status::{ControlInterface, Panel, StatusAggregator};

use crate::error::CliError;
use crate::output::{select_document, OutputFormat};

/// Status command executor.
#[derive(Debug, Clone)]
pub struct StatusCommand {
    panel: Option<Panel>,
    format: OutputFormat,
}

impl StatusCommand {
    /// Create a status command for one panel, or all when `panel` is `None`.
    #[must_use]
    pub fn new(panel: Option<Panel>, format: OutputFormat) -> Self {
        Self { panel, format }
    }

    /// Query the control interface and write the selected panels.
    ///
    /// Failed queries are rendered, not returned; the only errors are
    /// output failures.
    pub async fn execute<C, W>(
        &self,
        aggregator: &StatusAggregator<C>,
        writer: &mut W,
    ) -> Result<(), CliError>
    where
        C: ControlInterface,
        W: Write,
    {
        if self.format.is_json() {
            let document = select_document(aggregator.document().await, self.panel);
            self.format.write_document(writer, &document)
        } else {
            let report = aggregator.collect().await;
            self.format.write_report(writer, &report, self.panel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use wg_status::{FakeControl, FakeFailure, PublicKey, KEY_SIZE};

    async fn fake() -> FakeControl {
        let fake = FakeControl::new();
        fake.add_interface("wg0", Some(PublicKey::from_bytes_array([9; KEY_SIZE])), Some(51820))
            .await
            .expect("add interface");
        fake.add_peer("wg0", PublicKey::from_bytes_array([1; KEY_SIZE]), None, Vec::new())
            .await
            .expect("add peer");
        fake
    }

    #[tokio::test]
    async fn execute_text_connections() {
        let aggregator = StatusAggregator::new(fake().await);
        let cmd = StatusCommand::new(Some(Panel::Connections), OutputFormat::new(Format::Text));
        let mut buf = Vec::new();
        cmd.execute(&aggregator, &mut buf).await.expect("execute");

        let text = String::from_utf8(buf).expect("utf-8");
        assert!(text.starts_with("interface: wg0"));
        assert!(text.contains("latest handshake: (never)"));
        assert!(!text.contains("=="));
    }

    #[tokio::test]
    async fn execute_json_all() {
        let aggregator = StatusAggregator::new(fake().await);
        let cmd = StatusCommand::new(None, OutputFormat::new(Format::Json));
        let mut buf = Vec::new();
        cmd.execute(&aggregator, &mut buf).await.expect("execute");

        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["interfaces"]["interfaces"][0]["name"], "wg0");
        assert_eq!(value["module_loaded"], true);
    }

    #[tokio::test]
    async fn failed_query_still_succeeds() {
        let fake = fake().await;
        fake.fail_interfaces(FakeFailure::PermissionDenied).await;
        let aggregator = StatusAggregator::new(fake);
        let cmd = StatusCommand::new(None, OutputFormat::default());
        let mut buf = Vec::new();
        cmd.execute(&aggregator, &mut buf).await.expect("execute");

        let text = String::from_utf8(buf).expect("utf-8");
        assert!(text.contains(wg_status::format::UNAVAILABLE));
        assert!(text.contains("wireguard kernel module: loaded"));
    }
}
