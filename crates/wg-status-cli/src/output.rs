//! Output formatting for the status panels.
//!
//! Text output prints panels as rendered by the library. JSON output prints
//! the structured [`StatusDocument`].

use std::io::Write;

use serde::Serialize;
use wg_status::{Panel, StatusDocument, StatusReport};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both text and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write one panel, or every panel with headings when `panel` is `None`.
    pub fn write_report<W: Write>(
        &self,
        writer: &mut W,
        report: &StatusReport,
        panel: Option<Panel>,
    ) -> Result<(), CliError> {
        match panel {
            Some(panel) => writeln!(writer, "{}", report.panel(panel))?,
            None => write!(writer, "{report}")?,
        }
        Ok(())
    }

    /// Write a status document as pretty JSON.
    pub fn write_document<W: Write>(
        &self,
        writer: &mut W,
        document: &StatusDocument,
    ) -> Result<(), CliError> {
        write_json(writer, document)
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Text)
    }
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *writer, value)
        .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
    writeln!(writer)?;
    Ok(())
}

/// Keeps only the parts of `document` that feed `panel`.
#[must_use]
pub fn select_document(mut document: StatusDocument, panel: Option<Panel>) -> StatusDocument {
    let Some(panel) = panel else {
        return document;
    };
    let keep: &[&str] = match panel {
        Panel::Connections | Panel::Interfaces => {
            document.module_loaded = None;
            document.module_version = None;
            document.version = None;
            &["interfaces"]
        }
        Panel::Version => {
            document.interfaces = None;
            document.module_loaded = None;
            document.module_version = None;
            &["version"]
        }
        Panel::Kmod => {
            document.interfaces = None;
            document.version = None;
            &["module_state"]
        }
    };
    document.errors.retain(|e| keep.contains(&e.query.as_str()));
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use wg_status::QueryFailure;

    fn report() -> StatusReport {
        StatusReport {
            connection: "interface: wg0".into(),
            interfaces: "INTERFACE".into(),
            version: "wireguard-tools: v1".into(),
            kmod: "wireguard kernel module: loaded".into(),
        }
    }

    #[test]
    fn single_panel_has_no_heading() {
        let mut buf = Vec::new();
        OutputFormat::default()
            .write_report(&mut buf, &report(), Some(Panel::Kmod))
            .expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf-8"), "wireguard kernel module: loaded\n");
    }

    #[test]
    fn all_panels_have_headings() {
        let mut buf = Vec::new();
        OutputFormat::default()
            .write_report(&mut buf, &report(), None)
            .expect("write");
        let text = String::from_utf8(buf).expect("utf-8");
        assert!(text.contains("== Connection Status ==\ninterface: wg0"));
        assert!(text.contains("== Kernel Module Status =="));
    }

    #[test]
    fn json_document_is_valid() {
        let mut buf = Vec::new();
        let format = OutputFormat::new(Format::Json);
        assert!(format.is_json());
        format
            .write_document(&mut buf, &StatusDocument::default())
            .expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert!(value["errors"].as_array().is_some_and(Vec::is_empty));
    }

    #[test]
    fn select_document_keeps_panel_fields() {
        let document = StatusDocument {
            interfaces: None,
            module_loaded: Some(true),
            module_version: Some("1.0.0".into()),
            version: None,
            errors: vec![
                QueryFailure {
                    query: "interfaces".into(),
                    message: "down".into(),
                },
                QueryFailure {
                    query: "version".into(),
                    message: "down".into(),
                },
            ],
        };

        let kmod = select_document(document.clone(), Some(Panel::Kmod));
        assert_eq!(kmod.module_loaded, Some(true));
        assert_eq!(kmod.module_version.as_deref(), Some("1.0.0"));
        assert!(kmod.errors.is_empty());

        let connections = select_document(document.clone(), Some(Panel::Connections));
        assert_eq!(connections.module_loaded, None);
        assert_eq!(connections.module_version, None);
        assert_eq!(connections.errors.len(), 1);
        assert_eq!(connections.errors[0].query, "interfaces");

        assert_eq!(select_document(document.clone(), None), document);
    }
}
