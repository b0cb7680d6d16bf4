//! Encoders behind one capability interface.
//!
//! # Responsibility
//! - Encode JSON/CSV/plain text in-process.
//! - Delegate raster/paginated formats to the rendering collaborator with
//!   a planned capture region, restoring its viewport afterwards.

use crate::config::ExportConfig;
use crate::export::format::ExportFormat;
use crate::export::viewport::{plan_capture, CapturePlan, ViewportTransform};
use crate::export::{export_file_name, ExportError, ExportResult, MapSnapshot};
use log::{error, info};
use std::collections::HashMap;
use std::fmt::Write as _;

const CSV_HEADER: [&str; 9] = [
    "kind", "id", "label", "color", "x", "y", "source", "target", "selected",
];

/// Common capability: snapshot + target format -> bytes.
pub trait Encoder {
    fn encode(&mut self, snapshot: &MapSnapshot, format: ExportFormat) -> ExportResult<Vec<u8>>;
}

/// External rendering collaborator (canvas/PDF/slide/table generators).
pub trait RenderCollaborator {
    fn viewport(&self) -> ViewportTransform;
    fn set_viewport(&mut self, viewport: ViewportTransform);
    /// Captures `plan.region` at `plan.scale` and encodes it as `format`.
    fn capture(&mut self, plan: &CapturePlan, format: ExportFormat) -> Result<Vec<u8>, String>;
}

/// Downloadable export result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Structured-text encoder; output is the import shape.
#[derive(Debug, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&mut self, snapshot: &MapSnapshot, _format: ExportFormat) -> ExportResult<Vec<u8>> {
        serde_json::to_vec_pretty(snapshot).map_err(|err| ExportError::Serialize(err.to_string()))
    }
}

/// Delimited-text encoder: one row per node, then one row per edge.
#[derive(Debug, Default)]
pub struct CsvEncoder;

impl Encoder for CsvEncoder {
    fn encode(&mut self, snapshot: &MapSnapshot, _format: ExportFormat) -> ExportResult<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER).map_err(csv_error)?;
        for node in &snapshot.nodes {
            let x = node.position.x.to_string();
            let y = node.position.y.to_string();
            let selected = node.selected.to_string();
            wtr.write_record([
                "node",
                node.id.as_str(),
                node.data.label.as_str(),
                node.data.color.as_str(),
                x.as_str(),
                y.as_str(),
                "",
                "",
                selected.as_str(),
            ])
            .map_err(csv_error)?;
        }
        for edge in &snapshot.edges {
            wtr.write_record([
                "edge",
                edge.id.as_str(),
                "",
                "",
                "",
                "",
                edge.source.as_str(),
                edge.target.as_str(),
                "",
            ])
            .map_err(csv_error)?;
        }
        wtr.into_inner().map_err(|err| ExportError::Serialize(err.to_string()))
    }
}

fn csv_error(err: csv::Error) -> ExportError {
    ExportError::Serialize(err.to_string())
}

/// Plain narrative text listing ideas and their connections.
#[derive(Debug, Default)]
pub struct TextEncoder;

impl Encoder for TextEncoder {
    fn encode(&mut self, snapshot: &MapSnapshot, _format: ExportFormat) -> ExportResult<Vec<u8>> {
        let mut out = String::new();
        write_text(&mut out, snapshot).map_err(|err| ExportError::Serialize(err.to_string()))?;
        Ok(out.into_bytes())
    }
}

fn write_text(out: &mut String, snapshot: &MapSnapshot) -> std::fmt::Result {
    let labels: HashMap<&str, &str> = snapshot
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), node.data.label.as_str()))
        .collect();
    let title = if snapshot.name.trim().is_empty() {
        "Untitled"
    } else {
        snapshot.name.trim()
    };

    writeln!(out, "Mind map: {title}")?;
    writeln!(out)?;
    writeln!(out, "Ideas ({}):", snapshot.nodes.len())?;
    for node in &snapshot.nodes {
        writeln!(out, "- {} [{}]", node.data.label, node.id)?;
    }
    writeln!(out)?;
    writeln!(out, "Connections ({}):", snapshot.edges.len())?;
    for edge in &snapshot.edges {
        let source = labels.get(edge.source.as_str()).copied().unwrap_or(&edge.source);
        let target = labels.get(edge.target.as_str()).copied().unwrap_or(&edge.target);
        writeln!(out, "- {source} -> {target}")?;
    }
    Ok(())
}

/// Hands rendered formats to the rendering collaborator.
pub struct RenderedEncoder<'r, 'c> {
    renderer: &'r mut dyn RenderCollaborator,
    config: &'c ExportConfig,
}

impl<'r, 'c> RenderedEncoder<'r, 'c> {
    pub fn new(renderer: &'r mut dyn RenderCollaborator, config: &'c ExportConfig) -> Self {
        Self { renderer, config }
    }
}

impl Encoder for RenderedEncoder<'_, '_> {
    fn encode(&mut self, snapshot: &MapSnapshot, format: ExportFormat) -> ExportResult<Vec<u8>> {
        let plan = plan_capture(&snapshot.nodes, self.config).ok_or(ExportError::EmptyGraph)?;
        let previous = self.renderer.viewport();
        self.renderer.set_viewport(plan.viewport());
        let captured = self.renderer.capture(&plan, format);
        self.renderer.set_viewport(previous);
        captured.map_err(ExportError::Render)
    }
}

/// Exports `snapshot` as `format`.
///
/// Rendered formats require `renderer`; text formats ignore it.
pub fn export_snapshot(
    format: ExportFormat,
    snapshot: &MapSnapshot,
    config: &ExportConfig,
    renderer: Option<&mut dyn RenderCollaborator>,
) -> ExportResult<ExportArtifact> {
    let encoded = match format {
        ExportFormat::Json => JsonEncoder.encode(snapshot, format),
        ExportFormat::Csv => CsvEncoder.encode(snapshot, format),
        ExportFormat::Text => TextEncoder.encode(snapshot, format),
        rendered => match renderer {
            Some(renderer) => RenderedEncoder::new(renderer, config).encode(snapshot, rendered),
            None => Err(ExportError::RendererUnavailable(rendered)),
        },
    };

    match encoded {
        Ok(bytes) => {
            info!(
                "event=map_export module=export status=ok format={} bytes={}",
                format,
                bytes.len()
            );
            Ok(ExportArtifact {
                file_name: export_file_name(&snapshot.name, format, config),
                mime_type: format.mime_type(),
                bytes,
            })
        }
        Err(err) => {
            error!(
                "event=map_export module=export status=error format={} error={}",
                format, err
            );
            Err(err)
        }
    }
}
