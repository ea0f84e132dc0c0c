use std::path::{Path, PathBuf};

use common::{OrderId, UserId};
use document_store::DocumentStore;
use domain::{Money, OrderLedger};
use serde::Serialize;
use tokio::io::AsyncWrite;

use crate::error::Result;
use crate::fanout::{FanOutWriter, SinkOutcome};
use crate::invoice::Invoice;
use crate::layout::layout;
use crate::pdf::PdfChunks;

/// Summary of one invoice render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub order_id: OrderId,
    pub file_name: String,
    pub grand_total: Money,
    pub file: SinkOutcome,
    pub response: SinkOutcome,
}

/// Renders invoices for placed orders into the invoice directory and a
/// caller-supplied response sink in one pass.
pub struct InvoiceRenderer<S: DocumentStore> {
    ledger: OrderLedger<S>,
    invoice_dir: PathBuf,
}

impl<S: DocumentStore + Clone> Clone for InvoiceRenderer<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            invoice_dir: self.invoice_dir.clone(),
        }
    }
}

impl<S: DocumentStore> InvoiceRenderer<S> {
    pub fn new(ledger: OrderLedger<S>, invoice_dir: impl Into<PathBuf>) -> Self {
        Self {
            ledger,
            invoice_dir: invoice_dir.into(),
        }
    }

    pub fn invoice_dir(&self) -> &Path {
        &self.invoice_dir
    }

    /// Path of the persisted invoice for an order.
    pub fn invoice_path(&self, order_id: OrderId) -> PathBuf {
        self.invoice_dir
            .join(crate::invoice::invoice_file_name(order_id))
    }

    /// Loads the order on behalf of `requester` and derives its invoice.
    ///
    /// Ownership is checked here, before any byte is rendered.
    #[tracing::instrument(skip(self))]
    pub async fn prepare(&self, order_id: OrderId, requester: UserId) -> Result<Invoice> {
        let order = self.ledger.get_order(order_id, requester).await?;
        Ok(Invoice::from_order(&order))
    }

    /// Renders an already authorized invoice.
    ///
    /// The file is written under a temporary name and moved into place only
    /// if every chunk reached it, so a partial invoice is never persisted.
    #[tracing::instrument(skip(self, invoice, response), fields(order_id = %invoice.order_id))]
    pub async fn render_to<W>(&self, invoice: &Invoice, response: W) -> Result<RenderReport>
    where
        W: AsyncWrite + Unpin,
    {
        let final_path = self.invoice_path(invoice.order_id);
        let part_path = self.invoice_dir.join(format!(
            ".{}.{}.part",
            invoice.file_name(),
            uuid::Uuid::new_v4()
        ));

        let file = match tokio::fs::create_dir_all(&self.invoice_dir).await {
            Ok(()) => tokio::fs::File::create(&part_path).await,
            Err(e) => Err(e),
        };
        let mut writer = match file {
            Ok(file) => FanOutWriter::new(file, response),
            Err(e) => FanOutWriter::without_file(e, response),
        };

        let commands = layout(invoice);
        let streamed: Result<()> = async {
            for chunk in PdfChunks::new(&commands) {
                writer.write_chunk(&chunk).await?;
            }
            Ok(())
        }
        .await;
        let finished = match streamed {
            Ok(()) => writer.finish().await,
            Err(e) => Err(e),
        };

        let (mut file, response) = match finished {
            Ok(outcomes) => outcomes,
            Err(e) => {
                remove_part(&part_path).await;
                return Err(e);
            }
        };

        if file.succeeded() {
            if let Err(e) = tokio::fs::rename(&part_path, &final_path).await {
                metrics::counter!("invoice_sink_failures_total", "sink" => "file").increment(1);
                tracing::warn!(error = %e, "could not move invoice into place");
                file.error = Some(e.to_string());
                remove_part(&part_path).await;
            }
        } else {
            remove_part(&part_path).await;
        }

        metrics::counter!("invoices_rendered_total").increment(1);
        tracing::info!(
            file_persisted = file.succeeded(),
            response_delivered = response.succeeded(),
            bytes = file.bytes_written.max(response.bytes_written),
            "invoice rendered"
        );

        Ok(RenderReport {
            order_id: invoice.order_id,
            file_name: invoice.file_name(),
            grand_total: invoice.grand_total,
            file,
            response,
        })
    }

    /// Authorizes, derives and renders an order's invoice.
    pub async fn render_invoice<W>(
        &self,
        order_id: OrderId,
        requester: UserId,
        response: W,
    ) -> Result<RenderReport>
    where
        W: AsyncWrite + Unpin,
    {
        let invoice = self.prepare(order_id, requester).await?;
        self.render_to(&invoice, response).await
    }
}

async fn remove_part(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "could not remove partial invoice");
    }
}
