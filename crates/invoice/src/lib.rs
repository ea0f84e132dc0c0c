//! Invoices for placed orders.
//!
//! An invoice is derived from the frozen line items of an order, laid out as
//! a short list of draw commands and encoded as PDF. The encoded chunks are
//! written to the invoice file and to the caller's response at the same time.

pub mod error;
pub mod fanout;
pub mod invoice;
pub mod layout;
pub mod pdf;
pub mod renderer;

pub use error::{InvoiceError, Result};
pub use fanout::{FanOutWriter, SinkOutcome};
pub use invoice::{Invoice, InvoiceLine, invoice_file_name};
pub use layout::{DrawCommand, layout};
pub use pdf::{PdfChunks, encode_pdf};
pub use renderer::{InvoiceRenderer, RenderReport};
