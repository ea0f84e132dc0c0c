//! Invoice page layout as draw commands.

use crate::invoice::Invoice;

const SEPARATOR: &str = "----------------------------------------";

/// One layout instruction for the document encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    Text {
        size: u16,
        underline: bool,
        text: String,
    },
    Blank,
}

impl DrawCommand {
    pub fn text(size: u16, text: impl Into<String>) -> Self {
        DrawCommand::Text {
            size,
            underline: false,
            text: text.into(),
        }
    }

    pub fn heading(size: u16, text: impl Into<String>) -> Self {
        DrawCommand::Text {
            size,
            underline: true,
            text: text.into(),
        }
    }
}

/// Lays out an invoice: heading, one line per item, separator, total.
pub fn layout(invoice: &Invoice) -> Vec<DrawCommand> {
    let mut commands = Vec::with_capacity(invoice.lines.len() + 5);
    commands.push(DrawCommand::heading(26, "Invoice"));
    commands.push(DrawCommand::Blank);
    for line in &invoice.lines {
        commands.push(DrawCommand::text(
            14,
            format!("{} - {} x {}", line.title, line.quantity, line.unit_price),
        ));
    }
    commands.push(DrawCommand::text(14, SEPARATOR));
    commands.push(DrawCommand::Blank);
    commands.push(DrawCommand::text(
        20,
        format!("Total Price: {}", invoice.grand_total),
    ));
    commands
}
