use common::OrderId;
use domain::{Money, Order};
use serde::Serialize;

/// One priced invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLine {
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub amount: Money,
}

/// Priced breakdown of a placed order.
///
/// Built only from the order's frozen line items, so the same order always
/// yields the same invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    pub order_id: OrderId,
    pub lines: Vec<InvoiceLine>,
    pub grand_total: Money,
}

impl Invoice {
    pub fn from_order(order: &Order) -> Self {
        let lines: Vec<InvoiceLine> = order
            .items()
            .iter()
            .map(|item| InvoiceLine {
                title: item.title.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                amount: item.line_total(),
            })
            .collect();
        let grand_total: Money = lines.iter().map(|line| line.amount).sum();

        Self {
            order_id: order.id(),
            lines,
            grand_total,
        }
    }

    pub fn file_name(&self) -> String {
        invoice_file_name(self.order_id)
    }
}

/// Name of the persisted invoice file for an order.
pub fn invoice_file_name(order_id: OrderId) -> String {
    format!("invoice-{order_id}.pdf")
}
