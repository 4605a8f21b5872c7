//! Simulated support-desk data.
//!
//! All records are hardcoded and fictional. These functions stand in for a
//! ticketing system, an order database, and a payment processor.

use serde_json::{json, Value};

use warden_core::traits::TaskResult;

// ── Tickets ───────────────────────────────────────────────────────────────────

/// A support ticket. Unknown ids return a ticket with status `unknown`.
pub fn get_ticket(ticket_id: &str) -> Value {
    let (subject, status, priority) = match ticket_id {
        "TCK-1001" => ("Package arrived damaged", "open", "high"),
        "TCK-1002" => ("Cannot reset password", "pending", "medium"),
        "TCK-1003" => ("Question about invoice", "resolved", "low"),
        _ => ("(no such ticket)", "unknown", "none"),
    };
    json!({
        "ticketId": ticket_id,
        "subject": subject,
        "status": status,
        "priority": priority,
        "customerId": "CUST-0042",
    })
}

// ── Orders ────────────────────────────────────────────────────────────────────

/// An order record with its amount in dollars.
pub fn get_order(order_id: &str) -> Value {
    let amount = match order_id {
        "ORD-5001" => 129.99,
        "ORD-5002" => 749.00,
        "ORD-5003" => 42.50,
        _ => 0.0,
    };
    json!({
        "orderId": order_id,
        "customerId": "CUST-0042",
        "amount": amount,
        "currency": "USD",
        "status": if amount > 0.0 { "delivered" } else { "unknown" },
    })
}

/// Context for a refund request. Carries a card number so the audit log's
/// redaction is visible on disk.
pub fn refund_request(order_id: &str, amount: f64) -> Value {
    json!({
        "orderId": order_id,
        "amount": amount,
        "reason": "damaged on arrival",
        "payment": { "creditCard": "4111-1111-1111-1111", "last4": "1111" },
    })
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

/// Task: look up the ticket named by `context.ticketId`.
pub fn read_ticket(context: &Value) -> TaskResult {
    let ticket_id = context["ticketId"].as_str().ok_or("context has no ticketId")?;
    Ok(get_ticket(ticket_id))
}

/// Task: look up the order named by `context.orderId`.
pub fn read_order(context: &Value) -> TaskResult {
    let order_id = context["orderId"].as_str().ok_or("context has no orderId")?;
    Ok(get_order(order_id))
}

/// Task: pretend to push a refund to the payment processor.
pub fn process_refund(context: &Value) -> TaskResult {
    let order_id = context["orderId"].as_str().ok_or("context has no orderId")?;
    let amount = context["amount"].as_f64().ok_or("context has no numeric amount")?;
    Ok(json!({
        "refundId": format!("RF-{order_id}"),
        "amount": amount,
        "status": "processed",
    }))
}

/// Task: a CRM sync that always times out.
pub fn sync_crm_unreachable(_context: &Value) -> TaskResult {
    Err("CRM endpoint timed out after 30s".to_string())
}
