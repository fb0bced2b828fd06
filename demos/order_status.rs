//! Example publishing order status changes.
//!
//! This example shows how to:
//! - Wrap a store with a change-notify hook
//! - Listen on a destination with in-process subscribers
//! - Tell published, unchanged and lost notifications apart
//!
//! Run with: cargo run --example order_status

use change_notify::prelude::*;
use change_notify::publish::{ChangeEventMessage, SubscriberRegistry};
use change_notify::record::Row;
use change_notify::store::{Filter, MemoryStore};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== Order Status Notifications ===\n");

    let store = MemoryStore::with_rows(
        "id",
        vec![
            Row::new().with("id", 1).with("status", "pending").with("total", 120),
            Row::new().with("id", 2).with("status", "pending").with("total", 80),
        ],
    )?;

    let registry = SubscriberRegistry::new();
    let received = Arc::new(AtomicUsize::new(0));
    let received_clone = Arc::clone(&received);
    let _handle = registry
        .subscribe("order-status", move |notification| {
            received_clone.fetch_add(1, Ordering::SeqCst);
            println!("  -> {}", notification.body);
        })
        .await;

    let entity = ChangeEventMessage::new().with_entity("orders");
    let hook = ChangeNotifyHook::builder(store)
        .with_publisher(registry)
        .with_destination("order-status")
        .with_message(move |change: &FieldChange| {
            entity
                .build(change)
                .unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        })
        .build()?;

    println!("Shipping order 1 (status changes):");
    let report = hook
        .update("status", &Filter::eq("id", 1), &json!({ "status": "shipped" }))
        .await?;
    describe(&report);

    println!("\nRaising the total of order 1 (status unchanged):");
    let report = hook
        .update("status", &Filter::eq("id", 1), &json!({ "total": 150 }))
        .await?;
    describe(&report);

    println!("\nCancelling order 2 through a full save:");
    let cancelled = Row::new()
        .with("id", 2)
        .with("status", "cancelled")
        .with("total", 80);
    let report = hook.save(&cancelled, "status").await?;
    describe(&report);

    println!("\nRedirecting to a destination nobody listens on:");
    hook.update_settings(HookSettings::new("archived-orders"))?;
    let report = hook
        .update("status", &Filter::eq("id", 1), &json!({ "status": "delivered" }))
        .await?;
    describe(&report);

    println!(
        "\nSubscribers received {} notification(s)",
        received.load(Ordering::SeqCst)
    );
    println!("\n=== Example Complete ===");
    Ok(())
}

fn describe(report: &UpdateReport) {
    match &report.notify {
        NotifyOutcome::Unchanged => println!("  unchanged, nothing sent"),
        NotifyOutcome::Published(n) => println!("  published to {}", n.destination),
        NotifyOutcome::Skipped(reason) if reason.is_lost_notification() => {
            println!("  changed but lost: {}", reason)
        }
        NotifyOutcome::Skipped(reason) => println!("  skipped: {}", reason),
    }
}
