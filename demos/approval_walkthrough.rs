//! Walks one payment voucher through the full approval chain.
//!
//! Run with: cargo run --example approval_walkthrough

use std::sync::Arc;
use voucher_approval::{
    actor::Actor,
    document::{Action, DocumentKind, PaymentDate},
    notify::LogNotifier,
    service::WorkflowService,
};

fn main() -> anyhow::Result<()> {
    let db = Arc::new(sled::open("walkthrough.db")?);
    if !db.is_empty() {
        db.clear()?;
    }

    let service = WorkflowService::new(db, Arc::new(LogNotifier));

    let officer = Actor::new("Officer Oun")?.with_role_level(1).verified().approved();
    let supervisor = Actor::new("Supervisor Sok")?
        .with_role_level(2)
        .verified()
        .approved()
        .with_signature(b"sok-ink".to_vec());
    let finance = Actor::new("Finance Dara")?.with_role_level(3).verified().approved();
    let general = Actor::new("GM Vanna")?.with_role_level(4).verified().approved();
    let director = Actor::new("MD Rithy")?.with_role_level(5).verified().approved();

    for actor in [&officer, &supervisor, &finance, &general, &director] {
        service.register_actor(actor)?;
    }

    // the payment is dated January, so the number draws from the 2601 sequence
    let payment_date = PaymentDate::new(2026, 1, 15).expect("valid calendar date");
    let doc = service.create_document(
        DocumentKind::Voucher,
        "ACME Supplies Co.",
        1_250_000,
        payment_date,
        &officer.id,
    )?;
    println!("created {} in {:?}", doc.id, doc.status);

    let doc = service.transition(&doc.id, Action::Submit, &officer.id, "")?;
    println!(
        "submitted as {} awaiting {}",
        doc.number.as_deref().unwrap_or("?"),
        doc.status
    );

    for approver in [&supervisor, &finance, &general, &director] {
        let doc = service.transition(&doc.id, Action::Approve, &approver.id, "checked")?;
        println!("{} approved, now '{}'", approver.name, doc.status);
    }

    let history = service.history().list_for(&doc.id)?;
    println!("audit trail has {} entries:", history.len());
    for entry in history {
        println!(
            "  {:?} by {} (level {})",
            entry.action, entry.actor_id, entry.actor_role_level
        );
    }

    Ok(())
}
