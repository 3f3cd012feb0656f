use actix::prelude::*;
use anyhow::Context as _;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod actors;
mod directory;
mod domain;
mod messages;

use actors::{
    AddAvailability, CoordinatorActor, GetConsultations, GetPatientDiagnostics, IssueDiagnostic,
    ProviderActor, RegisterSelf, RequestConsultation, RequesterActor,
};
use directory::Directory;

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging with environment-based filtering.
    // Override with e.g. RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,clinic_agents=debug")),
        )
        .init();

    tracing::info!("Starting consultation scheduling simulation");

    // === 1. Directory and role actors ===
    // One registry, built once and injected into every actor.
    let registry = Arc::new(Directory::new());

    let _coordinator_addr = CoordinatorActor::new(registry.clone()).start();
    let provider = ProviderActor::new(registry.clone(), 1, "House", "Diagnostics").start();
    let requester = RequesterActor::new(
        registry.clone(),
        123,
        "Curie",
        "Marie",
        "radiology follow-up",
    )
    .start();

    // === 2. Register the patient ===
    requester.send(RegisterSelf).await?;

    // === 3. Provider announces an open slot ===
    let slot = Utc
        .with_ymd_and_hms(2024, 1, 10, 10, 0, 0)
        .single()
        .context("invalid slot timestamp")?;
    let availability = provider
        .send(AddAvailability {
            when: slot,
            duration_minutes: 30,
        })
        .await?;
    tracing::info!(availability_id = availability.id, when = %availability.when, "Slot announced");

    // === 4. Patient requests a consultation at the announced slot ===
    let local_ref = requester
        .send(RequestConsultation {
            provider_id: 1,
            when: slot,
        })
        .await?;
    tracing::info!(local_ref, "Request in flight");

    // Let the request/decision/notice chain drain.
    tokio::time::sleep(Duration::from_millis(200)).await;

    // === 5. Provider treats the consultation and writes a diagnostic ===
    let coordinator = registry
        .resolve_coordinator()
        .context("coordinator not registered")?;
    let consultations = coordinator.send(GetConsultations).await?;
    for consultation in &consultations {
        tracing::info!(
            consultation_id = ?consultation.id,
            status = ?consultation.status,
            "Coordinator view"
        );
    }

    if let Some(scheduled_id) = consultations.first().and_then(|c| c.id) {
        match provider
            .send(IssueDiagnostic {
                consultation_id: scheduled_id,
                description: "seasonal flu".to_string(),
                recommendations: "rest and fluids, follow up in two weeks".to_string(),
            })
            .await?
        {
            Ok(diagnostic) => {
                tracing::info!(diagnostic_id = %diagnostic.id, "Diagnostic submitted")
            }
            Err(e) => tracing::warn!(error = %e, "Diagnostic could not be issued"),
        }
    }

    tokio::time::sleep(Duration::from_millis(200)).await;

    // === 6. Final state ===
    let history = coordinator
        .send(GetPatientDiagnostics { patient_id: 123 })
        .await?;
    tracing::info!(
        diagnostics = history.len(),
        "Simulation complete, patient history recorded"
    );

    Ok(())
}
