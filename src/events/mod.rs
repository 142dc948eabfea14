use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

/// Domain events emitted after a successful commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProjectCreated(i32),
    ProjectUpdated(i32),
    ProjectDeleted(i32),

    BlockCreated {
        project_id: i32,
        block_id: i32,
    },
    BlockUpdated {
        project_id: i32,
        block_id: i32,
    },
    BlockDeleted {
        project_id: i32,
        block_id: i32,
    },

    UnitsGenerated {
        block_id: i32,
        created: u64,
    },
    UnitStatusChanged {
        unit_id: i32,
        old_status: String,
        new_status: String,
    },
    UnitStageChanged {
        unit_id: i32,
        stage: String,
    },

    StockUpdated {
        project_id: i32,
        material_item_id: i32,
        allocated: Decimal,
        used: Decimal,
        clamped: bool,
    },

    SupervisorCreated(i32),
    SupervisorAssignmentsChanged {
        supervisor_id: i32,
        project_ids: Vec<i32>,
    },
    SupervisorDeleted(i32),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProjectCreated(_) => "project.created",
            Event::ProjectUpdated(_) => "project.updated",
            Event::ProjectDeleted(_) => "project.deleted",
            Event::BlockCreated { .. } => "block.created",
            Event::BlockUpdated { .. } => "block.updated",
            Event::BlockDeleted { .. } => "block.deleted",
            Event::UnitsGenerated { .. } => "units.generated",
            Event::UnitStatusChanged { .. } => "unit.status_changed",
            Event::UnitStageChanged { .. } => "unit.stage_changed",
            Event::StockUpdated { .. } => "stock.updated",
            Event::SupervisorCreated(_) => "supervisor.created",
            Event::SupervisorAssignmentsChanged { .. } => "supervisor.assignments_changed",
            Event::SupervisorDeleted(_) => "supervisor.deleted",
        }
    }
}

/// Envelope used when events are logged as structured records
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub name: &'static str,
    pub received_at: DateTime<Utc>,
    pub payload: Event,
}

/// Drains the event channel, logging every event until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let record = EventRecord {
            name: event.name(),
            received_at: Utc::now(),
            payload: event,
        };

        match &record.payload {
            Event::StockUpdated {
                project_id,
                material_item_id,
                clamped: true,
                ..
            } => {
                warn!(
                    event = record.name,
                    project_id, material_item_id, "stock usage clamped to allocation"
                );
            }
            _ => match serde_json::to_string(&record) {
                Ok(json) => info!(event = record.name, "{}", json),
                Err(_) => info!(event = record.name, "{:?}", record.payload),
            },
        }
    }

    info!("Event processing loop stopped");
}
