//! Scheduling command handlers.
//!
//! One handler per operation, each taking its command struct plus
//! [`CommandMetadata`] and returning domain types. Controllers outside
//! this crate translate transport concerns; handlers own the use-case
//! flow: classify identifier, authorize, materialize, transition,
//! persist, publish.

mod cancel_session;
mod check_in_session;
mod create_extra_session;
mod delete_extra_session;
mod finish_session;
mod list_sessions;
mod purge_future_sessions;
mod reschedule_session;
mod start_session;

pub use cancel_session::{CancelSessionCommand, CancelSessionHandler};
pub use check_in_session::{CheckInSessionCommand, CheckInSessionHandler};
pub use create_extra_session::{CreateExtraSessionCommand, CreateExtraSessionHandler};
pub use delete_extra_session::{DeleteExtraSessionCommand, DeleteExtraSessionHandler};
pub use finish_session::{FinishSessionCommand, FinishSessionHandler};
pub use list_sessions::{ListSessionsHandler, ListSessionsQuery};
pub use purge_future_sessions::{PurgeFutureSessionsCommand, PurgeFutureSessionsHandler};
pub use reschedule_session::{RescheduleSessionCommand, RescheduleSessionHandler};
pub use start_session::{StartSessionCommand, StartSessionHandler};

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, EventEnvelope, EventId, Timestamp};
use crate::domain::scheduling::{Session, SessionStatus, SessionUpdated};
use crate::ports::EventPublisher;

/// Publishes the transition event for a changed session.
///
/// Subscribers must not be able to roll back a committed transition, so a
/// publish failure is logged and swallowed.
pub(crate) async fn publish_transition(
    event_publisher: &Arc<dyn EventPublisher>,
    session: &Session,
    from_status: SessionStatus,
    metadata: &CommandMetadata,
) {
    let event = SessionUpdated {
        event_id: EventId::new(),
        session_id: session.id(),
        group_id: session.group_id(),
        from_status,
        to_status: session.status(),
        occurred_at: Timestamp::now(),
    };
    let envelope = EventEnvelope::from_event(&event)
        .with_correlation_id(metadata.correlation_id())
        .with_user_id(metadata.user_id.to_string());

    if let Err(e) = event_publisher.publish(envelope).await {
        tracing::warn!(session_id = %session.id(), error = %e, "failed to publish session.updated");
    }
}
