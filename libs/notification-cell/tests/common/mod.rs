#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentStatus, Client, NewAppointment,
    Service,
};
use appointment_cell::store::AppointmentStore;
use notification_cell::error::NotificationError;
use notification_cell::models::{
    NewNotification, Notification, NotificationStatus, NotificationType,
};
use notification_cell::services::dispatcher::{DispatchConfig, NotificationDispatchService};
use notification_cell::store::NotificationStore;
use notification_cell::transport::{TransportClient, TransportError};

// ==============================================================================
// IN-MEMORY APPOINTMENT STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    clients: RwLock<HashMap<Uuid, Client>>,
    services: RwLock<HashMap<Uuid, Service>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_client(&self, client: Client) {
        self.clients.write().await.insert(client.id, client);
    }

    pub async fn insert_service(&self, service: Service) {
        self.services.write().await.insert(service.id, service);
    }

    pub async fn insert_appointment(&self, appointment: Appointment) {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment);
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn find_details(
        &self,
        id: Uuid,
    ) -> Result<Option<AppointmentDetails>, AppointmentError> {
        let Some(appointment) = self.appointments.read().await.get(&id).cloned() else {
            return Ok(None);
        };

        let client = self
            .clients
            .read()
            .await
            .get(&appointment.client_id)
            .cloned();
        let service = self
            .services
            .read()
            .await
            .get(&appointment.service_id)
            .cloned();

        match (client, service) {
            (Some(client), Some(service)) => Ok(Some(AppointmentDetails {
                appointment,
                client,
                service,
            })),
            _ => Ok(None),
        }
    }

    async fn find_overlapping(
        &self,
        provider_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.read().await;

        Ok(appointments
            .values()
            .filter(|apt| apt.provider_id == provider_id)
            .filter(|apt| apt.deleted_at.is_none())
            .filter(|apt| apt.start_time < end && apt.end_time > start)
            .filter(|apt| Some(apt.id) != exclude_appointment_id)
            .cloned()
            .collect())
    }

    async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id: new.provider_id,
            client_id: new.client_id,
            service_id: new.service_id,
            start_time: new.start_time,
            end_time: new.end_time,
            status: AppointmentStatus::Scheduled,
            notes: new.notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());

        Ok(appointment)
    }

    async fn update_times(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments.get_mut(&id).ok_or(AppointmentError::NotFound)?;

        appointment.start_time = start;
        appointment.end_time = end;
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments.get_mut(&id).ok_or(AppointmentError::NotFound)?;

        appointment.status = status;
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments.get_mut(&id).ok_or(AppointmentError::NotFound)?;

        appointment.deleted_at = Some(Utc::now());

        Ok(())
    }
}

// ==============================================================================
// IN-MEMORY NOTIFICATION STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryNotificationStore {
    rows: RwLock<HashMap<Uuid, Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, notification: Notification) {
        self.rows
            .write()
            .await
            .insert(notification.id, notification);
    }

    pub async fn get(&self, id: Uuid) -> Option<Notification> {
        self.rows.read().await.get(&id).cloned()
    }

    pub async fn all(&self) -> Vec<Notification> {
        self.rows.read().await.values().cloned().collect()
    }

    pub async fn count_with_status(&self, status: NotificationStatus) -> usize {
        self.rows
            .read()
            .await
            .values()
            .filter(|n| n.status == status)
            .count()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, new: NewNotification) -> Result<Notification, NotificationError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            appointment_id: new.appointment_id,
            provider_id: new.provider_id,
            client_id: new.client_id,
            notification_type: new.notification_type,
            message: new.message,
            status: NotificationStatus::Queued,
            retry_count: 0,
            send_after: new.send_after,
            twilio_sid: None,
            failure_reason: None,
            sent_at: None,
            read_at: None,
            created_at: Utc::now(),
            deleted_at: None,
        };

        self.rows
            .write()
            .await
            .insert(notification.id, notification.clone());

        Ok(notification)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, NotificationError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_dispatchable(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|n| n.is_dispatchable(now))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn claim_for_sending(
        &self,
        id: Uuid,
    ) -> Result<Option<Notification>, NotificationError> {
        let mut rows = self.rows.write().await;
        let Some(notification) = rows.get_mut(&id) else {
            return Ok(None);
        };

        if !notification.status.awaits_dispatch() {
            return Ok(None);
        }

        notification.status = NotificationStatus::Sending;
        Ok(Some(notification.clone()))
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        twilio_sid: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Notification, NotificationError> {
        let mut rows = self.rows.write().await;
        let notification = rows.get_mut(&id).ok_or(NotificationError::NotFound(id))?;

        notification.status = NotificationStatus::Sent;
        notification.twilio_sid = Some(twilio_sid.to_string());
        notification.sent_at = Some(sent_at);

        Ok(notification.clone())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        retry_count: u32,
        failure_reason: &str,
    ) -> Result<Notification, NotificationError> {
        let mut rows = self.rows.write().await;
        let notification = rows.get_mut(&id).ok_or(NotificationError::NotFound(id))?;

        notification.status = NotificationStatus::Failed;
        notification.retry_count = retry_count;
        notification.failure_reason = Some(failure_reason.to_string());

        Ok(notification.clone())
    }

    async fn update_by_transport_sid(
        &self,
        twilio_sid: &str,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
        read_at: Option<DateTime<Utc>>,
    ) -> Result<u64, NotificationError> {
        let mut rows = self.rows.write().await;
        let mut count = 0;

        for notification in rows.values_mut() {
            if notification.twilio_sid.as_deref() == Some(twilio_sid) {
                notification.status = status;
                if let Some(at) = sent_at {
                    notification.sent_at = Some(at);
                }
                if let Some(at) = read_at {
                    notification.read_at = Some(at);
                }
                count += 1;
            }
        }

        Ok(count)
    }

    async fn soft_delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, NotificationError> {
        let mut rows = self.rows.write().await;
        let mut count = 0;

        for notification in rows.values_mut() {
            if notification.created_at < cutoff && notification.deleted_at.is_none() {
                notification.deleted_at = Some(deleted_at);
                count += 1;
            }
        }

        Ok(count)
    }
}

// ==============================================================================
// MOCK TRANSPORT
// ==============================================================================

/// Scriptable transport: queued responses are consumed in order; once the
/// script runs out every send succeeds with a generated sid.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<(String, String)>>,
    counter: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_ok(&self, sid: &str) {
        self.responses.lock().await.push_back(Ok(sid.to_string()));
    }

    pub async fn push_err(&self, reason: &str) {
        self.responses
            .lock()
            .await
            .push_back(Err(reason.to_string()));
    }

    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl TransportClient for MockTransport {
    async fn send(&self, to: &str, body: &str) -> Result<String, TransportError> {
        self.calls
            .lock()
            .await
            .push((to.to_string(), body.to_string()));

        match self.responses.lock().await.pop_front() {
            Some(Ok(sid)) => Ok(sid),
            Some(Err(reason)) => Err(TransportError::Rejected {
                status: 500,
                body: reason,
            }),
            None => Ok(format!(
                "SMtest{:04}",
                self.counter.fetch_add(1, Ordering::SeqCst)
            )),
        }
    }
}

// ==============================================================================
// FIXTURE
// ==============================================================================

/// One provider, one client ("Giulia"), one service ("Manicure") and one
/// confirmed appointment, wired to in-memory stores and a mock transport.
pub struct NotificationFixture {
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub transport: Arc<MockTransport>,
    pub appointment: Appointment,
    pub client: Client,
    pub service: Service,
}

impl NotificationFixture {
    pub async fn with_appointment_start(start: DateTime<Utc>) -> Self {
        let appointments = Arc::new(InMemoryAppointmentStore::new());
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let transport = Arc::new(MockTransport::new());

        let client = Client {
            id: Uuid::new_v4(),
            first_name: "Giulia".to_string(),
            last_name: "Rossi".to_string(),
            whatsapp_number: "+393331234567".to_string(),
            deleted_at: None,
        };
        let service = Service {
            id: Uuid::new_v4(),
            name: "Manicure".to_string(),
            duration_minutes: 60,
            deleted_at: None,
        };

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            client_id: client.id,
            service_id: service.id,
            start_time: start,
            end_time: start + Duration::hours(1),
            status: AppointmentStatus::Confirmed,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        appointments.insert_client(client.clone()).await;
        appointments.insert_service(service.clone()).await;
        appointments.insert_appointment(appointment.clone()).await;

        Self {
            appointments,
            notifications,
            transport,
            appointment,
            client,
            service,
        }
    }

    pub async fn new() -> Self {
        Self::with_appointment_start(Utc::now() + Duration::hours(30)).await
    }

    pub fn dispatcher(&self) -> NotificationDispatchService {
        NotificationDispatchService::new(
            self.notifications.clone(),
            self.appointments.clone(),
            self.transport.clone(),
            DispatchConfig::default(),
        )
    }

    /// Insert a notification row directly, bypassing the composer.
    pub async fn seed_notification(
        &self,
        status: NotificationStatus,
        retry_count: u32,
        send_after: Option<DateTime<Utc>>,
    ) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            appointment_id: self.appointment.id,
            provider_id: self.appointment.provider_id,
            client_id: self.client.id,
            notification_type: NotificationType::Reminder24h,
            message: "Hi Giulia! Just a reminder: your Manicure appointment is tomorrow at 10:00. See you soon!".to_string(),
            status,
            retry_count,
            send_after,
            twilio_sid: None,
            failure_reason: None,
            sent_at: None,
            read_at: None,
            created_at: Utc::now(),
            deleted_at: None,
        };

        self.notifications.insert(notification.clone()).await;

        notification
    }

    pub async fn seed_queued(&self) -> Notification {
        self.seed_notification(NotificationStatus::Queued, 0, None)
            .await
    }
}
