use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::booking::BookingService;
use appointment_cell::store::{AppointmentStore, SupabaseAppointmentStore};
use notification_cell::services::composer::ReminderComposerService;
use notification_cell::services::dispatcher::{DispatchConfig, NotificationDispatchService};
use notification_cell::services::ingestor::DeliveryStatusIngestorService;
use notification_cell::services::scheduler::ReminderSchedulerService;
use notification_cell::services::sweeper::RetentionSweeperService;
use notification_cell::services::trigger::{PeriodicTriggerService, TriggerConfig};
use notification_cell::store::{NotificationStore, SupabaseNotificationStore};
use notification_cell::transport::{TransportClient, TwilioWhatsAppClient};
use notification_cell::NotificationState;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio Booking API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    // Shared record store client
    let supabase = Arc::new(SupabaseClient::new(&config));
    let appointments: Arc<dyn AppointmentStore> =
        Arc::new(SupabaseAppointmentStore::new(supabase.clone()));
    let notifications: Arc<dyn NotificationStore> =
        Arc::new(SupabaseNotificationStore::new(supabase.clone()));
    let transport: Arc<dyn TransportClient> = Arc::new(TwilioWhatsAppClient::new(&config));

    // Notification services
    let composer = Arc::new(ReminderComposerService::new(
        appointments.clone(),
        notifications.clone(),
    ));
    let scheduler = Arc::new(ReminderSchedulerService::new(
        appointments.clone(),
        composer.clone(),
    ));
    let dispatcher = Arc::new(NotificationDispatchService::new(
        notifications.clone(),
        appointments.clone(),
        transport.clone(),
        DispatchConfig::default(),
    ));
    let sweeper = Arc::new(RetentionSweeperService::new(notifications.clone()));
    let ingestor = Arc::new(DeliveryStatusIngestorService::new(notifications.clone()));

    // Periodic dispatch + retention sweep, independent of request handling
    let trigger = PeriodicTriggerService::new(
        dispatcher.clone(),
        sweeper.clone(),
        TriggerConfig::default(),
    );
    let trigger_handles = trigger.start();

    let booking = Arc::new(BookingService::new(appointments.clone(), scheduler));
    let notification_state = Arc::new(NotificationState {
        config: config.clone(),
        dispatcher,
        ingestor,
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(booking, notification_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .unwrap();

    // Stop the periodic triggers and let in-flight ticks finish
    trigger.stop();
    futures::future::join_all(trigger_handles).await;

    info!("Shutdown complete");
}
