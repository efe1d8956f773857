use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};

use fuel_ledger::config::database::{mask_database_url, DatabaseConfig};
use fuel_ledger::config::EnvironmentConfig;
use fuel_ledger::{create_app_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!("⛽ Fuel Ledger - API de repostajes");
    info!("================================================");

    let app_state = match config.database_url.clone() {
        Some(url) => {
            info!("🔌 Conectando a PostgreSQL: {}", mask_database_url(&url));
            let pool = match DatabaseConfig::new(url).create_pool().await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            info!("✅ Base de datos conectada exitosamente");
            AppState::postgres(pool, config.clone())
        }
        None => {
            warn!("⚠️ DATABASE_URL no definida, usando almacenamiento en memoria");
            AppState::in_memory(config.clone())
        }
    };

    let app = create_app_router(app_state);
    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("⛽ Repostajes:");
    info!("   POST   /api/refuelings - Registrar repostaje");
    info!("   GET    /api/refuelings - Listar repostajes");
    info!("   GET    /api/refuelings/:id - Obtener repostaje");
    info!("   PUT    /api/refuelings/:id - Actualizar repostaje");
    info!("   DELETE /api/refuelings/:id - Eliminar repostaje");
    info!("   GET    /api/refuelings/stats/summary - Resumen estadístico");
    info!("🚗 Vehículos:");
    info!("   POST /api/vehicles - Registrar vehículo");
    info!("   GET  /api/vehicles - Listar vehículos");
    info!("   GET  /api/vehicles/:id - Obtener vehículo");
    info!("   GET  /api/vehicles/:id/refuelings - Repostajes del vehículo");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Servidor terminó con error: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
