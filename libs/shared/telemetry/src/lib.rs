// [libs/shared/telemetry/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRY BOOTSTRAP (V1.0)
 * CLASIFICACION: SHARED UTILITY (ESTRATO L4)
 * RESPONSABILIDAD: INICIALIZACION DE TRAZAS Y BLINDAJE DE PANICOS
 *
 * Inicializa el suscriptor global de `tracing` y un hook de panico
 * que registra el colapso de un hilo en vez de dejarlo morir en
 * silencio. Usado por el binario del servidor antes de levantar
 * cualquier otro subsistema.
 * =================================================================
 */

use std::panic;
use tracing::{error, info, instrument};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Inicializa el suscriptor de trazas para `service_name`.
///
/// En depuracion emite logs compactos y legibles; en release emite JSON
/// plano apto para ingesta por un colector externo. El filtro de entorno
/// respeta `RUST_LOG` si esta definido, y de lo contrario silencia el
/// ruido de `tower_http`/`hyper` mientras mantiene el nivel de detalle
/// del propio servicio.
#[instrument(skip_all)]
pub fn init_tracing(service_name: &str) {
    let environmental_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{}={level},tower_http=warn,hyper=warn",
            service_name,
            level = if cfg!(debug_assertions) { "debug" } else { "info" }
        )
        .into()
    });

    let is_production = !cfg!(debug_assertions);

    if is_production {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    }

    install_panic_shield(service_name);

    info!(event = "telemetry_online", service = service_name, "tracing subscriber initialized");
}

/// Instala un hook de panico que registra la ubicacion y el mensaje antes
/// de que el hilo termine, para que un colapso en un loop de fondo deje
/// rastro en los logs en vez de desaparecer silenciosamente.
fn install_panic_shield(service_name: &str) {
    let service = service_name.to_string();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");

        error!(
            event = "thread_panic",
            service = %service,
            location = %location,
            "thread terminated: {}",
            payload
        );
    }));
}
