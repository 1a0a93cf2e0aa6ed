use ilink_lamp_controller::domain::lamp::LampRemote;
use ilink_lamp_controller::domain::settings::SettingsService;
use ilink_lamp_controller::infrastructure::bluetooth::{platform_transport, Dispatcher};
use ilink_lamp_controller::infrastructure::logging;
use ilink_lamp_controller::presentation::terminal;
use tokio::sync::mpsc;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting iLink lamp controller");
    info!("Settings file: {}", settings_service.path().display());

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let transport = platform_transport(&settings)?;
    let dispatcher = Dispatcher::start(transport, &settings, event_tx)?;
    let printer = terminal::spawn_status_printer(event_rx)?;

    let mut remote = LampRemote::new(dispatcher);
    let result = if std::env::args().any(|arg| arg == "--diagnostics") {
        terminal::run_diagnostics(&mut remote)
    } else {
        terminal::run(&mut remote, &settings, std::io::stdin().lock())
    };

    remote.sink().shutdown();
    drop(remote);
    let _ = printer.join();

    info!("Bye");
    result
}
