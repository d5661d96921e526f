// Script Runner Application
// Main entry point

use script_runner::ui_egui::RunnerApp;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Script Runner {}", env!("CARGO_PKG_VERSION"));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Script Runner")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([760.0, 520.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Script Runner",
        options,
        Box::new(|cc| Ok(Box::new(RunnerApp::new(cc)?))),
    )
}
